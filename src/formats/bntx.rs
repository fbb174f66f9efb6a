//! BNTX (Binary NX Texture) - Nintendo Switch texture container.
//!
//! BNTX files appear standalone and embedded inside BFRES model files. All
//! addresses inside a BNTX are relative to the start of the BNTX itself, so
//! [`Bntx::parse`] takes a slice that begins at the `BNTX` magic.
//!
//! ## Layout
//! ```text
//! [0x00] BNTX header  (0x20 bytes)
//! [0x20] NX section   (0x24 bytes)
//! [InfoPtrsOffset]
//!        Array of u64 pointers to BRTI blocks (TextureCount entries)
//! [...]  BRTI blocks, string pool, data block, relocation table
//! ```
//!
//! ## BNTX Header (0x20 bytes)
//! ```text
//! [0x00] Magic "BNTX"                       (4 bytes)
//! [0x04] Padding                            (u32)
//! [0x08] Version                            (u32)
//! [0x0C] BOM (0xFEFF=BE, 0xFFFE=LE)         (raw bytes)
//! [0x0E] FormatRevision                     (u16)
//! [0x10] NameAddress (null-terminated)      (u32)
//! [0x14] StringsAddress (high half)         (u32)
//! [0x18] RelocAddress                       (u32)
//! [0x1C] FileLength                         (u32)
//! ```
//!
//! ## NX Section (at 0x20)
//! ```text
//! [0x00] Magic "NX" + 2 bytes padding
//! [0x04] TextureCount                        (u32)
//! [0x08] InfoPtrsAddress                     (u64)
//! [0x10] DataBlockAddress                    (u64)
//! [0x18] DictAddress                         (u64)
//! [0x20] StringDictLength                    (u32)
//! ```
//!
//! ## BRTI (Texture Info)
//! ```text
//! [0x00] Magic "BRTI"                       (4 bytes)
//! [0x04] Length                             (u32)
//! [0x08] DataLength (block)                 (u64)
//! [0x10] Flags                              (u8)
//! [0x11] Dimensions                         (u8)
//! [0x12] TileMode                           (u16)
//! [0x14] SwizzleSize                        (u16)
//! [0x16] MipmapCount                        (u16)
//! [0x18] MultiSampleCount                   (u16)
//! [0x1A] Reserved                           (u16)
//! [0x1C] Format (type << 8 | variant)       (u32)
//! [0x20] AccessFlags                        (u32)
//! [0x24] Width                              (u32)
//! [0x28] Height                             (u32)
//! [0x2C] Depth                              (u32)
//! [0x30] ArrayCount                         (u32)
//! [0x34] BlockHeightLog2                    (u32)
//! [0x38] Reserved (0x18 bytes)
//! [0x50] DataLength (pixels)                (u32)
//! [0x54] Alignment                          (u32)
//! [0x58] ChannelTypes (4 × u8)              (u32)
//! [0x5C] TextureType                        (u32)
//! [0x60] NameAddress (u16 length + bytes)   (u64)
//! [0x68] ParentAddress                      (u64)
//! [0x70] MipPtrsAddress                     (u64)
//! ```
//!
//! The first mip pointer is the base of the pixel data; the remaining
//! pointers are absolute and get normalised to offsets from that base.

use byteorder::{BigEndian, ByteOrder};
use tracing::{debug, trace};

use crate::cursor::{ByteCursor, Endian};
use crate::swizzle::BlockLinear;
use crate::{Error, Result};

/// Largest block height the GPU supports is 32 GOBs.
const MAX_BLOCK_HEIGHT_LOG2: u32 = 5;

/// Pixel format family (the high byte of the BRTI format field).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PixelFormat {
    R5G6B5 = 0x07,
    R8G8 = 0x09,
    R16 = 0x0A,
    R8G8B8A8 = 0x0B,
    R11G11B10 = 0x0F,
    R32 = 0x14,
    Bc1 = 0x1A,
    Bc2 = 0x1B,
    Bc3 = 0x1C,
    Bc4 = 0x1D,
    Bc5 = 0x1E,
    Astc4x4 = 0x2D,
    Astc5x4 = 0x2E,
    Astc5x5 = 0x2F,
    Astc6x5 = 0x30,
    Astc6x6 = 0x31,
    Astc8x5 = 0x32,
    Astc8x6 = 0x33,
    Astc8x8 = 0x34,
    Astc10x5 = 0x35,
    Astc10x6 = 0x36,
    Astc10x8 = 0x37,
    Astc10x10 = 0x38,
    Astc12x10 = 0x39,
    Astc12x12 = 0x3A,
}

impl TryFrom<u8> for PixelFormat {
    type Error = Error;
    fn try_from(v: u8) -> Result<Self> {
        use PixelFormat::*;
        Ok(match v {
            0x07 => R5G6B5,
            0x09 => R8G8,
            0x0A => R16,
            0x0B => R8G8B8A8,
            0x0F => R11G11B10,
            0x14 => R32,
            0x1A => Bc1,
            0x1B => Bc2,
            0x1C => Bc3,
            0x1D => Bc4,
            0x1E => Bc5,
            0x2D => Astc4x4,
            0x2E => Astc5x4,
            0x2F => Astc5x5,
            0x30 => Astc6x5,
            0x31 => Astc6x6,
            0x32 => Astc8x5,
            0x33 => Astc8x6,
            0x34 => Astc8x8,
            0x35 => Astc10x5,
            0x36 => Astc10x6,
            0x37 => Astc10x8,
            0x38 => Astc10x10,
            0x39 => Astc12x10,
            0x3A => Astc12x12,
            _ => return Err(Error::UnsupportedPixelFormat(v)),
        })
    }
}

impl PixelFormat {
    /// Bytes per texel, or per compressed block for block formats.
    pub fn bytes_per_texel(self) -> u32 {
        use PixelFormat::*;
        match self {
            R5G6B5 | R8G8 | R16 => 2,
            R8G8B8A8 | R11G11B10 | R32 => 4,
            Bc1 | Bc4 => 8,
            _ => 16,
        }
    }

    /// Texel footprint of one block as `(width, height)`; `(1, 1)` for
    /// uncompressed formats.
    pub fn block_dimensions(self) -> (u32, u32) {
        use PixelFormat::*;
        match self {
            Bc1 | Bc2 | Bc3 | Bc4 | Bc5 | Astc4x4 => (4, 4),
            Astc5x4 => (5, 4),
            Astc5x5 => (5, 5),
            Astc6x5 => (6, 5),
            Astc6x6 => (6, 6),
            Astc8x5 => (8, 5),
            Astc8x6 => (8, 6),
            Astc8x8 => (8, 8),
            Astc10x5 => (10, 5),
            Astc10x6 => (10, 6),
            Astc10x8 => (10, 8),
            Astc10x10 => (10, 10),
            Astc12x10 => (12, 10),
            Astc12x12 => (12, 12),
            R5G6B5 | R8G8 | R16 | R8G8B8A8 | R11G11B10 | R32 => (1, 1),
        }
    }

    /// Width in blocks (texels for uncompressed formats).
    pub fn width_in_blocks(self, width: u32) -> u32 {
        width.div_ceil(self.block_dimensions().0)
    }

    /// Height in blocks (texels for uncompressed formats).
    pub fn height_in_blocks(self, height: u32) -> u32 {
        height.div_ceil(self.block_dimensions().1)
    }
}

/// A single texture stored in a BNTX container.
#[derive(Debug, Clone)]
pub struct Texture {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    pub array_count: u32,
    pub mipmap_count: u16,
    pub tile_mode: u16,
    pub dimensions: u8,
    /// Full 16-bit format code: `format_type << 8 | format_variant`.
    pub format: u32,
    /// Format family, the top byte of the format code.
    pub format_type: u8,
    /// Numeric interpretation (UNORM, SRGB, ...), the low byte.
    pub format_variant: u8,
    /// Per-channel source selectors, R/G/B/A order.
    pub channel_types: [u8; 4],
    pub block_height_log2: u32,
    /// Byte offset of each mip level relative to the base level (first is 0).
    pub mip_offsets: Vec<u64>,
    /// Raw (still swizzled) pixel data for all mip levels.
    pub data: Vec<u8>,
}

impl Texture {
    /// The decoded pixel format family.
    ///
    /// Returns [`Error::UnsupportedPixelFormat`] for unknown codes.
    pub fn pixel_format(&self) -> Result<PixelFormat> {
        PixelFormat::try_from(self.format_type)
    }

    pub fn bytes_per_texel(&self) -> Result<u32> {
        Ok(self.pixel_format()?.bytes_per_texel())
    }

    pub fn width_in_texels(&self) -> Result<u32> {
        Ok(self.pixel_format()?.width_in_blocks(self.width))
    }

    pub fn height_in_texels(&self) -> Result<u32> {
        Ok(self.pixel_format()?.height_in_blocks(self.height))
    }

    /// GOBs per block for the base level (1 to 32).
    pub fn block_height(&self) -> Result<u32> {
        if self.block_height_log2 > MAX_BLOCK_HEIGHT_LOG2 {
            return Err(Error::MalformedHeader("block height exceeds 32 GOBs"));
        }
        Ok(1 << self.block_height_log2)
    }

    /// Address translator for the base mip level.
    pub fn swizzle(&self) -> Result<BlockLinear> {
        BlockLinear::new(
            self.width_in_texels()?,
            self.bytes_per_texel()?,
            self.block_height()?,
        )
    }

    /// Unswizzle mip level 0 into linear row-major texel/block order.
    ///
    /// Compressed formats stay compressed; this only undoes the GPU tiling.
    pub fn deswizzle_base_level(&self) -> Result<Vec<u8>> {
        let swizzle = self.swizzle()?;
        swizzle.deswizzle(&self.data, self.width_in_texels()?, self.height_in_texels()?)
    }
}

/// Parsed BNTX texture container.
#[derive(Debug, Clone)]
pub struct Bntx {
    /// Container name.
    pub name: String,
    pub endian: Endian,
    pub version: u32,
    pub format_revision: u16,
    /// Textures in info-array order.
    pub textures: Vec<Texture>,
}

impl Bntx {
    /// Size of the fixed BNTX header.
    pub const HEADER_SIZE: usize = 0x20;

    /// Parse a BNTX container. `data` must start at the `BNTX` magic.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut r = ByteCursor::new(data, Endian::Little);
        r.magic(b"BNTX")?;

        let bom = BigEndian::read_u16(r.slice_at(0x0C, 2)?);
        let endian = Endian::from_bom(bom).ok_or(Error::MalformedHeader("invalid BNTX BOM"))?;
        r.set_endian(endian);

        r.skip(4)?;
        let version = r.u32()?;
        r.skip(2)?;
        let format_revision = r.u16()?;
        let name_address = r.u32()? as usize;
        let _strings_address = r.u32()? >> 16;
        let _reloc_address = r.u32()?;
        let _file_length = r.u32()?;
        let name = r.cstring_at(name_address)?;

        // NX section
        r.magic(b"NX")?;
        r.skip(2)?;
        let texture_count = r.u32()?;
        let info_address = r.u64()?;
        let _data_block_address = r.u64()?;
        let _dict_address = r.u64()?;
        let _string_dict_length = r.u32()?;

        let mut textures = Vec::with_capacity(texture_count.min(0x1000) as usize);
        for i in 0..u64::from(texture_count) {
            r.seek_u64(info_address + i * 8)?;
            let brti = r.u64()?;
            r.seek_u64(brti)?;
            textures.push(parse_brti(&mut r)?);
        }

        debug!(container = %name, ?endian, textures = textures.len(), "parsed BNTX container");
        Ok(Self {
            name,
            endian,
            version,
            format_revision,
            textures,
        })
    }

    /// Find a texture by name.
    pub fn get(&self, name: &str) -> Option<&Texture> {
        self.textures.iter().find(|t| t.name == name)
    }
}

fn parse_brti(r: &mut ByteCursor<'_>) -> Result<Texture> {
    r.magic(b"BRTI")?;
    let _length = r.u32()?;
    let _block_length = r.u64()?;
    let _flags = r.u8()?;
    let dimensions = r.u8()?;
    let tile_mode = r.u16()?;
    let _swizzle_size = r.u16()?;
    let mipmap_count = r.u16()?;
    let _multi_sample_count = r.u16()?;
    r.skip(2)?;
    let format = r.u32()?;
    let _access_flags = r.u32()?;
    let width = r.u32()?;
    let height = r.u32()?;
    let depth = r.u32()?;
    let array_count = r.u32()?;
    let block_height_log2 = r.u32()?;
    r.skip(0x18)?;
    let data_length = r.u32()? as usize;
    let _alignment = r.u32()?;
    let channel_types = r.u32()?;
    let _texture_type = r.u32()?;
    let name_address = r.u64()?;
    let _parent_address = r.u64()?;
    let ptrs_address = r.u64()?;

    // Names are length-prefixed, not null-terminated.
    r.seek_u64(name_address)?;
    let len = r.u16()? as usize;
    let name = String::from_utf8_lossy(r.read(len)?).into_owned();

    r.seek_u64(ptrs_address)?;
    let base = r.u64()?;
    let mut mip_offsets = vec![0u64];
    for _ in 1..mipmap_count {
        let ptr = r.u64()?;
        let rel = ptr
            .checked_sub(base)
            .ok_or(Error::UnresolvedReference("mip level before base level"))?;
        mip_offsets.push(rel);
    }

    r.seek_u64(base)?;
    let data = r.read(data_length)?.to_vec();

    trace!(texture = %name, width, height, format = format_args!("{format:#06x}"), "BRTI");
    Ok(Texture {
        name,
        width,
        height,
        depth,
        array_count,
        mipmap_count,
        tile_mode,
        dimensions,
        format,
        format_type: (format >> 8) as u8,
        format_variant: format as u8,
        channel_types: channel_types.to_le_bytes(),
        block_height_log2,
        mip_offsets,
        data,
    })
}
