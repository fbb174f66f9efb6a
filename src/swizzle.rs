//! Block-linear texture address translation.
//!
//! Switch textures are stored in the GPU's block-linear layout: the image is
//! cut into GOBs (groups of bytes, 64 bytes wide × 8 rows = 512 bytes),
//! GOBs are stacked `block_height` high into blocks, and blocks are laid out
//! row by row. Inside a GOB bytes are interleaved in a fixed bit pattern.
//!
//! [`BlockLinear::offset`] maps a texel (or compressed block) coordinate to
//! the byte offset where it lives in the swizzled buffer.

use crate::{Error, Result};

/// Block height used when a texture does not specify one.
pub const DEFAULT_BLOCK_HEIGHT: u32 = 16;

/// Precomputed address translator for one texture level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockLinear {
    bpp: u32,
    bh_mask: u64,
    bh_shift: u32,
    bpp_shift: u32,
    x_shift: u32,
    stride: u64,
}

impl BlockLinear {
    /// Build a translator.
    ///
    /// * `width` - row width in texels (already divided by the format's block width)
    /// * `bpp` - bytes per texel or per compressed block (power of two)
    /// * `block_height` - GOBs per block (power of two)
    pub fn new(width: u32, bpp: u32, block_height: u32) -> Result<Self> {
        if !bpp.is_power_of_two() {
            return Err(Error::MalformedHeader("bytes per texel must be a power of two"));
        }
        if !block_height.is_power_of_two() {
            return Err(Error::MalformedHeader("block height must be a power of two"));
        }
        let block_height = u64::from(block_height);
        let gob_width = (u64::from(width) * u64::from(bpp)).div_ceil(64);

        Ok(Self {
            bpp,
            bh_mask: block_height * 8 - 1,
            bh_shift: (block_height * 8).trailing_zeros(),
            bpp_shift: bpp.trailing_zeros(),
            x_shift: (512 * block_height).trailing_zeros(),
            stride: 512 * block_height * gob_width,
        })
    }

    /// Translator with [`DEFAULT_BLOCK_HEIGHT`].
    pub fn with_default_block_height(width: u32, bpp: u32) -> Result<Self> {
        Self::new(width, bpp, DEFAULT_BLOCK_HEIGHT)
    }

    /// Bytes per texel this translator was built for.
    pub fn bytes_per_texel(&self) -> u32 {
        self.bpp
    }

    /// Byte offset of texel `(x, y)` in the swizzled buffer.
    pub fn offset(&self, x: u32, y: u32) -> u64 {
        let x = u64::from(x) << self.bpp_shift;
        let y = u64::from(y);

        let mut pos = (y >> self.bh_shift) * self.stride;
        pos += (x >> 6) << self.x_shift;
        pos += ((y & self.bh_mask) >> 3) << 9;
        pos += ((x & 0x3F) >> 5) << 8;
        pos += ((y & 0x07) >> 1) << 6;
        pos += ((x & 0x1F) >> 4) << 5;
        pos += (y & 0x01) << 4;
        pos += x & 0x0F;
        pos
    }

    /// Copy a `width × height` texel rectangle out of `src` into linear
    /// row-major order.
    ///
    /// Swizzled offsets never overlap, so `src` must hold at least
    /// `width × height × bpp` bytes; smaller inputs fail before anything is
    /// allocated.
    pub fn deswizzle(&self, src: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
        let bpp = self.bpp as usize;
        let len = (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(bpp))
            .ok_or(Error::MalformedHeader("texture dimensions overflow"))?;
        if len > src.len() {
            return Err(Error::OutOfBounds {
                offset: 0,
                len,
                size: src.len(),
            });
        }
        let mut out = Vec::with_capacity(len);
        for y in 0..height {
            for x in 0..width {
                let at = usize::try_from(self.offset(x, y)).unwrap_or(usize::MAX);
                let texel = at
                    .checked_add(bpp)
                    .and_then(|end| src.get(at..end))
                    .ok_or(Error::OutOfBounds {
                        offset: at,
                        len: bpp,
                        size: src.len(),
                    })?;
                out.extend_from_slice(texel);
            }
        }
        Ok(out)
    }
}
