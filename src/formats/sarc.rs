//! SARC (SEAD ARChive) - general-purpose Nintendo archive.
//!
//! Usually delivered Yaz0-compressed with an `.szs` suffix; decompress with
//! [`crate::compression::yaz0`] before parsing.
//!
//! ## Layout
//! ```text
//! [0x00] SARC header  (0x14 bytes)
//! [0x14] SFAT header  (0x0C bytes) + FAT nodes (NodeCount × 0x10)
//! [...]  SFNT header  (0x08 bytes) + null-terminated filenames (4-byte aligned)
//! [...]  Data section (begins at offset given in SARC header)
//! ```
//!
//! ## SARC Header (0x14 bytes)
//! ```text
//! [0x00] Magic "SARC"       (4 bytes)
//! [0x04] HeaderSize (0x14)  (u16)
//! [0x06] BOM                (0xFEFF = big, 0xFFFE = little, as raw bytes)
//! [0x08] ArchiveSize        (u32)
//! [0x0C] DataOffset         (u32)
//! [0x10] Version (0x0100)   (u16)
//! [0x12] Padding
//! ```
//!
//! ## SFAT Header (0x0C bytes)
//! ```text
//! [0x00] Magic "SFAT"           (4 bytes)
//! [0x04] HeaderSize (0x0C)      (u16)
//! [0x06] NodeCount              (u16)
//! [0x08] HashKey (0x65)         (u32)
//! ```
//!
//! ## SFAT Node (0x10 bytes)
//! ```text
//! [0x00] NameHash               (u32)
//! [0x04] Attributes             (u32)
//!         top byte: has-name flag; low 24 bits × 4: name table byte offset
//! [0x08] DataStart              (u32) - relative to the data section
//! [0x0C] DataEnd                (u32)
//! ```
//!
//! ## SFNT Header (0x08 bytes)
//! ```text
//! [0x00] Magic "SFNT"     (4 bytes)
//! [0x04] HeaderSize (8)   (u16)
//! [0x06] Padding
//! ```
//!
//! Entries without a name are given one derived from their hash and a
//! signature sniffed from the payload (see [`guess_extension`]).

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use tracing::{debug, trace};

use crate::cursor::{ByteCursor, Endian};
use crate::utils::slice_at;
use crate::{Error, Result};

const SARC_HEADER_SIZE: u16 = 0x14;
const SFAT_HEADER_SIZE: u16 = 0x0C;
const SFNT_HEADER_SIZE: u16 = 0x08;
const SARC_VERSION: u16 = 0x0100;
const MAX_NODES: u16 = 0x3FFF;

/// Multiplier used by the filename hash in every observed archive.
pub const HASH_KEY: u32 = 0x65;

/// Parsed SARC archive borrowing its payloads from the source buffer.
#[derive(Debug)]
pub struct Sarc<'a> {
    /// Byte order announced by the BOM.
    pub endian: Endian,
    /// Format version (always 0x0100).
    pub version: u16,
    /// Filename hash multiplier from the SFAT header.
    pub hash_key: u32,
    /// Absolute offset of the data section.
    pub data_offset: u32,
    /// Raw FAT node records in on-disk order.
    pub nodes: Vec<SarcNode>,
    /// One entry per node, same order as [`Sarc::nodes`].
    pub files: Vec<SarcFile<'a>>,
}

/// One raw SFAT node record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SarcNode {
    pub name_hash: u32,
    pub attributes: u32,
    pub data_start: u32,
    pub data_end: u32,
}

impl SarcNode {
    /// Size of a node record on disk.
    pub const SIZE: usize = 0x10;

    /// Whether the node has an entry in the name table.
    pub fn has_name(&self) -> bool {
        self.attributes >> 24 != 0
    }

    /// Byte offset of the name inside the name table.
    pub fn name_offset(&self) -> usize {
        (self.attributes & 0x00FF_FFFF) as usize * 4
    }

    /// Payload size in bytes.
    pub fn size(&self) -> Result<u32> {
        self.data_end
            .checked_sub(self.data_start)
            .ok_or(Error::MalformedHeader("SARC node ends before it starts"))
    }

    /// Serialize the record exactly as it appears in the archive.
    pub fn to_bytes(&self, endian: Endian) -> [u8; Self::SIZE] {
        let mut out = [0u8; Self::SIZE];
        let fields = [self.name_hash, self.attributes, self.data_start, self.data_end];
        for (chunk, v) in out.chunks_exact_mut(4).zip(fields) {
            match endian {
                Endian::Big => BigEndian::write_u32(chunk, v),
                Endian::Little => LittleEndian::write_u32(chunk, v),
            }
        }
        out
    }
}

/// A single file inside a SARC archive.
#[derive(Debug, Clone)]
pub struct SarcFile<'a> {
    /// Name from the name table, or a synthesized `file-<hash>.<ext>`.
    pub name: String,
    /// Filename hash from the node record.
    pub hash: u32,
    /// Payload, borrowed from the archive buffer.
    pub data: &'a [u8],
}

impl<'a> Sarc<'a> {
    /// Parse a decompressed SARC archive.
    pub fn parse(data: &'a [u8]) -> Result<Self> {
        let mut r = ByteCursor::new(data, Endian::Big);

        r.magic(b"SARC")?;
        // The header size precedes the BOM, so peek the BOM first.
        let bom = BigEndian::read_u16(r.slice_at(0x06, 2)?);
        let endian = Endian::from_bom(bom).ok_or(Error::MalformedHeader("invalid SARC BOM"))?;
        r.set_endian(endian);

        let header_size = r.u16()?;
        r.skip(2)?;
        let archive_size = r.u32()?;
        let data_offset = r.u32()?;
        let version = r.u16()?;
        r.skip(2)?;

        if header_size != SARC_HEADER_SIZE {
            return Err(Error::MalformedHeader("unexpected SARC header size"));
        }
        if archive_size as usize != data.len() {
            return Err(Error::MalformedHeader("SARC size does not match buffer"));
        }
        if version != SARC_VERSION {
            return Err(Error::MalformedHeader("unexpected SARC version"));
        }
        if data_offset as usize > data.len() {
            return Err(Error::MalformedHeader("SARC data offset past end"));
        }

        // SFAT header
        r.magic(b"SFAT")?;
        let sfat_size = r.u16()?;
        let node_count = r.u16()?;
        let hash_key = r.u32()?;
        if sfat_size != SFAT_HEADER_SIZE || hash_key != HASH_KEY {
            return Err(Error::MalformedHeader("malformed SFAT header"));
        }
        if node_count > MAX_NODES {
            return Err(Error::MalformedHeader("SARC node count exceeds maximum"));
        }

        let mut nodes = Vec::with_capacity(node_count as usize);
        for _ in 0..node_count {
            nodes.push(SarcNode {
                name_hash: r.u32()?,
                attributes: r.u32()?,
                data_start: r.u32()?,
                data_end: r.u32()?,
            });
        }

        // SFNT header
        r.magic(b"SFNT")?;
        if r.u16()? != SFNT_HEADER_SIZE {
            return Err(Error::MalformedHeader("malformed SFNT header"));
        }
        r.skip(2)?;
        let name_table = r.position();

        let payload = &data[data_offset as usize..];
        let mut files = Vec::with_capacity(nodes.len());
        for node in &nodes {
            let size = node.size()?;
            let data = slice_at(payload, node.data_start as usize, size as usize)
                .map_err(|_| Error::UnresolvedReference("SARC entry outside data section"))?;

            let name = if node.has_name() {
                r.cstring_at(name_table + node.name_offset())?
            } else {
                format!("file-{}.{}", node.name_hash, guess_extension(data))
            };
            trace!(entry = %name, hash = node.name_hash, size, "SARC entry");

            files.push(SarcFile {
                name,
                hash: node.name_hash,
                data,
            });
        }

        debug!(?endian, files = files.len(), "parsed SARC archive");
        Ok(Self {
            endian,
            version,
            hash_key,
            data_offset,
            nodes,
            files,
        })
    }

    /// Compute the canonical hash for a filename using this archive's key.
    pub fn hash_filename(&self, name: &str) -> u32 {
        sarc_hash(name.as_bytes(), self.hash_key)
    }

    /// Find a file by its exact name.
    pub fn get(&self, name: &str) -> Option<&SarcFile<'a>> {
        self.files.iter().find(|f| f.name == name)
    }

    /// Iterate over all files in on-disk order.
    pub fn files(&self) -> impl Iterator<Item = &SarcFile<'a>> {
        self.files.iter()
    }
}

/// SARC filename hash algorithm.
///
/// Each byte is sign-extended (cast to `i8`) before accumulating.
pub fn sarc_hash(name: &[u8], multiplier: u32) -> u32 {
    let mut h: u32 = 0;
    for &b in name {
        h = h.wrapping_mul(multiplier).wrapping_add(b as i8 as u32);
    }
    h
}

enum Signature {
    /// Magic at the start of the payload.
    Head(&'static [u8]),
    /// Magic at `len - 0x28` (layout image footers).
    Tail(&'static [u8]),
}

/// Known payload signatures, tested in order.
const SIGNATURES: &[(Signature, &str)] = &[
    (Signature::Head(b"BNTX\0\0\0\0"), "bntx"),
    (Signature::Head(b"BNSH\0\0\0\0"), "bnsh"),
    (Signature::Head(b"MsgStdBn"), "msbt"),
    (Signature::Head(b"MsgPrjBn"), "msbp"),
    (Signature::Head(b"SARC"), "sarc"),
    (Signature::Head(b"Yaz0"), "szs"),
    (Signature::Head(b"Yaz1"), "szs"),
    (Signature::Head(b"FFNT"), "bffnt"),
    (Signature::Head(b"CFNT"), "bcfnt"),
    (Signature::Head(b"CSTM"), "bcstm"),
    (Signature::Head(b"FSTM"), "bfstm"),
    (Signature::Head(b"FSTP"), "bfstp"),
    (Signature::Head(b"CWAV"), "bcwav"),
    (Signature::Head(b"FWAV"), "bfwav"),
    (Signature::Head(b"Gfx2"), "gtx"),
    (Signature::Head(b"FRES"), "bfres"),
    (Signature::Head(b"AAHS"), "sharc"),
    (Signature::Head(b"BAHS"), "sharcfb"),
    (Signature::Head(b"FSHA"), "bfsha"),
    (Signature::Head(b"FLAN"), "bflan"),
    (Signature::Head(b"FLYT"), "bflyt"),
    (Signature::Head(b"CLAN"), "bclan"),
    (Signature::Head(b"CLYT"), "bclyt"),
    (Signature::Head(b"CTPK"), "ctpk"),
    (Signature::Head(b"CGFX"), "bcres"),
    (Signature::Head(b"AAMP"), "aamp"),
    (Signature::Tail(b"FLIM"), "bflim"),
    (Signature::Tail(b"CLIM"), "bclim"),
    (Signature::Head(b"BY"), "byaml"),
    (Signature::Head(b"YB"), "byaml"),
];

/// Guess a file extension (without the dot) from a payload's signature.
///
/// Falls back to `"bin"` when nothing matches.
pub fn guess_extension(data: &[u8]) -> &'static str {
    SIGNATURES
        .iter()
        .find(|(sig, _)| match sig {
            Signature::Head(magic) => data.starts_with(magic),
            Signature::Tail(magic) => data
                .len()
                .checked_sub(0x28)
                .and_then(|start| data.get(start..start + magic.len()))
                .is_some_and(|got| got == *magic),
        })
        .map_or("bin", |(_, ext)| *ext)
}
