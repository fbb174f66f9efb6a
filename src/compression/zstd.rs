//! Zstandard decompression (requires the `compression` feature).
//!
//! Newer Switch titles ship SARC archives as a single Zstd stream with a
//! `.zs` suffix instead of Yaz0. Decompress the whole file first, then hand
//! the result to [`crate::formats::sarc::Sarc::parse`].

#![cfg(feature = "compression")]

use crate::{Error, Result};

/// Leading bytes of every Zstandard frame.
pub const ZSTD_MAGIC: [u8; 4] = [0x28, 0xB5, 0x2F, 0xFD];

/// `true` if `data` starts with a Zstandard frame header.
pub fn is_zstd(data: &[u8]) -> bool {
    data.starts_with(&ZSTD_MAGIC)
}

/// Decompress a complete Zstandard-compressed buffer.
///
/// Returns [`Error::Zstd`] on any decompression failure.
pub fn decompress_zstd(data: &[u8]) -> Result<Vec<u8>> {
    if !is_zstd(data) {
        return Err(Error::BadMagic);
    }
    let out = zstd::decode_all(data).map_err(Error::Zstd)?;
    tracing::debug!(compressed = data.len(), size = out.len(), "zstd stream decoded");
    Ok(out)
}
