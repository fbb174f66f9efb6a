//! Decompression for the wrappers Nintendo puts around archives.
//!
//! Parsers receive already-decompressed bytes; call into this module first
//! when an entry is compressed.
//!
//! ## Submodules
//!
//! | Module | Algorithm | Typical use |
//! |--------|-----------|-------------|
//! | [`yaz0`] | Yaz0 (LZ77 variant) | `.szs` archives, always available |
//! | [`zstd`] | Zstandard | `.zs` archives (requires the `compression` feature) |
//!
//! [`crate::pipeline::unpack_szs`] picks the right one from the leading
//! magic bytes.

pub mod yaz0;

#[cfg(feature = "compression")]
pub mod zstd;
