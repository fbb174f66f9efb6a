//! Library-wide error and result types.

/// Result alias used throughout nxres.
pub type Result<T> = std::result::Result<T, Error>;

/// All errors the library can produce.
///
/// Every parser aborts on the first violation; no partially decoded
/// container is ever handed back alongside an error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A magic/signature field did not match the expected value.
    #[error("bad magic value")]
    BadMagic,
    /// The format is recognised but the platform/revision marker is not the
    /// one this crate understands.
    #[error("unsupported revision marker: {0:#010x}")]
    UnsupportedRevision(u32),
    /// A structural field failed a sanity check (message names the field).
    #[error("malformed header: {0}")]
    MalformedHeader(&'static str),
    /// A declared total size does not match the buffer that was supplied.
    #[error("declared size {declared} does not match buffer length {actual}")]
    SizeMismatch { declared: u64, actual: u64 },
    /// A read or seek would go past the end of the buffer.
    #[error("read of {len} bytes at {offset:#x} exceeds buffer of {size} bytes")]
    OutOfBounds { offset: usize, len: usize, size: usize },
    /// A BYML node carried a tag this parser does not know.
    #[error("unknown node type {0:#04x}")]
    UnknownNodeType(u8),
    /// A BYML root node was neither an array nor a dictionary.
    #[error("invalid root node type {0:#04x}")]
    InvalidRoot(u8),
    /// A texture uses a pixel format with no known texel size.
    #[error("unsupported pixel format {0:#04x}")]
    UnsupportedPixelFormat(u8),
    /// A mesh level of detail uses an index format that cannot be decoded.
    #[error("unsupported face index format {0}")]
    UnsupportedFaceFormat(u32),
    /// An offset or index points outside the region it must refer to.
    #[error("unresolved reference: {0}")]
    UnresolvedReference(&'static str),
    /// Writing a text export failed.
    #[error("failed to format export output")]
    Format(#[from] std::fmt::Error),
    /// Zstandard decompression failed.
    #[cfg(feature = "compression")]
    #[error("zstd decompression failed")]
    Zstd(#[source] std::io::Error),
}
