//! Yaz0 decompression.
//!
//! Yaz0 is the LZ77 flavour wrapped around `.szs` archives.
//!
//! ## Layout
//! ```text
//! [0x00] Magic "Yaz0"                 (4 bytes)
//! [0x04] DecompressedSize             (u32 BE)
//! [0x08] Alignment (0 on most files)  (u32 BE)
//! [0x0C] Reserved                     (4 bytes)
//! [0x10] Compressed stream
//! ```
//!
//! ## Stream
//! A group byte announces the next eight operations, most significant bit
//! first. A set bit copies one literal byte; a clear bit is a back-reference
//! encoded as `b1 b2 [b3]`:
//!
//! ```text
//! distance = ((b1 & 0x0F) << 8 | b2) + 1
//! length   = (b1 >> 4) + 2        if b1 >> 4 != 0
//!          = b3 + 0x12            otherwise
//! ```
//!
//! Back-references may overlap the bytes they produce (a distance of one
//! repeats the previous byte), so copies go byte by byte.

use byteorder::{BigEndian, ByteOrder};
use tracing::{debug, warn};

use crate::{Error, Result};

/// Magic bytes at the start of every Yaz0 stream.
pub const YAZ0_MAGIC: &[u8; 4] = b"Yaz0";

/// Size of the fixed header that precedes the compressed stream.
pub const HEADER_SIZE: usize = 0x10;

/// Fixed Yaz0 header fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Yaz0Header {
    /// Size of the output buffer in bytes.
    pub decompressed_size: u32,
    /// Data alignment hint used by newer encoders (0 when absent).
    pub alignment: u32,
}

/// `true` if `data` starts with the Yaz0 magic.
pub fn is_yaz0(data: &[u8]) -> bool {
    data.starts_with(YAZ0_MAGIC)
}

/// Read the header without decompressing anything.
pub fn header(data: &[u8]) -> Result<Yaz0Header> {
    if !is_yaz0(data) {
        return Err(Error::BadMagic);
    }
    if data.len() < HEADER_SIZE {
        return Err(Error::MalformedHeader("truncated Yaz0 header"));
    }
    Ok(Yaz0Header {
        decompressed_size: BigEndian::read_u32(&data[0x04..0x08]),
        alignment: BigEndian::read_u32(&data[0x08..0x0C]),
    })
}

/// Decompress a Yaz0 buffer.
///
/// The output is always exactly `decompressed_size` bytes long. If the
/// compressed stream runs out first the remainder is zero-filled and a
/// warning is logged.
pub fn decompress(data: &[u8]) -> Result<Vec<u8>> {
    let size = header(data)?.decompressed_size as usize;
    let mut out = Vec::with_capacity(size);

    let mut src = HEADER_SIZE;
    let mut group = 0u8;
    let mut group_left = 0u32;

    while out.len() < size {
        if group_left == 0 {
            let Some(&b) = data.get(src) else { break };
            group = b;
            group_left = 8;
            src += 1;
        }
        group_left -= 1;

        if group & 0x80 != 0 {
            let Some(&b) = data.get(src) else { break };
            out.push(b);
            src += 1;
        } else {
            let (Some(&b1), Some(&b2)) = (data.get(src), data.get(src + 1)) else {
                break;
            };
            src += 2;

            let distance = ((usize::from(b1 & 0x0F) << 8) | usize::from(b2)) + 1;
            let length = match b1 >> 4 {
                0 => {
                    let Some(&b3) = data.get(src) else { break };
                    src += 1;
                    usize::from(b3) + 0x12
                }
                n => usize::from(n) + 2,
            };

            let start = out
                .len()
                .checked_sub(distance)
                .ok_or(Error::UnresolvedReference("Yaz0 back-reference before start"))?;
            for i in 0..length.min(size - out.len()) {
                let b = out[start + i];
                out.push(b);
            }
        }
        group <<= 1;
    }

    if out.len() < size {
        warn!(
            produced = out.len(),
            declared = size,
            "Yaz0 stream ended early; padding output"
        );
        out.resize(size, 0);
    }

    debug!(compressed = data.len(), size, "Yaz0 stream decoded");
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_header(size: u32, stream: &[u8]) -> Vec<u8> {
        let mut v = YAZ0_MAGIC.to_vec();
        v.extend_from_slice(&size.to_be_bytes());
        v.extend_from_slice(&[0u8; 8]);
        v.extend_from_slice(stream);
        v
    }

    #[test]
    fn literals_and_short_backref() {
        // 4 literals then a distance-4, length-8 copy.
        let data = with_header(12, &[0xF0, b'A', b'B', b'C', b'D', 0x60, 0x03]);
        assert_eq!(decompress(&data).unwrap(), b"ABCDABCDABCD");
    }

    #[test]
    fn overlapping_long_backref() {
        // One literal, then distance 1 with an explicit length byte (13 + 0x12).
        let data = with_header(32, &[0x80, b'a', 0x00, 0x00, 0x0D]);
        assert_eq!(decompress(&data).unwrap(), vec![b'a'; 32]);
    }

    #[test]
    fn multiple_groups() {
        let mut stream = vec![0xFF];
        stream.extend_from_slice(b"01234567");
        stream.push(0x80);
        stream.push(b'8');
        let data = with_header(9, &stream);
        assert_eq!(decompress(&data).unwrap(), b"012345678");
    }

    #[test]
    fn output_never_exceeds_declared_size() {
        // The copy would produce 8 bytes but only 6 are declared.
        let data = with_header(6, &[0xF0, b'A', b'B', b'C', b'D', 0x60, 0x03]);
        assert_eq!(decompress(&data).unwrap(), b"ABCDAB");
    }

    #[test]
    fn truncated_input_is_padded() {
        let data = with_header(6, &[0xF0, b'x', b'y']);
        assert_eq!(decompress(&data).unwrap(), b"xy\0\0\0\0");
    }

    #[test]
    fn backref_before_start_fails() {
        let data = with_header(4, &[0x00, 0x10, 0x00]);
        assert!(matches!(
            decompress(&data),
            Err(Error::UnresolvedReference(_))
        ));
    }

    #[test]
    fn bad_magic() {
        assert!(matches!(decompress(b"Yaz1\0\0\0\0"), Err(Error::BadMagic)));
        assert!(matches!(decompress(b"Ya"), Err(Error::BadMagic)));
    }

    #[test]
    fn header_fields() {
        let mut data = with_header(0x1234, &[]);
        data[0x08..0x0C].copy_from_slice(&0x80u32.to_be_bytes());
        let h = header(&data).unwrap();
        assert_eq!(h.decompressed_size, 0x1234);
        assert_eq!(h.alignment, 0x80);
    }

    #[test]
    fn empty_output() {
        assert!(decompress(&with_header(0, &[])).unwrap().is_empty());
    }
}
