//! Positioned, endian-aware reader over an immutable byte buffer.
//!
//! Every parser in this crate works on an already-loaded `&[u8]`. The
//! formats are full of absolute and relative offsets, so instead of a
//! streaming [`std::io::Read`] the cursor supports cheap random access:
//! [`ByteCursor::seek`] jumps anywhere inside the buffer and
//! [`ByteCursor::cstring_at`] reads a string without moving the cursor.
//!
//! Each read consumes exactly the bytes it promises or returns
//! [`Error::OutOfBounds`]; nothing here panics on malformed input.

use byteorder::{BigEndian, ByteOrder, LittleEndian};

use crate::utils::{null_string, slice_at};
use crate::{Error, Result};

/// Byte order of a container, resolved once from its byte-order mark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endian {
    Big,
    Little,
}

impl Endian {
    /// Interpret a byte-order mark that was read as a big-endian `u16`.
    ///
    /// `0xFEFF` means the container is big-endian, `0xFFFE` little-endian.
    pub fn from_bom(bom: u16) -> Option<Self> {
        match bom {
            0xFEFF => Some(Endian::Big),
            0xFFFE => Some(Endian::Little),
            _ => None,
        }
    }

    /// The mark this byte order is announced with (as a big-endian `u16`).
    pub fn bom(self) -> u16 {
        match self {
            Endian::Big => 0xFEFF,
            Endian::Little => 0xFFFE,
        }
    }
}

macro_rules! read_endian {
    ($(#[$doc:meta])* $name:ident, $ty:ty, $read:ident, $n:literal) => {
        $(#[$doc])*
        #[inline]
        pub fn $name(&mut self) -> Result<$ty> {
            let b = self.read($n)?;
            Ok(match self.endian {
                Endian::Big => BigEndian::$read(b),
                Endian::Little => LittleEndian::$read(b),
            })
        }
    };
}

/// Seekable reader over a borrowed buffer.
///
/// The cursor never owns the bytes; slices it hands out live as long as
/// the underlying buffer.
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    pos: usize,
    endian: Endian,
}

impl<'a> ByteCursor<'a> {
    /// Create a cursor at offset 0.
    pub fn new(data: &'a [u8], endian: Endian) -> Self {
        Self {
            data,
            pos: 0,
            endian,
        }
    }

    /// The whole underlying buffer.
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Length of the underlying buffer.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Current absolute read position.
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn endian(&self) -> Endian {
        self.endian
    }

    /// Switch the byte order used by subsequent multi-byte reads.
    pub fn set_endian(&mut self, endian: Endian) {
        self.endian = endian;
    }

    /// Move to an absolute offset. Seeking exactly to the end is allowed.
    pub fn seek(&mut self, offset: usize) -> Result<()> {
        if offset > self.data.len() {
            return Err(Error::OutOfBounds {
                offset,
                len: 0,
                size: self.data.len(),
            });
        }
        self.pos = offset;
        Ok(())
    }

    /// [`seek`](Self::seek) for offsets stored as 64-bit file fields.
    pub fn seek_u64(&mut self, offset: u64) -> Result<()> {
        let offset = usize::try_from(offset).map_err(|_| Error::OutOfBounds {
            offset: usize::MAX,
            len: 0,
            size: self.data.len(),
        })?;
        self.seek(offset)
    }

    /// Advance the position by `n` bytes.
    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.read(n).map(|_| ())
    }

    /// Borrow the next `n` bytes and advance past them.
    pub fn read(&mut self, n: usize) -> Result<&'a [u8]> {
        let b = slice_at(self.data, self.pos, n)?;
        self.pos += n;
        Ok(b)
    }

    /// Read exactly `N` bytes into a fixed-size array.
    #[inline]
    pub fn bytes<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read(N)?);
        Ok(out)
    }

    /// Verify that the next bytes match `expected`.
    ///
    /// Returns [`Error::BadMagic`] on mismatch (or if the buffer is too short).
    pub fn magic(&mut self, expected: &[u8]) -> Result<()> {
        match self.read(expected.len()) {
            Ok(got) if got == expected => Ok(()),
            _ => Err(Error::BadMagic),
        }
    }

    /// Read one byte.
    #[inline]
    pub fn u8(&mut self) -> Result<u8> {
        Ok(self.read(1)?[0])
    }

    #[inline]
    pub fn i8(&mut self) -> Result<i8> {
        Ok(self.u8()? as i8)
    }

    read_endian!(u16, u16, read_u16, 2);
    read_endian!(i16, i16, read_i16, 2);
    read_endian!(
        /// Read a 24-bit unsigned integer (used by BYML counts and indices).
        u24, u32, read_u24, 3
    );
    read_endian!(u32, u32, read_u32, 4);
    read_endian!(i32, i32, read_i32, 4);
    read_endian!(u64, u64, read_u64, 8);
    read_endian!(i64, i64, read_i64, 8);
    read_endian!(f32, f32, read_f32, 4);
    read_endian!(f64, f64, read_f64, 8);

    /// Read a big-endian `u16` regardless of the cursor's byte order.
    #[inline]
    pub fn u16_be(&mut self) -> Result<u16> {
        Ok(BigEndian::read_u16(self.read(2)?))
    }

    /// Read a big-endian `u32` regardless of the cursor's byte order.
    #[inline]
    pub fn u32_be(&mut self) -> Result<u32> {
        Ok(BigEndian::read_u32(self.read(4)?))
    }

    /// Read a null-terminated string at an absolute offset.
    ///
    /// The cursor position is not touched.
    pub fn cstring_at(&self, offset: usize) -> Result<String> {
        null_string(self.data, offset)
    }

    /// Borrow `len` bytes at an absolute offset without moving the cursor.
    pub fn slice_at(&self, offset: usize, len: usize) -> Result<&'a [u8]> {
        slice_at(self.data, offset, len)
    }

    /// A copy of this cursor positioned at `offset`.
    pub fn at(&self, offset: usize) -> Result<Self> {
        let mut c = self.clone();
        c.seek(offset)?;
        Ok(c)
    }
}
