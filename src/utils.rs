//! Small helpers shared by the parsers.

use crate::{Error, Result};

/// Extract a null-terminated UTF-8 string from a byte slice at `offset`.
///
/// Returns [`Error::OutOfBounds`] if `offset` is past the end, or
/// [`Error::UnresolvedReference`] if no null byte is found.
#[inline]
pub(crate) fn null_string(buf: &[u8], offset: usize) -> Result<String> {
    let slice = buf.get(offset..).ok_or(Error::OutOfBounds {
        offset,
        len: 1,
        size: buf.len(),
    })?;
    let end = slice
        .iter()
        .position(|&b| b == 0)
        .ok_or(Error::UnresolvedReference("unterminated string"))?;
    Ok(String::from_utf8_lossy(&slice[..end]).into_owned())
}

/// Round `value` up to the next multiple of `align` (which must be non-zero).
#[inline]
pub(crate) fn align_up(value: u64, align: u64) -> u64 {
    value.div_ceil(align) * align
}

/// Bounds-checked `data[offset..offset + len]`.
#[inline]
pub(crate) fn slice_at(data: &[u8], offset: usize, len: usize) -> Result<&[u8]> {
    offset
        .checked_add(len)
        .and_then(|end| data.get(offset..end))
        .ok_or(Error::OutOfBounds {
            offset,
            len,
            size: data.len(),
        })
}
