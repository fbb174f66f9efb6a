//! FVTX - vertex buffer set.
//!
//! ## FVTX record (0x60 bytes)
//! ```text
//! [0x00] Magic "FVTX" + padding              (16 bytes)
//! [0x10] AttributeArrayOffset                (u64)
//! [0x18] AttributeIndexOffset                (u64)
//! [0x20] Unknown                             (24 bytes)
//! [0x38] BufferSizeArrayOffset               (u64)  stride 0x10
//! [0x40] BufferStrideArrayOffset             (u64)  stride 0x10
//! [0x48] BufferArrayOffset                   (u64)
//! [0x50] BufferOffset (from DataStart)       (u32)
//! [0x54] AttributeCount                      (u8)
//! [0x55] BufferCount                         (u8)
//! [0x56] SectionIndex                        (u16)
//! [0x58] VertexCount                         (u32)
//! [0x5C] SkinWeightInfluence                 (u32)
//! ```
//!
//! ## Attribute (0x10 bytes)
//! ```text
//! [0x00] NameOffset (string at +2)           (u32)
//! [0x04] Padding                             (u32)
//! [0x08] Format (always big-endian)          (u16)
//! [0x0A] Unknown                             (u16)
//! [0x0C] Offset within the vertex stride     (u16)
//! [0x0E] BufferIndex                         (u16)
//! ```

use tracing::trace;

use super::Context;
use crate::cursor::ByteCursor;
use crate::utils::align_up;
use crate::{Error, Result};

/// Alignment of every vertex buffer's data.
const BUFFER_ALIGNMENT: u64 = 8;

const ATTRIBUTE_SIZE: usize = 0x10;
const BUFFER_INFO_STRIDE: u64 = 0x10;

/// One named vertex channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexAttribute {
    /// Semantic tag such as `_p0`, `_n0` or `_u0`.
    pub name: String,
    /// Numeric format code (component layout in the high byte).
    pub format: u16,
    /// Byte offset inside one vertex of the buffer.
    pub offset: u16,
    pub buffer_index: u16,
}

/// Location of one raw vertex buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexBuffer {
    pub size: u32,
    pub stride: u32,
    /// Absolute file offset of the first vertex.
    pub data_offset: u64,
}

#[derive(Debug, Clone)]
pub struct VertexBufferSet {
    pub attribute_array_offset: u64,
    pub attribute_index_offset: u64,
    pub buffer_size_offset: u64,
    pub buffer_stride_offset: u64,
    pub buffer_array_offset: u64,
    pub buffer_offset: u32,
    pub section_index: u16,
    pub vertex_count: u32,
    pub skin_weight_influence: u32,
    pub attributes: Vec<VertexAttribute>,
    pub buffers: Vec<VertexBuffer>,
}

impl VertexBufferSet {
    /// Parse the record at the cursor, leaving it just past the record.
    pub(crate) fn parse(r: &mut ByteCursor<'_>, ctx: &Context) -> Result<Self> {
        r.magic(b"FVTX")?;
        r.skip(12)?;
        let attribute_array_offset = r.u64()?;
        let attribute_index_offset = r.u64()?;
        r.skip(24)?;
        let buffer_size_offset = r.u64()?;
        let buffer_stride_offset = r.u64()?;
        let buffer_array_offset = r.u64()?;
        let buffer_offset = r.u32()?;
        let attribute_count = r.u8()?;
        let buffer_count = r.u8()?;
        let section_index = r.u16()?;
        let vertex_count = r.u32()?;
        let skin_weight_influence = r.u32()?;

        let attributes = read_attributes(r, attribute_array_offset, attribute_count)?;
        let buffers = read_buffers(
            r,
            ctx.data_start + u64::from(buffer_offset),
            buffer_size_offset,
            buffer_stride_offset,
            buffer_count,
        )?;

        check_buffer_bounds(&buffers, vertex_count, r.len())?;

        if let Some(attr) = attributes
            .iter()
            .find(|a| usize::from(a.buffer_index) >= buffers.len())
        {
            trace!(attribute = %attr.name, index = attr.buffer_index, "attribute buffer missing");
            return Err(Error::UnresolvedReference("vertex attribute buffer index"));
        }

        trace!(
            attributes = attributes.len(),
            buffers = buffers.len(),
            vertex_count,
            "FVTX"
        );
        Ok(Self {
            attribute_array_offset,
            attribute_index_offset,
            buffer_size_offset,
            buffer_stride_offset,
            buffer_array_offset,
            buffer_offset,
            section_index,
            vertex_count,
            skin_weight_influence,
            attributes,
            buffers,
        })
    }

    /// Look up an attribute by semantic tag.
    pub fn attribute(&self, name: &str) -> Option<&VertexAttribute> {
        self.attributes.iter().find(|a| a.name == name)
    }
}

fn read_attributes(r: &ByteCursor<'_>, offset: u64, count: u8) -> Result<Vec<VertexAttribute>> {
    let mut r = r.clone();
    let mut attributes = Vec::with_capacity(usize::from(count));
    for i in 0..u64::from(count) {
        r.seek_u64(offset + i * ATTRIBUTE_SIZE as u64)?;
        let name_offset = r.u32()? as usize;
        let name = r.cstring_at(name_offset + 2)?;
        r.skip(4)?;
        let format = r.u16_be()?;
        r.skip(2)?;
        let offset = r.u16()?;
        let buffer_index = r.u16()?;
        attributes.push(VertexAttribute {
            name,
            format,
            offset,
            buffer_index,
        });
    }
    Ok(attributes)
}

/// Every buffer must hold `vertex_count` whole vertices and lie inside the
/// file. Counts are otherwise unbounded header values.
fn check_buffer_bounds(buffers: &[VertexBuffer], vertex_count: u32, file_len: usize) -> Result<()> {
    if vertex_count > 0 && buffers.is_empty() {
        return Err(Error::MalformedHeader("vertices declared without a buffer"));
    }
    for buffer in buffers {
        if vertex_count > 0 && buffer.stride == 0 {
            return Err(Error::MalformedHeader("vertex buffer stride is zero"));
        }
        let needed = u64::from(buffer.stride) * u64::from(vertex_count);
        if needed > u64::from(buffer.size) {
            return Err(Error::MalformedHeader("vertex count exceeds buffer size"));
        }
        let end = buffer.data_offset.saturating_add(u64::from(buffer.size));
        if end > file_len as u64 {
            return Err(Error::MalformedHeader("vertex buffer extends past end of file"));
        }
    }
    Ok(())
}

/// Buffer data is packed back to back after `base`, each buffer starting on
/// an 8-byte boundary.
fn read_buffers(
    r: &ByteCursor<'_>,
    base: u64,
    size_offset: u64,
    stride_offset: u64,
    count: u8,
) -> Result<Vec<VertexBuffer>> {
    let mut r = r.clone();
    let mut buffers: Vec<VertexBuffer> = Vec::with_capacity(usize::from(count));
    for i in 0..u64::from(count) {
        r.seek_u64(size_offset + i * BUFFER_INFO_STRIDE)?;
        let size = r.u32()?;
        r.seek_u64(stride_offset + i * BUFFER_INFO_STRIDE)?;
        let stride = r.u32()?;

        let start = match buffers.last() {
            Some(prev) => prev.data_offset + u64::from(prev.size),
            None => base,
        };
        buffers.push(VertexBuffer {
            size,
            stride,
            data_offset: align_up(start, BUFFER_ALIGNMENT),
        });
    }
    Ok(buffers)
}
