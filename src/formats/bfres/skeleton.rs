//! FSKL - skeleton.
//!
//! ```text
//! [0x00] Magic "FSKL" + padding              (16 bytes)
//! [0x10] BoneIndexOffset                     (u64)
//! [0x18] BoneArrayOffset                     (u64)
//! [0x20] InverseIndexArrayOffset             (u64)
//! [0x28] InverseMatrixArrayOffset            (u64)
//! [0x30] Padding                             (8 bytes, 24 unless minor == 8)
//! [....] Type                                (u32)
//!        BoneCount                           (u16)
//!        InverseIndexCount                   (u16)
//!        ExtraIndexCount                     (u16)
//!        Unknown                             (u32)
//! ```
//!
//! The node table (`InverseIndexCount + ExtraIndexCount` `u16`s at
//! `InverseIndexArrayOffset`) maps the bone indices stored in vertices to
//! skeleton bones.

use tracing::trace;

use super::Context;
use crate::Result;
use crate::cursor::ByteCursor;

/// Version minor whose skeleton record is 16 bytes shorter.
const SHORT_RECORD_MINOR: u8 = 8;

#[derive(Debug, Clone, Default)]
pub struct Skeleton {
    pub bone_index_offset: u64,
    pub bone_array_offset: u64,
    pub inverse_index_array_offset: u64,
    pub inverse_matrix_array_offset: u64,
    pub skeleton_type: u32,
    pub bone_count: u16,
    pub inverse_index_count: u16,
    pub extra_index_count: u16,
    /// Vertex bone index to bone mapping.
    pub node_indices: Vec<u16>,
}

impl Skeleton {
    pub(crate) fn parse(r: &mut ByteCursor<'_>, ctx: &Context) -> Result<Self> {
        r.magic(b"FSKL")?;
        r.skip(12)?;
        let bone_index_offset = r.u64()?;
        let bone_array_offset = r.u64()?;
        let inverse_index_array_offset = r.u64()?;
        let inverse_matrix_array_offset = r.u64()?;
        r.skip(if ctx.version.minor == SHORT_RECORD_MINOR { 8 } else { 24 })?;
        let skeleton_type = r.u32()?;
        let bone_count = r.u16()?;
        let inverse_index_count = r.u16()?;
        let extra_index_count = r.u16()?;
        r.skip(4)?;

        let node_count = usize::from(inverse_index_count) + usize::from(extra_index_count);
        let mut n = r.clone();
        n.seek_u64(inverse_index_array_offset)?;
        let node_indices = (0..node_count)
            .map(|_| n.u16())
            .collect::<Result<Vec<_>>>()?;

        trace!(bone_count, nodes = node_indices.len(), "FSKL");
        Ok(Self {
            bone_index_offset,
            bone_array_offset,
            inverse_index_array_offset,
            inverse_matrix_array_offset,
            skeleton_type,
            bone_count,
            inverse_index_count,
            extra_index_count,
            node_indices,
        })
    }

    /// Map a bone index read from a vertex through the node table.
    pub fn resolve_node(&self, index: u32) -> Option<u16> {
        self.node_indices.get(index as usize).copied()
    }
}
