//! FSHP - shape (polygon group).
//!
//! ## FSHP record (0x70 bytes)
//! ```text
//! [0x00] Magic "FSHP" + padding              (16 bytes)
//! [0x10] NameOffset (string at +2)           (u32)
//! [0x14] Unknown                             (u32)
//! [0x18] VertexBufferOffset                  (u64)
//! [0x20] LodArrayOffset                      (u64)  LodCount × 0x38
//! [0x28] SkinBoneIndexArrayOffset            (u64)
//! [0x30] Unknown                             (16 bytes)
//! [0x40] BoundingBoxOffset                   (u64)
//! [0x48] RadiusOffset                        (u64)
//! [0x50] Unknown                             (u64)
//! [0x58] Flags                               (u32)
//! [0x5C] SectionIndex                        (u16)
//! [0x5E] MaterialIndex                       (u16)
//! [0x60] SkeletonIndex                       (u16)
//! [0x62] VertexBufferIndex                   (u16)
//! [0x64] SkinBoneIndexCount                  (u16)
//! [0x66] MaterialFlag                        (u8)
//! [0x67] LodCount                            (u8)
//! [0x68] VisibilityGroupCount                (u32)
//! [0x6C] VisibilityGroupIndexOffset          (u16)
//! [0x6E] VisibilityGroupNodeOffset           (u16)
//! ```
//!
//! ## LOD mesh (0x38 bytes)
//! ```text
//! [0x00] SubMeshArrayOffset                  (u64)
//! [0x08] Unknown                             (16 bytes)
//! [0x18] IndexBufferOffset                   (u64)
//! [0x20] FaceBufferOffset (from DataStart)   (u32)
//! [0x24] PrimitiveType                       (u32)
//! [0x28] IndexFormat                         (u32)
//! [0x2C] IndexCount                          (u32)
//! [0x30] FirstVertex                         (u32)
//! [0x34] SubMeshCount                        (u32)
//! ```

use tracing::trace;

use super::Context;
use crate::cursor::ByteCursor;
use crate::{Error, Result};

/// One level of detail of a shape's index data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LodMesh {
    pub sub_mesh_offset: u64,
    pub index_buffer_offset: u64,
    /// Absolute offset of the index data.
    pub face_offset: u64,
    pub primitive_type: u32,
    /// 1 = `u16` indices, 2 = `u32` indices.
    pub index_format: u32,
    pub index_count: u32,
    /// Added to every index read from the buffer.
    pub first_vertex: u32,
    pub sub_mesh_count: u32,
}

impl LodMesh {
    pub const SIZE: u64 = 0x38;

    /// Bytes per index, or [`Error::UnsupportedFaceFormat`].
    pub fn index_size(&self) -> Result<usize> {
        match self.index_format {
            1 => Ok(2),
            2 => Ok(4),
            other => Err(Error::UnsupportedFaceFormat(other)),
        }
    }

    /// Number of whole triangles in this level.
    pub fn triangle_count(&self) -> u32 {
        self.index_count / 3
    }

    fn parse(r: &mut ByteCursor<'_>, ctx: &Context) -> Result<Self> {
        let sub_mesh_offset = r.u64()?;
        r.skip(16)?;
        let index_buffer_offset = r.u64()?;
        let face_buffer = r.u32()?;
        Ok(Self {
            sub_mesh_offset,
            index_buffer_offset,
            face_offset: ctx.data_start + u64::from(face_buffer),
            primitive_type: r.u32()?,
            index_format: r.u32()?,
            index_count: r.u32()?,
            first_vertex: r.u32()?,
            sub_mesh_count: r.u32()?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct Shape {
    pub name: String,
    pub flags: u32,
    pub section_index: u16,
    pub material_index: u16,
    pub skeleton_index: u16,
    pub vertex_buffer_index: u16,
    pub vertex_buffer_offset: u64,
    pub bounding_box_offset: u64,
    pub radius_offset: u64,
    pub material_flag: u8,
    pub visibility_group_count: u32,
    pub visibility_group_index_offset: u16,
    pub visibility_group_node_offset: u16,
    pub skin_bone_indices: Vec<u16>,
    /// Levels of detail, most detailed first.
    pub lods: Vec<LodMesh>,
}

impl Shape {
    pub(crate) fn parse(r: &mut ByteCursor<'_>, ctx: &Context) -> Result<Self> {
        r.magic(b"FSHP")?;
        r.skip(12)?;
        let name_offset = r.u32()? as usize;
        let name = r.cstring_at(name_offset + 2)?;
        r.skip(4)?;
        let vertex_buffer_offset = r.u64()?;
        let lod_offset = r.u64()?;
        let skin_index_offset = r.u64()?;
        r.skip(16)?;
        let bounding_box_offset = r.u64()?;
        let radius_offset = r.u64()?;
        r.skip(8)?;
        let flags = r.u32()?;
        let section_index = r.u16()?;
        let material_index = r.u16()?;
        let skeleton_index = r.u16()?;
        let vertex_buffer_index = r.u16()?;
        let skin_index_count = r.u16()?;
        let material_flag = r.u8()?;
        let lod_count = r.u8()?;
        let visibility_group_count = r.u32()?;
        let visibility_group_index_offset = r.u16()?;
        let visibility_group_node_offset = r.u16()?;

        let mut sub = r.clone();
        let skin_bone_indices = if skin_index_count == 0 {
            Vec::new()
        } else {
            sub.seek_u64(skin_index_offset)?;
            (0..skin_index_count)
                .map(|_| sub.u16())
                .collect::<Result<Vec<_>>>()?
        };

        let mut lods = Vec::with_capacity(usize::from(lod_count));
        for i in 0..u64::from(lod_count) {
            sub.seek_u64(lod_offset + i * LodMesh::SIZE)?;
            lods.push(LodMesh::parse(&mut sub, ctx)?);
        }

        trace!(shape = %name, lods = lods.len(), material_index, vertex_buffer_index, "FSHP");
        Ok(Self {
            name,
            flags,
            section_index,
            material_index,
            skeleton_index,
            vertex_buffer_index,
            vertex_buffer_offset,
            bounding_box_offset,
            radius_offset,
            material_flag,
            visibility_group_count,
            visibility_group_index_offset,
            visibility_group_node_offset,
            skin_bone_indices,
            lods,
        })
    }
}
