//! FMDL - model.
//!
//! ## FMDL record (0x78 bytes)
//! ```text
//! [0x00] Magic "FMDL"                        (4 bytes)
//! [0x04] HeaderLength                        (u32)
//! [0x08] HeaderLength (again)                (u32)
//! [0x0C] Padding                             (u32)
//! [0x10] NameOffset (string at +2)           (u32)
//! [0x14] Padding                             (u32)
//! [0x18] EndOfStringTable                    (u64)
//! [0x20] SkeletonOffset                      (u64)
//! [0x28] VertexBufferArrayOffset             (u64)  FvtxCount × 0x60
//! [0x30] ShapeArrayOffset                    (u64)  FshpCount × 0x70
//! [0x38] ShapeDictOffset                     (u64)
//! [0x40] MaterialArrayOffset                 (u64)  FmatCount × 0xB8
//! [0x48] MaterialDictOffset                  (u64)
//! [0x50] UserDataOffset                      (u64)
//! [0x58] Padding                             (16 bytes)
//! [0x68] FvtxCount                           (u16)
//! [0x6A] FshpCount                           (u16)
//! [0x6C] FmatCount                           (u16)
//! [0x6E] UserDataCount                       (u16)
//! [0x70] TotalVertexCount                    (u32)
//! [0x74] Unknown                             (u32)
//! ```

use tracing::debug;

use super::Context;
use super::material::Material;
use super::shape::Shape;
use super::skeleton::Skeleton;
use super::vertex::VertexBufferSet;
use crate::cursor::ByteCursor;
use crate::{Error, Result};

#[derive(Debug, Clone)]
pub struct Model {
    pub name: String,
    pub string_table_end: u64,
    pub skeleton_offset: u64,
    pub vertex_buffer_array_offset: u64,
    pub shape_array_offset: u64,
    pub shape_dict_offset: u64,
    pub material_array_offset: u64,
    pub material_dict_offset: u64,
    pub user_data_offset: u64,
    pub user_data_count: u16,
    /// Sum of the vertex counts of every buffer set.
    pub total_vertex_count: u32,
    pub vertex_buffers: Vec<VertexBufferSet>,
    pub materials: Vec<Material>,
    pub skeleton: Skeleton,
    pub shapes: Vec<Shape>,
}

impl Model {
    pub(crate) fn parse(r: &mut ByteCursor<'_>, ctx: &Context) -> Result<Self> {
        r.magic(b"FMDL")?;
        let _header_length = r.u32()?;
        let _header_length2 = r.u32()?;
        r.skip(4)?;
        let name_offset = r.u32()? as usize;
        let name = r.cstring_at(name_offset + 2)?;
        r.skip(4)?;
        let string_table_end = r.u64()?;
        let skeleton_offset = r.u64()?;
        let vertex_buffer_array_offset = r.u64()?;
        let shape_array_offset = r.u64()?;
        let shape_dict_offset = r.u64()?;
        let material_array_offset = r.u64()?;
        let material_dict_offset = r.u64()?;
        let user_data_offset = r.u64()?;
        r.skip(16)?;
        let vertex_buffer_count = r.u16()?;
        let shape_count = r.u16()?;
        let material_count = r.u16()?;
        let user_data_count = r.u16()?;
        let total_vertex_count = r.u32()?;
        r.skip(4)?;

        // Sub-records are contiguous arrays; each parser leaves the cursor
        // on the next record.
        let mut sub = r.clone();

        sub.seek_u64(vertex_buffer_array_offset)?;
        let vertex_buffers = (0..vertex_buffer_count)
            .map(|_| VertexBufferSet::parse(&mut sub, ctx))
            .collect::<Result<Vec<_>>>()?;

        sub.seek_u64(material_array_offset)?;
        let materials = (0..material_count)
            .map(|_| Material::parse(&mut sub))
            .collect::<Result<Vec<_>>>()?;

        sub.seek_u64(skeleton_offset)?;
        let skeleton = Skeleton::parse(&mut sub, ctx)?;

        sub.seek_u64(shape_array_offset)?;
        let shapes = (0..shape_count)
            .map(|_| Shape::parse(&mut sub, ctx))
            .collect::<Result<Vec<_>>>()?;

        for shape in &shapes {
            if usize::from(shape.vertex_buffer_index) >= vertex_buffers.len() {
                return Err(Error::UnresolvedReference("shape vertex buffer index"));
            }
            if usize::from(shape.material_index) >= materials.len() {
                return Err(Error::UnresolvedReference("shape material index"));
            }
        }

        debug!(
            model = %name,
            vertex_buffers = vertex_buffers.len(),
            materials = materials.len(),
            shapes = shapes.len(),
            total_vertex_count,
            "parsed FMDL"
        );
        Ok(Self {
            name,
            string_table_end,
            skeleton_offset,
            vertex_buffer_array_offset,
            shape_array_offset,
            shape_dict_offset,
            material_array_offset,
            material_dict_offset,
            user_data_offset,
            user_data_count,
            total_vertex_count,
            vertex_buffers,
            materials,
            skeleton,
            shapes,
        })
    }

    /// The vertex buffer set a shape draws from.
    pub fn vertex_buffer_for(&self, shape: &Shape) -> Option<&VertexBufferSet> {
        self.vertex_buffers.get(usize::from(shape.vertex_buffer_index))
    }

    /// The material a shape is drawn with.
    pub fn material_for(&self, shape: &Shape) -> Option<&Material> {
        self.materials.get(usize::from(shape.material_index))
    }

    pub fn shape(&self, name: &str) -> Option<&Shape> {
        self.shapes.iter().find(|s| s.name == name)
    }
}
