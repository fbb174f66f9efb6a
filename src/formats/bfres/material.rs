//! FMAT - material.
//!
//! ## FMAT record (0xB8 bytes)
//! ```text
//! [0x00] Magic "FMAT" + padding              (16 bytes)
//! [0x10] NameOffset (string at +2)           (u32)
//! [0x14] Padding                             (u32)
//! [0x18] RenderInfoOffset                    (u64)
//! [0x20] RenderInfoIndexOffset               (u64)
//! [0x28] ShaderAssignOffset                  (u64)
//! [0x30] Unknown                             (u64)
//! [0x38] TextureSelectorOffset               (u64)  u64 name pointers
//! [0x40] Unknown                             (u64)
//! [0x48] TextureAttributeSelectorOffset      (u64)
//! [0x50] TextureAttributeIndexOffset         (u64)
//! [0x58] MaterialParamArrayOffset            (u64)
//! [0x60] MaterialParamIndexOffset            (u64)
//! [0x68] MaterialParamOffset                 (u64)
//! [0x70] UserDataOffset                      (u64)
//! [0x78] UserDataIndexOffset                 (u64)
//! [0x80] VolatileFlagOffset                  (u64)
//! [0x88] Unknown                             (u64)
//! [0x90] SamplerSlotOffset                   (u64)
//! [0x98] TextureSlotOffset                   (u64)
//! [0xA0] Flags                               (u32)
//! [0xA4] SectionIndex                        (u16)
//! [0xA6] RenderParamCount                    (u16)
//! [0xA8] TextureSelectorCount                (u8)
//! [0xA9] TextureAttributeSelectorCount       (u8)
//! [0xAA] MaterialParamCount                  (u16)
//! [0xAC] Unknown                             (u16)
//! [0xAE] MaterialParamSize                   (u16)
//! [0xB0] RawParamDataSize                    (u16)
//! [0xB2] UserDataCount                       (u16)
//! [0xB4] Padding                             (u32)
//! ```

use tracing::trace;

use crate::cursor::ByteCursor;
use crate::{Error, Result};

#[derive(Debug, Clone, Default)]
pub struct Material {
    pub name: String,
    /// Visibility and misc flags.
    pub flags: u32,
    pub section_index: u16,
    pub render_info_offset: u64,
    pub render_info_index_offset: u64,
    pub shader_assign_offset: u64,
    pub texture_selector_offset: u64,
    pub texture_attribute_selector_offset: u64,
    pub texture_attribute_index_offset: u64,
    pub material_param_array_offset: u64,
    pub material_param_index_offset: u64,
    pub material_param_offset: u64,
    pub user_data_offset: u64,
    pub user_data_index_offset: u64,
    pub volatile_flag_offset: u64,
    pub sampler_slot_offset: u64,
    pub texture_slot_offset: u64,
    pub render_param_count: u16,
    pub texture_selector_count: u8,
    pub texture_attribute_selector_count: u8,
    pub material_param_count: u16,
    pub material_param_size: u16,
    pub raw_param_data_size: u16,
    pub user_data_count: u16,
    /// Referenced texture names, lower-cased, in selector order.
    pub texture_names: Vec<String>,
}

impl Material {
    pub(crate) fn parse(r: &mut ByteCursor<'_>) -> Result<Self> {
        r.magic(b"FMAT")?;
        r.skip(12)?;
        let name_offset = r.u32()? as usize;
        let name = r.cstring_at(name_offset + 2)?;
        r.skip(4)?;

        let mut m = Material {
            name,
            ..Default::default()
        };
        m.render_info_offset = r.u64()?;
        m.render_info_index_offset = r.u64()?;
        m.shader_assign_offset = r.u64()?;
        r.skip(8)?;
        m.texture_selector_offset = r.u64()?;
        r.skip(8)?;
        m.texture_attribute_selector_offset = r.u64()?;
        m.texture_attribute_index_offset = r.u64()?;
        m.material_param_array_offset = r.u64()?;
        m.material_param_index_offset = r.u64()?;
        m.material_param_offset = r.u64()?;
        m.user_data_offset = r.u64()?;
        m.user_data_index_offset = r.u64()?;
        m.volatile_flag_offset = r.u64()?;
        r.skip(8)?;
        m.sampler_slot_offset = r.u64()?;
        m.texture_slot_offset = r.u64()?;
        m.flags = r.u32()?;
        m.section_index = r.u16()?;
        m.render_param_count = r.u16()?;
        m.texture_selector_count = r.u8()?;
        m.texture_attribute_selector_count = r.u8()?;
        m.material_param_count = r.u16()?;
        r.skip(2)?;
        m.material_param_size = r.u16()?;
        m.raw_param_data_size = r.u16()?;
        m.user_data_count = r.u16()?;
        r.skip(4)?;

        // The selector table is walked with the attribute selector count.
        let mut t = r.clone();
        t.seek_u64(m.texture_selector_offset)?;
        for _ in 0..m.texture_attribute_selector_count {
            let ptr = usize::try_from(t.u64()?)
                .map_err(|_| Error::UnresolvedReference("texture name offset"))?;
            let name = t.cstring_at(ptr.saturating_add(2))?;
            m.texture_names.push(name.to_lowercase());
        }

        trace!(material = %m.name, textures = ?m.texture_names, "FMAT");
        Ok(m)
    }

    /// First referenced texture, if any.
    pub fn primary_texture(&self) -> Option<&str> {
        self.texture_names.first().map(String::as_str)
    }
}
