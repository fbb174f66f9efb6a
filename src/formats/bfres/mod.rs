//! BFRES (Binary caFe RESource) - Switch model container.
//!
//! Only the Switch revision is understood: the word after the magic must be
//! `0x20202020`. A BFRES bundles models (FMDL), animations and embedded
//! files; embedded files that are BNTX texture containers are parsed too.
//!
//! ## Header
//! ```text
//! [0x00] Magic "FRES"                        (4 bytes)
//! [0x04] Platform marker 0x20202020          (u32 BE)
//! [0x08] Version bytes d, c, b, a            (4 × u8)
//! [0x0C] BOM (0xFEFF=BE, 0xFFFE=LE)          (raw bytes)
//! [0x0E] HeaderSize                          (u16)
//! [0x10] NameOffset (null-terminated)        (u32)
//! [0x14] Alignment                           (u32)
//! [0x18] RelocationTableOffset               (u32)
//! [0x1C] FileSize                            (u32)
//! [0x20] Name offset (again) + padding       (8 bytes)
//! [0x28] Section offsets                     (16 × u64)
//!          model offset / dict, skeletal anim, material anim,
//!          bone visibility anim, shape anim, scene anim,
//!          buffer memory pool / pool info, embedded files / dict
//! [0xA8] Padding                             (8 bytes)
//! [0xB0] StringTableOffset                   (u64)
//! [0xB8] StringTableSize                     (u32)
//! [0xBC] Counts: model, skeletal anim, material anim, bone visibility
//!        anim, shape anim, scene anim, embedded file (7 × u16)
//! [0xCA] Padding                             (12 bytes)
//! ```
//!
//! ## Relocation table
//! ```text
//! [+0x00] Header                             (0x30 bytes)
//! [+0x30] DataStart                          (u32)
//! ```
//! `DataStart` is the base that vertex and index buffer offsets are
//! relative to.
//!
//! Embedded files are 16-byte descriptors whose first `u32` is the file's
//! absolute offset. Models are fixed 0x78-byte records laid out back to
//! back from the model offset.

mod material;
mod model;
mod shape;
mod skeleton;
mod vertex;

pub use material::Material;
pub use model::Model;
pub use shape::{LodMesh, Shape};
pub use skeleton::Skeleton;
pub use vertex::{VertexAttribute, VertexBuffer, VertexBufferSet};

use std::fmt;

use byteorder::{BigEndian, ByteOrder};
use tracing::{debug, warn};

use crate::cursor::{ByteCursor, Endian};
use crate::formats::bntx::{Bntx, Texture};
use crate::{Error, Result};

/// Marks the Switch revision of the format.
pub const SWITCH_MARKER: u32 = 0x2020_2020;

/// Stride of one embedded file descriptor.
const EMBEDDED_FILE_STRIDE: u64 = 0x10;

/// Four-part container version, `major.minor.micro.build`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Version {
    pub major: u8,
    pub minor: u8,
    pub micro: u8,
    pub build: u8,
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}.{}", self.major, self.minor, self.micro, self.build)
    }
}

/// Base offset for buffer data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelocationTable {
    pub data_start: u32,
}

impl RelocationTable {
    /// Bytes between the table start and the `DataStart` field.
    pub const DATA_START_OFFSET: usize = 0x30;

    fn parse(r: &ByteCursor<'_>, offset: usize) -> Result<Self> {
        let mut r = r.at(offset)?;
        r.skip(Self::DATA_START_OFFSET)?;
        Ok(Self {
            data_start: r.u32()?,
        })
    }
}

/// Offset, dictionary offset and entry count of one resource category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Section {
    pub offset: u64,
    pub dict: u64,
    pub count: u16,
}

/// The header's resource directory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SectionTable {
    pub models: Section,
    pub skeletal_anims: Section,
    pub material_anims: Section,
    pub bone_visibility_anims: Section,
    pub shape_anims: Section,
    pub scene_anims: Section,
    pub embedded_files: Section,
    pub buffer_memory_pool: u64,
    pub buffer_memory_pool_info: u64,
    pub string_table_offset: u64,
    pub string_table_size: u32,
}

/// Values every record parser needs from the file header.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Context {
    pub version: Version,
    pub data_start: u64,
}

/// A parsed BFRES file.
///
/// Borrows the source buffer: vertex and index data are decoded on demand
/// by [`crate::mesh`].
#[derive(Debug, Clone)]
pub struct ResFile<'a> {
    pub name: String,
    pub version: Version,
    pub endian: Endian,
    pub header_size: u16,
    pub alignment: u32,
    pub file_size: u32,
    pub relocation_table: RelocationTable,
    pub sections: SectionTable,
    /// Embedded BNTX containers, in descriptor order.
    pub textures: Vec<Bntx>,
    pub models: Vec<Model>,
    data: &'a [u8],
}

impl<'a> ResFile<'a> {
    /// Size of one FMDL record.
    pub const MODEL_STRIDE: u64 = 0x78;

    /// Parse a BFRES file.
    ///
    /// Embedded textures are parsed first, then every model. Within a
    /// model, vertex buffers, materials and the skeleton are resolved
    /// before shapes, which refer back to all three.
    pub fn parse(data: &'a [u8]) -> Result<Self> {
        let mut r = ByteCursor::new(data, Endian::Big);
        r.magic(b"FRES")?;
        let marker = r.u32_be()?;
        if marker != SWITCH_MARKER {
            return Err(Error::UnsupportedRevision(marker));
        }

        let [build, micro, minor, major] = r.bytes::<4>()?;
        let version = Version {
            major,
            minor,
            micro,
            build,
        };

        let endian =
            Endian::from_bom(r.u16_be()?).ok_or(Error::MalformedHeader("invalid BFRES BOM"))?;
        r.set_endian(endian);

        let header_size = r.u16()?;
        let name_offset = r.u32()? as usize;
        let name = r.cstring_at(name_offset)?;
        let alignment = r.u32()?;
        let reloc_offset = r.u32()? as usize;
        let file_size = r.u32()?;
        if file_size as usize != data.len() {
            return Err(Error::SizeMismatch {
                declared: u64::from(file_size),
                actual: data.len() as u64,
            });
        }

        let relocation_table = RelocationTable::parse(&r, reloc_offset)?;

        r.skip(8)?;
        let mut sections = SectionTable::default();
        for section in [
            &mut sections.models,
            &mut sections.skeletal_anims,
            &mut sections.material_anims,
            &mut sections.bone_visibility_anims,
            &mut sections.shape_anims,
            &mut sections.scene_anims,
        ] {
            section.offset = r.u64()?;
            section.dict = r.u64()?;
        }
        sections.buffer_memory_pool = r.u64()?;
        sections.buffer_memory_pool_info = r.u64()?;
        sections.embedded_files.offset = r.u64()?;
        sections.embedded_files.dict = r.u64()?;
        r.skip(8)?;
        sections.string_table_offset = r.u64()?;
        sections.string_table_size = r.u32()?;
        for section in [
            &mut sections.models,
            &mut sections.skeletal_anims,
            &mut sections.material_anims,
            &mut sections.bone_visibility_anims,
            &mut sections.shape_anims,
            &mut sections.scene_anims,
            &mut sections.embedded_files,
        ] {
            section.count = r.u16()?;
        }
        r.skip(12)?;

        debug!(
            file = %name,
            %version,
            ?endian,
            models = sections.models.count,
            embedded = sections.embedded_files.count,
            "parsed BFRES header"
        );

        let ctx = Context {
            version,
            data_start: u64::from(relocation_table.data_start),
        };

        let textures = parse_embedded_textures(&mut r, &sections.embedded_files)?;

        let mut models = Vec::with_capacity(usize::from(sections.models.count));
        for i in 0..u64::from(sections.models.count) {
            r.seek_u64(sections.models.offset + i * Self::MODEL_STRIDE)?;
            models.push(Model::parse(&mut r, &ctx)?);
        }

        Ok(Self {
            name,
            version,
            endian,
            header_size,
            alignment,
            file_size,
            relocation_table,
            sections,
            textures,
            models,
            data,
        })
    }

    /// The buffer this file was parsed from.
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// A cursor over the source buffer in this file's byte order.
    pub fn cursor(&self) -> ByteCursor<'a> {
        ByteCursor::new(self.data, self.endian)
    }

    /// Find a model by name.
    pub fn model(&self, name: &str) -> Option<&Model> {
        self.models.iter().find(|m| m.name == name)
    }

    /// Every texture of every embedded BNTX, in file order.
    pub fn all_textures(&self) -> impl Iterator<Item = &Texture> {
        self.textures.iter().flat_map(|b| b.textures.iter())
    }
}

fn parse_embedded_textures(r: &mut ByteCursor<'_>, section: &Section) -> Result<Vec<Bntx>> {
    let data = r.data();
    let mut textures = Vec::new();
    for i in 0..u64::from(section.count) {
        r.seek_u64(section.offset + i * EMBEDDED_FILE_STRIDE)?;
        let offset = r.u32()? as usize;
        let is_bntx = data
            .get(offset..)
            .is_some_and(|tail| tail.starts_with(b"BNTX"));
        if !is_bntx {
            let magic = data.get(offset..offset.saturating_add(4)).unwrap_or_default();
            warn!(index = i, offset, ?magic, "skipping embedded file that is not BNTX");
            continue;
        }
        textures.push(Bntx::parse(&data[offset..])?);
    }
    Ok(textures)
}

/// Read the BOM of a BFRES buffer without parsing anything else.
pub fn endian_of(data: &[u8]) -> Result<Endian> {
    let bom = data
        .get(0x0C..0x0E)
        .map(BigEndian::read_u16)
        .ok_or(Error::MalformedHeader("truncated BFRES header"))?;
    Endian::from_bom(bom).ok_or(Error::MalformedHeader("invalid BFRES BOM"))
}
