//! Mesh assembly: turns BFRES shapes into indexed triangle meshes.
//!
//! Each [`Shape`] becomes one [`Mesh`]. Vertices are decoded from the
//! shape's vertex buffer set by looking every attribute up in a
//! `(semantic tag, format code)` table; pairs the table does not know are
//! skipped rather than rejected, since attribute layouts vary between
//! files. Faces come from a single level of detail chosen by
//! [`LodPolicy`].
//!
//! See [`obj`] for rendering meshes as Wavefront OBJ/MTL.

pub mod obj;

use tracing::{debug, trace, warn};

use crate::cursor::ByteCursor;
use crate::formats::bfres::{Model, ResFile, Shape, Skeleton, VertexAttribute, VertexBufferSet};
use crate::numeric::{f16_to_f32, unpack_snorm_10_10_10_2};
use crate::{Error, Result};

/// Vertex attribute format codes (layout in the high byte, component
/// type in the low byte, as stored big-endian in the file).
pub mod format {
    pub const UNORM_8: u16 = 0x0102;
    pub const UNORM_8_8: u16 = 0x0109;
    pub const UNORM_8_8_8_8: u16 = 0x010B;
    pub const UNORM_16_16: u16 = 0x0112;
    pub const SNORM_8_8: u16 = 0x0209;
    pub const SNORM_8_8_8_8: u16 = 0x020B;
    pub const SNORM_10_10_10_2: u16 = 0x020E;
    pub const SNORM_16_16: u16 = 0x0212;
    pub const UINT_8: u16 = 0x0302;
    pub const UINT_8_8: u16 = 0x0309;
    pub const UINT_8_8_8_8: u16 = 0x030B;
    pub const HALF_16_16: u16 = 0x0512;
    pub const HALF_16_16_16_16: u16 = 0x0515;
    pub const FLOAT_32_32: u16 = 0x0517;
    pub const FLOAT_32_32_32: u16 = 0x0518;
    pub const FLOAT_32_32_32_32: u16 = 0x0813;
}

/// Which level of detail contributes faces.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LodPolicy {
    First,
    /// The least detailed level, matching what existing exports contain.
    #[default]
    Last,
}

/// Which of a material's texture references a mesh records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TexturePolicy {
    /// Only the first selector entry.
    #[default]
    First,
    /// Every selector entry; the first is still the one drawn with.
    All,
}

/// Knobs for [`assemble`] and [`obj::export`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOptions {
    pub lod: LodPolicy,
    pub textures: TexturePolicy,
    /// Material used by meshes with no texture reference.
    pub fallback_material: String,
    /// Directory texture side files are expected in, relative to the MTL.
    pub texture_dir: String,
    pub texture_extension: String,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            lod: LodPolicy::default(),
            textures: TexturePolicy::default(),
            fallback_material: "EmptyMat".to_owned(),
            texture_dir: "textures".to_owned(),
            texture_extension: "bmp".to_owned(),
        }
    }
}

impl ExportOptions {
    /// Side-file path for a texture, e.g. `textures/body_alb.bmp`.
    pub fn texture_path(&self, name: &str) -> String {
        format!("{}/{}.{}", self.texture_dir, name, self.texture_extension)
    }
}

/// One decoded vertex.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    /// UV channels in attribute order.
    pub uvs: Vec<[f32; 2]>,
    pub color: Option<[f32; 4]>,
    pub bone_indices: Vec<u32>,
    pub bone_weights: Vec<f32>,
}

impl Vertex {
    /// The first UV channel, if any.
    pub fn uv(&self) -> Option<[f32; 2]> {
        self.uvs.first().copied()
    }
}

/// An indexed triangle mesh built from one shape.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    pub name: String,
    pub vertices: Vec<Vertex>,
    /// Zero-based vertex indices.
    pub faces: Vec<[u32; 3]>,
    pub texture_names: Vec<String>,
}

impl Mesh {
    /// Material this mesh is drawn with.
    pub fn material<'a>(&'a self, options: &'a ExportOptions) -> &'a str {
        self.texture_names
            .first()
            .map_or(options.fallback_material.as_str(), String::as_str)
    }
}

/// Assemble every shape of every model.
pub fn assemble(res: &ResFile<'_>, options: &ExportOptions) -> Result<Vec<Mesh>> {
    let mut meshes = Vec::new();
    for model in &res.models {
        meshes.extend(assemble_model(res, model, options)?);
    }
    Ok(meshes)
}

/// Assemble the shapes of one model, in shape order.
pub fn assemble_model(
    res: &ResFile<'_>,
    model: &Model,
    options: &ExportOptions,
) -> Result<Vec<Mesh>> {
    let meshes = model
        .shapes
        .iter()
        .map(|shape| assemble_shape(res, model, shape, options))
        .collect::<Result<Vec<_>>>()?;
    debug!(model = %model.name, meshes = meshes.len(), "assembled model");
    Ok(meshes)
}

fn assemble_shape(
    res: &ResFile<'_>,
    model: &Model,
    shape: &Shape,
    options: &ExportOptions,
) -> Result<Mesh> {
    let set = model
        .vertex_buffer_for(shape)
        .ok_or(Error::UnresolvedReference("shape vertex buffer index"))?;
    let material = model
        .material_for(shape)
        .ok_or(Error::UnresolvedReference("shape material index"))?;

    let mut r = res.cursor();
    let vertices = read_vertices(&mut r, set, &model.skeleton)?;
    let faces = read_faces(&mut r, shape, vertices.len(), options.lod)?;

    let texture_names = match options.textures {
        TexturePolicy::First => material.texture_names.iter().take(1).cloned().collect(),
        TexturePolicy::All => material.texture_names.clone(),
    };

    trace!(
        shape = %shape.name,
        vertices = vertices.len(),
        faces = faces.len(),
        "assembled shape"
    );
    Ok(Mesh {
        name: shape.name.clone(),
        vertices,
        faces,
        texture_names,
    })
}

fn read_vertices(
    r: &mut ByteCursor<'_>,
    set: &VertexBufferSet,
    skeleton: &Skeleton,
) -> Result<Vec<Vertex>> {
    let decoders: Vec<(&VertexAttribute, Decoder)> = set
        .attributes
        .iter()
        .filter_map(|attr| match Decoder::lookup(&attr.name, attr.format) {
            Some(d) => Some((attr, d)),
            None => {
                debug!(
                    attribute = %attr.name,
                    format = format_args!("{:#06x}", attr.format),
                    "skipping unsupported vertex attribute"
                );
                None
            }
        })
        .collect();

    let mut vertices = Vec::with_capacity(set.vertex_count.min(0x1_0000) as usize);
    for v in 0..u64::from(set.vertex_count) {
        let mut vertex = Vertex::default();
        for (attr, decoder) in &decoders {
            let buffer = set
                .buffers
                .get(usize::from(attr.buffer_index))
                .ok_or(Error::UnresolvedReference("vertex attribute buffer index"))?;
            r.seek_u64(buffer.data_offset + u64::from(attr.offset) + u64::from(buffer.stride) * v)?;
            decoder.decode(r, &mut vertex, skeleton)?;
        }
        vertices.push(vertex);
    }
    Ok(vertices)
}

fn read_faces(
    r: &mut ByteCursor<'_>,
    shape: &Shape,
    vertex_count: usize,
    policy: LodPolicy,
) -> Result<Vec<[u32; 3]>> {
    let lod = match policy {
        LodPolicy::First => shape.lods.first(),
        LodPolicy::Last => shape.lods.last(),
    };
    let Some(lod) = lod else {
        return Ok(Vec::new());
    };

    let wide = lod.index_size()? == 4;
    r.seek_u64(lod.face_offset)?;

    let mut next = || -> Result<u32> {
        let raw = if wide { r.u32()? } else { u32::from(r.u16()?) };
        raw.checked_add(lod.first_vertex)
            .filter(|&i| (i as usize) < vertex_count)
            .ok_or(Error::UnresolvedReference("face index outside vertex buffer"))
    };

    (0..lod.triangle_count())
        .map(|_| -> Result<[u32; 3]> { Ok([next()?, next()?, next()?]) })
        .collect()
}

/// How one `(tag, format)` pair is decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Decoder {
    PositionHalf,
    PositionFloat,
    NormalPacked,
    ColorHalf,
    ColorFloat,
    ColorUnorm8,
    TexCoordUnorm8,
    TexCoordUnorm16,
    TexCoordSnorm16,
    TexCoordHalf,
    TexCoordFloat,
    /// A single bone with an implied weight of 1.
    RigidIndex,
    Indices(usize),
    Weights(usize),
    /// Two 16-bit weights, historically scaled by 1/255.
    WeightsU16,
}

impl Decoder {
    fn lookup(tag: &str, fmt: u16) -> Option<Self> {
        use self::format::*;
        use Decoder::*;

        let decoder = match (tag, fmt) {
            ("_p0", HALF_16_16_16_16) => PositionHalf,
            ("_p0", FLOAT_32_32_32) => PositionFloat,
            ("_n0", SNORM_10_10_10_2) => NormalPacked,
            ("_c0", HALF_16_16_16_16) => ColorHalf,
            ("_c0", FLOAT_32_32_32_32) => ColorFloat,
            ("_c0", UNORM_8_8_8_8) => ColorUnorm8,
            ("_i0", UINT_8) => RigidIndex,
            ("_i0", UINT_8_8) => Indices(2),
            ("_i0", UINT_8_8_8_8 | SNORM_8_8_8_8) => Indices(4),
            ("_w0", UNORM_8) => Weights(1),
            ("_w0", UNORM_8_8) => Weights(2),
            ("_w0", UNORM_8_8_8_8) => Weights(4),
            ("_w0", UNORM_16_16) => WeightsU16,
            (tag, fmt) if is_uv_tag(tag) => match fmt {
                UNORM_8_8 | SNORM_8_8 => TexCoordUnorm8,
                UNORM_16_16 => TexCoordUnorm16,
                SNORM_16_16 => TexCoordSnorm16,
                HALF_16_16 => TexCoordHalf,
                FLOAT_32_32 => TexCoordFloat,
                _ => return None,
            },
            _ => return None,
        };
        Some(decoder)
    }

    fn decode(self, r: &mut ByteCursor<'_>, v: &mut Vertex, skeleton: &Skeleton) -> Result<()> {
        use Decoder::*;

        match self {
            PositionHalf => v.position = halves(r)?,
            PositionFloat => v.position = floats(r)?,
            NormalPacked => v.normal = unpack_snorm_10_10_10_2(r.u32()?),
            ColorHalf => v.color = Some(halves(r)?),
            ColorFloat => v.color = Some(floats(r)?),
            ColorUnorm8 => v.color = Some(unorm8(r)?),
            TexCoordUnorm8 => v.uvs.push(unorm8(r)?),
            TexCoordUnorm16 => {
                let [u, s] = [r.u16()?, r.u16()?];
                v.uvs.push([f32::from(u) / 65535.0, f32::from(s) / 65535.0]);
            }
            TexCoordSnorm16 => {
                let [u, s] = [r.i16()?, r.i16()?];
                v.uvs.push([f32::from(u) / 32767.0, f32::from(s) / 32767.0]);
            }
            TexCoordHalf => v.uvs.push(halves(r)?),
            TexCoordFloat => v.uvs.push(floats(r)?),
            RigidIndex => {
                push_bone(r.u8()?, v, skeleton);
                v.bone_weights.push(1.0);
            }
            Indices(n) => {
                for _ in 0..n {
                    push_bone(r.u8()?, v, skeleton);
                }
            }
            Weights(n) => {
                for _ in 0..n {
                    v.bone_weights.push(f32::from(r.u8()?) / 255.0);
                }
            }
            WeightsU16 => {
                for _ in 0..2 {
                    v.bone_weights.push(f32::from(r.u16()?) / 255.0);
                }
            }
        }
        Ok(())
    }
}

fn is_uv_tag(tag: &str) -> bool {
    matches!(tag, "_u0" | "_u1" | "_u2" | "_u3" | "_b0" | "_t0" | "color")
}

fn push_bone(raw: u8, v: &mut Vertex, skeleton: &Skeleton) {
    let index = match skeleton.resolve_node(u32::from(raw)) {
        Some(bone) => u32::from(bone),
        None => {
            warn!(index = raw, "bone index outside skeleton node table");
            u32::from(raw)
        }
    };
    v.bone_indices.push(index);
}

fn halves<const N: usize>(r: &mut ByteCursor<'_>) -> Result<[f32; N]> {
    let mut out = [0.0; N];
    for c in &mut out {
        *c = f16_to_f32(r.u16()?);
    }
    Ok(out)
}

fn floats<const N: usize>(r: &mut ByteCursor<'_>) -> Result<[f32; N]> {
    let mut out = [0.0; N];
    for c in &mut out {
        *c = r.f32()?;
    }
    Ok(out)
}

fn unorm8<const N: usize>(r: &mut ByteCursor<'_>) -> Result<[f32; N]> {
    let mut out = [0.0; N];
    for c in &mut out {
        *c = f32::from(r.u8()?) / 255.0;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cursor::Endian;
    use rstest::rstest;

    fn skeleton(nodes: &[u16]) -> Skeleton {
        Skeleton {
            node_indices: nodes.to_vec(),
            ..Default::default()
        }
    }

    fn decode(tag: &str, fmt: u16, bytes: &[u8]) -> Vertex {
        let decoder = Decoder::lookup(tag, fmt).unwrap();
        let mut r = ByteCursor::new(bytes, Endian::Little);
        let mut v = Vertex::default();
        decoder.decode(&mut r, &mut v, &skeleton(&[10, 11, 12])).unwrap();
        v
    }

    #[rstest]
    #[case::position_half("_p0", format::HALF_16_16_16_16, Decoder::PositionHalf)]
    #[case::normal("_n0", format::SNORM_10_10_10_2, Decoder::NormalPacked)]
    #[case::uv_bitangent("_b0", format::HALF_16_16, Decoder::TexCoordHalf)]
    #[case::uv_named_color("color", format::UNORM_8_8, Decoder::TexCoordUnorm8)]
    #[case::indices_snorm("_i0", format::SNORM_8_8_8_8, Decoder::Indices(4))]
    #[case::weights_legacy("_w0", format::UNORM_16_16, Decoder::WeightsU16)]
    fn lookup_table(#[case] tag: &str, #[case] fmt: u16, #[case] expected: Decoder) {
        assert_eq!(Decoder::lookup(tag, fmt), Some(expected));
    }

    #[rstest]
    #[case("_p0", format::UNORM_8_8)]
    #[case("_n0", format::FLOAT_32_32_32)]
    #[case("_x0", format::FLOAT_32_32)]
    #[case("_u0", format::FLOAT_32_32_32)]
    fn unknown_pairs_are_skipped(#[case] tag: &str, #[case] fmt: u16) {
        assert_eq!(Decoder::lookup(tag, fmt), None);
    }

    #[test]
    fn decodes_float_position() {
        let mut b = Vec::new();
        for f in [1.0f32, -2.5, 0.25] {
            b.extend_from_slice(&f.to_le_bytes());
        }
        assert_eq!(decode("_p0", format::FLOAT_32_32_32, &b).position, [1.0, -2.5, 0.25]);
    }

    #[test]
    fn decodes_half_position() {
        let b = [0x00, 0x3C, 0x00, 0xC0, 0x00, 0x38, 0xFF, 0xFF];
        assert_eq!(decode("_p0", format::HALF_16_16_16_16, &b).position, [1.0, -2.0, 0.5]);
    }

    #[test]
    fn decodes_packed_normal() {
        // x = 511, y = -511 (0x201), z = 0
        let packed: u32 = 0x1FF | (0x201 << 10);
        let v = decode("_n0", format::SNORM_10_10_10_2, &packed.to_le_bytes());
        assert_eq!(v.normal, [1.0, -1.0, 0.0]);
    }

    #[test]
    fn decodes_uv_variants() {
        let v = decode("_u0", format::UNORM_8_8, &[255, 0]);
        assert_eq!(v.uv(), Some([1.0, 0.0]));

        let v = decode("_u1", format::UNORM_16_16, &[0xFF, 0xFF, 0x00, 0x00]);
        assert_eq!(v.uv(), Some([1.0, 0.0]));

        let v = decode("_u0", format::SNORM_16_16, &(-32767i16).to_le_bytes().repeat(2));
        assert_eq!(v.uv(), Some([-1.0, -1.0]));
    }

    #[test]
    fn decodes_unorm_color() {
        let v = decode("_c0", format::UNORM_8_8_8_8, &[255, 0, 255, 0]);
        assert_eq!(v.color, Some([1.0, 0.0, 1.0, 0.0]));
    }

    #[test]
    fn rigid_index_gets_full_weight() {
        let v = decode("_i0", format::UINT_8, &[2]);
        assert_eq!(v.bone_indices, [12]);
        assert_eq!(v.bone_weights, [1.0]);
    }

    #[test]
    fn indices_outside_node_table_are_kept() {
        let v = decode("_i0", format::UINT_8_8_8_8, &[0, 1, 7, 2]);
        assert_eq!(v.bone_indices, [10, 11, 7, 12]);
        assert!(v.bone_weights.is_empty());
    }

    #[test]
    fn legacy_u16_weights_keep_divisor() {
        let v = decode("_w0", format::UNORM_16_16, &[255, 0, 0, 0]);
        assert_eq!(v.bone_weights, [1.0, 0.0]);
    }

    #[test]
    fn fallback_material_for_untextured_mesh() {
        let options = ExportOptions::default();
        let mut mesh = Mesh::default();
        assert_eq!(mesh.material(&options), "EmptyMat");
        mesh.texture_names.push("body_alb".into());
        assert_eq!(mesh.material(&options), "body_alb");
        assert_eq!(options.texture_path("body_alb"), "textures/body_alb.bmp");
    }
}
