//! In-memory fixture builders shared by the integration tests.

#![allow(dead_code)]

use nxres::cursor::Endian;
use nxres::formats::sarc::{HASH_KEY, sarc_hash};
use nxres::mesh::format;

/// Route `tracing` output to the test harness. Safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Growable byte buffer with endian-aware writes at absolute offsets.
pub struct Buf {
    pub data: Vec<u8>,
    pub endian: Endian,
    strings: usize,
}

impl Buf {
    pub fn new(endian: Endian) -> Self {
        Self {
            data: Vec::new(),
            endian,
            strings: 0,
        }
    }

    pub fn bytes(&mut self, at: usize, v: &[u8]) {
        if self.data.len() < at + v.len() {
            self.data.resize(at + v.len(), 0);
        }
        self.data[at..at + v.len()].copy_from_slice(v);
    }

    pub fn u8(&mut self, at: usize, v: u8) {
        self.bytes(at, &[v]);
    }

    pub fn u16(&mut self, at: usize, v: u16) {
        match self.endian {
            Endian::Big => self.bytes(at, &v.to_be_bytes()),
            Endian::Little => self.bytes(at, &v.to_le_bytes()),
        }
    }

    pub fn u32(&mut self, at: usize, v: u32) {
        match self.endian {
            Endian::Big => self.bytes(at, &v.to_be_bytes()),
            Endian::Little => self.bytes(at, &v.to_le_bytes()),
        }
    }

    pub fn u64(&mut self, at: usize, v: u64) {
        match self.endian {
            Endian::Big => self.bytes(at, &v.to_be_bytes()),
            Endian::Little => self.bytes(at, &v.to_le_bytes()),
        }
    }

    pub fn f32(&mut self, at: usize, v: f32) {
        self.u32(at, v.to_bits());
    }

    /// Start the string pool at `at`.
    pub fn string_pool(&mut self, at: usize) {
        self.strings = at;
    }

    /// Append a length-prefixed, null-terminated string to the pool and
    /// return the offset of its length prefix (characters start at +2).
    pub fn string(&mut self, s: &str) -> u32 {
        let at = self.strings;
        self.u16(at, s.len() as u16);
        self.bytes(at + 2, s.as_bytes());
        self.u8(at + 2 + s.len(), 0);
        self.strings = (at + 2 + s.len() + 1).div_ceil(4) * 4;
        at as u32
    }

    pub fn pad_to(&mut self, len: usize) {
        if self.data.len() < len {
            self.data.resize(len, 0);
        }
    }
}

/// Yaz0 stream made only of literal groups.
pub fn yaz0_literal(data: &[u8]) -> Vec<u8> {
    let mut out = b"Yaz0".to_vec();
    out.extend_from_slice(&(data.len() as u32).to_be_bytes());
    out.extend_from_slice(&[0u8; 8]);
    for chunk in data.chunks(8) {
        out.push(0xFF);
        out.extend_from_slice(chunk);
    }
    out
}

/// Little-endian SARC archive of named entries.
pub fn sarc(files: &[(&str, &[u8])]) -> Vec<u8> {
    let mut names = Vec::new();
    let mut fat = Vec::new();
    let mut blob: Vec<u8> = Vec::new();
    for (name, payload) in files {
        let attributes = 0x0100_0000 | (names.len() as u32 / 4);
        names.extend_from_slice(name.as_bytes());
        names.push(0);
        while names.len() % 4 != 0 {
            names.push(0);
        }
        while blob.len() % 0x10 != 0 {
            blob.push(0);
        }
        let start = blob.len() as u32;
        blob.extend_from_slice(payload);
        let end = blob.len() as u32;
        for v in [sarc_hash(name.as_bytes(), HASH_KEY), attributes, start, end] {
            fat.extend_from_slice(&v.to_le_bytes());
        }
    }

    let data_offset = (0x14 + 0x0C + fat.len() + 0x08 + names.len()).div_ceil(0x10) * 0x10;
    let total = data_offset + blob.len();

    let mut out = Vec::with_capacity(total);
    out.extend_from_slice(b"SARC");
    out.extend_from_slice(&0x14u16.to_le_bytes());
    out.extend_from_slice(&[0xFF, 0xFE]);
    out.extend_from_slice(&(total as u32).to_le_bytes());
    out.extend_from_slice(&(data_offset as u32).to_le_bytes());
    out.extend_from_slice(&0x0100u16.to_le_bytes());
    out.extend_from_slice(&[0, 0]);
    out.extend_from_slice(b"SFAT");
    out.extend_from_slice(&0x0Cu16.to_le_bytes());
    out.extend_from_slice(&(files.len() as u16).to_le_bytes());
    out.extend_from_slice(&HASH_KEY.to_le_bytes());
    out.extend_from_slice(&fat);
    out.extend_from_slice(b"SFNT");
    out.extend_from_slice(&0x08u16.to_le_bytes());
    out.extend_from_slice(&[0, 0]);
    out.extend_from_slice(&names);
    out.resize(data_offset, 0);
    out.extend_from_slice(&blob);
    out
}

/// Little-endian BNTX holding one RGBA8 texture per name.
pub fn bntx(container: &str, textures: &[&str]) -> Vec<u8> {
    let mut b = Buf::new(Endian::Little);
    let count = textures.len();
    let info = 0x48;
    let first_brti = (info + count * 8).div_ceil(0x10) * 0x10;
    let brti_size = 0x80;
    let mips = first_brti + count * brti_size;
    let strings = mips + count * 8;
    let pixels = (strings + 0x20 * (count + 1)).div_ceil(0x100) * 0x100;
    let texel_bytes = 4 * 4 * 4;

    b.bytes(0, b"BNTX");
    b.u32(0x08, 0x0004_0000);
    b.bytes(0x0C, &[0xFF, 0xFE]);
    b.bytes(0x20, b"NX  ");
    b.u32(0x24, count as u32);
    b.u64(0x28, info as u64);

    b.string_pool(strings);
    let name = b.string(container);
    b.u32(0x10, name + 2);

    for (i, tex) in textures.iter().enumerate() {
        let brti = first_brti + i * brti_size;
        let data = pixels + i * texel_bytes;
        b.u64(info + i * 8, brti as u64);
        b.bytes(brti, b"BRTI");
        b.u16(brti + 0x16, 1);
        b.u32(brti + 0x1C, 0x0B01);
        b.u32(brti + 0x24, 4);
        b.u32(brti + 0x28, 4);
        b.u32(brti + 0x2C, 1);
        b.u32(brti + 0x30, 1);
        b.u32(brti + 0x50, texel_bytes as u32);
        b.u32(brti + 0x58, 0x0504_0302);
        let name = b.string(tex);
        b.u64(brti + 0x60, u64::from(name));
        b.u64(brti + 0x70, (mips + i * 8) as u64);
        b.u64(mips + i * 8, data as u64);
        b.bytes(data, &vec![0x80; texel_bytes]);
    }
    b.data
}

/// Parameters of [`bfres`].
#[derive(Debug, Clone)]
pub struct ModelFixture {
    pub endian: Endian,
    pub version_minor: u8,
    pub file_name: &'static str,
    pub model_name: &'static str,
    pub shape_name: &'static str,
    /// Texture names referenced by the material (written as given).
    pub material_textures: Vec<&'static str>,
    /// Textures stored in the embedded BNTX; none embeds nothing.
    pub embedded_textures: Vec<&'static str>,
    /// 1 = u16 indices, 2 = u32 indices.
    pub index_format: u32,
    /// Add a second, coarser LOD with the winding reversed.
    pub two_lods: bool,
    /// Value of the first LOD's index count.
    pub index_count: u32,
}

impl Default for ModelFixture {
    fn default() -> Self {
        Self {
            endian: Endian::Little,
            version_minor: 10,
            file_name: "Triangle",
            model_name: "Triangle",
            shape_name: "Tri__Mat",
            material_textures: vec!["Tri_Alb"],
            embedded_textures: vec!["Tri_Alb"],
            index_format: 1,
            two_lods: false,
            index_count: 3,
        }
    }
}

pub const DATA_START: usize = 0x1000;
pub const VERTEX_STRIDE: usize = 24;
pub const POSITIONS: [[f32; 3]; 3] = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];
pub const UVS: [[f32; 2]; 3] = [[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]];

/// A BFRES file with one model holding a single triangle.
///
/// Vertices carry `_p0` (float3), `_n0` (10-10-10-2, pointing +Z) and
/// `_u0` (float2) in one interleaved buffer.
pub fn bfres(f: &ModelFixture) -> Vec<u8> {
    let mut b = Buf::new(f.endian);
    b.string_pool(0x500);

    // header
    b.bytes(0x00, b"FRES");
    b.bytes(0x04, &0x2020_2020u32.to_be_bytes());
    b.bytes(0x08, &[0, 0, f.version_minor, 0]);
    b.bytes(
        0x0C,
        match f.endian {
            Endian::Big => &[0xFE, 0xFF],
            Endian::Little => &[0xFF, 0xFE],
        },
    );
    b.u16(0x0E, 0xD6);
    let file_name = b.string(f.file_name);
    b.u32(0x10, file_name + 2);
    b.u32(0x14, 0x1000);
    b.u32(0x18, 0x480);
    b.u64(0x28, 0x100);
    b.u16(0xBC, 1);
    if !f.embedded_textures.is_empty() {
        b.u64(0x98, 0x4C0);
        b.u16(0xC8, 1);
        b.u32(0x4C0, 0x600);
        b.bytes(0x600, &bntx("textures", &f.embedded_textures));
    }

    // relocation table
    b.u32(0x480 + 0x30, DATA_START as u32);

    // FMDL
    b.bytes(0x100, b"FMDL");
    b.u32(0x104, 0x78);
    b.u32(0x108, 0x78);
    let model_name = b.string(f.model_name);
    b.u32(0x110, model_name);
    b.u64(0x120, 0x300);
    b.u64(0x128, 0x180);
    b.u64(0x130, 0x370);
    b.u64(0x140, 0x230);
    b.u16(0x168, 1);
    b.u16(0x16A, 1);
    b.u16(0x16C, 1);
    b.u32(0x170, 3);

    // FVTX
    b.bytes(0x180, b"FVTX");
    b.u64(0x190, 0x1E0);
    b.u64(0x1B8, 0x210);
    b.u64(0x1C0, 0x220);
    b.u8(0x1D4, 3);
    b.u8(0x1D5, 1);
    b.u32(0x1D8, 3);
    for (i, (tag, fmt, offset)) in [
        ("_p0", format::FLOAT_32_32_32, 0u16),
        ("_n0", format::SNORM_10_10_10_2, 12),
        ("_u0", format::FLOAT_32_32, 16),
    ]
    .into_iter()
    .enumerate()
    {
        let at = 0x1E0 + i * 0x10;
        let name = b.string(tag);
        b.u32(at, name);
        b.bytes(at + 8, &fmt.to_be_bytes());
        b.u16(at + 0xC, offset);
        b.u16(at + 0xE, 0);
    }
    b.u32(0x210, (3 * VERTEX_STRIDE) as u32);
    b.u32(0x220, VERTEX_STRIDE as u32);

    // FMAT
    b.bytes(0x230, b"FMAT");
    let material_name = b.string("Mat");
    b.u32(0x240, material_name);
    b.u64(0x268, 0x2F0);
    let n = f.material_textures.len();
    b.u8(0x2D8, n as u8);
    b.u8(0x2D9, n as u8);
    for (i, tex) in f.material_textures.iter().enumerate() {
        let name = b.string(tex);
        b.u64(0x2F0 + i * 8, u64::from(name));
    }

    // FSKL
    b.bytes(0x300, b"FSKL");
    b.u64(0x320, 0x360);
    let counts = if f.version_minor == 8 { 0x338 } else { 0x348 };
    b.u16(counts + 4, 1);
    b.u16(counts + 6, 1);
    b.u16(0x360, 0);

    // FSHP
    b.bytes(0x370, b"FSHP");
    let shape_name = b.string(f.shape_name);
    b.u32(0x380, shape_name);
    b.u64(0x388, 0x180);
    b.u64(0x390, 0x3E0);
    b.u8(0x3D7, if f.two_lods { 2 } else { 1 });

    let mut lods = vec![(0x48usize, f.index_count, [0u32, 1, 2])];
    if f.two_lods {
        lods.push((0x58, 3, [2, 1, 0]));
    }
    for (i, (face_buffer, count, indices)) in lods.into_iter().enumerate() {
        let at = 0x3E0 + i * 0x38;
        b.u32(at + 0x20, face_buffer as u32);
        b.u32(at + 0x24, 4);
        b.u32(at + 0x28, f.index_format);
        b.u32(at + 0x2C, count);
        b.u32(at + 0x34, 1);
        for (k, index) in indices.into_iter().enumerate() {
            let pos = DATA_START + face_buffer;
            match f.index_format {
                2 => b.u32(pos + k * 4, index),
                _ => b.u16(pos + k * 2, index as u16),
            }
        }
    }

    // vertex buffer
    for v in 0..3 {
        let at = DATA_START + v * VERTEX_STRIDE;
        for (c, value) in POSITIONS[v].into_iter().enumerate() {
            b.f32(at + c * 4, value);
        }
        b.u32(at + 12, 0x1FF << 20);
        for (c, value) in UVS[v].into_iter().enumerate() {
            b.f32(at + 16 + c * 4, value);
        }
    }

    b.pad_to(DATA_START + 0x70);
    let len = b.data.len() as u32;
    b.u32(0x1C, len);
    b.data
}
