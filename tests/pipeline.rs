mod common;

use common::{ModelFixture, bfres, init_tracing, sarc, yaz0_literal};
use nxres::Error;
use nxres::mesh::{ExportOptions, LodPolicy};
use nxres::pipeline::{self, export_archive, export_archive_with, unpack_szs};

fn count(text: &str, prefix: &str) -> usize {
    text.lines().filter(|l| l.starts_with(prefix)).count()
}

#[test]
fn exports_triangle_from_compressed_archive() {
    init_tracing();
    let model = bfres(&ModelFixture::default());
    let archive = sarc(&[
        ("Model/Triangle.bfres", model.as_slice()),
        ("Model/readme.txt", b"not a model".as_slice()),
    ]);
    let szs = yaz0_literal(&archive);

    let exports = export_archive(&szs).unwrap();
    assert_eq!(exports.len(), 1);
    let (name, export) = &exports[0];
    assert_eq!(name, "Model/Triangle.bfres");

    let obj = &export.geometry;
    assert_eq!(count(obj, "v "), 3);
    assert_eq!(count(obj, "vt "), 3);
    assert_eq!(count(obj, "vn "), 3);
    assert_eq!(count(obj, "f "), 1);
    assert!(obj.starts_with("mtllib Triangle.mtl\n"));
    assert!(obj.contains("o Tri__Mat\n"));
    assert!(obj.contains("v 1 0 0\n"));
    assert!(obj.contains("vn 0 0 1\n"));
    assert!(obj.contains("usemtl tri_alb\n"));
    assert!(obj.contains("f 1/1/1 2/2/2 3/3/3\n"));

    let mtl = &export.materials;
    assert_eq!(mtl.matches("newmtl").count(), 1);
    assert!(mtl.contains("newmtl tri_alb\n"));
    assert!(mtl.contains("map_Kd textures/tri_alb.bmp\n"));

    assert_eq!(export.textures.len(), 1);
    assert_eq!(export.textures[0].name, "Tri_Alb");
    assert_eq!(export.textures[0].path, "textures/Tri_Alb.bmp");
}

#[test]
fn uncompressed_archive_is_accepted() {
    let model = bfres(&ModelFixture::default());
    let archive = sarc(&[("a.BFRES", model.as_slice())]);
    assert_eq!(unpack_szs(&archive).unwrap(), archive);
    let exports = export_archive(&archive).unwrap();
    assert_eq!(exports.len(), 1);
    assert_eq!(exports[0].0, "a.BFRES");
}

#[test]
fn archive_without_models_exports_nothing() {
    let archive = sarc(&[("Layout/a.bflyt", b"FLYT".as_slice()), ("b.byml", b"BY".as_slice())]);
    assert!(export_archive(&yaz0_literal(&archive)).unwrap().is_empty());
}

#[test]
fn lod_policy_picks_level() {
    let model = bfres(&ModelFixture {
        two_lods: true,
        ..Default::default()
    });
    let archive = sarc(&[("m.bfres", model.as_slice())]);

    let last = export_archive(&archive).unwrap();
    assert!(last[0].1.geometry.contains("f 3/3/3 2/2/2 1/1/1\n"));

    let options = ExportOptions {
        lod: LodPolicy::First,
        ..Default::default()
    };
    let first = export_archive_with(&archive, &options).unwrap();
    assert!(first[0].1.geometry.contains("f 1/1/1 2/2/2 3/3/3\n"));
}

#[test]
fn untextured_model_uses_fallback_material() {
    let model = bfres(&ModelFixture {
        material_textures: vec![],
        embedded_textures: vec![],
        ..Default::default()
    });
    let res = pipeline::decode(&model).unwrap();
    let export = pipeline::export(&res).unwrap();

    assert!(export.geometry.contains("usemtl EmptyMat\n"));
    assert_eq!(export.materials.matches("newmtl").count(), 1);
    assert!(export.materials.starts_with("newmtl EmptyMat\n"));
    assert!(!export.materials.contains("map_Kd"));
    assert!(export.textures.is_empty());
}

#[test]
fn corrupt_model_fails_whole_archive() {
    let mut model = bfres(&ModelFixture::default());
    model[0] = b'X';
    let archive = sarc(&[("m.bfres", model.as_slice())]);
    assert!(matches!(export_archive(&archive), Err(Error::BadMagic)));
}

#[test]
fn garbage_input_is_rejected() {
    assert!(matches!(
        export_archive(b"definitely not an archive"),
        Err(Error::BadMagic)
    ));
}
