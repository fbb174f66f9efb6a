//! Wavefront OBJ/MTL export.
//!
//! ## Geometry (`.obj`)
//! ```text
//! mtllib <file name>.mtl
//! o <shape>                      one block per mesh
//! v x y z                        one v/vt/vn triple per vertex
//! vt u (1 - v)                   "vt 0 0" when the vertex has no UV
//! vn x y z
//! usemtl <texture | fallback>
//! f a/a/a b/b/b c/c/c            1-based, offset across meshes
//! ```
//!
//! ## Materials (`.mtl`)
//! The fallback material comes first when any mesh needs it, followed by
//! one block per distinct texture name in first-use order, each mapping
//! its diffuse channel to `<texture_dir>/<name>.<ext>`.

use std::fmt::Write;

use tracing::debug;

use super::{ExportOptions, Mesh, assemble};
use crate::Result;
use crate::formats::bfres::ResFile;

/// A texture side file the MTL expects next to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureRef {
    pub name: String,
    pub path: String,
}

/// The three export artifacts. Nothing is written to disk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjExport {
    pub geometry: String,
    pub materials: String,
    pub textures: Vec<TextureRef>,
}

/// Assemble and render every model of a BFRES file.
pub fn export(res: &ResFile<'_>, options: &ExportOptions) -> Result<ObjExport> {
    let meshes = assemble(res, options)?;
    let (geometry, materials) = render(&res.name, &meshes, options)?;
    let textures = texture_manifest(res, options);
    debug!(
        file = %res.name,
        meshes = meshes.len(),
        textures = textures.len(),
        "exported OBJ"
    );
    Ok(ObjExport {
        geometry,
        materials,
        textures,
    })
}

/// Render already assembled meshes into `(geometry, materials)`.
///
/// `library` names the MTL file referenced by `mtllib`.
pub fn render(library: &str, meshes: &[Mesh], options: &ExportOptions) -> Result<(String, String)> {
    let mut obj = String::new();
    let mut used: Vec<&str> = Vec::new();
    let mut needs_fallback = false;

    writeln!(obj, "mtllib {library}.mtl")?;

    let mut base = 1usize;
    for mesh in meshes {
        writeln!(obj, "o {}", mesh.name)?;
        for v in &mesh.vertices {
            let [x, y, z] = v.position;
            writeln!(obj, "v {x} {y} {z}")?;
            match v.uv() {
                Some([u, t]) => writeln!(obj, "vt {u} {}", 1.0 - t)?,
                None => writeln!(obj, "vt 0 0")?,
            }
            let [x, y, z] = v.normal;
            writeln!(obj, "vn {x} {y} {z}")?;
        }

        if mesh.texture_names.is_empty() {
            needs_fallback = true;
        }
        for name in &mesh.texture_names {
            if !used.contains(&name.as_str()) {
                used.push(name);
            }
        }
        writeln!(obj, "usemtl {}", mesh.material(options))?;

        for face in &mesh.faces {
            let [a, b, c] = face.map(|i| i as usize + base);
            writeln!(obj, "f {a}/{a}/{a} {b}/{b}/{b} {c}/{c}/{c}")?;
        }
        base += mesh.vertices.len();
    }

    let mut mtl = String::new();
    if needs_fallback {
        writeln!(mtl, "newmtl {}", options.fallback_material)?;
        writeln!(mtl, "Ka 0.000000 0.000000 0.000000")?;
        writeln!(mtl, "Kd 0.800000 0.800000 0.800000")?;
        writeln!(mtl, "Ks 0.0 0.0 0.0")?;
        writeln!(mtl)?;
    }
    for name in used {
        writeln!(mtl, "newmtl {name}")?;
        writeln!(mtl, "Ka 0.000000 0.000000 0.000000")?;
        writeln!(mtl, "Kd 1.000000 1.000000 1.000000")?;
        writeln!(mtl, "Ks 0.0 0.0 0.0")?;
        writeln!(mtl, "map_Kd {}", options.texture_path(name))?;
        writeln!(mtl)?;
    }

    Ok((obj, mtl))
}

/// Every texture of every embedded BNTX, with the path the MTL uses.
pub fn texture_manifest(res: &ResFile<'_>, options: &ExportOptions) -> Vec<TextureRef> {
    res.all_textures()
        .map(|t| TextureRef {
            name: t.name.clone(),
            path: options.texture_path(&t.name),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{TexturePolicy, Vertex};

    fn vertex(position: [f32; 3], uv: Option<[f32; 2]>) -> Vertex {
        Vertex {
            position,
            normal: [0.0, 1.0, 0.0],
            uvs: uv.into_iter().collect(),
            ..Default::default()
        }
    }

    fn triangle(name: &str, textures: &[&str]) -> Mesh {
        Mesh {
            name: name.into(),
            vertices: vec![
                vertex([0.0, 0.0, 0.0], Some([0.0, 0.25])),
                vertex([1.0, 0.0, 0.0], Some([1.0, 0.0])),
                vertex([0.0, 1.0, 0.0], None),
            ],
            faces: vec![[0, 1, 2]],
            texture_names: textures.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn renders_single_textured_triangle() {
        let options = ExportOptions::default();
        let (obj, mtl) = render("model", &[triangle("body", &["body_alb"])], &options).unwrap();

        let expected = "mtllib model.mtl\n\
                        o body\n\
                        v 0 0 0\nvt 0 0.75\nvn 0 1 0\n\
                        v 1 0 0\nvt 1 1\nvn 0 1 0\n\
                        v 0 1 0\nvt 0 0\nvn 0 1 0\n\
                        usemtl body_alb\n\
                        f 1/1/1 2/2/2 3/3/3\n";
        assert_eq!(obj, expected);
        assert_eq!(mtl.matches("newmtl").count(), 1);
        assert!(mtl.contains("newmtl body_alb\n"));
        assert!(mtl.contains("map_Kd textures/body_alb.bmp\n"));
        assert!(!mtl.contains(&options.fallback_material));
    }

    #[test]
    fn offsets_faces_across_meshes() {
        let options = ExportOptions::default();
        let meshes = [triangle("a", &["t"]), triangle("b", &["t"])];
        let (obj, mtl) = render("m", &meshes, &options).unwrap();

        let faces: Vec<&str> = obj.lines().filter(|l| l.starts_with("f ")).collect();
        assert_eq!(faces, ["f 1/1/1 2/2/2 3/3/3", "f 4/4/4 5/5/5 6/6/6"]);
        // Each face line holds exactly three vertex references.
        let refs: usize = faces.iter().map(|l| l.split(' ').skip(1).count()).sum();
        assert_eq!(refs, 3 * 2);
        assert_eq!(mtl.matches("newmtl").count(), 1);
    }

    #[test]
    fn untextured_mesh_uses_fallback_first() {
        let options = ExportOptions {
            fallback_material: "None".into(),
            ..Default::default()
        };
        let meshes = [triangle("lit", &["skin"]), triangle("bare", &[])];
        let (obj, mtl) = render("m", &meshes, &options).unwrap();

        assert!(obj.contains("usemtl None\n"));
        assert!(mtl.starts_with("newmtl None\n"));
        assert!(mtl.contains("Kd 0.800000 0.800000 0.800000\n"));
        assert_eq!(mtl.matches("newmtl").count(), 2);
    }

    #[test]
    fn every_texture_name_gets_a_block_with_all_policy() {
        let options = ExportOptions {
            textures: TexturePolicy::All,
            texture_dir: "tex".into(),
            texture_extension: "png".into(),
            ..Default::default()
        };
        let (obj, mtl) = render("m", &[triangle("a", &["alb", "nrm"])], &options).unwrap();
        assert!(obj.contains("usemtl alb\n"));
        assert!(mtl.contains("map_Kd tex/alb.png\n"));
        assert!(mtl.contains("map_Kd tex/nrm.png\n"));
    }
}
