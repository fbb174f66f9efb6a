//! **nxres** - decoding Nintendo Switch model resources.
//!
//! Takes a game's `.szs` model archive apart down to an OBJ/MTL export:
//!
//! ```text
//! Yaz0 ──▶ SARC ──▶ BFRES ──▶ meshes ──▶ OBJ + MTL + texture manifest
//!                 │         └─▶ embedded BNTX textures
//!                 └─▶ BYML documents
//! ```
//!
//! Every parser works on a borrowed `&[u8]`; nothing here touches the
//! filesystem.
//!
//! # Modules
//! | Module | Contents |
//! |--------|----------|
//! | [`compression`]      | Yaz0 (and, with `compression`, Zstandard) decompression |
//! | [`formats::sarc`]    | SARC - SEAD ARChive |
//! | [`formats::byml`]    | BYML - binary YAML documents |
//! | [`formats::bfres`]   | BFRES - model container (FMDL, FVTX, FMAT, FSKL, FSHP) |
//! | [`formats::bntx`]    | BNTX - Binary NX Texture |
//! | [`swizzle`]          | Block-linear texture addressing |
//! | [`mesh`]             | Mesh assembly and OBJ/MTL export |
//! | [`pipeline`]         | One-call archive to OBJ helpers |

pub mod compression;
pub mod cursor;
pub mod error;
pub mod formats;
pub mod mesh;
pub mod numeric;
pub mod pipeline;
pub mod swizzle;
mod utils;

pub use error::{Error, Result};
