//! One-call entry points chaining decompression, archive unpacking, model
//! decoding and export.
//!
//! ```no_run
//! # fn main() -> nxres::Result<()> {
//! let szs = std::fs::read("Mario.szs").unwrap();
//! for (name, export) in nxres::pipeline::export_archive(&szs)? {
//!     println!("{name}: {} bytes of OBJ", export.geometry.len());
//! }
//! # Ok(())
//! # }
//! ```

use tracing::{debug, info};

use crate::Result;
use crate::compression::yaz0;
use crate::formats::bfres::ResFile;
use crate::formats::sarc::Sarc;
use crate::mesh::ExportOptions;
use crate::mesh::obj::{self, ObjExport};

/// Suffix of model files inside an archive.
pub const BFRES_EXTENSION: &str = ".bfres";

/// Decompress a `.szs`/`.zs` payload.
///
/// Yaz0 is detected by magic; with the `compression` feature Zstandard is
/// too. Anything else is returned unchanged.
pub fn unpack_szs(data: &[u8]) -> Result<Vec<u8>> {
    if yaz0::is_yaz0(data) {
        return yaz0::decompress(data);
    }
    #[cfg(feature = "compression")]
    {
        use crate::compression::zstd;
        if zstd::is_zstd(data) {
            return zstd::decompress_zstd(data);
        }
    }
    Ok(data.to_vec())
}

/// Parse a BFRES file.
pub fn decode(data: &[u8]) -> Result<ResFile<'_>> {
    ResFile::parse(data)
}

/// Export every model of a parsed file with default options.
pub fn export(res: &ResFile<'_>) -> Result<ObjExport> {
    obj::export(res, &ExportOptions::default())
}

/// Export every `.bfres` entry of a (possibly compressed) SARC archive.
///
/// Results are keyed by entry name, in archive order.
pub fn export_archive(data: &[u8]) -> Result<Vec<(String, ObjExport)>> {
    export_archive_with(data, &ExportOptions::default())
}

/// [`export_archive`] with explicit options.
pub fn export_archive_with(
    data: &[u8],
    options: &ExportOptions,
) -> Result<Vec<(String, ObjExport)>> {
    let raw = unpack_szs(data)?;
    let sarc = Sarc::parse(&raw)?;

    let mut exports = Vec::new();
    for file in sarc.files() {
        if !file.name.to_ascii_lowercase().ends_with(BFRES_EXTENSION) {
            debug!(entry = %file.name, "skipping non-model entry");
            continue;
        }
        let res = ResFile::parse(file.data)?;
        exports.push((file.name.clone(), obj::export(&res, options)?));
    }

    info!(entries = sarc.files.len(), models = exports.len(), "exported archive");
    Ok(exports)
}
