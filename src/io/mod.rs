//! Persistence of catalog records

pub mod manifest;
pub mod snapshot;

use crate::catalog::MemoryCatalog;
use std::path::Path;

/// Load a catalog from a Parquet snapshot or, for `.json` files, a manifest.
pub fn load_catalog(path: &str) -> std::io::Result<MemoryCatalog> {
    let is_manifest = Path::new(path)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    if is_manifest {
        Ok(manifest::load_manifest(path)?.into_catalog())
    } else {
        snapshot::read_snapshot(path)
    }
}
