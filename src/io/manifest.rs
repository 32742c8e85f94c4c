//! JSON catalog manifests.
//!
//! A manifest is the hand-editable form of a catalog: three arrays of records.
//! Omitted record fields take their defaults.

use crate::catalog::MemoryCatalog;
use crate::catalog::memory::{CollectionRecord, ReplicaRecord, SpecialEntryRecord};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Error, ErrorKind, Result, Write};
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogManifest {
    #[serde(default)]
    pub collections: Vec<CollectionRecord>,
    #[serde(default)]
    pub replicas: Vec<ReplicaRecord>,
    #[serde(default)]
    pub special_entries: Vec<SpecialEntryRecord>,
}

impl CatalogManifest {
    #[must_use]
    pub fn from_catalog(catalog: &MemoryCatalog) -> Self {
        Self {
            collections: catalog.collections().cloned().collect(),
            replicas: catalog.replicas().to_vec(),
            special_entries: catalog.special_entries().to_vec(),
        }
    }

    #[must_use]
    pub fn into_catalog(self) -> MemoryCatalog {
        let mut catalog = MemoryCatalog::new();
        for record in self.collections {
            catalog.add_collection(record);
        }
        for record in self.replicas {
            catalog.add_replica(record);
        }
        for record in self.special_entries {
            catalog.add_special_entry(record);
        }
        catalog
    }
}

pub fn load_manifest(path: &str) -> Result<CatalogManifest> {
    let reader = BufReader::new(File::open(path)?);
    serde_json::from_reader(reader).map_err(|e| Error::new(ErrorKind::InvalidData, e))
}

pub fn save_manifest(path: &str, manifest: &CatalogManifest) -> Result<()> {
    let file_path = Path::new(path);
    if let Some(parent) = file_path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }

    let mut writer = BufWriter::new(File::create(file_path)?);
    serde_json::to_writer_pretty(&mut writer, manifest).map_err(Error::other)?;
    writer.write_all(b"\n")?;
    writer.flush()
}
