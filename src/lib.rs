//! Collection Traversal Library
//!
//! This library lists the logical namespace of a catalog-backed data grid.
//! A [`CollectionHandle`] opens one collection and returns its sub-collections
//! and data objects one at a time, hiding catalog pagination, replica rows,
//! and the indirection of linked, mounted, and archive-backed collections.
//! Catalogs can be loaded offline from Parquet snapshots or JSON manifests.

pub mod catalog;
pub mod cli;
pub mod io;
pub mod models;
pub mod services;

pub use catalog::{Catalog, CatalogError, MemoryCatalog};
pub use models::{CollectionEntry, DataObjectEntry, SpecialCollection, SubCollectionEntry};
pub use services::cursor::{CollectionHandle, CursorConfig, CursorState, QueryFlags};
pub use services::walk::{WalkOptions, WalkSummary, walk_collection};

use catalog::ColumnId;
use std::result;

/// Custom error type for the library
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Not a collection: {path}")]
    NotACollection { path: String },
    #[error("Query result is missing mandatory column {column}")]
    SchemaMismatch { column: ColumnId },
    #[error("Catalog query for {path} failed: {source}")]
    Upstream {
        path: String,
        #[source]
        source: CatalogError,
    },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Logical path the failure is attributed to, when known.
    #[must_use]
    pub fn path(&self) -> Option<&str> {
        match self {
            Error::NotACollection { path } | Error::Upstream { path, .. } => Some(path),
            _ => None,
        }
    }
}

pub type Result<T> = result::Result<T, Error>;

/// List every entry of one collection.
///
/// # Arguments
/// * `catalog` - The catalog to query
/// * `path` - Logical path of the collection
/// * `flags` - Listing options
///
/// # Returns
/// The entries in the order the cursor produced them
pub fn list_collection<C: Catalog + ?Sized>(
    catalog: &C,
    path: &str,
    flags: QueryFlags,
) -> Result<Vec<CollectionEntry>> {
    let mut handle = CollectionHandle::new(catalog);
    handle.open(path, flags)?;
    handle.collect()
}
