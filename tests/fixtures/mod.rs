//! Test fixtures for deterministic testing
#![allow(dead_code)]

use collwalk::catalog::memory::{
    CollectionRecord, MemoryCatalog, ReplicaRecord, SpecialEntryRecord,
};
use collwalk::catalog::{
    Catalog, CatalogError, CatalogQuery, ColumnId, Condition, ContinuationToken, GenQueryOut,
};
use collwalk::models::{ObjStat, ObjectKind, SpecialCollection};
use std::collections::HashMap;
use std::sync::Mutex;

pub const HOME: &str = "/tempZone/home/rods";

/// Collection tree used by most listing tests.
///
/// ```text
/// /tempZone/home/rods
///   a/            x.txt (10)
///   a/nested/     z.txt (30)
///   b/            y.txt (20)
///   f1 (100)      replica 0 stale on demoResc, replica 1 good on replResc
///   f2 (50)
/// ```
pub fn home_catalog() -> MemoryCatalog {
    let mut catalog = MemoryCatalog::new();
    catalog
        .add_collection(CollectionRecord::new(HOME, "rods").with_times("01700000000", "01700000001"))
        .add_collection(CollectionRecord::new(&format!("{HOME}/a"), "rods"))
        .add_collection(CollectionRecord::new(&format!("{HOME}/a/nested"), "rods"))
        .add_collection(CollectionRecord::new(&format!("{HOME}/b"), "alice"));

    catalog
        .add_replica(
            ReplicaRecord::new(HOME, "f1", 10, 0)
                .with_status(0)
                .with_size(100)
                .on_resource("demoResc", "demoResc")
                .owned_by("rods"),
        )
        .add_replica(
            ReplicaRecord::new(HOME, "f1", 10, 1)
                .with_size(100)
                .on_resource("replResc", "replResc;leafA")
                .owned_by("rods"),
        )
        .add_replica(
            ReplicaRecord::new(HOME, "f2", 11, 0)
                .with_size(50)
                .on_resource("demoResc", "demoResc")
                .owned_by("rods"),
        )
        .add_replica(ReplicaRecord::new(&format!("{HOME}/a"), "x.txt", 12, 0).with_size(10))
        .add_replica(ReplicaRecord::new(&format!("{HOME}/a/nested"), "z.txt", 14, 0).with_size(30))
        .add_replica(ReplicaRecord::new(&format!("{HOME}/b"), "y.txt", 13, 0).with_size(20));
    catalog
}

/// `home_catalog` plus a linked, a mounted and an archive collection.
///
/// `link` points at `a`, `mnt` is mounted from `/data/mnt` on `unixfs`, and
/// `bundle` is backed by a tar archive.
pub fn special_catalog() -> MemoryCatalog {
    let mut catalog = home_catalog();
    catalog
        .add_collection(
            CollectionRecord::new(&format!("{HOME}/link"), "rods")
                .with_type("linkPoint", &format!("{HOME}/a"), ""),
        )
        .add_collection(
            CollectionRecord::new(&format!("{HOME}/mnt"), "rods")
                .with_type("mountPoint", "/data/mnt", "unixfs;leaf"),
        )
        .add_collection(
            CollectionRecord::new(&format!("{HOME}/bundle"), "rods").with_type(
                "tarStructFile",
                &format!("{HOME}/bundle.tar"),
                "/cache/bundle;;;tarResc;;;1",
            ),
        );
    catalog
        .add_special_entry(SpecialEntryRecord::collection(&format!("{HOME}/mnt/sub")))
        .add_special_entry(SpecialEntryRecord::data_object(&format!("{HOME}/mnt/file.dat"), 42))
        .add_special_entry(SpecialEntryRecord::data_object(&format!("{HOME}/mnt/sub/deep.dat"), 7));
    catalog
}

pub fn collection_stat(path: &str, special_collection: Option<SpecialCollection>) -> ObjStat {
    ObjStat {
        path: path.to_string(),
        kind: ObjectKind::Collection,
        owner: "rods".to_string(),
        create_time: String::new(),
        modify_time: String::new(),
        size: 0,
        special_collection,
    }
}

pub fn data_object_stat(path: &str) -> ObjStat {
    ObjStat {
        kind: ObjectKind::DataObject,
        size: 1,
        ..collection_stat(path, None)
    }
}

fn strings(values: impl IntoIterator<Item = impl Into<String>>) -> Vec<String> {
    values.into_iter().map(Into::into).collect()
}

/// Sub-collection page with an explicit, empty collection type.
pub fn coll_page(names: &[&str]) -> GenQueryOut {
    let mut out = coll_page_without_type(names);
    out.push_column(ColumnId::CollType, strings(names.iter().map(|_| "")));
    out
}

/// Sub-collection page carrying no collection-type column.
pub fn coll_page_without_type(names: &[&str]) -> GenQueryOut {
    let mut out = GenQueryOut::new(names.len());
    out.push_column(ColumnId::CollName, strings(names.iter().copied()))
        .push_column(ColumnId::CollOwnerName, strings(names.iter().map(|_| "rods")));
    out
}

/// A replica row: name, data id, replica status.
pub type Replica<'a> = (&'a str, &'a str, i32);

/// Data-object page for `collection`, replica numbers counting up per row.
pub fn data_page(collection: &str, rows: &[Replica<'_>]) -> GenQueryOut {
    let mut out = GenQueryOut::new(rows.len());
    out.push_column(ColumnId::CollName, strings(rows.iter().map(|_| collection)))
        .push_column(ColumnId::DataName, strings(rows.iter().map(|(name, _, _)| *name)))
        .push_column(ColumnId::DataId, strings(rows.iter().map(|(_, id, _)| *id)))
        .push_column(
            ColumnId::DataReplStatus,
            rows.iter().map(|(_, _, status)| status.to_string()).collect(),
        )
        .push_column(
            ColumnId::DataReplNum,
            (0..rows.len()).map(|n| n.to_string()).collect(),
        )
        .push_column(ColumnId::DataSize, strings(rows.iter().map(|_| "5")));
    out
}

/// A request observed by [`ScriptedCatalog`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptedCall {
    Catalog {
        kind: ObjectKind,
        query: CatalogQuery,
        continuation: Option<u64>,
    },
    Special {
        path: String,
        kind: ObjectKind,
        continuation: Option<u64>,
    },
}

/// Catalog that replays pre-cut pages.
///
/// Page `n` of a phase is returned for continuation token `n` (the first page
/// for no token), and carries token `n + 1` while more pages remain. A phase
/// with no pages answers `NoRowsFound`. Special-collection queries replay the
/// same pages as catalog queries.
#[derive(Debug, Default)]
pub struct ScriptedCatalog {
    pub stats: HashMap<String, ObjStat>,
    pub collection_pages: Vec<GenQueryOut>,
    pub data_pages: Vec<GenQueryOut>,
    /// Fail the request for page `.1` of phase `.0` with `.2`.
    pub failure: Option<(ObjectKind, usize, CatalogError)>,
    calls: Mutex<Vec<ScriptedCall>>,
}

impl ScriptedCatalog {
    pub fn new(stat: ObjStat) -> Self {
        let mut stats = HashMap::new();
        stats.insert(stat.path.clone(), stat);
        Self {
            stats,
            ..Self::default()
        }
    }

    pub fn with_collection_pages(mut self, pages: Vec<GenQueryOut>) -> Self {
        self.collection_pages = pages;
        self
    }

    pub fn with_data_pages(mut self, pages: Vec<GenQueryOut>) -> Self {
        self.data_pages = pages;
        self
    }

    pub fn failing(mut self, kind: ObjectKind, page: usize, error: CatalogError) -> Self {
        self.failure = Some((kind, page, error));
        self
    }

    pub fn calls(&self) -> Vec<ScriptedCall> {
        self.calls.lock().unwrap().clone()
    }

    fn page(
        &self,
        kind: ObjectKind,
        continuation: Option<ContinuationToken>,
    ) -> Result<GenQueryOut, CatalogError> {
        let index = continuation.map_or(0, |token| token.get() as usize);
        if let Some((fail_kind, fail_page, error)) = &self.failure
            && *fail_kind == kind
            && *fail_page == index
        {
            return Err(error.clone());
        }

        let pages = match kind {
            ObjectKind::Collection => &self.collection_pages,
            ObjectKind::DataObject => &self.data_pages,
        };
        let mut page = pages.get(index).cloned().ok_or(CatalogError::NoRowsFound)?;
        page.continuation = if index + 1 < pages.len() {
            ContinuationToken::new(index as u64 + 1)
        } else {
            None
        };
        Ok(page)
    }
}

impl Catalog for ScriptedCatalog {
    fn stat(&self, path: &str) -> Result<ObjStat, CatalogError> {
        self.stats.get(path).cloned().ok_or(CatalogError::NotFound {
            path: path.to_string(),
        })
    }

    fn execute_catalog_query(
        &self,
        query: &CatalogQuery,
        continuation: Option<ContinuationToken>,
    ) -> Result<GenQueryOut, CatalogError> {
        let kind = if query.selects(ColumnId::DataName) {
            ObjectKind::DataObject
        } else {
            ObjectKind::Collection
        };
        self.calls.lock().unwrap().push(ScriptedCall::Catalog {
            kind,
            query: query.clone(),
            continuation: continuation.map(|token| token.get()),
        });
        self.page(kind, continuation)
    }

    fn execute_special_collection_query(
        &self,
        _descriptor: &SpecialCollection,
        path: &str,
        kind: ObjectKind,
        continuation: Option<ContinuationToken>,
    ) -> Result<GenQueryOut, CatalogError> {
        self.calls.lock().unwrap().push(ScriptedCall::Special {
            path: path.to_string(),
            kind,
            continuation: continuation.map(|token| token.get()),
        });
        self.page(kind, continuation)
    }
}

/// Wraps a catalog and fails every request touching `fail_path`.
pub struct FailingCatalog<C> {
    pub inner: C,
    pub fail_path: String,
}

impl<C: Catalog> FailingCatalog<C> {
    fn check(&self, path: &str) -> Result<(), CatalogError> {
        if path == self.fail_path {
            return Err(CatalogError::Failed {
                code: -808000,
                message: format!("injected failure for {path}"),
            });
        }
        Ok(())
    }
}

impl<C: Catalog> Catalog for FailingCatalog<C> {
    fn stat(&self, path: &str) -> Result<ObjStat, CatalogError> {
        self.inner.stat(path)
    }

    fn execute_catalog_query(
        &self,
        query: &CatalogQuery,
        continuation: Option<ContinuationToken>,
    ) -> Result<GenQueryOut, CatalogError> {
        for (_, condition) in &query.conditions {
            if let Condition::Equals(path) | Condition::Subtree(path) = condition {
                self.check(path)?;
            }
        }
        self.inner.execute_catalog_query(query, continuation)
    }

    fn execute_special_collection_query(
        &self,
        descriptor: &SpecialCollection,
        path: &str,
        kind: ObjectKind,
        continuation: Option<ContinuationToken>,
    ) -> Result<GenQueryOut, CatalogError> {
        self.check(path)?;
        self.inner
            .execute_special_collection_query(descriptor, path, kind, continuation)
    }
}

/// Paths of entries, sub-collections as full paths and data objects as `collection/name`.
pub fn paths(entries: &[collwalk::CollectionEntry]) -> Vec<String> {
    entries.iter().map(collwalk::CollectionEntry::path).collect()
}
