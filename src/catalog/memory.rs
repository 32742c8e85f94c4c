//! In-memory catalog answering queries from owned records.
//!
//! Used for offline listings (records loaded from a snapshot or manifest) and
//! as the collaborator in tests. Every request is appended to a call log so
//! callers can inspect which remote capability would have been invoked.

use super::{
    Catalog, CatalogError, CatalogQuery, ColumnId, ContinuationToken, GenQueryOut, MAX_SQL_ROWS,
};
use crate::models::{
    ObjStat, ObjectKind, SpecialCollection, base_name, join_logical, parent_of,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

/// A collection row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionRecord {
    pub path: String,
    #[serde(default)]
    pub owner: String,
    #[serde(default)]
    pub create_time: String,
    #[serde(default)]
    pub modify_time: String,
    /// Special-collection type value; empty for ordinary collections.
    #[serde(default)]
    pub coll_type: String,
    #[serde(default)]
    pub info1: String,
    #[serde(default)]
    pub info2: String,
}

impl CollectionRecord {
    #[must_use]
    pub fn new(path: &str, owner: &str) -> Self {
        Self {
            path: path.to_string(),
            owner: owner.to_string(),
            create_time: String::new(),
            modify_time: String::new(),
            coll_type: String::new(),
            info1: String::new(),
            info2: String::new(),
        }
    }

    /// Mark the record as a special collection.
    #[must_use]
    pub fn with_type(mut self, coll_type: &str, info1: &str, info2: &str) -> Self {
        self.coll_type = coll_type.to_string();
        self.info1 = info1.to_string();
        self.info2 = info2.to_string();
        self
    }

    #[must_use]
    pub fn with_times(mut self, create_time: &str, modify_time: &str) -> Self {
        self.create_time = create_time.to_string();
        self.modify_time = modify_time.to_string();
        self
    }

    fn special_collection(&self) -> Option<SpecialCollection> {
        let mut spec =
            SpecialCollection::resolve(&self.coll_type, &self.path, &self.info1, &self.info2)?;
        if spec.is_linked() && spec.obj_path.is_empty() {
            spec.obj_path.clone_from(&spec.phy_path);
        }
        Some(spec)
    }
}

/// One replica row of a data object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicaRecord {
    pub collection: String,
    pub name: String,
    pub data_id: u64,
    #[serde(default)]
    pub replica_number: i32,
    #[serde(default)]
    pub replica_status: i32,
    #[serde(default)]
    pub size: i64,
    #[serde(default)]
    pub mode: i32,
    #[serde(default)]
    pub owner: String,
    #[serde(default)]
    pub resource: String,
    #[serde(default)]
    pub resc_hier: String,
    #[serde(default)]
    pub physical_path: String,
    #[serde(default)]
    pub checksum: String,
    #[serde(default)]
    pub data_type: String,
    #[serde(default)]
    pub create_time: String,
    #[serde(default)]
    pub modify_time: String,
}

impl ReplicaRecord {
    #[must_use]
    pub fn new(collection: &str, name: &str, data_id: u64, replica_number: i32) -> Self {
        Self {
            collection: collection.to_string(),
            name: name.to_string(),
            data_id,
            replica_number,
            replica_status: 1,
            size: 0,
            mode: 0,
            owner: String::new(),
            resource: String::new(),
            resc_hier: String::new(),
            physical_path: String::new(),
            checksum: String::new(),
            data_type: String::new(),
            create_time: String::new(),
            modify_time: String::new(),
        }
    }

    #[must_use]
    pub fn with_status(mut self, replica_status: i32) -> Self {
        self.replica_status = replica_status;
        self
    }

    #[must_use]
    pub fn with_size(mut self, size: i64) -> Self {
        self.size = size;
        self
    }

    #[must_use]
    pub fn on_resource(mut self, resource: &str, resc_hier: &str) -> Self {
        self.resource = resource.to_string();
        self.resc_hier = resc_hier.to_string();
        self
    }

    #[must_use]
    pub fn owned_by(mut self, owner: &str) -> Self {
        self.owner = owner.to_string();
        self
    }

    #[must_use]
    pub fn path(&self) -> String {
        join_logical(&self.collection, &self.name)
    }

    fn sort_key(&self) -> (&str, &str, u64, i32) {
        (&self.collection, &self.name, self.data_id, self.replica_number)
    }
}

/// A child listed by a mounted or archive collection rather than by catalog rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecialEntryRecord {
    pub kind: ObjectKind,
    /// Full logical path of the child.
    pub path: String,
    #[serde(default)]
    pub create_time: String,
    #[serde(default)]
    pub modify_time: String,
    #[serde(default = "unknown_size")]
    pub size: i64,
}

fn unknown_size() -> i64 {
    -1
}

impl SpecialEntryRecord {
    #[must_use]
    pub fn collection(path: &str) -> Self {
        Self {
            kind: ObjectKind::Collection,
            path: path.to_string(),
            create_time: String::new(),
            modify_time: String::new(),
            size: 0,
        }
    }

    #[must_use]
    pub fn data_object(path: &str, size: i64) -> Self {
        Self {
            kind: ObjectKind::DataObject,
            size,
            ..Self::collection(path)
        }
    }
}

/// A request observed by [`MemoryCatalog`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogCall {
    Stat {
        path: String,
    },
    Query {
        query: CatalogQuery,
        continuation: Option<u64>,
    },
    SpecialQuery {
        collection: String,
        path: String,
        kind: ObjectKind,
        continuation: Option<u64>,
    },
}

trait CatalogRow {
    fn field(&self, column: ColumnId) -> String;
}

impl CatalogRow for CollectionRecord {
    fn field(&self, column: ColumnId) -> String {
        match column {
            ColumnId::CollName => self.path.clone(),
            ColumnId::CollParentName => parent_of(&self.path).unwrap_or_default().to_string(),
            ColumnId::CollOwnerName => self.owner.clone(),
            ColumnId::CollCreateTime => self.create_time.clone(),
            ColumnId::CollModifyTime => self.modify_time.clone(),
            ColumnId::CollType => self.coll_type.clone(),
            ColumnId::CollInfo1 => self.info1.clone(),
            ColumnId::CollInfo2 => self.info2.clone(),
            _ => String::new(),
        }
    }
}

impl CatalogRow for ReplicaRecord {
    fn field(&self, column: ColumnId) -> String {
        match column {
            ColumnId::CollName => self.collection.clone(),
            ColumnId::CollParentName => {
                parent_of(&self.collection).unwrap_or_default().to_string()
            }
            ColumnId::DataName => self.name.clone(),
            ColumnId::DataId => self.data_id.to_string(),
            ColumnId::DataMode => self.mode.to_string(),
            ColumnId::DataSize => self.size.to_string(),
            ColumnId::DataCreateTime => self.create_time.clone(),
            ColumnId::DataModifyTime => self.modify_time.clone(),
            ColumnId::DataReplNum => self.replica_number.to_string(),
            ColumnId::DataReplStatus => self.replica_status.to_string(),
            ColumnId::DataRescName => self.resource.clone(),
            ColumnId::DataRescHier => self.resc_hier.clone(),
            ColumnId::DataOwnerName => self.owner.clone(),
            ColumnId::DataPath => self.physical_path.clone(),
            ColumnId::DataChecksum => self.checksum.clone(),
            ColumnId::DataTypeName => self.data_type.clone(),
            _ => String::new(),
        }
    }
}

/// Catalog backed by in-memory records.
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    collections: BTreeMap<String, CollectionRecord>,
    replicas: Vec<ReplicaRecord>,
    special_entries: Vec<SpecialEntryRecord>,
    page_size: Option<usize>,
    calls: Mutex<Vec<CatalogCall>>,
}

impl MemoryCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cap every page at `page_size` rows regardless of what queries request.
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = Some(page_size.max(1));
        self
    }

    /// Insert a collection, creating plain ancestors that are missing.
    pub fn add_collection(&mut self, record: CollectionRecord) -> &mut Self {
        let mut ancestor = parent_of(&record.path);
        while let Some(path) = ancestor {
            if path != "/" && !self.collections.contains_key(path) {
                self.collections
                    .insert(path.to_string(), CollectionRecord::new(path, &record.owner));
            }
            ancestor = parent_of(path);
        }
        self.collections.insert(record.path.clone(), record);
        self
    }

    /// Insert a replica row, keeping rows grouped by data identity.
    pub fn add_replica(&mut self, record: ReplicaRecord) -> &mut Self {
        if !self.collections.contains_key(&record.collection) && record.collection != "/" {
            let owner = record.owner.clone();
            self.add_collection(CollectionRecord::new(&record.collection, &owner));
        }
        let at = self
            .replicas
            .partition_point(|existing| existing.sort_key() <= record.sort_key());
        self.replicas.insert(at, record);
        self
    }

    pub fn add_special_entry(&mut self, record: SpecialEntryRecord) -> &mut Self {
        self.special_entries.push(record);
        self
    }

    pub fn collections(&self) -> impl Iterator<Item = &CollectionRecord> {
        self.collections.values()
    }

    #[must_use]
    pub fn replicas(&self) -> &[ReplicaRecord] {
        &self.replicas
    }

    #[must_use]
    pub fn special_entries(&self) -> &[SpecialEntryRecord] {
        &self.special_entries
    }

    /// Requests received so far, oldest first.
    #[must_use]
    pub fn calls(&self) -> Vec<CatalogCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn record_call(&self, call: CatalogCall) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
    }

    fn page_len(&self, requested: usize) -> usize {
        self.page_size.unwrap_or(requested).max(1)
    }

    /// Nearest enclosing collection that carries a special-collection type.
    fn owning_special_collection(
        &self,
        path: &str,
    ) -> Option<(&CollectionRecord, SpecialCollection)> {
        let mut current = parent_of(path);
        while let Some(candidate) = current {
            if let Some(record) = self.collections.get(candidate)
                && let Some(spec) = record.special_collection()
            {
                return Some((record, spec));
            }
            current = parent_of(candidate);
        }
        None
    }
}

fn page_bounds(
    total: usize,
    page_len: usize,
    continuation: Option<ContinuationToken>,
) -> Result<(usize, usize), CatalogError> {
    let offset = continuation.map_or(0, |token| {
        usize::try_from(token.get()).unwrap_or(usize::MAX)
    });
    if offset >= total {
        return Err(CatalogError::NoRowsFound);
    }
    Ok((offset, offset.saturating_add(page_len).min(total)))
}

fn build_page<R: CatalogRow>(
    rows: &[&R],
    select: &[ColumnId],
    page_len: usize,
    continuation: Option<ContinuationToken>,
    with_total: bool,
) -> Result<GenQueryOut, CatalogError> {
    let (start, end) = page_bounds(rows.len(), page_len, continuation)?;
    let page = &rows[start..end];

    let mut out = GenQueryOut::new(page.len());
    for column in select {
        out.push_column(*column, page.iter().map(|row| row.field(*column)).collect());
    }
    out.continuation = if end < rows.len() {
        ContinuationToken::new(end as u64)
    } else {
        None
    };
    out.total_row_count = with_total.then_some(rows.len() as u64);
    Ok(out)
}

fn matches_all<R: CatalogRow>(row: &R, query: &CatalogQuery) -> bool {
    query
        .conditions
        .iter()
        .all(|(column, condition)| condition.matches(&row.field(*column)))
}

impl Catalog for MemoryCatalog {
    fn stat(&self, path: &str) -> Result<ObjStat, CatalogError> {
        self.record_call(CatalogCall::Stat {
            path: path.to_string(),
        });

        if let Some(record) = self.collections.get(path) {
            return Ok(ObjStat {
                path: path.to_string(),
                kind: ObjectKind::Collection,
                owner: record.owner.clone(),
                create_time: record.create_time.clone(),
                modify_time: record.modify_time.clone(),
                size: 0,
                special_collection: record.special_collection(),
            });
        }

        if let Some(replica) = self.replicas.iter().find(|replica| replica.path() == path) {
            return Ok(ObjStat {
                path: path.to_string(),
                kind: ObjectKind::DataObject,
                owner: replica.owner.clone(),
                create_time: replica.create_time.clone(),
                modify_time: replica.modify_time.clone(),
                size: replica.size,
                special_collection: None,
            });
        }

        if let Some(entry) = self.special_entries.iter().find(|entry| entry.path == path)
            && let Some((root, spec)) = self.owning_special_collection(path)
        {
            return Ok(ObjStat {
                path: path.to_string(),
                kind: entry.kind,
                owner: root.owner.clone(),
                create_time: entry.create_time.clone(),
                modify_time: entry.modify_time.clone(),
                size: entry.size,
                special_collection: Some(spec),
            });
        }

        Err(CatalogError::NotFound {
            path: path.to_string(),
        })
    }

    fn execute_catalog_query(
        &self,
        query: &CatalogQuery,
        continuation: Option<ContinuationToken>,
    ) -> Result<GenQueryOut, CatalogError> {
        self.record_call(CatalogCall::Query {
            query: query.clone(),
            continuation: continuation.map(|token| token.get()),
        });

        let page_len = self.page_len(query.max_rows);
        if query.selects(ColumnId::DataName) {
            let rows: Vec<&ReplicaRecord> = self
                .replicas
                .iter()
                .filter(|row| matches_all(*row, query))
                .collect();
            build_page(&rows, &query.select, page_len, continuation, query.total_row_count)
        } else {
            let rows: Vec<&CollectionRecord> = self
                .collections
                .values()
                .filter(|row| matches_all(*row, query))
                .collect();
            build_page(&rows, &query.select, page_len, continuation, query.total_row_count)
        }
    }

    fn execute_special_collection_query(
        &self,
        descriptor: &SpecialCollection,
        path: &str,
        kind: ObjectKind,
        continuation: Option<ContinuationToken>,
    ) -> Result<GenQueryOut, CatalogError> {
        self.record_call(CatalogCall::SpecialQuery {
            collection: descriptor.collection.clone(),
            path: path.to_string(),
            kind,
            continuation: continuation.map(|token| token.get()),
        });

        let entries: Vec<&SpecialEntryRecord> = self
            .special_entries
            .iter()
            .filter(|entry| entry.kind == kind && parent_of(&entry.path) == Some(path))
            .collect();
        let (start, end) = page_bounds(entries.len(), self.page_len(MAX_SQL_ROWS), continuation)?;
        let page = &entries[start..end];

        let (coll_names, data_names): (Vec<String>, Vec<String>) = page
            .iter()
            .map(|entry| match kind {
                ObjectKind::Collection => (entry.path.clone(), String::new()),
                ObjectKind::DataObject => (
                    parent_of(&entry.path).unwrap_or_default().to_string(),
                    base_name(&entry.path).to_string(),
                ),
            })
            .unzip();

        let mut out = GenQueryOut::new(page.len());
        out.push_column(ColumnId::CollName, coll_names)
            .push_column(ColumnId::DataName, data_names)
            .push_column(
                ColumnId::DataCreateTime,
                page.iter().map(|entry| entry.create_time.clone()).collect(),
            )
            .push_column(
                ColumnId::DataModifyTime,
                page.iter().map(|entry| entry.modify_time.clone()).collect(),
            )
            .push_column(
                ColumnId::DataSize,
                page.iter().map(|entry| entry.size.to_string()).collect(),
            );
        out.continuation = if end < entries.len() {
            ContinuationToken::new(end as u64)
        } else {
            None
        };
        Ok(out)
    }
}
