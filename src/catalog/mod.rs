//! Catalog collaborator interface.
//!
//! The cursor never talks to the network directly. It consumes three
//! operations, expressed by the [`Catalog`] trait:
//!
//! - `stat` resolves a logical path to a collection or data object, together
//!   with its special-collection descriptor.
//! - `execute_catalog_query` runs a column-selecting query with conditions and
//!   returns one page of a generic tabular result.
//! - `execute_special_collection_query` lists an externally-materialized
//!   collection (mounted filesystem, archive contents).
//!
//! Results come back as [`GenQueryOut`]: column-major value blocks keyed by
//! [`ColumnId`], plus a continuation token when more pages remain. An empty
//! result is reported as [`CatalogError::NoRowsFound`], never as a zero-row
//! page.

pub mod memory;

pub use memory::MemoryCatalog;

use crate::models::{ObjStat, ObjectKind, SpecialCollection};
use std::num::NonZeroU64;

/// Page size requested from the catalog unless configured otherwise.
pub const MAX_SQL_ROWS: usize = 256;

/// Catalog columns the cursor knows how to request and decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ColumnId {
    CollName,
    CollParentName,
    CollOwnerName,
    CollCreateTime,
    CollModifyTime,
    CollType,
    CollInfo1,
    CollInfo2,
    DataName,
    DataId,
    DataMode,
    DataSize,
    DataCreateTime,
    DataModifyTime,
    DataReplNum,
    DataReplStatus,
    DataRescName,
    DataRescHier,
    DataOwnerName,
    DataPath,
    DataChecksum,
    DataTypeName,
}

impl ColumnId {
    pub const ALL: [ColumnId; 22] = [
        ColumnId::CollName,
        ColumnId::CollParentName,
        ColumnId::CollOwnerName,
        ColumnId::CollCreateTime,
        ColumnId::CollModifyTime,
        ColumnId::CollType,
        ColumnId::CollInfo1,
        ColumnId::CollInfo2,
        ColumnId::DataName,
        ColumnId::DataId,
        ColumnId::DataMode,
        ColumnId::DataSize,
        ColumnId::DataCreateTime,
        ColumnId::DataModifyTime,
        ColumnId::DataReplNum,
        ColumnId::DataReplStatus,
        ColumnId::DataRescName,
        ColumnId::DataRescHier,
        ColumnId::DataOwnerName,
        ColumnId::DataPath,
        ColumnId::DataChecksum,
        ColumnId::DataTypeName,
    ];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnId::CollName => "COLL_NAME",
            ColumnId::CollParentName => "COLL_PARENT_NAME",
            ColumnId::CollOwnerName => "COLL_OWNER_NAME",
            ColumnId::CollCreateTime => "COLL_CREATE_TIME",
            ColumnId::CollModifyTime => "COLL_MODIFY_TIME",
            ColumnId::CollType => "COLL_TYPE",
            ColumnId::CollInfo1 => "COLL_INFO1",
            ColumnId::CollInfo2 => "COLL_INFO2",
            ColumnId::DataName => "DATA_NAME",
            ColumnId::DataId => "D_DATA_ID",
            ColumnId::DataMode => "DATA_MODE",
            ColumnId::DataSize => "DATA_SIZE",
            ColumnId::DataCreateTime => "D_CREATE_TIME",
            ColumnId::DataModifyTime => "D_MODIFY_TIME",
            ColumnId::DataReplNum => "DATA_REPL_NUM",
            ColumnId::DataReplStatus => "D_REPL_STATUS",
            ColumnId::DataRescName => "D_RESC_NAME",
            ColumnId::DataRescHier => "D_RESC_HIER",
            ColumnId::DataOwnerName => "D_OWNER_NAME",
            ColumnId::DataPath => "D_DATA_PATH",
            ColumnId::DataChecksum => "D_DATA_CHECKSUM",
            ColumnId::DataTypeName => "DATA_TYPE_NAME",
        }
    }

    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|column| column.as_str() == label)
    }
}

impl std::fmt::Display for ColumnId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Condition attached to a column in a catalog query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    Equals(String),
    NotEquals(String),
    /// The path itself or anything below it.
    Subtree(String),
}

impl Condition {
    #[must_use]
    pub fn matches(&self, value: &str) -> bool {
        match self {
            Condition::Equals(expected) => value == expected,
            Condition::NotEquals(expected) => value != expected,
            Condition::Subtree(root) if root == "/" => value.starts_with('/'),
            Condition::Subtree(root) => {
                value == root
                    || value
                        .strip_prefix(root.as_str())
                        .is_some_and(|rest| rest.starts_with('/'))
            }
        }
    }
}

impl std::fmt::Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Condition::Equals(value) => write!(f, "= '{value}'"),
            Condition::NotEquals(value) => write!(f, "<> '{value}'"),
            Condition::Subtree(root) if root == "/" => f.write_str("like '/%'"),
            Condition::Subtree(root) => write!(f, "= '{root}' || like '{root}/%'"),
        }
    }
}

/// A column-selecting catalog query.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CatalogQuery {
    pub select: Vec<ColumnId>,
    pub conditions: Vec<(ColumnId, Condition)>,
    pub max_rows: usize,
    pub total_row_count: bool,
    pub zone_hint: Option<String>,
}

impl CatalogQuery {
    #[must_use]
    pub fn new(max_rows: usize) -> Self {
        Self {
            max_rows,
            ..Self::default()
        }
    }

    pub fn select(&mut self, column: ColumnId) -> &mut Self {
        if !self.select.contains(&column) {
            self.select.push(column);
        }
        self
    }

    pub fn condition(&mut self, column: ColumnId, condition: Condition) -> &mut Self {
        self.conditions.push((column, condition));
        self
    }

    #[must_use]
    pub fn selects(&self, column: ColumnId) -> bool {
        self.select.contains(&column)
    }

    /// Conditions attached to `column`.
    pub fn conditions_on(&self, column: ColumnId) -> impl Iterator<Item = &Condition> {
        self.conditions
            .iter()
            .filter(move |(col, _)| *col == column)
            .map(|(_, condition)| condition)
    }
}

/// Opaque marker returned by the catalog when more rows are available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContinuationToken(NonZeroU64);

impl ContinuationToken {
    /// Build a token; `0` means "no more pages".
    #[must_use]
    pub fn new(raw: u64) -> Option<Self> {
        NonZeroU64::new(raw).map(Self)
    }

    #[must_use]
    pub fn get(&self) -> u64 {
        self.0.get()
    }
}

/// One column of a query result: `row_count` values in row order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlResult {
    pub column: ColumnId,
    pub values: Vec<String>,
}

/// A generic tabular query result page.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GenQueryOut {
    pub row_count: usize,
    pub columns: Vec<SqlResult>,
    pub continuation: Option<ContinuationToken>,
    /// Advisory total over all pages, when the catalog was asked for it.
    pub total_row_count: Option<u64>,
}

impl GenQueryOut {
    #[must_use]
    pub fn new(row_count: usize) -> Self {
        Self {
            row_count,
            ..Self::default()
        }
    }

    /// Append a column; the caller keeps `values.len() == row_count`.
    pub fn push_column(&mut self, column: ColumnId, values: Vec<String>) -> &mut Self {
        self.columns.push(SqlResult { column, values });
        self
    }

    #[must_use]
    pub fn column(&self, column: ColumnId) -> Option<&SqlResult> {
        self.columns.iter().find(|result| result.column == column)
    }

    /// Value of `column` at `row`, if the column is present.
    #[must_use]
    pub fn value(&self, column: ColumnId, row: usize) -> Option<&str> {
        self.column(column)
            .and_then(|result| result.values.get(row))
            .map(String::as_str)
    }
}

/// Failure reported by a catalog collaborator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    /// The query matched nothing. Used as the exhaustion signal.
    #[error("no rows found")]
    NoRowsFound,
    #[error("object does not exist: {path}")]
    NotFound { path: String },
    #[error("catalog request failed with status {code}: {message}")]
    Failed { code: i32, message: String },
    #[error("catalog request timed out during {operation}")]
    Timeout { operation: String },
}

/// Operations the cursor needs from the catalog.
///
/// Implementations may be backed by a network connection or by local
/// records. A single implementation must not be driven by overlapping
/// requests unless it synchronizes internally.
pub trait Catalog {
    /// Resolve `path` to a collection or data object.
    fn stat(&self, path: &str) -> Result<ObjStat, CatalogError>;

    /// Run `query`, resuming from `continuation` when given.
    fn execute_catalog_query(
        &self,
        query: &CatalogQuery,
        continuation: Option<ContinuationToken>,
    ) -> Result<GenQueryOut, CatalogError>;

    /// List the children of `path` inside a mounted or archive collection.
    fn execute_special_collection_query(
        &self,
        descriptor: &SpecialCollection,
        path: &str,
        kind: ObjectKind,
        continuation: Option<ContinuationToken>,
    ) -> Result<GenQueryOut, CatalogError>;
}

impl<C: Catalog + ?Sized> Catalog for &C {
    fn stat(&self, path: &str) -> Result<ObjStat, CatalogError> {
        (**self).stat(path)
    }

    fn execute_catalog_query(
        &self,
        query: &CatalogQuery,
        continuation: Option<ContinuationToken>,
    ) -> Result<GenQueryOut, CatalogError> {
        (**self).execute_catalog_query(query, continuation)
    }

    fn execute_special_collection_query(
        &self,
        descriptor: &SpecialCollection,
        path: &str,
        kind: ObjectKind,
        continuation: Option<ContinuationToken>,
    ) -> Result<GenQueryOut, CatalogError> {
        (**self)
            .execute_special_collection_query(descriptor, path, kind, continuation)
    }
}
