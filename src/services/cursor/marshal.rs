//! Conversion of generic query pages into typed batches.
//!
//! A [`GenQueryOut`] is column-major and loosely typed. The cursor works on
//! [`ResultBatch`] values instead: owned rows with a read position and the
//! continuation token of the page they came from. Absent optional columns are
//! filled with defaults; absent mandatory columns fail with
//! [`Error::SchemaMismatch`].

use crate::catalog::{ColumnId, ContinuationToken, GenQueryOut};
use crate::models::INHERIT_PARENT_SPEC_COLL;
use crate::{Error, Result};

/// One materialized page with its read position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultBatch<R> {
    rows: Vec<R>,
    row_cursor: usize,
    continuation: Option<ContinuationToken>,
    total_row_count: Option<u64>,
}

impl<R> Default for ResultBatch<R> {
    fn default() -> Self {
        Self {
            rows: Vec::new(),
            row_cursor: 0,
            continuation: None,
            total_row_count: None,
        }
    }
}

impl<R> ResultBatch<R> {
    #[must_use]
    pub fn new(
        rows: Vec<R>,
        continuation: Option<ContinuationToken>,
        total_row_count: Option<u64>,
    ) -> Self {
        Self {
            rows,
            row_cursor: 0,
            continuation,
            total_row_count,
        }
    }

    /// A batch standing for "the query matched nothing".
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn row_cursor(&self) -> usize {
        self.row_cursor
    }

    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.row_cursor >= self.rows.len()
    }

    #[must_use]
    pub fn continuation(&self) -> Option<ContinuationToken> {
        self.continuation
    }

    #[must_use]
    pub fn total_row_count(&self) -> Option<u64> {
        self.total_row_count
    }

    /// Next unconsumed row.
    #[must_use]
    pub fn peek(&self) -> Option<&R> {
        self.rows.get(self.row_cursor)
    }

    /// Skip the next row.
    pub fn advance(&mut self) {
        if self.row_cursor < self.rows.len() {
            self.row_cursor += 1;
        }
    }
}

impl<R: Default> ResultBatch<R> {
    /// Consume the next row, moving it out of the batch.
    pub fn take_row(&mut self) -> Option<R> {
        let row = self.rows.get_mut(self.row_cursor)?;
        self.row_cursor += 1;
        Some(std::mem::take(row))
    }
}

/// Special-collection classification carried by a sub-collection row.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CollTypeValue {
    /// Ordinary collection.
    #[default]
    Plain,
    /// Use the parent collection's descriptor.
    InheritParent,
    /// A type value to resolve with the row's info columns.
    Declared(String),
}

impl CollTypeValue {
    fn parse(value: &str) -> Self {
        match value {
            "" => CollTypeValue::Plain,
            INHERIT_PARENT_SPEC_COLL => CollTypeValue::InheritParent,
            other => CollTypeValue::Declared(other.to_string()),
        }
    }
}

/// A sub-collection row.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CollectionRow {
    pub name: String,
    pub owner: String,
    pub create_time: String,
    pub modify_time: String,
    pub coll_type: CollTypeValue,
    pub info1: String,
    pub info2: String,
}

/// A replica row of a data object.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DataObjectRow {
    pub collection: String,
    pub name: String,
    pub data_id: String,
    pub mode: i32,
    pub size: i64,
    pub create_time: String,
    pub modify_time: String,
    pub replica_number: i32,
    pub replica_status: i32,
    pub resource: String,
    pub resc_hier: String,
    pub owner: String,
    pub physical_path: String,
    pub checksum: String,
    pub data_type: String,
}

impl DataObjectRow {
    #[must_use]
    pub fn is_good_replica(&self) -> bool {
        self.replica_status > 0
    }
}

pub type CollectionBatch = ResultBatch<CollectionRow>;
pub type DataObjectBatch = ResultBatch<DataObjectRow>;

/// Column accessor that checks every present column has one value per row.
struct Columns<'a> {
    out: &'a GenQueryOut,
}

impl<'a> Columns<'a> {
    fn new(out: &'a GenQueryOut) -> Result<Self> {
        if let Some(short) = out
            .columns
            .iter()
            .find(|column| column.values.len() < out.row_count)
        {
            return Err(Error::SchemaMismatch {
                column: short.column,
            });
        }
        Ok(Self { out })
    }

    fn mandatory(&self, column: ColumnId) -> Result<&'a [String]> {
        self.out
            .column(column)
            .map(|result| result.values.as_slice())
            .ok_or(Error::SchemaMismatch { column })
    }

    fn optional(&self, column: ColumnId) -> Option<&'a [String]> {
        self.out.column(column).map(|result| result.values.as_slice())
    }

    fn text(&self, column: ColumnId, row: usize) -> String {
        self.optional(column)
            .and_then(|values| values.get(row))
            .cloned()
            .unwrap_or_default()
    }

    fn int(&self, column: ColumnId, row: usize) -> i32 {
        self.optional(column)
            .and_then(|values| values.get(row))
            .map_or(0, |value| i32::try_from(parse_leading_int(value)).unwrap_or(0))
    }
}

/// Integer prefix of `value`, `0` when there is none.
fn parse_leading_int(value: &str) -> i64 {
    let trimmed = value.trim();
    let end = trimmed
        .char_indices()
        .find(|&(idx, c)| !(c.is_ascii_digit() || (idx == 0 && (c == '-' || c == '+'))))
        .map_or(trimmed.len(), |(idx, _)| idx);
    trimmed[..end].parse().unwrap_or(0)
}

/// Decode a sub-collection page.
///
/// A page without the collection-type column (as returned by
/// special-collection listings) marks every row as inheriting the parent's
/// descriptor.
pub fn collections_from_query(out: &GenQueryOut) -> Result<CollectionBatch> {
    let columns = Columns::new(out)?;
    let names = columns.mandatory(ColumnId::CollName)?;
    let coll_types = columns.optional(ColumnId::CollType);

    let rows = (0..out.row_count)
        .map(|row| CollectionRow {
            name: names[row].clone(),
            owner: columns.text(ColumnId::CollOwnerName, row),
            create_time: columns.text(ColumnId::CollCreateTime, row),
            modify_time: columns.text(ColumnId::CollModifyTime, row),
            coll_type: coll_types.map_or(CollTypeValue::InheritParent, |values| {
                CollTypeValue::parse(&values[row])
            }),
            info1: columns.text(ColumnId::CollInfo1, row),
            info2: columns.text(ColumnId::CollInfo2, row),
        })
        .collect::<Vec<_>>();

    log::trace!(
        "Decoded {} sub-collection rows (continuation: {:?})",
        rows.len(),
        out.continuation
    );

    Ok(ResultBatch::new(rows, out.continuation, out.total_row_count))
}

/// Decode a data-object page, one row per replica.
pub fn data_objects_from_query(out: &GenQueryOut) -> Result<DataObjectBatch> {
    let columns = Columns::new(out)?;
    let collections = columns.mandatory(ColumnId::CollName)?;
    let names = columns.mandatory(ColumnId::DataName)?;
    let sizes = columns.optional(ColumnId::DataSize);

    let rows = (0..out.row_count)
        .map(|row| DataObjectRow {
            collection: collections[row].clone(),
            name: names[row].clone(),
            data_id: columns.text(ColumnId::DataId, row),
            mode: columns.int(ColumnId::DataMode, row),
            size: sizes.map_or(-1, |values| parse_leading_int(&values[row])),
            create_time: columns.text(ColumnId::DataCreateTime, row),
            modify_time: columns.text(ColumnId::DataModifyTime, row),
            replica_number: columns.int(ColumnId::DataReplNum, row),
            replica_status: columns.int(ColumnId::DataReplStatus, row),
            resource: columns.text(ColumnId::DataRescName, row),
            resc_hier: columns.text(ColumnId::DataRescHier, row),
            owner: columns.text(ColumnId::DataOwnerName, row),
            physical_path: columns.text(ColumnId::DataPath, row),
            checksum: columns.text(ColumnId::DataChecksum, row),
            data_type: columns.text(ColumnId::DataTypeName, row),
        })
        .collect::<Vec<_>>();

    log::trace!(
        "Decoded {} data-object rows (continuation: {:?})",
        rows.len(),
        out.continuation
    );

    Ok(ResultBatch::new(rows, out.continuation, out.total_row_count))
}
