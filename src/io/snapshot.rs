//! Parquet catalog snapshot read/write operations
//!
//! A snapshot stores the records of a [`MemoryCatalog`] in one Parquet file so
//! listings can be run offline. Collections, replicas, and special-collection
//! listing entries share a single flat schema; the `row_kind` column says which
//! fields of a row are meaningful and the rest are null.

use crate::catalog::MemoryCatalog;
use crate::catalog::memory::{CollectionRecord, ReplicaRecord, SpecialEntryRecord};
use crate::models::ObjectKind;
use arrow_array::{Array, ArrayRef, Int32Array, Int64Array, RecordBatch, StringArray, UInt64Array};
use arrow_schema::{DataType, Field, Schema};
use parquet::arrow::ArrowWriter;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::file::properties::WriterProperties;
use std::fs::File;
use std::io::{Error, ErrorKind, Result};
use std::path::Path;
use std::sync::Arc;

const KIND_COLLECTION: &str = "collection";
const KIND_REPLICA: &str = "replica";
const KIND_SPECIAL: &str = "special";

/// Return the Arrow schema shared by snapshot writers and readers.
#[must_use]
pub fn snapshot_schema() -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("row_kind", DataType::Utf8, false),
        Field::new("path", DataType::Utf8, false),
        Field::new("name", DataType::Utf8, true),
        Field::new("owner", DataType::Utf8, true),
        Field::new("create_time", DataType::Utf8, true),
        Field::new("modify_time", DataType::Utf8, true),
        Field::new("coll_type", DataType::Utf8, true),
        Field::new("info1", DataType::Utf8, true),
        Field::new("info2", DataType::Utf8, true),
        Field::new("data_id", DataType::UInt64, true),
        Field::new("replica_number", DataType::Int32, true),
        Field::new("replica_status", DataType::Int32, true),
        Field::new("mode", DataType::Int32, true),
        Field::new("size", DataType::Int64, true),
        Field::new("resource", DataType::Utf8, true),
        Field::new("resc_hier", DataType::Utf8, true),
        Field::new("physical_path", DataType::Utf8, true),
        Field::new("checksum", DataType::Utf8, true),
        Field::new("data_type", DataType::Utf8, true),
        Field::new("special_kind", DataType::Utf8, true),
    ]))
}

/// Write every record of `catalog` to a Parquet file.
pub fn write_snapshot(path: &str, catalog: &MemoryCatalog) -> Result<()> {
    let file_path = Path::new(path);

    if let Some(parent) = file_path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }

    let file = File::create(file_path)?;
    let schema = snapshot_schema();
    let props = WriterProperties::builder().build();
    let mut writer =
        ArrowWriter::try_new(file, schema.clone(), Some(props)).map_err(Error::other)?;

    let collections: Vec<&CollectionRecord> = catalog.collections().collect();
    if !collections.is_empty() {
        let batch = create_collections_batch(&schema, &collections)?;
        writer.write(&batch).map_err(Error::other)?;
    }

    if !catalog.replicas().is_empty() {
        let batch = create_replicas_batch(&schema, catalog.replicas())?;
        writer.write(&batch).map_err(Error::other)?;
    }

    if !catalog.special_entries().is_empty() {
        let batch = create_special_entries_batch(&schema, catalog.special_entries())?;
        writer.write(&batch).map_err(Error::other)?;
    }

    writer.close().map_err(Error::other)?;
    log::debug!(
        "Wrote snapshot {path}: {} collections, {} replicas, {} special entries",
        collections.len(),
        catalog.replicas().len(),
        catalog.special_entries().len()
    );
    Ok(())
}

/// Read a Parquet snapshot back into an in-memory catalog.
pub fn read_snapshot(path: &str) -> Result<MemoryCatalog> {
    let file = File::open(path)?;

    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .map_err(|e| Error::new(ErrorKind::InvalidData, e))?;

    let mut reader = builder
        .build()
        .map_err(|e| Error::new(ErrorKind::InvalidData, e))?;

    let mut catalog = MemoryCatalog::new();

    for batch_result in &mut reader {
        let batch = batch_result.map_err(|e| Error::new(ErrorKind::InvalidData, e))?;

        for row_idx in 0..batch.num_rows() {
            let row_kind = required_string(&batch, "row_kind", row_idx)?;
            match row_kind.as_str() {
                KIND_COLLECTION => {
                    catalog.add_collection(extract_collection(&batch, row_idx)?);
                }
                KIND_REPLICA => {
                    catalog.add_replica(extract_replica(&batch, row_idx)?);
                }
                KIND_SPECIAL => {
                    catalog.add_special_entry(extract_special_entry(&batch, row_idx)?);
                }
                other => {
                    return Err(Error::new(
                        ErrorKind::InvalidData,
                        format!("Unknown row kind: {other}"),
                    ));
                }
            }
        }
    }

    Ok(catalog)
}

fn strings<T>(items: &[T], value: impl Fn(&T) -> Option<&str>) -> ArrayRef {
    Arc::new(StringArray::from(items.iter().map(value).collect::<Vec<_>>()))
}

fn null_strings(len: usize) -> ArrayRef {
    Arc::new(StringArray::from(vec![None::<&str>; len]))
}

fn null_i32(len: usize) -> ArrayRef {
    Arc::new(Int32Array::from(vec![None::<i32>; len]))
}

pub fn create_collections_batch(
    schema: &Arc<Schema>,
    collections: &[&CollectionRecord],
) -> Result<RecordBatch> {
    let len = collections.len();

    RecordBatch::try_new(
        schema.clone(),
        vec![
            strings(collections, |_| Some(KIND_COLLECTION)),
            strings(collections, |c| Some(c.path.as_str())),
            null_strings(len),
            strings(collections, |c| Some(c.owner.as_str())),
            strings(collections, |c| Some(c.create_time.as_str())),
            strings(collections, |c| Some(c.modify_time.as_str())),
            strings(collections, |c| Some(c.coll_type.as_str())),
            strings(collections, |c| Some(c.info1.as_str())),
            strings(collections, |c| Some(c.info2.as_str())),
            Arc::new(UInt64Array::from(vec![None::<u64>; len])),
            null_i32(len),
            null_i32(len),
            null_i32(len),
            Arc::new(Int64Array::from(vec![None::<i64>; len])),
            null_strings(len),
            null_strings(len),
            null_strings(len),
            null_strings(len),
            null_strings(len),
            null_strings(len),
        ],
    )
    .map_err(Error::other)
}

pub fn create_replicas_batch(
    schema: &Arc<Schema>,
    replicas: &[ReplicaRecord],
) -> Result<RecordBatch> {
    let ints = |value: fn(&ReplicaRecord) -> i32| -> ArrayRef {
        Arc::new(Int32Array::from(
            replicas.iter().map(|r| Some(value(r))).collect::<Vec<_>>(),
        ))
    };

    RecordBatch::try_new(
        schema.clone(),
        vec![
            strings(replicas, |_| Some(KIND_REPLICA)),
            strings(replicas, |r| Some(r.collection.as_str())),
            strings(replicas, |r| Some(r.name.as_str())),
            strings(replicas, |r| Some(r.owner.as_str())),
            strings(replicas, |r| Some(r.create_time.as_str())),
            strings(replicas, |r| Some(r.modify_time.as_str())),
            null_strings(replicas.len()),
            null_strings(replicas.len()),
            null_strings(replicas.len()),
            Arc::new(UInt64Array::from(
                replicas.iter().map(|r| Some(r.data_id)).collect::<Vec<_>>(),
            )),
            ints(|r| r.replica_number),
            ints(|r| r.replica_status),
            ints(|r| r.mode),
            Arc::new(Int64Array::from(
                replicas.iter().map(|r| Some(r.size)).collect::<Vec<_>>(),
            )),
            strings(replicas, |r| Some(r.resource.as_str())),
            strings(replicas, |r| Some(r.resc_hier.as_str())),
            strings(replicas, |r| Some(r.physical_path.as_str())),
            strings(replicas, |r| Some(r.checksum.as_str())),
            strings(replicas, |r| Some(r.data_type.as_str())),
            null_strings(replicas.len()),
        ],
    )
    .map_err(Error::other)
}

pub fn create_special_entries_batch(
    schema: &Arc<Schema>,
    entries: &[SpecialEntryRecord],
) -> Result<RecordBatch> {
    let len = entries.len();

    RecordBatch::try_new(
        schema.clone(),
        vec![
            strings(entries, |_| Some(KIND_SPECIAL)),
            strings(entries, |e| Some(e.path.as_str())),
            null_strings(len),
            null_strings(len),
            strings(entries, |e| Some(e.create_time.as_str())),
            strings(entries, |e| Some(e.modify_time.as_str())),
            null_strings(len),
            null_strings(len),
            null_strings(len),
            Arc::new(UInt64Array::from(vec![None::<u64>; len])),
            null_i32(len),
            null_i32(len),
            null_i32(len),
            Arc::new(Int64Array::from(
                entries.iter().map(|e| Some(e.size)).collect::<Vec<_>>(),
            )),
            null_strings(len),
            null_strings(len),
            null_strings(len),
            null_strings(len),
            null_strings(len),
            strings(entries, |e| Some(e.kind.as_str())),
        ],
    )
    .map_err(Error::other)
}

fn extract_collection(batch: &RecordBatch, row: usize) -> Result<CollectionRecord> {
    Ok(CollectionRecord {
        path: required_string(batch, "path", row)?,
        owner: optional_string(batch, "owner", row)?,
        create_time: optional_string(batch, "create_time", row)?,
        modify_time: optional_string(batch, "modify_time", row)?,
        coll_type: optional_string(batch, "coll_type", row)?,
        info1: optional_string(batch, "info1", row)?,
        info2: optional_string(batch, "info2", row)?,
    })
}

fn extract_replica(batch: &RecordBatch, row: usize) -> Result<ReplicaRecord> {
    let data_id = get_u64_value(batch, "data_id", row)?
        .ok_or_else(|| Error::new(ErrorKind::InvalidData, "Missing data_id"))?;

    Ok(ReplicaRecord {
        collection: required_string(batch, "path", row)?,
        name: required_string(batch, "name", row)?,
        data_id,
        replica_number: get_i32_value(batch, "replica_number", row)?.unwrap_or_default(),
        replica_status: get_i32_value(batch, "replica_status", row)?.unwrap_or_default(),
        size: get_i64_value(batch, "size", row)?.unwrap_or_default(),
        mode: get_i32_value(batch, "mode", row)?.unwrap_or_default(),
        owner: optional_string(batch, "owner", row)?,
        resource: optional_string(batch, "resource", row)?,
        resc_hier: optional_string(batch, "resc_hier", row)?,
        physical_path: optional_string(batch, "physical_path", row)?,
        checksum: optional_string(batch, "checksum", row)?,
        data_type: optional_string(batch, "data_type", row)?,
        create_time: optional_string(batch, "create_time", row)?,
        modify_time: optional_string(batch, "modify_time", row)?,
    })
}

fn extract_special_entry(batch: &RecordBatch, row: usize) -> Result<SpecialEntryRecord> {
    let label = required_string(batch, "special_kind", row)?;
    let kind = ObjectKind::from_label(&label).ok_or_else(|| {
        Error::new(
            ErrorKind::InvalidData,
            format!("Unknown special entry kind: {label}"),
        )
    })?;

    Ok(SpecialEntryRecord {
        kind,
        path: required_string(batch, "path", row)?,
        create_time: optional_string(batch, "create_time", row)?,
        modify_time: optional_string(batch, "modify_time", row)?,
        size: get_i64_value(batch, "size", row)?.unwrap_or(-1),
    })
}

fn required_string(batch: &RecordBatch, col_name: &str, row: usize) -> Result<String> {
    get_string_value(batch, col_name, row)?
        .ok_or_else(|| Error::new(ErrorKind::InvalidData, format!("Missing {col_name}")))
}

fn optional_string(batch: &RecordBatch, col_name: &str, row: usize) -> Result<String> {
    Ok(get_string_value(batch, col_name, row)?.unwrap_or_default())
}

fn column<'a, A: Array + 'static>(batch: &'a RecordBatch, col_name: &str) -> Result<&'a A> {
    let col = batch.column_by_name(col_name).ok_or_else(|| {
        Error::new(
            ErrorKind::InvalidData,
            format!("Missing column: {col_name}"),
        )
    })?;

    col.as_any().downcast_ref::<A>().ok_or_else(|| {
        Error::new(
            ErrorKind::InvalidData,
            format!("Invalid type for: {col_name}"),
        )
    })
}

fn get_string_value(batch: &RecordBatch, col_name: &str, row: usize) -> Result<Option<String>> {
    let array = column::<StringArray>(batch, col_name)?;
    Ok((!array.is_null(row)).then(|| array.value(row).to_string()))
}

fn get_u64_value(batch: &RecordBatch, col_name: &str, row: usize) -> Result<Option<u64>> {
    let array = column::<UInt64Array>(batch, col_name)?;
    Ok((!array.is_null(row)).then(|| array.value(row)))
}

fn get_i32_value(batch: &RecordBatch, col_name: &str, row: usize) -> Result<Option<i32>> {
    let array = column::<Int32Array>(batch, col_name)?;
    Ok((!array.is_null(row)).then(|| array.value(row)))
}

fn get_i64_value(batch: &RecordBatch, col_name: &str, row: usize) -> Result<Option<i64>> {
    let array = column::<Int64Array>(batch, col_name)?;
    Ok((!array.is_null(row)).then(|| array.value(row)))
}
