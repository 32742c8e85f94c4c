//! Output formatting for CLI

use crate::models::{CollectionEntry, DataObjectEntry, SpecCollClass, SubCollectionEntry};
use crate::services::cursor::QueryFlags;
use crate::services::walk::WalkSummary;

/// Marker printed before the name of a data object with a good replica.
const GOOD_REPLICA_MARK: &str = "&";

fn sub_collection_line(coll: &SubCollectionEntry) -> String {
    let Some(spec) = &coll.special_collection else {
        return format!("C- {}", coll.name);
    };

    let target = match spec.class {
        SpecCollClass::Linked => spec.redirect_target().unwrap_or_default(),
        SpecCollClass::Mounted => spec.phy_path.as_str(),
        SpecCollClass::StructFile(_) => spec.obj_path.as_str(),
    };
    format!("C- {}  {} {}", coll.name, spec.type_label(), target)
}

fn data_object_lines(data: &DataObjectEntry, flags: QueryFlags) -> Vec<String> {
    if !flags.wants_long_metadata() {
        return vec![data.name.clone()];
    }

    let mark = if data.replica_status > 0 {
        GOOD_REPLICA_MARK
    } else {
        " "
    };
    let mut lines = vec![format!(
        "{:<12} {:>3} {:<20} {:>12} {} {} {}",
        data.owner,
        data.replica_number,
        data.resource,
        data.size,
        data.modify_time,
        mark,
        data.name
    )];

    if flags.wants_very_long_metadata() {
        lines.push(format!(
            "    {}    {}    {}",
            data.checksum, data.data_type, data.physical_path
        ));
    }
    lines
}

/// Lines describing one entry, without indentation.
#[must_use]
pub fn format_entry(entry: &CollectionEntry, flags: QueryFlags) -> Vec<String> {
    match entry {
        CollectionEntry::SubCollection(coll) => vec![sub_collection_line(coll)],
        CollectionEntry::DataObject(data) => data_object_lines(data, flags),
    }
}

/// Text listing of one collection.
#[must_use]
pub fn format_listing(root: &str, entries: &[CollectionEntry], flags: QueryFlags) -> String {
    let mut out = format!("{root}:\n");
    for entry in entries {
        for line in format_entry(entry, flags) {
            out.push_str("  ");
            out.push_str(&line);
            out.push('\n');
        }
    }
    out
}

/// Text listing of a walk, indented by depth, followed by totals.
#[must_use]
pub fn format_walk(summary: &WalkSummary, flags: QueryFlags) -> String {
    let mut out = format!("{}:\n", summary.root);
    for walked in &summary.entries {
        let indent = "  ".repeat(usize::from(walked.depth));
        for line in format_entry(&walked.entry, flags) {
            out.push_str(&indent);
            out.push_str(&line);
            out.push('\n');
        }
    }
    out.push_str(&format!(
        "{} collections, {} data objects, {} bytes\n",
        summary.collection_count, summary.data_object_count, summary.total_bytes
    ));
    out
}

/// JSON listing of one collection.
#[must_use]
pub fn format_json(root: &str, entries: &[CollectionEntry]) -> String {
    let output = serde_json::json!({
        "root": root,
        "entry_count": entries.len(),
        "entries": entries,
    });

    serde_json::to_string_pretty(&output).unwrap_or_else(|_| "{}".to_string())
}

/// JSON form of a walk.
#[must_use]
pub fn format_walk_json(summary: &WalkSummary) -> String {
    serde_json::to_string_pretty(summary).unwrap_or_else(|_| "{}".to_string())
}
