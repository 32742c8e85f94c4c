//! Recursive collection walking built on the cursor.
//!
//! Each collection is listed by its own [`CollectionHandle`], which is closed
//! before its sub-collections are visited. With `parallel` set, sibling
//! sub-trees are walked on the rayon pool, one handle per task. Output order
//! is the same either way: a collection's entries, then the walk of each of
//! its sub-collections in listing order.
//!
//! A sub-collection whose rows come from a collection already being listed
//! further up the same branch (a link back to an ancestor) is reported but not
//! descended into.

use crate::catalog::Catalog;
use crate::models::{CollectionEntry, SpecialCollection};
use crate::services::cursor::{CollectionHandle, CursorConfig, QueryFlags};
use crate::Result;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Options for [`walk_collection`].
#[derive(Debug, Clone, Default)]
pub struct WalkOptions {
    /// Flags for every handle. `RECURSIVE_QUERY` is ignored; the walker recurses itself.
    pub flags: QueryFlags,
    /// Deepest level to list; the root's children are level 1.
    pub max_depth: Option<u16>,
    pub parallel: bool,
    /// Descend into linked sub-collections.
    pub follow_links: bool,
    pub resource_filter: Option<String>,
    pub config: CursorConfig,
}

/// An entry and the level it was found at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalkEntry {
    pub depth: u16,
    #[serde(flatten)]
    pub entry: CollectionEntry,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalkSummary {
    pub root: String,
    pub entries: Vec<WalkEntry>,
    pub collection_count: u64,
    pub data_object_count: u64,
    /// Sum of known data-object sizes. Unknown (`-1`) sizes count as zero.
    pub total_bytes: u64,
}

impl WalkSummary {
    fn from_entries(root: &str, entries: Vec<WalkEntry>) -> Self {
        let mut summary = Self {
            root: root.to_string(),
            entries: Vec::new(),
            collection_count: 0,
            data_object_count: 0,
            total_bytes: 0,
        };
        for walked in &entries {
            match &walked.entry {
                CollectionEntry::SubCollection(_) => summary.collection_count += 1,
                CollectionEntry::DataObject(data) => {
                    summary.data_object_count += 1;
                    summary.total_bytes = summary
                        .total_bytes
                        .saturating_add(u64::try_from(data.size).unwrap_or(0));
                }
            }
        }
        summary.entries = entries;
        summary
    }
}

/// Walk the tree under `root`, stopping at the first error.
pub fn walk_collection<C: Catalog + Sync + ?Sized>(
    catalog: &C,
    root: &str,
    options: &WalkOptions,
) -> Result<WalkSummary> {
    log::debug!(
        "Walking {root} (max depth: {:?}, parallel: {})",
        options.max_depth,
        options.parallel
    );
    let entries = walk_node(catalog, root, 1, &[], options)?;
    let summary = WalkSummary::from_entries(root, entries);
    log::debug!(
        "Walked {root}: {} collections, {} data objects, {} bytes",
        summary.collection_count,
        summary.data_object_count,
        summary.total_bytes
    );
    Ok(summary)
}

fn walk_node<C: Catalog + Sync + ?Sized>(
    catalog: &C,
    path: &str,
    depth: u16,
    ancestors: &[String],
    options: &WalkOptions,
) -> Result<Vec<WalkEntry>> {
    let mut handle = CollectionHandle::with_config(catalog, options.config.clone());
    handle.set_resource_filter(options.resource_filter.as_deref());
    handle.open(path, options.flags.difference(QueryFlags::RECURSIVE_QUERY))?;

    // Collections listed on the way down, by the path their rows come from.
    let mut chain = ancestors.to_vec();
    chain.push(handle.linked_path().unwrap_or(path).to_string());

    let mut entries = Vec::new();
    let mut children = Vec::new();
    for entry in &mut handle {
        let entry = entry?;
        if let CollectionEntry::SubCollection(coll) = &entry
            && should_descend(coll.special_collection.as_ref(), depth, options)
        {
            let target = coll
                .special_collection
                .as_ref()
                .and_then(SpecialCollection::redirect_target)
                .unwrap_or(coll.name.as_str());
            if chain.iter().any(|seen| seen == target) {
                log::warn!(
                    "Not descending into {}: it leads back to {target}",
                    coll.name
                );
            } else {
                children.push(coll.name.clone());
            }
        }
        entries.push(WalkEntry { depth, entry });
    }
    handle.close();

    let child_depth = depth.saturating_add(1);
    let nested: Vec<Vec<WalkEntry>> = if options.parallel {
        children
            .par_iter()
            .map(|child| walk_node(catalog, child, child_depth, &chain, options))
            .collect::<Result<_>>()?
    } else {
        children
            .iter()
            .map(|child| walk_node(catalog, child, child_depth, &chain, options))
            .collect::<Result<_>>()?
    };

    entries.extend(nested.into_iter().flatten());
    Ok(entries)
}

fn should_descend(
    special_collection: Option<&SpecialCollection>,
    depth: u16,
    options: &WalkOptions,
) -> bool {
    if depth == u16::MAX || options.max_depth.is_some_and(|max| depth >= max) {
        return false;
    }
    !special_collection.is_some_and(|spec| spec.is_linked() && !options.follow_links)
}
