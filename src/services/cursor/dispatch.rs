//! Choose and run the catalog request behind each cursor phase.
//!
//! A collection's children come from one of three places: ordinary catalog
//! rows under its own path, catalog rows under the path a linked collection
//! points at, or a listing produced by the catalog's special-collection
//! capability (mounted filesystems, archives). [`plan_query`] picks one and
//! the resulting [`QueryPlan`] is re-run with each continuation token until
//! the phase is drained.

use super::flags::{CursorConfig, QueryFlags};
use super::marshal::{self, CollectionBatch, DataObjectBatch};
use crate::catalog::{
    Catalog, CatalogError, CatalogQuery, ColumnId, Condition, ContinuationToken, GenQueryOut,
};
use crate::models::{ObjectKind, SpecCollClass, SpecialCollection};
use crate::{Error, Result};

/// The two halves of a collection listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Collections,
    DataObjects,
}

impl Phase {
    /// Phase drained first for `flags`.
    #[must_use]
    pub fn first(flags: QueryFlags) -> Self {
        if flags.contains(QueryFlags::DATA_FIRST) {
            Phase::DataObjects
        } else {
            Phase::Collections
        }
    }

    #[must_use]
    pub fn other(self) -> Self {
        match self {
            Phase::Collections => Phase::DataObjects,
            Phase::DataObjects => Phase::Collections,
        }
    }

    #[must_use]
    pub fn object_kind(self) -> ObjectKind {
        match self {
            Phase::Collections => ObjectKind::Collection,
            Phase::DataObjects => ObjectKind::DataObject,
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Collections => f.write_str("collections"),
            Phase::DataObjects => f.write_str("data objects"),
        }
    }
}

/// What the dispatcher needs to know about an open collection.
#[derive(Debug, Clone, Copy)]
pub struct QueryScope<'a> {
    pub path: &'a str,
    pub special_collection: Option<&'a SpecialCollection>,
    pub linked_path: Option<&'a str>,
    pub resource_filter: Option<&'a str>,
}

/// A concrete request, kept for the lifetime of a phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryPlan {
    Catalog {
        /// Path the query conditions target.
        path: String,
        query: CatalogQuery,
    },
    SpecialCollection {
        descriptor: SpecialCollection,
        path: String,
        kind: ObjectKind,
    },
}

impl QueryPlan {
    /// Logical path this request lists.
    #[must_use]
    pub fn target_path(&self) -> &str {
        match self {
            QueryPlan::Catalog { path, .. } | QueryPlan::SpecialCollection { path, .. } => path,
        }
    }

    #[must_use]
    pub fn is_special(&self) -> bool {
        matches!(self, QueryPlan::SpecialCollection { .. })
    }
}

/// Decide which request lists `phase` of `scope`.
#[must_use]
pub fn plan_query(
    scope: &QueryScope<'_>,
    flags: QueryFlags,
    phase: Phase,
    config: &CursorConfig,
) -> QueryPlan {
    match scope.special_collection {
        Some(spec) if spec.class == SpecCollClass::Linked => {
            let Some(target) = scope.linked_path else {
                log::warn!(
                    "Linked collection {} has no target; listing it directly",
                    scope.path
                );
                return catalog_plan(scope, scope.path, flags, phase, config);
            };
            // Linked collections resolve one level at a time.
            let flags = flags.difference(QueryFlags::RECURSIVE_QUERY);
            catalog_plan(scope, target, flags, phase, config)
        }
        Some(spec) => QueryPlan::SpecialCollection {
            descriptor: spec.clone(),
            path: scope.path.to_string(),
            kind: phase.object_kind(),
        },
        None => catalog_plan(scope, scope.path, flags, phase, config),
    }
}

fn catalog_plan(
    scope: &QueryScope<'_>,
    path: &str,
    flags: QueryFlags,
    phase: Phase,
    config: &CursorConfig,
) -> QueryPlan {
    let query = match phase {
        Phase::Collections => collection_query(path, flags, config),
        Phase::DataObjects => {
            let mut query = data_object_query(path, flags, config);
            if flags.contains(QueryFlags::INCLUDE_EXTRA_CONDITIONS)
                && let Some(resource) = scope.resource_filter
            {
                query.condition(
                    ColumnId::DataRescName,
                    Condition::Equals(resource.to_string()),
                );
            }
            query
        }
    };
    QueryPlan::Catalog {
        path: path.to_string(),
        query,
    }
}

fn subtree_condition(path: &str) -> Condition {
    Condition::Subtree(path.to_string())
}

/// Sub-collections of `path` (its whole subtree when recursive).
#[must_use]
pub fn collection_query(path: &str, flags: QueryFlags, config: &CursorConfig) -> CatalogQuery {
    let mut query = CatalogQuery::new(config.max_rows);
    query.zone_hint.clone_from(&config.zone_hint);

    query.condition(ColumnId::CollName, Condition::NotEquals("/".to_string()));
    if flags.contains(QueryFlags::RECURSIVE_QUERY) {
        query.condition(ColumnId::CollName, subtree_condition(path));
    } else {
        query.condition(ColumnId::CollParentName, Condition::Equals(path.to_string()));
    }

    query
        .select(ColumnId::CollName)
        .select(ColumnId::CollOwnerName)
        .select(ColumnId::CollCreateTime)
        .select(ColumnId::CollModifyTime)
        .select(ColumnId::CollType)
        .select(ColumnId::CollInfo1)
        .select(ColumnId::CollInfo2);
    query
}

/// Replica rows of the data objects in `path`, with columns widened by verbosity.
#[must_use]
pub fn data_object_query(path: &str, flags: QueryFlags, config: &CursorConfig) -> CatalogQuery {
    let mut query = CatalogQuery::new(config.max_rows);
    query.zone_hint.clone_from(&config.zone_hint);
    query.total_row_count = true;

    if flags.contains(QueryFlags::RECURSIVE_QUERY) {
        query.condition(ColumnId::CollName, subtree_condition(path));
    } else {
        query.condition(ColumnId::CollName, Condition::Equals(path.to_string()));
    }

    query
        .select(ColumnId::CollName)
        .select(ColumnId::DataName)
        .select(ColumnId::DataId)
        .select(ColumnId::DataMode)
        .select(ColumnId::DataSize)
        .select(ColumnId::DataModifyTime)
        .select(ColumnId::DataCreateTime);

    if flags.wants_long_metadata() {
        query
            .select(ColumnId::DataRescName)
            .select(ColumnId::DataRescHier)
            .select(ColumnId::DataOwnerName)
            .select(ColumnId::DataReplNum)
            .select(ColumnId::DataReplStatus);
    }
    if flags.wants_very_long_metadata() {
        query
            .select(ColumnId::DataPath)
            .select(ColumnId::DataChecksum)
            .select(ColumnId::DataTypeName);
    }
    query
}

/// Run `plan`. An empty result comes back as `Ok(None)`.
pub fn execute<C: Catalog + ?Sized>(
    catalog: &C,
    plan: &QueryPlan,
    continuation: Option<ContinuationToken>,
) -> std::result::Result<Option<GenQueryOut>, CatalogError> {
    let result = match plan {
        QueryPlan::Catalog { query, .. } => catalog.execute_catalog_query(query, continuation),
        QueryPlan::SpecialCollection {
            descriptor,
            path,
            kind,
        } => catalog.execute_special_collection_query(descriptor, path, *kind, continuation),
    };

    match result {
        Ok(out) if out.row_count == 0 && out.continuation.is_none() => Ok(None),
        Ok(out) => Ok(Some(out)),
        Err(CatalogError::NoRowsFound) => Ok(None),
        Err(err) => Err(err),
    }
}

fn run<C: Catalog + ?Sized>(
    catalog: &C,
    plan: &QueryPlan,
    continuation: Option<ContinuationToken>,
) -> Result<Option<GenQueryOut>> {
    log::debug!(
        "Querying {} (special: {}, continuation: {:?})",
        plan.target_path(),
        plan.is_special(),
        continuation.map(|token| token.get())
    );
    execute(catalog, plan, continuation).map_err(|source| Error::Upstream {
        path: plan.target_path().to_string(),
        source,
    })
}

/// Fetch and decode one sub-collection page.
pub fn fetch_collections<C: Catalog + ?Sized>(
    catalog: &C,
    plan: &QueryPlan,
    continuation: Option<ContinuationToken>,
) -> Result<Option<CollectionBatch>> {
    run(catalog, plan, continuation)?
        .map(|out| marshal::collections_from_query(&out))
        .transpose()
}

/// Fetch and decode one data-object page.
pub fn fetch_data_objects<C: Catalog + ?Sized>(
    catalog: &C,
    plan: &QueryPlan,
    continuation: Option<ContinuationToken>,
) -> Result<Option<DataObjectBatch>> {
    run(catalog, plan, continuation)?
        .map(|out| marshal::data_objects_from_query(&out))
        .transpose()
}
