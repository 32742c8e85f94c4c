//! Collection cursor.
//!
//! A [`CollectionHandle`] lists the children of one collection, one entry per
//! [`read_next`](CollectionHandle::read_next) call. Sub-collections and data
//! objects are fetched by two independent paginated queries which are drained
//! one after the other (collections first unless [`QueryFlags::DATA_FIRST`]
//! is set). Replica rows are reduced to one entry per data object unless
//! [`QueryFlags::NO_TRIM_REPLICAS`] is set.
//!
//! ```text
//! Closed --open--> Opened --read_next--> CollectionBatchReady <--+
//!                                 |                              | phase switch
//!                                 +----> DataBatchReady ---------+
//!                                               |
//!                      second phase exhausted   +--> Closed
//! ```
//!
//! Any catalog failure other than "no rows found" closes the handle and is
//! returned to the caller.

pub mod dispatch;
pub mod flags;
pub mod marshal;
pub mod reducer;

pub use dispatch::{Phase, QueryPlan, QueryScope};
pub use flags::{CursorConfig, QueryFlags};
pub use marshal::{CollTypeValue, CollectionRow, DataObjectRow, ResultBatch};
pub use reducer::{Reduction, ReplicaReducer};

use crate::catalog::Catalog;
use crate::models::{
    CollectionEntry, DataObjectEntry, NEWLY_CREATED_COPY, ObjectKind, SpecialCollection,
    SubCollectionEntry,
};
use crate::{Error, Result};
use marshal::{CollectionBatch, DataObjectBatch};

/// Position of a handle in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CursorState {
    Closed,
    Opened,
    CollectionBatchReady,
    DataBatchReady,
}

impl std::fmt::Display for CursorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            CursorState::Closed => "closed",
            CursorState::Opened => "opened",
            CursorState::CollectionBatchReady => "collection batch ready",
            CursorState::DataBatchReady => "data batch ready",
        };
        f.write_str(label)
    }
}

/// An open (or closed) listing of one collection.
///
/// The handle borrows its catalog and is meant to be driven by a single
/// thread. Walk several collections concurrently by opening one handle per
/// traversal.
pub struct CollectionHandle<'c, C: Catalog + ?Sized> {
    catalog: &'c C,
    config: CursorConfig,
    state: CursorState,
    path: String,
    owner: String,
    flags: QueryFlags,
    special_collection: Option<SpecialCollection>,
    linked_path: Option<String>,
    resource_filter: Option<String>,
    phase: Phase,
    plan: Option<QueryPlan>,
    collection_batch: Option<CollectionBatch>,
    data_batch: Option<DataObjectBatch>,
    reducer: ReplicaReducer,
}

impl<C: Catalog + ?Sized> std::fmt::Debug for CollectionHandle<'_, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectionHandle")
            .field("state", &self.state)
            .field("path", &self.path)
            .field("flags", &self.flags)
            .field("special_collection", &self.special_collection)
            .field("linked_path", &self.linked_path)
            .field("phase", &self.phase)
            .finish_non_exhaustive()
    }
}

impl<'c, C: Catalog + ?Sized> CollectionHandle<'c, C> {
    /// A closed handle using the default configuration.
    pub fn new(catalog: &'c C) -> Self {
        Self::with_config(catalog, CursorConfig::default())
    }

    pub fn with_config(catalog: &'c C, config: CursorConfig) -> Self {
        Self {
            catalog,
            config,
            state: CursorState::Closed,
            path: String::new(),
            owner: String::new(),
            flags: QueryFlags::empty(),
            special_collection: None,
            linked_path: None,
            resource_filter: None,
            phase: Phase::Collections,
            plan: None,
            collection_batch: None,
            data_batch: None,
            reducer: ReplicaReducer::new(),
        }
    }

    /// Open `path` for listing. A handle that was already open is closed first.
    pub fn open(&mut self, path: &str, flags: QueryFlags) -> Result<()> {
        self.close();

        if path.is_empty() {
            return Err(Error::InvalidArgument(
                "collection path must not be empty".to_string(),
            ));
        }

        let stat = self.catalog.stat(path).map_err(|source| {
            log::error!("Failed to stat {path}: {source}");
            Error::Upstream {
                path: path.to_string(),
                source,
            }
        })?;
        if stat.kind != ObjectKind::Collection {
            return Err(Error::NotACollection {
                path: path.to_string(),
            });
        }

        self.linked_path = stat
            .special_collection
            .as_ref()
            .and_then(SpecialCollection::redirect_target)
            .map(str::to_string);
        self.special_collection = stat.special_collection;
        self.owner = stat.owner;
        self.path = path.to_string();
        self.flags = flags;
        self.phase = Phase::first(flags);
        self.reducer.reset();
        self.state = CursorState::Opened;

        log::debug!(
            "Opened {path} (flags: {flags:?}, special: {}, linked to: {:?})",
            self.special_collection
                .as_ref()
                .map_or("none", SpecialCollection::type_label),
            self.linked_path
        );
        Ok(())
    }

    /// Next entry, or `Ok(None)` once both phases are exhausted.
    ///
    /// On error the handle is closed; it must be reopened before reuse.
    pub fn read_next(&mut self) -> Result<Option<CollectionEntry>> {
        match self.step() {
            Ok(entry) => Ok(entry),
            Err(err) => {
                log::error!("Listing {} failed: {err}", self.path);
                self.close();
                Err(err)
            }
        }
    }

    /// Release buffers and the descriptor. Safe to call in any state.
    pub fn close(&mut self) {
        if self.state != CursorState::Closed {
            log::trace!("Closing handle on {}", self.path);
        }
        self.state = CursorState::Closed;
        self.plan = None;
        self.collection_batch = None;
        self.data_batch = None;
        self.special_collection = None;
        self.linked_path = None;
        self.owner.clear();
        self.reducer.reset();
    }

    /// Condition data-object queries on a resource name.
    ///
    /// Only applied when the handle is opened with
    /// [`QueryFlags::INCLUDE_EXTRA_CONDITIONS`]. Survives reopening.
    pub fn set_resource_filter(&mut self, resource: Option<&str>) {
        self.resource_filter = resource.map(str::to_string);
    }

    #[must_use]
    pub fn resource_filter(&self) -> Option<&str> {
        self.resource_filter.as_deref()
    }

    #[must_use]
    pub fn state(&self) -> CursorState {
        self.state
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.state != CursorState::Closed
    }

    /// Path passed to the last successful `open`.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub fn flags(&self) -> QueryFlags {
        self.flags
    }

    #[must_use]
    pub fn config(&self) -> &CursorConfig {
        &self.config
    }

    #[must_use]
    pub fn special_collection(&self) -> Option<&SpecialCollection> {
        self.special_collection.as_ref()
    }

    /// Redirect target while a linked collection is open.
    #[must_use]
    pub fn linked_path(&self) -> Option<&str> {
        self.linked_path.as_deref()
    }

    /// Phase being drained, if a batch is loaded.
    #[must_use]
    pub fn phase(&self) -> Option<Phase> {
        matches!(
            self.state,
            CursorState::CollectionBatchReady | CursorState::DataBatchReady
        )
        .then_some(self.phase)
    }

    /// Advisory total row count of the current data-object query.
    #[must_use]
    pub fn total_row_count_hint(&self) -> Option<u64> {
        self.data_batch
            .as_ref()
            .and_then(ResultBatch::total_row_count)
    }

    fn step(&mut self) -> Result<Option<CollectionEntry>> {
        loop {
            match self.state {
                CursorState::Closed => return Ok(None),
                CursorState::Opened => self.enter_phase(Phase::first(self.flags))?,
                CursorState::CollectionBatchReady => {
                    if let Some(row) = self
                        .collection_batch
                        .as_mut()
                        .and_then(ResultBatch::take_row)
                    {
                        return Ok(Some(self.sub_collection_entry(row)));
                    }
                    if !self.fetch_next_page()? {
                        self.finish_phase()?;
                    }
                }
                CursorState::DataBatchReady => {
                    let reduction = match self.data_batch.as_mut() {
                        Some(batch) if self.flags.contains(QueryFlags::NO_TRIM_REPLICAS) => {
                            reducer::passthrough(batch)
                        }
                        Some(batch) => self.reducer.next(batch),
                        None => Reduction::NeedsNextPage,
                    };
                    match reduction {
                        Reduction::Row(row) => return Ok(Some(self.data_object_entry(row))),
                        Reduction::NeedsNextPage => {
                            if self.fetch_next_page()? {
                                continue;
                            }
                            if let Some(row) = self.reducer.finish() {
                                return Ok(Some(self.data_object_entry(row)));
                            }
                            self.finish_phase()?;
                        }
                    }
                }
            }
        }
    }

    fn scope(&self) -> QueryScope<'_> {
        QueryScope {
            path: &self.path,
            special_collection: self.special_collection.as_ref(),
            linked_path: self.linked_path.as_deref(),
            resource_filter: self.resource_filter.as_deref(),
        }
    }

    /// Issue the first query of `phase` and load its batch.
    fn enter_phase(&mut self, phase: Phase) -> Result<()> {
        let plan = dispatch::plan_query(&self.scope(), self.flags, phase, &self.config);
        log::debug!("Listing {phase} of {}", self.path);

        match phase {
            Phase::Collections => {
                let batch = dispatch::fetch_collections(self.catalog, &plan, None)?;
                self.collection_batch = Some(batch.unwrap_or_default());
                self.state = CursorState::CollectionBatchReady;
            }
            Phase::DataObjects => {
                let batch = dispatch::fetch_data_objects(self.catalog, &plan, None)?;
                self.data_batch = Some(batch.unwrap_or_default());
                self.state = CursorState::DataBatchReady;
            }
        }
        self.phase = phase;
        self.plan = Some(plan);
        Ok(())
    }

    /// Replace the current batch with its continuation page.
    ///
    /// Returns `false` when the current batch was the last page.
    fn fetch_next_page(&mut self) -> Result<bool> {
        let continuation = match self.phase {
            Phase::Collections => self
                .collection_batch
                .as_ref()
                .and_then(ResultBatch::continuation),
            Phase::DataObjects => self.data_batch.as_ref().and_then(ResultBatch::continuation),
        };
        let (Some(token), Some(plan)) = (continuation, self.plan.as_ref()) else {
            return Ok(false);
        };

        log::trace!("Fetching next page of {} for {}", self.phase, self.path);
        match self.phase {
            Phase::Collections => {
                let Some(batch) = dispatch::fetch_collections(self.catalog, plan, Some(token))?
                else {
                    return Ok(false);
                };
                self.collection_batch = Some(batch);
            }
            Phase::DataObjects => {
                let Some(batch) = dispatch::fetch_data_objects(self.catalog, plan, Some(token))?
                else {
                    return Ok(false);
                };
                self.data_batch = Some(batch);
            }
        }
        Ok(true)
    }

    /// Drop the drained phase and move to the other one, or close.
    fn finish_phase(&mut self) -> Result<()> {
        match self.phase {
            Phase::Collections => self.collection_batch = None,
            Phase::DataObjects => self.data_batch = None,
        }
        self.plan = None;

        if self.phase == Phase::first(self.flags) {
            self.enter_phase(self.phase.other())
        } else {
            log::debug!("Finished listing {}", self.path);
            self.close();
            Ok(())
        }
    }

    fn sub_collection_entry(&self, row: CollectionRow) -> CollectionEntry {
        let special_collection = match row.coll_type {
            CollTypeValue::Plain => None,
            CollTypeValue::InheritParent => {
                if self.special_collection.is_none() {
                    log::warn!(
                        "{} inherits a special collection but {} has none",
                        row.name,
                        self.path
                    );
                }
                self.special_collection.clone()
            }
            CollTypeValue::Declared(coll_type) => {
                SpecialCollection::resolve(&coll_type, &row.name, &row.info1, &row.info2)
            }
        };

        log::trace!("Sub-collection {}", row.name);
        CollectionEntry::SubCollection(SubCollectionEntry {
            name: row.name,
            owner: row.owner,
            create_time: row.create_time,
            modify_time: row.modify_time,
            special_collection,
        })
    }

    fn data_object_entry(&self, row: DataObjectRow) -> CollectionEntry {
        let mut entry = DataObjectEntry {
            collection: row.collection,
            name: row.name,
            data_id: row.data_id,
            owner: row.owner,
            create_time: row.create_time,
            modify_time: row.modify_time,
            size: row.size,
            mode: row.mode,
            replica_number: row.replica_number,
            replica_status: row.replica_status,
            resource: row.resource,
            resc_hier: row.resc_hier,
            checksum: row.checksum,
            physical_path: row.physical_path,
            data_type: row.data_type,
            special_collection: self.special_collection.clone(),
        };

        // Listings of mounted and archive collections carry no replica metadata.
        if let Some(spec) = &self.special_collection
            && !spec.is_linked()
        {
            entry.resource.clone_from(&spec.resource);
            entry.resc_hier.clone_from(&spec.resc_hier);
            entry.owner.clone_from(&self.owner);
            entry.replica_status = NEWLY_CREATED_COPY;
        }

        log::trace!("Data object {}", entry.path());
        CollectionEntry::DataObject(entry)
    }
}

impl<C: Catalog + ?Sized> Iterator for CollectionHandle<'_, C> {
    type Item = Result<CollectionEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_next().transpose()
    }
}

/// Open `path` on a fresh handle.
pub fn open_collection<'c, C: Catalog + ?Sized>(
    catalog: &'c C,
    path: &str,
    flags: QueryFlags,
    config: CursorConfig,
) -> Result<CollectionHandle<'c, C>> {
    let mut handle = CollectionHandle::with_config(catalog, config);
    handle.open(path, flags)?;
    Ok(handle)
}
