//! Collapse replica rows into one entry per data object.
//!
//! Rows arrive ordered by data id. For each run of rows sharing an id the
//! first row with a good status wins; when none is good the first row of the
//! run is used. A run may straddle a page boundary, so both the last reported
//! id and a not-yet-committed candidate survive between pages.

use super::marshal::{DataObjectBatch, DataObjectRow};

/// Outcome of one reduction step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reduction {
    /// A committed logical entry.
    Row(DataObjectRow),
    /// The page ran out before a run was resolved; fetch the next page, or
    /// call [`ReplicaReducer::finish`] when there is none.
    NeedsNextPage,
}

#[derive(Debug, Default, Clone)]
pub struct ReplicaReducer {
    last_seen_data_id: Option<String>,
    pending: Option<DataObjectRow>,
}

impl ReplicaReducer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget everything. Called when a handle is (re)opened.
    pub fn reset(&mut self) {
        self.last_seen_data_id = None;
        self.pending = None;
    }

    #[must_use]
    pub fn last_seen_data_id(&self) -> Option<&str> {
        self.last_seen_data_id.as_deref()
    }

    #[must_use]
    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Advance through `batch` until one logical entry is committed.
    pub fn next(&mut self, batch: &mut DataObjectBatch) -> Reduction {
        loop {
            let Some(row) = batch.peek() else {
                return Reduction::NeedsNextPage;
            };

            if let Some(pending) = &self.pending {
                if row.data_id != pending.data_id {
                    // The run ended without a good replica; the next row
                    // starts a new run and is left for the following call.
                    return self.commit_pending();
                }
                let Some(row) = batch.take_row() else {
                    return Reduction::NeedsNextPage;
                };
                if row.is_good_replica() {
                    log::trace!(
                        "Picked good replica {} of data id {}",
                        row.replica_number,
                        row.data_id
                    );
                    self.pending = None;
                    return Reduction::Row(row);
                }
                continue;
            }

            if !row.data_id.is_empty()
                && self.last_seen_data_id.as_deref() == Some(row.data_id.as_str())
            {
                batch.advance();
                continue;
            }

            let Some(row) = batch.take_row() else {
                return Reduction::NeedsNextPage;
            };
            if row.data_id.is_empty() {
                return Reduction::Row(row);
            }

            self.last_seen_data_id = Some(row.data_id.clone());
            if row.is_good_replica() {
                return Reduction::Row(row);
            }
            self.pending = Some(row);
        }
    }

    /// Commit the candidate left over once no further pages exist.
    pub fn finish(&mut self) -> Option<DataObjectRow> {
        self.pending.take()
    }

    fn commit_pending(&mut self) -> Reduction {
        match self.pending.take() {
            Some(row) => {
                log::trace!(
                    "No good replica for data id {}; using the first row",
                    row.data_id
                );
                Reduction::Row(row)
            }
            None => Reduction::NeedsNextPage,
        }
    }
}

/// Surface every row as its own entry.
pub fn passthrough(batch: &mut DataObjectBatch) -> Reduction {
    batch
        .take_row()
        .map_or(Reduction::NeedsNextPage, Reduction::Row)
}
