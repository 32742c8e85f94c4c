//! Query option flags and cursor configuration.

use crate::catalog::MAX_SQL_ROWS;

bitflags::bitflags! {
    /// Options recognized by [`CollectionHandle::open`](super::CollectionHandle::open).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct QueryFlags: u32 {
        /// Request resource, owner and replica columns for data objects.
        const LONG_METADATA = 0x01;
        /// Additionally request physical path, checksum and data type.
        const VERY_LONG_METADATA = 0x02;
        /// Match the whole subtree instead of direct children.
        const RECURSIVE_QUERY = 0x04;
        /// Drain data objects before sub-collections.
        const DATA_FIRST = 0x08;
        /// Report every replica row instead of one entry per data object.
        const NO_TRIM_REPLICAS = 0x10;
        /// Apply the handle's resource filter to data-object queries.
        const INCLUDE_EXTRA_CONDITIONS = 0x20;
    }
}

impl QueryFlags {
    /// Flags for a listing at the given verbosity. Very long wins over long.
    #[must_use]
    pub fn from_verbosity(long: bool, very_long: bool) -> Self {
        if very_long {
            QueryFlags::VERY_LONG_METADATA
        } else if long {
            QueryFlags::LONG_METADATA
        } else {
            QueryFlags::empty()
        }
    }

    #[must_use]
    pub fn wants_long_metadata(&self) -> bool {
        self.intersects(QueryFlags::LONG_METADATA | QueryFlags::VERY_LONG_METADATA)
    }

    #[must_use]
    pub fn wants_very_long_metadata(&self) -> bool {
        self.contains(QueryFlags::VERY_LONG_METADATA)
    }
}

/// Settings passed explicitly to every handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CursorConfig {
    /// Rows requested per catalog page.
    pub max_rows: usize,
    /// Zone to route catalog queries to, when not the local one.
    pub zone_hint: Option<String>,
}

impl Default for CursorConfig {
    fn default() -> Self {
        Self {
            max_rows: MAX_SQL_ROWS,
            zone_hint: None,
        }
    }
}

impl CursorConfig {
    #[must_use]
    pub fn with_max_rows(mut self, max_rows: usize) -> Self {
        self.max_rows = max_rows.max(1);
        self
    }

    #[must_use]
    pub fn with_zone_hint(mut self, zone: impl Into<String>) -> Self {
        self.zone_hint = Some(zone.into());
        self
    }
}
