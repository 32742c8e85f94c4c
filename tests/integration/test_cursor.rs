//! Cursor lifecycle and phase ordering

use crate::fixtures::{
    HOME, ScriptedCatalog, coll_page, collection_stat, data_page, home_catalog, paths,
};
use collwalk::catalog::memory::CatalogCall;
use collwalk::catalog::ColumnId;
use collwalk::models::ObjectKind;
use collwalk::services::cursor::Phase;
use collwalk::{CollectionEntry, CollectionHandle, CursorState, Error, QueryFlags, list_collection};

fn drain<C: collwalk::Catalog + ?Sized>(handle: &mut CollectionHandle<'_, C>) -> Vec<CollectionEntry> {
    let mut entries = Vec::new();
    while let Some(entry) = handle.read_next().unwrap() {
        entries.push(entry);
    }
    entries
}

#[test]
fn test_home_listing_scenario() {
    let catalog = ScriptedCatalog::new(collection_stat(HOME, None))
        .with_collection_pages(vec![coll_page(&[
            "/tempZone/home/rods/a",
            "/tempZone/home/rods/b",
        ])])
        .with_data_pages(vec![data_page(HOME, &[("f1", "7", 1), ("f1", "7", 0)])]);

    let mut handle = CollectionHandle::new(&catalog);
    handle.open(HOME, QueryFlags::empty()).unwrap();
    assert_eq!(handle.state(), CursorState::Opened);
    assert_eq!(handle.phase(), None);

    let first = handle.read_next().unwrap().unwrap();
    assert_eq!(handle.state(), CursorState::CollectionBatchReady);
    assert_eq!(handle.phase(), Some(Phase::Collections));
    assert_eq!(first.as_sub_collection().unwrap().name, "/tempZone/home/rods/a");

    let second = handle.read_next().unwrap().unwrap();
    assert_eq!(second.as_sub_collection().unwrap().name, "/tempZone/home/rods/b");

    let third = handle.read_next().unwrap().unwrap();
    assert_eq!(handle.state(), CursorState::DataBatchReady);
    assert_eq!(handle.phase(), Some(Phase::DataObjects));
    let data = third.as_data_object().unwrap();
    assert_eq!(data.name, "f1");
    assert_eq!(data.replica_status, 1);

    assert!(handle.read_next().unwrap().is_none());
    assert_eq!(handle.state(), CursorState::Closed);
    assert_eq!(handle.phase(), None);
}

#[test]
fn test_exhaustion_counts_entries_once() {
    let catalog = home_catalog();

    for flags in [QueryFlags::empty(), QueryFlags::DATA_FIRST] {
        let mut handle = CollectionHandle::new(&catalog);
        handle.open(HOME, flags).unwrap();

        // 2 sub-collections + 2 data objects (f1 has two replicas)
        for _ in 0..4 {
            assert!(handle.read_next().unwrap().is_some());
        }
        assert!(handle.read_next().unwrap().is_none());
        assert!(handle.read_next().unwrap().is_none());
    }
}

#[test]
fn test_phase_ordering_follows_data_first() {
    let catalog = home_catalog();

    let collections_first = list_collection(&catalog, HOME, QueryFlags::empty()).unwrap();
    let kinds: Vec<ObjectKind> = collections_first.iter().map(CollectionEntry::kind).collect();
    assert_eq!(
        kinds,
        vec![
            ObjectKind::Collection,
            ObjectKind::Collection,
            ObjectKind::DataObject,
            ObjectKind::DataObject
        ]
    );

    let data_first = list_collection(&catalog, HOME, QueryFlags::DATA_FIRST).unwrap();
    let kinds: Vec<ObjectKind> = data_first.iter().map(CollectionEntry::kind).collect();
    assert_eq!(
        kinds,
        vec![
            ObjectKind::DataObject,
            ObjectKind::DataObject,
            ObjectKind::Collection,
            ObjectKind::Collection
        ]
    );

    let mut sorted_a = paths(&collections_first);
    let mut sorted_b = paths(&data_first);
    sorted_a.sort();
    sorted_b.sort();
    assert_eq!(sorted_a, sorted_b);
}

#[test]
fn test_close_is_idempotent() {
    let catalog = home_catalog();

    let mut never_opened = CollectionHandle::new(&catalog);
    never_opened.close();
    never_opened.close();
    assert_eq!(never_opened.state(), CursorState::Closed);
    assert!(never_opened.read_next().unwrap().is_none());

    let mut handle = CollectionHandle::new(&catalog);
    handle.open(HOME, QueryFlags::empty()).unwrap();
    handle.read_next().unwrap();
    handle.close();
    handle.close();
    assert_eq!(handle.state(), CursorState::Closed);
    assert!(handle.special_collection().is_none());
    assert!(handle.read_next().unwrap().is_none());
}

#[test]
fn test_open_rejects_data_object() {
    let catalog = home_catalog();
    let mut handle = CollectionHandle::new(&catalog);

    let err = handle
        .open("/tempZone/home/rods/f1", QueryFlags::empty())
        .unwrap_err();
    assert!(matches!(err, Error::NotACollection { ref path } if path == "/tempZone/home/rods/f1"));
    assert_eq!(handle.state(), CursorState::Closed);
}

#[test]
fn test_open_rejects_empty_path() {
    let catalog = home_catalog();
    let mut handle = CollectionHandle::new(&catalog);

    let err = handle.open("", QueryFlags::empty()).unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));
    assert!(catalog.calls().is_empty());
}

#[test]
fn test_open_missing_path_reports_upstream_error() {
    let catalog = home_catalog();
    let mut handle = CollectionHandle::new(&catalog);

    let err = handle
        .open("/tempZone/home/nobody", QueryFlags::empty())
        .unwrap_err();
    assert!(matches!(err, Error::Upstream { .. }));
    assert_eq!(err.path(), Some("/tempZone/home/nobody"));
}

#[test]
fn test_reopen_lists_new_collection() {
    let catalog = home_catalog();
    let mut handle = CollectionHandle::new(&catalog);

    handle.open(HOME, QueryFlags::empty()).unwrap();
    handle.read_next().unwrap();

    handle.open("/tempZone/home/rods/b", QueryFlags::empty()).unwrap();
    let entries = drain(&mut handle);
    assert_eq!(paths(&entries), vec!["/tempZone/home/rods/b/y.txt".to_string()]);
}

#[test]
fn test_iterator_matches_read_next() {
    let catalog = home_catalog();

    let mut handle = CollectionHandle::new(&catalog);
    handle.open(HOME, QueryFlags::LONG_METADATA).unwrap();
    let via_read_next = drain(&mut handle);

    handle.open(HOME, QueryFlags::LONG_METADATA).unwrap();
    let via_iterator: Vec<CollectionEntry> = handle.by_ref().collect::<Result<_, _>>().unwrap();

    assert_eq!(via_read_next, via_iterator);
    assert!(handle.next().is_none());
}

#[test]
fn test_long_metadata_picks_good_replica() {
    let catalog = home_catalog();

    let entries = list_collection(&catalog, HOME, QueryFlags::LONG_METADATA).unwrap();
    let f1 = entries
        .iter()
        .filter_map(CollectionEntry::as_data_object)
        .find(|data| data.name == "f1")
        .unwrap();
    assert_eq!(f1.replica_number, 1);
    assert_eq!(f1.resource, "replResc");
    assert_eq!(f1.resc_hier, "replResc;leafA");
    assert_eq!(f1.owner, "rods");
    assert_eq!(f1.size, 100);
}

#[test]
fn test_short_listing_requests_no_replica_columns() {
    let catalog = home_catalog();
    list_collection(&catalog, HOME, QueryFlags::empty()).unwrap();

    let data_query = catalog
        .calls()
        .into_iter()
        .find_map(|call| match call {
            CatalogCall::Query { query, .. } if query.selects(ColumnId::DataName) => Some(query),
            _ => None,
        })
        .unwrap();
    assert!(!data_query.selects(ColumnId::DataReplStatus));
    assert!(!data_query.selects(ColumnId::DataChecksum));
    assert!(data_query.total_row_count);
}

#[test]
fn test_resource_filter_needs_extra_conditions_flag() {
    let catalog = home_catalog();
    let mut handle = CollectionHandle::new(&catalog);
    handle.set_resource_filter(Some("replResc"));

    handle
        .open(HOME, QueryFlags::LONG_METADATA | QueryFlags::DATA_FIRST)
        .unwrap();
    let unfiltered: Vec<String> = drain(&mut handle)
        .iter()
        .filter_map(CollectionEntry::as_data_object)
        .map(|data| data.name.clone())
        .collect();
    assert_eq!(unfiltered, vec!["f1", "f2"]);

    handle
        .open(
            HOME,
            QueryFlags::LONG_METADATA | QueryFlags::INCLUDE_EXTRA_CONDITIONS,
        )
        .unwrap();
    let filtered: Vec<_> = drain(&mut handle)
        .into_iter()
        .filter_map(|entry| match entry {
            CollectionEntry::DataObject(data) => Some(data),
            CollectionEntry::SubCollection(_) => None,
        })
        .collect();
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0].name, "f1");
    assert_eq!(filtered[0].resource, "replResc");
    assert_eq!(handle.resource_filter(), Some("replResc"));
}

#[test]
fn test_zone_hint_forwarded_on_queries() {
    let catalog = home_catalog();
    let config = collwalk::CursorConfig::default()
        .with_zone_hint("otherZone")
        .with_max_rows(16);
    let mut handle = CollectionHandle::with_config(&catalog, config);
    handle.open(HOME, QueryFlags::empty()).unwrap();
    drain(&mut handle);

    let queries: Vec<_> = catalog
        .calls()
        .into_iter()
        .filter_map(|call| match call {
            CatalogCall::Query { query, .. } => Some(query),
            _ => None,
        })
        .collect();
    assert_eq!(queries.len(), 2);
    for query in queries {
        assert_eq!(query.zone_hint.as_deref(), Some("otherZone"));
        assert_eq!(query.max_rows, 16);
    }
}
