//! Unit tests for query planning
#[cfg(test)]
mod tests {
    use collwalk::catalog::{ColumnId, Condition};
    use collwalk::models::{ObjectKind, SpecialCollection, StructFileType};
    use collwalk::services::cursor::dispatch::{
        Phase, QueryPlan, QueryScope, collection_query, data_object_query, plan_query,
    };
    use collwalk::{CursorConfig, QueryFlags};

    const PATH: &str = "/tempZone/home/rods";

    fn plain_scope() -> QueryScope<'static> {
        QueryScope {
            path: PATH,
            special_collection: None,
            linked_path: None,
            resource_filter: None,
        }
    }

    fn conditions(plan: &QueryPlan, column: ColumnId) -> Vec<Condition> {
        let QueryPlan::Catalog { query, .. } = plan else {
            panic!("expected a catalog plan, got {plan:?}");
        };
        query.conditions_on(column).cloned().collect()
    }

    #[test]
    fn test_phase_order() {
        assert_eq!(Phase::first(QueryFlags::empty()), Phase::Collections);
        assert_eq!(Phase::first(QueryFlags::DATA_FIRST), Phase::DataObjects);
        assert_eq!(Phase::Collections.other(), Phase::DataObjects);
        assert_eq!(Phase::DataObjects.object_kind(), ObjectKind::DataObject);
    }

    #[test]
    fn test_collection_query_direct_children() {
        let query = collection_query(PATH, QueryFlags::empty(), &CursorConfig::default());

        assert_eq!(query.max_rows, 256);
        assert!(!query.total_row_count);
        assert_eq!(
            query.conditions,
            vec![
                (ColumnId::CollName, Condition::NotEquals("/".to_string())),
                (ColumnId::CollParentName, Condition::Equals(PATH.to_string())),
            ]
        );
        for column in [
            ColumnId::CollName,
            ColumnId::CollOwnerName,
            ColumnId::CollCreateTime,
            ColumnId::CollModifyTime,
            ColumnId::CollType,
            ColumnId::CollInfo1,
            ColumnId::CollInfo2,
        ] {
            assert!(query.selects(column), "missing {column}");
        }
    }

    #[test]
    fn test_collection_query_subtree() {
        let query = collection_query("/", QueryFlags::RECURSIVE_QUERY, &CursorConfig::default());

        let subtree = Condition::Subtree("/".to_string());
        assert!(query.conditions.contains(&(ColumnId::CollName, subtree.clone())));
        assert!(query.conditions_on(ColumnId::CollParentName).next().is_none());
        // The root itself is never listed as its own child.
        assert!(!query.conditions.iter().all(|(_, c)| c.matches("/")));
        assert!(subtree.matches("/tempZone"));
    }

    #[test]
    fn test_data_object_query_columns_by_verbosity() {
        let config = CursorConfig::default().with_max_rows(10).with_zone_hint("otherZone");

        let short = data_object_query(PATH, QueryFlags::empty(), &config);
        assert!(short.total_row_count);
        assert_eq!(short.max_rows, 10);
        assert_eq!(short.zone_hint.as_deref(), Some("otherZone"));
        assert!(short.selects(ColumnId::DataSize));
        assert!(!short.selects(ColumnId::DataReplStatus));
        assert!(!short.selects(ColumnId::DataChecksum));

        let long = data_object_query(PATH, QueryFlags::LONG_METADATA, &config);
        assert!(long.selects(ColumnId::DataRescName));
        assert!(long.selects(ColumnId::DataReplStatus));
        assert!(!long.selects(ColumnId::DataPath));

        let very_long = data_object_query(PATH, QueryFlags::VERY_LONG_METADATA, &config);
        assert!(very_long.selects(ColumnId::DataReplStatus));
        assert!(very_long.selects(ColumnId::DataPath));
        assert!(very_long.selects(ColumnId::DataChecksum));
        assert!(very_long.selects(ColumnId::DataTypeName));
    }

    #[test]
    fn test_data_object_query_scope() {
        let config = CursorConfig::default();

        let direct = data_object_query(PATH, QueryFlags::empty(), &config);
        assert_eq!(
            direct.conditions,
            vec![(ColumnId::CollName, Condition::Equals(PATH.to_string()))]
        );

        let subtree = data_object_query(PATH, QueryFlags::RECURSIVE_QUERY, &config);
        assert_eq!(
            subtree.conditions,
            vec![(ColumnId::CollName, Condition::Subtree(PATH.to_string()))]
        );
    }

    #[test]
    fn test_plain_plan_targets_own_path() {
        let plan = plan_query(
            &plain_scope(),
            QueryFlags::empty(),
            Phase::Collections,
            &CursorConfig::default(),
        );
        assert_eq!(plan.target_path(), PATH);
        assert!(!plan.is_special());
    }

    #[test]
    fn test_linked_plan_redirects_without_recursion() {
        let link = SpecialCollection::linked(PATH, "/tempZone/projects/shared");
        let scope = QueryScope {
            special_collection: Some(&link),
            linked_path: link.redirect_target(),
            ..plain_scope()
        };

        let plan = plan_query(
            &scope,
            QueryFlags::RECURSIVE_QUERY,
            Phase::DataObjects,
            &CursorConfig::default(),
        );
        assert_eq!(plan.target_path(), "/tempZone/projects/shared");
        assert_eq!(
            conditions(&plan, ColumnId::CollName),
            vec![Condition::Equals("/tempZone/projects/shared".to_string())]
        );
    }

    #[test]
    fn test_special_plan_for_mounted_and_archives() {
        let mounted = SpecialCollection::mounted(PATH, "/data/mnt", "unixfs;leaf");
        let archive =
            SpecialCollection::struct_file(StructFileType::Tar, PATH, "/tempZone/bundle.tar");

        for descriptor in [mounted, archive] {
            let scope = QueryScope {
                special_collection: Some(&descriptor),
                ..plain_scope()
            };
            let plan = plan_query(
                &scope,
                QueryFlags::empty(),
                Phase::Collections,
                &CursorConfig::default(),
            );
            assert_eq!(
                plan,
                QueryPlan::SpecialCollection {
                    descriptor: descriptor.clone(),
                    path: PATH.to_string(),
                    kind: ObjectKind::Collection,
                }
            );
        }
    }

    #[test]
    fn test_resource_filter_needs_flag() {
        let scope = QueryScope {
            resource_filter: Some("demoResc"),
            ..plain_scope()
        };
        let config = CursorConfig::default();

        let unfiltered = plan_query(&scope, QueryFlags::empty(), Phase::DataObjects, &config);
        assert!(conditions(&unfiltered, ColumnId::DataRescName).is_empty());

        let filtered = plan_query(
            &scope,
            QueryFlags::INCLUDE_EXTRA_CONDITIONS,
            Phase::DataObjects,
            &config,
        );
        assert_eq!(
            conditions(&filtered, ColumnId::DataRescName),
            vec![Condition::Equals("demoResc".to_string())]
        );

        // Sub-collection listings ignore the filter.
        let collections = plan_query(
            &scope,
            QueryFlags::INCLUDE_EXTRA_CONDITIONS,
            Phase::Collections,
            &config,
        );
        assert!(conditions(&collections, ColumnId::DataRescName).is_empty());
    }
}
