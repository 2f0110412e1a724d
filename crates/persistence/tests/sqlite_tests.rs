//! SQLite integration tests.
//!
//! These tests drive the entity and query services over in-memory SQLite,
//! with a second in-memory database serving as the FTS5 search mirror.

mod common;

use std::collections::HashSet;

use chrono::{TimeZone, Utc};
use uuid::Uuid;

use danak_persistence::criteria::{Criteria, Filter, parse_criteria};
use danak_persistence::error::{CriteriaError, ResourceError, StorageError, ValidationError};
use danak_persistence::model::{ContactUs, HelpApp, Record, StaticPage, StaticPageStatus};
use danak_persistence::query::{PageRequest, SortOrder};

use common::*;

fn ids<R: Record>(records: &[R]) -> HashSet<Uuid> {
    records.iter().filter_map(|r| r.id()).collect()
}

// ============================================================================
// Create / Read Tests
// ============================================================================

#[tokio::test]
async fn test_create_then_find_one_round_trip() {
    let harness = Harness::<ContactUs>::new();
    let original = contact_at("ada@example.org", instant(123_456_789));

    let created = harness.entities.create(&original).await.unwrap();
    let id = created.id.expect("identifier assigned");

    let read = harness.entities.find_one(id).await.unwrap().unwrap();
    assert_eq!(read, ContactUs { id: Some(id), ..original });

    let again = harness.entities.find_one(id).await.unwrap().unwrap();
    assert_eq!(again.id, Some(id));
}

#[tokio::test]
async fn test_create_with_identifier_fails() {
    let harness = Harness::<StaticPage>::new();
    let mut page = static_page("About");
    page.id = Some(Uuid::new_v4());

    let err = harness.entities.create(&page).await.unwrap_err();
    assert!(matches!(
        err,
        StorageError::Resource(ResourceError::IdentifierAlreadyAssigned { .. })
    ));
    assert!(harness.entities.find_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_create_missing_required_field_fails() {
    let harness = Harness::<StaticPage>::new();
    let page = StaticPage {
        name: Some("No content".to_string()),
        ..StaticPage::default()
    };

    let err = harness.entities.create(&page).await.unwrap_err();
    assert!(matches!(
        err,
        StorageError::Validation(ValidationError::MissingRequiredField { ref field, .. })
            if field == "content"
    ));
}

#[tokio::test]
async fn test_create_with_unknown_owner_writes_nothing() {
    let harness = Harness::<StaticPage>::new();
    let orphan = page_of("Orphan", Uuid::new_v4());

    let err = harness.entities.create(&orphan).await.unwrap_err();
    assert!(matches!(
        err,
        StorageError::Validation(ValidationError::ConstraintViolation { .. })
    ));

    let hits = harness.entities.search("Orphan").await.unwrap();
    assert_eq!(hits.remaining(), 0);
    assert_eq!(harness.entities.mirror_status().total_synced, 0);
}

// ============================================================================
// Update Tests
// ============================================================================

#[tokio::test]
async fn test_update_replaces_every_field() {
    let harness = Harness::<StaticPage>::new();
    let created = harness.entities.create(&static_page("Draft")).await.unwrap();

    let replacement = StaticPage {
        id: created.id,
        name: Some("Final".to_string()),
        content: Some("Published body".to_string()),
        ..StaticPage::default()
    };
    harness.entities.update(&replacement).await.unwrap();

    let read = harness
        .entities
        .find_one(created.id.unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(read, replacement);
    assert_eq!(read.status, None);
}

#[tokio::test]
async fn test_update_unknown_identifier_is_not_found() {
    let harness = Harness::<StaticPage>::new();
    let mut page = static_page("Ghost");
    page.id = Some(Uuid::new_v4());

    let err = harness.entities.update(&page).await.unwrap_err();
    assert!(matches!(
        err,
        StorageError::Resource(ResourceError::NotFound { .. })
    ));
}

#[tokio::test]
async fn test_update_without_identifier_fails() {
    let harness = Harness::<StaticPage>::new();
    let err = harness.entities.update(&static_page("Nameless")).await.unwrap_err();
    assert!(matches!(
        err,
        StorageError::Resource(ResourceError::MissingIdentifier { .. })
    ));
}

#[tokio::test]
async fn test_partial_update_keeps_absent_fields() {
    let harness = Harness::<StaticPage>::new();
    let created = harness.entities.create(&static_page("Terms")).await.unwrap();

    let patch = StaticPage {
        id: created.id,
        status: Some(StaticPageStatus::Public),
        ..StaticPage::default()
    };
    let merged = harness.entities.partial_update(&patch).await.unwrap().unwrap();
    assert_eq!(merged.name.as_deref(), Some("Terms"));
    assert_eq!(merged.content, created.content);
    assert_eq!(merged.status, Some(StaticPageStatus::Public));

    let read = harness
        .entities
        .find_one(created.id.unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(read, merged);
}

#[tokio::test]
async fn test_partial_update_unknown_identifier_is_empty() {
    let harness = Harness::<StaticPage>::new();
    let patch = StaticPage {
        id: Some(Uuid::new_v4()),
        name: Some("Nobody".to_string()),
        ..StaticPage::default()
    };

    let result = harness.entities.partial_update(&patch).await.unwrap();
    assert!(result.is_none());
    assert_eq!(harness.entities.mirror_status().total_synced, 0);
}

// ============================================================================
// Delete Tests
// ============================================================================

#[tokio::test]
async fn test_delete_twice_is_idempotent() {
    let harness = Harness::<ContactUs>::new();
    let created = harness.entities.create(&contact("bye@example.org")).await.unwrap();
    let id = created.id.unwrap();

    harness.entities.delete(id).await.unwrap();
    assert!(harness.entities.find_one(id).await.unwrap().is_none());

    harness.entities.delete(id).await.unwrap();
    assert!(harness.entities.find_one(id).await.unwrap().is_none());
    assert!(!harness.entities.exists(id).await.unwrap());
}

#[tokio::test]
async fn test_delete_removes_search_document() {
    let harness = Harness::<ContactUs>::new();
    let created = harness
        .entities
        .create(&contact("vanishing@example.org"))
        .await
        .unwrap();
    assert_eq!(harness.entities.search("vanishing").await.unwrap().remaining(), 1);

    harness.entities.delete(created.id.unwrap()).await.unwrap();
    assert_eq!(harness.entities.search("vanishing").await.unwrap().remaining(), 0);
}

// ============================================================================
// Criteria Query Tests
// ============================================================================

async fn seed_pages(harness: &Harness<StaticPage>) -> Vec<StaticPage> {
    let mut stored = Vec::new();
    for (name, status) in [
        ("Alpha", Some(StaticPageStatus::Public)),
        ("Beta", Some(StaticPageStatus::Draft)),
        ("Gamma", Some(StaticPageStatus::Public)),
        ("Delta", None),
    ] {
        let page = StaticPage {
            status,
            ..static_page(name)
        };
        stored.push(harness.entities.create(&page).await.unwrap());
    }
    stored
}

#[tokio::test]
async fn test_empty_criteria_match_everything() {
    let harness = Harness::<StaticPage>::new();
    let stored = seed_pages(&harness).await;

    let criteria = Criteria::new();
    let found = harness.queries.find_by_criteria(&criteria).await.unwrap();
    let count = harness.queries.count_by_criteria(&criteria).await.unwrap();

    assert_eq!(ids(&found), ids(&stored));
    assert_eq!(count, harness.entities.find_all().await.unwrap().len() as u64);
}

#[tokio::test]
async fn test_equals_and_not_equals_are_complements() {
    let harness = Harness::<StaticPage>::new();
    let stored = seed_pages(&harness).await;

    let public = harness
        .queries
        .find_by_criteria(&Criteria::new().with("status", Filter::equals("PUBLIC")))
        .await
        .unwrap();
    let not_public = harness
        .queries
        .find_by_criteria(&Criteria::new().with("status", Filter::not_equals("PUBLIC")))
        .await
        .unwrap();

    let expected_public: HashSet<Uuid> = stored
        .iter()
        .filter(|p| p.status == Some(StaticPageStatus::Public))
        .filter_map(|p| p.id)
        .collect();
    let non_null: HashSet<Uuid> = stored
        .iter()
        .filter(|p| p.status.is_some())
        .filter_map(|p| p.id)
        .collect();

    assert_eq!(ids(&public), expected_public);
    assert!(ids(&public).is_disjoint(&ids(&not_public)));
    let union: HashSet<Uuid> = ids(&public).union(&ids(&not_public)).copied().collect();
    assert_eq!(union, non_null);
}

#[tokio::test]
async fn test_specified_partitions_records() {
    let harness = Harness::<StaticPage>::new();
    let stored = seed_pages(&harness).await;

    let present = harness
        .queries
        .find_by_criteria(&Criteria::new().with("status", Filter::specified(true)))
        .await
        .unwrap();
    let absent = harness
        .queries
        .find_by_criteria(&Criteria::new().with("status", Filter::specified(false)))
        .await
        .unwrap();

    assert_eq!(present.len(), 3);
    assert_eq!(absent.len(), 1);
    assert!(ids(&present).is_disjoint(&ids(&absent)));
    let union: HashSet<Uuid> = ids(&present).union(&ids(&absent)).copied().collect();
    assert_eq!(union, ids(&stored));
}

#[tokio::test]
async fn test_in_and_empty_sets() {
    let harness = Harness::<StaticPage>::new();
    seed_pages(&harness).await;

    let named = harness
        .queries
        .find_by_criteria(&Criteria::new().with("name", Filter::in_set(["Alpha", "Gamma"])))
        .await
        .unwrap();
    assert_eq!(named.len(), 2);

    let none = harness
        .queries
        .count_by_criteria(&Criteria::new().with("name", Filter::in_set(Vec::<String>::new())))
        .await
        .unwrap();
    assert_eq!(none, 0);

    let every_status = harness
        .queries
        .count_by_criteria(&Criteria::new().with("status", Filter::not_in_set(Vec::<String>::new())))
        .await
        .unwrap();
    assert_eq!(every_status, 3);
}

#[tokio::test]
async fn test_contains_is_case_sensitive() {
    let harness = Harness::<StaticPage>::new();
    seed_pages(&harness).await;

    let upper = harness
        .queries
        .count_by_criteria(&Criteria::new().with("name", Filter::contains("lph")))
        .await
        .unwrap();
    let lower = harness
        .queries
        .count_by_criteria(&Criteria::new().with("name", Filter::contains("ALPH")))
        .await
        .unwrap();
    let without = harness
        .queries
        .count_by_criteria(&Criteria::new().with("name", Filter::not_contains("a")))
        .await
        .unwrap();

    assert_eq!(upper, 1);
    assert_eq!(lower, 0);
    // Alpha, Beta, Gamma and Delta all contain a lowercase "a".
    assert_eq!(without, 0);
}

#[tokio::test]
async fn test_timestamp_ranges() {
    let harness = Harness::<ContactUs>::new();
    let t0 = instant(0);
    let t1 = instant(1);
    let t2 = instant(2);
    let at_t0 = harness.entities.create(&contact_at("t0@example.org", t0)).await.unwrap();
    let at_t1 = harness.entities.create(&contact_at("t1@example.org", t1)).await.unwrap();
    let at_t2 = harness.entities.create(&contact_at("t2@example.org", t2)).await.unwrap();
    harness.entities.create(&contact("undated@example.org")).await.unwrap();

    let from_t1 = harness
        .queries
        .find_by_criteria(&Criteria::new().with("createTime", Filter::greater_or_equal(t1)))
        .await
        .unwrap();
    assert_eq!(ids(&from_t1), ids(&[at_t1.clone(), at_t2]));

    let before_t1 = harness
        .queries
        .find_by_criteria(&Criteria::new().with("createTime", Filter::less_than(t1)))
        .await
        .unwrap();
    assert_eq!(ids(&before_t1), ids(&[at_t0]));

    let exactly_t1 = harness
        .queries
        .find_by_criteria(&Criteria::new().with("createTime", Filter::equals(t1)))
        .await
        .unwrap();
    assert_eq!(ids(&exactly_t1), ids(&[at_t1]));
}

#[tokio::test]
async fn test_timestamps_past_year_9999_are_rejected() {
    let harness = Harness::<ContactUs>::new();
    let far = Utc.with_ymd_and_hms(10000, 1, 1, 0, 0, 0).unwrap();
    harness.entities.create(&contact_at("now@example.org", instant(0))).await.unwrap();

    let err = harness
        .entities
        .create(&contact_at("later@example.org", far))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        StorageError::Validation(ValidationError::ConstraintViolation { .. })
    ));
    assert_eq!(harness.entities.find_all().await.unwrap().len(), 1);

    let err = harness
        .queries
        .find_by_criteria(&Criteria::new().with("createTime", Filter::greater_than(far)))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        StorageError::Criteria(CriteriaError::InvalidValue { .. })
    ));
}

#[tokio::test]
async fn test_range_on_unordered_field_fails_to_compile() {
    let harness = Harness::<StaticPage>::new();
    let err = harness
        .queries
        .find_by_criteria(&Criteria::new().with("name", Filter::greater_than("M")))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        StorageError::Criteria(CriteriaError::UnsupportedOperator { .. })
    ));
}

#[tokio::test]
async fn test_unknown_enum_variant_fails_to_compile() {
    let harness = Harness::<StaticPage>::new();
    let err = harness
        .queries
        .count_by_criteria(&Criteria::new().with("status", Filter::equals("ARCHIVED")))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        StorageError::Criteria(CriteriaError::UnknownEnumVariant { .. })
    ));
}

// ============================================================================
// Relation Tests
// ============================================================================

struct Family {
    parent: HelpApp,
    other_parent: HelpApp,
    children: Vec<StaticPage>,
    stray: StaticPage,
}

async fn seed_family(
    apps: &danak_persistence::service::EntityService<HelpApp>,
    pages: &danak_persistence::service::EntityService<StaticPage>,
) -> Family {
    let parent = apps.create(&help_app()).await.unwrap();
    let other_parent = apps.create(&help_app()).await.unwrap();
    let parent_id = parent.id.unwrap();

    let c1 = pages.create(&page_of("Child one", parent_id)).await.unwrap();
    let c2 = pages.create(&page_of("Child two", parent_id)).await.unwrap();
    let stray = pages
        .create(&page_of("Other child", other_parent.id.unwrap()))
        .await
        .unwrap();

    Family {
        parent,
        other_parent,
        children: vec![c1, c2],
        stray,
    }
}

#[tokio::test]
async fn test_owner_filter_selects_children() {
    let stores = danak_persistence::config::PersistenceConfig::default()
        .open()
        .unwrap();
    let (apps, _) = stores.services::<HelpApp>();
    let (pages, page_queries) = stores.services::<StaticPage>();
    let family = seed_family(&apps, &pages).await;
    let unowned = pages.create(&static_page("Unowned")).await.unwrap();

    let owned = page_queries
        .find_by_criteria(&Criteria::new().with_owner_id(Filter::equals(family.parent.id.unwrap())))
        .await
        .unwrap();
    assert_eq!(ids(&owned), ids(&family.children));

    let not_owned = page_queries
        .find_by_criteria(&Criteria::new().with_owner_id(Filter::specified(false)))
        .await
        .unwrap();
    assert_eq!(ids(&not_owned), ids(&[unowned]));

    let elsewhere = page_queries
        .find_by_criteria(
            &Criteria::new().with_owner_id(Filter::not_equals(family.parent.id.unwrap())),
        )
        .await
        .unwrap();
    assert_eq!(ids(&elsewhere), ids(&[family.stray]));
}

#[tokio::test]
async fn test_member_join_duplicates_without_distinct() {
    let stores = danak_persistence::config::PersistenceConfig::default()
        .open()
        .unwrap();
    let (apps, app_queries) = stores.services::<HelpApp>();
    let (pages, _) = stores.services::<StaticPage>();
    let family = seed_family(&apps, &pages).await;
    let parent_id = family.parent.id.unwrap();
    let child_ids: Vec<Uuid> = family.children.iter().filter_map(|c| c.id).collect();

    // One row per matching child: the parent appears twice.
    let criteria = Criteria::new().with_member_id(Filter::in_set(child_ids.clone()));
    let duplicated = app_queries.find_by_criteria(&criteria).await.unwrap();
    assert_eq!(duplicated.len(), 2);
    assert!(duplicated.iter().all(|app| app.id == Some(parent_id)));
    assert_eq!(app_queries.count_by_criteria(&criteria).await.unwrap(), 2);

    let distinct = criteria.clone().with_distinct(true);
    let deduplicated = app_queries.find_by_criteria(&distinct).await.unwrap();
    assert_eq!(deduplicated.len(), 1);
    assert_eq!(deduplicated[0].id, Some(parent_id));
    assert_eq!(app_queries.count_by_criteria(&distinct).await.unwrap(), 1);

    assert!(!criteria.is_distinct());
    assert_ne!(family.other_parent.id, Some(parent_id));
}

#[tokio::test]
async fn test_relation_filter_on_type_without_relation_fails() {
    let harness = Harness::<ContactUs>::new();
    let err = harness
        .queries
        .find_by_criteria(&Criteria::new().with_owner_id(Filter::specified(true)))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        StorageError::Criteria(CriteriaError::NoSuchRelation { .. })
    ));
}

// ============================================================================
// Paging Tests
// ============================================================================

#[tokio::test]
async fn test_paged_query_matches_count() {
    let harness = Harness::<StaticPage>::new();
    seed_pages(&harness).await;

    let criteria = Criteria::new().with("status", Filter::specified(true));
    let request = PageRequest::new(0, 2).with_sort(SortOrder::asc("name"));
    let first = harness
        .queries
        .find_page_by_criteria(&criteria, &request)
        .await
        .unwrap();

    let names: Vec<_> = first.content.iter().filter_map(|p| p.name.clone()).collect();
    assert_eq!(names, vec!["Alpha", "Beta"]);
    assert_eq!(first.total_elements, 3);
    assert!(first.has_next());

    let second = harness
        .queries
        .find_page_by_criteria(&criteria, &PageRequest::new(1, 2).with_sort(SortOrder::asc("name")))
        .await
        .unwrap();
    assert_eq!(second.content.len(), 1);
    assert_eq!(second.content[0].name.as_deref(), Some("Gamma"));
    assert!(!second.has_next());
}

// ============================================================================
// Query String Tests
// ============================================================================

#[tokio::test]
async fn test_query_string_end_to_end() {
    let harness = Harness::<StaticPage>::new();
    seed_pages(&harness).await;

    let query = "status.in=PUBLIC,DRAFT&name.doesNotContain=mm&page=0&size=10&sort=name,desc";
    let criteria = parse_criteria(StaticPage::schema(), query).unwrap();
    let request = PageRequest::from_query(query).unwrap();
    let page = harness
        .queries
        .find_page_by_criteria(&criteria, &request)
        .await
        .unwrap();

    let names: Vec<_> = page.content.iter().filter_map(|p| p.name.clone()).collect();
    assert_eq!(names, vec!["Beta", "Alpha"]);
    assert_eq!(page.total_elements, 2);
}

#[tokio::test]
async fn test_query_string_rejects_content_filter() {
    let err = parse_criteria(StaticPage::schema(), "content.contains=secret").unwrap_err();
    assert!(matches!(err, CriteriaError::FieldNotFilterable { .. }));
}

// ============================================================================
// Search Mirror Tests
// ============================================================================

#[tokio::test]
async fn test_create_is_searchable() {
    let harness = Harness::<StaticPage>::new();
    let created = harness
        .entities
        .create(&StaticPage {
            content: Some("Refunds are processed within five days".to_string()),
            ..static_page("Refunds")
        })
        .await
        .unwrap();

    let hits = harness
        .entities
        .search("processed")
        .await
        .unwrap()
        .collect_records()
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, created.id);
    assert!(harness.entities.mirror_status().is_healthy());
}

#[tokio::test]
async fn test_update_rewrites_search_document() {
    let harness = Harness::<StaticPage>::new();
    let created = harness.entities.create(&static_page("Shipping")).await.unwrap();

    let updated = StaticPage {
        content: Some("Couriers deliver overnight".to_string()),
        ..created.clone()
    };
    harness.entities.update(&updated).await.unwrap();

    assert_eq!(harness.entities.search("Shipping").await.unwrap().remaining(), 1);
    assert_eq!(harness.entities.search("couriers").await.unwrap().remaining(), 1);
    let hits = harness
        .entities
        .search("couriers")
        .await
        .unwrap()
        .collect_records()
        .unwrap();
    assert_eq!(hits, vec![updated]);
}

#[tokio::test]
async fn test_search_is_restartable() {
    let harness = Harness::<ContactUs>::new();
    harness.entities.create(&contact("first@example.org")).await.unwrap();

    let before = harness.entities.search("example").await.unwrap();
    assert_eq!(before.remaining(), 1);

    harness.entities.create(&contact("second@example.org")).await.unwrap();
    let after = harness.entities.search("example").await.unwrap();
    assert_eq!(after.remaining(), 2);
    assert_eq!(before.count(), 1);
}

#[tokio::test]
async fn test_structured_queries_ignore_the_mirror() {
    let harness = Harness::<ContactUs>::new();
    let created = harness.entities.create(&contact("primary@example.org")).await.unwrap();

    danak_persistence::core::SearchIndex::<ContactUs>::clear(harness.index.as_ref())
        .await
        .unwrap();

    assert_eq!(harness.entities.search("primary").await.unwrap().remaining(), 0);
    let found = harness
        .queries
        .find_by_criteria(&Criteria::new().with("email", Filter::equals("primary@example.org")))
        .await
        .unwrap();
    assert_eq!(found, vec![created]);
}

// ============================================================================
// File Store Tests
// ============================================================================

#[tokio::test]
async fn test_file_stores_persist_across_reopen() {
    use danak_persistence::config::{PersistenceConfig, SearchBackendConfig};

    let dir = tempfile::tempdir().unwrap();
    let config = PersistenceConfig {
        database_path: dir.path().join("records.db"),
        search: SearchBackendConfig::SqliteFts {
            path: Some(dir.path().join("search.db")),
        },
        ..PersistenceConfig::default()
    };

    let id = {
        let stores = config.open().unwrap();
        let (entities, _) = stores.services::<ContactUs>();
        let created = entities.create(&contact("durable@example.org")).await.unwrap();
        created.id.unwrap()
    };

    let stores = config.open().unwrap();
    let (entities, queries) = stores.services::<ContactUs>();
    assert!(entities.exists(id).await.unwrap());
    assert_eq!(queries.count_by_criteria(&Criteria::new()).await.unwrap(), 1);
    assert_eq!(entities.search("durable").await.unwrap().remaining(), 1);
}
