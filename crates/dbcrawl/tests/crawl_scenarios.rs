//! End-to-end crawls against captured metadata.
//!
//! Each test drives the public crawler API with the in-memory driver, so the
//! whole pipeline runs: plan, retrieve, link, freeze, analyze.

use std::collections::HashSet;
use std::time::Duration;

use dbcrawl::analysis::NameMatch;
use dbcrawl::drivers::{MemoryConnection, MemoryFixture};
use dbcrawl::{
    Catalog, CrawlError, CrawlOptions, ForeignKeyCardinality, Loaded, ObjectCategory,
    SchemaCrawler,
};
use tokio_util::sync::CancellationToken;

const ORDERS: &str = r#"
db_type: postgres
metadata:
  schemas:
    - { schema_name: public, remarks: "standard public schema" }
  system_data_types:
    - { type_name: int4 }
    - { type_name: text }
  tables:
    - { schema_name: public, table_name: customer, table_type: TABLE, remarks: "People who buy" }
    - { schema_name: public, table_name: order, table_type: TABLE }
  columns:
    - { schema_name: public, table_name: customer, column_name: id, ordinal_position: 1, type_name: int4, is_nullable: false, remarks: "Surrogate key" }
    - { schema_name: public, table_name: customer, column_name: name, ordinal_position: 2, type_name: text, is_nullable: true }
    - { schema_name: public, table_name: order, column_name: id, ordinal_position: 1, type_name: int4, is_nullable: false }
    - { schema_name: public, table_name: order, column_name: customer_id, ordinal_position: 2, type_name: int4, is_nullable: true }
  primary_keys:
    - { schema_name: public, table_name: customer, column_name: id, key_seq: 1, pk_name: customer_pkey }
    - { schema_name: public, table_name: order, column_name: id, key_seq: 1, pk_name: order_pkey }
  indexes:
    - { schema_name: public, table_name: customer, index_name: customer_pkey, non_unique: false, column_name: id, ordinal_position: 1 }
    - { schema_name: public, table_name: order, index_name: order_pkey, non_unique: false, column_name: id, ordinal_position: 1 }
  foreign_keys:
    - { fk_name: order_customer_fk, pktable_schem: public, pktable_name: customer, pkcolumn_name: id, fktable_schem: public, fktable_name: order, fkcolumn_name: customer_id, key_seq: 1 }
  routines:
    - { schema_name: public, routine_name: touch, specific_name: touch_1, routine_type: FUNCTION }
"#;

const NOTES: &str = r#"
db_type: postgres
metadata:
  schemas:
    - { schema_name: public }
  system_data_types:
    - { type_name: int4 }
  tables:
    - { schema_name: public, table_name: customer, table_type: TABLE }
    - { schema_name: public, table_name: note, table_type: TABLE }
  columns:
    - { schema_name: public, table_name: customer, column_name: id, ordinal_position: 1, type_name: int4, is_nullable: false }
    - { schema_name: public, table_name: note, column_name: id, ordinal_position: 1, type_name: int4, is_nullable: false }
    - { schema_name: public, table_name: note, column_name: customer_id, ordinal_position: 2, type_name: int4, is_nullable: true }
  primary_keys:
    - { schema_name: public, table_name: customer, column_name: id, key_seq: 1, pk_name: customer_pkey }
    - { schema_name: public, table_name: note, column_name: id, key_seq: 1, pk_name: note_pkey }
"#;

async fn crawl(yaml: &str, level: &str) -> Catalog {
    let conn = MemoryConnection::from_yaml(yaml).unwrap();
    SchemaCrawler::with_builtins(CrawlOptions::default().with_level(level))
        .crawl(&conn, CancellationToken::new())
        .await
        .unwrap()
        .catalog
}

/// Names of the table fields that were requested.
fn loaded_table_fields(catalog: &Catalog, schema: &str, table: &str) -> HashSet<&'static str> {
    let table = catalog.find_table_by_name(schema, table).unwrap();
    [
        ("remarks", table.remarks.is_loaded()),
        ("definition", table.definition.is_loaded()),
        ("columns", table.columns.is_loaded()),
        ("primary_key", table.primary_key.is_loaded()),
        ("indexes", table.indexes.is_loaded()),
        ("foreign_keys", table.foreign_keys.is_loaded()),
        ("constraints", table.constraints.is_loaded()),
    ]
    .into_iter()
    .filter(|(_, loaded)| *loaded)
    .map(|(name, _)| name)
    .collect()
}

// =============================================================================
// Scenarios
// =============================================================================

#[tokio::test]
async fn test_declared_foreign_key_is_zero_many_without_weak_association() {
    let catalog = crawl(ORDERS, "standard").await;

    let fk = catalog.foreign_keys().next().unwrap();
    assert_eq!(fk.name, "order_customer_fk");
    assert_eq!(catalog.cardinality(fk.id), Some(ForeignKeyCardinality::ZeroMany));
    assert!(catalog.weak_associations().is_empty());
}

#[tokio::test]
async fn test_undeclared_reference_is_weak_association() {
    let catalog = crawl(NOTES, "standard").await;

    assert_eq!(catalog.foreign_keys().count(), 0);
    let associations = catalog.weak_associations();
    assert_eq!(associations.len(), 1);

    let association = &associations[0];
    let fk_column = catalog.column(association.foreign_key_column).unwrap();
    let pk_column = catalog.column(association.primary_key_column).unwrap();
    assert_eq!(catalog.column_full_name(fk_column), "public.note.customer_id");
    assert_eq!(catalog.column_full_name(pk_column), "public.customer.id");
    assert_eq!(association.name_match, NameMatch::Exact);
}

#[tokio::test]
async fn test_minimum_level_remarks_not_loaded() {
    let catalog = crawl(ORDERS, "minimum").await;

    let customer = catalog.find_table_by_name("public", "customer").unwrap();
    assert_eq!(customer.remarks, Loaded::NotRequested);
    let err = customer.remarks.value("public.customer", "remarks").unwrap_err();
    assert!(err.to_string().contains("remarks"));

    // columns are a standard-level field
    assert!(catalog.columns(customer).is_err());
}

// =============================================================================
// Properties
// =============================================================================

#[tokio::test]
async fn test_crawl_is_idempotent() {
    let first = crawl(ORDERS, "detailed").await;
    let second = crawl(ORDERS, "detailed").await;

    assert_eq!(first, second);
    assert_eq!(first.fingerprint().unwrap(), second.fingerprint().unwrap());
}

#[tokio::test]
async fn test_identities_are_unique() {
    let catalog = crawl(ORDERS, "maximum").await;

    let tables: Vec<String> = catalog.tables().map(|t| catalog.table_full_name(t)).collect();
    let unique: HashSet<&String> = tables.iter().collect();
    assert_eq!(tables.len(), unique.len());

    let mut columns = HashSet::new();
    for table in catalog.tables() {
        for column in catalog.columns(table).unwrap() {
            assert!(columns.insert(catalog.column_full_name(column)));
        }
    }
    assert_eq!(columns.len(), 4);
}

#[tokio::test]
async fn test_detail_levels_are_monotonic() {
    let levels = ["minimum", "standard", "detailed", "maximum"];
    let mut previous: Option<HashSet<&'static str>> = None;

    for level in levels {
        let catalog = crawl(ORDERS, level).await;
        let fields = loaded_table_fields(&catalog, "public", "customer");
        if let Some(previous) = &previous {
            assert!(previous.is_subset(&fields), "{} lost fields", level);
        }
        previous = Some(fields);
    }

    let all = previous.unwrap();
    assert!(all.contains("remarks"));
    assert!(all.contains("constraints"));
}

#[tokio::test]
async fn test_column_remarks_follow_level() {
    let standard = crawl(ORDERS, "standard").await;
    let detailed = crawl(ORDERS, "detailed").await;

    let id = |catalog: &Catalog| {
        let table = catalog.find_table_by_name("public", "customer").unwrap();
        catalog.find_column(table.id, "id").unwrap().remarks.clone()
    };
    assert_eq!(id(&standard), Loaded::NotRequested);
    assert_eq!(id(&detailed), Loaded::Present("Surrogate key".to_string()));
}

#[tokio::test]
async fn test_routine_failure_leaves_tables_intact() {
    let mut fixture = MemoryFixture::from_yaml(ORDERS).unwrap();
    fixture = fixture.with_fault(
        dbcrawl::MetadataRequest::Routines,
        dbcrawl::drivers::memory::FaultKind::Metadata,
        0,
    );
    let conn = MemoryConnection::new(fixture);

    let outcome = SchemaCrawler::with_builtins(CrawlOptions::default())
        .crawl(&conn, CancellationToken::new())
        .await
        .unwrap();

    let catalog = &outcome.catalog;
    assert_eq!(catalog.tables().count(), 2);
    assert_eq!(catalog.foreign_keys().count(), 1);
    assert_eq!(catalog.routines().count(), 0);
    assert!(outcome
        .report
        .skipped_categories
        .iter()
        .any(|s| s.category == ObjectCategory::Routines));

    let order = catalog.find_table_by_name("public", "order").unwrap();
    assert_eq!(catalog.columns(order).unwrap().len(), 2);
}

#[tokio::test]
async fn test_column_failure_leaves_keys_unknown() {
    let fixture = MemoryFixture::from_yaml(ORDERS).unwrap().with_fault(
        dbcrawl::MetadataRequest::Columns,
        dbcrawl::drivers::memory::FaultKind::Metadata,
        0,
    );
    let conn = MemoryConnection::new(fixture);

    let outcome = SchemaCrawler::with_builtins(CrawlOptions::default())
        .crawl(&conn, CancellationToken::new())
        .await
        .unwrap();

    let catalog = &outcome.catalog;
    let customer = catalog.find_table_by_name("public", "customer").unwrap();
    assert_eq!(customer.columns, Loaded::NotRequested);
    assert_eq!(customer.primary_key, Loaded::NotRequested);
    assert_eq!(customer.indexes, Loaded::NotRequested);
    assert_eq!(customer.foreign_keys, Loaded::NotRequested);
    assert!(customer.primary_key.value("table", "primary key").is_err());
    assert_eq!(catalog.foreign_keys().count(), 0);
    assert!(catalog.weak_associations().is_empty());

    let skipped: Vec<_> = outcome
        .report
        .skipped_categories
        .iter()
        .map(|s| (s.category, s.reason.as_str()))
        .collect();
    for category in [
        ObjectCategory::PrimaryKeys,
        ObjectCategory::Indexes,
        ObjectCategory::ForeignKeys,
    ] {
        assert!(skipped.contains(&(category, "columns not retrieved")));
    }
    assert!(skipped.iter().any(|(c, _)| *c == ObjectCategory::Columns));
    // phases that do not resolve columns still run
    assert_eq!(catalog.routines().count(), 1);
}

// =============================================================================
// Cancellation and deadlines
// =============================================================================

#[tokio::test]
async fn test_cancellation_returns_no_catalog() {
    let conn = MemoryConnection::from_yaml(ORDERS).unwrap();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = SchemaCrawler::with_builtins(CrawlOptions::default())
        .crawl(&conn, cancel)
        .await;
    assert!(matches!(result, Err(CrawlError::Cancelled)));
}

#[tokio::test]
async fn test_deadline_aborts_slow_crawl() {
    let mut fixture = MemoryFixture::from_yaml(ORDERS).unwrap();
    fixture.latency_ms = 50;
    let conn = MemoryConnection::new(fixture);

    let options = CrawlOptions {
        timeout: Some(Duration::from_millis(20)),
        ..CrawlOptions::default()
    };
    let result = SchemaCrawler::with_builtins(options)
        .crawl(&conn, CancellationToken::new())
        .await;
    let err = result.err().unwrap();
    assert!(matches!(err, CrawlError::Timeout(_)));
    assert!(err.is_fatal());
}
