use super::*;
use crate::core::attributes::FILTERED_REFERENCE;
use crate::core::schema::{Attributed, ConstraintKind, ForeignKeyRule, RoutineKind, TableKind};
use crate::strategy::DetailLevels;

fn builder(level: &str) -> CatalogBuilder {
    let fields = DetailLevels::builtin().resolve(level).unwrap();
    CatalogBuilder::new(IdentifierRules::postgres(), fields)
}

fn public() -> SchemaRef {
    SchemaRef::new(Some("shop"), Some("public"))
}

fn with_tables(b: &mut CatalogBuilder, names: &[&str]) -> SchemaId {
    let cp = b.begin_phase(ObjectCategory::Schemas).unwrap();
    let schema = b.upsert_schema(public(), Loaded::Absent).unwrap();
    b.complete_phase(cp).unwrap();

    let cp = b.begin_phase(ObjectCategory::Tables).unwrap();
    for name in names {
        b.upsert_table(schema, TableDraft::new(*name, TableKind::Table))
            .unwrap();
    }
    b.complete_phase(cp).unwrap();
    schema
}

fn column(name: &str, ordinal: i64, nullable: bool) -> ColumnDraft {
    ColumnDraft {
        ordinal: Loaded::Present(ordinal),
        nullable: Loaded::Present(nullable),
        ..ColumnDraft::new(name)
    }
}

fn locator(table: &str, column: &str) -> ColumnLocator {
    ColumnLocator {
        schema: public(),
        table: table.to_string(),
        column: column.to_string(),
        excluded: false,
    }
}

fn fk_draft(name: &str, fk: (&str, &str), pk: (&str, &str)) -> ForeignKeyDraft {
    ForeignKeyDraft {
        name: Some(name.to_string()),
        key_sequence: 1,
        primary: locator(pk.0, pk.1),
        foreign: locator(fk.0, fk.1),
        update_rule: Loaded::Present(ForeignKeyRule::NoAction),
        delete_rule: Loaded::Present(ForeignKeyRule::Cascade),
        deferrability: Loaded::NotRequested,
    }
}

// =============================================================================
// Identity and merging
// =============================================================================

#[test]
fn test_upsert_same_identity_augments() {
    let mut b = builder("detailed");
    let schema = with_tables(&mut b, &["customer"]);

    let again = b
        .upsert_table(
            schema,
            TableDraft {
                remarks: Loaded::Present("people who buy".into()),
                ..TableDraft::new("customer", TableKind::Table)
            },
        )
        .unwrap();

    assert_eq!(b.table_ids().len(), 1);
    let table = b.table(again).unwrap();
    assert_eq!(table.name, "customer");
    assert_eq!(table.remarks, Loaded::Present("people who buy".into()));
}

#[test]
fn test_last_non_null_wins() {
    let mut b = builder("detailed");
    let schema = with_tables(&mut b, &["customer"]);
    let table = b.table_id(schema, "customer").unwrap();
    let parent = ColumnParent::Table(table);

    let cp = b.begin_phase(ObjectCategory::Columns).unwrap();
    let id = b
        .upsert_column(
            parent,
            ColumnDraft {
                default_value: Loaded::Present("0".into()),
                ..column("id", 1, false)
            },
        )
        .unwrap();
    // a later row with a null default and no ordinal never downgrades
    let again = b
        .upsert_column(
            parent,
            ColumnDraft {
                default_value: Loaded::Absent,
                ..ColumnDraft::new("id")
            },
        )
        .unwrap();
    b.complete_phase(cp).unwrap();

    assert_eq!(id, again);
    let col = b.column(id).unwrap();
    assert_eq!(col.default_value, Loaded::Present("0".into()));
    assert_eq!(col.ordinal, Loaded::Present(1));
}

#[test]
fn test_case_insensitive_rules_share_identity() {
    let fields = DetailLevels::builtin().resolve("minimum").unwrap();
    let mut b = CatalogBuilder::new(IdentifierRules::mssql(), fields);
    let cp = b.begin_phase(ObjectCategory::Schemas).unwrap();
    let a = b
        .upsert_schema(SchemaRef::new(Some("Shop"), Some("dbo")), Loaded::Absent)
        .unwrap();
    let c = b
        .upsert_schema(SchemaRef::new(Some("SHOP"), Some("DBO")), Loaded::Absent)
        .unwrap();
    b.complete_phase(cp).unwrap();
    assert_eq!(a, c);
}

// =============================================================================
// Phase lifecycle
// =============================================================================

#[test]
fn test_phase_out_of_order_is_contract_error() {
    let mut b = builder("standard");
    with_tables(&mut b, &["customer"]);
    let cp = b.begin_phase(ObjectCategory::Columns).unwrap();
    b.complete_phase(cp).unwrap();
    let cp = b.begin_phase(ObjectCategory::ForeignKeys).unwrap();
    b.complete_phase(cp).unwrap();
    let err = b.begin_phase(ObjectCategory::Indexes).unwrap_err();
    assert!(matches!(err, CrawlError::Contract(_)));
}

#[test]
fn test_second_open_phase_is_contract_error() {
    let mut b = builder("standard");
    with_tables(&mut b, &["customer"]);
    let _cp = b.begin_phase(ObjectCategory::Columns).unwrap();
    let err = b.begin_phase(ObjectCategory::PrimaryKeys).unwrap_err();
    assert!(err.to_string().contains("while columns is open"));
    assert!(b.freeze().is_err());
}

#[test]
fn test_key_phases_require_completed_columns() {
    let mut b = builder("standard");
    with_tables(&mut b, &["customer"]);
    let cp = b.begin_phase(ObjectCategory::Columns).unwrap();
    b.fail_phase(cp, "permission denied").unwrap();

    for category in [
        ObjectCategory::PrimaryKeys,
        ObjectCategory::Indexes,
        ObjectCategory::ForeignKeys,
    ] {
        assert_eq!(b.unmet_prerequisite(category), Some(ObjectCategory::Columns));
        let err = b.begin_phase(category).unwrap_err();
        assert!(err.to_string().contains("requires columns"));
    }
    assert_eq!(b.unmet_prerequisite(ObjectCategory::Routines), None);
}

#[test]
fn test_skipped_phase_leaves_fields_not_requested() {
    let mut b = builder("standard");
    let schema = with_tables(&mut b, &["customer"]);
    let table = b.table_id(schema, "customer").unwrap();
    let cp = b.begin_phase(ObjectCategory::Columns).unwrap();
    b.fail_phase(cp, "permission denied").unwrap();
    b.skip_phase(ObjectCategory::PrimaryKeys, "columns not retrieved")
        .unwrap();

    let catalog = b.freeze().unwrap();
    let t = catalog.table(table).unwrap();
    assert_eq!(t.columns, Loaded::NotRequested);
    assert_eq!(t.primary_key, Loaded::NotRequested);
    assert_eq!(
        catalog.status(ObjectCategory::PrimaryKeys),
        &RetrievalStatus::Skipped {
            reason: "columns not retrieved".into()
        }
    );
}

#[test]
fn test_table_dependent_phase_requires_tables() {
    let mut b = builder("standard");
    let err = b.begin_phase(ObjectCategory::ForeignKeys).unwrap_err();
    assert!(err.to_string().contains("requires tables"));
}

#[test]
fn test_fail_phase_rolls_back() {
    let mut b = builder("standard");
    let schema = with_tables(&mut b, &["customer"]);

    let cp = b.begin_phase(ObjectCategory::Routines).unwrap();
    b.upsert_routine(schema, RoutineDraft::new("refresh", RoutineKind::Function))
        .unwrap();
    b.fail_phase(cp, "permission denied").unwrap();

    assert!(b.routine_id(schema, "refresh").is_none());
    assert!(b.schema(schema).unwrap().routines.is_empty());
    assert!(b.table_id(schema, "customer").is_some());
    assert_eq!(
        b.status(ObjectCategory::Routines),
        RetrievalStatus::Skipped {
            reason: "permission denied".into()
        }
    );
}

#[test]
fn test_fail_phase_undoes_changes_to_existing_objects() {
    let mut b = builder("standard");
    let (_, fk) = customer_and_order(&mut b);
    let schema = b.schema_id(&public()).unwrap();
    let order = b.table_id(schema, "order").unwrap();
    let before_tables = b.table_ids().len();

    let cp = b.begin_phase(ObjectCategory::ForeignKeys).unwrap();
    b.link_foreign_key(fk_draft(
        "order_customer_fk",
        ("order", "customer_id"),
        ("customer", "id"),
    ))
    .unwrap();
    // a reference into an excluded schema adds a stub table and schema
    let mut draft = fk_draft("order_region_fk", ("order", "customer_id"), ("region", "id"));
    draft.primary = ColumnLocator {
        schema: SchemaRef::new(Some("shop"), Some("geo")),
        excluded: true,
        ..draft.primary
    };
    b.link_foreign_key(draft).unwrap();
    b.link_foreign_key(fk_draft("order_zone_fk", ("order", "zone_id"), ("zone", "id")))
        .unwrap();
    assert_eq!(b.deferred_count(), 1);
    assert!(b.table_ids().len() > before_tables);
    // only the objects the phase touched carry a pre-image
    assert!(b.store.touched() > 0);
    assert!(b.store.touched() < b.store.tables.len() + b.store.schemas.len());
    b.fail_phase(cp, "connection reset").unwrap();

    assert_eq!(b.table_ids().len(), before_tables);
    assert_eq!(b.deferred_count(), 0);
    assert_eq!(b.store.touched(), 0);
    assert!(b.schema_id(&SchemaRef::new(Some("shop"), Some("geo"))).is_none());
    assert_eq!(b.table(order).unwrap().foreign_keys, Loaded::NotRequested);
    assert_eq!(b.column(fk).unwrap().name, "customer_id");

    let catalog = b.freeze().unwrap();
    assert_eq!(catalog.foreign_keys().count(), 0);
    assert_eq!(catalog.counts()["tables"], 2);
}

#[test]
fn test_complete_phase_settles_unloaded_collections() {
    let mut b = builder("standard");
    let schema = with_tables(&mut b, &["customer"]);
    let table = b.table_id(schema, "customer").unwrap();

    assert_eq!(b.table(table).unwrap().columns, Loaded::NotRequested);
    let cp = b.begin_phase(ObjectCategory::Columns).unwrap();
    b.complete_phase(cp).unwrap();
    let cp = b.begin_phase(ObjectCategory::PrimaryKeys).unwrap();
    b.complete_phase(cp).unwrap();

    let t = b.table(table).unwrap();
    assert_eq!(t.columns, Loaded::Present(vec![]));
    assert_eq!(t.primary_key, Loaded::Absent);
    assert_eq!(t.foreign_keys, Loaded::NotRequested);
}

#[test]
fn test_mutation_after_freeze_is_rejected() {
    let mut b = builder("minimum");
    let schema = with_tables(&mut b, &["customer"]);
    b.freeze().unwrap();

    let err = b
        .upsert_table(schema, TableDraft::new("order", TableKind::Table))
        .unwrap_err();
    assert!(matches!(err, CrawlError::CatalogFrozen(_)));
    assert!(b.freeze().is_err());
    assert!(b.is_frozen());
}

// =============================================================================
// Keys and indexes
// =============================================================================

#[test]
fn test_primary_key_in_key_sequence_order() {
    let mut b = builder("standard");
    let schema = with_tables(&mut b, &["line"]);
    let table = b.table_id(schema, "line").unwrap();
    let parent = ColumnParent::Table(table);

    let cp = b.begin_phase(ObjectCategory::Columns).unwrap();
    let order_id = b.upsert_column(parent, column("order_id", 1, false)).unwrap();
    let line_no = b.upsert_column(parent, column("line_no", 2, false)).unwrap();
    b.complete_phase(cp).unwrap();

    let cp = b.begin_phase(ObjectCategory::PrimaryKeys).unwrap();
    b.add_primary_key_column(table, Some("line_pkey".into()), line_no, 2)
        .unwrap();
    b.add_primary_key_column(table, None, order_id, 1).unwrap();
    b.complete_phase(cp).unwrap();

    let Loaded::Present(pk) = &b.table(table).unwrap().primary_key else {
        panic!("primary key not loaded");
    };
    assert_eq!(pk.name.as_deref(), Some("line_pkey"));
    assert_eq!(pk.columns, vec![order_id, line_no]);
}

#[test]
fn test_freeze_orders_columns_and_sets_flags() {
    let mut b = builder("standard");
    let schema = with_tables(&mut b, &["customer"]);
    let table = b.table_id(schema, "customer").unwrap();
    let parent = ColumnParent::Table(table);

    let cp = b.begin_phase(ObjectCategory::Columns).unwrap();
    let email = b.upsert_column(parent, column("email", 2, true)).unwrap();
    let id = b.upsert_column(parent, column("id", 1, false)).unwrap();
    b.complete_phase(cp).unwrap();

    let cp = b.begin_phase(ObjectCategory::PrimaryKeys).unwrap();
    b.add_primary_key_column(table, None, id, 1).unwrap();
    b.complete_phase(cp).unwrap();

    let cp = b.begin_phase(ObjectCategory::Indexes).unwrap();
    let idx = b
        .upsert_index(
            table,
            IndexDraft {
                name: "customer_email_key".into(),
                unique: true,
                index_type: Loaded::Present("btree".into()),
            },
        )
        .unwrap();
    b.add_index_column(idx, 1, email).unwrap();
    b.complete_phase(cp).unwrap();

    let catalog = b.freeze().unwrap();
    let t = catalog.table(table).unwrap();
    let names: Vec<_> = catalog
        .columns(t)
        .unwrap()
        .iter()
        .map(|c| c.name.as_str())
        .collect();
    assert_eq!(names, vec!["id", "email"]);

    let id_col = catalog.column(id).unwrap();
    assert_eq!(id_col.part_of_primary_key, Loaded::Present(true));
    assert_eq!(id_col.part_of_unique_index, Loaded::Present(false));
    assert_eq!(id_col.part_of_foreign_key, Loaded::NotRequested);
    let email_col = catalog.column(email).unwrap();
    assert_eq!(email_col.part_of_unique_index, Loaded::Present(true));
}

#[test]
fn test_constraint_columns_accumulate() {
    let mut b = builder("detailed");
    let schema = with_tables(&mut b, &["customer"]);
    let table = b.table_id(schema, "customer").unwrap();
    let parent = ColumnParent::Table(table);

    let cp = b.begin_phase(ObjectCategory::Columns).unwrap();
    let first = b.upsert_column(parent, column("first", 1, false)).unwrap();
    let last = b.upsert_column(parent, column("last", 2, false)).unwrap();
    b.complete_phase(cp).unwrap();

    let cp = b.begin_phase(ObjectCategory::Indexes).unwrap();
    for col in [first, last] {
        b.add_constraint(
            table,
            ConstraintDraft {
                name: "customer_name_key".into(),
                kind: ConstraintKind::Unique,
                definition: Loaded::Absent,
                column: Some(col),
            },
        )
        .unwrap();
    }
    b.complete_phase(cp).unwrap();

    let Loaded::Present(constraints) = &b.table(table).unwrap().constraints else {
        panic!("constraints not loaded");
    };
    assert_eq!(constraints.len(), 1);
    assert_eq!(constraints[0].columns, vec![first, last]);
}

// =============================================================================
// Foreign keys
// =============================================================================

fn customer_and_order(b: &mut CatalogBuilder) -> (ColumnId, ColumnId) {
    let schema = with_tables(b, &["customer", "order"]);
    let customer = b.table_id(schema, "customer").unwrap();
    let order = b.table_id(schema, "order").unwrap();

    let cp = b.begin_phase(ObjectCategory::Columns).unwrap();
    let pk = b
        .upsert_column(ColumnParent::Table(customer), column("id", 1, false))
        .unwrap();
    b.upsert_column(ColumnParent::Table(order), column("id", 1, false))
        .unwrap();
    let fk = b
        .upsert_column(ColumnParent::Table(order), column("customer_id", 2, true))
        .unwrap();
    b.complete_phase(cp).unwrap();
    (pk, fk)
}

#[test]
fn test_link_foreign_key_shared_by_both_tables() {
    let mut b = builder("standard");
    let (pk, fk) = customer_and_order(&mut b);

    let cp = b.begin_phase(ObjectCategory::ForeignKeys).unwrap();
    let outcome = b
        .link_foreign_key(fk_draft(
            "order_customer_fk",
            ("order", "customer_id"),
            ("customer", "id"),
        ))
        .unwrap();
    // the same pair reported twice is one reference
    b.link_foreign_key(fk_draft(
        "order_customer_fk",
        ("order", "customer_id"),
        ("customer", "id"),
    ))
    .unwrap();
    b.complete_phase(cp).unwrap();

    let LinkOutcome::Linked(id) = outcome else {
        panic!("expected a linked foreign key");
    };
    let catalog = b.freeze().unwrap();
    let fk_record = catalog.foreign_key(id).unwrap();
    assert_eq!(fk_record.references.len(), 1);
    assert_eq!(fk_record.references[0].primary_key_column, pk);
    assert_eq!(fk_record.references[0].foreign_key_column, fk);
    assert_eq!(fk_record.delete_rule, Loaded::Present(ForeignKeyRule::Cascade));

    let order = catalog.find_table_by_name("public", "order").unwrap();
    let customer = catalog.find_table_by_name("public", "customer").unwrap();
    assert_eq!(catalog.imported_foreign_keys(order).unwrap().len(), 1);
    assert_eq!(catalog.exported_foreign_keys(customer).unwrap().len(), 1);
    assert!(catalog.imported_foreign_keys(customer).unwrap().is_empty());
    assert_eq!(
        catalog.column(fk).unwrap().part_of_foreign_key,
        Loaded::Present(true)
    );
}

#[test]
fn test_unresolved_foreign_key_deferred_then_dropped() {
    let mut b = builder("standard");
    customer_and_order(&mut b);

    let cp = b.begin_phase(ObjectCategory::ForeignKeys).unwrap();
    let outcome = b
        .link_foreign_key(fk_draft(
            "order_region_fk",
            ("order", "region_id"),
            ("region", "id"),
        ))
        .unwrap();
    b.complete_phase(cp).unwrap();

    assert_eq!(outcome, LinkOutcome::Deferred);
    assert_eq!(b.deferred_count(), 1);
    assert_eq!(b.resolve_deferred().unwrap(), 1);

    let catalog = b.freeze().unwrap();
    assert_eq!(catalog.foreign_keys().count(), 0);
    assert_eq!(catalog.dropped_references(), 1);
}

#[test]
fn test_deferred_foreign_key_resolves_when_table_appears() {
    let mut b = builder("standard");
    let schema = with_tables(&mut b, &["order"]);
    let order = b.table_id(schema, "order").unwrap();

    let cp = b.begin_phase(ObjectCategory::Columns).unwrap();
    b.upsert_column(ColumnParent::Table(order), column("customer_id", 1, true))
        .unwrap();
    b.complete_phase(cp).unwrap();

    let cp = b.begin_phase(ObjectCategory::ForeignKeys).unwrap();
    let outcome = b
        .link_foreign_key(fk_draft(
            "order_customer_fk",
            ("order", "customer_id"),
            ("customer", "id"),
        ))
        .unwrap();
    assert_eq!(outcome, LinkOutcome::Deferred);

    // the referenced table shows up later in the same crawl
    let customer = b
        .upsert_table(schema, TableDraft::new("customer", TableKind::Table))
        .unwrap();
    b.upsert_column(ColumnParent::Table(customer), column("id", 1, false))
        .unwrap();
    b.complete_phase(cp).unwrap();

    let catalog = b.freeze().unwrap();
    assert_eq!(catalog.foreign_keys().count(), 1);
    assert_eq!(catalog.dropped_references(), 0);
}

#[test]
fn test_excluded_endpoint_is_kept_and_marked_filtered() {
    let mut b = builder("standard");
    let (_, _) = customer_and_order(&mut b);

    let cp = b.begin_phase(ObjectCategory::ForeignKeys).unwrap();
    let mut draft = fk_draft("order_region_fk", ("order", "region_id"), ("region", "id"));
    draft.primary = ColumnLocator {
        schema: SchemaRef::new(Some("shop"), Some("geo")),
        excluded: true,
        ..draft.primary
    };
    draft.foreign.column = "customer_id".into();
    let outcome = b.link_foreign_key(draft).unwrap();
    b.complete_phase(cp).unwrap();

    let LinkOutcome::Linked(id) = outcome else {
        panic!("expected a linked foreign key");
    };
    let catalog = b.freeze().unwrap();
    assert!(catalog.foreign_key(id).unwrap().attributes.flag(FILTERED_REFERENCE));

    let geo = catalog.find_schema(Some("shop"), Some("geo")).unwrap();
    assert!(geo.is_filtered());
    let region = catalog.find_table(geo.id, "region").unwrap();
    assert!(region.partial);
    assert!(region.is_filtered());
    assert_eq!(catalog.counts()["tables"], 2);
}

#[test]
fn test_unnamed_foreign_key_gets_synthesized_name() {
    let mut b = builder("standard");
    customer_and_order(&mut b);

    let cp = b.begin_phase(ObjectCategory::ForeignKeys).unwrap();
    let mut draft = fk_draft("", ("order", "customer_id"), ("customer", "id"));
    draft.name = None;
    b.link_foreign_key(draft).unwrap();
    b.complete_phase(cp).unwrap();

    let catalog = b.freeze().unwrap();
    let names: Vec<_> = catalog.foreign_keys().map(|fk| fk.name.as_str()).collect();
    assert_eq!(names, vec!["order_customer_fkey"]);
}
