//! Derived relationships computed over a frozen catalog.
//!
//! The analyzer never issues queries and never touches declared metadata;
//! its results are attached to the catalog's derived-data store and read
//! back through [`Catalog::cardinality`], [`Catalog::weak_associations`] and
//! [`Catalog::derived_attributes`].

pub mod cardinality;
pub mod weak_associations;

use std::collections::BTreeMap;

use tracing::info;

use crate::catalog::{Catalog, DerivedData};
use crate::error::Result;

pub use cardinality::ForeignKeyCardinality;
pub use weak_associations::{NameMatch, WeakAssociation};

#[derive(Debug, Clone)]
pub struct AnalyzerOptions {
    /// Infer weak associations in addition to cardinality.
    pub weak_associations: bool,
}

impl Default for AnalyzerOptions {
    fn default() -> Self {
        Self {
            weak_associations: true,
        }
    }
}

/// Runs once per catalog.
#[derive(Debug, Clone, Default)]
pub struct Analyzer {
    options: AnalyzerOptions,
}

impl Analyzer {
    pub fn new(options: AnalyzerOptions) -> Self {
        Self { options }
    }

    /// Compute and attach derived relationships. A catalog can be analyzed
    /// only once.
    pub fn analyze(&self, mut catalog: Catalog) -> Result<Catalog> {
        let cardinality: BTreeMap<_, _> = catalog
            .foreign_keys()
            .map(|fk| (fk.id, cardinality::classify(&catalog, fk)))
            .collect();

        let weak_associations = if self.options.weak_associations {
            weak_associations::find(&catalog)
        } else {
            Vec::new()
        };

        info!(
            "Analyzed {} foreign keys, found {} weak associations",
            cardinality.len(),
            weak_associations.len()
        );

        catalog.attach_derived(DerivedData {
            analyzed: true,
            cardinality,
            weak_associations,
        })?;
        Ok(catalog)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{
        CatalogBuilder, ColumnDraft, ColumnLocator, DataTypeDraft, ForeignKeyDraft, IndexDraft,
        TableDraft,
    };
    use crate::core::identifier::IdentifierRules;
    use crate::core::load::Loaded;
    use crate::core::schema::{ColumnParent, DataTypeId, SchemaId, SchemaRef, TableId, TableKind};
    use crate::strategy::{DetailLevels, FieldSet, ObjectCategory, RetrievalField};

    /// Column as (name, type, nullable).
    type Col<'a> = (&'a str, &'a str, bool);

    struct Fixture {
        builder: CatalogBuilder,
        schema: SchemaId,
    }

    impl Fixture {
        fn new(fields: FieldSet, tables: &[(&str, &[Col<'_>], Option<&str>)]) -> Self {
            let mut builder = CatalogBuilder::new(IdentifierRules::postgres(), fields.clone());
            let cp = builder.begin_phase(ObjectCategory::Schemas).unwrap();
            let schema = builder
                .upsert_schema(SchemaRef::new(None, Some("public")), Loaded::Absent)
                .unwrap();
            builder.complete_phase(cp).unwrap();

            let cp = builder.begin_phase(ObjectCategory::ColumnDataTypes).unwrap();
            let mut types: Vec<(String, DataTypeId)> = Vec::new();
            for (_, columns, _) in tables {
                for (_, type_name, _) in columns.iter() {
                    let id = builder
                        .upsert_data_type(None, DataTypeDraft::system(*type_name))
                        .unwrap();
                    types.push((type_name.to_string(), id));
                }
            }
            builder.complete_phase(cp).unwrap();

            let cp = builder.begin_phase(ObjectCategory::Tables).unwrap();
            let mut ids: Vec<TableId> = Vec::new();
            for (name, _, _) in tables {
                ids.push(
                    builder
                        .upsert_table(schema, TableDraft::new(*name, TableKind::Table))
                        .unwrap(),
                );
            }
            builder.complete_phase(cp).unwrap();

            let cp = builder.begin_phase(ObjectCategory::Columns).unwrap();
            for ((_, columns, _), table) in tables.iter().zip(&ids) {
                for (ordinal, (name, type_name, nullable)) in columns.iter().enumerate() {
                    let data_type = types
                        .iter()
                        .find(|(t, _)| t == type_name)
                        .map(|(_, id)| *id)
                        .unwrap();
                    builder
                        .upsert_column(
                            ColumnParent::Table(*table),
                            ColumnDraft {
                                ordinal: Loaded::Present(ordinal as i64 + 1),
                                data_type: Loaded::Present(data_type),
                                nullable: Loaded::Present(*nullable),
                                ..ColumnDraft::new(*name)
                            },
                        )
                        .unwrap();
                }
            }
            builder.complete_phase(cp).unwrap();

            if fields.contains(RetrievalField::PrimaryKeys) {
                let cp = builder.begin_phase(ObjectCategory::PrimaryKeys).unwrap();
                for ((_, _, pk), table) in tables.iter().zip(&ids) {
                    if let Some(pk) = pk {
                        let column = builder.column_id(ColumnParent::Table(*table), pk).unwrap();
                        builder.add_primary_key_column(*table, None, column, 1).unwrap();
                    }
                }
                builder.complete_phase(cp).unwrap();
            }

            Self { builder, schema }
        }

        fn table(&self, name: &str) -> TableId {
            self.builder.table_id(self.schema, name).unwrap()
        }

        fn unique_index(&mut self, table: &str, column: &str) {
            let table = self.table(table);
            let column = self
                .builder
                .column_id(ColumnParent::Table(table), column)
                .unwrap();
            let cp = self.builder.begin_phase(ObjectCategory::Indexes).unwrap();
            let index = self
                .builder
                .upsert_index(
                    table,
                    IndexDraft {
                        name: format!("{}_key", column.index()),
                        unique: true,
                        index_type: Loaded::NotRequested,
                    },
                )
                .unwrap();
            self.builder.add_index_column(index, 1, column).unwrap();
            self.builder.complete_phase(cp).unwrap();
        }

        fn no_indexes(&mut self) {
            let cp = self.builder.begin_phase(ObjectCategory::Indexes).unwrap();
            self.builder.complete_phase(cp).unwrap();
        }

        fn foreign_key(&mut self, fk: (&str, &str), pk: (&str, &str)) {
            let locator = |table: &str, column: &str| ColumnLocator {
                schema: SchemaRef::new(None, Some("public")),
                table: table.into(),
                column: column.into(),
                excluded: false,
            };
            let cp = self.builder.begin_phase(ObjectCategory::ForeignKeys).unwrap();
            self.builder
                .link_foreign_key(ForeignKeyDraft {
                    name: None,
                    key_sequence: 1,
                    primary: locator(pk.0, pk.1),
                    foreign: locator(fk.0, fk.1),
                    update_rule: Loaded::NotRequested,
                    delete_rule: Loaded::NotRequested,
                    deferrability: Loaded::NotRequested,
                })
                .unwrap();
            self.builder.complete_phase(cp).unwrap();
        }

        fn analyze(mut self) -> Catalog {
            let catalog = self.builder.freeze().unwrap();
            Analyzer::default().analyze(catalog).unwrap()
        }
    }

    fn standard() -> FieldSet {
        DetailLevels::builtin().resolve("standard").unwrap()
    }

    fn only_cardinality(catalog: &Catalog) -> ForeignKeyCardinality {
        let fk = catalog.foreign_keys().next().unwrap();
        catalog.cardinality(fk.id).unwrap()
    }

    const CUSTOMER: (&str, &[Col<'static>], Option<&str>) =
        ("customer", &[("id", "int4", false)], Some("id"));

    // =========================================================================
    // Cardinality
    // =========================================================================

    #[test]
    fn test_cardinality_not_unique_is_zero_many() {
        let mut f = Fixture::new(
            standard(),
            &[
                CUSTOMER,
                ("order", &[("id", "int4", false), ("customer_id", "int4", true)], Some("id")),
            ],
        );
        f.no_indexes();
        f.foreign_key(("order", "customer_id"), ("customer", "id"));
        assert_eq!(only_cardinality(&f.analyze()), ForeignKeyCardinality::ZeroMany);
    }

    #[test]
    fn test_cardinality_unique_not_null_is_one_one() {
        // the referencing column is the table's own primary key
        let mut f = Fixture::new(
            standard(),
            &[CUSTOMER, ("profile", &[("customer_id", "int4", false)], Some("customer_id"))],
        );
        f.no_indexes();
        f.foreign_key(("profile", "customer_id"), ("customer", "id"));
        assert_eq!(only_cardinality(&f.analyze()), ForeignKeyCardinality::OneOne);
    }

    #[test]
    fn test_cardinality_unique_nullable_is_zero_one() {
        let mut f = Fixture::new(
            standard(),
            &[
                CUSTOMER,
                ("badge", &[("id", "int4", false), ("owner_id", "int4", true)], Some("id")),
            ],
        );
        f.unique_index("badge", "owner_id");
        f.foreign_key(("badge", "owner_id"), ("customer", "id"));
        assert_eq!(only_cardinality(&f.analyze()), ForeignKeyCardinality::ZeroOne);
    }

    #[test]
    fn test_cardinality_unknown_without_key_information() {
        let fields: FieldSet = [
            RetrievalField::SchemaNames,
            RetrievalField::TableNames,
            RetrievalField::ColumnBasics,
            RetrievalField::ForeignKeys,
        ]
        .into_iter()
        .collect();
        let mut f = Fixture::new(
            fields,
            &[
                CUSTOMER,
                ("order", &[("id", "int4", false), ("customer_id", "int4", true)], Some("id")),
            ],
        );
        f.foreign_key(("order", "customer_id"), ("customer", "id"));
        assert_eq!(only_cardinality(&f.analyze()), ForeignKeyCardinality::Unknown);
    }

    // =========================================================================
    // Weak associations
    // =========================================================================

    #[test]
    fn test_weak_association_inferred_without_declared_key() {
        let mut f = Fixture::new(
            standard(),
            &[
                CUSTOMER,
                ("note", &[("id", "int4", false), ("customer_id", "int4", true)], Some("id")),
            ],
        );
        f.no_indexes();
        let catalog = f.analyze();

        let weak = catalog.weak_associations();
        assert_eq!(weak.len(), 1);
        assert_eq!(
            catalog.describe_weak_association(&weak[0]),
            "public.note.customer_id -> public.customer.id"
        );
        assert_eq!(weak[0].name_match, NameMatch::Exact);
        assert!(catalog.foreign_keys().next().is_none());
    }

    #[test]
    fn test_weak_association_skips_declared_foreign_key_columns() {
        let mut f = Fixture::new(
            standard(),
            &[
                CUSTOMER,
                ("order", &[("id", "int4", false), ("customer_id", "int4", true)], Some("id")),
            ],
        );
        f.no_indexes();
        f.foreign_key(("order", "customer_id"), ("customer", "id"));
        assert!(f.analyze().weak_associations().is_empty());
    }

    #[test]
    fn test_weak_association_requires_compatible_types() {
        let mut f = Fixture::new(
            standard(),
            &[
                CUSTOMER,
                ("note", &[("id", "int4", false), ("customer_id", "varchar", true)], Some("id")),
            ],
        );
        f.no_indexes();
        assert!(f.analyze().weak_associations().is_empty());
    }

    #[test]
    fn test_weak_association_matches_plural_table() {
        let mut f = Fixture::new(
            standard(),
            &[
                ("categories", &[("id", "int8", false)], Some("id")),
                ("item", &[("id", "int4", false), ("category_id", "int4", true)], Some("id")),
            ],
        );
        f.no_indexes();
        let catalog = f.analyze();
        let weak = catalog.weak_associations();
        assert_eq!(weak.len(), 1);
        assert_eq!(weak[0].name_match, NameMatch::Inflected);
    }

    #[test]
    fn test_weak_association_exact_beats_inflected() {
        let mut f = Fixture::new(
            standard(),
            &[
                CUSTOMER,
                ("customers", &[("id", "int4", false)], Some("id")),
                ("note", &[("id", "int4", false), ("customer_id", "int4", true)], Some("id")),
            ],
        );
        f.no_indexes();
        let catalog = f.analyze();
        let weak = catalog.weak_associations();
        assert_eq!(weak.len(), 1);
        let target = catalog.column(weak[0].primary_key_column).unwrap();
        assert_eq!(catalog.column_full_name(target), "public.customer.id");
    }

    #[test]
    fn test_weak_association_unresolved_tie_reports_nothing() {
        let mut f = Fixture::new(
            standard(),
            &[
                ("customers", &[("id", "int4", false)], Some("id")),
                ("customer_s", &[("id", "int4", false)], Some("id")),
                ("note", &[("id", "int4", false), ("customer_id", "int4", true)], Some("id")),
            ],
        );
        f.no_indexes();
        assert!(f.analyze().weak_associations().is_empty());
    }

    #[test]
    fn test_weak_associations_disabled() {
        let mut f = Fixture::new(
            standard(),
            &[
                CUSTOMER,
                ("note", &[("id", "int4", false), ("customer_id", "int4", true)], Some("id")),
            ],
        );
        f.no_indexes();
        let catalog = f.builder.freeze().unwrap();
        let analyzed = Analyzer::new(AnalyzerOptions {
            weak_associations: false,
        })
        .analyze(catalog)
        .unwrap();
        assert!(analyzed.weak_associations().is_empty());
        assert!(analyzed.is_analyzed());
    }
}
