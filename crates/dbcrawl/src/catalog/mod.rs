//! The frozen catalog: the read side of a crawl.
//!
//! A [`Catalog`] is produced once by [`CatalogBuilder::freeze`] and never
//! changes its primary metadata afterwards. The derived-relationship analyzer
//! attaches its results to a separate, labeled [`DerivedData`] store.
//!
//! [`CatalogBuilder::freeze`]: crate::builder::CatalogBuilder::freeze

pub(crate) mod store;
pub mod traversal;

use std::collections::BTreeMap;

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::analysis::{ForeignKeyCardinality, WeakAssociation};
use crate::core::attributes::{AttributeBag, FK_CARDINALITY, WEAK_ASSOCIATIONS};
use crate::core::identifier::IdentifierRules;
use crate::core::load::LoadState;
use crate::core::schema::{
    Attributed, Column, ColumnDataType, ColumnId, ColumnParent, DataTypeId, ForeignKey,
    ForeignKeyId, Index, IndexId, ObjectRef, Routine, RoutineId, Schema, SchemaId, Sequence,
    SequenceId, Synonym, SynonymId, Table, TableId,
};
use crate::error::{CrawlError, NotLoaded, Result};
use crate::strategy::{FieldSet, ObjectCategory, RetrievalField};

use store::ObjectStore;

pub use traversal::{CatalogObject, Section, SortOrder, TraversalHandler, TraversalOptions, Traverser};

/// Outcome of one category's retrieval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RetrievalStatus {
    /// Not part of the plan at the configured detail level.
    NotRequested,
    /// Requested, but the descriptor cannot serve it.
    Unsupported,
    /// The phase failed and was rolled back.
    Skipped { reason: String },
    Complete,
}

/// Analyzer results, kept apart from the retrieved metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DerivedData {
    pub(crate) analyzed: bool,
    pub(crate) cardinality: BTreeMap<ForeignKeyId, ForeignKeyCardinality>,
    pub(crate) weak_associations: Vec<WeakAssociation>,
}

/// Read-only snapshot of a crawl.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Catalog {
    store: ObjectStore,
    #[serde(skip)]
    rules: IdentifierRules,
    requested: FieldSet,
    status: BTreeMap<ObjectCategory, RetrievalStatus>,
    dropped_references: usize,
    derived: DerivedData,
}

impl Catalog {
    pub(crate) fn from_parts(
        store: ObjectStore,
        rules: IdentifierRules,
        requested: FieldSet,
        status: BTreeMap<ObjectCategory, RetrievalStatus>,
        dropped_references: usize,
    ) -> Self {
        Self {
            store,
            rules,
            requested,
            status,
            dropped_references,
            derived: DerivedData::default(),
        }
    }

    pub fn identifier_rules(&self) -> &IdentifierRules {
        &self.rules
    }

    /// Fields enabled by the configured detail level.
    pub fn requested_fields(&self) -> &FieldSet {
        &self.requested
    }

    pub fn was_requested(&self, field: RetrievalField) -> bool {
        self.requested.contains(field)
    }

    pub fn status(&self, category: ObjectCategory) -> &RetrievalStatus {
        self.status
            .get(&category)
            .unwrap_or(&RetrievalStatus::NotRequested)
    }

    /// Load state of a whole category.
    pub fn load_state(&self, category: ObjectCategory) -> LoadState {
        match self.status(category) {
            RetrievalStatus::Complete => LoadState::Complete,
            RetrievalStatus::NotRequested | RetrievalStatus::Unsupported => {
                LoadState::NotRequested
            }
            RetrievalStatus::Skipped { .. } => LoadState::Partial,
        }
    }

    /// Categories that were requested but not retrieved, with the reason.
    pub fn skipped_categories(&self) -> Vec<(ObjectCategory, String)> {
        self.status
            .iter()
            .filter_map(|(category, status)| match status {
                RetrievalStatus::Skipped { reason } => Some((*category, reason.clone())),
                RetrievalStatus::Unsupported => {
                    Some((*category, "not supported by database".to_string()))
                }
                _ => None,
            })
            .collect()
    }

    /// Foreign keys dropped because an endpoint never appeared.
    pub fn dropped_references(&self) -> usize {
        self.dropped_references
    }

    // =========================================================================
    // Object access
    // =========================================================================

    pub fn schemas(&self) -> impl Iterator<Item = &Schema> {
        self.store.schemas.iter()
    }

    pub fn schema(&self, id: SchemaId) -> Option<&Schema> {
        self.store.schemas.get(id.0)
    }

    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.store.tables.iter()
    }

    pub fn table(&self, id: TableId) -> Option<&Table> {
        self.store.tables.get(id.0)
    }

    pub fn column(&self, id: ColumnId) -> Option<&Column> {
        self.store.columns.get(id.0)
    }

    pub fn data_types(&self) -> impl Iterator<Item = &ColumnDataType> {
        self.store.data_types.iter()
    }

    pub fn data_type(&self, id: DataTypeId) -> Option<&ColumnDataType> {
        self.store.data_types.get(id.0)
    }

    pub fn foreign_keys(&self) -> impl Iterator<Item = &ForeignKey> {
        self.store.foreign_keys.iter()
    }

    pub fn foreign_key(&self, id: ForeignKeyId) -> Option<&ForeignKey> {
        self.store.foreign_keys.get(id.0)
    }

    pub fn index(&self, id: IndexId) -> Option<&Index> {
        self.store.indexes.get(id.0)
    }

    pub fn routines(&self) -> impl Iterator<Item = &Routine> {
        self.store.routines.iter()
    }

    pub fn routine(&self, id: RoutineId) -> Option<&Routine> {
        self.store.routines.get(id.0)
    }

    pub fn sequences(&self) -> impl Iterator<Item = &Sequence> {
        self.store.sequences.iter()
    }

    pub fn sequence(&self, id: SequenceId) -> Option<&Sequence> {
        self.store.sequences.get(id.0)
    }

    pub fn synonyms(&self) -> impl Iterator<Item = &Synonym> {
        self.store.synonyms.iter()
    }

    pub fn synonym(&self, id: SynonymId) -> Option<&Synonym> {
        self.store.synonyms.get(id.0)
    }

    /// Data types without a schema.
    pub fn system_data_types(&self) -> impl Iterator<Item = &ColumnDataType> {
        self.store.data_types.iter().filter(|dt| dt.schema.is_none())
    }

    // =========================================================================
    // Lookup by name
    // =========================================================================

    /// Schema by name; either part may be missing.
    pub fn find_schema(&self, catalog: Option<&str>, schema: Option<&str>) -> Option<&Schema> {
        let key = (
            catalog.map(|c| self.rules.normalize(c)),
            schema.map(|s| self.rules.normalize(s)),
        );
        self.store
            .schemas
            .position(&key)
            .and_then(|pos| self.store.schemas.get(pos))
    }

    pub fn find_table(&self, schema: SchemaId, name: &str) -> Option<&Table> {
        self.store
            .tables
            .position(&(schema, self.rules.normalize(name)))
            .and_then(|pos| self.store.tables.get(pos))
    }

    /// Table by schema name and table name, in any catalog.
    pub fn find_table_by_name(&self, schema: &str, table: &str) -> Option<&Table> {
        let wanted = self.rules.normalize(schema);
        self.store
            .schemas
            .iter()
            .filter(|s| {
                s.reference
                    .schema
                    .as_deref()
                    .is_some_and(|n| self.rules.normalize(n) == wanted)
            })
            .find_map(|s| self.find_table(s.id, table))
    }

    pub fn find_column(&self, table: TableId, name: &str) -> Option<&Column> {
        self.store
            .columns
            .position(&(ColumnParent::Table(table), self.rules.normalize(name)))
            .and_then(|pos| self.store.columns.get(pos))
    }

    // =========================================================================
    // Checked collection access
    // =========================================================================

    /// All columns of a table, hidden ones included, in ordinal order.
    pub fn columns(&self, table: &Table) -> std::result::Result<Vec<&Column>, NotLoaded> {
        let ids = table
            .columns
            .value(&self.table_full_name(table), "columns")?;
        Ok(ids
            .map(|ids| ids.iter().filter_map(|id| self.column(*id)).collect())
            .unwrap_or_default())
    }

    /// Columns a plain `SELECT *` would show.
    pub fn visible_columns(&self, table: &Table) -> std::result::Result<Vec<&Column>, NotLoaded> {
        Ok(self
            .columns(table)?
            .into_iter()
            .filter(|c| !c.is_hidden())
            .collect())
    }

    pub fn indexes(&self, table: &Table) -> std::result::Result<Vec<&Index>, NotLoaded> {
        let ids = table
            .indexes
            .value(&self.table_full_name(table), "indexes")?;
        Ok(ids
            .map(|ids| ids.iter().filter_map(|id| self.index(*id)).collect())
            .unwrap_or_default())
    }

    /// Foreign keys whose referencing columns belong to the table.
    pub fn imported_foreign_keys(
        &self,
        table: &Table,
    ) -> std::result::Result<Vec<&ForeignKey>, NotLoaded> {
        self.table_foreign_keys(table, |fk| {
            fk.foreign_key_columns()
                .any(|c| self.column(c).and_then(Column::table) == Some(table.id))
        })
    }

    /// Foreign keys whose referenced columns belong to the table.
    pub fn exported_foreign_keys(
        &self,
        table: &Table,
    ) -> std::result::Result<Vec<&ForeignKey>, NotLoaded> {
        self.table_foreign_keys(table, |fk| {
            fk.primary_key_columns()
                .any(|c| self.column(c).and_then(Column::table) == Some(table.id))
        })
    }

    fn table_foreign_keys(
        &self,
        table: &Table,
        keep: impl Fn(&ForeignKey) -> bool,
    ) -> std::result::Result<Vec<&ForeignKey>, NotLoaded> {
        let ids = table
            .foreign_keys
            .value(&self.table_full_name(table), "foreign_keys")?;
        Ok(ids
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| self.foreign_key(*id))
                    .filter(|fk| keep(fk))
                    .collect()
            })
            .unwrap_or_default())
    }

    /// Table owning the referencing columns of a foreign key.
    pub fn referencing_table(&self, fk: &ForeignKey) -> Option<&Table> {
        fk.foreign_key_columns()
            .next()
            .and_then(|c| self.column(c))
            .and_then(Column::table)
            .and_then(|t| self.table(t))
    }

    /// Table owning the referenced columns of a foreign key.
    pub fn referenced_table(&self, fk: &ForeignKey) -> Option<&Table> {
        fk.primary_key_columns()
            .next()
            .and_then(|c| self.column(c))
            .and_then(Column::table)
            .and_then(|t| self.table(t))
    }

    // =========================================================================
    // Names
    // =========================================================================

    pub fn table_full_name(&self, table: &Table) -> String {
        let schema = self
            .schema(table.schema)
            .map(Schema::full_name)
            .unwrap_or_default();
        if schema.is_empty() {
            table.name.clone()
        } else {
            format!("{}.{}", schema, table.name)
        }
    }

    pub fn column_full_name(&self, column: &Column) -> String {
        let parent = match column.parent {
            ColumnParent::Table(t) => self.table(t).map(|t| self.table_full_name(t)),
            ColumnParent::Routine(r) => self.routine(r).map(|r| self.scoped_name(r.schema, &r.name)),
        };
        match parent {
            Some(p) => format!("{}.{}", p, column.name),
            None => column.name.clone(),
        }
    }

    fn scoped_name(&self, schema: SchemaId, name: &str) -> String {
        match self.schema(schema).map(Schema::full_name) {
            Some(s) if !s.is_empty() => format!("{}.{}", s, name),
            _ => name.to_string(),
        }
    }

    /// Fully-qualified display name of any object.
    pub fn qualified_name(&self, object: ObjectRef) -> String {
        match object {
            ObjectRef::Schema(id) => self.schema(id).map(Schema::full_name).unwrap_or_default(),
            ObjectRef::Table(id) => self
                .table(id)
                .map(|t| self.table_full_name(t))
                .unwrap_or_default(),
            ObjectRef::Column(id) => self
                .column(id)
                .map(|c| self.column_full_name(c))
                .unwrap_or_default(),
            ObjectRef::DataType(id) => self
                .data_type(id)
                .map(|dt| match dt.schema {
                    Some(s) => self.scoped_name(s, &dt.name),
                    None => dt.name.clone(),
                })
                .unwrap_or_default(),
            ObjectRef::ForeignKey(id) => self
                .foreign_key(id)
                .map(|fk| match self.referencing_table(fk) {
                    Some(t) => format!("{}.{}", self.table_full_name(t), fk.name),
                    None => fk.name.clone(),
                })
                .unwrap_or_default(),
            ObjectRef::Index(id) => self
                .index(id)
                .map(|i| match self.table(i.table) {
                    Some(t) => format!("{}.{}", self.table_full_name(t), i.name),
                    None => i.name.clone(),
                })
                .unwrap_or_default(),
            ObjectRef::Routine(id) => self
                .routine(id)
                .map(|r| self.scoped_name(r.schema, &r.specific_name))
                .unwrap_or_default(),
            ObjectRef::Sequence(id) => self
                .sequence(id)
                .map(|s| self.scoped_name(s.schema, &s.name))
                .unwrap_or_default(),
            ObjectRef::Synonym(id) => self
                .synonym(id)
                .map(|s| self.scoped_name(s.schema, &s.name))
                .unwrap_or_default(),
        }
    }

    // =========================================================================
    // Derived data
    // =========================================================================

    pub(crate) fn attach_derived(&mut self, derived: DerivedData) -> Result<()> {
        if self.derived.analyzed {
            return Err(CrawlError::Contract(
                "derived relationships were already computed for this catalog".to_string(),
            ));
        }
        self.derived = DerivedData {
            analyzed: true,
            ..derived
        };
        Ok(())
    }

    pub fn is_analyzed(&self) -> bool {
        self.derived.analyzed
    }

    /// Cardinality of a foreign key; `None` before analysis.
    pub fn cardinality(&self, fk: ForeignKeyId) -> Option<ForeignKeyCardinality> {
        self.derived.cardinality.get(&fk).copied()
    }

    pub fn weak_associations(&self) -> &[WeakAssociation] {
        &self.derived.weak_associations
    }

    /// Weak associations whose referencing column belongs to the table.
    pub fn weak_associations_of(&self, table: TableId) -> Vec<&WeakAssociation> {
        self.derived
            .weak_associations
            .iter()
            .filter(|w| self.column(w.foreign_key_column).and_then(Column::table) == Some(table))
            .collect()
    }

    /// Derived attributes of an object under their well-known keys.
    pub fn derived_attributes(&self, object: ObjectRef) -> AttributeBag {
        let mut bag = AttributeBag::new();
        match object {
            ObjectRef::ForeignKey(id) => {
                if let Some(cardinality) = self.cardinality(id) {
                    bag.set(FK_CARDINALITY, cardinality.as_str());
                }
            }
            ObjectRef::Table(id) => {
                let described: Vec<String> = self
                    .weak_associations_of(id)
                    .into_iter()
                    .map(|w| self.describe_weak_association(w))
                    .collect();
                if !described.is_empty() {
                    bag.set(WEAK_ASSOCIATIONS, described);
                }
            }
            _ => {}
        }
        bag
    }

    /// `referencing.column -> referenced.column`
    pub fn describe_weak_association(&self, association: &WeakAssociation) -> String {
        let from = self
            .column(association.foreign_key_column)
            .map(|c| self.column_full_name(c))
            .unwrap_or_default();
        let to = self
            .column(association.primary_key_column)
            .map(|c| self.column_full_name(c))
            .unwrap_or_default();
        format!("{} -> {}", from, to)
    }

    // =========================================================================
    // Identity
    // =========================================================================

    /// Number of objects per category, for summaries.
    pub fn counts(&self) -> BTreeMap<&'static str, usize> {
        let mut counts = BTreeMap::new();
        counts.insert("schemas", self.store.schemas.iter().filter(|s| !s.is_filtered()).count());
        counts.insert("tables", self.store.tables.iter().filter(|t| !t.partial).count());
        counts.insert("columns", self.store.columns.iter().filter(|c| !c.partial).count());
        counts.insert("data_types", self.store.data_types.len());
        counts.insert("foreign_keys", self.store.foreign_keys.len());
        counts.insert("indexes", self.store.indexes.len());
        counts.insert("routines", self.store.routines.len());
        counts.insert("sequences", self.store.sequences.len());
        counts.insert("synonyms", self.store.synonyms.len());
        counts.insert("weak_associations", self.derived.weak_associations.len());
        counts
    }

    /// SHA-256 over the canonical JSON form. Equal catalogs hash equal.
    pub fn fingerprint(&self) -> Result<String> {
        let json = serde_json::to_vec(self)?;
        let mut hasher = Sha256::new();
        hasher.update(&json);
        Ok(format!("{:x}", hasher.finalize()))
    }
}
