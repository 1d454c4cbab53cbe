//! Catalog builder: the write side of the catalog.
//!
//! Retrievers feed rows into the builder through `upsert_*` calls. The builder
//! owns identity (one entry per normalized name within its scope), partial
//! load state, and cross references. Each phase runs between
//! [`CatalogBuilder::begin_phase`] and either
//! [`CatalogBuilder::complete_phase`] or [`CatalogBuilder::fail_phase`]; a
//! failed phase rolls back everything it created or changed.
//!
//! [`CatalogBuilder::freeze`] ends the write side and produces the read-only
//! [`Catalog`].

mod drafts;
mod links;

use std::collections::{BTreeMap, HashMap, HashSet};

use tracing::debug;

use crate::catalog::store::ObjectStore;
use crate::catalog::{Catalog, RetrievalStatus};
use crate::core::attributes::{AttributeBag, AttributeValue, FILTERED_OUT};
use crate::core::identifier::IdentifierRules;
use crate::core::load::Loaded;
use crate::core::schema::{
    Column, ColumnDataType, ColumnId, ColumnParent, DataTypeId, Index, IndexId, PrimaryKey,
    Routine, RoutineId, Schema, SchemaId, SchemaRef, Sequence, SequenceId, Synonym, SynonymId,
    Table, TableConstraint, TableId,
};
use crate::error::{CrawlError, Result};
use crate::strategy::{FieldSet, ObjectCategory, RetrievalField};

pub use drafts::{
    ColumnDraft, ColumnLocator, ConstraintDraft, DataTypeDraft, ForeignKeyDraft, IndexDraft,
    RoutineDraft, SequenceDraft, SynonymDraft, TableDraft,
};
pub use links::LinkOutcome;

/// Token for an open phase. The object arenas journal their own changes, so
/// the checkpoint only needs what lives outside them.
#[derive(Debug)]
pub struct Checkpoint {
    category: ObjectCategory,
    deferred_len: usize,
}

impl Checkpoint {
    pub fn category(&self) -> ObjectCategory {
        self.category
    }
}

/// Aggregates retrieved metadata into a consistent object graph.
#[derive(Debug)]
pub struct CatalogBuilder {
    rules: IdentifierRules,
    requested: FieldSet,
    store: ObjectStore,
    deferred: Vec<ForeignKeyDraft>,
    pending_keys: BTreeMap<TableId, (Option<String>, Vec<(i64, ColumnId)>)>,
    pending_index_columns: HashMap<IndexId, Vec<(i64, ColumnId)>>,
    started: Vec<ObjectCategory>,
    open: Option<ObjectCategory>,
    status: BTreeMap<ObjectCategory, RetrievalStatus>,
    dropped_references: usize,
    frozen: bool,
}

impl CatalogBuilder {
    pub fn new(rules: IdentifierRules, requested: FieldSet) -> Self {
        Self {
            rules,
            requested,
            store: ObjectStore::default(),
            deferred: Vec::new(),
            pending_keys: BTreeMap::new(),
            pending_index_columns: HashMap::new(),
            started: Vec::new(),
            open: None,
            status: BTreeMap::new(),
            dropped_references: 0,
            frozen: false,
        }
    }

    pub fn rules(&self) -> &IdentifierRules {
        &self.rules
    }

    pub fn requested(&self) -> &FieldSet {
        &self.requested
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    fn ensure_mutable(&self, action: &str) -> Result<()> {
        if self.frozen {
            Err(CrawlError::CatalogFrozen(format!("cannot {}", action)))
        } else {
            Ok(())
        }
    }

    fn key(&self, name: &str) -> String {
        self.rules.normalize(name)
    }

    // =========================================================================
    // Phase lifecycle
    // =========================================================================

    /// Start a phase. Phases must arrive in dependency order, each at most
    /// once, and only after the phases they resolve against have completed.
    pub fn begin_phase(&mut self, category: ObjectCategory) -> Result<Checkpoint> {
        self.ensure_mutable("begin a retrieval phase")?;

        if let Some(open) = self.open {
            return Err(CrawlError::Contract(format!(
                "phase {} cannot begin while {} is open",
                category, open
            )));
        }
        if let Some(last) = self.started.last() {
            if *last >= category {
                return Err(CrawlError::Contract(format!(
                    "phase {} cannot run after {}",
                    category, last
                )));
            }
        }
        if category.requires_tables() && !self.started.contains(&ObjectCategory::Tables) {
            return Err(CrawlError::Contract(format!(
                "phase {} requires tables to be retrieved first",
                category
            )));
        }
        if let Some(missing) = self.unmet_prerequisite(category) {
            return Err(CrawlError::Contract(format!(
                "phase {} requires {} to be retrieved first",
                category, missing
            )));
        }

        self.started.push(category);
        self.open = Some(category);
        self.store.begin_journal();
        Ok(Checkpoint {
            category,
            deferred_len: self.deferred.len(),
        })
    }

    /// The earlier category a phase resolves against, when that category did
    /// not complete. Such a phase would find none of the rows it links to.
    pub fn unmet_prerequisite(&self, category: ObjectCategory) -> Option<ObjectCategory> {
        let columns_complete = matches!(
            self.status.get(&ObjectCategory::Columns),
            Some(RetrievalStatus::Complete)
        );
        (category.requires_columns() && !columns_complete).then_some(ObjectCategory::Columns)
    }

    /// Record a requested phase that was never started. Its fields stay
    /// not-requested.
    pub fn skip_phase(&mut self, category: ObjectCategory, reason: impl Into<String>) -> Result<()> {
        self.ensure_mutable("skip a retrieval phase")?;
        self.status.insert(
            category,
            RetrievalStatus::Skipped {
                reason: reason.into(),
            },
        );
        Ok(())
    }

    fn close_phase(&mut self, checkpoint: &Checkpoint) -> Result<()> {
        match self.open {
            Some(open) if open == checkpoint.category => {
                self.open = None;
                Ok(())
            }
            _ => Err(CrawlError::Contract(format!(
                "phase {} is not open",
                checkpoint.category
            ))),
        }
    }

    /// Finish a phase: fields the phase populates but no row touched become
    /// loaded-and-empty.
    pub fn complete_phase(&mut self, checkpoint: Checkpoint) -> Result<()> {
        self.ensure_mutable("complete a retrieval phase")?;
        self.close_phase(&checkpoint)?;
        self.store.commit_journal();
        let category = checkpoint.category;
        let fields = self.requested.for_category(category);

        match category {
            ObjectCategory::ColumnDataTypes => {
                // user-defined types get their values once a column uses them
                if fields.contains(RetrievalField::EnumValues) {
                    for data_type in self.store.data_types.iter_mut() {
                        if !data_type.user_defined {
                            data_type.enum_values.settle_empty();
                        }
                    }
                }
            }
            ObjectCategory::Columns => {
                for table in self.complete_tables_mut() {
                    table.columns.settle_empty();
                }
            }
            ObjectCategory::PrimaryKeys => {
                self.write_primary_keys();
                for table in self.complete_tables_mut() {
                    table.primary_key.settle_absent();
                }
            }
            ObjectCategory::Indexes => {
                self.write_index_columns();
                let indexes = fields.contains(RetrievalField::Indexes);
                let constraints = fields.contains(RetrievalField::TableConstraints);
                for table in self.complete_tables_mut() {
                    if indexes {
                        table.indexes.settle_empty();
                    }
                    if constraints {
                        table.constraints.settle_empty();
                    }
                }
            }
            ObjectCategory::ForeignKeys => {
                for table in self.complete_tables_mut() {
                    table.foreign_keys.settle_empty();
                }
                for fk in self.store.foreign_keys.iter_mut() {
                    fk.references.sort_by_key(|r| r.key_sequence);
                }
            }
            ObjectCategory::Routines => {
                if fields.contains(RetrievalField::RoutineParameters) {
                    for routine in self.store.routines.iter_mut() {
                        routine.parameters.settle_empty();
                    }
                }
            }
            ObjectCategory::Schemas
            | ObjectCategory::Tables
            | ObjectCategory::Sequences
            | ObjectCategory::Synonyms => {}
        }

        self.status.insert(category, RetrievalStatus::Complete);
        Ok(())
    }

    /// Abandon a phase: undo every object it created or changed.
    pub fn fail_phase(&mut self, checkpoint: Checkpoint, reason: impl Into<String>) -> Result<()> {
        self.ensure_mutable("roll back a retrieval phase")?;
        self.close_phase(&checkpoint)?;
        let Checkpoint {
            category,
            deferred_len,
        } = checkpoint;
        self.store.rollback_journal();
        self.deferred.truncate(deferred_len);
        self.pending_keys.clear();
        self.pending_index_columns.clear();
        self.status.insert(
            category,
            RetrievalStatus::Skipped {
                reason: reason.into(),
            },
        );
        Ok(())
    }

    /// Record a requested category the descriptor cannot serve.
    pub fn mark_unsupported(&mut self, category: ObjectCategory) {
        self.status.insert(category, RetrievalStatus::Unsupported);
    }

    pub fn status(&self, category: ObjectCategory) -> RetrievalStatus {
        self.status
            .get(&category)
            .cloned()
            .unwrap_or(RetrievalStatus::NotRequested)
    }

    fn complete_tables_mut(&mut self) -> impl Iterator<Item = &mut Table> {
        self.store.tables.iter_mut().filter(|t| !t.partial)
    }

    // =========================================================================
    // Schemas
    // =========================================================================

    pub fn schema_id(&self, reference: &SchemaRef) -> Option<SchemaId> {
        let key = self.schema_key(reference);
        self.store.schemas.position(&key).map(SchemaId)
    }

    fn schema_key(&self, reference: &SchemaRef) -> (Option<String>, Option<String>) {
        (
            reference.catalog.as_deref().map(|c| self.key(c)),
            reference.schema.as_deref().map(|s| self.key(s)),
        )
    }

    /// Create or augment a schema.
    pub fn upsert_schema(
        &mut self,
        reference: SchemaRef,
        remarks: Loaded<String>,
    ) -> Result<SchemaId> {
        self.ensure_mutable("add a schema")?;
        let key = self.schema_key(&reference);
        let (pos, _) = self.store.schemas.get_or_insert_with(key, |pos| Schema {
            id: SchemaId(pos),
            reference,
            remarks: Loaded::NotRequested,
            tables: Vec::new(),
            routines: Vec::new(),
            sequences: Vec::new(),
            synonyms: Vec::new(),
            data_types: Vec::new(),
            attributes: AttributeBag::new(),
        });
        if let Some(schema) = self.store.schemas.get_mut(pos) {
            schema.remarks.merge(remarks);
            // a schema seen in its own right is no longer just a reference anchor
            schema.attributes.remove(FILTERED_OUT);
        }
        Ok(SchemaId(pos))
    }

    /// Schema for a reference, creating it if this is its first mention.
    pub fn ensure_schema(&mut self, reference: SchemaRef) -> Result<SchemaId> {
        match self.schema_id(&reference) {
            Some(id) => Ok(id),
            None => self.upsert_schema(reference, Loaded::NotRequested),
        }
    }

    pub fn schema(&self, id: SchemaId) -> Option<&Schema> {
        self.store.schemas.get(id.0)
    }

    // =========================================================================
    // Tables
    // =========================================================================

    pub fn table_id(&self, schema: SchemaId, name: &str) -> Option<TableId> {
        self.store
            .tables
            .position(&(schema, self.key(name)))
            .map(TableId)
    }

    /// Create or augment a table. A stub created for a filtered reference is
    /// promoted to a real table.
    pub fn upsert_table(&mut self, schema: SchemaId, draft: TableDraft) -> Result<TableId> {
        self.ensure_mutable("add a table")?;
        self.require_schema(schema)?;
        let key = (schema, self.key(&draft.name));
        let TableDraft {
            name,
            kind,
            remarks,
            definition,
        } = draft;
        let (pos, created) = self
            .store
            .tables
            .get_or_insert_with(key, |pos| Table::empty(TableId(pos), schema, name, kind));
        let id = TableId(pos);
        if let Some(table) = self.store.tables.get_mut(pos) {
            table.kind = kind;
            table.remarks.merge(remarks);
            table.definition.merge(definition);
            if table.partial {
                table.partial = false;
                table.attributes.remove(FILTERED_OUT);
            }
        }
        if created {
            if let Some(s) = self.store.schemas.get_mut(schema.0) {
                s.tables.push(id);
            }
        }
        Ok(id)
    }

    pub fn table(&self, id: TableId) -> Option<&Table> {
        self.store.tables.get(id.0)
    }

    pub fn table_ids(&self) -> Vec<TableId> {
        self.store.tables.iter().map(|t| t.id).collect()
    }

    /// Set an attribute on a table before freeze.
    pub fn set_table_attribute(
        &mut self,
        table: TableId,
        key: &str,
        value: impl Into<AttributeValue>,
    ) -> Result<()> {
        self.ensure_mutable("set a table attribute")?;
        let table = self.require_table_mut(table)?;
        table.attributes.set(key, value);
        Ok(())
    }

    fn require_schema(&self, id: SchemaId) -> Result<()> {
        self.store
            .schemas
            .get(id.0)
            .map(|_| ())
            .ok_or_else(|| CrawlError::Contract(format!("unknown schema id {}", id.0)))
    }

    fn require_table_mut(&mut self, id: TableId) -> Result<&mut Table> {
        self.store
            .tables
            .get_mut(id.0)
            .ok_or_else(|| CrawlError::Contract(format!("unknown table id {}", id.0)))
    }

    // =========================================================================
    // Data types
    // =========================================================================

    pub fn data_type_id(&self, schema: Option<SchemaId>, name: &str) -> Option<DataTypeId> {
        self.store
            .data_types
            .position(&(schema, self.key(name)))
            .map(DataTypeId)
    }

    /// Create or augment a data type. `schema` is `None` for system types.
    pub fn upsert_data_type(
        &mut self,
        schema: Option<SchemaId>,
        draft: DataTypeDraft,
    ) -> Result<DataTypeId> {
        self.ensure_mutable("add a data type")?;
        if let Some(s) = schema {
            self.require_schema(s)?;
        }
        let key = (schema, self.key(&draft.name));
        let DataTypeDraft {
            name,
            user_defined,
            base_type,
        } = draft;
        let (pos, created) = self.store.data_types.get_or_insert_with(key, |pos| ColumnDataType {
            id: DataTypeId(pos),
            schema,
            name,
            user_defined,
            base_type: Loaded::NotRequested,
            enum_values: Loaded::NotRequested,
            attributes: AttributeBag::new(),
        });
        if let Some(dt) = self.store.data_types.get_mut(pos) {
            dt.user_defined |= user_defined;
            dt.base_type.merge(base_type);
        }
        let id = DataTypeId(pos);
        if created {
            if let Some(s) = schema.and_then(|s| self.store.schemas.get_mut(s.0)) {
                s.data_types.push(id);
            }
        }
        Ok(id)
    }

    pub fn data_type(&self, id: DataTypeId) -> Option<&ColumnDataType> {
        self.store.data_types.get(id.0)
    }

    pub fn data_type_ids(&self) -> Vec<DataTypeId> {
        self.store.data_types.iter().map(|dt| dt.id).collect()
    }

    /// Record the allowed values of an enumerated type; empty means not enumerated.
    pub fn set_enum_values(&mut self, id: DataTypeId, values: Vec<String>) -> Result<()> {
        self.ensure_mutable("set enum values")?;
        let dt = self
            .store
            .data_types
            .get_mut(id.0)
            .ok_or_else(|| CrawlError::Contract(format!("unknown data type id {}", id.0)))?;
        dt.enum_values = Loaded::Present(values);
        Ok(())
    }

    // =========================================================================
    // Columns and routine parameters
    // =========================================================================

    pub fn column_id(&self, parent: ColumnParent, name: &str) -> Option<ColumnId> {
        self.store
            .columns
            .position(&(parent, self.key(name)))
            .map(ColumnId)
    }

    /// Create or augment a table column or routine parameter.
    pub fn upsert_column(&mut self, parent: ColumnParent, draft: ColumnDraft) -> Result<ColumnId> {
        self.ensure_mutable("add a column")?;
        match parent {
            ColumnParent::Table(t) => {
                self.require_table_mut(t)?;
            }
            ColumnParent::Routine(r) => {
                self.require_routine_mut(r)?;
            }
        }
        let key = (parent, self.key(&draft.name));
        let (pos, created) = self
            .store
            .columns
            .get_or_insert_with(key, |pos| Column::empty(ColumnId(pos), parent, draft.name.clone()));
        if let Some(column) = self.store.columns.get_mut(pos) {
            draft.merge_into(column);
        }
        let id = ColumnId(pos);
        if created {
            match parent {
                ColumnParent::Table(t) => {
                    if let Some(table) = self.store.tables.get_mut(t.0) {
                        table.columns.get_or_default().push(id);
                    }
                }
                ColumnParent::Routine(r) => {
                    if let Some(routine) = self.store.routines.get_mut(r.0) {
                        routine.parameters.get_or_default().push(id);
                    }
                }
            }
        }
        Ok(id)
    }

    pub fn column(&self, id: ColumnId) -> Option<&Column> {
        self.store.columns.get(id.0)
    }

    // =========================================================================
    // Primary keys, indexes, constraints
    // =========================================================================

    /// Add one column of a table's primary key.
    pub fn add_primary_key_column(
        &mut self,
        table: TableId,
        pk_name: Option<String>,
        column: ColumnId,
        key_sequence: i64,
    ) -> Result<()> {
        self.ensure_mutable("add a primary key column")?;
        self.require_table_mut(table)?;
        let entry = self
            .pending_keys
            .entry(table)
            .or_insert_with(|| (None, Vec::new()));
        if pk_name.is_some() {
            entry.0 = pk_name;
        }
        if !entry.1.iter().any(|(_, c)| *c == column) {
            entry.1.push((key_sequence, column));
        }
        Ok(())
    }

    fn write_primary_keys(&mut self) {
        for (table_id, (name, mut columns)) in std::mem::take(&mut self.pending_keys) {
            columns.sort_by_key(|(seq, _)| *seq);
            if let Some(table) = self.store.tables.get_mut(table_id.0) {
                table.primary_key = Loaded::Present(PrimaryKey {
                    name,
                    columns: columns.into_iter().map(|(_, c)| c).collect(),
                });
            }
        }
    }

    /// Create or augment an index.
    pub fn upsert_index(&mut self, table: TableId, draft: IndexDraft) -> Result<IndexId> {
        self.ensure_mutable("add an index")?;
        self.require_table_mut(table)?;
        let key = (table, self.key(&draft.name));
        let IndexDraft {
            name,
            unique,
            index_type,
        } = draft;
        let (pos, created) = self.store.indexes.get_or_insert_with(key, |pos| Index {
            id: IndexId(pos),
            table,
            name,
            unique,
            columns: Vec::new(),
            index_type: Loaded::NotRequested,
            attributes: AttributeBag::new(),
        });
        if let Some(index) = self.store.indexes.get_mut(pos) {
            index.unique = unique;
            index.index_type.merge(index_type);
        }
        let id = IndexId(pos);
        if created {
            if let Some(t) = self.store.tables.get_mut(table.0) {
                t.indexes.get_or_default().push(id);
            }
        }
        Ok(id)
    }

    pub fn add_index_column(&mut self, index: IndexId, ordinal: i64, column: ColumnId) -> Result<()> {
        self.ensure_mutable("add an index column")?;
        let columns = self.pending_index_columns.entry(index).or_default();
        if !columns.iter().any(|(_, c)| *c == column) {
            columns.push((ordinal, column));
        }
        Ok(())
    }

    fn write_index_columns(&mut self) {
        for (index_id, mut columns) in std::mem::take(&mut self.pending_index_columns) {
            columns.sort_by_key(|(ordinal, _)| *ordinal);
            if let Some(index) = self.store.indexes.get_mut(index_id.0) {
                for (_, column) in columns {
                    if !index.columns.contains(&column) {
                        index.columns.push(column);
                    }
                }
            }
        }
    }

    /// Add a table constraint, or one more column of an existing one.
    pub fn add_constraint(&mut self, table: TableId, draft: ConstraintDraft) -> Result<()> {
        self.ensure_mutable("add a table constraint")?;
        let key = self.key(&draft.name);
        let rules = self.rules.clone();
        let t = self.require_table_mut(table)?;
        let constraints = t.constraints.get_or_default();
        let existing = constraints
            .iter_mut()
            .find(|c| rules.normalize(&c.name) == key);
        match existing {
            Some(constraint) => {
                constraint.definition.merge(draft.definition);
                if let Some(col) = draft.column {
                    if !constraint.columns.contains(&col) {
                        constraint.columns.push(col);
                    }
                }
            }
            None => constraints.push(TableConstraint {
                name: draft.name,
                kind: draft.kind,
                definition: draft.definition,
                columns: draft.column.into_iter().collect(),
            }),
        }
        Ok(())
    }

    // =========================================================================
    // Routines, sequences, synonyms
    // =========================================================================

    pub fn routine_id(&self, schema: SchemaId, specific_name: &str) -> Option<RoutineId> {
        self.store
            .routines
            .position(&(schema, self.key(specific_name)))
            .map(RoutineId)
    }

    pub fn upsert_routine(&mut self, schema: SchemaId, draft: RoutineDraft) -> Result<RoutineId> {
        self.ensure_mutable("add a routine")?;
        self.require_schema(schema)?;
        let specific = draft
            .specific_name
            .clone()
            .unwrap_or_else(|| draft.name.clone());
        let key = (schema, self.key(&specific));
        let RoutineDraft {
            name,
            kind,
            remarks,
            definition,
            return_type,
            ..
        } = draft;
        let (pos, created) = self.store.routines.get_or_insert_with(key, |pos| Routine {
            id: RoutineId(pos),
            schema,
            name,
            specific_name: specific,
            kind,
            remarks: Loaded::NotRequested,
            definition: Loaded::NotRequested,
            return_type: Loaded::NotRequested,
            parameters: Loaded::NotRequested,
            attributes: AttributeBag::new(),
        });
        if let Some(routine) = self.store.routines.get_mut(pos) {
            routine.remarks.merge(remarks);
            routine.definition.merge(definition);
            routine.return_type.merge(return_type);
        }
        let id = RoutineId(pos);
        if created {
            if let Some(s) = self.store.schemas.get_mut(schema.0) {
                s.routines.push(id);
            }
        }
        Ok(id)
    }

    fn require_routine_mut(&mut self, id: RoutineId) -> Result<&mut Routine> {
        self.store
            .routines
            .get_mut(id.0)
            .ok_or_else(|| CrawlError::Contract(format!("unknown routine id {}", id.0)))
    }

    pub fn upsert_sequence(&mut self, schema: SchemaId, draft: SequenceDraft) -> Result<SequenceId> {
        self.ensure_mutable("add a sequence")?;
        self.require_schema(schema)?;
        let key = (schema, self.key(&draft.name));
        let SequenceDraft {
            name,
            increment,
            minimum,
            maximum,
            cycle,
            remarks,
        } = draft;
        let (pos, created) = self.store.sequences.get_or_insert_with(key, |pos| Sequence {
            id: SequenceId(pos),
            schema,
            name,
            increment: Loaded::NotRequested,
            minimum: Loaded::NotRequested,
            maximum: Loaded::NotRequested,
            cycle: Loaded::NotRequested,
            remarks: Loaded::NotRequested,
            attributes: AttributeBag::new(),
        });
        if let Some(seq) = self.store.sequences.get_mut(pos) {
            seq.increment.merge(increment);
            seq.minimum.merge(minimum);
            seq.maximum.merge(maximum);
            seq.cycle.merge(cycle);
            seq.remarks.merge(remarks);
        }
        let id = SequenceId(pos);
        if created {
            if let Some(s) = self.store.schemas.get_mut(schema.0) {
                s.sequences.push(id);
            }
        }
        Ok(id)
    }

    pub fn upsert_synonym(&mut self, schema: SchemaId, draft: SynonymDraft) -> Result<SynonymId> {
        self.ensure_mutable("add a synonym")?;
        self.require_schema(schema)?;
        let key = (schema, self.key(&draft.name));
        let SynonymDraft {
            name,
            referenced_object,
            remarks,
        } = draft;
        let (pos, created) = self.store.synonyms.get_or_insert_with(key, |pos| Synonym {
            id: SynonymId(pos),
            schema,
            name,
            referenced_object: Loaded::NotRequested,
            remarks: Loaded::NotRequested,
            attributes: AttributeBag::new(),
        });
        if let Some(syn) = self.store.synonyms.get_mut(pos) {
            syn.referenced_object.merge(referenced_object);
            syn.remarks.merge(remarks);
        }
        let id = SynonymId(pos);
        if created {
            if let Some(s) = self.store.schemas.get_mut(schema.0) {
                s.synonyms.push(id);
            }
        }
        Ok(id)
    }

    // =========================================================================
    // Freeze
    // =========================================================================

    /// Produce the read-only catalog. The builder rejects every later mutation.
    pub fn freeze(&mut self) -> Result<Catalog> {
        self.ensure_mutable("freeze twice")?;
        if let Some(open) = self.open {
            return Err(CrawlError::Contract(format!(
                "cannot freeze while phase {} is open",
                open
            )));
        }
        if !self.deferred.is_empty() {
            self.resolve_deferred()?;
        }
        self.frozen = true;

        let mut store = std::mem::take(&mut self.store);
        finalize_columns(&mut store);

        for category in ObjectCategory::ALL {
            self.status
                .entry(category)
                .or_insert(RetrievalStatus::NotRequested);
        }

        debug!(
            "Froze catalog: {} schemas, {} tables, {} columns, {} foreign keys",
            store.schemas.len(),
            store.tables.len(),
            store.columns.len(),
            store.foreign_keys.len()
        );

        Ok(Catalog::from_parts(
            store,
            self.rules.clone(),
            self.requested.clone(),
            std::mem::take(&mut self.status),
            self.dropped_references,
        ))
    }

    pub fn dropped_references(&self) -> usize {
        self.dropped_references
    }
}

/// Sort table columns by ordinal and derive the key-membership flags.
fn finalize_columns(store: &mut ObjectStore) {
    let ordinals: Vec<Option<i64>> = store
        .columns
        .iter()
        .map(|c| c.ordinal.present().copied())
        .collect();

    let mut loaded: HashMap<TableId, (bool, bool, bool)> = HashMap::new();
    let mut pk_members = HashSet::new();
    for table in store.tables.iter_mut() {
        if let Loaded::Present(columns) = &mut table.columns {
            // stable sort keeps retrieval order for columns without ordinals
            columns.sort_by_key(|c| ordinals[c.0].unwrap_or(i64::MAX));
        }
        loaded.insert(
            table.id,
            (
                table.primary_key.is_loaded(),
                table.foreign_keys.is_loaded(),
                table.indexes.is_loaded(),
            ),
        );
        if let Loaded::Present(pk) = &table.primary_key {
            pk_members.extend(pk.columns.iter().copied());
        }
    }
    let fk_members: HashSet<ColumnId> = store
        .foreign_keys
        .iter()
        .flat_map(|fk| fk.foreign_key_columns())
        .collect();
    let unique_members: HashSet<ColumnId> = store
        .indexes
        .iter()
        .filter(|i| i.unique)
        .flat_map(|i| i.columns.iter().copied())
        .collect();

    for column in store.columns.iter_mut() {
        let Some(table_id) = column.table() else {
            continue;
        };
        let Some(&(pk_loaded, fk_loaded, idx_loaded)) = loaded.get(&table_id) else {
            continue;
        };
        if pk_loaded {
            column.part_of_primary_key = Loaded::Present(pk_members.contains(&column.id));
        }
        if fk_loaded {
            column.part_of_foreign_key = Loaded::Present(fk_members.contains(&column.id));
        }
        if idx_loaded {
            column.part_of_unique_index = Loaded::Present(unique_members.contains(&column.id));
        }
    }
}

#[cfg(test)]
mod tests;
