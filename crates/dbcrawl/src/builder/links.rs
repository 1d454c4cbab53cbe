//! Foreign-key linking, deferral, and filtered-reference stubs.

use tracing::warn;

use super::{CatalogBuilder, ColumnLocator, ForeignKeyDraft};
use crate::core::attributes::{AttributeBag, FILTERED_OUT, FILTERED_REFERENCE};
use crate::core::load::Loaded;
use crate::core::schema::{
    Column, ColumnId, ColumnParent, ColumnReference, ForeignKey, ForeignKeyId, Table, TableId,
    TableKind,
};
use crate::error::{CrawlError, Result};

/// Result of [`CatalogBuilder::link_foreign_key`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkOutcome {
    Linked(ForeignKeyId),
    /// An endpoint table is not in the builder yet; retried after all phases.
    Deferred,
}

enum Endpoint {
    Found(ColumnId),
    Stub,
    Missing,
}

impl CatalogBuilder {
    /// Link one column pair of a foreign key.
    ///
    /// Both endpoint columns must exist. An endpoint outside the inclusion
    /// rules is anchored on a partial stub table marked filtered-out, and the
    /// foreign key is marked filtered; it is kept, never dropped.
    pub fn link_foreign_key(&mut self, draft: ForeignKeyDraft) -> Result<LinkOutcome> {
        self.ensure_mutable("link a foreign key")?;
        match self.try_link(&draft)? {
            Some(id) => Ok(LinkOutcome::Linked(id)),
            None => {
                self.deferred.push(draft);
                Ok(LinkOutcome::Deferred)
            }
        }
    }

    /// Retry deferred links; drop those still unresolved. Returns the number dropped.
    pub fn resolve_deferred(&mut self) -> Result<usize> {
        self.ensure_mutable("resolve deferred foreign keys")?;
        let mut dropped = 0;
        for draft in std::mem::take(&mut self.deferred) {
            if self.try_link(&draft)?.is_none() {
                warn!(
                    "Dropping foreign key {} ({} -> {}): endpoint not found",
                    draft.name.as_deref().unwrap_or("<unnamed>"),
                    draft.foreign.display_name(),
                    draft.primary.display_name()
                );
                dropped += 1;
            }
        }
        self.dropped_references += dropped;
        Ok(dropped)
    }

    pub fn deferred_count(&self) -> usize {
        self.deferred.len()
    }

    fn try_link(&mut self, draft: &ForeignKeyDraft) -> Result<Option<ForeignKeyId>> {
        let pk_end = self.classify(&draft.primary);
        let fk_end = self.classify(&draft.foreign);
        if matches!(pk_end, Endpoint::Missing) || matches!(fk_end, Endpoint::Missing) {
            return Ok(None);
        }

        let pk_column = self.materialize(pk_end, &draft.primary)?;
        let fk_column = self.materialize(fk_end, &draft.foreign)?;
        let filtered = self.is_stub(pk_column) || self.is_stub(fk_column);

        let pk_table = self.owning_table(pk_column)?;
        let fk_table = self.owning_table(fk_column)?;

        let name = match &draft.name {
            Some(n) => n.clone(),
            None => format!(
                "{}_{}_fkey",
                draft.foreign.table.to_lowercase(),
                draft.primary.table.to_lowercase()
            ),
        };
        let key = (fk_table, self.key(&name));
        let (pos, created) = self.store.foreign_keys.get_or_insert_with(key, |pos| ForeignKey {
            id: ForeignKeyId(pos),
            name,
            references: Vec::new(),
            update_rule: Loaded::NotRequested,
            delete_rule: Loaded::NotRequested,
            deferrability: Loaded::NotRequested,
            attributes: AttributeBag::new(),
        });
        let id = ForeignKeyId(pos);

        if let Some(fk) = self.store.foreign_keys.get_mut(pos) {
            fk.update_rule.merge(draft.update_rule.clone());
            fk.delete_rule.merge(draft.delete_rule.clone());
            fk.deferrability.merge(draft.deferrability.clone());
            let duplicate = fk
                .references
                .iter()
                .any(|r| r.foreign_key_column == fk_column && r.primary_key_column == pk_column);
            if !duplicate {
                fk.references.push(ColumnReference {
                    key_sequence: draft.key_sequence,
                    primary_key_column: pk_column,
                    foreign_key_column: fk_column,
                });
            }
            if filtered {
                fk.attributes.set(FILTERED_REFERENCE, true);
            }
        }

        if created {
            for table_id in [fk_table, pk_table] {
                if let Some(table) = self.store.tables.get_mut(table_id.0) {
                    let fks = table.foreign_keys.get_or_default();
                    if !fks.contains(&id) {
                        fks.push(id);
                    }
                }
            }
        }

        Ok(Some(id))
    }

    fn classify(&self, locator: &ColumnLocator) -> Endpoint {
        let found = self
            .schema_id(&locator.schema)
            .and_then(|s| self.table_id(s, &locator.table))
            .and_then(|t| self.column_id(ColumnParent::Table(t), &locator.column));
        match found {
            Some(column) => Endpoint::Found(column),
            None if locator.excluded => Endpoint::Stub,
            None => Endpoint::Missing,
        }
    }

    fn materialize(&mut self, endpoint: Endpoint, locator: &ColumnLocator) -> Result<ColumnId> {
        match endpoint {
            Endpoint::Found(column) => Ok(column),
            Endpoint::Stub => self.stub_column(locator),
            Endpoint::Missing => Err(CrawlError::Contract(format!(
                "cannot materialize missing endpoint {}",
                locator.display_name()
            ))),
        }
    }

    fn is_stub(&self, column: ColumnId) -> bool {
        self.store.columns.get(column.0).is_some_and(|c| c.partial)
    }

    fn owning_table(&self, column: ColumnId) -> Result<TableId> {
        self.store
            .columns
            .get(column.0)
            .and_then(Column::table)
            .ok_or_else(|| {
                CrawlError::Contract(format!("column {} is not a table column", column.0))
            })
    }

    /// Partial table and column anchoring a reference into an excluded scope.
    fn stub_column(&mut self, locator: &ColumnLocator) -> Result<ColumnId> {
        let schema = match self.schema_id(&locator.schema) {
            Some(id) => id,
            None => {
                let id = self.upsert_schema(locator.schema.clone(), Loaded::NotRequested)?;
                if let Some(s) = self.store.schemas.get_mut(id.0) {
                    s.attributes.set(FILTERED_OUT, true);
                }
                id
            }
        };

        let table_key = (schema, self.key(&locator.table));
        let (table_pos, table_created) =
            self.store.tables.get_or_insert_with(table_key, |pos| {
                let mut table =
                    Table::empty(TableId(pos), schema, locator.table.clone(), TableKind::Table);
                table.partial = true;
                table.attributes.set(FILTERED_OUT, true);
                table
            });
        let table = TableId(table_pos);
        if table_created {
            if let Some(s) = self.store.schemas.get_mut(schema.0) {
                s.tables.push(table);
            }
        }

        let parent = ColumnParent::Table(table);
        let column_key = (parent, self.key(&locator.column));
        let (column_pos, column_created) =
            self.store.columns.get_or_insert_with(column_key, |pos| {
                let mut column = Column::empty(ColumnId(pos), parent, locator.column.clone());
                column.partial = true;
                column
            });
        let column = ColumnId(column_pos);
        if column_created {
            if let Some(t) = self.store.tables.get_mut(table.0) {
                t.columns.get_or_default().push(column);
            }
        }
        Ok(column)
    }
}
