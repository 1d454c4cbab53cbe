//! Tables and views.

use tracing::debug;

use super::{schema_ref, RetrievalContext};
use crate::builder::{CatalogBuilder, TableDraft};
use crate::core::load::Loaded;
use crate::core::schema::TableKind;
use crate::core::value::MetadataRow;
use crate::error::Result;
use crate::strategy::{RetrievalField, RetrievalPhase};

pub(super) fn apply(
    ctx: &RetrievalContext<'_>,
    builder: &mut CatalogBuilder,
    phase: &RetrievalPhase,
    row: &MetadataRow,
) -> Result<()> {
    let Some(name) = row.string("table_name") else {
        debug!("Skipping table row without a name");
        return Ok(());
    };
    let reference = schema_ref(row, "catalog_name", "schema_name");
    if !ctx.included_table(&reference, &name) {
        return Ok(());
    }
    let kind = row
        .string("table_type")
        .map(|t| TableKind::parse(&t))
        .unwrap_or(TableKind::Table);
    if !ctx.inclusion.table_kind_included(kind) {
        return Ok(());
    }
    let Some(schema) = ctx.schema_for_object(builder, reference)? else {
        return Ok(());
    };

    let mut draft = TableDraft::new(name, kind);
    if phase.wants(RetrievalField::TableRemarks) {
        draft.remarks = row.text("remarks");
    }
    if phase.wants(RetrievalField::ViewDefinitions) {
        draft.definition = match kind {
            TableKind::View | TableKind::MaterializedView => row.text("definition"),
            _ => Loaded::Absent,
        };
    }
    builder.upsert_table(schema, draft)?;
    Ok(())
}
