//! Table columns.

use tracing::debug;

use super::{resolve_data_type, RetrievalContext};
use crate::builder::{CatalogBuilder, ColumnDraft};
use crate::core::load::Loaded;
use crate::core::schema::ColumnParent;
use crate::core::value::MetadataRow;
use crate::error::Result;
use crate::strategy::{RetrievalField, RetrievalPhase};

pub(super) fn apply(
    ctx: &mut RetrievalContext<'_>,
    builder: &mut CatalogBuilder,
    phase: &RetrievalPhase,
    row: &MetadataRow,
) -> Result<()> {
    let Some(name) = row.string("column_name") else {
        return Ok(());
    };
    let Some(table) = ctx.table_for_row(builder, row) else {
        debug!(
            "Skipping column {} of a table that was not retrieved",
            name
        );
        return Ok(());
    };

    let data_type = match resolve_data_type(builder, row)? {
        Some(id) => Loaded::Present(id),
        None if row.has("type_name") => Loaded::Absent,
        None => Loaded::NotRequested,
    };

    let mut draft = ColumnDraft {
        ordinal: row.int("ordinal_position"),
        data_type,
        size: row.int("column_size"),
        decimal_digits: row.int("decimal_digits"),
        nullable: row.flag("is_nullable"),
        ..ColumnDraft::new(name)
    };
    if phase.wants(RetrievalField::ColumnDefaults) {
        draft.default_value = row.text("column_default");
    }
    if phase.wants(RetrievalField::ColumnRemarks) {
        draft.remarks = row.text("remarks");
    }
    if phase.wants(RetrievalField::ColumnFlags) {
        draft.auto_incremented = row.flag("is_autoincrement");
        draft.generated = row.flag("is_generated");
    }
    if phase.wants(RetrievalField::HiddenColumns) {
        // families without hidden columns leave the flag unknown
        draft.hidden = row.flag("is_hidden");
    }
    if let Loaded::Present(id) = draft.data_type {
        ctx.note_column_type(builder, id);
    }
    builder.upsert_column(ColumnParent::Table(table), draft)?;
    Ok(())
}
