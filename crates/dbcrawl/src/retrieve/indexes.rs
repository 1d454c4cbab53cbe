//! Indexes and table constraints.

use tracing::debug;

use super::{table_column, RetrievalContext};
use crate::builder::{CatalogBuilder, ConstraintDraft, IndexDraft};
use crate::core::schema::ConstraintKind;
use crate::core::value::MetadataRow;
use crate::error::Result;

pub(super) fn apply_index(
    ctx: &RetrievalContext<'_>,
    builder: &mut CatalogBuilder,
    row: &MetadataRow,
) -> Result<()> {
    let Some(table) = ctx.table_for_row(builder, row) else {
        return Ok(());
    };
    // Table statistics rows carry no index name.
    let Some(name) = row.string("index_name") else {
        return Ok(());
    };
    let unique = !row.flag("non_unique").present().copied().unwrap_or(true);
    let index = builder.upsert_index(
        table,
        IndexDraft {
            name,
            unique,
            index_type: row.text("index_type"),
        },
    )?;

    match table_column(builder, table, row, "column_name") {
        Some(column) => {
            let ordinal = row.int("ordinal_position").present().copied().unwrap_or(0);
            builder.add_index_column(index, ordinal, column)?;
        }
        None => debug!("Index column is an expression or was not retrieved"),
    }
    Ok(())
}

pub(super) fn apply_constraint(
    ctx: &RetrievalContext<'_>,
    builder: &mut CatalogBuilder,
    row: &MetadataRow,
) -> Result<()> {
    let Some(table) = ctx.table_for_row(builder, row) else {
        return Ok(());
    };
    let Some(name) = row.string("constraint_name") else {
        return Ok(());
    };
    let kind = row
        .string("constraint_type")
        .map(|k| ConstraintKind::parse(&k))
        .unwrap_or(ConstraintKind::Other);
    let column = table_column(builder, table, row, "column_name");
    builder.add_constraint(
        table,
        ConstraintDraft {
            name,
            kind,
            definition: row.text("definition"),
            column,
        },
    )
}
