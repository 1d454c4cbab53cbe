//! Primary and foreign keys.

use tracing::debug;

use super::{schema_ref, table_column, RetrievalContext};
use crate::builder::{CatalogBuilder, ColumnLocator, ForeignKeyDraft, LinkOutcome};
use crate::core::schema::{Deferrability, ForeignKeyRule};
use crate::core::value::MetadataRow;
use crate::error::Result;

pub(super) fn apply_primary_key(
    ctx: &RetrievalContext<'_>,
    builder: &mut CatalogBuilder,
    row: &MetadataRow,
) -> Result<()> {
    let Some(table) = ctx.table_for_row(builder, row) else {
        return Ok(());
    };
    let Some(column) = table_column(builder, table, row, "column_name") else {
        debug!("Skipping primary key row for an unknown column");
        return Ok(());
    };
    let sequence = row.int("key_seq").present().copied().unwrap_or(1);
    builder.add_primary_key_column(table, row.string("pk_name"), column, sequence)
}

pub(super) fn apply_foreign_key(
    ctx: &RetrievalContext<'_>,
    builder: &mut CatalogBuilder,
    row: &MetadataRow,
) -> Result<()> {
    let (Some(primary), Some(foreign)) = (
        locator(ctx, row, "pktable_cat", "pktable_schem", "pktable_name", "pkcolumn_name"),
        locator(ctx, row, "fktable_cat", "fktable_schem", "fktable_name", "fkcolumn_name"),
    ) else {
        debug!("Skipping foreign key row without endpoint names");
        return Ok(());
    };
    if primary.excluded && foreign.excluded {
        return Ok(());
    }

    let draft = ForeignKeyDraft {
        name: row.string("fk_name"),
        key_sequence: row.int("key_seq").present().copied().unwrap_or(1),
        primary,
        foreign,
        update_rule: row.text("update_rule").map(|r| ForeignKeyRule::parse(&r)),
        delete_rule: row.text("delete_rule").map(|r| ForeignKeyRule::parse(&r)),
        deferrability: row
            .text("deferrability")
            .map(|d| Deferrability::parse(&d)),
    };
    if builder.link_foreign_key(draft)? == LinkOutcome::Deferred {
        debug!("Deferred a foreign key with an endpoint not yet retrieved");
    }
    Ok(())
}

fn locator(
    ctx: &RetrievalContext<'_>,
    row: &MetadataRow,
    catalog: &str,
    schema: &str,
    table: &str,
    column: &str,
) -> Option<ColumnLocator> {
    let reference = schema_ref(row, catalog, schema);
    let table = row.string(table)?;
    let column = row.string(column)?;
    let excluded = !ctx.included_table(&reference, &table);
    Some(ColumnLocator {
        schema: reference,
        table,
        column,
        excluded,
    })
}
