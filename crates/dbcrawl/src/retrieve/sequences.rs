//! Sequences.

use super::{qualified, schema_ref, RetrievalContext};
use crate::builder::{CatalogBuilder, SequenceDraft};
use crate::core::value::MetadataRow;
use crate::error::Result;

pub(super) fn apply(
    ctx: &RetrievalContext<'_>,
    builder: &mut CatalogBuilder,
    row: &MetadataRow,
) -> Result<()> {
    let Some(name) = row.string("sequence_name") else {
        return Ok(());
    };
    let reference = schema_ref(row, "catalog_name", "schema_name");
    if !ctx
        .inclusion
        .sequences
        .matches(&qualified(&reference, &name), &name)
    {
        return Ok(());
    }
    let Some(schema) = ctx.schema_for_object(builder, reference)? else {
        return Ok(());
    };
    builder.upsert_sequence(
        schema,
        SequenceDraft {
            name,
            increment: row.int("increment"),
            minimum: row.int("minimum_value"),
            maximum: row.int("maximum_value"),
            cycle: row.flag("cycle_option"),
            remarks: row.text("remarks"),
        },
    )?;
    Ok(())
}
