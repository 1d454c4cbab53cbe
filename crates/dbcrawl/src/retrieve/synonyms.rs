//! Synonyms.

use super::{qualified, schema_ref, RetrievalContext};
use crate::builder::{CatalogBuilder, SynonymDraft};
use crate::core::value::MetadataRow;
use crate::error::Result;

pub(super) fn apply(
    ctx: &RetrievalContext<'_>,
    builder: &mut CatalogBuilder,
    row: &MetadataRow,
) -> Result<()> {
    let Some(name) = row.string("synonym_name") else {
        return Ok(());
    };
    let reference = schema_ref(row, "catalog_name", "schema_name");
    if !ctx
        .inclusion
        .synonyms
        .matches(&qualified(&reference, &name), &name)
    {
        return Ok(());
    }
    let Some(schema) = ctx.schema_for_object(builder, reference)? else {
        return Ok(());
    };
    builder.upsert_synonym(
        schema,
        SynonymDraft {
            name,
            referenced_object: row.text("referenced_object"),
            remarks: row.text("remarks"),
        },
    )?;
    Ok(())
}
