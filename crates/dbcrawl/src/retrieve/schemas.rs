//! Schemas.

use tracing::debug;

use super::{schema_ref, RetrievalContext};
use crate::builder::CatalogBuilder;
use crate::core::value::MetadataRow;
use crate::error::Result;

pub(super) fn apply(
    ctx: &RetrievalContext<'_>,
    builder: &mut CatalogBuilder,
    row: &MetadataRow,
) -> Result<()> {
    let reference = schema_ref(row, "catalog_name", "schema_name");
    if reference.catalog.is_none() && reference.schema.is_none() {
        debug!("Skipping schema row without a name");
        return Ok(());
    }
    if !ctx.included_schema(&reference) {
        debug!("Skipping excluded schema {}", reference.full_name());
        return Ok(());
    }
    builder.upsert_schema(reference, row.text("remarks"))?;
    Ok(())
}
