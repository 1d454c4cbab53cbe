//! Column data types and enumerated values.

use tracing::{debug, warn};

use super::{schema_ref, RetrievalContext};
use crate::builder::{CatalogBuilder, DataTypeDraft};
use crate::core::schema::DataTypeId;
use crate::core::value::MetadataRow;
use crate::error::Result;
use crate::strategy::RetrievalField;

pub(super) fn apply_system(builder: &mut CatalogBuilder, row: &MetadataRow) -> Result<()> {
    let Some(name) = row.string("type_name") else {
        debug!("Skipping data type row without a name");
        return Ok(());
    };
    builder.upsert_data_type(
        None,
        DataTypeDraft {
            base_type: row.text("base_type"),
            ..DataTypeDraft::system(name)
        },
    )?;
    Ok(())
}

pub(super) fn apply_user_defined(
    ctx: &RetrievalContext<'_>,
    builder: &mut CatalogBuilder,
    row: &MetadataRow,
) -> Result<()> {
    let Some(name) = row.string("type_name") else {
        debug!("Skipping data type row without a name");
        return Ok(());
    };
    let reference = schema_ref(row, "catalog_name", "schema_name");
    let Some(schema) = ctx.schema_for_object(builder, reference)? else {
        return Ok(());
    };
    builder.upsert_data_type(
        Some(schema),
        DataTypeDraft {
            base_type: row.text("base_type"),
            ..DataTypeDraft::user_defined(name)
        },
    )?;
    Ok(())
}

impl RetrievalContext<'_> {
    /// Queue a column's type for an enum lookup when it is user-defined and
    /// enum values were requested.
    pub(super) fn note_column_type(&mut self, builder: &CatalogBuilder, id: DataTypeId) {
        if !builder.requested().contains(RetrievalField::EnumValues) {
            return;
        }
        if !builder.data_type(id).is_some_and(|dt| dt.user_defined) {
            return;
        }
        if self.visited_types.contains(&id) || self.column_types.contains(&id) {
            self.reused_lookups += 1;
            return;
        }
        self.column_types.push(id);
    }
}

/// Look up the values of every user-defined type the phase's columns use,
/// once per type.
///
/// A failed lookup reports the type as not enumerated; only a lost connection
/// fails the phase. Families without a lookup have no enumerated types.
pub(super) async fn lookup_column_enums(
    ctx: &mut RetrievalContext<'_>,
    builder: &mut CatalogBuilder,
) -> Result<()> {
    let descriptor = ctx.descriptor;
    let connection = ctx.connection;
    let lookup = descriptor.enum_probe();

    for id in std::mem::take(&mut ctx.column_types) {
        if !ctx.visited_types.insert(id) {
            continue;
        }
        let Some(data_type) = builder.data_type(id) else {
            continue;
        };
        let values = match lookup {
            None => Vec::new(),
            Some(lookup) => match lookup.enum_values(connection, data_type).await {
                Ok(values) => values,
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!("Could not retrieve enum values for {}: {}", data_type.name, e);
                    Vec::new()
                }
            },
        };
        builder.set_enum_values(id, values)?;
    }
    Ok(())
}
