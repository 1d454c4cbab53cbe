//! Functions, procedures, and their parameters.

use tracing::debug;

use super::{qualified, resolve_data_type, schema_ref, RetrievalContext};
use crate::builder::{CatalogBuilder, ColumnDraft, RoutineDraft};
use crate::core::load::Loaded;
use crate::core::schema::{ColumnParent, ParameterMode, RoutineKind};
use crate::core::value::MetadataRow;
use crate::error::Result;
use crate::strategy::{RetrievalField, RetrievalPhase};

pub(super) fn apply_routine(
    ctx: &RetrievalContext<'_>,
    builder: &mut CatalogBuilder,
    phase: &RetrievalPhase,
    row: &MetadataRow,
) -> Result<()> {
    let Some(name) = row.string("routine_name") else {
        return Ok(());
    };
    let reference = schema_ref(row, "catalog_name", "schema_name");
    if !ctx
        .inclusion
        .routines
        .matches(&qualified(&reference, &name), &name)
    {
        return Ok(());
    }
    let Some(schema) = ctx.schema_for_object(builder, reference)? else {
        return Ok(());
    };

    let kind = row
        .string("routine_type")
        .map(|k| RoutineKind::parse(&k))
        .unwrap_or(RoutineKind::Unknown);
    let mut draft = RoutineDraft::new(name, kind);
    draft.specific_name = row.string("specific_name");
    if phase.wants(RetrievalField::RoutineDefinitions) {
        draft.remarks = row.text("remarks");
        draft.definition = row.text("definition");
    }
    if phase.wants(RetrievalField::RoutineParameters) {
        draft.return_type = row.text("return_type");
    }
    builder.upsert_routine(schema, draft)?;
    Ok(())
}

pub(super) fn apply_parameter(builder: &mut CatalogBuilder, row: &MetadataRow) -> Result<()> {
    let Some(schema) = builder.schema_id(&schema_ref(row, "catalog_name", "schema_name")) else {
        return Ok(());
    };
    let Some(routine) = row
        .string("specific_name")
        .and_then(|specific| builder.routine_id(schema, &specific))
    else {
        debug!("Skipping parameter of a routine that was not retrieved");
        return Ok(());
    };

    let ordinal = row.int("ordinal_position");
    // Unnamed parameters are named by position.
    let name = match row.string("parameter_name") {
        Some(name) => name,
        None => format!("${}", ordinal.present().copied().unwrap_or(0)),
    };
    let data_type = match resolve_data_type(builder, row)? {
        Some(id) => Loaded::Present(id),
        None => Loaded::Absent,
    };
    let draft = ColumnDraft {
        ordinal,
        data_type,
        parameter_mode: row.text("parameter_mode").map(|m| ParameterMode::parse(&m)),
        ..ColumnDraft::new(name)
    };
    builder.upsert_column(ColumnParent::Routine(routine), draft)?;
    Ok(())
}
