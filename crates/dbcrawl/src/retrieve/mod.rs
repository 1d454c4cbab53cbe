//! Object retrievers: turn streamed metadata rows into builder entries.
//!
//! One submodule per object category. Each phase of a [`RetrievalPlan`] is
//! run by [`run_phase`], which opens the phase's row streams one at a time,
//! races every row against the cancellation token, and hands the row to the
//! category's handler. Handlers are tolerant: rows for excluded objects or
//! unknown parents are skipped, and a missing label leaves the affected field
//! not requested.
//!
//! [`RetrievalPlan`]: crate::strategy::RetrievalPlan

mod columns;
mod data_types;
pub mod filter;
mod indexes;
mod keys;
mod routines;
mod schemas;
mod sequences;
mod synonyms;
mod tables;

use std::collections::HashSet;

use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::builder::{CatalogBuilder, DataTypeDraft};
use crate::core::schema::{ColumnId, ColumnParent, DataTypeId, SchemaId, SchemaRef, TableId};
use crate::core::traits::{CapabilityDescriptor, MetadataConnection, MetadataRequest, RowStream};
use crate::core::value::MetadataRow;
use crate::error::{CrawlError, Result};
use crate::strategy::{ObjectCategory, RetrievalMethod, RetrievalPhase, RetrievalStep};

pub use filter::{GrepFilter, InclusionRules, NameFilter};

/// Per-session state shared by all retrievers of one crawl.
pub struct RetrievalContext<'a> {
    pub connection: &'a dyn MetadataConnection,
    pub descriptor: &'a dyn CapabilityDescriptor,
    pub inclusion: &'a InclusionRules,
    pub cancel: CancellationToken,
    /// User-defined types seen on columns, in first-seen order, waiting for
    /// an enum lookup.
    column_types: Vec<DataTypeId>,
    /// Types already looked up; later columns of the same type reuse the
    /// values stored on the type.
    visited_types: HashSet<DataTypeId>,
    reused_lookups: usize,
}

impl<'a> RetrievalContext<'a> {
    pub fn new(
        connection: &'a dyn MetadataConnection,
        descriptor: &'a dyn CapabilityDescriptor,
        inclusion: &'a InclusionRules,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            connection,
            descriptor,
            inclusion,
            cancel,
            column_types: Vec::new(),
            visited_types: HashSet::new(),
            reused_lookups: 0,
        }
    }

    /// Number of data types looked up for enumerated values so far.
    pub fn probed_types(&self) -> usize {
        self.visited_types.len()
    }

    /// Columns whose type had already been looked up.
    pub fn reused_lookups(&self) -> usize {
        self.reused_lookups
    }

    /// Whether objects of this schema are crawled.
    fn included_schema(&self, reference: &SchemaRef) -> bool {
        if let Some(schema) = reference.schema.as_deref().or(reference.catalog.as_deref()) {
            if self.descriptor.is_system_schema(schema) {
                return false;
            }
        }
        let name = reference.full_name();
        self.inclusion.schemas.matches(&name, &name)
    }

    /// Whether a table name passes the schema and table patterns.
    fn included_table(&self, reference: &SchemaRef, name: &str) -> bool {
        self.included_schema(reference)
            && self.inclusion.tables.matches(&qualified(reference, name), name)
    }

    /// Existing or new schema for an object row.
    fn schema_for_object(
        &self,
        builder: &mut CatalogBuilder,
        reference: SchemaRef,
    ) -> Result<Option<SchemaId>> {
        if !self.included_schema(&reference) {
            return Ok(None);
        }
        builder.ensure_schema(reference).map(Some)
    }

    /// Table named by a row's `catalog_name`/`schema_name`/`table_name`.
    fn table_for_row(&self, builder: &CatalogBuilder, row: &MetadataRow) -> Option<TableId> {
        let schema = builder.schema_id(&schema_ref(row, "catalog_name", "schema_name"))?;
        let table = row.string("table_name")?;
        builder.table_id(schema, &table)
    }
}

/// Schema identity from two row labels.
fn schema_ref(row: &MetadataRow, catalog: &str, schema: &str) -> SchemaRef {
    SchemaRef {
        catalog: row.string(catalog),
        schema: row.string(schema),
    }
}

/// `schema.name`, skipping a missing schema.
fn qualified(reference: &SchemaRef, name: &str) -> String {
    let schema = reference.full_name();
    if schema.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", schema, name)
    }
}

/// Column of a table named by a row's `column_name` label.
fn table_column(
    builder: &CatalogBuilder,
    table: TableId,
    row: &MetadataRow,
    label: &str,
) -> Option<ColumnId> {
    let name = row.string(label)?;
    builder.column_id(ColumnParent::Table(table), &name)
}

/// Run one phase against the connection, writing into the builder.
///
/// The caller owns the phase checkpoint; an error here leaves the builder in
/// an intermediate state that must be rolled back.
pub async fn run_phase(
    ctx: &mut RetrievalContext<'_>,
    builder: &mut CatalogBuilder,
    phase: &RetrievalPhase,
) -> Result<()> {
    let mut rows = 0usize;
    for step in &phase.steps {
        let connection = ctx.connection;
        let mut stream = open(connection, step).await?;
        loop {
            let next = tokio::select! {
                biased;
                _ = ctx.cancel.cancelled() => return Err(CrawlError::Cancelled),
                next = stream.next() => next,
            };
            let Some(row) = next else {
                break;
            };
            let row = row?;
            rows += 1;
            apply(ctx, builder, phase, step.request, &row)?;
        }
    }

    if phase.category == ObjectCategory::Columns {
        data_types::lookup_column_enums(ctx, builder).await?;
    }

    info!("Retrieved {}: {} rows", phase.category, rows);
    Ok(())
}

async fn open<'c>(
    connection: &'c dyn MetadataConnection,
    step: &RetrievalStep,
) -> Result<RowStream<'c>> {
    match &step.method {
        RetrievalMethod::Metadata => connection.metadata(step.request).await,
        RetrievalMethod::Sql(sql) => {
            debug!("Using descriptor SQL for {}", step.request);
            connection.query(sql, &[]).await
        }
    }
}

fn apply(
    ctx: &mut RetrievalContext<'_>,
    builder: &mut CatalogBuilder,
    phase: &RetrievalPhase,
    request: MetadataRequest,
    row: &MetadataRow,
) -> Result<()> {
    match request {
        MetadataRequest::Schemas => schemas::apply(ctx, builder, row),
        MetadataRequest::SystemDataTypes => data_types::apply_system(builder, row),
        MetadataRequest::UserDefinedDataTypes => data_types::apply_user_defined(ctx, builder, row),
        MetadataRequest::Tables => tables::apply(ctx, builder, phase, row),
        MetadataRequest::Columns => columns::apply(ctx, builder, phase, row),
        MetadataRequest::PrimaryKeys => keys::apply_primary_key(ctx, builder, row),
        MetadataRequest::ForeignKeys => keys::apply_foreign_key(ctx, builder, row),
        MetadataRequest::Indexes => indexes::apply_index(ctx, builder, row),
        MetadataRequest::TableConstraints => indexes::apply_constraint(ctx, builder, row),
        MetadataRequest::Routines => routines::apply_routine(ctx, builder, phase, row),
        MetadataRequest::RoutineParameters => routines::apply_parameter(builder, row),
        MetadataRequest::Sequences => sequences::apply(ctx, builder, row),
        MetadataRequest::Synonyms => synonyms::apply(ctx, builder, row),
    }
}

/// Data type named by a row's `type_schema`/`type_name`, created as a system
/// type when the data-type phase did not report it.
fn resolve_data_type(builder: &mut CatalogBuilder, row: &MetadataRow) -> Result<Option<DataTypeId>> {
    let Some(name) = row.string("type_name") else {
        return Ok(None);
    };
    if row.has("type_schema") {
        let schema = builder.schema_id(&schema_ref(row, "catalog_name", "type_schema"));
        if let Some(id) = schema.and_then(|s| builder.data_type_id(Some(s), &name)) {
            return Ok(Some(id));
        }
    }
    if let Some(id) = builder.data_type_id(None, &name) {
        return Ok(Some(id));
    }
    builder
        .upsert_data_type(None, DataTypeDraft::system(name))
        .map(Some)
}
