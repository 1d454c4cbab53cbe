//! Core traits at the seams between the crawl engine and database drivers.
//!
//! - [`MetadataConnection`]: streams metadata rows from a live session
//! - [`CapabilityDescriptor`]: what a database family supports and how to ask
//! - [`EnumTypeProbe`]: optional lookup of enumerated type values
//!
//! # Row shapes
//!
//! Every [`MetadataRequest`] answers with rows using the labels listed on its
//! variant. Labels are matched case-insensitively. A driver may omit optional
//! labels; the affected fields then stay not-requested for the objects in
//! that row.

use std::fmt;

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::strategy::ObjectCategory;

use super::identifier::IdentifierRules;
use super::schema::ColumnDataType;
use super::value::MetadataRow;

/// Stream of metadata rows, released when dropped.
pub type RowStream<'a> = BoxStream<'a, Result<MetadataRow>>;

/// Generic metadata calls of the connectivity layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetadataRequest {
    /// `catalog_name`, `schema_name`, `remarks`
    Schemas,
    /// `type_name`, `base_type`
    SystemDataTypes,
    /// `catalog_name`, `schema_name`, `type_name`, `base_type`
    UserDefinedDataTypes,
    /// `catalog_name`, `schema_name`, `table_name`, `table_type`, `remarks`,
    /// `definition`
    Tables,
    /// `catalog_name`, `schema_name`, `table_name`, `column_name`,
    /// `ordinal_position`, `type_schema`, `type_name`, `column_size`,
    /// `decimal_digits`, `is_nullable`, `column_default`, `remarks`,
    /// `is_autoincrement`, `is_generated`, `is_hidden`
    Columns,
    /// `catalog_name`, `schema_name`, `table_name`, `column_name`, `key_seq`,
    /// `pk_name`
    PrimaryKeys,
    /// `catalog_name`, `schema_name`, `table_name`, `index_name`,
    /// `non_unique`, `column_name`, `ordinal_position`, `index_type`
    Indexes,
    /// `catalog_name`, `schema_name`, `table_name`, `constraint_name`,
    /// `constraint_type`, `column_name`, `definition`
    TableConstraints,
    /// `fk_name`, `pktable_cat`, `pktable_schem`, `pktable_name`,
    /// `pkcolumn_name`, `fktable_cat`, `fktable_schem`, `fktable_name`,
    /// `fkcolumn_name`, `key_seq`, `update_rule`, `delete_rule`,
    /// `deferrability`
    ForeignKeys,
    /// `catalog_name`, `schema_name`, `routine_name`, `specific_name`,
    /// `routine_type`, `remarks`, `definition`, `return_type`
    Routines,
    /// `catalog_name`, `schema_name`, `specific_name`, `parameter_name`,
    /// `ordinal_position`, `parameter_mode`, `type_schema`, `type_name`
    RoutineParameters,
    /// `catalog_name`, `schema_name`, `sequence_name`, `increment`,
    /// `minimum_value`, `maximum_value`, `cycle_option`, `remarks`
    Sequences,
    /// `catalog_name`, `schema_name`, `synonym_name`, `referenced_object`,
    /// `remarks`
    Synonyms,
}

impl MetadataRequest {
    pub fn category(self) -> ObjectCategory {
        match self {
            MetadataRequest::Schemas => ObjectCategory::Schemas,
            MetadataRequest::SystemDataTypes | MetadataRequest::UserDefinedDataTypes => {
                ObjectCategory::ColumnDataTypes
            }
            MetadataRequest::Tables => ObjectCategory::Tables,
            MetadataRequest::Columns => ObjectCategory::Columns,
            MetadataRequest::PrimaryKeys => ObjectCategory::PrimaryKeys,
            MetadataRequest::Indexes | MetadataRequest::TableConstraints => {
                ObjectCategory::Indexes
            }
            MetadataRequest::ForeignKeys => ObjectCategory::ForeignKeys,
            MetadataRequest::Routines | MetadataRequest::RoutineParameters => {
                ObjectCategory::Routines
            }
            MetadataRequest::Sequences => ObjectCategory::Sequences,
            MetadataRequest::Synonyms => ObjectCategory::Synonyms,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MetadataRequest::Schemas => "schemas",
            MetadataRequest::SystemDataTypes => "system_data_types",
            MetadataRequest::UserDefinedDataTypes => "user_defined_data_types",
            MetadataRequest::Tables => "tables",
            MetadataRequest::Columns => "columns",
            MetadataRequest::PrimaryKeys => "primary_keys",
            MetadataRequest::Indexes => "indexes",
            MetadataRequest::TableConstraints => "table_constraints",
            MetadataRequest::ForeignKeys => "foreign_keys",
            MetadataRequest::Routines => "routines",
            MetadataRequest::RoutineParameters => "routine_parameters",
            MetadataRequest::Sequences => "sequences",
            MetadataRequest::Synonyms => "synonyms",
        }
    }
}

impl fmt::Display for MetadataRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A live metadata session.
///
/// One crawl uses one connection and issues one request at a time. Errors
/// that mean the session is gone must be reported as
/// [`CrawlError::Connection`](crate::error::CrawlError::Connection); anything
/// else is treated as a failure of the current category only.
#[async_trait]
pub trait MetadataConnection: Send + Sync {
    /// Database family identifier (e.g., "postgres", "mssql").
    fn db_type(&self) -> &str;

    /// Check that the session is usable.
    async fn validate(&self) -> Result<()>;

    /// Run a generic metadata call.
    async fn metadata(&self, request: MetadataRequest) -> Result<RowStream<'_>>;

    /// Run descriptor-provided SQL with text parameters.
    async fn query(&self, sql: &str, params: &[&str]) -> Result<RowStream<'_>>;
}

/// Enumerated-type lookup for families that have such types.
#[async_trait]
pub trait EnumTypeProbe: Send + Sync {
    /// Allowed values in declaration order; an empty list when the type is
    /// not enumerated.
    async fn enum_values(
        &self,
        connection: &dyn MetadataConnection,
        data_type: &ColumnDataType,
    ) -> Result<Vec<String>>;
}

/// Capabilities and quirks of a database family.
///
/// Descriptors are immutable and shared between sessions.
pub trait CapabilityDescriptor: Send + Sync {
    /// Family name as used in configuration.
    fn name(&self) -> &str;

    /// Quoting and identity rules.
    fn identifier_rules(&self) -> IdentifierRules;

    /// Whether the family can serve a category at all.
    fn supports(&self, category: ObjectCategory) -> bool {
        let _ = category;
        true
    }

    /// SQL to use instead of the generic call for a request. The query must
    /// return the standard row shape of the request.
    fn retrieval_override(&self, request: &MetadataRequest) -> Option<String> {
        let _ = request;
        None
    }

    /// Schemas never reported (catalog and system namespaces).
    fn system_schemas(&self) -> &[&str] {
        &[]
    }

    /// Probe for enumerated type values, if the family has such types.
    fn enum_probe(&self) -> Option<&dyn EnumTypeProbe> {
        None
    }

    /// Whether a schema name belongs to the system.
    fn is_system_schema(&self, schema: &str) -> bool {
        let rules = self.identifier_rules();
        let wanted = rules.normalize(schema);
        self.system_schemas()
            .iter()
            .any(|s| rules.normalize(s) == wanted)
    }
}
