//! Retrieval strategy selection.
//!
//! Turns a detail level and a capability descriptor into an ordered
//! [`RetrievalPlan`]. Phase order is fixed by object dependency; categories
//! the descriptor does not support are left out of the plan.

mod levels;

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::traits::{CapabilityDescriptor, MetadataRequest};
use crate::error::{CrawlError, Result};

pub use levels::{DetailLevels, LevelDefinition};

/// Object categories in dependency order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectCategory {
    Schemas,
    ColumnDataTypes,
    Tables,
    Columns,
    PrimaryKeys,
    Indexes,
    ForeignKeys,
    Routines,
    Sequences,
    Synonyms,
}

impl ObjectCategory {
    /// All categories in phase order.
    pub const ALL: [ObjectCategory; 10] = [
        ObjectCategory::Schemas,
        ObjectCategory::ColumnDataTypes,
        ObjectCategory::Tables,
        ObjectCategory::Columns,
        ObjectCategory::PrimaryKeys,
        ObjectCategory::Indexes,
        ObjectCategory::ForeignKeys,
        ObjectCategory::Routines,
        ObjectCategory::Sequences,
        ObjectCategory::Synonyms,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ObjectCategory::Schemas => "schemas",
            ObjectCategory::ColumnDataTypes => "column_data_types",
            ObjectCategory::Tables => "tables",
            ObjectCategory::Columns => "columns",
            ObjectCategory::PrimaryKeys => "primary_keys",
            ObjectCategory::Indexes => "indexes",
            ObjectCategory::ForeignKeys => "foreign_keys",
            ObjectCategory::Routines => "routines",
            ObjectCategory::Sequences => "sequences",
            ObjectCategory::Synonyms => "synonyms",
        }
    }

    /// Categories whose objects hang off tables retrieved earlier.
    pub fn requires_tables(self) -> bool {
        matches!(
            self,
            ObjectCategory::Columns
                | ObjectCategory::PrimaryKeys
                | ObjectCategory::Indexes
                | ObjectCategory::ForeignKeys
        )
    }

    /// Categories whose rows name columns and resolve against them.
    pub fn requires_columns(self) -> bool {
        matches!(
            self,
            ObjectCategory::PrimaryKeys | ObjectCategory::Indexes | ObjectCategory::ForeignKeys
        )
    }
}

impl fmt::Display for ObjectCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A unit of metadata a detail level can switch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetrievalField {
    SchemaNames,
    TableNames,
    RoutineNames,
    ColumnBasics,
    ColumnDefaults,
    PrimaryKeys,
    ForeignKeys,
    Indexes,
    SystemDataTypes,
    UserDefinedDataTypes,
    RoutineParameters,
    TableRemarks,
    ColumnRemarks,
    ColumnFlags,
    TableConstraints,
    EnumValues,
    RoutineDefinitions,
    SequenceInformation,
    SynonymInformation,
    HiddenColumns,
    ViewDefinitions,
}

impl RetrievalField {
    pub const ALL: [RetrievalField; 21] = [
        RetrievalField::SchemaNames,
        RetrievalField::TableNames,
        RetrievalField::RoutineNames,
        RetrievalField::ColumnBasics,
        RetrievalField::ColumnDefaults,
        RetrievalField::PrimaryKeys,
        RetrievalField::ForeignKeys,
        RetrievalField::Indexes,
        RetrievalField::SystemDataTypes,
        RetrievalField::UserDefinedDataTypes,
        RetrievalField::RoutineParameters,
        RetrievalField::TableRemarks,
        RetrievalField::ColumnRemarks,
        RetrievalField::ColumnFlags,
        RetrievalField::TableConstraints,
        RetrievalField::EnumValues,
        RetrievalField::RoutineDefinitions,
        RetrievalField::SequenceInformation,
        RetrievalField::SynonymInformation,
        RetrievalField::HiddenColumns,
        RetrievalField::ViewDefinitions,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RetrievalField::SchemaNames => "schema_names",
            RetrievalField::TableNames => "table_names",
            RetrievalField::RoutineNames => "routine_names",
            RetrievalField::ColumnBasics => "column_basics",
            RetrievalField::ColumnDefaults => "column_defaults",
            RetrievalField::PrimaryKeys => "primary_keys",
            RetrievalField::ForeignKeys => "foreign_keys",
            RetrievalField::Indexes => "indexes",
            RetrievalField::SystemDataTypes => "system_data_types",
            RetrievalField::UserDefinedDataTypes => "user_defined_data_types",
            RetrievalField::RoutineParameters => "routine_parameters",
            RetrievalField::TableRemarks => "table_remarks",
            RetrievalField::ColumnRemarks => "column_remarks",
            RetrievalField::ColumnFlags => "column_flags",
            RetrievalField::TableConstraints => "table_constraints",
            RetrievalField::EnumValues => "enum_values",
            RetrievalField::RoutineDefinitions => "routine_definitions",
            RetrievalField::SequenceInformation => "sequence_information",
            RetrievalField::SynonymInformation => "synonym_information",
            RetrievalField::HiddenColumns => "hidden_columns",
            RetrievalField::ViewDefinitions => "view_definitions",
        }
    }

    /// The phase that populates this field.
    pub fn category(self) -> ObjectCategory {
        use RetrievalField::*;
        match self {
            SchemaNames => ObjectCategory::Schemas,
            SystemDataTypes | UserDefinedDataTypes | EnumValues => ObjectCategory::ColumnDataTypes,
            TableNames | TableRemarks | ViewDefinitions => ObjectCategory::Tables,
            ColumnBasics | ColumnDefaults | ColumnRemarks | ColumnFlags | HiddenColumns => {
                ObjectCategory::Columns
            }
            PrimaryKeys => ObjectCategory::PrimaryKeys,
            Indexes | TableConstraints => ObjectCategory::Indexes,
            ForeignKeys => ObjectCategory::ForeignKeys,
            RoutineNames | RoutineParameters | RoutineDefinitions => ObjectCategory::Routines,
            SequenceInformation => ObjectCategory::Sequences,
            SynonymInformation => ObjectCategory::Synonyms,
        }
    }

    /// Fields that must be enabled alongside this one.
    pub fn prerequisites(self) -> &'static [RetrievalField] {
        use RetrievalField::*;
        match self {
            ColumnDefaults | ColumnRemarks | ColumnFlags | HiddenColumns | PrimaryKeys
            | ForeignKeys | Indexes | TableConstraints | EnumValues => &[ColumnBasics],
            ColumnBasics | TableRemarks | ViewDefinitions => &[TableNames],
            RoutineParameters | RoutineDefinitions => &[RoutineNames],
            _ => &[],
        }
    }
}

impl fmt::Display for RetrievalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RetrievalField {
    type Err = CrawlError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_lowercase().replace('-', "_");
        RetrievalField::ALL
            .iter()
            .copied()
            .find(|f| f.as_str() == wanted)
            .ok_or_else(|| CrawlError::Config(format!("Unknown retrieval field: {}", s)))
    }
}

/// An ordered set of retrieval fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldSet(BTreeSet<RetrievalField>);

impl FieldSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, field: RetrievalField) -> bool {
        self.0.contains(&field)
    }

    pub fn insert(&mut self, field: RetrievalField) -> bool {
        self.0.insert(field)
    }

    pub fn extend(&mut self, other: &FieldSet) {
        self.0.extend(other.0.iter().copied());
    }

    pub fn is_subset(&self, other: &FieldSet) -> bool {
        self.0.is_subset(&other.0)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = RetrievalField> + '_ {
        self.0.iter().copied()
    }

    /// Fields populated by one category's phase.
    pub fn for_category(&self, category: ObjectCategory) -> FieldSet {
        self.0
            .iter()
            .copied()
            .filter(|f| f.category() == category)
            .collect()
    }
}

impl FromIterator<RetrievalField> for FieldSet {
    fn from_iter<I: IntoIterator<Item = RetrievalField>>(iter: I) -> Self {
        FieldSet(iter.into_iter().collect())
    }
}

/// How a metadata request is satisfied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "sql", rename_all = "snake_case")]
pub enum RetrievalMethod {
    /// The connectivity layer's generic metadata call.
    Metadata,
    /// Descriptor-provided SQL returning the standard row shape.
    Sql(String),
}

/// One request of a phase.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievalStep {
    pub request: MetadataRequest,
    pub method: RetrievalMethod,
}

/// One category's retrieval.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievalPhase {
    pub category: ObjectCategory,
    pub fields: FieldSet,
    pub steps: Vec<RetrievalStep>,
}

impl RetrievalPhase {
    pub fn wants(&self, field: RetrievalField) -> bool {
        self.fields.contains(field)
    }
}

/// Ordered phases of a crawl.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievalPlan {
    pub level: String,
    pub fields: FieldSet,
    pub phases: Vec<RetrievalPhase>,
    /// Requested categories the descriptor cannot serve.
    pub unsupported: Vec<ObjectCategory>,
}

impl RetrievalPlan {
    /// Build the plan for a named level.
    pub fn build(
        levels: &DetailLevels,
        level: &str,
        descriptor: &dyn CapabilityDescriptor,
    ) -> Result<Self> {
        let fields = levels.resolve(level)?;
        Ok(Self::for_fields(level, fields, descriptor))
    }

    /// Build the plan for an explicit field set.
    pub fn for_fields(level: &str, fields: FieldSet, descriptor: &dyn CapabilityDescriptor) -> Self {
        let mut phases = Vec::new();
        let mut unsupported = Vec::new();

        for category in ObjectCategory::ALL {
            let phase_fields = fields.for_category(category);
            if phase_fields.is_empty() {
                continue;
            }
            if !descriptor.supports(category) {
                unsupported.push(category);
                continue;
            }
            let steps = requests_for(category, &phase_fields)
                .into_iter()
                .map(|request| RetrievalStep {
                    method: descriptor
                        .retrieval_override(&request)
                        .map(RetrievalMethod::Sql)
                        .unwrap_or(RetrievalMethod::Metadata),
                    request,
                })
                .collect::<Vec<_>>();
            phases.push(RetrievalPhase {
                category,
                fields: phase_fields,
                steps,
            });
        }

        Self {
            level: level.to_string(),
            fields,
            phases,
            unsupported,
        }
    }

    pub fn categories(&self) -> impl Iterator<Item = ObjectCategory> + '_ {
        self.phases.iter().map(|p| p.category)
    }

    pub fn phase(&self, category: ObjectCategory) -> Option<&RetrievalPhase> {
        self.phases.iter().find(|p| p.category == category)
    }
}

/// Requests issued by a category's phase, given its fields.
fn requests_for(category: ObjectCategory, fields: &FieldSet) -> Vec<MetadataRequest> {
    use RetrievalField as F;
    match category {
        ObjectCategory::Schemas => vec![MetadataRequest::Schemas],
        ObjectCategory::ColumnDataTypes => {
            let mut requests = Vec::new();
            if fields.contains(F::SystemDataTypes) {
                requests.push(MetadataRequest::SystemDataTypes);
            }
            if fields.contains(F::UserDefinedDataTypes) || fields.contains(F::EnumValues) {
                requests.push(MetadataRequest::UserDefinedDataTypes);
            }
            requests
        }
        ObjectCategory::Tables => vec![MetadataRequest::Tables],
        ObjectCategory::Columns => vec![MetadataRequest::Columns],
        ObjectCategory::PrimaryKeys => vec![MetadataRequest::PrimaryKeys],
        ObjectCategory::Indexes => {
            let mut requests = Vec::new();
            if fields.contains(F::Indexes) {
                requests.push(MetadataRequest::Indexes);
            }
            if fields.contains(F::TableConstraints) {
                requests.push(MetadataRequest::TableConstraints);
            }
            requests
        }
        ObjectCategory::ForeignKeys => vec![MetadataRequest::ForeignKeys],
        ObjectCategory::Routines => {
            let mut requests = vec![MetadataRequest::Routines];
            if fields.contains(F::RoutineParameters) {
                requests.push(MetadataRequest::RoutineParameters);
            }
            requests
        }
        ObjectCategory::Sequences => vec![MetadataRequest::Sequences],
        ObjectCategory::Synonyms => vec![MetadataRequest::Synonyms],
    }
}
