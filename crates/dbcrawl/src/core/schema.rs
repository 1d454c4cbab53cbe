//! Catalog object types: schemas, tables, columns, keys, routines, sequences,
//! and synonyms.
//!
//! Objects live in per-category arenas owned by the catalog and refer to each
//! other by typed ids. A column knows its parent by id; foreign keys are stored
//! once and referenced from both tables.

use serde::{Deserialize, Serialize};

use super::attributes::{AttributeBag, FILTERED_OUT, NO_GREP_MATCH};
use super::load::{LoadState, Loaded};

macro_rules! arena_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub(crate) usize);

        impl $name {
            pub fn index(self) -> usize {
                self.0
            }
        }
    };
}

arena_id!(
    /// Id of a [`Schema`].
    SchemaId
);
arena_id!(
    /// Id of a [`Table`].
    TableId
);
arena_id!(
    /// Id of a [`Column`], either a table column or a routine parameter.
    ColumnId
);
arena_id!(
    /// Id of a [`ColumnDataType`].
    DataTypeId
);
arena_id!(
    /// Id of a [`ForeignKey`].
    ForeignKeyId
);
arena_id!(
    /// Id of an [`Index`].
    IndexId
);
arena_id!(
    /// Id of a [`Routine`].
    RoutineId
);
arena_id!(
    /// Id of a [`Sequence`].
    SequenceId
);
arena_id!(
    /// Id of a [`Synonym`].
    SynonymId
);

/// Reference to any catalog object, used as a key for derived attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum ObjectRef {
    Schema(SchemaId),
    Table(TableId),
    Column(ColumnId),
    DataType(DataTypeId),
    ForeignKey(ForeignKeyId),
    Index(IndexId),
    Routine(RoutineId),
    Sequence(SequenceId),
    Synonym(SynonymId),
}

/// Object names and their scope.
pub trait NamedObject {
    fn name(&self) -> &str;
}

/// Objects carrying database comments.
pub trait Remarked {
    fn remarks(&self) -> &Loaded<String>;
}

/// Objects carrying an attribute bag.
pub trait Attributed {
    fn attributes(&self) -> &AttributeBag;

    fn attributes_mut(&mut self) -> &mut AttributeBag;

    /// Excluded by inclusion rules or by the grep filter.
    fn is_filtered(&self) -> bool {
        self.attributes().flag(FILTERED_OUT) || self.attributes().flag(NO_GREP_MATCH)
    }
}

macro_rules! impl_object_traits {
    ($ty:ty) => {
        impl NamedObject for $ty {
            fn name(&self) -> &str {
                &self.name
            }
        }

        impl Attributed for $ty {
            fn attributes(&self) -> &AttributeBag {
                &self.attributes
            }

            fn attributes_mut(&mut self) -> &mut AttributeBag {
                &mut self.attributes
            }
        }
    };
}

/// Identity of a schema: both parts optional, as databases without catalogs
/// or without schemas report nulls.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SchemaRef {
    pub catalog: Option<String>,
    pub schema: Option<String>,
}

impl SchemaRef {
    pub fn new(catalog: Option<&str>, schema: Option<&str>) -> Self {
        Self {
            catalog: catalog.map(str::to_string),
            schema: schema.map(str::to_string),
        }
    }

    /// `catalog.schema`, skipping missing parts.
    pub fn full_name(&self) -> String {
        [self.catalog.as_deref(), self.schema.as_deref()]
            .iter()
            .flatten()
            .copied()
            .collect::<Vec<_>>()
            .join(".")
    }
}

/// A namespace of tables, routines, sequences, synonyms, and user data types.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Schema {
    pub id: SchemaId,
    pub reference: SchemaRef,
    pub remarks: Loaded<String>,
    pub tables: Vec<TableId>,
    pub routines: Vec<RoutineId>,
    pub sequences: Vec<SequenceId>,
    pub synonyms: Vec<SynonymId>,
    pub data_types: Vec<DataTypeId>,
    pub attributes: AttributeBag,
}

impl Schema {
    pub fn full_name(&self) -> String {
        self.reference.full_name()
    }
}

impl NamedObject for Schema {
    fn name(&self) -> &str {
        self.reference.schema.as_deref().unwrap_or("")
    }
}

impl Attributed for Schema {
    fn attributes(&self) -> &AttributeBag {
        &self.attributes
    }

    fn attributes_mut(&mut self) -> &mut AttributeBag {
        &mut self.attributes
    }
}

impl Remarked for Schema {
    fn remarks(&self) -> &Loaded<String> {
        &self.remarks
    }
}

/// Table kinds reported by drivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableKind {
    Table,
    View,
    MaterializedView,
    Other,
}

impl TableKind {
    /// Parse a driver table-type string. Unknown types map to `Other`.
    pub fn parse(s: &str) -> Self {
        let upper = s.trim().to_uppercase();
        match upper.as_str() {
            "TABLE" | "BASE TABLE" | "BASE_TABLE" | "USER_TABLE" | "U" => TableKind::Table,
            "VIEW" | "SYSTEM VIEW" | "V" => TableKind::View,
            "MATERIALIZED VIEW" | "MATERIALIZED_VIEW" | "MATVIEW" | "M" => {
                TableKind::MaterializedView
            }
            _ => TableKind::Other,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TableKind::Table => "TABLE",
            TableKind::View => "VIEW",
            TableKind::MaterializedView => "MATERIALIZED VIEW",
            TableKind::Other => "OTHER",
        }
    }
}

/// Primary key of a table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrimaryKey {
    pub name: Option<String>,
    /// Columns in key sequence order.
    pub columns: Vec<ColumnId>,
}

/// Table constraint kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintKind {
    Check,
    Unique,
    PrimaryKey,
    ForeignKey,
    Other,
}

impl ConstraintKind {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_uppercase().as_str() {
            "CHECK" | "C" => ConstraintKind::Check,
            "UNIQUE" | "U" => ConstraintKind::Unique,
            "PRIMARY KEY" | "P" => ConstraintKind::PrimaryKey,
            "FOREIGN KEY" | "F" => ConstraintKind::ForeignKey,
            _ => ConstraintKind::Other,
        }
    }
}

/// A named table constraint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableConstraint {
    pub name: String,
    pub kind: ConstraintKind,
    pub definition: Loaded<String>,
    pub columns: Vec<ColumnId>,
}

/// A table, view, or materialized view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Table {
    pub id: TableId,
    pub schema: SchemaId,
    pub name: String,
    pub kind: TableKind,
    pub remarks: Loaded<String>,
    /// View or materialized view definition text.
    pub definition: Loaded<String>,
    /// All columns including hidden ones, in ordinal order once frozen.
    pub columns: Loaded<Vec<ColumnId>>,
    pub primary_key: Loaded<PrimaryKey>,
    pub indexes: Loaded<Vec<IndexId>>,
    /// Imported and exported foreign keys.
    pub foreign_keys: Loaded<Vec<ForeignKeyId>>,
    pub constraints: Loaded<Vec<TableConstraint>>,
    /// Stub created to anchor a reference into an excluded scope.
    pub partial: bool,
    pub attributes: AttributeBag,
}

impl Table {
    /// A table with no phase data yet.
    pub(crate) fn empty(id: TableId, schema: SchemaId, name: String, kind: TableKind) -> Self {
        Self {
            id,
            schema,
            name,
            kind,
            remarks: Loaded::NotRequested,
            definition: Loaded::NotRequested,
            columns: Loaded::NotRequested,
            primary_key: Loaded::NotRequested,
            indexes: Loaded::NotRequested,
            foreign_keys: Loaded::NotRequested,
            constraints: Loaded::NotRequested,
            partial: false,
            attributes: AttributeBag::new(),
        }
    }

    pub fn load_state(&self) -> LoadState {
        let all_loaded = self.remarks.is_loaded()
            && self.columns.is_loaded()
            && self.primary_key.is_loaded()
            && self.indexes.is_loaded()
            && self.foreign_keys.is_loaded()
            && self.constraints.is_loaded();
        if self.partial || !all_loaded {
            LoadState::Partial
        } else {
            LoadState::Complete
        }
    }

    pub fn is_view(&self) -> bool {
        matches!(self.kind, TableKind::View | TableKind::MaterializedView)
    }
}

impl_object_traits!(Table);

impl Remarked for Table {
    fn remarks(&self) -> &Loaded<String> {
        &self.remarks
    }
}

/// Owner of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum ColumnParent {
    Table(TableId),
    Routine(RoutineId),
}

/// Routine parameter direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterMode {
    In,
    Out,
    InOut,
    Return,
    Result,
    Unknown,
}

impl ParameterMode {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_uppercase().as_str() {
            "IN" => ParameterMode::In,
            "OUT" => ParameterMode::Out,
            "INOUT" | "IN/OUT" | "IN OUT" => ParameterMode::InOut,
            "RETURN" => ParameterMode::Return,
            "RESULT" | "TABLE" => ParameterMode::Result,
            _ => ParameterMode::Unknown,
        }
    }
}

/// A table column or routine parameter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Column {
    pub id: ColumnId,
    pub parent: ColumnParent,
    pub name: String,
    pub ordinal: Loaded<i64>,
    pub data_type: Loaded<DataTypeId>,
    pub size: Loaded<i64>,
    pub decimal_digits: Loaded<i64>,
    pub nullable: Loaded<bool>,
    pub default_value: Loaded<String>,
    pub remarks: Loaded<String>,
    pub auto_incremented: Loaded<bool>,
    pub generated: Loaded<bool>,
    pub hidden: Loaded<bool>,
    pub part_of_primary_key: Loaded<bool>,
    pub part_of_foreign_key: Loaded<bool>,
    pub part_of_unique_index: Loaded<bool>,
    pub parameter_mode: Loaded<ParameterMode>,
    /// Stub endpoint of a filtered reference.
    pub partial: bool,
    pub attributes: AttributeBag,
}

impl Column {
    /// A column with no phase data yet.
    pub(crate) fn empty(id: ColumnId, parent: ColumnParent, name: String) -> Self {
        Self {
            id,
            parent,
            name,
            ordinal: Loaded::NotRequested,
            data_type: Loaded::NotRequested,
            size: Loaded::NotRequested,
            decimal_digits: Loaded::NotRequested,
            nullable: Loaded::NotRequested,
            default_value: Loaded::NotRequested,
            remarks: Loaded::NotRequested,
            auto_incremented: Loaded::NotRequested,
            generated: Loaded::NotRequested,
            hidden: Loaded::NotRequested,
            part_of_primary_key: Loaded::NotRequested,
            part_of_foreign_key: Loaded::NotRequested,
            part_of_unique_index: Loaded::NotRequested,
            parameter_mode: Loaded::NotRequested,
            partial: false,
            attributes: AttributeBag::new(),
        }
    }

    pub fn table(&self) -> Option<TableId> {
        match self.parent {
            ColumnParent::Table(id) => Some(id),
            ColumnParent::Routine(_) => None,
        }
    }

    pub fn load_state(&self) -> LoadState {
        if self.partial {
            LoadState::Partial
        } else if self.data_type.is_loaded() && self.nullable.is_loaded() {
            LoadState::Complete
        } else {
            LoadState::Partial
        }
    }

    /// Hidden columns are treated as visible unless the driver said otherwise.
    pub fn is_hidden(&self) -> bool {
        matches!(self.hidden, Loaded::Present(true))
    }
}

impl_object_traits!(Column);

impl Remarked for Column {
    fn remarks(&self) -> &Loaded<String> {
        &self.remarks
    }
}

/// Broad type family used when comparing data types across columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeFamily {
    Integer,
    Decimal,
    Float,
    Text,
    Uuid,
    Temporal,
    Boolean,
    Binary,
    Unknown,
}

impl TypeFamily {
    /// Classify a database type name. Unrecognized names are `Unknown`.
    pub fn classify(type_name: &str) -> Self {
        let lower = type_name.to_lowercase();
        let base = lower
            .split(|c: char| c == '(' || c == ' ')
            .next()
            .unwrap_or("")
            .trim_start_matches('_');
        match base {
            "int" | "int2" | "int4" | "int8" | "integer" | "smallint" | "bigint" | "tinyint"
            | "mediumint" | "serial" | "bigserial" | "smallserial" => TypeFamily::Integer,
            "numeric" | "decimal" | "number" | "money" | "smallmoney" => TypeFamily::Decimal,
            "real" | "float" | "float4" | "float8" | "double" => TypeFamily::Float,
            "char" | "varchar" | "nchar" | "nvarchar" | "text" | "ntext" | "character"
            | "bpchar" | "citext" | "string" | "clob" | "tinytext" | "mediumtext"
            | "longtext" | "varchar2" | "nvarchar2" | "name" => TypeFamily::Text,
            "uuid" | "uniqueidentifier" => TypeFamily::Uuid,
            "date" | "time" | "timetz" | "timestamp" | "timestamptz" | "datetime"
            | "datetime2" | "smalldatetime" | "datetimeoffset" | "interval" => {
                TypeFamily::Temporal
            }
            "bool" | "boolean" | "bit" => TypeFamily::Boolean,
            "bytea" | "binary" | "varbinary" | "blob" | "image" | "longblob" | "raw" => {
                TypeFamily::Binary
            }
            _ => TypeFamily::Unknown,
        }
    }
}

/// A data type, interned per schema. System types have no schema.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnDataType {
    pub id: DataTypeId,
    pub schema: Option<SchemaId>,
    pub name: String,
    pub user_defined: bool,
    pub base_type: Loaded<String>,
    /// Allowed values of an enumerated type, in declaration order.
    pub enum_values: Loaded<Vec<String>>,
    pub attributes: AttributeBag,
}

impl ColumnDataType {
    pub fn is_enumerated(&self) -> bool {
        matches!(&self.enum_values, Loaded::Present(v) if !v.is_empty())
    }

    /// Family of the type, looking through user-defined domains to their base type.
    pub fn family(&self) -> TypeFamily {
        match TypeFamily::classify(&self.name) {
            TypeFamily::Unknown => match &self.base_type {
                Loaded::Present(base) => TypeFamily::classify(base),
                _ => TypeFamily::Unknown,
            },
            family => family,
        }
    }
}

impl_object_traits!(ColumnDataType);

/// Referential action of a foreign key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForeignKeyRule {
    NoAction,
    Restrict,
    Cascade,
    SetNull,
    SetDefault,
    Unknown,
}

impl ForeignKeyRule {
    /// Parse both the textual rule names and the JDBC-style numeric codes.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_uppercase().replace('_', " ").as_str() {
            "NO ACTION" | "3" | "A" => ForeignKeyRule::NoAction,
            "RESTRICT" | "1" | "R" => ForeignKeyRule::Restrict,
            "CASCADE" | "0" | "C" => ForeignKeyRule::Cascade,
            "SET NULL" | "2" | "N" => ForeignKeyRule::SetNull,
            "SET DEFAULT" | "4" | "D" => ForeignKeyRule::SetDefault,
            _ => ForeignKeyRule::Unknown,
        }
    }
}

/// Constraint deferrability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Deferrability {
    InitiallyDeferred,
    InitiallyImmediate,
    NotDeferrable,
}

impl Deferrability {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_uppercase().replace('_', " ").as_str() {
            "INITIALLY DEFERRED" | "5" => Deferrability::InitiallyDeferred,
            "INITIALLY IMMEDIATE" | "6" => Deferrability::InitiallyImmediate,
            _ => Deferrability::NotDeferrable,
        }
    }
}

/// One column pair of a foreign key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnReference {
    pub key_sequence: i64,
    pub primary_key_column: ColumnId,
    pub foreign_key_column: ColumnId,
}

/// A foreign key, shared between the referencing and the referenced table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForeignKey {
    pub id: ForeignKeyId,
    pub name: String,
    /// Column pairs in key sequence order.
    pub references: Vec<ColumnReference>,
    pub update_rule: Loaded<ForeignKeyRule>,
    pub delete_rule: Loaded<ForeignKeyRule>,
    pub deferrability: Loaded<Deferrability>,
    pub attributes: AttributeBag,
}

impl ForeignKey {
    pub fn foreign_key_columns(&self) -> impl Iterator<Item = ColumnId> + '_ {
        self.references.iter().map(|r| r.foreign_key_column)
    }

    pub fn primary_key_columns(&self) -> impl Iterator<Item = ColumnId> + '_ {
        self.references.iter().map(|r| r.primary_key_column)
    }
}

impl_object_traits!(ForeignKey);

/// A table index.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Index {
    pub id: IndexId,
    pub table: TableId,
    pub name: String,
    pub unique: bool,
    /// Columns in index ordinal order.
    pub columns: Vec<ColumnId>,
    pub index_type: Loaded<String>,
    pub attributes: AttributeBag,
}

impl_object_traits!(Index);

/// Procedure or function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutineKind {
    Procedure,
    Function,
    Unknown,
}

impl RoutineKind {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_uppercase().as_str() {
            "PROCEDURE" | "P" => RoutineKind::Procedure,
            "FUNCTION" | "FN" | "F" => RoutineKind::Function,
            _ => RoutineKind::Unknown,
        }
    }
}

/// A stored procedure or function.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Routine {
    pub id: RoutineId,
    pub schema: SchemaId,
    pub name: String,
    /// Overload-distinguishing name; equals `name` when the driver has none.
    pub specific_name: String,
    pub kind: RoutineKind,
    pub remarks: Loaded<String>,
    pub definition: Loaded<String>,
    pub return_type: Loaded<String>,
    pub parameters: Loaded<Vec<ColumnId>>,
    pub attributes: AttributeBag,
}

impl_object_traits!(Routine);

impl Remarked for Routine {
    fn remarks(&self) -> &Loaded<String> {
        &self.remarks
    }
}

/// A sequence generator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sequence {
    pub id: SequenceId,
    pub schema: SchemaId,
    pub name: String,
    pub increment: Loaded<i64>,
    pub minimum: Loaded<i64>,
    pub maximum: Loaded<i64>,
    pub cycle: Loaded<bool>,
    pub remarks: Loaded<String>,
    pub attributes: AttributeBag,
}

impl_object_traits!(Sequence);

impl Remarked for Sequence {
    fn remarks(&self) -> &Loaded<String> {
        &self.remarks
    }
}

/// An alias for another database object.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Synonym {
    pub id: SynonymId,
    pub schema: SchemaId,
    pub name: String,
    /// Qualified name of the aliased object, as reported.
    pub referenced_object: Loaded<String>,
    pub remarks: Loaded<String>,
    pub attributes: AttributeBag,
}

impl_object_traits!(Synonym);

impl Remarked for Synonym {
    fn remarks(&self) -> &Loaded<String> {
        &self.remarks
    }
}
