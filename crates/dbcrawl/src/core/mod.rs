//! Core abstractions shared by the crawl engine and the drivers.
//!
//! - [`schema`]: catalog object types and typed ids
//! - [`load`]: the tri-state [`Loaded`] field wrapper
//! - [`attributes`]: open attribute bags and well-known keys
//! - [`identifier`]: quoting and identity normalization rules
//! - [`value`]: metadata rows delivered by drivers
//! - [`traits`]: connection, capability descriptor, and enum probe traits
//! - [`registry`]: descriptor registry for dependency injection

pub mod attributes;
pub mod identifier;
pub mod load;
pub mod registry;
pub mod schema;
pub mod traits;
pub mod value;

pub use attributes::{AttributeBag, AttributeValue};
pub use identifier::{CaseFolding, IdentifierRules};
pub use load::{LoadState, Loaded};
pub use registry::DriverRegistry;
pub use schema::{
    Attributed, Column, ColumnDataType, ColumnId, ColumnParent, ColumnReference, DataTypeId,
    ForeignKey, ForeignKeyId, Index, IndexId, NamedObject, ObjectRef, PrimaryKey, Remarked,
    Routine, RoutineId, Schema, SchemaId, SchemaRef, Sequence, SequenceId, Synonym, SynonymId,
    Table, TableConstraint, TableId, TableKind, TypeFamily,
};
pub use traits::{CapabilityDescriptor, EnumTypeProbe, MetadataConnection, MetadataRequest, RowStream};
pub use value::{MetaValue, MetadataRow};
