//! Depth-first catalog traversal for rule engines and formatters.
//!
//! For each schema, objects are visited section by section: column data
//! types, tables, routines, sequences, synonyms. System data types come first
//! in a section without a schema. Objects excluded by inclusion rules or by
//! the grep filter are never visited.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::Catalog;
use crate::core::schema::{
    Attributed, ColumnDataType, ObjectRef, Routine, Schema, Sequence, Synonym, Table,
};
use crate::error::Result;

/// Per-schema section of a traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    ColumnDataTypes,
    Tables,
    Routines,
    Sequences,
    Synonyms,
}

/// The object handed to a traversal handler.
#[derive(Debug, Clone, Copy)]
pub enum CatalogObject<'a> {
    ColumnDataType(&'a ColumnDataType),
    Table(&'a Table),
    Routine(&'a Routine),
    Sequence(&'a Sequence),
    Synonym(&'a Synonym),
}

impl<'a> CatalogObject<'a> {
    pub fn name(&self) -> &'a str {
        match self {
            CatalogObject::ColumnDataType(o) => &o.name,
            CatalogObject::Table(o) => &o.name,
            CatalogObject::Routine(o) => &o.name,
            CatalogObject::Sequence(o) => &o.name,
            CatalogObject::Synonym(o) => &o.name,
        }
    }

    pub fn object_ref(&self) -> ObjectRef {
        match self {
            CatalogObject::ColumnDataType(o) => ObjectRef::DataType(o.id),
            CatalogObject::Table(o) => ObjectRef::Table(o.id),
            CatalogObject::Routine(o) => ObjectRef::Routine(o.id),
            CatalogObject::Sequence(o) => ObjectRef::Sequence(o.id),
            CatalogObject::Synonym(o) => ObjectRef::Synonym(o.id),
        }
    }

    fn is_filtered(&self) -> bool {
        match self {
            CatalogObject::ColumnDataType(o) => o.is_filtered(),
            CatalogObject::Table(o) => o.partial || o.is_filtered(),
            CatalogObject::Routine(o) => o.is_filtered(),
            CatalogObject::Sequence(o) => o.is_filtered(),
            CatalogObject::Synonym(o) => o.is_filtered(),
        }
    }
}

/// Callbacks of a traversal. Only [`TraversalHandler::handle`] is required.
pub trait TraversalHandler {
    fn begin(&mut self, catalog: &Catalog) -> Result<()> {
        let _ = catalog;
        Ok(())
    }

    /// `schema` is `None` for the leading section of system data types.
    fn section_start(&mut self, schema: Option<&Schema>, section: Section) -> Result<()> {
        let _ = (schema, section);
        Ok(())
    }

    fn handle(&mut self, catalog: &Catalog, object: CatalogObject<'_>) -> Result<()>;

    fn section_end(&mut self, schema: Option<&Schema>, section: Section) -> Result<()> {
        let _ = (schema, section);
        Ok(())
    }

    fn end(&mut self, catalog: &Catalog) -> Result<()> {
        let _ = catalog;
        Ok(())
    }
}

/// Caller-supplied object ordering.
pub type ObjectComparator =
    Arc<dyn for<'a> Fn(&Catalog, &CatalogObject<'a>, &CatalogObject<'a>) -> Ordering + Send + Sync>;

/// Visit order within a section. Ties always fall back to the qualified name.
#[derive(Clone, Default)]
pub enum SortOrder {
    /// Retrieval order.
    #[default]
    Natural,
    /// Case-insensitive by name.
    Alphabetical,
    Custom(ObjectComparator),
}

impl fmt::Debug for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortOrder::Natural => write!(f, "Natural"),
            SortOrder::Alphabetical => write!(f, "Alphabetical"),
            SortOrder::Custom(_) => write!(f, "Custom"),
        }
    }
}

/// Ordering per section.
#[derive(Debug, Clone, Default)]
pub struct TraversalOptions {
    pub tables: SortOrder,
    pub routines: SortOrder,
    pub other: SortOrder,
}

impl TraversalOptions {
    /// The same order for every section.
    pub fn uniform(order: SortOrder) -> Self {
        Self {
            tables: order.clone(),
            routines: order.clone(),
            other: order,
        }
    }
}

/// Drives a [`TraversalHandler`] over a catalog.
pub struct Traverser<'c> {
    catalog: &'c Catalog,
    options: TraversalOptions,
}

impl<'c> Traverser<'c> {
    pub fn new(catalog: &'c Catalog, options: TraversalOptions) -> Self {
        Self { catalog, options }
    }

    pub fn traverse(&self, handler: &mut dyn TraversalHandler) -> Result<()> {
        let catalog = self.catalog;
        handler.begin(catalog)?;

        let system_types: Vec<_> = catalog
            .system_data_types()
            .map(CatalogObject::ColumnDataType)
            .collect();
        if !system_types.is_empty() {
            self.section(handler, None, Section::ColumnDataTypes, system_types)?;
        }

        let mut schemas: Vec<&Schema> = catalog.schemas().filter(|s| !s.is_filtered()).collect();
        schemas.sort_by(|a, b| a.full_name().cmp(&b.full_name()));

        for schema in schemas {
            let data_types = schema
                .data_types
                .iter()
                .filter_map(|id| catalog.data_type(*id))
                .map(CatalogObject::ColumnDataType)
                .collect();
            self.section(handler, Some(schema), Section::ColumnDataTypes, data_types)?;

            let tables = schema
                .tables
                .iter()
                .filter_map(|id| catalog.table(*id))
                .map(CatalogObject::Table)
                .collect();
            self.section(handler, Some(schema), Section::Tables, tables)?;

            let routines = schema
                .routines
                .iter()
                .filter_map(|id| catalog.routine(*id))
                .map(CatalogObject::Routine)
                .collect();
            self.section(handler, Some(schema), Section::Routines, routines)?;

            let sequences = schema
                .sequences
                .iter()
                .filter_map(|id| catalog.sequence(*id))
                .map(CatalogObject::Sequence)
                .collect();
            self.section(handler, Some(schema), Section::Sequences, sequences)?;

            let synonyms = schema
                .synonyms
                .iter()
                .filter_map(|id| catalog.synonym(*id))
                .map(CatalogObject::Synonym)
                .collect();
            self.section(handler, Some(schema), Section::Synonyms, synonyms)?;
        }

        handler.end(catalog)
    }

    fn section(
        &self,
        handler: &mut dyn TraversalHandler,
        schema: Option<&Schema>,
        section: Section,
        objects: Vec<CatalogObject<'c>>,
    ) -> Result<()> {
        let mut objects: Vec<_> = objects.into_iter().filter(|o| !o.is_filtered()).collect();
        self.sort(section, &mut objects);

        handler.section_start(schema, section)?;
        for object in objects {
            handler.handle(self.catalog, object)?;
        }
        handler.section_end(schema, section)
    }

    fn sort(&self, section: Section, objects: &mut [CatalogObject<'c>]) {
        let order = match section {
            Section::Tables => &self.options.tables,
            Section::Routines => &self.options.routines,
            _ => &self.options.other,
        };
        let catalog = self.catalog;
        let tie_break = |a: &CatalogObject<'_>, b: &CatalogObject<'_>| {
            catalog
                .qualified_name(a.object_ref())
                .cmp(&catalog.qualified_name(b.object_ref()))
        };
        match order {
            SortOrder::Natural => {}
            SortOrder::Alphabetical => objects.sort_by(|a, b| {
                a.name()
                    .to_lowercase()
                    .cmp(&b.name().to_lowercase())
                    .then_with(|| tie_break(a, b))
            }),
            SortOrder::Custom(compare) => {
                objects.sort_by(|a, b| compare(catalog, a, b).then_with(|| tie_break(a, b)))
            }
        }
    }
}
