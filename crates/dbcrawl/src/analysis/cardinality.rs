//! Foreign-key cardinality from already-loaded key and nullability metadata.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::catalog::Catalog;
use crate::core::load::Loaded;
use crate::core::schema::{ColumnId, ConstraintKind, ForeignKey, Table};

/// How many referencing rows one referenced row can have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForeignKeyCardinality {
    /// Key or nullability information was not loaded.
    Unknown,
    ZeroOne,
    ZeroMany,
    OneOne,
}

impl ForeignKeyCardinality {
    pub fn as_str(self) -> &'static str {
        match self {
            ForeignKeyCardinality::Unknown => "unknown",
            ForeignKeyCardinality::ZeroOne => "zero_one",
            ForeignKeyCardinality::ZeroMany => "zero_many",
            ForeignKeyCardinality::OneOne => "one_one",
        }
    }
}

impl std::fmt::Display for ForeignKeyCardinality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Classify one foreign key.
///
/// The referencing columns are unique when they cover every column of the
/// primary key, a unique index, or a unique constraint of their table.
pub fn classify(catalog: &Catalog, fk: &ForeignKey) -> ForeignKeyCardinality {
    let Some(table) = catalog.referencing_table(fk) else {
        return ForeignKeyCardinality::Unknown;
    };
    if table.partial {
        return ForeignKeyCardinality::Unknown;
    }

    let fk_columns: HashSet<ColumnId> = fk.foreign_key_columns().collect();
    if fk_columns.is_empty() {
        return ForeignKeyCardinality::Unknown;
    }

    let Some(unique) = is_unique(catalog, table, &fk_columns) else {
        return ForeignKeyCardinality::Unknown;
    };
    if !unique {
        return ForeignKeyCardinality::ZeroMany;
    }

    let mut nullable = false;
    for id in &fk_columns {
        match catalog.column(*id).map(|c| &c.nullable) {
            Some(Loaded::Present(n)) => nullable |= *n,
            _ => return ForeignKeyCardinality::Unknown,
        }
    }

    if nullable {
        ForeignKeyCardinality::ZeroOne
    } else {
        ForeignKeyCardinality::OneOne
    }
}

/// `None` when the key information needed to decide was not loaded.
fn is_unique(catalog: &Catalog, table: &Table, columns: &HashSet<ColumnId>) -> Option<bool> {
    let covers = |key: &[ColumnId]| !key.is_empty() && key.iter().all(|c| columns.contains(c));

    let primary_key = match &table.primary_key {
        Loaded::NotRequested => return None,
        Loaded::Absent => None,
        Loaded::Present(pk) => Some(pk),
    };
    if primary_key.is_some_and(|pk| covers(&pk.columns)) {
        return Some(true);
    }

    let indexes = catalog.indexes(table).ok()?;
    if indexes.iter().any(|i| i.unique && covers(&i.columns)) {
        return Some(true);
    }

    // constraints are a detailed-level field; an absent list proves nothing
    if let Loaded::Present(constraints) = &table.constraints {
        if constraints
            .iter()
            .any(|c| c.kind == ConstraintKind::Unique && covers(&c.columns))
        {
            return Some(true);
        }
    }

    Some(false)
}
