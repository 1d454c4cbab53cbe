//! Weak associations: columns that look like foreign keys but have no
//! declared constraint.
//!
//! A column `customer_id` matches table `customer` (or `customers`) when that
//! table's single primary-key column is `id`, or when its key column is
//! itself named `customer_id`.

use std::collections::HashSet;

use serde::Serialize;
use tracing::debug;

use crate::catalog::Catalog;
use crate::core::load::Loaded;
use crate::core::schema::{Attributed, Column, ColumnId, TypeFamily};

/// How the column name matched the target table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NameMatch {
    Exact,
    /// Matched the singular or plural form of the table name.
    Inflected,
}

/// An inferred, undeclared reference between two columns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeakAssociation {
    pub foreign_key_column: ColumnId,
    pub primary_key_column: ColumnId,
    pub name_match: NameMatch,
}

struct Target {
    table_name: String,
    key_column: ColumnId,
    key_name: String,
}

/// Infer weak associations across the whole catalog.
pub fn find(catalog: &Catalog) -> Vec<WeakAssociation> {
    let declared: HashSet<ColumnId> = catalog
        .foreign_keys()
        .flat_map(|fk| fk.foreign_key_columns())
        .collect();

    let targets = targets(catalog);
    let mut found = Vec::new();

    for table in catalog.tables() {
        if table.partial || table.is_filtered() {
            continue;
        }
        let Ok(columns) = catalog.columns(table) else {
            continue;
        };
        for column in columns {
            if column.partial || declared.contains(&column.id) {
                continue;
            }
            if let Some(association) = best_match(catalog, column, &targets) {
                debug!(
                    "Weak association {}",
                    catalog.describe_weak_association(&association)
                );
                found.push(association);
            }
        }
    }
    found
}

/// Tables with a single-column primary key.
fn targets(catalog: &Catalog) -> Vec<Target> {
    catalog
        .tables()
        .filter(|t| !t.partial && !t.is_filtered())
        .filter_map(|t| {
            let Loaded::Present(pk) = &t.primary_key else {
                return None;
            };
            let [key_column] = pk.columns.as_slice() else {
                return None;
            };
            let key = catalog.column(*key_column)?;
            Some(Target {
                table_name: normalize(&t.name),
                key_column: *key_column,
                key_name: normalize(&key.name),
            })
        })
        .collect()
}

fn best_match(catalog: &Catalog, column: &Column, targets: &[Target]) -> Option<WeakAssociation> {
    let name = normalize(&column.name);
    let mut candidates: Vec<(NameMatch, &Target)> = targets
        .iter()
        .filter(|t| t.key_column != column.id)
        .filter_map(|t| name_match(&name, t).map(|m| (m, t)))
        .filter(|(_, t)| types_compatible(catalog, column.id, t.key_column))
        .collect();

    let best = candidates.iter().map(|(m, _)| *m).min()?;
    candidates.retain(|(m, _)| *m == best);
    match candidates.as_slice() {
        [(name_match, target)] => Some(WeakAssociation {
            foreign_key_column: column.id,
            primary_key_column: target.key_column,
            name_match: *name_match,
        }),
        _ => {
            debug!(
                "Ambiguous weak association for {}: {} candidates",
                catalog.column_full_name(column),
                candidates.len()
            );
            None
        }
    }
}

fn name_match(column: &str, target: &Target) -> Option<NameMatch> {
    if target.key_name.starts_with(&target.table_name) && column == target.key_name {
        return Some(NameMatch::Exact);
    }
    let prefix = column.strip_suffix(target.key_name.as_str())?;
    if prefix.is_empty() {
        None
    } else if prefix == target.table_name {
        Some(NameMatch::Exact)
    } else if is_plural_singular_pair(prefix, &target.table_name) {
        Some(NameMatch::Inflected)
    } else {
        None
    }
}

/// Same declared type, or the same known type family.
fn types_compatible(catalog: &Catalog, a: ColumnId, b: ColumnId) -> bool {
    let data_type = |id: ColumnId| {
        catalog
            .column(id)
            .and_then(|c| c.data_type.present().copied())
            .and_then(|dt| catalog.data_type(dt))
    };
    match (data_type(a), data_type(b)) {
        (Some(x), Some(y)) => {
            if x.id == y.id || x.name.eq_ignore_ascii_case(&y.name) {
                return true;
            }
            let family = x.family();
            family != TypeFamily::Unknown && family == y.family()
        }
        _ => false,
    }
}

/// Lowercase with `_` separators removed.
fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

fn is_plural_singular_pair(a: &str, b: &str) -> bool {
    let (plural, singular) = if a.len() > b.len() { (a, b) } else { (b, a) };

    // "users" -> "user"
    if plural.strip_suffix('s') == Some(singular) {
        return true;
    }
    // "categories" -> "category"
    if let (Some(p), Some(s)) = (plural.strip_suffix("ies"), singular.strip_suffix('y')) {
        if p == s {
            return true;
        }
    }
    // "addresses" -> "address", "boxes" -> "box"
    if let Some(stem) = plural.strip_suffix("es") {
        let sibilant = ["s", "x", "ch", "sh"].iter().any(|end| stem.ends_with(end));
        if stem == singular && sibilant {
            return true;
        }
    }
    false
}
