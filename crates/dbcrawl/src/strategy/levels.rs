//! Named detail levels.

use serde::Serialize;

use super::{FieldSet, RetrievalField};
use crate::error::{CrawlError, Result};

/// A named level and the fields it adds on top of the previous level.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LevelDefinition {
    pub name: String,
    /// Cumulative field set.
    pub fields: FieldSet,
}

/// Ordered detail levels, each a strict superset of the previous.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetailLevels {
    levels: Vec<LevelDefinition>,
}

impl DetailLevels {
    /// `minimum < standard < detailed < maximum`.
    pub fn builtin() -> Self {
        use RetrievalField::*;
        let steps: [(&str, &[RetrievalField]); 4] = [
            ("minimum", &[SchemaNames, TableNames, RoutineNames]),
            (
                "standard",
                &[
                    ColumnBasics,
                    ColumnDefaults,
                    PrimaryKeys,
                    ForeignKeys,
                    Indexes,
                    SystemDataTypes,
                    UserDefinedDataTypes,
                    RoutineParameters,
                ],
            ),
            (
                "detailed",
                &[
                    TableRemarks,
                    ColumnRemarks,
                    ColumnFlags,
                    TableConstraints,
                    EnumValues,
                    RoutineDefinitions,
                    SequenceInformation,
                    SynonymInformation,
                ],
            ),
            ("maximum", &[HiddenColumns, ViewDefinitions]),
        ];

        let mut cumulative = FieldSet::new();
        let levels = steps
            .iter()
            .map(|(name, added)| {
                for field in added.iter() {
                    cumulative.insert(*field);
                }
                LevelDefinition {
                    name: name.to_string(),
                    fields: cumulative.clone(),
                }
            })
            .collect();
        Self { levels }
    }

    /// Validate and adopt custom levels, given in ascending order with
    /// cumulative field sets.
    pub fn custom(levels: Vec<LevelDefinition>) -> Result<Self> {
        if levels.is_empty() {
            return Err(CrawlError::Config(
                "custom_levels must define at least one level".to_string(),
            ));
        }

        for (i, level) in levels.iter().enumerate() {
            if level.name.trim().is_empty() {
                return Err(CrawlError::Config("Detail level name cannot be empty".into()));
            }
            if levels[..i].iter().any(|l| l.name == level.name) {
                return Err(CrawlError::Config(format!(
                    "Detail level '{}' is defined twice",
                    level.name
                )));
            }
            check_prerequisites(level)?;
            if i > 0 {
                let prev = &levels[i - 1];
                if !prev.fields.is_subset(&level.fields) || prev.fields == level.fields {
                    return Err(CrawlError::Config(format!(
                        "Detail level '{}' must enable a strict superset of '{}'",
                        level.name, prev.name
                    )));
                }
            }
        }

        Ok(Self { levels })
    }

    /// Cumulative fields of a level.
    pub fn resolve(&self, name: &str) -> Result<FieldSet> {
        self.levels
            .iter()
            .find(|l| l.name.eq_ignore_ascii_case(name))
            .map(|l| l.fields.clone())
            .ok_or_else(|| {
                CrawlError::Config(format!(
                    "Unknown detail level '{}' (expected one of: {})",
                    name,
                    self.names().join(", ")
                ))
            })
    }

    pub fn names(&self) -> Vec<&str> {
        self.levels.iter().map(|l| l.name.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LevelDefinition> {
        self.levels.iter()
    }
}

impl Default for DetailLevels {
    fn default() -> Self {
        Self::builtin()
    }
}

fn check_prerequisites(level: &LevelDefinition) -> Result<()> {
    for field in level.fields.iter() {
        for required in field.prerequisites() {
            if !level.fields.contains(*required) {
                return Err(CrawlError::Config(format!(
                    "Detail level '{}' enables {} without {}",
                    level.name, field, required
                )));
            }
        }
    }
    Ok(())
}
