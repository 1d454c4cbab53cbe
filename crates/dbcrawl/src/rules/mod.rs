//! Rule engine contract.
//!
//! A [`Linter`] inspects one table at a time and reports [`Lint`]s through a
//! [`LintContext`]. The [`RuleEngine`] is a [`TraversalHandler`], so linters
//! only ever see objects the traversal visits: filtered-out and
//! no-grep-match tables are never linted.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::catalog::{Catalog, CatalogObject, TraversalHandler};
use crate::core::schema::Table;
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LintSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for LintSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LintSeverity::Low => "low",
            LintSeverity::Medium => "medium",
            LintSeverity::High => "high",
            LintSeverity::Critical => "critical",
        };
        f.write_str(s)
    }
}

/// One finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Lint {
    pub linter: String,
    pub severity: LintSeverity,
    /// Qualified name of the offending object.
    pub object: String,
    pub message: String,
}

/// Where linters report findings.
pub struct LintContext<'a> {
    pub catalog: &'a Catalog,
    linter: &'a str,
    severity: LintSeverity,
    lints: &'a mut Vec<Lint>,
}

impl LintContext<'_> {
    pub fn report(&mut self, object: impl Into<String>, message: impl Into<String>) {
        self.lints.push(Lint {
            linter: self.linter.to_string(),
            severity: self.severity,
            object: object.into(),
            message: message.into(),
        });
    }
}

/// A single rule.
pub trait Linter: Send + Sync {
    /// Stable identifier, used in reports and to disable the rule.
    fn id(&self) -> &str;

    fn description(&self) -> &str {
        ""
    }

    fn severity(&self) -> LintSeverity {
        LintSeverity::Medium
    }

    fn lint_table(&self, table: &Table, ctx: &mut LintContext<'_>) -> Result<()>;
}

/// Runs registered linters over every visited table.
#[derive(Default)]
pub struct RuleEngine {
    linters: Vec<Box<dyn Linter>>,
    lints: Vec<Lint>,
}

impl RuleEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, linter: impl Linter + 'static) {
        self.linters.push(Box::new(linter));
    }

    pub fn linter_ids(&self) -> Vec<&str> {
        self.linters.iter().map(|l| l.id()).collect()
    }

    pub fn lints(&self) -> &[Lint] {
        &self.lints
    }

    /// Collected lints, most severe first.
    pub fn into_lints(mut self) -> Vec<Lint> {
        self.lints
            .sort_by(|a, b| b.severity.cmp(&a.severity).then_with(|| a.object.cmp(&b.object)));
        self.lints
    }
}

impl fmt::Debug for RuleEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleEngine")
            .field("linters", &self.linter_ids())
            .field("lints", &self.lints.len())
            .finish()
    }
}

impl TraversalHandler for RuleEngine {
    fn begin(&mut self, _catalog: &Catalog) -> Result<()> {
        self.lints.clear();
        Ok(())
    }

    fn handle(&mut self, catalog: &Catalog, object: CatalogObject<'_>) -> Result<()> {
        let CatalogObject::Table(table) = object else {
            return Ok(());
        };
        for linter in &self.linters {
            let mut ctx = LintContext {
                catalog,
                linter: linter.id(),
                severity: linter.severity(),
                lints: &mut self.lints,
            };
            linter.lint_table(table, &mut ctx)?;
        }
        Ok(())
    }

    fn end(&mut self, _catalog: &Catalog) -> Result<()> {
        debug!("Rule engine collected {} lints", self.lints.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{CatalogBuilder, ColumnDraft, TableDraft};
    use crate::catalog::{TraversalOptions, Traverser};
    use crate::core::attributes::NO_GREP_MATCH;
    use crate::core::identifier::IdentifierRules;
    use crate::core::load::Loaded;
    use crate::core::schema::{ColumnParent, SchemaRef, TableKind};
    use crate::strategy::{DetailLevels, ObjectCategory};

    struct NoPrimaryKey;

    impl Linter for NoPrimaryKey {
        fn id(&self) -> &str {
            "no-primary-key"
        }

        fn severity(&self) -> LintSeverity {
            LintSeverity::High
        }

        fn lint_table(&self, table: &Table, ctx: &mut LintContext<'_>) -> Result<()> {
            if table.primary_key == Loaded::Absent {
                let name = ctx.catalog.table_full_name(table);
                ctx.report(name, "table has no primary key");
            }
            Ok(())
        }
    }

    struct SingleColumn;

    impl Linter for SingleColumn {
        fn id(&self) -> &str {
            "single-column"
        }

        fn lint_table(&self, table: &Table, ctx: &mut LintContext<'_>) -> Result<()> {
            let columns = ctx.catalog.columns(table)?;
            if columns.len() == 1 {
                let name = ctx.catalog.table_full_name(table);
                ctx.report(name, "table has a single column");
            }
            Ok(())
        }
    }

    fn catalog() -> Catalog {
        let fields = DetailLevels::builtin().resolve("standard").unwrap();
        let mut b = CatalogBuilder::new(IdentifierRules::postgres(), fields);
        let cp = b.begin_phase(ObjectCategory::Schemas).unwrap();
        let public = b
            .upsert_schema(SchemaRef::new(None, Some("public")), Loaded::Absent)
            .unwrap();
        b.complete_phase(cp).unwrap();

        let cp = b.begin_phase(ObjectCategory::Tables).unwrap();
        let log = b
            .upsert_table(public, TableDraft::new("log", TableKind::Table))
            .unwrap();
        let hidden = b
            .upsert_table(public, TableDraft::new("scratch", TableKind::Table))
            .unwrap();
        b.set_table_attribute(hidden, NO_GREP_MATCH, true).unwrap();
        b.complete_phase(cp).unwrap();

        let cp = b.begin_phase(ObjectCategory::Columns).unwrap();
        for table in [log, hidden] {
            b.upsert_column(ColumnParent::Table(table), ColumnDraft::new("message"))
                .unwrap();
        }
        b.complete_phase(cp).unwrap();

        let cp = b.begin_phase(ObjectCategory::PrimaryKeys).unwrap();
        b.complete_phase(cp).unwrap();

        b.freeze().unwrap()
    }

    #[test]
    fn test_linters_run_per_visited_table() {
        let catalog = catalog();
        let mut engine = RuleEngine::new();
        engine.register(SingleColumn);
        engine.register(NoPrimaryKey);
        assert_eq!(engine.linter_ids(), vec!["single-column", "no-primary-key"]);

        Traverser::new(&catalog, TraversalOptions::default())
            .traverse(&mut engine)
            .unwrap();

        let lints = engine.into_lints();
        assert_eq!(lints.len(), 2);
        assert_eq!(lints[0].linter, "no-primary-key");
        assert_eq!(lints[0].severity, LintSeverity::High);
        assert_eq!(lints[0].object, "public.log");
        assert_eq!(lints[1].severity, LintSeverity::Medium);
    }

    #[test]
    fn test_rerun_starts_clean() {
        let catalog = catalog();
        let mut engine = RuleEngine::new();
        engine.register(NoPrimaryKey);
        let traverser = Traverser::new(&catalog, TraversalOptions::default());
        traverser.traverse(&mut engine).unwrap();
        traverser.traverse(&mut engine).unwrap();
        assert_eq!(engine.lints().len(), 1);
    }

    #[test]
    fn test_severity_order() {
        assert!(LintSeverity::Critical > LintSeverity::Low);
        assert_eq!(LintSeverity::High.to_string(), "high");
    }
}
