//! Inclusion rules and the column grep filter.

use regex::Regex;

use crate::core::schema::TableKind;
use crate::error::Result;

/// Include/exclude patterns for one kind of object.
///
/// A name is included when it matches any include pattern (or there are
/// none) and no exclude pattern. Patterns are tested against both the bare
/// name and the qualified `schema.name` form, and must match in full.
#[derive(Debug, Clone, Default)]
pub struct NameFilter {
    include: Vec<Regex>,
    exclude: Vec<Regex>,
}

impl NameFilter {
    pub fn new(include: &[String], exclude: &[String]) -> Result<Self> {
        Ok(Self {
            include: compile(include)?,
            exclude: compile(exclude)?,
        })
    }

    /// Include everything.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn matches(&self, qualified: &str, name: &str) -> bool {
        let hit = |re: &Regex| re.is_match(qualified) || re.is_match(name);
        let included = self.include.is_empty() || self.include.iter().any(hit);
        included && !self.exclude.iter().any(hit)
    }
}

fn compile(patterns: &[String]) -> Result<Vec<Regex>> {
    patterns
        .iter()
        .map(|p| Regex::new(&format!("^(?:{})$", p)).map_err(Into::into))
        .collect()
}

/// Which objects a crawl keeps.
#[derive(Debug, Clone, Default)]
pub struct InclusionRules {
    pub schemas: NameFilter,
    pub tables: NameFilter,
    pub routines: NameFilter,
    pub sequences: NameFilter,
    pub synonyms: NameFilter,
    /// Table kinds to keep; empty keeps all.
    pub table_types: Vec<TableKind>,
}

impl InclusionRules {
    pub fn table_kind_included(&self, kind: TableKind) -> bool {
        self.table_types.is_empty() || self.table_types.contains(&kind)
    }
}

/// Marks tables whose columns do not match a pattern.
#[derive(Debug, Clone)]
pub struct GrepFilter {
    pub columns: Regex,
    /// Keep tables with no matching column instead.
    pub invert: bool,
}

impl GrepFilter {
    pub fn new(pattern: &str, invert: bool) -> Result<Self> {
        Ok(Self {
            columns: Regex::new(pattern)?,
            invert,
        })
    }

    /// Whether a table with these qualified column names is kept.
    pub fn keeps<'a>(&self, mut columns: impl Iterator<Item = &'a str>) -> bool {
        let any = columns.any(|c| self.columns.is_match(c));
        any != self.invert
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_filter_includes_everything() {
        assert!(NameFilter::all().matches("public.orders", "orders"));
    }

    #[test]
    fn test_include_and_exclude() {
        let filter = NameFilter::new(
            &["public\\..*".to_string()],
            &[".*_audit".to_string()],
        )
        .unwrap();
        assert!(filter.matches("public.orders", "orders"));
        assert!(!filter.matches("public.orders_audit", "orders_audit"));
        assert!(!filter.matches("sales.orders", "orders"));
    }

    #[test]
    fn test_pattern_matches_bare_name_in_full() {
        let filter = NameFilter::new(&["order".to_string()], &[]).unwrap();
        assert!(filter.matches("public.order", "order"));
        assert!(!filter.matches("public.orders", "orders"));
    }

    #[test]
    fn test_bad_pattern_is_error() {
        assert!(NameFilter::new(&["(".to_string()], &[]).is_err());
    }

    #[test]
    fn test_grep_filter() {
        let grep = GrepFilter::new("email", false).unwrap();
        assert!(grep.keeps(["public.customer.email"].into_iter()));
        assert!(!grep.keeps(["public.customer.id"].into_iter()));

        let inverted = GrepFilter::new("email", true).unwrap();
        assert!(inverted.keeps(["public.customer.id"].into_iter()));
    }

    #[test]
    fn test_table_kind_filter() {
        let rules = InclusionRules {
            table_types: vec![TableKind::Table],
            ..Default::default()
        };
        assert!(rules.table_kind_included(TableKind::Table));
        assert!(!rules.table_kind_included(TableKind::View));
        assert!(InclusionRules::default().table_kind_included(TableKind::View));
    }
}
