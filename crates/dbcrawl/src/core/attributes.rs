//! Open attribute bags carried by every catalog object.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Set on tables whose columns did not match the grep pattern.
pub const NO_GREP_MATCH: &str = "dbcrawl.table.no_grep_match";

/// Set on stub tables created for references into excluded schemas or tables.
pub const FILTERED_OUT: &str = "dbcrawl.table.filtered_out";

/// Set on foreign keys with an endpoint in a filtered-out table.
pub const FILTERED_REFERENCE: &str = "dbcrawl.foreign_key.filtered";

/// Derived: foreign-key cardinality.
pub const FK_CARDINALITY: &str = "dbcrawl.foreign_key.cardinality";

/// Derived: inferred weak associations of a table.
pub const WEAK_ASSOCIATIONS: &str = "dbcrawl.table.weak_associations";

/// A typed attribute value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Bool(bool),
    Int(i64),
    Text(String),
    List(Vec<String>),
}

impl From<bool> for AttributeValue {
    fn from(v: bool) -> Self {
        AttributeValue::Bool(v)
    }
}

impl From<i64> for AttributeValue {
    fn from(v: i64) -> Self {
        AttributeValue::Int(v)
    }
}

impl From<&str> for AttributeValue {
    fn from(v: &str) -> Self {
        AttributeValue::Text(v.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(v: String) -> Self {
        AttributeValue::Text(v)
    }
}

impl From<Vec<String>> for AttributeValue {
    fn from(v: Vec<String>) -> Self {
        AttributeValue::List(v)
    }
}

/// String-keyed attributes, ordered for stable serialization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttributeBag(BTreeMap<String, AttributeValue>);

impl AttributeBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<AttributeValue>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&AttributeValue> {
        self.0.get(key)
    }

    pub fn has(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// True only for a `Bool(true)` entry.
    pub fn flag(&self, key: &str) -> bool {
        matches!(self.0.get(key), Some(AttributeValue::Bool(true)))
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        match self.0.get(key) {
            Some(AttributeValue::Text(s)) => Some(s),
            _ => None,
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<AttributeValue> {
        self.0.remove(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttributeValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_requires_true_bool() {
        let mut bag = AttributeBag::new();
        bag.set(NO_GREP_MATCH, true);
        bag.set(FILTERED_OUT, "yes");
        assert!(bag.flag(NO_GREP_MATCH));
        assert!(!bag.flag(FILTERED_OUT));
        assert!(!bag.flag("missing"));
    }

    #[test]
    fn test_serializes_in_key_order() {
        let mut bag = AttributeBag::new();
        bag.set("b", 2i64);
        bag.set("a", true);
        assert_eq!(serde_json::to_string(&bag).unwrap(), r#"{"a":true,"b":2}"#);
    }
}
