//! Metadata rows as delivered by the connectivity layer.
//!
//! Drivers disagree on column labels, boolean spellings, and integer widths.
//! [`MetadataRow`] looks up labels case-insensitively and converts values
//! leniently into [`Loaded`] fields:
//!
//! - a label the driver did not return yields `Loaded::NotRequested`
//! - a SQL NULL yields `Loaded::Absent`
//! - a value that cannot be interpreted yields `Loaded::Absent`

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::load::Loaded;

/// A single metadata value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetaValue {
    Null,
    Bool(bool),
    Int(i64),
    Text(String),
}

impl MetaValue {
    pub fn is_null(&self) -> bool {
        matches!(self, MetaValue::Null)
    }

    /// Text form of any non-null value.
    pub fn as_text(&self) -> Option<String> {
        match self {
            MetaValue::Null => None,
            MetaValue::Bool(b) => Some(b.to_string()),
            MetaValue::Int(i) => Some(i.to_string()),
            MetaValue::Text(s) => Some(s.clone()),
        }
    }

    /// Integer of any width, or a numeric string.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            MetaValue::Int(i) => Some(*i),
            MetaValue::Bool(b) => Some(i64::from(*b)),
            MetaValue::Text(s) => s.trim().parse().ok(),
            MetaValue::Null => None,
        }
    }

    /// Accepts `YES/NO`, `Y/N`, `true/false`, `t/f`, and `1/0`.
    pub fn as_flag(&self) -> Option<bool> {
        match self {
            MetaValue::Bool(b) => Some(*b),
            MetaValue::Int(i) => Some(*i != 0),
            MetaValue::Text(s) => match s.trim().to_uppercase().as_str() {
                "YES" | "Y" | "TRUE" | "T" | "1" => Some(true),
                "NO" | "N" | "FALSE" | "F" | "0" => Some(false),
                _ => None,
            },
            MetaValue::Null => None,
        }
    }
}

impl fmt::Display for MetaValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetaValue::Null => write!(f, "NULL"),
            MetaValue::Bool(b) => write!(f, "{}", b),
            MetaValue::Int(i) => write!(f, "{}", i),
            MetaValue::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for MetaValue {
    fn from(v: &str) -> Self {
        MetaValue::Text(v.to_string())
    }
}

impl From<String> for MetaValue {
    fn from(v: String) -> Self {
        MetaValue::Text(v)
    }
}

impl From<i64> for MetaValue {
    fn from(v: i64) -> Self {
        MetaValue::Int(v)
    }
}

impl From<i32> for MetaValue {
    fn from(v: i32) -> Self {
        MetaValue::Int(i64::from(v))
    }
}

impl From<bool> for MetaValue {
    fn from(v: bool) -> Self {
        MetaValue::Bool(v)
    }
}

impl<T: Into<MetaValue>> From<Option<T>> for MetaValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(MetaValue::Null)
    }
}

/// One row of a metadata result set.
#[derive(Debug, Clone, PartialEq)]
pub struct MetadataRow {
    /// Lower-cased labels, shared by all rows of a result set.
    labels: Arc<[String]>,
    values: Vec<MetaValue>,
}

impl MetadataRow {
    /// Build a row from shared labels. Labels must already be lower-cased;
    /// use [`MetadataRow::labels`] to prepare them.
    pub fn new(labels: Arc<[String]>, values: Vec<MetaValue>) -> Self {
        Self { labels, values }
    }

    /// Lower-case a driver's column labels for sharing across rows.
    pub fn labels<S: AsRef<str>>(names: &[S]) -> Arc<[String]> {
        names
            .iter()
            .map(|n| n.as_ref().to_lowercase())
            .collect::<Vec<_>>()
            .into()
    }

    /// Convenience constructor from label/value pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<MetaValue>,
    {
        let (labels, values): (Vec<String>, Vec<MetaValue>) = pairs
            .into_iter()
            .map(|(k, v)| (k.as_ref().to_lowercase(), v.into()))
            .unzip();
        Self {
            labels: labels.into(),
            values,
        }
    }

    /// Raw value, `None` if the driver did not return the label.
    pub fn get(&self, label: &str) -> Option<&MetaValue> {
        let label = label.to_lowercase();
        self.labels
            .iter()
            .position(|l| *l == label)
            .and_then(|i| self.values.get(i))
    }

    /// Label/value pairs in column order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &MetaValue)> {
        self.labels.iter().map(String::as_str).zip(self.values.iter())
    }

    pub fn has(&self, label: &str) -> bool {
        self.get(label).is_some()
    }

    /// Non-empty text, `None` for missing, null, or blank values.
    pub fn string(&self, label: &str) -> Option<String> {
        self.get(label)
            .and_then(MetaValue::as_text)
            .filter(|s| !s.trim().is_empty())
    }

    pub fn text(&self, label: &str) -> Loaded<String> {
        self.loaded(label, MetaValue::as_text)
    }

    pub fn int(&self, label: &str) -> Loaded<i64> {
        self.loaded(label, MetaValue::as_int)
    }

    pub fn flag(&self, label: &str) -> Loaded<bool> {
        self.loaded(label, MetaValue::as_flag)
    }

    fn loaded<T>(&self, label: &str, convert: impl FnOnce(&MetaValue) -> Option<T>) -> Loaded<T> {
        match self.get(label) {
            None => Loaded::NotRequested,
            Some(v) => Loaded::from_option(convert(v)),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_is_case_insensitive() {
        let row = MetadataRow::from_pairs([("TABLE_NAME", "orders")]);
        assert_eq!(row.string("table_name"), Some("orders".to_string()));
        assert!(row.has("Table_Name"));
    }

    #[test]
    fn test_missing_label_vs_null() {
        let row = MetadataRow::from_pairs([("remarks", MetaValue::Null)]);
        assert_eq!(row.text("remarks"), Loaded::Absent);
        assert_eq!(row.text("definition"), Loaded::NotRequested);
    }

    #[test]
    fn test_flag_spellings() {
        for (raw, expected) in [
            ("YES", true),
            ("no", false),
            ("Y", true),
            ("N", false),
            ("true", true),
            ("0", false),
        ] {
            let row = MetadataRow::from_pairs([("is_nullable", raw)]);
            assert_eq!(row.flag("is_nullable"), Loaded::Present(expected), "{}", raw);
        }
        let row = MetadataRow::from_pairs([("is_nullable", "maybe")]);
        assert_eq!(row.flag("is_nullable"), Loaded::Absent);
    }

    #[test]
    fn test_int_from_text_and_width() {
        let row = MetadataRow::from_pairs([
            ("key_seq", MetaValue::Text(" 2 ".into())),
            ("ordinal_position", MetaValue::Int(7)),
        ]);
        assert_eq!(row.int("key_seq"), Loaded::Present(2));
        assert_eq!(row.int("ordinal_position"), Loaded::Present(7));
    }

    #[test]
    fn test_blank_string_is_none() {
        let row = MetadataRow::from_pairs([("table_schem", "  ")]);
        assert_eq!(row.string("table_schem"), None);
    }
}
