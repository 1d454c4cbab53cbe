//! Partial-load state for catalog fields.
//!
//! Every field that depends on a retrieval phase is stored as [`Loaded<T>`],
//! which keeps "never fetched" apart from "fetched and empty".

use serde::{Deserialize, Serialize};

use crate::error::NotLoaded;

/// Tri-state value of a metadata field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
pub enum Loaded<T> {
    /// The phase that populates this field did not run, or the driver did not
    /// report the column.
    NotRequested,
    /// The phase ran and the database reported no value.
    Absent,
    /// The phase ran and produced a value.
    Present(T),
}

impl<T> Default for Loaded<T> {
    fn default() -> Self {
        Loaded::NotRequested
    }
}

impl<T> Loaded<T> {
    /// `Present` for `Some`, `Absent` for `None`.
    pub fn from_option(value: Option<T>) -> Self {
        match value {
            Some(v) => Loaded::Present(v),
            None => Loaded::Absent,
        }
    }

    pub fn is_loaded(&self) -> bool {
        !matches!(self, Loaded::NotRequested)
    }

    pub fn is_present(&self) -> bool {
        matches!(self, Loaded::Present(_))
    }

    pub fn as_ref(&self) -> Loaded<&T> {
        match self {
            Loaded::NotRequested => Loaded::NotRequested,
            Loaded::Absent => Loaded::Absent,
            Loaded::Present(v) => Loaded::Present(v),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Loaded<U> {
        match self {
            Loaded::NotRequested => Loaded::NotRequested,
            Loaded::Absent => Loaded::Absent,
            Loaded::Present(v) => Loaded::Present(f(v)),
        }
    }

    /// The value if present, `None` if absent or not loaded.
    pub fn present(&self) -> Option<&T> {
        match self {
            Loaded::Present(v) => Some(v),
            _ => None,
        }
    }

    /// Checked read: `NotLoaded` when the field was never requested.
    pub fn value(&self, object: &str, field: &'static str) -> Result<Option<&T>, NotLoaded> {
        match self {
            Loaded::NotRequested => Err(NotLoaded::new(object, field)),
            Loaded::Absent => Ok(None),
            Loaded::Present(v) => Ok(Some(v)),
        }
    }

    /// Merge a newer observation. Last non-null wins; nothing ever moves a
    /// loaded field back to `NotRequested`.
    pub fn merge(&mut self, incoming: Loaded<T>) {
        match incoming {
            Loaded::Present(v) => *self = Loaded::Present(v),
            Loaded::Absent => {
                if !self.is_loaded() {
                    *self = Loaded::Absent;
                }
            }
            Loaded::NotRequested => {}
        }
    }

    /// Mark the field as fetched-and-empty if no phase touched it yet.
    pub fn settle_absent(&mut self) {
        if !self.is_loaded() {
            *self = Loaded::Absent;
        }
    }
}

impl<T: Default> Loaded<T> {
    /// Mutable access to the value, creating a default one first if needed.
    pub fn get_or_default(&mut self) -> &mut T {
        if !self.is_present() {
            *self = Loaded::Present(T::default());
        }
        match self {
            Loaded::Present(v) => v,
            _ => unreachable!("value was just set"),
        }
    }

    /// Mark the field as fetched with an empty value if no phase touched it yet.
    pub fn settle_empty(&mut self) {
        if !self.is_loaded() {
            *self = Loaded::Present(T::default());
        }
    }
}

/// Coarse load state of an object or category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadState {
    NotRequested,
    Partial,
    Complete,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_distinguishes_not_loaded_from_absent() {
        let missing: Loaded<String> = Loaded::NotRequested;
        let absent: Loaded<String> = Loaded::Absent;
        let present = Loaded::Present("orders".to_string());

        assert!(missing.value("public.t", "remarks").is_err());
        assert_eq!(absent.value("public.t", "remarks"), Ok(None));
        assert_eq!(
            present.value("public.t", "remarks"),
            Ok(Some(&"orders".to_string()))
        );
    }

    #[test]
    fn test_merge_last_non_null_wins() {
        let mut field = Loaded::Present(1);
        field.merge(Loaded::Absent);
        assert_eq!(field, Loaded::Present(1));
        field.merge(Loaded::NotRequested);
        assert_eq!(field, Loaded::Present(1));
        field.merge(Loaded::Present(2));
        assert_eq!(field, Loaded::Present(2));
    }

    #[test]
    fn test_merge_absent_over_not_requested() {
        let mut field: Loaded<i64> = Loaded::NotRequested;
        field.merge(Loaded::Absent);
        assert_eq!(field, Loaded::Absent);
    }

    #[test]
    fn test_settle() {
        let mut cols: Loaded<Vec<u32>> = Loaded::NotRequested;
        cols.settle_empty();
        assert_eq!(cols, Loaded::Present(vec![]));

        let mut pk: Loaded<u32> = Loaded::Present(3);
        pk.settle_absent();
        assert_eq!(pk, Loaded::Present(3));
    }

    #[test]
    fn test_get_or_default() {
        let mut cols: Loaded<Vec<u32>> = Loaded::Absent;
        cols.get_or_default().push(7);
        assert_eq!(cols, Loaded::Present(vec![7]));
    }
}
