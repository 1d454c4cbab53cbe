//! Identity-mapped object arenas shared by the builder and the frozen catalog.

use std::collections::HashMap;
use std::hash::Hash;

use serde::ser::{Serialize, SerializeSeq, Serializer};

use crate::core::schema::{
    Column, ColumnDataType, ColumnParent, ForeignKey, Index, Routine, Schema, SchemaId, Sequence,
    Synonym, Table, TableId,
};

/// Arena plus an index from identity key to position.
///
/// Positions double as object ids. Entries only disappear when a journal is
/// rolled back, and then only those appended after the journal began.
#[derive(Debug, Clone)]
pub(crate) struct IdentityMap<K, V> {
    index: HashMap<K, usize>,
    entries: Vec<V>,
    journal: Option<Journal<V>>,
}

/// Undo log for one phase: the arena length when it began, plus the first
/// pre-image of every older entry touched since.
#[derive(Debug, Clone)]
struct Journal<V> {
    base_len: usize,
    originals: HashMap<usize, V>,
}

impl<K, V> Default for IdentityMap<K, V> {
    fn default() -> Self {
        Self {
            index: HashMap::new(),
            entries: Vec::new(),
            journal: None,
        }
    }
}

impl<K: Hash + Eq, V> IdentityMap<K, V> {
    pub(crate) fn position(&self, key: &K) -> Option<usize> {
        self.index.get(key).copied()
    }

    /// Position of the entry for `key`, creating it first if absent.
    /// Returns `true` as the second element when the entry was created.
    pub(crate) fn get_or_insert_with(
        &mut self,
        key: K,
        create: impl FnOnce(usize) -> V,
    ) -> (usize, bool) {
        if let Some(pos) = self.index.get(&key) {
            return (*pos, false);
        }
        let pos = self.entries.len();
        self.entries.push(create(pos));
        self.index.insert(key, pos);
        (pos, true)
    }
}

impl<K, V> IdentityMap<K, V> {
    pub(crate) fn get(&self, pos: usize) -> Option<&V> {
        self.entries.get(pos)
    }

    pub(crate) fn iter(&self) -> std::slice::Iter<'_, V> {
        self.entries.iter()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Older entries whose pre-image the open journal holds.
    pub(crate) fn touched(&self) -> usize {
        self.journal.as_ref().map_or(0, |j| j.originals.len())
    }

    /// Start recording changes. Replaces any journal still open.
    pub(crate) fn begin_journal(&mut self) {
        self.journal = Some(Journal {
            base_len: self.entries.len(),
            originals: HashMap::new(),
        });
    }

    /// Keep every change made since [`IdentityMap::begin_journal`].
    pub(crate) fn commit_journal(&mut self) {
        self.journal = None;
    }

    /// Drop entries appended since the journal began and restore the
    /// pre-images of older ones.
    pub(crate) fn rollback_journal(&mut self) {
        let Some(journal) = self.journal.take() else {
            return;
        };
        let base_len = journal.base_len;
        self.entries.truncate(base_len);
        self.index.retain(|_, pos| *pos < base_len);
        for (pos, original) in journal.originals {
            if let Some(entry) = self.entries.get_mut(pos) {
                *entry = original;
            }
        }
    }
}

impl<K, V: Clone> IdentityMap<K, V> {
    pub(crate) fn get_mut(&mut self, pos: usize) -> Option<&mut V> {
        self.record(pos);
        self.entries.get_mut(pos)
    }

    pub(crate) fn iter_mut(&mut self) -> std::slice::IterMut<'_, V> {
        if let Some(len) = self.journal.as_ref().map(|j| j.base_len) {
            for pos in 0..len {
                self.record(pos);
            }
        }
        self.entries.iter_mut()
    }

    fn record(&mut self, pos: usize) {
        let Some(journal) = self.journal.as_mut() else {
            return;
        };
        if pos >= journal.base_len || journal.originals.contains_key(&pos) {
            return;
        }
        if let Some(entry) = self.entries.get(pos) {
            journal.originals.insert(pos, entry.clone());
        }
    }
}

impl<K, V: PartialEq> PartialEq for IdentityMap<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl<K, V: Serialize> Serialize for IdentityMap<K, V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.entries.len()))?;
        for entry in &self.entries {
            seq.serialize_element(entry)?;
        }
        seq.end()
    }
}

/// Normalized `(catalog, schema)`.
pub(crate) type SchemaKey = (Option<String>, Option<String>);

/// All catalog objects, keyed by normalized identity within their scope.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub(crate) struct ObjectStore {
    pub(crate) schemas: IdentityMap<SchemaKey, Schema>,
    pub(crate) data_types: IdentityMap<(Option<SchemaId>, String), ColumnDataType>,
    pub(crate) tables: IdentityMap<(SchemaId, String), Table>,
    pub(crate) columns: IdentityMap<(ColumnParent, String), Column>,
    pub(crate) indexes: IdentityMap<(TableId, String), Index>,
    pub(crate) foreign_keys: IdentityMap<(TableId, String), ForeignKey>,
    pub(crate) routines: IdentityMap<(SchemaId, String), Routine>,
    pub(crate) sequences: IdentityMap<(SchemaId, String), Sequence>,
    pub(crate) synonyms: IdentityMap<(SchemaId, String), Synonym>,
}

macro_rules! each_map {
    ($store:expr, $method:ident) => {{
        $store.schemas.$method();
        $store.data_types.$method();
        $store.tables.$method();
        $store.columns.$method();
        $store.indexes.$method();
        $store.foreign_keys.$method();
        $store.routines.$method();
        $store.sequences.$method();
        $store.synonyms.$method();
    }};
}

impl ObjectStore {
    pub(crate) fn begin_journal(&mut self) {
        each_map!(self, begin_journal)
    }

    pub(crate) fn commit_journal(&mut self) {
        each_map!(self, commit_journal)
    }

    pub(crate) fn rollback_journal(&mut self) {
        each_map!(self, rollback_journal)
    }

    /// Total pre-images held by the open journals.
    pub(crate) fn touched(&self) -> usize {
        self.schemas.touched()
            + self.data_types.touched()
            + self.tables.touched()
            + self.columns.touched()
            + self.indexes.touched()
            + self.foreign_keys.touched()
            + self.routines.touched()
            + self.sequences.touched()
            + self.synonyms.touched()
    }
}
