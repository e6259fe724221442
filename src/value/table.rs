/*!
 * Table
 * Shared aggregate container used for both maps and sequences
 */

use super::{Realm, Value};
use crate::core::id::ValueId;
use ahash::RandomState;
use indexmap::IndexMap;
use parking_lot::RwLock;
use std::sync::{Arc, Weak};

type Entries = IndexMap<Value, Value, RandomState>;

/// Backing storage of a table
pub struct TableCell {
    realm: Realm,
    entries: RwLock<Entries>,
}

/// Reference-counted handle to a table
///
/// Cloning shares the same table. Insertion order is preserved so that
/// enumeration and structural copies are deterministic.
#[derive(Clone)]
pub struct Table(Arc<TableCell>);

impl Table {
    /// Create an empty host-realm table
    pub fn new() -> Self {
        Self::with_realm(Realm::Host)
    }

    pub fn with_realm(realm: Realm) -> Self {
        Self(Arc::new(TableCell {
            realm,
            entries: RwLock::new(Entries::default()),
        }))
    }

    /// Build a host-realm table from key/value pairs
    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: Into<Value>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        let table = Self::new();
        for (k, v) in pairs {
            table.set(k, v);
        }
        table
    }

    /// Build a host-realm sequence with 1-based integer keys
    pub fn sequence<V, I>(items: I) -> Self
    where
        V: Into<Value>,
        I: IntoIterator<Item = V>,
    {
        let table = Self::new();
        for (i, v) in items.into_iter().enumerate() {
            table.set(i as i64 + 1, v);
        }
        table
    }

    pub fn realm(&self) -> Realm {
        self.0.realm
    }

    pub fn id(&self) -> ValueId {
        ValueId::of(&self.0)
    }

    pub fn ptr_eq(&self, other: &Table) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Value stored under `key`, `Nil` when absent
    pub fn get(&self, key: impl Into<Value>) -> Value {
        let key = key.into();
        self.0.entries.read().get(&key).cloned().unwrap_or_default()
    }

    /// Store `value` under `key`; storing `Nil` removes the key
    pub fn set(&self, key: impl Into<Value>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();
        let mut entries = self.0.entries.write();
        if value.is_nil() {
            entries.shift_remove(&key);
        } else {
            entries.insert(key, value);
        }
    }

    pub fn contains_key(&self, key: impl Into<Value>) -> bool {
        self.0.entries.read().contains_key(&key.into())
    }

    pub fn len(&self) -> usize {
        self.0.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.entries.read().is_empty()
    }

    /// Snapshot of the keys in insertion order
    pub fn keys(&self) -> Vec<Value> {
        self.0.entries.read().keys().cloned().collect()
    }

    /// Snapshot of the entries in insertion order
    ///
    /// The lock is released before returning, so callers may mutate the
    /// table (or tables reachable from it) while walking the snapshot.
    pub fn entries(&self) -> Vec<(Value, Value)> {
        self.0
            .entries
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    pub(crate) fn downgrade(&self) -> Weak<TableCell> {
        Arc::downgrade(&self.0)
    }

    pub(crate) fn from_cell(cell: Arc<TableCell>) -> Self {
        Self(cell)
    }
}

impl Default for Table {
    fn default() -> Self {
        Self::new()
    }
}
