//! This module provides the three fixed-capacity backing structures used by the [`KvStore`]:
//! an [`ArrayStore`], a chained [`HashStore`] and an arena based [`RbTreeStore`].
//!
//! They all implement the [`KvsEngine`] trait, so the router never needs to know how a structure
//! lays out its records. Each structure owns its records and its capacity; nothing is shared
//! between structures.
//!
//! [`KvStore`]: crate::KvStore
use serde::{Deserialize, Serialize};

use crate::Result;

/// A trait for the basic functionality of a fixed-capacity key/value storage structure
///
/// Implementations are not synchronized, callers wrap each instance in its own lock.
pub trait KvsEngine: Send + Sync + 'static {
    /// the maximum number of live records, fixed at construction
    fn capacity(&self) -> usize;

    /// the number of live records
    fn len(&self) -> usize;

    /// returns `true` if the structure holds no records
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// returns `true` if no further key can be inserted
    fn is_full(&self) -> bool {
        self.len() >= self.capacity()
    }

    /// the number of records that can still be inserted
    fn remaining(&self) -> usize {
        self.capacity().saturating_sub(self.len())
    }

    /// Gets the value associated with the given `key`
    ///
    /// Returns `None` if the given `key` does not exist.
    fn get(&self, key: &str) -> Option<&str>;

    /// returns `true` if a record for `key` is live
    fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// inserts a new record
    ///
    /// # Errors
    ///
    /// Returns `KvsError::KeyExists` if `key` is already present (the stored value is left
    /// untouched) and `KvsError::StoreFull` if the structure is at capacity.
    fn insert(&mut self, key: String, value: String) -> Result<()>;

    /// replaces the value of an existing record, returning the previous value
    ///
    /// # Errors
    ///
    /// Returns `KvsError::KeyNotFound` if the given `key` is not found.
    fn update(&mut self, key: &str, value: String) -> Result<String>;

    /// Removes the given `key` (and associated value) from the store, returning the value
    ///
    /// # Errors
    ///
    /// Returns `KvsError::KeyNotFound` if the given `key` is not found.
    fn remove(&mut self, key: &str) -> Result<String>;

    /// a lazy iterator over every live record.
    ///
    /// Ordering is structure specific: slot order for the array, bucket order for the hash
    /// table and ascending key order for the red-black tree.
    fn iter(&self) -> Box<dyn Iterator<Item = (&str, &str)> + '_>;

    /// drops every record, the capacity is unchanged
    fn clear(&mut self);
}

/// A key/value pair held by a backing structure
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Record {
    /// the key, unique within its structure
    pub key: String,
    /// the opaque value
    pub value: String,
}

impl Record {
    /// builds a new `Record`
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Record {
            key: key.into(),
            value: value.into(),
        }
    }
}

impl From<(&str, &str)> for Record {
    fn from((key, value): (&str, &str)) -> Self {
        Record::new(key, value)
    }
}

mod array;
mod hash;
mod rbtree;

pub use self::array::ArrayStore;
pub use self::hash::HashStore;
pub use self::rbtree::{Color, Range, RbTreeStore};
