use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{KvsError, Result};

/// default number of records each structure can hold
pub const DEFAULT_CAPACITY: usize = 1024;

/// largest capacity or bucket count a structure may be built with
///
/// The array and the hash table allocate their slots and buckets up front.
pub const MAX_CAPACITY: usize = 1 << 24;

/// Construction time configuration of a [`KvStore`](crate::KvStore).
///
/// Every field is optional when deserialized; a missing `hash_buckets` follows the hash capacity.
/// ```json
/// { "array_capacity": 16, "rbtree_capacity": 4096 }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// capacity of the array structure
    pub array_capacity: usize,
    /// capacity of the hash structure
    pub hash_capacity: usize,
    /// capacity of the red-black tree structure
    pub rbtree_capacity: usize,
    /// number of chains in the hash table, `None` uses one bucket per unit of capacity
    pub hash_buckets: Option<usize>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            array_capacity: DEFAULT_CAPACITY,
            hash_capacity: DEFAULT_CAPACITY,
            rbtree_capacity: DEFAULT_CAPACITY,
            hash_buckets: None,
        }
    }
}

impl StoreConfig {
    /// a configuration giving every structure the same `capacity`
    pub fn uniform(capacity: usize) -> Self {
        StoreConfig {
            array_capacity: capacity,
            hash_capacity: capacity,
            rbtree_capacity: capacity,
            hash_buckets: None,
        }
    }

    /// reads a JSON configuration file
    ///
    /// # Errors
    /// IO Errors if the file could not be read, Serde errors if it is not a valid configuration
    pub fn from_file(path: &Path) -> Result<StoreConfig> {
        let contents = fs::read_to_string(path)?;
        let config: StoreConfig = serde_json::from_str(&contents)?;
        Ok(config)
    }

    /// the bucket count the hash structure will be built with
    pub fn buckets(&self) -> usize {
        self.hash_buckets.unwrap_or(self.hash_capacity)
    }

    /// checks that every capacity and the bucket count lie in `1..=MAX_CAPACITY`
    ///
    /// # Errors
    /// returns [`KvsError::Config`] naming the offending field
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("array_capacity", self.array_capacity),
            ("hash_capacity", self.hash_capacity),
            ("rbtree_capacity", self.rbtree_capacity),
            ("hash_buckets", self.buckets()),
        ];
        for (name, value) in fields.iter() {
            if *value == 0 {
                return Err(KvsError::Config(format!("{} must be positive", name)));
            }
            if *value > MAX_CAPACITY {
                return Err(KvsError::Config(format!(
                    "{} must be at most {}, got {}",
                    name, MAX_CAPACITY, value
                )));
            }
        }
        Ok(())
    }
}
