use std::ops::Bound;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info, instrument, warn};

use crate::command::{Command, Request, Response, Stats, Status, StoreStats, Target};
use crate::config::StoreConfig;
use crate::engine::{ArrayStore, HashStore, KvsEngine, RbTreeStore, Record};
use crate::error::{KvsError, Result};

/// The router in front of the three backing structures.
///
/// A `KvStore` owns one [`ArrayStore`], one [`HashStore`] and one [`RbTreeStore`], all active at
/// the same time. Each structure sits behind its own reader/writer lock, so commands addressed to
/// different structures never contend, and no operation holds more than one lock at a time.
///
/// `KvStore` is a cheap handle: cloning it shares the same structures, which is how worker threads
/// get access to the store.
///
/// Scans and snapshots hold the read lock of their structure for the whole traversal, so they
/// never observe a half applied insert or delete.
#[derive(Debug, Clone)]
pub struct KvStore {
    inner: Arc<Stores>,
}

#[derive(Debug)]
struct Stores {
    array: RwLock<ArrayStore>,
    hash: RwLock<HashStore>,
    rbtree: RwLock<RbTreeStore>,
}

impl KvStore {
    /// creates the three structures described by `config`
    ///
    /// # Errors
    /// returns [`KvsError::Config`] if a capacity or the bucket count is zero
    pub fn new(config: &StoreConfig) -> Result<KvStore> {
        config.validate()?;
        info!(
            array = config.array_capacity,
            hash = config.hash_capacity,
            buckets = config.buckets(),
            rbtree = config.rbtree_capacity,
            "creating stores"
        );
        Ok(KvStore {
            inner: Arc::new(Stores {
                array: RwLock::new(ArrayStore::new(config.array_capacity)),
                hash: RwLock::new(HashStore::new(config.hash_capacity, config.buckets())),
                rbtree: RwLock::new(RbTreeStore::new(config.rbtree_capacity)),
            }),
        })
    }

    /// creates a store where every structure holds at most `capacity` records
    ///
    /// # Errors
    /// returns [`KvsError::Config`] if `capacity` is zero
    pub fn with_capacity(capacity: usize) -> Result<KvStore> {
        KvStore::new(&StoreConfig::uniform(capacity))
    }

    // runs `f` with shared access to one structure
    fn read<R>(&self, target: Target, f: impl FnOnce(&dyn KvsEngine) -> R) -> R {
        match target {
            Target::Array => f(&*self.inner.array.read()),
            Target::Hash => f(&*self.inner.hash.read()),
            Target::RbTree => f(&*self.inner.rbtree.read()),
        }
    }

    // runs `f` with exclusive access to one structure
    fn write<R>(&self, target: Target, f: impl FnOnce(&mut dyn KvsEngine) -> R) -> R {
        match target {
            Target::Array => f(&mut *self.inner.array.write()),
            Target::Hash => f(&mut *self.inner.hash.write()),
            Target::RbTree => f(&mut *self.inner.rbtree.write()),
        }
    }

    /// Validates and runs one request, always producing exactly one [`Response`].
    ///
    /// Responses to well formed commands carry the stats of every structure as of right after
    /// the command.
    #[instrument(skip(self, req), fields(cmd = %req.cmd))]
    pub fn execute(&self, req: &Request) -> Response {
        let (target, command) = match req.parse() {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!("rejected request: {}", e);
                return Response::new(Status::Error, e.to_string());
            }
        };
        debug!(%target, key = command.key(), mutation = command.is_mutation(), "applying");
        let response = self.apply(target, command);
        debug!(%target, status = %response.status);
        response.with_stats(self.stats())
    }

    /// runs an already validated command against `target`
    pub fn apply(&self, target: Target, command: Command) -> Response {
        let result = match command {
            Command::Set { key, value } => self
                .insert(target, key, value)
                .map(|()| Response::new(Status::Ok, "Set successfully")),
            Command::Get { key } => self
                .get(target, &key)
                .ok_or(KvsError::KeyNotFound)
                .map(Response::found),
            Command::Del { key } => self
                .remove(target, &key)
                .map(|_| Response::new(Status::Ok, "Deleted successfully")),
            Command::Update { key, value } => self
                .update(target, &key, value)
                .map(|_| Response::new(Status::Ok, "Modified successfully")),
            Command::Exist { key } => {
                if self.contains_key(target, &key) {
                    Ok(Response::new(Status::Exist, "Key exists"))
                } else {
                    Err(KvsError::KeyNotFound)
                }
            }
        };
        result.unwrap_or_else(|e| Response::from_error(&e, target))
    }

    /// inserts a new record into `target`
    ///
    /// # Errors
    /// `KvsError::KeyExists` if the key is present, `KvsError::StoreFull` if `target` is full
    pub fn insert(&self, target: Target, key: String, value: String) -> Result<()> {
        self.write(target, |store| store.insert(key, value))
    }

    /// returns a copy of the value stored for `key` in `target`
    pub fn get(&self, target: Target, key: &str) -> Option<String> {
        self.read(target, |store| store.get(key).map(String::from))
    }

    /// returns `true` if `key` is present in `target`
    pub fn contains_key(&self, target: Target, key: &str) -> bool {
        self.read(target, |store| store.contains_key(key))
    }

    /// replaces the value for `key` in `target`, returning the previous value
    ///
    /// # Errors
    /// `KvsError::KeyNotFound` if the key is absent
    pub fn update(&self, target: Target, key: &str, value: String) -> Result<String> {
        self.write(target, |store| store.update(key, value))
    }

    /// removes `key` from `target`, returning its value
    ///
    /// # Errors
    /// `KvsError::KeyNotFound` if the key is absent
    pub fn remove(&self, target: Target, key: &str) -> Result<String> {
        self.write(target, |store| store.remove(key))
    }

    /// drops every record of `target`
    pub fn clear(&self, target: Target) {
        self.write(target, |store| store.clear());
        info!(%target, "cleared");
    }

    /// count, remaining and max of one structure, read under a single lock acquisition
    pub fn stats_for(&self, target: Target) -> StoreStats {
        self.read(target, |store| StoreStats {
            count: store.len(),
            remaining: store.remaining(),
            max: store.capacity(),
        })
    }

    /// stats of all three structures
    pub fn stats(&self) -> Stats {
        Stats {
            array: self.stats_for(Target::Array),
            hash: self.stats_for(Target::Hash),
            rbtree: self.stats_for(Target::RbTree),
        }
    }

    /// A point-in-time copy of every record of `target`.
    ///
    /// Records of the red-black tree come back in ascending key order.
    pub fn snapshot(&self, target: Target) -> Vec<Record> {
        self.read(target, |store| store.iter().map(Record::from).collect())
    }

    /// Returns up to `limit` records of `target` that follow `start_after`.
    ///
    /// Pass the key of the last record of a page to fetch the next page. For the red-black tree
    /// pages follow ascending key order and a resumed scan starts at the first key greater than
    /// `start_after`, even if that key was deleted in the meantime. The array and the hash table
    /// resume after the record holding `start_after` and return nothing once it is gone.
    pub fn scan(&self, target: Target, start_after: Option<&str>, limit: usize) -> Vec<Record> {
        if target == Target::RbTree {
            let tree = self.inner.rbtree.read();
            let start = start_after.map_or(Bound::Unbounded, Bound::Excluded);
            return tree.range(start).take(limit).map(Record::from).collect();
        }

        self.read(target, |store| match start_after {
            None => store.iter().take(limit).map(Record::from).collect(),
            Some(after) => store
                .iter()
                .skip_while(|(key, _)| *key != after)
                .skip(1)
                .take(limit)
                .map(Record::from)
                .collect(),
        })
    }

    /// checks the red-black invariants of the tree structure, returning its black height
    ///
    /// # Errors
    /// returns [`KvsError::Corrupted`] if an invariant does not hold
    pub fn validate(&self) -> Result<usize> {
        self.inner.rbtree.read().validate()
    }
}
