#![deny(missing_docs)]
//! Fixed-capacity, in-memory key-value stores that map [`String`] keys to [`String`] values.
//!
//! Three backing structures are active side by side, each with its own capacity:
//!
//! - an [`ArrayStore`]: a fixed number of slots, scanned linearly
//! - a [`HashStore`]: a separately chained hash table (FNV-1a hashing)
//! - an [`RbTreeStore`]: a red-black tree kept in an index based arena, iterated in key order
//!
//! All of them implement the [`KvsEngine`] trait. The [`KvStore`] routes commands to them.
//!
//! ## Supported Operations
//! A [`Request`] carries a verb, a key, an optional value and an optional target:
//!
//! - `SET` insert a key/value pair, `EXIST` if the key is present, `FULL` at capacity
//! - `GET` a value, `NO_EXIST` if the key is absent
//! - `DEL` a key/value pair, `NO_EXIST` if the key is absent
//! - `UPDATE` (or `MOD`) the value of an existing key, `NO_EXIST` if the key is absent
//! - `EXIST` probe a key without touching it
//!
//! The verb alone addresses the array. An `R` prefix (`RSET`, `RGET`, ...) addresses the
//! red-black tree and an `H` prefix (`HSET`, `HGET`, ...) the hash table; the `target` field can
//! name a structure explicitly. Malformed requests come back as `ERROR`. See [`Status`] for the
//! complete list of outcomes.
//!
//! ## Stats
//! [`KvStore::stats`] reports `count`, `remaining` and `max` for every structure. Each
//! structure's numbers are read under that structure's lock, so they are always consistent with
//! each other.
//!
//! ## Concurrency
//! Every structure is guarded by its own reader/writer lock. Mutations take the write lock, reads,
//! stats and scans take the read lock. The [`CommandExecutor`] runs batches of requests on a
//! [`thread_pool`].
//!
//! ## kvstores executable
//! The `kvstores` binary builds a store from command line options (or a JSON
//! [`StoreConfig`] file) and runs command lines such as `RSET user:1 alice` against it, either
//! one after another (`exec`) or concurrently from a script file (`replay`).
//!
//! [`String`]: https://doc.rust-lang.org/std/string/struct.String.html

pub use command::{Command, Request, Response, Stats, Status, StoreStats, Target};
pub use config::{StoreConfig, DEFAULT_CAPACITY, MAX_CAPACITY};
pub use engine::{ArrayStore, Color, HashStore, KvsEngine, Range, RbTreeStore, Record};
pub use error::{KvsError, Result};
pub use executor::CommandExecutor;
pub use kvstore::KvStore;
pub use thread_pool::{RayonThreadPool, SharedQueueThreadPool, ThreadPool};

mod command;
mod config;
mod engine;
mod error;
mod executor;
mod kvstore;
pub mod thread_pool;
