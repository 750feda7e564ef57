use super::{KvsEngine, Record};
use crate::error::{KvsError, Result};
use tracing::debug;

// 64-bit FNV-1a parameters
const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Computes the 64-bit FNV-1a hash of the bytes of `key`.
///
/// The hash is deterministic across runs and platforms, so a key always lands in the same
/// bucket for a given bucket count.
pub fn fnv1a_hash(key: &str) -> u64 {
    key.bytes().fold(FNV_OFFSET_BASIS, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(FNV_PRIME)
    })
}

/// A separately chained hash table with a fixed bucket count.
///
/// The capacity bounds the number of live records and is independent of the bucket count;
/// chains simply grow longer once there are more records than buckets.
#[derive(Debug)]
pub struct HashStore {
    buckets: Vec<Vec<Record>>,
    capacity: usize,
    count: usize,
}

impl HashStore {
    /// creates a `HashStore` holding at most `capacity` records spread over `buckets` chains.
    ///
    /// A bucket count of zero is bumped to one.
    pub fn new(capacity: usize, buckets: usize) -> Self {
        HashStore {
            buckets: vec![Vec::new(); buckets.max(1)],
            capacity,
            count: 0,
        }
    }

    /// creates a `HashStore` with one bucket per unit of capacity
    pub fn with_capacity(capacity: usize) -> Self {
        HashStore::new(capacity, capacity)
    }

    /// the number of chains in the table
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// the length of the longest chain
    pub fn longest_chain(&self) -> usize {
        self.buckets.iter().map(Vec::len).max().unwrap_or(0)
    }

    fn bucket_index(&self, key: &str) -> usize {
        (fnv1a_hash(key) % self.buckets.len() as u64) as usize
    }

    fn find(&self, key: &str) -> Option<&Record> {
        self.buckets[self.bucket_index(key)]
            .iter()
            .find(|record| record.key == key)
    }
}

impl KvsEngine for HashStore {
    fn capacity(&self) -> usize {
        self.capacity
    }

    fn len(&self) -> usize {
        self.count
    }

    fn get(&self, key: &str) -> Option<&str> {
        self.find(key).map(|record| record.value.as_str())
    }

    fn insert(&mut self, key: String, value: String) -> Result<()> {
        let idx = self.bucket_index(&key);
        if self.buckets[idx].iter().any(|record| record.key == key) {
            return Err(KvsError::KeyExists);
        }
        if self.count >= self.capacity {
            debug!(capacity = self.capacity, "hash store rejected {}", &key);
            return Err(KvsError::StoreFull);
        }

        self.buckets[idx].push(Record { key, value });
        self.count += 1;
        Ok(())
    }

    fn update(&mut self, key: &str, value: String) -> Result<String> {
        let idx = self.bucket_index(key);
        let record = self.buckets[idx]
            .iter_mut()
            .find(|record| record.key == key)
            .ok_or(KvsError::KeyNotFound)?;
        Ok(std::mem::replace(&mut record.value, value))
    }

    fn remove(&mut self, key: &str) -> Result<String> {
        let idx = self.bucket_index(key);
        let chain = &mut self.buckets[idx];
        let pos = chain
            .iter()
            .position(|record| record.key == key)
            .ok_or(KvsError::KeyNotFound)?;
        let record = chain.swap_remove(pos);
        self.count -= 1;
        Ok(record.value)
    }

    fn iter(&self) -> Box<dyn Iterator<Item = (&str, &str)> + '_> {
        Box::new(
            self.buckets
                .iter()
                .flatten()
                .map(|record| (record.key.as_str(), record.value.as_str())),
        )
    }

    fn clear(&mut self) {
        self.buckets.iter_mut().for_each(Vec::clear);
        self.count = 0;
    }
}
