use super::{KvsEngine, Record};
use crate::error::{KvsError, Result};
use tracing::debug;

/// A fixed number of slots scanned linearly.
///
/// Records are placed in the first free slot, a deletion leaves an empty slot (tombstone) behind
/// that the next insert can reuse. Every insert scans all slots for a duplicate key first.
#[derive(Debug)]
pub struct ArrayStore {
    // one slot per unit of capacity, `None` marks a free slot
    slots: Vec<Option<Record>>,

    // number of occupied slots
    count: usize,
}

impl ArrayStore {
    /// creates an empty `ArrayStore` able to hold `capacity` records
    pub fn new(capacity: usize) -> Self {
        ArrayStore {
            slots: vec![None; capacity],
            count: 0,
        }
    }

    /// returns the index of the slot holding `key`
    fn position(&self, key: &str) -> Option<usize> {
        self.slots
            .iter()
            .position(|slot| matches!(slot, Some(record) if record.key == key))
    }
}

impl KvsEngine for ArrayStore {
    fn capacity(&self) -> usize {
        self.slots.len()
    }

    fn len(&self) -> usize {
        self.count
    }

    fn get(&self, key: &str) -> Option<&str> {
        self.position(key)
            .and_then(|idx| self.slots[idx].as_ref())
            .map(|record| record.value.as_str())
    }

    fn insert(&mut self, key: String, value: String) -> Result<()> {
        if self.position(&key).is_some() {
            return Err(KvsError::KeyExists);
        }

        match self.slots.iter_mut().find(|slot| slot.is_none()) {
            Some(slot) => {
                *slot = Some(Record { key, value });
                self.count += 1;
                Ok(())
            }
            None => {
                debug!(capacity = self.slots.len(), "array store rejected {}", &key);
                Err(KvsError::StoreFull)
            }
        }
    }

    fn update(&mut self, key: &str, value: String) -> Result<String> {
        let idx = self.position(key).ok_or(KvsError::KeyNotFound)?;
        match self.slots[idx].as_mut() {
            Some(record) => Ok(std::mem::replace(&mut record.value, value)),
            None => Err(KvsError::KeyNotFound),
        }
    }

    fn remove(&mut self, key: &str) -> Result<String> {
        let idx = self.position(key).ok_or(KvsError::KeyNotFound)?;
        let record = self.slots[idx].take().ok_or(KvsError::KeyNotFound)?;
        self.count -= 1;
        Ok(record.value)
    }

    fn iter(&self) -> Box<dyn Iterator<Item = (&str, &str)> + '_> {
        Box::new(
            self.slots
                .iter()
                .flatten()
                .map(|record| (record.key.as_str(), record.value.as_str())),
        )
    }

    fn clear(&mut self) {
        self.slots.iter_mut().for_each(|slot| *slot = None);
        self.count = 0;
    }
}
