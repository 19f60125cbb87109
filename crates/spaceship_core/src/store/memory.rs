//! In-memory key-value adapter.

use super::{KeyValueStore, StoreError, StoreResult};
use std::cell::{Ref, RefCell, RefMut};
use std::collections::{BTreeSet, HashMap};

/// Single-threaded in-memory store.
///
/// Records and sets live in separate namespaces, so one key can hold both.
/// A call made while the same map is already borrowed fails with
/// `StoreError::Unavailable` instead of panicking.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RefCell<HashMap<String, Vec<u8>>>,
    sets: RefCell<HashMap<String, BTreeSet<String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of plain records.
    pub fn record_count(&self) -> usize {
        self.records.borrow().len()
    }

    /// Number of non-empty sets.
    pub fn set_count(&self) -> usize {
        self.sets.borrow().len()
    }

    /// All record and set keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: BTreeSet<String> = self.records.borrow().keys().cloned().collect();
        keys.extend(self.sets.borrow().keys().cloned());
        keys.into_iter().collect()
    }
}

fn read<'a, T>(cell: &'a RefCell<T>, key: &str) -> StoreResult<Ref<'a, T>> {
    cell.try_borrow()
        .map_err(|_| StoreError::Unavailable(format!("`{key}` is already in use")))
}

fn write<'a, T>(cell: &'a RefCell<T>, key: &str) -> StoreResult<RefMut<'a, T>> {
    cell.try_borrow_mut()
        .map_err(|_| StoreError::Unavailable(format!("`{key}` is already in use")))
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        Ok(read(&self.records, key)?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &[u8]) -> StoreResult<()> {
        write(&self.records, key)?.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn set_add(&self, key: &str, member: &str) -> StoreResult<()> {
        write(&self.sets, key)?
            .entry(key.to_string())
            .or_default()
            .insert(member.to_string());
        Ok(())
    }

    fn set_remove(&self, key: &str, member: &str) -> StoreResult<()> {
        let mut sets = write(&self.sets, key)?;
        if let Some(members) = sets.get_mut(key) {
            members.remove(member);
            if members.is_empty() {
                sets.remove(key);
            }
        }
        Ok(())
    }

    fn set_members(&self, key: &str) -> StoreResult<BTreeSet<String>> {
        Ok(read(&self.sets, key)?.get(key).cloned().unwrap_or_default())
    }
}
