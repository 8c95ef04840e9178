//! In-memory store

use super::KeyValueStore;
use crate::Result;
use parking_lot::RwLock;
use std::collections::HashMap;

/// A `HashMap`-backed store keyed by owned byte vectors
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<Vec<u8>, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn set(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.entries.write().insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn has(&self, key: &[u8]) -> Result<bool> {
        Ok(self.entries.read().contains_key(key))
    }

    fn delete(&self, key: &[u8]) -> Result<bool> {
        Ok(self.entries.write().remove(key).is_some())
    }

    fn clear(&self) -> Result<()> {
        self.entries.write().clear();
        Ok(())
    }

    fn keys(&self) -> Result<Vec<Vec<u8>>> {
        let mut keys: Vec<_> = self.entries.read().keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }

    fn len(&self) -> Result<usize> {
        Ok(self.entries.read().len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_get() {
        let store = MemoryStore::new();
        let key = [1u8, 2, 3, 4, 5, 6, 7, 8];
        let value = [255u8, 254, 253, 252];

        store.set(&key, &value).unwrap();
        assert_eq!(store.get(&key).unwrap(), Some(value.to_vec()));
    }

    #[test]
    fn test_missing_key_is_absent() {
        let store = MemoryStore::new();
        assert_eq!(store.get(&[9, 10, 11, 12]).unwrap(), None);
        assert!(!store.has(&[9, 10, 11, 12]).unwrap());
    }

    #[test]
    fn test_empty_value_is_not_absence() {
        let store = MemoryStore::new();
        store.set(b"k", b"").unwrap();

        assert_eq!(store.get(b"k").unwrap(), Some(Vec::new()));
        assert!(store.has(b"k").unwrap());
    }

    #[test]
    fn test_delete_is_idempotent() {
        let store = MemoryStore::new();
        store.set(&[1, 2, 3, 4], &[9, 10, 11, 12]).unwrap();

        assert!(store.delete(&[1, 2, 3, 4]).unwrap());
        assert!(!store.delete(&[1, 2, 3, 4]).unwrap());
        assert!(!store.has(&[1, 2, 3, 4]).unwrap());
        assert_eq!(store.get(&[1, 2, 3, 4]).unwrap(), None);
    }

    #[test]
    fn test_clear() {
        let store = MemoryStore::new();
        store.set(&[1, 2, 3, 4], &[5, 6, 7, 8]).unwrap();
        store.set(&[9, 10, 11, 12], &[13, 14, 15, 16]).unwrap();
        assert_eq!(store.len().unwrap(), 2);

        store.clear().unwrap();

        assert!(!store.has(&[1, 2, 3, 4]).unwrap());
        assert!(!store.has(&[9, 10, 11, 12]).unwrap());
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn test_keys_do_not_alias_by_string_form() {
        // "1,23" vs "12,3" would collide under a comma-joined string key
        let store = MemoryStore::new();
        store.set(&[1, 23], b"a").unwrap();
        store.set(&[12, 3], b"b").unwrap();

        assert_eq!(store.get(&[1, 23]).unwrap(), Some(b"a".to_vec()));
        assert_eq!(store.get(&[12, 3]).unwrap(), Some(b"b".to_vec()));
        assert_eq!(store.len().unwrap(), 2);
    }

    #[test]
    fn test_keys_sorted() {
        let store = MemoryStore::new();
        store.set(&[3], b"").unwrap();
        store.set(&[1], b"").unwrap();
        store.set(&[2, 0], b"").unwrap();

        assert_eq!(store.keys().unwrap(), vec![vec![1], vec![2, 0], vec![3]]);
    }
}
