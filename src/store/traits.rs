//! Keyed byte store trait

use crate::Result;
use std::sync::Arc;

/// A mapping from byte-string keys to byte-string values
///
/// Keys are compared by exact byte content. Methods take `&self`;
/// implementations use interior mutability so one store can back several
/// trees at once.
pub trait KeyValueStore: Send + Sync {
    /// Insert or overwrite the value for `key`
    fn set(&self, key: &[u8], value: &[u8]) -> Result<()>;

    /// Get the value for `key`, or `None` if it was never set or was deleted
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Check whether `key` is present. Agrees with `get`.
    fn has(&self, key: &[u8]) -> Result<bool> {
        Ok(self.get(key)?.is_some())
    }

    /// Remove `key`, returning whether an entry existed
    fn delete(&self, key: &[u8]) -> Result<bool>;

    /// Remove every entry
    fn clear(&self) -> Result<()>;

    /// All keys currently present, in byte order
    fn keys(&self) -> Result<Vec<Vec<u8>>>;

    /// Number of entries
    fn len(&self) -> Result<usize> {
        Ok(self.keys()?.len())
    }

    fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for &S {
    fn set(&self, key: &[u8], value: &[u8]) -> Result<()> {
        (**self).set(key, value)
    }

    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        (**self).get(key)
    }

    fn has(&self, key: &[u8]) -> Result<bool> {
        (**self).has(key)
    }

    fn delete(&self, key: &[u8]) -> Result<bool> {
        (**self).delete(key)
    }

    fn clear(&self) -> Result<()> {
        (**self).clear()
    }

    fn keys(&self) -> Result<Vec<Vec<u8>>> {
        (**self).keys()
    }

    fn len(&self) -> Result<usize> {
        (**self).len()
    }
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for Arc<S> {
    fn set(&self, key: &[u8], value: &[u8]) -> Result<()> {
        (**self).set(key, value)
    }

    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        (**self).get(key)
    }

    fn has(&self, key: &[u8]) -> Result<bool> {
        (**self).has(key)
    }

    fn delete(&self, key: &[u8]) -> Result<bool> {
        (**self).delete(key)
    }

    fn clear(&self) -> Result<()> {
        (**self).clear()
    }

    fn keys(&self) -> Result<Vec<Vec<u8>>> {
        (**self).keys()
    }

    fn len(&self) -> Result<usize> {
        (**self).len()
    }
}
