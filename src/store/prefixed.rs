//! Key-prefix namespacing over a shared store

use super::KeyValueStore;
use crate::Result;

/// Width of the namespace prefix written in front of every key
pub const PREFIX_LEN: usize = 32;

/// A view of a store where every key is namespaced under a fixed-width
/// prefix derived from `namespace`
///
/// Lets several trees share one backing store. `clear` and `keys` only see
/// this view's own entries. Prefixes are the blake3 hash of the namespace,
/// so no namespace's keys can alias another's even when one namespace is a
/// prefix of the other.
pub struct PrefixedStore<S> {
    inner: S,
    namespace: Vec<u8>,
    prefix: [u8; PREFIX_LEN],
}

impl<S: KeyValueStore> PrefixedStore<S> {
    pub fn new(inner: S, namespace: impl Into<Vec<u8>>) -> Self {
        let namespace = namespace.into();
        let prefix = *blake3::hash(&namespace).as_bytes();
        PrefixedStore {
            inner,
            namespace,
            prefix,
        }
    }

    /// The namespace this view was created with
    pub fn namespace(&self) -> &[u8] {
        &self.namespace
    }

    /// The bytes actually prepended to keys in the inner store
    pub fn prefix(&self) -> &[u8; PREFIX_LEN] {
        &self.prefix
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner
    }

    fn full_key(&self, key: &[u8]) -> Vec<u8> {
        let mut full = Vec::with_capacity(self.prefix.len() + key.len());
        full.extend_from_slice(&self.prefix);
        full.extend_from_slice(key);
        full
    }
}

impl<S: KeyValueStore> KeyValueStore for PrefixedStore<S> {
    fn set(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.inner.set(&self.full_key(key), value)
    }

    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.inner.get(&self.full_key(key))
    }

    fn has(&self, key: &[u8]) -> Result<bool> {
        self.inner.has(&self.full_key(key))
    }

    fn delete(&self, key: &[u8]) -> Result<bool> {
        self.inner.delete(&self.full_key(key))
    }

    fn clear(&self) -> Result<()> {
        for key in self.inner.keys()? {
            if key.starts_with(&self.prefix) {
                self.inner.delete(&key)?;
            }
        }
        Ok(())
    }

    fn keys(&self) -> Result<Vec<Vec<u8>>> {
        Ok(self
            .inner
            .keys()?
            .into_iter()
            .filter_map(|k| k.strip_prefix(self.prefix.as_slice()).map(<[u8]>::to_vec))
            .collect())
    }
}
