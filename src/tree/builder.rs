//! Bottom-up tree construction

use super::manifest::Manifest;
use super::merkle::{require_digest, MerkleTree};
use super::PaddingPolicy;
use crate::hasher::{Blake3Hasher, NodeHasher};
use crate::model::{Digest, TreeShape};
use crate::store::KeyValueStore;
use crate::{Result, VERSION};
use tracing::{debug, trace, warn};

/// Builds Merkle trees into a key-value store
///
/// The builder holds only configuration; each build takes the store and the
/// blocks explicitly, so one builder can serve any number of independent
/// stores.
///
/// Build steps:
/// 1. pad the block list to a power-of-two leaf count
/// 2. write `hash(block)` under every leaf key
/// 3. for each level from the leaves up, read both children back from the
///    store and write `hash(left || right)` under the parent key
pub struct MerkleBuilder<H = Blake3Hasher> {
    hasher: H,
    padding: PaddingPolicy,
}

impl MerkleBuilder<Blake3Hasher> {
    /// Builder with BLAKE3 and zero-length padding
    pub fn new() -> Self {
        MerkleBuilder {
            hasher: Blake3Hasher,
            padding: PaddingPolicy::Empty,
        }
    }
}

impl Default for MerkleBuilder<Blake3Hasher> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: NodeHasher> MerkleBuilder<H> {
    pub fn with_hasher(hasher: H) -> Self {
        MerkleBuilder {
            hasher,
            padding: PaddingPolicy::Empty,
        }
    }

    /// Set the padding policy
    pub fn padding(mut self, padding: PaddingPolicy) -> Self {
        self.padding = padding;
        self
    }

    pub fn hasher(&self) -> &H {
        &self.hasher
    }

    pub fn padding_policy(&self) -> PaddingPolicy {
        self.padding
    }

    /// Build the tree over `blocks` into `store` and return the root digest
    pub fn build<S, B>(&self, store: &S, blocks: &[B]) -> Result<Digest>
    where
        S: KeyValueStore + ?Sized,
        B: AsRef<[u8]>,
    {
        Ok(self.build_tree(store, blocks)?.root())
    }

    /// Build the tree and return a handle on it.
    ///
    /// Zero blocks produce a one-leaf tree holding a single padding block.
    /// On failure, nodes already written stay in the store.
    pub fn build_tree<S, B>(&self, store: &S, blocks: &[B]) -> Result<MerkleTree>
    where
        S: KeyValueStore + ?Sized,
        B: AsRef<[u8]>,
    {
        let shape = TreeShape::for_blocks(blocks.len())?;
        let padding = shape.padding_count(blocks.len());
        debug!(
            blocks = blocks.len(),
            leaves = shape.leaf_count(),
            padding,
            hasher = self.hasher.name(),
            "building tree"
        );

        let mut root = self.write_leaves(store, &shape, blocks)?;

        for depth in (0..shape.max_depth()).rev() {
            let width = shape.level_width(depth);
            for index in 0..width {
                let left = self.child(store, &shape, depth + 1, 2 * index)?;
                let right = self.child(store, &shape, depth + 1, 2 * index + 1)?;

                let digest = self.hasher.hash_pair(&left, &right);
                let key = shape.node_key(depth, index)?;
                store.set(key.as_bytes(), digest.as_bytes())?;
                root = digest;
            }
            trace!(depth, width, "level written");
        }

        debug!(root = %root.short(), "tree built");
        Ok(MerkleTree::new(shape, root, blocks.len() as u64))
    }

    /// Build the tree and record a manifest so it can be reopened with
    /// [`MerkleTree::load`]
    pub fn build_with_manifest<S, B>(&self, store: &S, blocks: &[B]) -> Result<MerkleTree>
    where
        S: KeyValueStore + ?Sized,
        B: AsRef<[u8]>,
    {
        let tree = self.build_tree(store, blocks)?;
        self.manifest(&tree).save(store)?;
        Ok(tree)
    }

    /// Describe `tree` as built by this builder
    pub fn manifest(&self, tree: &MerkleTree) -> Manifest {
        Manifest {
            version: VERSION,
            block_count: tree.block_count(),
            leaf_count: tree.shape().leaf_count(),
            hasher: self.hasher.name().to_string(),
            hasher_fingerprint: self.hasher.fingerprint(),
            padding: self.padding,
            root: tree.root(),
        }
    }

    /// Write every leaf digest, returning the last one written
    fn write_leaves<S, B>(&self, store: &S, shape: &TreeShape, blocks: &[B]) -> Result<Digest>
    where
        S: KeyValueStore + ?Sized,
        B: AsRef<[u8]>,
    {
        let mut last = Digest::ZERO;
        for (index, block) in blocks.iter().enumerate() {
            last = self.hasher.hash(block.as_ref());
            let key = shape.leaf_key(index as u64)?;
            store.set(key.as_bytes(), last.as_bytes())?;
        }

        let first_pad = blocks.len() as u64;
        if first_pad < shape.leaf_count() {
            last = self.hasher.hash(&self.padding.block());
            for index in first_pad..shape.leaf_count() {
                let key = shape.leaf_key(index)?;
                store.set(key.as_bytes(), last.as_bytes())?;
            }
        }
        Ok(last)
    }

    fn child<S>(&self, store: &S, shape: &TreeShape, depth: u8, index: u64) -> Result<Digest>
    where
        S: KeyValueStore + ?Sized,
    {
        require_digest(store, shape, depth, index).inspect_err(|e| {
            if matches!(e, crate::Error::MissingChild { .. }) {
                warn!(depth, index, "child digest missing during aggregation");
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hasher::MockHasher;
    use crate::store::MemoryStore;
    use crate::Error;
    use parking_lot::Mutex;
    use std::collections::HashMap;

    fn h(data: &[u8]) -> Digest {
        Blake3Hasher.hash(data)
    }

    fn pair(l: Digest, r: Digest) -> Digest {
        Blake3Hasher.hash_pair(&l, &r)
    }

    #[test]
    fn test_single_block() {
        let store = MemoryStore::new();
        let root = MerkleBuilder::new().build(&store, &[b"b0"]).unwrap();

        assert_eq!(root, h(b"b0"));
        assert_eq!(store.len().unwrap(), 1);
    }

    #[test]
    fn test_two_blocks() {
        let store = MemoryStore::new();
        let root = MerkleBuilder::new().build(&store, &[b"b0", b"b1"]).unwrap();

        assert_eq!(root, pair(h(b"b0"), h(b"b1")));
        assert_eq!(store.len().unwrap(), 3);
    }

    #[test]
    fn test_three_blocks_padded_to_four() {
        let store = MemoryStore::new();
        let tree = MerkleBuilder::new()
            .build_tree(&store, &[b"b0", b"b1", b"b2"])
            .unwrap();

        let expected = pair(pair(h(b"b0"), h(b"b1")), pair(h(b"b2"), h(b"")));
        assert_eq!(tree.root(), expected);
        assert_eq!(tree.shape().leaf_count(), 4);
        assert_eq!(tree.leaf(&store, 3).unwrap(), Some(h(b"")));
        assert_eq!(store.len().unwrap(), 7);
    }

    #[test]
    fn test_zero_filled_padding() {
        let store = MemoryStore::new();
        let builder = MerkleBuilder::new().padding(PaddingPolicy::ZeroFilled { len: 32 });
        let root = builder.build(&store, &[b"b0", b"b1", b"b2"]).unwrap();

        let expected = pair(pair(h(b"b0"), h(b"b1")), pair(h(b"b2"), h(&[0u8; 32])));
        assert_eq!(root, expected);
    }

    #[test]
    fn test_empty_input_is_single_padding_leaf() {
        let store = MemoryStore::new();
        let blocks: [&[u8]; 0] = [];
        let tree = MerkleBuilder::new().build_tree(&store, &blocks).unwrap();

        assert_eq!(tree.root(), h(b""));
        assert_eq!(tree.shape().leaf_count(), 1);
        assert_eq!(tree.block_count(), 0);
    }

    #[test]
    fn test_injected_hasher_is_used() {
        let store = MemoryStore::new();
        let builder = MerkleBuilder::with_hasher(MockHasher);
        let root = builder.build(&store, &[b"b0", b"b1"]).unwrap();

        let expected = MockHasher.hash_pair(&MockHasher.hash(b"b0"), &MockHasher.hash(b"b1"));
        assert_eq!(root, expected);
        assert_ne!(root, pair(h(b"b0"), h(b"b1")));
    }

    #[test]
    fn test_boxed_hasher_builds() {
        let store = MemoryStore::new();
        let hasher: Box<dyn NodeHasher> = Box::new(Blake3Hasher);
        let root = MerkleBuilder::with_hasher(hasher).build(&store, &[b"b0"]).unwrap();
        assert_eq!(root, h(b"b0"));
    }

    /// Drops every write to one key, to starve the aggregation step
    struct LossyStore {
        inner: MemoryStore,
        lost: Vec<u8>,
    }

    impl KeyValueStore for LossyStore {
        fn set(&self, key: &[u8], value: &[u8]) -> Result<()> {
            if key == self.lost.as_slice() {
                return Ok(());
            }
            self.inner.set(key, value)
        }

        fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
            self.inner.get(key)
        }

        fn delete(&self, key: &[u8]) -> Result<bool> {
            self.inner.delete(key)
        }

        fn clear(&self) -> Result<()> {
            self.inner.clear()
        }

        fn keys(&self) -> Result<Vec<Vec<u8>>> {
            self.inner.keys()
        }
    }

    #[test]
    fn test_missing_child_is_reported() {
        let shape = TreeShape::for_blocks(4).unwrap();
        let store = LossyStore {
            inner: MemoryStore::new(),
            lost: shape.leaf_key(2).unwrap().into_bytes(),
        };

        let err = MerkleBuilder::new()
            .build(&store, &[b"a", b"b", b"c", b"d"])
            .unwrap_err();
        assert!(matches!(err, Error::MissingChild { depth: 2, index: 2 }));
        // Level 1 left node was written before the failure
        assert!(store.has(shape.node_key(1, 0).unwrap().as_bytes()).unwrap());
    }

    /// Fails every write once `budget` writes have succeeded
    struct FailingStore {
        inner: MemoryStore,
        budget: Mutex<usize>,
    }

    impl KeyValueStore for FailingStore {
        fn set(&self, key: &[u8], value: &[u8]) -> Result<()> {
            let mut budget = self.budget.lock();
            if *budget == 0 {
                return Err(Error::Store("disk full".into()));
            }
            *budget -= 1;
            self.inner.set(key, value)
        }

        fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
            self.inner.get(key)
        }

        fn delete(&self, key: &[u8]) -> Result<bool> {
            self.inner.delete(key)
        }

        fn clear(&self) -> Result<()> {
            self.inner.clear()
        }

        fn keys(&self) -> Result<Vec<Vec<u8>>> {
            self.inner.keys()
        }
    }

    #[test]
    fn test_store_failure_propagates_without_rollback() {
        let store = FailingStore {
            inner: MemoryStore::new(),
            budget: Mutex::new(5),
        };

        let err = MerkleBuilder::new()
            .build(&store, &[b"a", b"b", b"c", b"d"])
            .unwrap_err();
        assert!(err.is_store_failure());
        assert_eq!(err.to_string(), "Store error: disk full");
        assert_eq!(store.inner.len().unwrap(), 5);
    }

    /// Records the order of operations
    #[derive(Default)]
    struct RecordingStore {
        inner: MemoryStore,
        log: Mutex<Vec<(char, Vec<u8>)>>,
    }

    impl KeyValueStore for RecordingStore {
        fn set(&self, key: &[u8], value: &[u8]) -> Result<()> {
            self.log.lock().push(('s', key.to_vec()));
            self.inner.set(key, value)
        }

        fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
            self.log.lock().push(('g', key.to_vec()));
            self.inner.get(key)
        }

        fn delete(&self, key: &[u8]) -> Result<bool> {
            self.inner.delete(key)
        }

        fn clear(&self) -> Result<()> {
            self.inner.clear()
        }

        fn keys(&self) -> Result<Vec<Vec<u8>>> {
            self.inner.keys()
        }
    }

    #[test]
    fn test_levels_are_written_before_they_are_read() {
        let store = RecordingStore::default();
        let blocks: Vec<Vec<u8>> = (0..8u8).map(|i| vec![i]).collect();
        MerkleBuilder::new().build(&store, &blocks).unwrap();

        let log = store.log.lock();
        let mut first_set: HashMap<&[u8], usize> = HashMap::new();
        for (pos, (op, key)) in log.iter().enumerate() {
            if *op == 's' {
                first_set.entry(key.as_slice()).or_insert(pos);
            }
        }
        for (pos, (op, key)) in log.iter().enumerate() {
            if *op == 'g' {
                let written = first_set.get(key.as_slice()).copied();
                assert!(matches!(written, Some(w) if w < pos), "read before write");
            }
        }
        // 8 leaves + 7 internal nodes written; 14 child reads
        assert_eq!(log.iter().filter(|(op, _)| *op == 's').count(), 15);
        assert_eq!(log.iter().filter(|(op, _)| *op == 'g').count(), 14);
    }
}
