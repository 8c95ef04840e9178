//! Handle on a tree persisted in a store

use super::manifest::Manifest;
use crate::hasher::NodeHasher;
use crate::model::{Digest, TreeShape};
use crate::store::KeyValueStore;
use crate::{Error, Result};
use serde::Serialize;
use tracing::warn;

/// A built tree: its shape and root digest
///
/// The nodes themselves live only in the store the tree was built into;
/// every accessor takes that store explicitly.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MerkleTree {
    shape: TreeShape,
    root: Digest,
    block_count: u64,
}

/// Which side of its parent a sibling sits on
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

/// One step of an inclusion path
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Sibling {
    pub side: Side,
    pub digest: Digest,
}

/// Digests needed to link a leaf to the root
///
/// `siblings` run bottom-up: the first entry is the leaf's sibling, the last
/// is the root's child on the other side.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct InclusionPath {
    pub leaf_index: u64,
    pub leaf: Digest,
    pub siblings: Vec<Sibling>,
}

impl MerkleTree {
    pub(crate) fn new(shape: TreeShape, root: Digest, block_count: u64) -> Self {
        MerkleTree {
            shape,
            root,
            block_count,
        }
    }

    /// Reopen the tree recorded in `store`'s manifest
    pub fn load<S: KeyValueStore + ?Sized>(store: &S) -> Result<Self> {
        let manifest = Manifest::load(store)?.ok_or(Error::ManifestNotFound)?;
        let shape = TreeShape::from_leaf_count(manifest.leaf_count)?;

        let stored_root = read_digest(store, &shape, 0, 0)?;
        if stored_root != Some(manifest.root) {
            return Err(Error::Corruption(format!(
                "manifest root {} does not match stored root",
                manifest.root.short()
            )));
        }

        Ok(MerkleTree::new(shape, manifest.root, manifest.block_count))
    }

    /// The root digest
    pub fn root(&self) -> Digest {
        self.root
    }

    pub fn shape(&self) -> TreeShape {
        self.shape
    }

    /// Number of caller blocks (excluding padding)
    pub fn block_count(&self) -> u64 {
        self.block_count
    }

    /// Read the digest at `(depth, index)`
    pub fn node<S: KeyValueStore + ?Sized>(
        &self,
        store: &S,
        depth: u8,
        index: u64,
    ) -> Result<Option<Digest>> {
        read_digest(store, &self.shape, depth, index)
    }

    /// Read the digest of leaf `index`
    pub fn leaf<S: KeyValueStore + ?Sized>(&self, store: &S, index: u64) -> Result<Option<Digest>> {
        self.node(store, self.shape.max_depth(), index)
    }

    /// Collect the leaf digest and its sibling digests up to the root
    pub fn inclusion_path<S: KeyValueStore + ?Sized>(
        &self,
        store: &S,
        leaf_index: u64,
    ) -> Result<InclusionPath> {
        let max_depth = self.shape.max_depth();
        let leaf = require_digest(store, &self.shape, max_depth, leaf_index)?;

        let mut siblings = Vec::with_capacity(max_depth as usize);
        let mut index = leaf_index;
        for depth in (1..=max_depth).rev() {
            let (side, sibling_index) = if index % 2 == 0 {
                (Side::Right, index + 1)
            } else {
                (Side::Left, index - 1)
            };
            let digest = require_digest(store, &self.shape, depth, sibling_index)?;
            siblings.push(Sibling { side, digest });
            index /= 2;
        }

        Ok(InclusionPath {
            leaf_index,
            leaf,
            siblings,
        })
    }

    /// Recompute every internal node from its stored children.
    ///
    /// Fails with `Corruption` at the first node whose stored digest differs
    /// from `hash(left || right)`, or if the stored root is not this tree's.
    pub fn audit<S, H>(&self, store: &S, hasher: &H) -> Result<u64>
    where
        S: KeyValueStore + ?Sized,
        H: NodeHasher + ?Sized,
    {
        let mut checked = 0u64;
        for depth in (0..self.shape.max_depth()).rev() {
            for index in 0..self.shape.level_width(depth) {
                let stored = require_digest(store, &self.shape, depth, index)?;
                let left = require_digest(store, &self.shape, depth + 1, 2 * index)?;
                let right = require_digest(store, &self.shape, depth + 1, 2 * index + 1)?;

                if hasher.hash_pair(&left, &right) != stored {
                    warn!(depth, index, "stored digest does not match children");
                    return Err(Error::Corruption(format!(
                        "node ({}, {}) does not match its children",
                        depth, index
                    )));
                }
                checked += 1;
            }
        }

        if require_digest(store, &self.shape, 0, 0)? != self.root {
            return Err(Error::Corruption("stored root differs from tree root".into()));
        }
        Ok(checked)
    }
}

impl InclusionPath {
    /// Fold the path back up to a root digest with `hasher`
    pub fn root_with<H: NodeHasher + ?Sized>(&self, hasher: &H) -> Digest {
        self.siblings.iter().fold(self.leaf, |acc, sibling| match sibling.side {
            Side::Left => hasher.hash_pair(&sibling.digest, &acc),
            Side::Right => hasher.hash_pair(&acc, &sibling.digest),
        })
    }
}

/// Read and decode one node digest
pub(crate) fn read_digest<S: KeyValueStore + ?Sized>(
    store: &S,
    shape: &TreeShape,
    depth: u8,
    index: u64,
) -> Result<Option<Digest>> {
    let key = shape.node_key(depth, index)?;
    match store.get(key.as_bytes())? {
        Some(bytes) => Digest::from_slice(&bytes).map(Some).ok_or_else(|| {
            Error::Corruption(format!(
                "node ({}, {}) holds {} bytes, not a digest",
                depth,
                index,
                bytes.len()
            ))
        }),
        None => Ok(None),
    }
}

/// Read a node digest that must exist
pub(crate) fn require_digest<S: KeyValueStore + ?Sized>(
    store: &S,
    shape: &TreeShape,
    depth: u8,
    index: u64,
) -> Result<Digest> {
    read_digest(store, shape, depth, index)?.ok_or(Error::MissingChild { depth, index })
}
