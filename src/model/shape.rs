//! Tree shape and node addressing

use super::NodeKey;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Deepest supported leaf level; heap numbers must fit in a u64
pub const MAX_DEPTH: u8 = 63;

/// The shape of a complete binary tree with a power-of-two leaf count
///
/// Root is at depth 0, leaves at `max_depth = log2(leaf_count)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeShape {
    leaf_count: u64,
    max_depth: u8,
}

impl TreeShape {
    /// Shape of the tree built over `block_count` blocks.
    ///
    /// The leaf count is the smallest power of two >= `block_count`. Zero
    /// blocks yields a single (padding) leaf.
    pub fn for_blocks(block_count: usize) -> Result<Self> {
        let n = block_count.max(1) as u64;
        let leaf_count = n
            .checked_next_power_of_two()
            .ok_or(Error::TooManyBlocks(block_count))?;
        Self::from_leaf_count(leaf_count)
    }

    /// Shape for an exact leaf count, which must be a power of two
    pub fn from_leaf_count(leaf_count: u64) -> Result<Self> {
        if !leaf_count.is_power_of_two() {
            return Err(Error::Corruption(format!(
                "leaf count {} is not a power of two",
                leaf_count
            )));
        }
        let max_depth = leaf_count.trailing_zeros() as u8;
        if max_depth > MAX_DEPTH {
            return Err(Error::TooManyBlocks(leaf_count as usize));
        }
        Ok(TreeShape {
            leaf_count,
            max_depth,
        })
    }

    pub fn leaf_count(&self) -> u64 {
        self.leaf_count
    }

    pub fn max_depth(&self) -> u8 {
        self.max_depth
    }

    /// Number of padding leaves needed on top of `block_count` real blocks
    pub fn padding_count(&self, block_count: usize) -> u64 {
        self.leaf_count.saturating_sub(block_count as u64)
    }

    /// Total number of nodes (leaves and internal)
    pub fn node_count(&self) -> u64 {
        // 2^64 - 1 at MAX_DEPTH still fits
        self.leaf_count + (self.leaf_count - 1)
    }

    /// Number of nodes on one level, 0 below the leaves
    pub fn level_width(&self, depth: u8) -> u64 {
        if depth > self.max_depth {
            return 0;
        }
        1u64 << depth
    }

    /// Width in bytes of every node key of this shape (`1 + max_depth` bits)
    pub fn key_width(&self) -> usize {
        (self.max_depth as usize + 1).div_ceil(8)
    }

    /// Storage key of the node at `(depth, index)`
    pub fn node_key(&self, depth: u8, index: u64) -> Result<NodeKey> {
        if depth > self.max_depth || index >= self.level_width(depth) {
            return Err(Error::InvalidCoordinate {
                depth,
                index,
                max_depth: self.max_depth,
            });
        }
        let heap = (1u64 << depth) | index;
        Ok(NodeKey::from_heap_index(heap, self.key_width()))
    }

    /// Storage key of leaf `index`
    pub fn leaf_key(&self, index: u64) -> Result<NodeKey> {
        self.node_key(self.max_depth, index)
    }

    /// Storage key of the root
    pub fn root_key(&self) -> NodeKey {
        NodeKey::from_heap_index(1, self.key_width())
    }

    /// Decode a key back into its `(depth, index)` coordinate
    pub fn coordinate(&self, key: &[u8]) -> Result<(u8, u64)> {
        if key.len() != self.key_width() {
            return Err(Error::InvalidKey(format!(
                "expected {} bytes, got {}",
                self.key_width(),
                key.len()
            )));
        }
        let mut buf = [0u8; 8];
        buf[8 - key.len()..].copy_from_slice(key);
        let heap = u64::from_be_bytes(buf);
        if heap == 0 {
            return Err(Error::InvalidKey("missing marker bit".into()));
        }
        let depth = (63 - heap.leading_zeros()) as u8;
        if depth > self.max_depth {
            return Err(Error::InvalidKey(format!(
                "depth {} exceeds max depth {}",
                depth, self.max_depth
            )));
        }
        Ok((depth, heap ^ (1u64 << depth)))
    }
}
