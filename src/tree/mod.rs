//! Merkle tree persisted node-by-node in a key-value store
//!
//! The tree is never held in memory as a graph:
//! - every leaf and internal node lives in the store under its path key
//! - internal digests are `hash(left || right)` over children read back
//!   from the store
//! - the root digest at depth 0 commits to every block

mod builder;
mod manifest;
mod merkle;
mod padding;

pub use builder::MerkleBuilder;
pub use manifest::{Manifest, MANIFEST_KEY};
pub use merkle::{InclusionPath, MerkleTree, Side, Sibling};
pub use padding::PaddingPolicy;
