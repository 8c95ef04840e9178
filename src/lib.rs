//! # keyed_merkle
//!
//! A binary Merkle tree whose nodes live in a pluggable key-value store.
//!
//! Given N data blocks, keyed_merkle produces one root digest committing to
//! all of them, writing every leaf and internal node into a store as it
//! goes. Any node can later be fetched, recomputed, or used to assemble an
//! inclusion path without loading the whole tree into memory.
//!
//! ## Core Concepts
//!
//! - **Stores**: anything implementing [`KeyValueStore`] (in-memory, single
//!   file, or a prefixed view of a shared store)
//! - **Padding**: the block list is padded to a power of two so every
//!   internal node has exactly two children
//! - **Node keys**: a node's key is a `1` marker bit followed by its path
//!   from the root, so `(depth, index)` alone locates any node
//! - **Hashers**: the hash function is injected through [`NodeHasher`]
//!
//! ## Example
//!
//! ```
//! use keyed_merkle::{KeyValueStore, MemoryStore, MerkleBuilder};
//!
//! let store = MemoryStore::new();
//! let tree = MerkleBuilder::new().build_tree(&store, &[b"b0", b"b1", b"b2"])?;
//!
//! let root_key = tree.shape().node_key(0, 0)?;
//! assert_eq!(store.get(root_key.as_bytes())?, Some(tree.root().as_bytes().to_vec()));
//! # Ok::<(), keyed_merkle::Error>(())
//! ```

pub mod config;
pub mod hasher;
pub mod model;
pub mod store;
pub mod tree;

mod error;

pub use config::{HasherKind, TreeConfig};
pub use error::{Error, Result};
pub use hasher::{Blake3Hasher, KeyedBlake3Hasher, MockHasher, NodeHasher};
pub use model::{Digest, NodeKey, TreeShape};
pub use store::{FileStore, KeyValueStore, MemoryStore, PrefixedStore};
pub use tree::{InclusionPath, Manifest, MerkleBuilder, MerkleTree, PaddingPolicy};

/// Format version for store files and manifests
pub const VERSION: u32 = 1;

/// Magic bytes for store file identification
pub const MAGIC: &[u8; 8] = b"KMT_STOR";
