//! Keyed byte stores
//!
//! The tree only talks to storage through [`KeyValueStore`]. This module
//! provides an in-memory store, a single-file persistent store, and a
//! prefixing view for sharing one store between several trees.

mod file_store;
mod memory;
mod prefixed;
mod record;
mod traits;

pub use file_store::{FileStore, DEFAULT_COMPRESS_THRESHOLD};
pub use memory::MemoryStore;
pub use prefixed::{PrefixedStore, PREFIX_LEN};
pub use record::{Encoding, Record};
pub use traits::KeyValueStore;
