//! Pluggable hash functions

mod blake;
mod mock;
mod traits;

pub use blake::{Blake3Hasher, KeyedBlake3Hasher};
pub use mock::MockHasher;
pub use traits::NodeHasher;
