//! Core data model types for keyed_merkle

mod digest;
mod key;
mod shape;

pub use digest::{Digest, DIGEST_LEN};
pub use key::NodeKey;
pub use shape::{TreeShape, MAX_DEPTH};
