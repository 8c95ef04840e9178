//! BLAKE3 hashers

use super::NodeHasher;
use crate::model::Digest;

/// Plain BLAKE3, the default hasher
#[derive(Clone, Copy, Debug, Default)]
pub struct Blake3Hasher;

impl NodeHasher for Blake3Hasher {
    fn name(&self) -> &str {
        "blake3"
    }

    fn hash(&self, data: &[u8]) -> Digest {
        Digest::from_bytes(*blake3::hash(data).as_bytes())
    }

    fn hash_pair(&self, left: &Digest, right: &Digest) -> Digest {
        let mut hasher = blake3::Hasher::new();
        hasher.update(left.as_bytes());
        hasher.update(right.as_bytes());
        Digest::from_bytes(*hasher.finalize().as_bytes())
    }
}

const FINGERPRINT_CONTEXT: &str = "keyed_merkle 2024-06 keyed hasher fingerprint";

/// BLAKE3 in keyed mode
///
/// Two trees built with different keys never share digests, which keeps
/// trees apart when they share one store.
#[derive(Clone)]
pub struct KeyedBlake3Hasher {
    key: [u8; 32],
}

impl KeyedBlake3Hasher {
    pub fn new(key: [u8; 32]) -> Self {
        KeyedBlake3Hasher { key }
    }

    /// Derive the key from a context string and secret material
    pub fn derive(context: &str, material: &[u8]) -> Self {
        KeyedBlake3Hasher {
            key: blake3::derive_key(context, material),
        }
    }
}

impl std::fmt::Debug for KeyedBlake3Hasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyedBlake3Hasher").finish_non_exhaustive()
    }
}

impl NodeHasher for KeyedBlake3Hasher {
    fn name(&self) -> &str {
        "blake3-keyed"
    }

    fn hash(&self, data: &[u8]) -> Digest {
        Digest::from_bytes(*blake3::keyed_hash(&self.key, data).as_bytes())
    }

    fn fingerprint(&self) -> Digest {
        Digest::from_bytes(blake3::derive_key(FINGERPRINT_CONTEXT, &self.key))
    }

    fn hash_pair(&self, left: &Digest, right: &Digest) -> Digest {
        let mut hasher = blake3::Hasher::new_keyed(&self.key);
        hasher.update(left.as_bytes());
        hasher.update(right.as_bytes());
        Digest::from_bytes(*hasher.finalize().as_bytes())
    }
}
