//! Hasher trait definition

use crate::model::Digest;
use std::sync::Arc;

/// Trait for the hash function that digests blocks and node pairs
///
/// Implementations must be pure: the same input always yields the same
/// digest. The tree never assumes a particular algorithm.
pub trait NodeHasher: Send + Sync {
    /// Get the hasher name/identifier (recorded in tree manifests)
    fn name(&self) -> &str;

    /// Digest an arbitrary byte sequence
    fn hash(&self, data: &[u8]) -> Digest;

    /// Identifies this hasher's configuration, not only its algorithm.
    ///
    /// Recorded in tree manifests so a tree is never audited with a hasher
    /// that shares its name but not its key. Must not reveal secret keys.
    fn fingerprint(&self) -> Digest {
        self.hash(self.name().as_bytes())
    }

    /// Digest a pair of child digests as `hash(left || right)`
    fn hash_pair(&self, left: &Digest, right: &Digest) -> Digest {
        let mut buf = [0u8; 64];
        buf[..32].copy_from_slice(left.as_bytes());
        buf[32..].copy_from_slice(right.as_bytes());
        self.hash(&buf)
    }
}

impl<H: NodeHasher + ?Sized> NodeHasher for &H {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn hash(&self, data: &[u8]) -> Digest {
        (**self).hash(data)
    }

    fn fingerprint(&self) -> Digest {
        (**self).fingerprint()
    }

    fn hash_pair(&self, left: &Digest, right: &Digest) -> Digest {
        (**self).hash_pair(left, right)
    }
}

impl<H: NodeHasher + ?Sized> NodeHasher for Box<H> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn hash(&self, data: &[u8]) -> Digest {
        (**self).hash(data)
    }

    fn fingerprint(&self) -> Digest {
        (**self).fingerprint()
    }

    fn hash_pair(&self, left: &Digest, right: &Digest) -> Digest {
        (**self).hash_pair(left, right)
    }
}

impl<H: NodeHasher + ?Sized> NodeHasher for Arc<H> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn hash(&self, data: &[u8]) -> Digest {
        (**self).hash(data)
    }

    fn fingerprint(&self) -> Digest {
        (**self).fingerprint()
    }

    fn hash_pair(&self, left: &Digest, right: &Digest) -> Digest {
        (**self).hash_pair(left, right)
    }
}
