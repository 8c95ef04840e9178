//! Tree manifest - metadata persisted beside the nodes

use super::PaddingPolicy;
use crate::hasher::NodeHasher;
use crate::model::Digest;
use crate::store::KeyValueStore;
use crate::{Error, Result, VERSION};
use serde::{Deserialize, Serialize};

/// Reserved key for the manifest.
///
/// Node keys are at most 8 bytes wide, so this 9-byte key never collides.
pub const MANIFEST_KEY: &[u8] = b"\0manifest";

/// What is needed to reopen a persisted tree and rebuild it identically
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub version: u32,
    pub block_count: u64,
    pub leaf_count: u64,
    /// `NodeHasher::name` of the hasher the tree was built with
    pub hasher: String,
    /// `NodeHasher::fingerprint` of that hasher, which also covers its key
    pub hasher_fingerprint: Digest,
    pub padding: PaddingPolicy,
    pub root: Digest,
}

impl Manifest {
    /// Write the manifest into `store`
    pub fn save<S: KeyValueStore + ?Sized>(&self, store: &S) -> Result<()> {
        let data = bincode::serialize(self)?;
        store.set(MANIFEST_KEY, &data)
    }

    /// Read the manifest from `store`, if one was saved
    pub fn load<S: KeyValueStore + ?Sized>(store: &S) -> Result<Option<Self>> {
        let Some(data) = store.get(MANIFEST_KEY)? else {
            return Ok(None);
        };

        let manifest: Manifest = bincode::deserialize(&data)?;
        if manifest.version != VERSION {
            return Err(Error::VersionMismatch {
                expected: VERSION,
                found: manifest.version,
            });
        }
        Ok(Some(manifest))
    }

    /// Whether `hasher` is the one this tree was built with
    pub fn matches_hasher<H: NodeHasher + ?Sized>(&self, hasher: &H) -> bool {
        self.hasher == hasher.name() && self.hasher_fingerprint == hasher.fingerprint()
    }
}
