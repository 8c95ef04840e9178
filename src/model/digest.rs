//! Fixed-size node digest

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Width in bytes of every node digest
pub const DIGEST_LEN: usize = 32;

/// A 32-byte digest stored as the value of a node key
///
/// Serializes as a hex string in human-readable formats (JSON) and as raw
/// bytes otherwise (bincode).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Digest([u8; DIGEST_LEN]);

impl Digest {
    /// The all-zero digest
    pub const ZERO: Digest = Digest([0u8; DIGEST_LEN]);

    /// Create a digest from raw bytes
    pub fn from_bytes(bytes: [u8; DIGEST_LEN]) -> Self {
        Digest(bytes)
    }

    /// Decode a digest read back from a store.
    ///
    /// Returns `None` if the slice is not exactly `DIGEST_LEN` bytes.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let arr: [u8; DIGEST_LEN] = bytes.try_into().ok()?;
        Some(Digest(arr))
    }

    /// Get the raw bytes
    pub fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.0
    }

    /// Convert to hex string
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex string
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let bytes = hex::decode(s)?;
        Digest::from_slice(&bytes).ok_or(hex::FromHexError::InvalidStringLength)
    }

    /// Get a short prefix for display (first 7 chars)
    pub fn short(&self) -> String {
        self.to_hex()[..7].to_string()
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", self.short())
    }
}

impl Serialize for Digest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.serialize_str(&self.to_hex())
        } else {
            self.0.serialize(serializer)
        }
    }
}

impl<'de> Deserialize<'de> for Digest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            Digest::from_hex(&s).map_err(serde::de::Error::custom)
        } else {
            <[u8; DIGEST_LEN]>::deserialize(deserializer).map(Digest)
        }
    }
}

impl AsRef<[u8]> for Digest {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}
