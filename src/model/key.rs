//! Path-encoded node keys

use std::fmt;

/// Storage key for one tree node.
///
/// The key is the node's heap number `2^depth + index` written big-endian in
/// a width fixed by the tree shape: a leading `1` marker bit followed by
/// `depth` path bits, left-padded with zero bits to `1 + max_depth` bits.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeKey(Vec<u8>);

impl NodeKey {
    pub(crate) fn from_heap_index(heap: u64, width: usize) -> Self {
        let bytes = heap.to_be_bytes();
        NodeKey(bytes[bytes.len() - width..].to_vec())
    }

    /// Get the raw key bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Consume the key, returning its bytes
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    /// Render the key as its bit path (marker bit included)
    pub fn to_bit_string(&self) -> String {
        let bits: String = self.0.iter().map(|b| format!("{:08b}", b)).collect();
        match bits.find('1') {
            Some(start) => bits[start..].to_string(),
            None => bits,
        }
    }

    /// Convert to hex string
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeKey({})", self.to_bit_string())
    }
}

impl AsRef<[u8]> for NodeKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}
