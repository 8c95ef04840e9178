//! Mock hasher for testing

use super::NodeHasher;
use crate::model::{Digest, DIGEST_LEN};

/// A fast, non-cryptographic hasher with deterministic output
///
/// Folds the input into 32 bytes with an FNV-1a style mix seeded per lane.
/// Same input → same digest, but collisions are easy to construct. Only for
/// tests and benchmarks.
#[derive(Clone, Copy, Debug, Default)]
pub struct MockHasher;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

impl NodeHasher for MockHasher {
    fn name(&self) -> &str {
        "mock"
    }

    fn hash(&self, data: &[u8]) -> Digest {
        let mut out = [0u8; DIGEST_LEN];
        for (lane, chunk) in out.chunks_mut(8).enumerate() {
            let mut state = FNV_OFFSET ^ (lane as u64);
            for byte in data {
                state ^= *byte as u64;
                state = state.wrapping_mul(FNV_PRIME);
            }
            state ^= data.len() as u64;
            state = state.wrapping_mul(FNV_PRIME);
            chunk.copy_from_slice(&state.to_le_bytes());
        }
        Digest::from_bytes(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_hasher_deterministic() {
        assert_eq!(MockHasher.hash(b"hello world"), MockHasher.hash(b"hello world"));
    }

    #[test]
    fn test_mock_hasher_different_inputs() {
        assert_ne!(MockHasher.hash(b"hello"), MockHasher.hash(b"world"));
        assert_ne!(MockHasher.hash(b""), MockHasher.hash(&[0u8]));
    }

    #[test]
    fn test_mock_hasher_lanes_differ() {
        let d = MockHasher.hash(b"lanes");
        let bytes = d.as_bytes();
        assert_ne!(bytes[0..8], bytes[8..16]);
    }
}
