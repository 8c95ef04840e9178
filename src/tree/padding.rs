//! Padding leaves

use serde::{Deserialize, Serialize};

/// Content of the synthetic blocks that fill the leaf level up to a power
/// of two
///
/// Trees built with different policies over the same blocks have different
/// roots, so the policy is recorded in the tree manifest.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaddingPolicy {
    /// Zero-length block
    #[default]
    Empty,
    /// Block of `len` zero bytes
    ZeroFilled { len: usize },
}

impl PaddingPolicy {
    /// The padding block's bytes
    pub fn block(&self) -> Vec<u8> {
        match self {
            PaddingPolicy::Empty => Vec::new(),
            PaddingPolicy::ZeroFilled { len } => vec![0u8; *len],
        }
    }
}

impl std::fmt::Display for PaddingPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaddingPolicy::Empty => write!(f, "empty"),
            PaddingPolicy::ZeroFilled { len } => write!(f, "zero-filled({})", len),
        }
    }
}
