//! Error types for keyed_merkle

use thiserror::Error;

/// Result type alias for keyed_merkle operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building or reading a keyed Merkle tree
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid coordinate: depth {depth}, index {index} (max depth {max_depth})")]
    InvalidCoordinate { depth: u8, index: u64, max_depth: u8 },

    #[error("Invalid node key: {0}")]
    InvalidKey(String),

    #[error("Missing node digest at depth {depth}, index {index}")]
    MissingChild { depth: u8, index: u64 },

    #[error("Store error: {0}")]
    Store(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Corruption detected: {0}")]
    Corruption(String),

    #[error("Invalid store file: {0}")]
    InvalidFile(String),

    #[error("Version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },

    #[error("Too many blocks: {0}")]
    TooManyBlocks(usize),

    #[error("No tree manifest in store")]
    ManifestNotFound,

    #[error("Config error: {0}")]
    Config(String),
}

impl Error {
    /// Whether this error was raised by the backing store rather than the tree
    pub fn is_store_failure(&self) -> bool {
        matches!(
            self,
            Error::Store(_)
                | Error::Io(_)
                | Error::Serialization(_)
                | Error::InvalidFile(_)
                | Error::VersionMismatch { .. }
        )
    }
}
