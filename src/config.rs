//! Tree configuration
//!
//! Stored as JSON in ~/.config/keyed-merkle/config.json by default:
//!
//! ```json
//! {
//!   "hasher": { "keyed_blake3": { "key_hex": "00…" } },
//!   "padding": "empty",
//!   "compress_threshold": 256
//! }
//! ```

use crate::hasher::{Blake3Hasher, KeyedBlake3Hasher, MockHasher, NodeHasher};
use crate::store::DEFAULT_COMPRESS_THRESHOLD;
use crate::tree::{MerkleBuilder, PaddingPolicy};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Which hash function to inject into the builder
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HasherKind {
    #[default]
    Blake3,
    /// BLAKE3 keyed mode with a 32-byte hex key
    KeyedBlake3 { key_hex: String },
    Mock,
}

/// Settings for building and storing trees
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeConfig {
    pub hasher: HasherKind,
    pub padding: PaddingPolicy,
    /// Stored values at least this long are compressed (`null` disables)
    pub compress_threshold: Option<usize>,
}

impl Default for TreeConfig {
    fn default() -> Self {
        TreeConfig {
            hasher: HasherKind::Blake3,
            padding: PaddingPolicy::Empty,
            compress_threshold: Some(DEFAULT_COMPRESS_THRESHOLD),
        }
    }
}

impl TreeConfig {
    /// Default config location (~/.config/keyed-merkle/config.json)
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| Error::Config("Could not find config directory".into()))?;
        Ok(config_dir.join("keyed-merkle").join("config.json"))
    }

    /// Load a config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;

        let config: TreeConfig = serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))?;

        // Fail early on a bad key rather than at first build
        config.hasher()?;
        debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Load `path`, or the default path, falling back to defaults when the
    /// file does not exist
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match Self::default_path() {
                Ok(p) => p,
                Err(_) => return Ok(Self::default()),
            },
        };

        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save the config as pretty JSON, creating parent directories
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::Config(format!("Failed to create config dir: {}", e)))?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)
            .map_err(|e| Error::Config(format!("Failed to write config: {}", e)))?;
        Ok(())
    }

    /// Instantiate the configured hasher
    pub fn hasher(&self) -> Result<Box<dyn NodeHasher>> {
        Ok(match &self.hasher {
            HasherKind::Blake3 => Box::new(Blake3Hasher),
            HasherKind::KeyedBlake3 { key_hex } => {
                let bytes = hex::decode(key_hex)
                    .map_err(|e| Error::Config(format!("Invalid hasher key: {}", e)))?;
                let key: [u8; 32] = bytes.try_into().map_err(|b: Vec<u8>| {
                    Error::Config(format!("Hasher key must be 32 bytes, got {}", b.len()))
                })?;
                Box::new(KeyedBlake3Hasher::new(key))
            }
            HasherKind::Mock => Box::new(MockHasher),
        })
    }

    /// A builder with the configured hasher and padding
    pub fn builder(&self) -> Result<MerkleBuilder<Box<dyn NodeHasher>>> {
        Ok(MerkleBuilder::with_hasher(self.hasher()?).padding(self.padding))
    }
}
