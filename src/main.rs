//! kmt CLI - Command line interface for keyed_merkle
//!
//! Builds a Merkle tree over files (or lines of a file) into a single-file
//! store and inspects the persisted nodes.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use keyed_merkle::{
    FileStore, KeyValueStore, Manifest, MerkleTree, NodeHasher, TreeConfig,
};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "kmt")]
#[command(about = "Build and inspect Merkle trees persisted in a key-value store")]
#[command(version)]
struct Cli {
    /// Path to the store file
    #[arg(short, long, default_value = "tree.kmt")]
    store: PathBuf,

    /// Path to a JSON config file (defaults to ~/.config/keyed-merkle/config.json)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output format (json or text)
    #[arg(short, long, default_value = "json")]
    format: OutputFormat,

    /// Enable debug logging on stderr
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
enum OutputFormat {
    Json,
    Text,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize an empty store
    Init,

    /// Build a tree, replacing whatever the store held
    Build {
        /// Files to use as blocks, one block per file
        files: Vec<PathBuf>,
        /// Use each line of this file as a block instead
        #[arg(short, long, conflicts_with = "files")]
        lines: Option<PathBuf>,
    },

    /// Show the root digest and tree shape
    Root,

    /// Show the node at a coordinate
    Node {
        /// Depth from the root (root = 0)
        depth: u8,
        /// Index within the level
        index: u64,
    },

    /// Show the inclusion path of a leaf
    Path {
        /// Leaf index
        leaf: u64,
    },

    /// Recompute every internal node and compare with the store
    Audit,

    /// List stored keys
    Keys {
        /// Maximum number of keys to return
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Remove every entry from the store
    Clear,

    /// Reclaim space held by overwritten and deleted values
    Compact,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "warn" };
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("keyed_merkle={},kmt={}", log_level, log_level)));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let config = TreeConfig::load_or_default(cli.config.as_deref())?;
    debug!(?config, "using config");

    match cli.command {
        Commands::Init => {
            let store = FileStore::create(&cli.store)?;
            store.sync()?;
            output(
                cli.format,
                &serde_json::json!({
                    "status": "ok",
                    "message": format!("Created store at {}", cli.store.display())
                }),
            )?;
        }

        Commands::Build { files, lines } => {
            let blocks = match lines {
                Some(path) => read_lines(&path)?,
                None => files
                    .iter()
                    .map(|p| std::fs::read(p).with_context(|| format!("reading {}", p.display())))
                    .collect::<anyhow::Result<Vec<_>>>()?,
            };

            let store = open_store(&cli.store, &config)?;
            // Rebuilds start from an empty store so no stale nodes survive
            store.clear()?;

            let builder = config.builder()?;
            let tree = builder.build_with_manifest(&store, &blocks)?;
            store.sync()?;
            info!(root = %tree.root(), "built tree");

            let shape = tree.shape();
            output(
                cli.format,
                &serde_json::json!({
                    "status": "ok",
                    "root": tree.root().to_hex(),
                    "blocks": tree.block_count(),
                    "leaves": shape.leaf_count(),
                    "padding": shape.padding_count(blocks.len()),
                    "depth": shape.max_depth(),
                    "hasher": builder.hasher().name()
                }),
            )?;
        }

        Commands::Root => {
            let store = open_store(&cli.store, &config)?;
            let manifest = Manifest::load(&store)?.context("store holds no tree")?;
            let tree = MerkleTree::load(&store)?;
            output(
                cli.format,
                &serde_json::json!({
                    "root": tree.root().to_hex(),
                    "blocks": tree.block_count(),
                    "leaves": tree.shape().leaf_count(),
                    "depth": tree.shape().max_depth(),
                    "hasher": manifest.hasher,
                    "padding": manifest.padding.to_string()
                }),
            )?;
        }

        Commands::Node { depth, index } => {
            let store = open_store(&cli.store, &config)?;
            let tree = MerkleTree::load(&store)?;
            let key = tree.shape().node_key(depth, index)?;
            let digest = tree.node(&store, depth, index)?;
            output(
                cli.format,
                &serde_json::json!({
                    "depth": depth,
                    "index": index,
                    "key": key.to_hex(),
                    "path": key.to_bit_string(),
                    "digest": digest.map(|d| d.to_hex())
                }),
            )?;
        }

        Commands::Path { leaf } => {
            let store = open_store(&cli.store, &config)?;
            let tree = MerkleTree::load(&store)?;
            let path = tree.inclusion_path(&store, leaf)?;
            output(
                cli.format,
                &serde_json::json!({
                    "root": tree.root().to_hex(),
                    "path": path
                }),
            )?;
        }

        Commands::Audit => {
            let store = open_store(&cli.store, &config)?;
            let manifest = Manifest::load(&store)?.context("store holds no tree")?;
            let hasher = config.hasher()?;
            if manifest.hasher != hasher.name() {
                bail!(
                    "tree was built with hasher '{}', config selects '{}'",
                    manifest.hasher,
                    hasher.name()
                );
            }
            if !manifest.matches_hasher(&hasher) {
                bail!(
                    "tree was built with a different '{}' key than the config holds",
                    manifest.hasher
                );
            }

            let tree = MerkleTree::load(&store)?;
            let checked = tree.audit(&store, &hasher)?;
            output(
                cli.format,
                &serde_json::json!({
                    "status": "ok",
                    "root": tree.root().to_hex(),
                    "checked": checked
                }),
            )?;
        }

        Commands::Keys { limit } => {
            let store = open_store(&cli.store, &config)?;
            let mut keys = store.keys()?;
            let total = keys.len();
            if let Some(limit) = limit {
                keys.truncate(limit);
            }
            let items: Vec<_> = keys.iter().map(hex::encode).collect();
            output(
                cli.format,
                &serde_json::json!({
                    "count": total,
                    "keys": items
                }),
            )?;
        }

        Commands::Clear => {
            let store = open_store(&cli.store, &config)?;
            store.clear()?;
            output(cli.format, &serde_json::json!({ "status": "ok" }))?;
        }

        Commands::Compact => {
            let store = open_store(&cli.store, &config)?;
            let reclaimed = store.compact()?;
            output(
                cli.format,
                &serde_json::json!({
                    "status": "ok",
                    "reclaimed_bytes": reclaimed
                }),
            )?;
        }
    }

    Ok(())
}

fn open_store(path: &Path, config: &TreeConfig) -> anyhow::Result<FileStore> {
    let store = FileStore::open_or_create(path)?.with_compression(config.compress_threshold);
    Ok(store)
}

/// Split a file into blocks, one per line, without the line terminators
fn read_lines(path: &Path) -> anyhow::Result<Vec<Vec<u8>>> {
    let content = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    if content.is_empty() {
        return Ok(Vec::new());
    }
    let mut lines: Vec<Vec<u8>> = content
        .split(|b| *b == b'\n')
        .map(|line| line.strip_suffix(b"\r").unwrap_or(line).to_vec())
        .collect();
    if content.ends_with(b"\n") {
        lines.pop();
    }
    Ok(lines)
}

fn output(format: OutputFormat, value: &serde_json::Value) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string(value)?),
        OutputFormat::Text => println!("{}", serde_json::to_string_pretty(value)?),
    }
    Ok(())
}
