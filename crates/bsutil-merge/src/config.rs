use std::path::{Path, PathBuf};

use bsutil_store::ShardFunc;
use serde::{Deserialize, Serialize};

use crate::error::{MergeError, MergeResult};
use crate::transfer::TransferOptions;

pub const DEFAULT_DESTINATION: &str = "./merged-blockstore";
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// What to do with a partially filled batch once the key stream ends.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TrailingBatch {
    /// Write the remaining blocks.
    #[default]
    Flush,
    /// Drop them. Loses up to `batch_size - 1` blocks per source; kept for
    /// reproducing the output of older merges.
    Discard,
}

/// Parameters of a merge run, built once and passed to the [`Merger`](crate::Merger).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MergeConfig {
    /// Source stores, merged in order.
    pub sources: Vec<PathBuf>,
    /// Destination store. Must not already exist as a store.
    pub destination: PathBuf,
    /// Blocks per `put_many` call.
    pub batch_size: usize,
    /// Sharding of the destination store.
    pub shard: ShardFunc,
    pub trailing_batch: TrailingBatch,
    /// `fsync` each destination block before it is renamed into place.
    pub sync_writes: bool,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            sources: Vec::new(),
            destination: PathBuf::from(DEFAULT_DESTINATION),
            batch_size: DEFAULT_BATCH_SIZE,
            shard: ShardFunc::DEFAULT,
            trailing_batch: TrailingBatch::default(),
            sync_writes: true,
        }
    }
}

impl MergeConfig {
    pub fn new(sources: Vec<PathBuf>, destination: impl Into<PathBuf>) -> Self {
        Self {
            sources,
            destination: destination.into(),
            ..Self::default()
        }
    }

    /// Parse a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(s: &str) -> MergeResult<Self> {
        toml::from_str(s).map_err(|e| MergeError::Config(e.to_string()))
    }

    pub fn from_toml_file(path: &Path) -> MergeResult<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| MergeError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&contents)
    }

    /// Check the config before anything touches the filesystem.
    pub fn validate(&self) -> MergeResult<()> {
        if self.sources.is_empty() {
            return Err(MergeError::NoSources);
        }
        if self.batch_size == 0 {
            return Err(MergeError::Config("batch_size must be at least 1".into()));
        }
        if self.sources.iter().any(|s| s == &self.destination) {
            return Err(MergeError::Config(format!(
                "destination {} is also listed as a source",
                self.destination.display()
            )));
        }
        Ok(())
    }

    pub fn transfer_options(&self) -> TransferOptions {
        TransferOptions {
            batch_size: self.batch_size,
            trailing_batch: self.trailing_batch,
        }
    }
}
