//! Multi-source merge orchestration.
//!
//! A merge runs through a fixed sequence: validate the config, initialize and
//! open the destination, transfer each source in order, then sync and close
//! the destination. Any failure before the final sync aborts the run. Blocks
//! flushed before the failure stay in the destination; there is no rollback.

use std::path::{Path, PathBuf};

use bsutil_store::{Blockstore, FlatfsBlockstore, FlatfsOptions};
use bsutil_types::Context;
use tracing::{info, warn};

use crate::config::MergeConfig;
use crate::error::{MergeError, MergeResult};
use crate::estimate::estimate_size;
use crate::progress::{Progress, SourceProgress};
use crate::transfer::{transfer, TransferOptions, TransferStats};

/// Outcome of merging one source.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceSummary {
    pub path: PathBuf,
    pub estimated_bytes: u64,
    pub stats: TransferStats,
}

/// Outcome of a completed merge.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MergeSummary {
    pub destination: PathBuf,
    pub sources: Vec<SourceSummary>,
}

impl MergeSummary {
    pub fn blocks_read(&self) -> u64 {
        self.sources.iter().map(|s| s.stats.blocks_read).sum()
    }

    pub fn blocks_written(&self) -> u64 {
        self.sources.iter().map(|s| s.stats.blocks_written).sum()
    }

    pub fn bytes_read(&self) -> u64 {
        self.sources.iter().map(|s| s.stats.bytes_read).sum()
    }

    pub fn estimated_bytes(&self) -> u64 {
        self.sources.iter().map(|s| s.estimated_bytes).sum()
    }

    pub fn blocks_dropped(&self) -> u64 {
        self.sources.iter().map(|s| s.stats.blocks_dropped).sum()
    }
}

/// Merges a list of source stores into a freshly initialized destination.
#[derive(Clone, Debug)]
pub struct Merger {
    config: MergeConfig,
}

impl Merger {
    pub fn new(config: MergeConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MergeConfig {
        &self.config
    }

    /// Run the merge to completion.
    ///
    /// On error the destination handle is dropped without a sync, and the
    /// error reports how many sources were fully merged.
    pub fn run(&self, ctx: &Context, progress: &mut dyn Progress) -> MergeResult<MergeSummary> {
        self.config.validate()?;

        let dest_path = &self.config.destination;
        FlatfsBlockstore::initialize(dest_path, self.config.shard).map_err(|source| {
            MergeError::InitDestination {
                path: dest_path.clone(),
                source,
            }
        })?;
        let dest = FlatfsBlockstore::open_with(
            dest_path,
            false,
            FlatfsOptions {
                sync_writes: self.config.sync_writes,
            },
        )
        .map_err(|source| MergeError::OpenDestination {
            path: dest_path.clone(),
            source,
        })?;

        let options = self.config.transfer_options();
        let total = self.config.sources.len();
        let mut sources = Vec::with_capacity(total);
        for (completed, path) in self.config.sources.iter().enumerate() {
            let step = SourceStep {
                path,
                completed,
                total,
            };
            match step.run(ctx, &dest, &options, progress) {
                Ok(summary) => sources.push(summary),
                Err(err) => {
                    warn!(
                        destination = %dest_path.display(),
                        completed,
                        total,
                        "merge aborted; destination left unsynced"
                    );
                    return Err(err);
                }
            }
        }

        dest.sync(ctx, "/")
            .map_err(|source| MergeError::SyncDestination {
                path: dest_path.clone(),
                source,
            })?;
        dest.close().map_err(|source| MergeError::CloseDestination {
            path: dest_path.clone(),
            source,
        })?;

        let summary = MergeSummary {
            destination: dest_path.clone(),
            sources,
        };
        info!(
            destination = %dest_path.display(),
            sources = total,
            blocks = summary.blocks_written(),
            bytes = summary.bytes_read(),
            "merge finished"
        );
        Ok(summary)
    }
}

/// One source of a running merge.
struct SourceStep<'a> {
    path: &'a Path,
    /// Sources fully merged before this one.
    completed: usize,
    total: usize,
}

impl SourceStep<'_> {
    fn run(
        &self,
        ctx: &Context,
        dest: &FlatfsBlockstore,
        options: &TransferOptions,
        progress: &mut dyn Progress,
    ) -> MergeResult<SourceSummary> {
        let source = FlatfsBlockstore::open(self.path, true).map_err(|source| {
            MergeError::OpenSource {
                path: self.path.to_path_buf(),
                completed: self.completed,
                total: self.total,
                source,
            }
        })?;
        let estimated_bytes = estimate_size(ctx, self.path).map_err(|source| {
            MergeError::EstimateSize {
                path: self.path.to_path_buf(),
                completed: self.completed,
                total: self.total,
                source,
            }
        })?;

        info!(
            source = %self.path.display(),
            index = self.completed + 1,
            total = self.total,
            estimated_bytes,
            "merging source"
        );
        progress.source_started(&SourceProgress {
            path: self.path.to_path_buf(),
            index: self.completed + 1,
            total_sources: self.total,
            estimated_bytes,
        });

        let stats = transfer(ctx, &source, dest, estimated_bytes, options, progress).map_err(
            |source| MergeError::Transfer {
                path: self.path.to_path_buf(),
                completed: self.completed,
                total: self.total,
                source,
            },
        )?;

        if let Err(e) = source.close() {
            warn!(source = %self.path.display(), error = %e, "failed to close source");
        }
        Ok(SourceSummary {
            path: self.path.to_path_buf(),
            estimated_bytes,
            stats,
        })
    }
}
