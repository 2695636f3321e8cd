//! Merge engine for bsutil.
//!
//! Combines any number of source blockstores into one freshly initialized
//! destination, deduplicating by key and preserving payloads byte for byte.
//!
//! # Pipeline
//!
//! ```text
//! Merger::run
//!   ├─ validate config
//!   ├─ initialize + open destination
//!   ├─ for each source (in order):
//!   │    open read-only → estimate_size → transfer → close
//!   └─ sync("/") + close destination
//! ```
//!
//! [`transfer`] streams keys lazily and writes in batches of
//! [`MergeConfig::batch_size`], so memory is bounded by one batch regardless
//! of store size. Progress is reported through the [`Progress`] trait against
//! the byte estimate computed by [`estimate_size`].

pub mod config;
pub mod error;
pub mod estimate;
pub mod merger;
pub mod progress;
pub mod transfer;

pub use config::{MergeConfig, TrailingBatch, DEFAULT_BATCH_SIZE, DEFAULT_DESTINATION};
pub use error::{MergeError, MergeResult, TransferError};
pub use estimate::estimate_size;
pub use merger::{MergeSummary, Merger, SourceSummary};
pub use progress::{NoProgress, Progress, ProgressTally, SourceProgress};
pub use transfer::{transfer, TransferOptions, TransferStats};
