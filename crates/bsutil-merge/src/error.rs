use std::path::PathBuf;

use bsutil_store::{ErrorKind, StoreError};
use bsutil_types::Cid;

/// Errors that abort a single source transfer.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    /// The key stream could not be started, or one of its entries failed.
    #[error("could not enumerate keys: {0}")]
    Enumerate(StoreError),

    /// A key reported by enumeration could not be read back.
    #[error("could not get expected block {cid}: {source}")]
    Get { cid: Cid, source: StoreError },

    /// A batch write to the destination failed.
    #[error("could not write batch of {count} blocks ({first}..{last}): {source}")]
    Put {
        first: Cid,
        last: Cid,
        count: usize,
        source: StoreError,
    },
}

impl TransferError {
    /// The store error underneath this failure.
    pub fn store_error(&self) -> &StoreError {
        match self {
            Self::Enumerate(source) | Self::Get { source, .. } | Self::Put { source, .. } => source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.store_error().kind()
    }
}

/// Errors that abort a merge run.
#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    #[error("at least one source blockstore is required")]
    NoSources,

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("could not initialize destination {}: {source}", .path.display())]
    InitDestination { path: PathBuf, source: StoreError },

    #[error("could not open destination {}: {source}", .path.display())]
    OpenDestination { path: PathBuf, source: StoreError },

    #[error(
        "could not open source {} ({completed} of {total} sources merged): {source}",
        .path.display()
    )]
    OpenSource {
        path: PathBuf,
        completed: usize,
        total: usize,
        source: StoreError,
    },

    #[error(
        "could not estimate size of {} ({completed} of {total} sources merged): {source}",
        .path.display()
    )]
    EstimateSize {
        path: PathBuf,
        completed: usize,
        total: usize,
        source: StoreError,
    },

    #[error(
        "merging {} failed ({completed} of {total} sources merged): {source}",
        .path.display()
    )]
    Transfer {
        path: PathBuf,
        completed: usize,
        total: usize,
        source: TransferError,
    },

    #[error("could not sync destination {}: {source}", .path.display())]
    SyncDestination { path: PathBuf, source: StoreError },

    #[error("could not close destination {}: {source}", .path.display())]
    CloseDestination { path: PathBuf, source: StoreError },
}

impl MergeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NoSources | Self::Config(_) => ErrorKind::InvalidInput,
            Self::Transfer { source, .. } => source.kind(),
            Self::InitDestination { source, .. }
            | Self::OpenDestination { source, .. }
            | Self::OpenSource { source, .. }
            | Self::EstimateSize { source, .. }
            | Self::SyncDestination { source, .. }
            | Self::CloseDestination { source, .. } => source.kind(),
        }
    }

    /// How many sources were fully merged before a per-source failure.
    pub fn sources_completed(&self) -> Option<usize> {
        match self {
            Self::OpenSource { completed, .. }
            | Self::EstimateSize { completed, .. }
            | Self::Transfer { completed, .. } => Some(*completed),
            _ => None,
        }
    }
}

pub type MergeResult<T> = Result<T, MergeError>;
