use std::io;
use std::path::PathBuf;

use bsutil_types::{Cid, TypeError};

/// Coarse classification of store failures.
///
/// Callers that need to react to a failure (the CLI choosing an exit code,
/// tests asserting on collisions) match on the kind instead of the variant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A store or key is missing.
    NotFound,
    /// The destination path is already an initialized store.
    AlreadyExists,
    /// The path exists but is not a valid store.
    InvalidLayout,
    /// Filesystem or storage failure.
    Io,
    /// The context was cancelled or its deadline passed.
    Cancelled,
    /// The caller asked for something the store cannot do.
    InvalidInput,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::NotFound => "not found",
            Self::AlreadyExists => "already exists",
            Self::InvalidLayout => "invalid layout",
            Self::Io => "i/o",
            Self::Cancelled => "cancelled",
            Self::InvalidInput => "invalid input",
        };
        f.write_str(name)
    }
}

/// Errors from blockstore operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested block was not found.
    #[error("block not found: {0}")]
    NotFound(Cid),

    /// No blockstore exists at the path.
    #[error("no blockstore at {}", .0.display())]
    StoreNotFound(PathBuf),

    /// The path already holds an initialized blockstore.
    #[error("blockstore already exists at {}", .0.display())]
    AlreadyExists(PathBuf),

    /// The path exists but does not hold a usable blockstore.
    #[error("invalid blockstore layout at {}: {reason}", .path.display())]
    InvalidLayout { path: PathBuf, reason: String },

    /// The path holds a blockstore sharded differently than requested.
    #[error(
        "blockstore at {} uses sharding {existing}, requested {requested}",
        .path.display()
    )]
    ShardingMismatch {
        path: PathBuf,
        existing: String,
        requested: String,
    },

    /// A shard function descriptor could not be parsed.
    #[error("invalid shard function: {0:?}")]
    InvalidShardFunc(String),

    /// A file in the store does not decode to a valid key.
    #[error("invalid key file {}: {source}", .path.display())]
    InvalidKey {
        path: PathBuf,
        #[source]
        source: TypeError,
    },

    /// I/O error on a specific path.
    #[error("I/O error on {}: {source}", .path.display())]
    IoAt {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Write attempted through a read-only handle.
    #[error("store is read-only")]
    ReadOnly,

    /// The context was cancelled.
    #[error("operation cancelled")]
    Cancelled,

    /// The context deadline passed.
    #[error("deadline exceeded")]
    DeadlineExceeded,

    /// A caller-supplied value was rejected.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) | Self::StoreNotFound(_) => ErrorKind::NotFound,
            Self::AlreadyExists(_) => ErrorKind::AlreadyExists,
            Self::InvalidLayout { .. }
            | Self::ShardingMismatch { .. }
            | Self::InvalidShardFunc(_)
            | Self::InvalidKey { .. } => ErrorKind::InvalidLayout,
            Self::IoAt { .. } | Self::Io(_) => ErrorKind::Io,
            Self::Cancelled | Self::DeadlineExceeded => ErrorKind::Cancelled,
            Self::ReadOnly | Self::InvalidInput(_) => ErrorKind::InvalidInput,
        }
    }

    pub(crate) fn io_at(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::IoAt {
            path: path.into(),
            source,
        }
    }
}

impl From<TypeError> for StoreError {
    fn from(err: TypeError) -> Self {
        match err {
            TypeError::Cancelled => Self::Cancelled,
            TypeError::DeadlineExceeded => Self::DeadlineExceeded,
            other => Self::InvalidInput(other.to_string()),
        }
    }
}

impl From<walkdir::Error> for StoreError {
    fn from(err: walkdir::Error) -> Self {
        let path = err.path().map(PathBuf::from).unwrap_or_default();
        let source = err
            .into_io_error()
            .unwrap_or_else(|| io::Error::new(io::ErrorKind::Other, "filesystem loop detected"));
        Self::IoAt { path, source }
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
