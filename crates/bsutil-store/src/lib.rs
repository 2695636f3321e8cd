//! Content-addressed blockstores for bsutil.
//!
//! A blockstore maps opaque content identifiers to immutable byte payloads.
//! The on-disk backend lays blocks out one file per block in a directory
//! tree sharded by a fixed function of the key, in the flatfs format.
//!
//! # Storage Backends
//!
//! All backends implement the [`Blockstore`] trait:
//!
//! - [`FlatfsBlockstore`] -- directory-sharded store on the local filesystem
//! - [`InMemoryBlockstore`] -- `BTreeMap`-based store for tests and embedding
//!
//! # Design Rules
//!
//! 1. Blocks are immutable once written; rewriting a key is a no-op.
//! 2. Each block write is atomic (temp file, then rename).
//! 3. Durability is explicit: `sync` before `close`.
//! 4. Key enumeration is lazy, single-pass, and in storage-layout order.
//! 5. The store never interprets payloads.
//! 6. All I/O errors are propagated with the path they occurred on.

pub mod error;
pub mod flatfs;
pub mod memory;
pub mod shard;
pub mod traits;

// Re-export primary types at crate root for ergonomic imports.
pub use error::{ErrorKind, StoreError, StoreResult};
pub use flatfs::{FlatfsBlockstore, FlatfsOptions};
pub use memory::InMemoryBlockstore;
pub use shard::ShardFunc;
pub use traits::{Blockstore, KeyStream};
