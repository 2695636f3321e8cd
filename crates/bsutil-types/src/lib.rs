//! Foundation types for bsutil.
//!
//! Every other bsutil crate depends on `bsutil-types`.
//!
//! # Key Types
//!
//! - [`Cid`] -- Opaque, filename-safe content identifier
//! - [`Block`] -- An identifier paired with its raw payload
//! - [`Context`] -- Cancellation flag plus optional deadline for blocking calls

pub mod block;
pub mod cid;
pub mod context;
pub mod error;

pub use block::Block;
pub use cid::Cid;
pub use context::Context;
pub use error::TypeError;
