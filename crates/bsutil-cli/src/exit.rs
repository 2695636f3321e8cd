use bsutil_merge::{MergeError, TransferError};
use bsutil_store::{ErrorKind, StoreError};

pub const GENERIC: u8 = 1;
pub const NOT_FOUND: u8 = 3;
pub const ALREADY_EXISTS: u8 = 4;
pub const INVALID_LAYOUT: u8 = 5;
pub const IO: u8 = 6;
pub const CANCELLED: u8 = 130;

/// Process exit status for a failed command.
///
/// Walks the error chain for the first library error that carries an
/// [`ErrorKind`]; anything else exits with [`GENERIC`].
pub fn code_for(err: &anyhow::Error) -> u8 {
    err.chain()
        .find_map(|e| {
            if let Some(e) = e.downcast_ref::<MergeError>() {
                return Some(e.kind());
            }
            if let Some(e) = e.downcast_ref::<TransferError>() {
                return Some(e.kind());
            }
            e.downcast_ref::<StoreError>().map(StoreError::kind)
        })
        .map_or(GENERIC, code_for_kind)
}

fn code_for_kind(kind: ErrorKind) -> u8 {
    match kind {
        ErrorKind::NotFound => NOT_FOUND,
        ErrorKind::AlreadyExists => ALREADY_EXISTS,
        ErrorKind::InvalidLayout => INVALID_LAYOUT,
        ErrorKind::Io => IO,
        ErrorKind::Cancelled => CANCELLED,
        ErrorKind::InvalidInput => GENERIC,
    }
}
