use std::path::Path;

use bsutil_store::flatfs::{README_FILE, SHARDING_FILE, TEMP_PREFIX};
use bsutil_store::StoreResult;
use bsutil_types::Context;
use tracing::debug;
use walkdir::WalkDir;

/// Estimate the payload footprint of the store at `path` in bytes.
///
/// Sums the sizes of all non-directory entries under `path`, minus the
/// store's own metadata files and in-flight temp files. Symlinks are not
/// followed. The result only scales progress output; it is not a block
/// count and may differ from the sum of payload sizes.
pub fn estimate_size(ctx: &Context, path: &Path) -> StoreResult<u64> {
    let mut total = 0u64;
    for entry in WalkDir::new(path) {
        ctx.check()?;
        let entry = entry?;
        if entry.file_type().is_dir() || is_bookkeeping(&entry) {
            continue;
        }
        total += entry.metadata()?.len();
    }
    debug!(path = %path.display(), bytes = total, "estimated store size");
    Ok(total)
}

fn is_bookkeeping(entry: &walkdir::DirEntry) -> bool {
    let name = entry.file_name().to_string_lossy();
    if name.starts_with(TEMP_PREFIX) {
        return true;
    }
    entry.depth() == 1 && (name == SHARDING_FILE || name == README_FILE)
}
