use bsutil_store::{Blockstore, ErrorKind, KeyStream};
use bsutil_types::{Block, Context};
use tracing::{debug, warn};

use crate::config::{TrailingBatch, DEFAULT_BATCH_SIZE};
use crate::error::TransferError;
use crate::progress::{Progress, ProgressGuard};

/// Batching behavior of a transfer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransferOptions {
    /// Blocks per `put_many` call. Bounds the blocks held in memory.
    pub batch_size: usize,
    pub trailing_batch: TrailingBatch,
}

impl Default for TransferOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            trailing_batch: TrailingBatch::default(),
        }
    }
}

/// Counters for one completed transfer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TransferStats {
    /// Blocks read from the source.
    pub blocks_read: u64,
    /// Payload bytes read from the source.
    pub bytes_read: u64,
    /// Blocks handed to a successful `put_many`, including ones the
    /// destination already had.
    pub blocks_written: u64,
    pub batches_flushed: u64,
    /// Blocks read but never written (trailing batch under
    /// [`TrailingBatch::Discard`]).
    pub blocks_dropped: u64,
}

/// Copy every block of `from` into `to`.
///
/// Keys are read in the source's enumeration order and written in batches of
/// `options.batch_size`. Progress advances by each block's payload size as
/// soon as it is read. The first failing `get` or `put_many` aborts the
/// transfer; nothing is retried.
///
/// Under [`TrailingBatch::Flush`] the partially filled last batch is written
/// when the stream ends, and also when a read error aborts the loop, so that
/// blocks already read are not lost. A failing salvage write is logged and the
/// original error returned.
pub fn transfer<F, T>(
    ctx: &Context,
    from: &F,
    to: &T,
    estimated_bytes: u64,
    options: &TransferOptions,
    progress: &mut dyn Progress,
) -> Result<TransferStats, TransferError>
where
    F: Blockstore + ?Sized,
    T: Blockstore + ?Sized,
{
    let batch_size = options.batch_size.max(1);
    let keys = from.enumerate(ctx).map_err(TransferError::Enumerate)?;
    let mut progress = ProgressGuard::start(progress, estimated_bytes);
    let mut batch = Vec::with_capacity(batch_size);
    let mut stats = TransferStats::default();

    let drained = drain(
        ctx,
        keys,
        from,
        to,
        batch_size,
        &mut batch,
        &mut stats,
        &mut progress,
    );

    match (drained, options.trailing_batch) {
        (Ok(()), TrailingBatch::Flush) => {
            flush(ctx, to, &mut batch, &mut stats)?;
        }
        (Ok(()), TrailingBatch::Discard) => {
            if !batch.is_empty() {
                warn!(
                    dropped = batch.len(),
                    "discarding trailing batch; these blocks are not in the destination"
                );
                stats.blocks_dropped = batch.len() as u64;
                batch.clear();
            }
        }
        (Err(err), policy) => {
            let salvage = policy == TrailingBatch::Flush
                && !batch.is_empty()
                && !matches!(err, TransferError::Put { .. })
                && err.kind() != ErrorKind::Cancelled;
            if salvage {
                if let Err(flush_err) = flush(ctx, to, &mut batch, &mut stats) {
                    warn!(error = %flush_err, "could not write blocks read before the failure");
                }
            }
            return Err(err);
        }
    }

    debug!(
        blocks = stats.blocks_read,
        bytes = stats.bytes_read,
        batches = stats.batches_flushed,
        "transfer complete"
    );
    Ok(stats)
}

#[allow(clippy::too_many_arguments)]
fn drain<F, T>(
    ctx: &Context,
    keys: KeyStream<'_>,
    from: &F,
    to: &T,
    batch_size: usize,
    batch: &mut Vec<Block>,
    stats: &mut TransferStats,
    progress: &mut ProgressGuard<'_>,
) -> Result<(), TransferError>
where
    F: Blockstore + ?Sized,
    T: Blockstore + ?Sized,
{
    for key in keys {
        let cid = key.map_err(TransferError::Enumerate)?;
        let block = from
            .get(ctx, &cid)
            .map_err(|source| TransferError::Get { cid, source })?;

        let size = block.size();
        stats.blocks_read += 1;
        stats.bytes_read += size;
        batch.push(block);

        if batch.len() >= batch_size {
            flush(ctx, to, batch, stats)?;
        }
        progress.advance(size);
    }
    Ok(())
}

/// Write and clear `batch`. A failed write leaves it untouched.
fn flush<T>(
    ctx: &Context,
    to: &T,
    batch: &mut Vec<Block>,
    stats: &mut TransferStats,
) -> Result<(), TransferError>
where
    T: Blockstore + ?Sized,
{
    let (Some(first), Some(last)) = (batch.first(), batch.last()) else {
        return Ok(());
    };
    to.put_many(ctx, batch).map_err(|source| TransferError::Put {
        first: first.cid().clone(),
        last: last.cid().clone(),
        count: batch.len(),
        source,
    })?;

    stats.blocks_written += batch.len() as u64;
    stats.batches_flushed += 1;
    debug!(count = batch.len(), first = %first.cid().short(), "flushed batch");
    batch.clear();
    Ok(())
}
