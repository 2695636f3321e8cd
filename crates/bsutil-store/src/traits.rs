use bsutil_types::{Block, Cid, Context};

use crate::error::StoreResult;

/// One-shot, storage-ordered stream of the keys present in a store.
///
/// Items are produced lazily; per-entry failures (an unreadable directory,
/// a file name that is not a key) surface as individual `Err` items. Any
/// resources the stream holds are released when it is dropped, whether or
/// not it was drained.
pub type KeyStream<'a> = Box<dyn Iterator<Item = StoreResult<Cid>> + 'a>;

/// Content-addressed block store.
///
/// All implementations must satisfy these invariants:
/// - A block's identifier determines its payload. Re-writing an existing
///   identifier is a no-op and is never expected to change the payload.
/// - Each block write in `put_many` is atomic: readers see either no file or
///   the complete payload, never a prefix.
/// - `close` never implies durability. Call `sync` first when it matters.
/// - Every call checks the [`Context`] and fails with a cancelled error once
///   it is cancelled or past its deadline.
pub trait Blockstore {
    /// Start a fresh enumeration of every key physically present.
    fn enumerate(&self, ctx: &Context) -> StoreResult<KeyStream<'_>>;

    /// Read a block. Fails with `NotFound` if the key is absent.
    fn get(&self, ctx: &Context, cid: &Cid) -> StoreResult<Block>;

    /// Check whether a block is present.
    fn has(&self, ctx: &Context, cid: &Cid) -> StoreResult<bool>;

    /// Payload size of a block.
    ///
    /// Default implementation reads the whole block. Backends may override
    /// to answer from metadata.
    fn get_size(&self, ctx: &Context, cid: &Cid) -> StoreResult<u64> {
        self.get(ctx, cid).map(|block| block.size())
    }

    /// Write a batch of blocks.
    ///
    /// On failure the caller cannot assume which blocks, if any, were
    /// persisted. Re-sending blocks that already made it is harmless.
    fn put_many(&self, ctx: &Context, blocks: &[Block]) -> StoreResult<()>;

    /// Write a single block.
    fn put(&self, ctx: &Context, block: &Block) -> StoreResult<()> {
        self.put_many(ctx, std::slice::from_ref(block))
    }

    /// Flush writes under `scope` to stable storage. `"/"` covers the whole
    /// store.
    fn sync(&self, ctx: &Context, scope: &str) -> StoreResult<()>;

    /// Release the handle. Does not sync.
    fn close(self) -> StoreResult<()>
    where
        Self: Sized;
}
