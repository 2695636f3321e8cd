use std::collections::BTreeMap;
use std::sync::RwLock;

use bsutil_types::{Block, Cid, Context};

use crate::error::{StoreError, StoreResult};
use crate::traits::{Blockstore, KeyStream};

/// In-memory, `BTreeMap`-based blockstore.
///
/// Intended for tests and embedding. Keys enumerate in sorted order. The
/// enumeration snapshots the key set when it starts.
pub struct InMemoryBlockstore {
    blocks: RwLock<BTreeMap<Cid, Vec<u8>>>,
}

impl InMemoryBlockstore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            blocks: RwLock::new(BTreeMap::new()),
        }
    }

    /// Build a store pre-populated with `blocks`.
    pub fn from_blocks(blocks: impl IntoIterator<Item = Block>) -> Self {
        let map = blocks.into_iter().map(Block::into_parts).collect();
        Self {
            blocks: RwLock::new(map),
        }
    }

    /// Number of blocks currently stored.
    pub fn len(&self) -> usize {
        self.blocks.read().expect("lock poisoned").len()
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.blocks.read().expect("lock poisoned").is_empty()
    }

    /// Total payload bytes across all stored blocks.
    pub fn total_bytes(&self) -> u64 {
        self.blocks
            .read()
            .expect("lock poisoned")
            .values()
            .map(|data| data.len() as u64)
            .sum()
    }

    /// Sorted list of all keys in the store.
    pub fn all_cids(&self) -> Vec<Cid> {
        self.blocks
            .read()
            .expect("lock poisoned")
            .keys()
            .cloned()
            .collect()
    }
}

impl Default for InMemoryBlockstore {
    fn default() -> Self {
        Self::new()
    }
}

impl Blockstore for InMemoryBlockstore {
    fn enumerate(&self, ctx: &Context) -> StoreResult<KeyStream<'_>> {
        ctx.check()?;
        let ctx = ctx.clone();
        let keys = self.all_cids();
        Ok(Box::new(keys.into_iter().map(move |cid| -> StoreResult<Cid> {
            ctx.check()?;
            Ok(cid)
        })))
    }

    fn get(&self, ctx: &Context, cid: &Cid) -> StoreResult<Block> {
        ctx.check()?;
        let map = self.blocks.read().expect("lock poisoned");
        map.get(cid)
            .map(|data| Block::new(cid.clone(), data.clone()))
            .ok_or_else(|| StoreError::NotFound(cid.clone()))
    }

    fn has(&self, ctx: &Context, cid: &Cid) -> StoreResult<bool> {
        ctx.check()?;
        Ok(self.blocks.read().expect("lock poisoned").contains_key(cid))
    }

    fn put_many(&self, ctx: &Context, blocks: &[Block]) -> StoreResult<()> {
        ctx.check()?;
        let mut map = self.blocks.write().expect("lock poisoned");
        for block in blocks {
            // Existing identifiers keep their payload.
            map.entry(block.cid().clone())
                .or_insert_with(|| block.data().to_vec());
        }
        Ok(())
    }

    fn sync(&self, ctx: &Context, _scope: &str) -> StoreResult<()> {
        ctx.check()?;
        Ok(())
    }

    fn close(self) -> StoreResult<()> {
        Ok(())
    }
}

impl std::fmt::Debug for InMemoryBlockstore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryBlockstore")
            .field("block_count", &self.len())
            .finish()
    }
}
