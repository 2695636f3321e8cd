//! Directory-sharded blockstore compatible with the flatfs on-disk format.
//!
//! Layout:
//! ```text
//! <root>/SHARDING            shard function descriptor, written last on init
//! <root>/_README             human-readable description
//! <root>/<shard>/<key>.data  one file per block
//! ```
//!
//! Block files are written to a `.temp*` file in the shard directory and
//! renamed into place, so a reader never observes a partially written block.

use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use bsutil_types::{Block, Cid, Context};
use tracing::{debug, info, trace, warn};
use walkdir::WalkDir;

use crate::error::{StoreError, StoreResult};
use crate::shard::ShardFunc;
use crate::traits::{Blockstore, KeyStream};

pub const SHARDING_FILE: &str = "SHARDING";
pub const README_FILE: &str = "_README";
pub const DATA_EXTENSION: &str = ".data";
pub const TEMP_PREFIX: &str = ".temp";

/// Tuning knobs for a [`FlatfsBlockstore`] handle.
#[derive(Clone, Debug)]
pub struct FlatfsOptions {
    /// `fsync` every block file before renaming it into place. When off,
    /// block files are fsynced by the next covering `sync` call instead.
    pub sync_writes: bool,
}

impl Default for FlatfsOptions {
    fn default() -> Self {
        Self { sync_writes: true }
    }
}

/// Paths written since the last covering `sync`.
#[derive(Debug, Default)]
struct PendingSync {
    dirs: BTreeSet<PathBuf>,
    files: BTreeSet<PathBuf>,
}

impl PendingSync {
    fn len(&self) -> usize {
        self.dirs.len() + self.files.len()
    }

    fn is_empty(&self) -> bool {
        self.dirs.is_empty() && self.files.is_empty()
    }
}

/// Handle on an on-disk sharded blockstore.
///
/// The handle assumes exclusive write access; it does not lock the directory
/// against other processes.
pub struct FlatfsBlockstore {
    root: PathBuf,
    shard: ShardFunc,
    read_only: bool,
    options: FlatfsOptions,
    pending: Mutex<PendingSync>,
}

impl FlatfsBlockstore {
    /// Create the on-disk layout at `path`.
    ///
    /// The `SHARDING` file is written last, atomically, so a crash during
    /// initialization never leaves something that opens as a valid store.
    /// Fails without writing anything if `path` already holds a store.
    pub fn initialize(path: impl AsRef<Path>, shard: ShardFunc) -> StoreResult<()> {
        let root = path.as_ref();
        if let Some(existing) = read_sharding(root)? {
            if existing == shard {
                return Err(StoreError::AlreadyExists(root.to_path_buf()));
            }
            return Err(StoreError::ShardingMismatch {
                path: root.to_path_buf(),
                existing: existing.descriptor(),
                requested: shard.descriptor(),
            });
        }

        fs::create_dir_all(root).map_err(|e| StoreError::io_at(root, e))?;
        write_atomic(root, README_FILE, readme(&shard).as_bytes())?;
        write_atomic(
            root,
            SHARDING_FILE,
            format!("{}\n", shard.descriptor()).as_bytes(),
        )?;
        sync_dir(root)?;

        info!(path = %root.display(), shard = %shard.short_form(), "initialized blockstore");
        Ok(())
    }

    /// Open an existing store with default options.
    pub fn open(path: impl AsRef<Path>, read_only: bool) -> StoreResult<Self> {
        Self::open_with(path, read_only, FlatfsOptions::default())
    }

    pub fn open_with(
        path: impl AsRef<Path>,
        read_only: bool,
        options: FlatfsOptions,
    ) -> StoreResult<Self> {
        let root = path.as_ref().to_path_buf();
        let meta = match fs::metadata(&root) {
            Ok(meta) => meta,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StoreError::StoreNotFound(root));
            }
            Err(e) => return Err(StoreError::io_at(root, e)),
        };
        if !meta.is_dir() {
            return Err(StoreError::InvalidLayout {
                path: root,
                reason: "not a directory".into(),
            });
        }
        let shard = read_sharding(&root)?.ok_or_else(|| StoreError::InvalidLayout {
            path: root.clone(),
            reason: format!("missing {SHARDING_FILE} file"),
        })?;

        debug!(path = %root.display(), shard = %shard.short_form(), read_only, "opened blockstore");
        Ok(Self {
            root,
            shard,
            read_only,
            options,
            pending: Mutex::new(PendingSync::default()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    pub fn shard(&self) -> ShardFunc {
        self.shard
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Number of files and directories written but not yet synced.
    pub fn unsynced(&self) -> usize {
        self.lock_pending().len()
    }

    /// Location of the block file for `cid`.
    pub fn block_path(&self, cid: &Cid) -> PathBuf {
        self.shard_path(cid).join(format!("{cid}{DATA_EXTENSION}"))
    }

    fn shard_path(&self, cid: &Cid) -> PathBuf {
        self.root.join(self.shard.shard_dir(cid.as_str()))
    }

    fn lock_pending(&self) -> MutexGuard<'_, PendingSync> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Write one block. Returns `false` if it was already present.
    fn write_block(&self, block: &Block) -> StoreResult<bool> {
        let target = self.block_path(block.cid());
        match fs::metadata(&target) {
            Ok(_) => {
                trace!(cid = %block.cid(), "block already present");
                return Ok(false);
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(StoreError::io_at(target, e)),
        }

        let dir = self.shard_path(block.cid());
        let created_dir = match fs::create_dir(&dir) {
            Ok(()) => true,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => false,
            Err(e) => return Err(StoreError::io_at(dir, e)),
        };

        let mut tmp = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .tempfile_in(&dir)
            .map_err(|e| StoreError::io_at(&dir, e))?;
        tmp.write_all(block.data())
            .map_err(|e| StoreError::io_at(tmp.path(), e))?;
        if self.options.sync_writes {
            tmp.as_file()
                .sync_all()
                .map_err(|e| StoreError::io_at(tmp.path(), e))?;
        }
        tmp.persist(&target)
            .map_err(|e| StoreError::io_at(&target, e.error))?;

        let mut pending = self.lock_pending();
        if created_dir {
            pending.dirs.insert(self.root.clone());
        }
        pending.dirs.insert(dir);
        if !self.options.sync_writes {
            pending.files.insert(target);
        }
        Ok(true)
    }

    /// Snapshot of the pending paths covered by `scope`.
    fn pending_in_scope(&self, scope: &str) -> (Vec<PathBuf>, Vec<PathBuf>) {
        let pending = self.lock_pending();
        let scope = scope.trim_matches('/');
        if scope.is_empty() {
            return (
                pending.files.iter().cloned().collect(),
                pending.dirs.iter().cloned().collect(),
            );
        }
        let shard_dir = self.root.join(scope);
        let files = pending
            .files
            .iter()
            .filter(|f| f.parent() == Some(shard_dir.as_path()))
            .cloned()
            .collect();
        let dirs = pending
            .dirs
            .iter()
            .filter(|d| **d == shard_dir)
            .cloned()
            .collect();
        (files, dirs)
    }
}

impl Blockstore for FlatfsBlockstore {
    fn enumerate(&self, ctx: &Context) -> StoreResult<KeyStream<'_>> {
        ctx.check()?;
        // walkdir defers the root read error to the first item; surface it
        // here instead.
        fs::read_dir(&self.root).map_err(|e| StoreError::io_at(&self.root, e))?;

        let walker = WalkDir::new(&self.root)
            .min_depth(1)
            .max_depth(2)
            .sort_by_file_name()
            .into_iter();
        Ok(Box::new(FlatfsKeys {
            walker,
            ctx: ctx.clone(),
            done: false,
        }))
    }

    fn get(&self, ctx: &Context, cid: &Cid) -> StoreResult<Block> {
        ctx.check()?;
        let path = self.block_path(cid);
        match fs::read(&path) {
            Ok(data) => Ok(Block::new(cid.clone(), data)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(StoreError::NotFound(cid.clone())),
            Err(e) => Err(StoreError::io_at(path, e)),
        }
    }

    fn has(&self, ctx: &Context, cid: &Cid) -> StoreResult<bool> {
        ctx.check()?;
        let path = self.block_path(cid);
        match fs::metadata(&path) {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StoreError::io_at(path, e)),
        }
    }

    fn get_size(&self, ctx: &Context, cid: &Cid) -> StoreResult<u64> {
        ctx.check()?;
        let path = self.block_path(cid);
        match fs::metadata(&path) {
            Ok(meta) => Ok(meta.len()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(StoreError::NotFound(cid.clone())),
            Err(e) => Err(StoreError::io_at(path, e)),
        }
    }

    fn put_many(&self, ctx: &Context, blocks: &[Block]) -> StoreResult<()> {
        if self.read_only {
            return Err(StoreError::ReadOnly);
        }
        let mut written = 0usize;
        for block in blocks {
            ctx.check()?;
            if self.write_block(block)? {
                written += 1;
            }
        }
        debug!(batch = blocks.len(), written, "put_many");
        Ok(())
    }

    fn sync(&self, ctx: &Context, scope: &str) -> StoreResult<()> {
        ctx.check()?;
        let (files, dirs) = self.pending_in_scope(scope);
        for file in &files {
            ctx.check()?;
            sync_file(file)?;
        }
        for dir in &dirs {
            ctx.check()?;
            sync_dir(dir)?;
        }

        let mut pending = self.lock_pending();
        for file in &files {
            pending.files.remove(file);
        }
        for dir in &dirs {
            pending.dirs.remove(dir);
        }
        debug!(scope, files = files.len(), dirs = dirs.len(), "synced blockstore");
        Ok(())
    }

    fn close(self) -> StoreResult<()> {
        let pending = self
            .pending
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);
        if !pending.is_empty() {
            warn!(
                path = %self.root.display(),
                unsynced = pending.len(),
                "closing blockstore with unsynced writes"
            );
        }
        debug!(path = %self.root.display(), "closed blockstore");
        Ok(())
    }
}

impl std::fmt::Debug for FlatfsBlockstore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlatfsBlockstore")
            .field("root", &self.root)
            .field("shard", &self.shard.short_form())
            .field("read_only", &self.read_only)
            .finish()
    }
}

/// Lazy key stream over a sorted walk of the shard directories.
struct FlatfsKeys {
    walker: walkdir::IntoIter,
    ctx: Context,
    done: bool,
}

impl Iterator for FlatfsKeys {
    type Item = StoreResult<Cid>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            if let Err(e) = self.ctx.check() {
                self.done = true;
                return Some(Err(e.into()));
            }
            let entry = match self.walker.next()? {
                Ok(entry) => entry,
                Err(e) => return Some(Err(e.into())),
            };
            let name = entry.file_name().to_string_lossy();

            if entry.depth() == 1 {
                // Root-level files are metadata; hidden directories are not shards.
                if entry.file_type().is_dir() && name.starts_with('.') {
                    self.walker.skip_current_dir();
                }
                continue;
            }

            if !entry.file_type().is_file() || name.starts_with(TEMP_PREFIX) {
                continue;
            }
            let Some(stem) = name.strip_suffix(DATA_EXTENSION) else {
                continue;
            };
            return Some(Cid::new(stem).map_err(|source| StoreError::InvalidKey {
                path: entry.path().to_path_buf(),
                source,
            }));
        }
    }
}

/// Read and parse `<root>/SHARDING`. `Ok(None)` if the file does not exist.
fn read_sharding(root: &Path) -> StoreResult<Option<ShardFunc>> {
    let path = root.join(SHARDING_FILE);
    match fs::read_to_string(&path) {
        Ok(contents) => ShardFunc::parse(&contents)
            .map(Some)
            .map_err(|e| StoreError::InvalidLayout {
                path: root.to_path_buf(),
                reason: e.to_string(),
            }),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(StoreError::io_at(path, e)),
    }
}

fn write_atomic(dir: &Path, name: &str, contents: &[u8]) -> StoreResult<()> {
    let target = dir.join(name);
    let mut tmp = tempfile::Builder::new()
        .prefix(TEMP_PREFIX)
        .tempfile_in(dir)
        .map_err(|e| StoreError::io_at(dir, e))?;
    tmp.write_all(contents)
        .and_then(|()| tmp.as_file().sync_all())
        .map_err(|e| StoreError::io_at(&target, e))?;
    tmp.persist(&target)
        .map_err(|e| StoreError::io_at(&target, e.error))?;
    Ok(())
}

fn sync_file(path: &Path) -> StoreResult<()> {
    File::open(path)
        .and_then(|f| f.sync_all())
        .map_err(|e| StoreError::io_at(path, e))
}

#[cfg(unix)]
fn sync_dir(path: &Path) -> StoreResult<()> {
    sync_file(path)
}

// Directories cannot be opened for fsync outside unix.
#[cfg(not(unix))]
fn sync_dir(_path: &Path) -> StoreResult<()> {
    Ok(())
}

fn readme(shard: &ShardFunc) -> String {
    format!(
        "This is a repository of blocks stored as individual files.\n\
         \n\
         Each block lives at <shard>/<key>{DATA_EXTENSION}, where <shard> is\n\
         computed by the function recorded in the {SHARDING_FILE} file:\n\
         \n\
         \x20   {}\n\
         \n\
         Do not edit the files in this directory by hand.\n",
        shard.descriptor()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn cid(key: &str) -> Cid {
        Cid::new(key).unwrap()
    }

    fn block(key: &str, data: &[u8]) -> Block {
        Block::new(cid(key), data.to_vec())
    }

    fn new_store(dir: &Path) -> FlatfsBlockstore {
        FlatfsBlockstore::initialize(dir, ShardFunc::NextToLast(3)).unwrap();
        FlatfsBlockstore::open(dir, false).unwrap()
    }

    fn collect_keys(store: &FlatfsBlockstore) -> Vec<Cid> {
        store
            .enumerate(&Context::background())
            .unwrap()
            .collect::<StoreResult<Vec<_>>>()
            .unwrap()
    }

    fn dir_listing(dir: &Path) -> Vec<(PathBuf, u64)> {
        WalkDir::new(dir)
            .sort_by_file_name()
            .into_iter()
            .map(|e| {
                let e = e.unwrap();
                (e.path().to_path_buf(), e.metadata().unwrap().len())
            })
            .collect()
    }

    // -----------------------------------------------------------------------
    // Initialize / open
    // -----------------------------------------------------------------------

    #[test]
    fn initialize_writes_sharding_and_readme() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("store");
        FlatfsBlockstore::initialize(&root, ShardFunc::NextToLast(3)).unwrap();

        let sharding = fs::read_to_string(root.join(SHARDING_FILE)).unwrap();
        assert_eq!(sharding, "/repo/flatfs/shard/v1/next-to-last/3\n");
        assert!(root.join(README_FILE).is_file());
    }

    #[test]
    fn initialize_twice_fails_without_writing() {
        let dir = tempfile::tempdir().unwrap();
        let store = new_store(dir.path());
        store
            .put(&Context::background(), &block("k1", b"one"))
            .unwrap();
        let before = dir_listing(dir.path());

        let err = FlatfsBlockstore::initialize(dir.path(), ShardFunc::NextToLast(3)).unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(_)));
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
        assert_eq!(dir_listing(dir.path()), before);
    }

    #[test]
    fn initialize_with_other_sharding_is_a_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        FlatfsBlockstore::initialize(dir.path(), ShardFunc::Prefix(2)).unwrap();
        let err = FlatfsBlockstore::initialize(dir.path(), ShardFunc::NextToLast(3)).unwrap_err();
        assert!(matches!(err, StoreError::ShardingMismatch { .. }));
        assert_eq!(err.kind(), ErrorKind::InvalidLayout);
    }

    #[test]
    fn open_missing_path_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = FlatfsBlockstore::open(dir.path().join("nope"), true).unwrap_err();
        assert!(matches!(err, StoreError::StoreNotFound(_)));
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn open_plain_directory_is_invalid_layout() {
        let dir = tempfile::tempdir().unwrap();
        let err = FlatfsBlockstore::open(dir.path(), true).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidLayout);
    }

    #[test]
    fn open_file_is_invalid_layout() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("file");
        fs::write(&file, b"x").unwrap();
        let err = FlatfsBlockstore::open(&file, true).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidLayout);
    }

    #[test]
    fn open_corrupt_sharding_is_invalid_layout() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(SHARDING_FILE), "garbage\n").unwrap();
        let err = FlatfsBlockstore::open(dir.path(), false).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidLayout);
    }

    #[test]
    fn open_reads_recorded_shard() {
        let dir = tempfile::tempdir().unwrap();
        FlatfsBlockstore::initialize(dir.path(), ShardFunc::Suffix(2)).unwrap();
        let store = FlatfsBlockstore::open(dir.path(), true).unwrap();
        assert_eq!(store.shard(), ShardFunc::Suffix(2));
        assert!(store.is_read_only());
    }

    // -----------------------------------------------------------------------
    // Reads and writes
    // -----------------------------------------------------------------------

    #[test]
    fn put_then_get_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = new_store(dir.path());
        let ctx = Context::background();
        let blocks = vec![block("k1", b"one"), block("k2", b"two"), block("k3", b"")];
        store.put_many(&ctx, &blocks).unwrap();

        for b in &blocks {
            assert_eq!(store.get(&ctx, b.cid()).unwrap(), *b);
            assert!(store.has(&ctx, b.cid()).unwrap());
            assert_eq!(store.get_size(&ctx, b.cid()).unwrap(), b.size());
        }
    }

    #[test]
    fn block_lands_in_shard_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = new_store(dir.path());
        store
            .put(&Context::background(), &block("CIQFOOX", b"payload"))
            .unwrap();
        let expected = dir.path().join("FOO").join("CIQFOOX.data");
        assert_eq!(store.block_path(&cid("CIQFOOX")), expected);
        assert_eq!(fs::read(expected).unwrap(), b"payload");
    }

    #[test]
    fn get_missing_block_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = new_store(dir.path());
        let ctx = Context::background();
        let err = store.get(&ctx, &cid("absent")).unwrap_err();
        assert!(matches!(err, StoreError::NotFound(ref c) if c.as_str() == "absent"));
        assert!(!store.has(&ctx, &cid("absent")).unwrap());
    }

    #[test]
    fn rewriting_existing_block_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let store = new_store(dir.path());
        let ctx = Context::background();
        store.put(&ctx, &block("k1", b"original")).unwrap();
        store.put(&ctx, &block("k1", b"original")).unwrap();
        assert_eq!(collect_keys(&store), vec![cid("k1")]);
        assert_eq!(store.get(&ctx, &cid("k1")).unwrap().data(), b"original");
    }

    #[test]
    fn read_only_handle_rejects_writes() {
        let dir = tempfile::tempdir().unwrap();
        FlatfsBlockstore::initialize(dir.path(), ShardFunc::default()).unwrap();
        let store = FlatfsBlockstore::open(dir.path(), true).unwrap();
        let err = store
            .put(&Context::background(), &block("k1", b"x"))
            .unwrap_err();
        assert!(matches!(err, StoreError::ReadOnly));
    }

    #[test]
    fn no_temp_files_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let store = new_store(dir.path());
        let blocks: Vec<_> = (0..20).map(|i| block(&format!("k{i}"), b"data")).collect();
        store.put_many(&Context::background(), &blocks).unwrap();
        let temps = WalkDir::new(dir.path())
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().starts_with(TEMP_PREFIX))
            .count();
        assert_eq!(temps, 0);
    }

    // -----------------------------------------------------------------------
    // Enumeration
    // -----------------------------------------------------------------------

    #[test]
    fn enumerate_yields_every_key_in_layout_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = new_store(dir.path());
        let keys: Vec<String> = (1..=40).map(|i| format!("k{i}")).collect();
        let blocks: Vec<_> = keys.iter().map(|k| block(k, k.as_bytes())).collect();
        store.put_many(&Context::background(), &blocks).unwrap();

        let shard = store.shard();
        let mut expected = keys.clone();
        expected.sort_by_key(|k| (shard.shard_dir(k), format!("{k}{DATA_EXTENSION}")));
        let listed: Vec<String> = collect_keys(&store)
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(listed, expected);
    }

    #[test]
    fn enumerate_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = new_store(dir.path());
        assert!(collect_keys(&store).is_empty());
    }

    #[test]
    fn enumerate_skips_temp_and_foreign_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = new_store(dir.path());
        store
            .put(&Context::background(), &block("k1", b"x"))
            .unwrap();
        let shard_dir = dir.path().join("__k");
        fs::write(shard_dir.join(".temp-crashed"), b"partial").unwrap();
        fs::write(shard_dir.join("notes.txt"), b"hello").unwrap();
        fs::create_dir(dir.path().join(".hidden")).unwrap();
        fs::write(dir.path().join(".hidden").join("x.data"), b"x").unwrap();

        assert_eq!(collect_keys(&store), vec![cid("k1")]);
    }

    #[test]
    fn enumerate_surfaces_bad_entries_individually() {
        let dir = tempfile::tempdir().unwrap();
        let store = new_store(dir.path());
        store
            .put_many(
                &Context::background(),
                &[block("k1", b"x"), block("k2", b"y")],
            )
            .unwrap();
        fs::write(dir.path().join("__k").join("bad key.data"), b"z").unwrap();

        let items: Vec<_> = store.enumerate(&Context::background()).unwrap().collect();
        assert_eq!(items.len(), 3);
        let errors: Vec<_> = items.iter().filter(|r| r.is_err()).collect();
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], Err(StoreError::InvalidKey { .. })));
    }

    #[test]
    fn enumerate_is_fresh_on_each_call() {
        let dir = tempfile::tempdir().unwrap();
        let store = new_store(dir.path());
        let ctx = Context::background();
        store.put(&ctx, &block("k1", b"x")).unwrap();
        assert_eq!(collect_keys(&store).len(), 1);
        store.put(&ctx, &block("k2", b"y")).unwrap();
        assert_eq!(collect_keys(&store).len(), 2);
    }

    #[test]
    fn enumerate_stops_when_cancelled() {
        let dir = tempfile::tempdir().unwrap();
        let store = new_store(dir.path());
        let ctx = Context::background();
        let blocks: Vec<_> = (0..10).map(|i| block(&format!("k{i}"), b"x")).collect();
        store.put_many(&ctx, &blocks).unwrap();

        let mut stream = store.enumerate(&ctx).unwrap();
        assert!(stream.next().unwrap().is_ok());
        ctx.cancel();
        assert!(matches!(stream.next(), Some(Err(StoreError::Cancelled))));
        assert!(stream.next().is_none());
    }

    // -----------------------------------------------------------------------
    // Cancellation / sync / close
    // -----------------------------------------------------------------------

    #[test]
    fn cancelled_context_fails_every_call() {
        let dir = tempfile::tempdir().unwrap();
        let store = new_store(dir.path());
        let ctx = Context::background();
        ctx.cancel();
        assert_eq!(store.get(&ctx, &cid("k1")).unwrap_err().kind(), ErrorKind::Cancelled);
        assert_eq!(
            store.put(&ctx, &block("k1", b"x")).unwrap_err().kind(),
            ErrorKind::Cancelled
        );
        assert_eq!(store.sync(&ctx, "/").unwrap_err().kind(), ErrorKind::Cancelled);
        assert!(store.enumerate(&ctx).is_err());
    }

    #[test]
    fn sync_clears_pending_writes() {
        let dir = tempfile::tempdir().unwrap();
        FlatfsBlockstore::initialize(dir.path(), ShardFunc::default()).unwrap();
        let store = FlatfsBlockstore::open_with(
            dir.path(),
            false,
            FlatfsOptions { sync_writes: false },
        )
        .unwrap();
        let ctx = Context::background();
        store.put(&ctx, &block("k1", b"x")).unwrap();
        // block file, shard dir, root dir
        assert_eq!(store.unsynced(), 3);

        store.sync(&ctx, "/__k").unwrap();
        assert_eq!(store.unsynced(), 1);
        store.sync(&ctx, "/").unwrap();
        assert_eq!(store.unsynced(), 0);
    }

    #[test]
    fn close_does_not_require_sync() {
        let dir = tempfile::tempdir().unwrap();
        let store = new_store(dir.path());
        store
            .put(&Context::background(), &block("k1", b"x"))
            .unwrap();
        assert!(store.unsynced() > 0);
        store.close().unwrap();

        let reopened = FlatfsBlockstore::open(dir.path(), true).unwrap();
        assert_eq!(collect_keys(&reopened), vec![cid("k1")]);
    }
}
