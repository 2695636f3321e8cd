use std::path::PathBuf;

/// Describes the source a merge is about to transfer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceProgress {
    pub path: PathBuf,
    /// 1-based position of this source.
    pub index: usize,
    pub total_sources: usize,
    pub estimated_bytes: u64,
}

/// Observer for transfer progress.
///
/// Purely observational: implementations cannot influence control flow.
pub trait Progress {
    /// Called by the merger before each source transfer starts.
    fn source_started(&mut self, _source: &SourceProgress) {}

    /// A transfer of roughly `total_bytes` is starting.
    fn start(&mut self, total_bytes: u64);

    /// `bytes` more payload bytes were read.
    fn advance(&mut self, bytes: u64);

    /// The transfer ended, successfully or not.
    fn finish(&mut self);
}

/// Discards all progress updates.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoProgress;

impl Progress for NoProgress {
    fn start(&mut self, _total_bytes: u64) {}
    fn advance(&mut self, _bytes: u64) {}
    fn finish(&mut self) {}
}

/// Records every update it receives.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProgressTally {
    pub sources: Vec<SourceProgress>,
    pub started: Vec<u64>,
    pub advanced: u64,
    pub advances: u64,
    pub finished: usize,
}

impl Progress for ProgressTally {
    fn source_started(&mut self, source: &SourceProgress) {
        self.sources.push(source.clone());
    }

    fn start(&mut self, total_bytes: u64) {
        self.started.push(total_bytes);
    }

    fn advance(&mut self, bytes: u64) {
        self.advanced += bytes;
        self.advances += 1;
    }

    fn finish(&mut self) {
        self.finished += 1;
    }
}

/// Calls [`Progress::finish`] when dropped, so every exit path of a
/// transfer closes its progress display.
pub(crate) struct ProgressGuard<'a> {
    inner: &'a mut dyn Progress,
}

impl<'a> ProgressGuard<'a> {
    pub(crate) fn start(inner: &'a mut dyn Progress, total_bytes: u64) -> Self {
        inner.start(total_bytes);
        Self { inner }
    }

    pub(crate) fn advance(&mut self, bytes: u64) {
        self.inner.advance(bytes);
    }
}

impl Drop for ProgressGuard<'_> {
    fn drop(&mut self) {
        self.inner.finish();
    }
}
