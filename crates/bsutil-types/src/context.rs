use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::TypeError;

/// Cancellation and deadline scope passed to every blocking store call.
///
/// Cloning a `Context` shares the cancellation flag, so a clone handed to
/// another thread (e.g. a signal handler) can cancel the original. Blocking
/// operations call [`Context::check`] at their check points and return
/// promptly once it fails.
#[derive(Clone, Debug, Default)]
pub struct Context {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl Context {
    /// A context that is never cancelled and has no deadline.
    pub fn background() -> Self {
        Self::default()
    }

    /// Derive a context that additionally expires after `timeout`.
    ///
    /// The derived context shares the cancellation flag of `self`. If `self`
    /// already has an earlier deadline, that one is kept.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        let candidate = Instant::now() + timeout;
        let deadline = match self.deadline {
            Some(existing) if existing < candidate => existing,
            _ => candidate,
        };
        Self {
            cancelled: Arc::clone(&self.cancelled),
            deadline: Some(deadline),
        }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// `Ok(())` while the context is live.
    pub fn check(&self) -> Result<(), TypeError> {
        if self.is_cancelled() {
            return Err(TypeError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(TypeError::DeadlineExceeded),
            _ => Ok(()),
        }
    }
}
