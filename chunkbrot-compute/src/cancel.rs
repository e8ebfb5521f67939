use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

// ---------------------------------------------------------------------------
// Pass cancellation
// ---------------------------------------------------------------------------

/// Tracks the current pass generation for cancellation and progress.
///
/// Incrementing the generation signals every in-flight chunk task to stop at
/// its next checkpoint. The progress counters count chunk tasks that have
/// finished in the current pass.
#[derive(Debug)]
pub struct PassCancel {
    generation: AtomicU64,
    progress_done: AtomicUsize,
    progress_total: AtomicUsize,
}

impl PassCancel {
    pub fn new() -> Self {
        Self {
            generation: AtomicU64::new(0),
            progress_done: AtomicUsize::new(0),
            progress_total: AtomicUsize::new(0),
        }
    }

    /// Cancel the pass in flight by advancing the generation.
    pub fn cancel(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Reset progress for a new pass with `total` chunk tasks.
    pub fn reset_progress(&self, total: usize) {
        self.progress_total.store(total, Ordering::Relaxed);
        self.progress_done.store(0, Ordering::Relaxed);
    }

    pub fn inc_progress(&self) {
        self.progress_done.fetch_add(1, Ordering::Relaxed);
    }

    /// `(done, total)` for the current pass.
    pub fn progress(&self) -> (usize, usize) {
        (
            self.progress_done.load(Ordering::Relaxed),
            self.progress_total.load(Ordering::Relaxed),
        )
    }

    /// Capture the current generation for a pass about to start.
    pub fn checkpoint<'a>(&'a self, stopped: &'a AtomicBool) -> Checkpoint<'a> {
        Checkpoint {
            cancel: self,
            generation: self.generation(),
            stopped,
        }
    }
}

impl Default for PassCancel {
    fn default() -> Self {
        Self::new()
    }
}

/// A generation snapshot plus the engine's stop flag.
///
/// Chunk tasks poll [`Checkpoint::tripped`] before each cell.
#[derive(Debug, Clone, Copy)]
pub struct Checkpoint<'a> {
    cancel: &'a PassCancel,
    generation: u64,
    stopped: &'a AtomicBool,
}

impl Checkpoint<'_> {
    #[inline]
    pub fn tripped(&self) -> bool {
        self.stopped.load(Ordering::Relaxed) || self.cancel.generation() != self.generation
    }
}

/// Cloneable handle that stops an engine from another thread.
///
/// Stopping is permanent: the pass in flight returns early and every later
/// pass is refused.
#[derive(Debug, Clone)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub(crate) fn new(flag: Arc<AtomicBool>) -> Self {
        Self(flag)
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checkpoint_trips_on_cancel() {
        let cancel = PassCancel::new();
        let stopped = AtomicBool::new(false);
        let cp = cancel.checkpoint(&stopped);
        assert!(!cp.tripped());
        cancel.cancel();
        assert!(cp.tripped());
        // A fresh checkpoint starts clean again.
        assert!(!cancel.checkpoint(&stopped).tripped());
    }

    #[test]
    fn checkpoint_trips_on_stop() {
        let cancel = PassCancel::new();
        let flag = Arc::new(AtomicBool::new(false));
        let handle = StopHandle::new(Arc::clone(&flag));
        let cp = cancel.checkpoint(&flag);
        handle.stop();
        assert!(handle.is_stopped());
        assert!(cp.tripped());
    }

    #[test]
    fn progress_counts_reset_per_pass() {
        let cancel = PassCancel::new();
        cancel.reset_progress(4);
        cancel.inc_progress();
        cancel.inc_progress();
        assert_eq!(cancel.progress(), (2, 4));
        cancel.reset_progress(3);
        assert_eq!(cancel.progress(), (0, 3));
    }
}
