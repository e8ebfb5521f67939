use std::sync::atomic::{AtomicU64, Ordering};

/// The largest escape iteration seen anywhere on the grid.
///
/// Starts at `1` so normalising never divides by zero. Only ever raised;
/// concurrent chunk tasks merge their local maxima with a single
/// `fetch_max` each, which gives the same value for any task interleaving.
#[derive(Debug)]
pub struct ExplodeTracker {
    max: AtomicU64,
}

impl ExplodeTracker {
    pub fn new() -> Self {
        Self {
            max: AtomicU64::new(1),
        }
    }

    /// Raise the maximum to `candidate` if it is larger.
    #[inline]
    pub fn raise(&self, candidate: u64) {
        self.max.fetch_max(candidate, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.max.load(Ordering::Relaxed)
    }

    /// Map an escape iteration into `[0, 1)` relative to the current maximum.
    pub fn normalize(&self, explode_at: u64) -> f64 {
        normalize(explode_at, self.get())
    }
}

impl Default for ExplodeTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// `explode_at / (max + 1)`, so the largest value still lands below `1`.
#[inline]
pub fn normalize(explode_at: u64, max: u64) -> f64 {
    explode_at as f64 / (max as f64 + 1.0)
}
