use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use rayon::{ThreadPool, ThreadPoolBuilder};
use serde::{Deserialize, Serialize};
use tracing::debug;

use chunkbrot_core::NumericModel;

use crate::cancel::Checkpoint;
use crate::cancel::PassCancel;
use crate::error::ComputeError;
use crate::sampler::SamplerKind;
use crate::store::{Chunk, ChunkReport};
use crate::tracker::ExplodeTracker;

fn default_concurrency() -> usize {
    128
}

/// How passes are scheduled: pool size and chunk order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default)]
    pub sampler: SamplerKind,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            sampler: SamplerKind::default(),
        }
    }
}

/// Per-pass counters summed over every chunk task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassTotals {
    pub chunks_processed: usize,
    pub chunks_skipped: usize,
    pub chunks_excluded: usize,
    pub cells_stepped: usize,
    pub escapes: usize,
    pub cancelled: bool,
}

impl PassTotals {
    pub(crate) fn from_report(report: &ChunkReport) -> Self {
        Self {
            chunks_processed: usize::from(!report.skipped && !report.cancelled),
            chunks_skipped: usize::from(report.skipped),
            chunks_excluded: usize::from(report.newly_excluded),
            cells_stepped: report.cells_stepped,
            escapes: report.escapes,
            cancelled: report.cancelled,
        }
    }
}

#[derive(Debug, Default)]
struct SharedTotals {
    processed: AtomicUsize,
    skipped: AtomicUsize,
    excluded: AtomicUsize,
    cells: AtomicUsize,
    escapes: AtomicUsize,
    cancelled: AtomicBool,
}

impl SharedTotals {
    fn absorb(&self, report: &ChunkReport) {
        let t = PassTotals::from_report(report);
        self.processed.fetch_add(t.chunks_processed, Ordering::Relaxed);
        self.skipped.fetch_add(t.chunks_skipped, Ordering::Relaxed);
        self.excluded.fetch_add(t.chunks_excluded, Ordering::Relaxed);
        self.cells.fetch_add(t.cells_stepped, Ordering::Relaxed);
        self.escapes.fetch_add(t.escapes, Ordering::Relaxed);
        if t.cancelled {
            self.cancelled.store(true, Ordering::Relaxed);
        }
    }

    fn into_totals(self) -> PassTotals {
        PassTotals {
            chunks_processed: self.processed.into_inner(),
            chunks_skipped: self.skipped.into_inner(),
            chunks_excluded: self.excluded.into_inner(),
            cells_stepped: self.cells.into_inner(),
            escapes: self.escapes.into_inner(),
            cancelled: self.cancelled.into_inner(),
        }
    }
}

/// Bounded worker pool that runs one task per chunk.
///
/// Tasks are spawned in FIFO order, so the pool picks chunks up in the order
/// the sampler produced them. The call blocks until every task has returned.
pub struct PassExecutor {
    pool: ThreadPool,
    concurrency: usize,
}

impl PassExecutor {
    pub fn new(concurrency: usize) -> crate::Result<Self> {
        if concurrency == 0 {
            return Err(ComputeError::InvalidConcurrency(concurrency));
        }
        let pool = ThreadPoolBuilder::new()
            .num_threads(concurrency)
            .thread_name(|i| format!("chunkbrot-pass-{i}"))
            .build()?;
        debug!(concurrency, "Built pass executor");
        Ok(Self { pool, concurrency })
    }

    pub fn from_config(config: &ScheduleConfig) -> crate::Result<Self> {
        Self::new(config.concurrency)
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Advance each chunk by up to `budget` iterations per cell.
    ///
    /// Every task merges its local maximum into `tracker` once, when it
    /// finishes. `cancel` progress is reset to the chunk count and bumped per
    /// finished task.
    pub(crate) fn dispatch<M>(
        &self,
        model: &M,
        chunks: Vec<&mut Chunk<M::Point, M::State>>,
        budget: u32,
        checkpoint: Checkpoint<'_>,
        cancel: &PassCancel,
        tracker: &ExplodeTracker,
    ) -> PassTotals
    where
        M: NumericModel,
    {
        cancel.reset_progress(chunks.len());
        let totals = SharedTotals::default();

        self.pool.scope_fifo(|scope| {
            for chunk in chunks {
                let totals = &totals;
                scope.spawn_fifo(move |_| {
                    let report = advance_chunk(model, chunk, budget, checkpoint, tracker);
                    totals.absorb(&report);
                    cancel.inc_progress();
                });
            }
        });

        totals.into_totals()
    }
}

impl std::fmt::Debug for PassExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PassExecutor")
            .field("concurrency", &self.concurrency)
            .finish()
    }
}

/// Run one chunk task on the calling thread.
pub(crate) fn advance_chunk<M>(
    model: &M,
    chunk: &mut Chunk<M::Point, M::State>,
    budget: u32,
    checkpoint: Checkpoint<'_>,
    tracker: &ExplodeTracker,
) -> ChunkReport
where
    M: NumericModel,
{
    let report = chunk.advance(model, budget, || checkpoint.tripped());
    if report.local_max > 0 {
        tracker.raise(report.local_max);
    }
    report
}
