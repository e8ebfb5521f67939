use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use chunkbrot_core::{
    ArbitraryPrecision, ChunkCoord, ChunkGrid, CoreError, DistanceEstimate, EngineConfig,
    ModelKind, NumericModel, PixelCoord, Quadratic,
};

use crate::cancel::{PassCancel, StopHandle};
use crate::color::{ColorBuffer, ColorSource, RangeConverter};
use crate::error::ComputeError;
use crate::executor::{advance_chunk, PassExecutor};
use crate::sampler::Sampler;
use crate::snapshot::FieldSnapshot;
use crate::store::{ChunkReport, ChunkStore, ExplodeAt};

// ---------------------------------------------------------------------------
// Pass report
// ---------------------------------------------------------------------------

/// Summary of one pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassReport {
    /// Global iteration count before the pass started.
    pub iteration: u64,
    /// Chunks that ran to completion.
    pub chunks_processed: usize,
    /// Chunks skipped because an earlier pass excluded them.
    pub chunks_skipped: usize,
    /// Chunks this pass excluded.
    pub chunks_excluded: usize,
    pub cells_stepped: usize,
    /// Cells that escaped for the first time during this pass.
    pub escapes: usize,
    pub max_exploded_at: u64,
    pub cancelled: bool,
    pub elapsed: Duration,
}

// ---------------------------------------------------------------------------
// Engine surface
// ---------------------------------------------------------------------------

/// Object-safe view of an engine, whatever numeric model it runs.
pub trait FieldEngine: Send {
    fn model_name(&self) -> &'static str;

    fn grid(&self) -> &ChunkGrid;

    /// Advance every chunk by one batch, then bump the iteration counter.
    ///
    /// A cancelled pass returns normally with `cancelled` set; whatever was
    /// computed stays and the next pass resumes from it.
    fn run_pass(
        &mut self,
        executor: &PassExecutor,
        sampler: &dyn Sampler,
        cancel: &PassCancel,
    ) -> crate::Result<PassReport>;

    /// Advance a single chunk by one batch on the calling thread. Does not
    /// touch the iteration counter.
    fn perform(&mut self, cancel: &PassCancel, chunk: ChunkCoord) -> crate::Result<ChunkReport>;

    fn increase_iteration(&mut self);

    fn iteration_count(&self) -> u64;

    fn exploded_at(&self, pixel: PixelCoord) -> Option<ExplodeAt>;

    fn max_exploded_at(&self) -> u64;

    /// Number of chunks in the grid.
    fn chunked_area(&self) -> usize;

    fn is_excluded(&self, chunk: ChunkCoord) -> bool;

    fn is_stopped(&self) -> bool;

    /// Stop permanently. Any pass in flight returns at its next checkpoint.
    fn stop(&self);

    fn stop_handle(&self) -> StopHandle;

    fn snapshot(&self) -> FieldSnapshot;

    fn colorize(&self, converter: &dyn RangeConverter, source: &dyn ColorSource) -> ColorBuffer {
        self.snapshot().colorize(converter, source)
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Owns a numeric model, every cell it iterates, and the pass bookkeeping.
pub struct Engine<M: NumericModel> {
    model: M,
    store: ChunkStore<M::Point, M::State>,
    sub_iterations: u32,
    iterations: u64,
    stopped: Arc<AtomicBool>,
}

impl<M: NumericModel> Engine<M> {
    pub fn new(model: M, grid: ChunkGrid, sub_iterations: u32) -> crate::Result<Self> {
        if sub_iterations == 0 {
            return Err(CoreError::InvalidSubIterations(sub_iterations).into());
        }
        let store = ChunkStore::new(grid, &model)?;
        Ok(Self {
            model,
            store,
            sub_iterations,
            iterations: 0,
            stopped: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn store(&self) -> &ChunkStore<M::Point, M::State> {
        &self.store
    }

    pub fn sub_iterations(&self) -> u32 {
        self.sub_iterations
    }

    fn refuse_if_stopped(&self) -> crate::Result<()> {
        if self.is_stopped() {
            warn!(
                model = self.model.name(),
                iteration = self.iterations,
                "Engine is stopped, refusing work"
            );
            return Err(ComputeError::Stopped);
        }
        Ok(())
    }
}

impl<M: NumericModel> FieldEngine for Engine<M> {
    fn model_name(&self) -> &'static str {
        self.model.name()
    }

    fn grid(&self) -> &ChunkGrid {
        self.store.grid()
    }

    fn run_pass(
        &mut self,
        executor: &PassExecutor,
        sampler: &dyn Sampler,
        cancel: &PassCancel,
    ) -> crate::Result<PassReport> {
        self.refuse_if_stopped()?;

        let start = Instant::now();
        let iteration = self.iterations;
        debug!(
            iteration,
            chunks = sampler.len(),
            sub_iterations = self.sub_iterations,
            concurrency = executor.concurrency(),
            model = self.model.name(),
            "Starting pass"
        );

        let checkpoint = cancel.checkpoint(&self.stopped);
        let (chunks, tracker) = self.store.ordered_chunks_mut(sampler)?;
        let totals = executor.dispatch(
            &self.model,
            chunks,
            self.sub_iterations,
            checkpoint,
            cancel,
            tracker,
        );
        self.increase_iteration();

        let report = PassReport {
            iteration,
            chunks_processed: totals.chunks_processed,
            chunks_skipped: totals.chunks_skipped,
            chunks_excluded: totals.chunks_excluded,
            cells_stepped: totals.cells_stepped,
            escapes: totals.escapes,
            max_exploded_at: self.store.max(),
            cancelled: totals.cancelled,
            elapsed: start.elapsed(),
        };
        info!(
            elapsed_ms = report.elapsed.as_millis(),
            iteration,
            chunks_processed = report.chunks_processed,
            chunks_skipped = report.chunks_skipped,
            chunks_excluded = report.chunks_excluded,
            escapes = report.escapes,
            max_exploded_at = report.max_exploded_at,
            cancelled = report.cancelled,
            "Pass complete"
        );
        Ok(report)
    }

    fn perform(&mut self, cancel: &PassCancel, chunk: ChunkCoord) -> crate::Result<ChunkReport> {
        self.refuse_if_stopped()?;
        let checkpoint = cancel.checkpoint(&self.stopped);
        let (target, tracker) = self.store.chunk_mut(chunk)?;
        Ok(advance_chunk(
            &self.model,
            target,
            self.sub_iterations,
            checkpoint,
            tracker,
        ))
    }

    fn increase_iteration(&mut self) {
        self.iterations += u64::from(self.sub_iterations);
    }

    fn iteration_count(&self) -> u64 {
        self.iterations
    }

    fn exploded_at(&self, pixel: PixelCoord) -> Option<ExplodeAt> {
        self.store.get(pixel)
    }

    fn max_exploded_at(&self) -> u64 {
        self.store.max()
    }

    fn chunked_area(&self) -> usize {
        self.store.grid().chunk_count()
    }

    fn is_excluded(&self, chunk: ChunkCoord) -> bool {
        self.store.is_excluded(chunk)
    }

    fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    fn stop_handle(&self) -> StopHandle {
        StopHandle::new(Arc::clone(&self.stopped))
    }

    fn snapshot(&self) -> FieldSnapshot {
        let grid = self.store.grid();
        let data = (0..grid.height())
            .flat_map(|y| (0..grid.width()).map(move |x| PixelCoord::new(x, y)))
            .map(|pixel| self.store.get(pixel).unwrap_or_default())
            .collect();
        FieldSnapshot {
            width: grid.width(),
            height: grid.height(),
            max_exploded_at: self.store.max(),
            data,
        }
    }
}

/// Validate `config` and build an engine running the model it selects.
pub fn build_engine(config: &EngineConfig) -> crate::Result<Box<dyn FieldEngine>> {
    config.validate()?;
    let grid = config.grid()?;
    let sub = config.sub_iterations;
    let engine: Box<dyn FieldEngine> = match config.model {
        ModelKind::Quadratic => Box::new(Engine::new(Quadratic::from_config(config)?, grid, sub)?),
        ModelKind::DistanceEstimate => {
            Box::new(Engine::new(DistanceEstimate::from_config(config)?, grid, sub)?)
        }
        ModelKind::ArbitraryPrecision => {
            Box::new(Engine::new(ArbitraryPrecision::from_config(config)?, grid, sub)?)
        }
    };
    info!(
        model = config.model.label(),
        width = config.width,
        height = config.height,
        chunks = grid.chunk_count(),
        sub_iterations = sub,
        "Engine ready"
    );
    Ok(engine)
}
