use tracing::debug;

use chunkbrot_core::{ChunkCoord, ChunkGrid, LocalCoord, NumericModel, PixelCoord, StepOutcome};

use crate::error::ComputeError;
use crate::sampler::Sampler;
use crate::tracker::ExplodeTracker;

/// Raw value reported for cells stopped by periodicity detection.
pub const PERIODIC_SENTINEL: i64 = -1;

/// Resolution state of one cell.
///
/// Once a cell leaves `Pending` it never changes again; see
/// [`Cell::resolve`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ExplodeAt {
    /// Still bounded after every iteration so far.
    #[default]
    Pending,
    /// First exceeded the escape threshold at this absolute iteration (≥ 1).
    Escaped(u64),
    /// Caught in a short cycle; will never escape.
    Periodic,
}

impl ExplodeAt {
    /// Integer encoding for external readers: `0` pending, `n > 0` escaped
    /// at `n`, [`PERIODIC_SENTINEL`] periodic.
    #[inline]
    pub fn raw(self) -> i64 {
        match self {
            Self::Pending => 0,
            Self::Escaped(n) => n as i64,
            Self::Periodic => PERIODIC_SENTINEL,
        }
    }

    #[inline]
    pub fn is_resolved(self) -> bool {
        !matches!(self, Self::Pending)
    }

    #[inline]
    pub fn escaped_at(self) -> Option<u64> {
        match self {
            Self::Escaped(n) => Some(n),
            _ => None,
        }
    }
}

/// One pixel's iteration record.
#[derive(Debug, Clone)]
pub struct Cell<P, S> {
    point: P,
    state: S,
    iterations: u64,
    explode_at: ExplodeAt,
}

impl<P, S> Cell<P, S> {
    pub fn point(&self) -> &P {
        &self.point
    }

    pub fn state(&self) -> &S {
        &self.state
    }

    /// Absolute index of the iterate currently held in the state.
    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    pub fn explode_at(&self) -> ExplodeAt {
        self.explode_at
    }

    /// Record a resolution. Write-once: returns `false` and leaves the cell
    /// untouched if it is already resolved.
    pub(crate) fn resolve(&mut self, explode_at: ExplodeAt) -> bool {
        if self.explode_at.is_resolved() {
            return false;
        }
        self.explode_at = explode_at;
        true
    }

    /// Whether a pass should step this cell.
    #[inline]
    fn is_actionable(&self, revisit_resolved: bool) -> bool {
        match self.explode_at {
            ExplodeAt::Pending => true,
            ExplodeAt::Escaped(_) => revisit_resolved,
            ExplodeAt::Periodic => false,
        }
    }

    /// Run up to `budget` steps. Returns the resolution the orbit reached,
    /// if any; recording it is left to [`Chunk::resolve`].
    fn advance<M>(&mut self, model: &M, budget: u32) -> Option<ExplodeAt>
    where
        M: NumericModel<Point = P, State = S>,
    {
        for _ in 0..budget {
            match model.step(&mut self.state, &self.point) {
                StepOutcome::Continue => self.iterations += 1,
                StepOutcome::Escaped => return Some(ExplodeAt::Escaped(self.iterations + 1)),
                StepOutcome::Periodic => {
                    self.iterations += 1;
                    return Some(ExplodeAt::Periodic);
                }
            }
        }
        None
    }
}

/// What one chunk task did during a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkReport {
    pub coord: ChunkCoord,
    /// Cells that were stepped at least once (`performCount`).
    pub cells_stepped: usize,
    /// Cells that escaped for the first time.
    pub escapes: usize,
    /// Largest escape iteration recorded by this task, `0` if none.
    pub local_max: u64,
    /// The chunk was already excluded and nothing was done.
    pub skipped: bool,
    /// This task found nothing to do and excluded the chunk.
    pub newly_excluded: bool,
    /// The task stopped at a cancellation checkpoint.
    pub cancelled: bool,
}

impl ChunkReport {
    fn new(coord: ChunkCoord) -> Self {
        Self {
            coord,
            cells_stepped: 0,
            escapes: 0,
            local_max: 0,
            skipped: false,
            newly_excluded: false,
            cancelled: false,
        }
    }
}

/// A rectangular block of cells processed as one unit of work.
#[derive(Debug, Clone)]
pub struct Chunk<P, S> {
    coord: ChunkCoord,
    /// Cells per chunk row.
    width: u32,
    cells: Vec<Cell<P, S>>,
    excluded: bool,
}

impl<P, S> Chunk<P, S> {
    pub fn coord(&self) -> ChunkCoord {
        self.coord
    }

    /// Set once a pass found no cell worth stepping; later passes skip it.
    pub fn is_excluded(&self) -> bool {
        self.excluded
    }

    /// Cells in row-major order within the chunk.
    pub fn cells(&self) -> &[Cell<P, S>] {
        &self.cells
    }

    /// Advance every actionable cell by up to `budget` iterations.
    ///
    /// `tripped` is polled before each cell; once it returns `true` the
    /// remaining cells are left exactly as they were. Each cell's update is
    /// self-contained, so a partially advanced chunk is still consistent.
    pub(crate) fn advance<M>(
        &mut self,
        model: &M,
        budget: u32,
        tripped: impl Fn() -> bool,
    ) -> ChunkReport
    where
        M: NumericModel<Point = P, State = S>,
    {
        let mut report = ChunkReport::new(self.coord);
        if self.excluded {
            report.skipped = true;
            return report;
        }

        let revisit = model.revisits_resolved();
        for index in 0..self.cells.len() {
            if tripped() {
                report.cancelled = true;
                break;
            }
            let cell = &mut self.cells[index];
            if !cell.is_actionable(revisit) {
                continue;
            }
            report.cells_stepped += 1;
            if let Some(outcome) = cell.advance(model, budget) {
                let local = self.local_at(index);
                self.resolve(local, outcome, &mut report);
            }
        }

        if report.cells_stepped == 0 && !report.cancelled {
            self.excluded = true;
            report.newly_excluded = true;
        }
        report
    }

    /// Record a resolution for the cell at `local`.
    ///
    /// Write-once: an already resolved cell, or a coordinate outside the
    /// chunk, is left alone and `false` is returned. New escapes count toward
    /// `report` and its local maximum, which the task merges into the
    /// store's tracker when it finishes.
    pub(crate) fn resolve(
        &mut self,
        local: LocalCoord,
        explode_at: ExplodeAt,
        report: &mut ChunkReport,
    ) -> bool {
        if local.col >= self.width {
            return false;
        }
        let index = local.row as usize * self.width as usize + local.col as usize;
        let Some(cell) = self.cells.get_mut(index) else {
            return false;
        };
        if !cell.resolve(explode_at) {
            return false;
        }
        if let ExplodeAt::Escaped(n) = explode_at {
            report.escapes += 1;
            report.local_max = report.local_max.max(n);
        }
        true
    }

    #[inline]
    fn local_at(&self, index: usize) -> LocalCoord {
        let w = self.width as usize;
        LocalCoord::new((index / w) as u32, (index % w) as u32)
    }
}

/// Owns every cell of the grid, indexed
/// `[chunk_row][chunk_col][local_row][local_col]`.
///
/// Chunks live in one row-major arena and each chunk owns a contiguous
/// block of cells, so chunk tasks can borrow disjoint `&mut Chunk`s with no
/// locking.
#[derive(Debug)]
pub struct ChunkStore<P, S> {
    grid: ChunkGrid,
    chunks: Vec<Chunk<P, S>>,
    tracker: ExplodeTracker,
}

impl<P, S> ChunkStore<P, S> {
    /// Allocate and seed every cell for `model`.
    pub fn new<M>(grid: ChunkGrid, model: &M) -> crate::Result<Self>
    where
        M: NumericModel<Point = P, State = S>,
    {
        let mut chunks = Vec::with_capacity(grid.chunk_count());
        for index in 0..grid.chunk_count() {
            let coord = grid.chunk_at(index);
            let mut cells = Vec::with_capacity(grid.cells_per_chunk());
            for li in 0..grid.cells_per_chunk() {
                let point = model.point(grid.pixel_of(coord, grid.local_at(li)))?;
                let state = model.initial_state(&point);
                cells.push(Cell {
                    point,
                    state,
                    iterations: 0,
                    explode_at: ExplodeAt::Pending,
                });
            }
            chunks.push(Chunk {
                coord,
                width: grid.chunk_width(),
                cells,
                excluded: false,
            });
        }
        debug!(
            chunks = chunks.len(),
            cells_per_chunk = grid.cells_per_chunk(),
            model = model.name(),
            "Allocated chunk store"
        );
        Ok(Self {
            grid,
            chunks,
            tracker: ExplodeTracker::new(),
        })
    }

    pub fn grid(&self) -> &ChunkGrid {
        &self.grid
    }

    pub fn chunks(&self) -> &[Chunk<P, S>] {
        &self.chunks
    }

    pub fn chunk(&self, coord: ChunkCoord) -> Option<&Chunk<P, S>> {
        if !self.grid.contains_chunk(coord) {
            return None;
        }
        self.chunks.get(self.grid.chunk_index(coord))
    }

    /// Largest escape iteration recorded so far; starts at `1`.
    pub fn max(&self) -> u64 {
        self.tracker.get()
    }

    pub fn tracker(&self) -> &ExplodeTracker {
        &self.tracker
    }

    /// One chunk borrowed for work, alongside the tracker it reports to.
    pub(crate) fn chunk_mut(
        &mut self,
        coord: ChunkCoord,
    ) -> crate::Result<(&mut Chunk<P, S>, &ExplodeTracker)> {
        if !self.grid.contains_chunk(coord) {
            return Err(ComputeError::ChunkOutOfBounds {
                row: coord.row,
                col: coord.col,
            });
        }
        let index = self.grid.chunk_index(coord);
        Ok((&mut self.chunks[index], &self.tracker))
    }

    /// Chunk-space lookup.
    pub fn cell(&self, chunk: ChunkCoord, local: LocalCoord) -> Option<&Cell<P, S>> {
        if local.row >= self.grid.chunk_height() || local.col >= self.grid.chunk_width() {
            return None;
        }
        self.chunk(chunk)?.cells.get(self.grid.local_index(local))
    }

    /// Pixel-space lookup.
    pub fn get(&self, pixel: PixelCoord) -> Option<ExplodeAt> {
        if !self.grid.contains_pixel(pixel) {
            return None;
        }
        let (chunk, local) = self.grid.locate(pixel);
        self.cell(chunk, local).map(Cell::explode_at)
    }

    pub fn is_excluded(&self, coord: ChunkCoord) -> bool {
        self.chunk(coord).is_some_and(Chunk::is_excluded)
    }

    /// Mutable borrows of every chunk in the order `sampler` visits them,
    /// alongside the tracker.
    ///
    /// Fails if the sampler skips or repeats a chunk, or points outside the
    /// grid.
    pub(crate) fn ordered_chunks_mut(
        &mut self,
        sampler: &dyn Sampler,
    ) -> crate::Result<(Vec<&mut Chunk<P, S>>, &ExplodeTracker)> {
        let grid = self.grid;
        if sampler.len() != grid.chunk_count() {
            return Err(ComputeError::SamplerMismatch {
                expected: grid.chunk_count(),
                actual: sampler.len(),
            });
        }

        let mut slots: Vec<Option<&mut Chunk<P, S>>> = self.chunks.iter_mut().map(Some).collect();
        let ordered = (0..grid.chunk_count())
            .map(|index| {
                let coord = sampler.sample(index);
                coord
                    .filter(|c| grid.contains_chunk(*c))
                    .and_then(|c| slots[grid.chunk_index(c)].take())
                    .ok_or(ComputeError::SamplerNotBijective { index, coord })
            })
            .collect::<crate::Result<Vec<_>>>()?;
        Ok((ordered, &self.tracker))
    }
}
