//! Work samplers: the order in which a pass hands chunks to the pool.
//!
//! A sampler is built for fixed grid dimensions and maps a linear work index
//! in `[0, len)` to a chunk coordinate. Every index must map to a distinct
//! chunk; the store checks this before a pass starts.

use serde::{Deserialize, Serialize};

use chunkbrot_core::{ChunkCoord, ChunkGrid};

pub trait Sampler: Send + Sync {
    /// Chunk visited at work index `index`, or `None` past the end.
    fn sample(&self, index: usize) -> Option<ChunkCoord>;

    /// Number of work items, equal to the grid's chunk count.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Row-major traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RasterSampler {
    rows: u32,
    cols: u32,
}

impl RasterSampler {
    pub fn new(rows: u32, cols: u32) -> Self {
        Self { rows, cols }
    }

    pub fn for_grid(grid: &ChunkGrid) -> Self {
        Self::new(grid.chunk_rows(), grid.chunk_cols())
    }
}

impl Sampler for RasterSampler {
    fn sample(&self, index: usize) -> Option<ChunkCoord> {
        if index >= self.len() {
            return None;
        }
        let cols = self.cols as usize;
        Some(ChunkCoord::new((index / cols) as u32, (index % cols) as u32))
    }

    fn len(&self) -> usize {
        self.rows as usize * self.cols as usize
    }
}

/// Hilbert-curve traversal, so consecutive tasks touch neighbouring chunks.
///
/// The curve is walked once over the smallest power-of-two square enclosing
/// the grid; points outside the grid are dropped. What remains keeps the
/// curve's order and visits every chunk exactly once, whatever the grid's
/// shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HilbertSampler {
    table: Vec<ChunkCoord>,
}

impl HilbertSampler {
    pub fn new(rows: u32, cols: u32) -> Self {
        let side = rows.max(cols).max(1).next_power_of_two() as u64;
        let mut table = Vec::with_capacity(rows as usize * cols as usize);
        if rows > 0 && cols > 0 {
            for d in 0..side * side {
                let (x, y) = hilbert_point(d, side);
                if x < cols as u64 && y < rows as u64 {
                    table.push(ChunkCoord::new(y as u32, x as u32));
                }
            }
        }
        Self { table }
    }

    pub fn for_grid(grid: &ChunkGrid) -> Self {
        Self::new(grid.chunk_rows(), grid.chunk_cols())
    }
}

impl Sampler for HilbertSampler {
    fn sample(&self, index: usize) -> Option<ChunkCoord> {
        self.table.get(index).copied()
    }

    fn len(&self) -> usize {
        self.table.len()
    }
}

/// The `(x, y)` point at distance `index` along a Hilbert curve filling a
/// `side`-by-`side` square.
/// `side` must be a power of two.
pub fn hilbert_point(index: u64, side: u64) -> (u64, u64) {
    let (mut x, mut y) = (0u64, 0u64);
    let mut t = index;
    let mut s = 1u64;
    while s < side {
        let rx = 1 & (t / 2);
        let ry = 1 & (t ^ rx);
        if ry == 0 {
            if rx == 1 {
                x = s - 1 - x;
                y = s - 1 - y;
            }
            std::mem::swap(&mut x, &mut y);
        }
        x += s * rx;
        y += s * ry;
        t /= 4;
        s *= 2;
    }
    (x, y)
}

/// Which sampler a pass schedule uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SamplerKind {
    Raster,
    #[default]
    Hilbert,
}

impl SamplerKind {
    pub fn build(self, grid: &ChunkGrid) -> Box<dyn Sampler> {
        match self {
            Self::Raster => Box::new(RasterSampler::for_grid(grid)),
            Self::Hilbert => Box::new(HilbertSampler::for_grid(grid)),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Raster => "raster",
            Self::Hilbert => "hilbert",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn assert_bijection(sampler: &dyn Sampler, rows: u32, cols: u32) {
        assert_eq!(sampler.len(), (rows * cols) as usize);
        let seen: BTreeSet<ChunkCoord> = (0..sampler.len())
            .map(|i| sampler.sample(i).expect("index in range"))
            .collect();
        assert_eq!(seen.len(), sampler.len(), "duplicate coordinates");
        assert!(seen.iter().all(|c| c.row < rows && c.col < cols));
        assert_eq!(sampler.sample(sampler.len()), None);
    }

    #[test]
    fn raster_4x4_covers_every_chunk_once() {
        let s = RasterSampler::new(4, 4);
        assert_bijection(&s, 4, 4);
        assert_eq!(s.sample(0), Some(ChunkCoord::new(0, 0)));
        assert_eq!(s.sample(6), Some(ChunkCoord::new(1, 2)));
        assert_eq!(s.sample(15), Some(ChunkCoord::new(3, 3)));
    }

    #[test]
    fn hilbert_4x4_covers_every_chunk_once() {
        assert_bijection(&HilbertSampler::new(4, 4), 4, 4);
    }

    #[test]
    fn hilbert_non_square_grids_are_bijections() {
        for (rows, cols) in [(3, 5), (1, 7), (6, 2), (5, 5), (1, 1)] {
            assert_bijection(&HilbertSampler::new(rows, cols), rows, cols);
        }
    }

    #[test]
    fn hilbert_steps_between_neighbours() {
        let s = HilbertSampler::new(4, 4);
        for i in 1..s.len() {
            let a = s.sample(i - 1).unwrap();
            let b = s.sample(i).unwrap();
            let dist = a.row.abs_diff(b.row) + a.col.abs_diff(b.col);
            assert_eq!(dist, 1, "{a:?} -> {b:?}");
        }
    }

    #[test]
    fn hilbert_starts_at_origin() {
        assert_eq!(hilbert_point(0, 8), (0, 0));
        assert_eq!(hilbert_point(1, 2), (0, 1));
        assert_eq!(hilbert_point(3, 2), (1, 0));
    }

    #[test]
    fn kind_builds_matching_sampler() {
        let grid = ChunkGrid::new(12, 8, 4, 4).unwrap();
        for kind in [SamplerKind::Raster, SamplerKind::Hilbert] {
            let s = kind.build(&grid);
            assert_bijection(s.as_ref(), 2, 3);
        }
    }

    #[test]
    fn kind_deserializes_from_snake_case() {
        let k: SamplerKind = serde_json::from_str("\"raster\"").unwrap();
        assert_eq!(k, SamplerKind::Raster);
        assert_eq!(SamplerKind::default().label(), "hilbert");
    }
}
