use thiserror::Error;

use chunkbrot_core::ChunkCoord;

/// Errors originating from the chunked compute engine.
///
/// None of these can happen in the middle of a pass: they are raised before
/// any cell is touched. Cancellation is not an error; see
/// [`PassReport::cancelled`](crate::PassReport::cancelled).
#[derive(Debug, Error)]
pub enum ComputeError {
    #[error("engine is stopped; build a new engine to continue")]
    Stopped,

    #[error("sampler covers {actual} chunks but the grid has {expected}")]
    SamplerMismatch { expected: usize, actual: usize },

    #[error("sampler is not a bijection: index {index} maps to {coord:?}")]
    SamplerNotBijective {
        index: usize,
        coord: Option<ChunkCoord>,
    },

    #[error("chunk ({row}, {col}) is outside the grid")]
    ChunkOutOfBounds { row: u32, col: u32 },

    #[error("invalid concurrency: {0} (must be >= 1)")]
    InvalidConcurrency(usize),

    #[error(transparent)]
    Pool(#[from] rayon::ThreadPoolBuildError),

    #[error(transparent)]
    Core(#[from] chunkbrot_core::CoreError),
}
