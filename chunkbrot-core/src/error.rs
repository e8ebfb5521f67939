use thiserror::Error;

/// Errors raised while validating an engine configuration.
///
/// Everything here is reported before any cell state is allocated; once an
/// engine exists its iteration loop cannot fail.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid grid dimensions: {width}×{height} (must be > 0)")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("invalid chunk size: {width}×{height} (must be > 0)")]
    InvalidChunkSize { width: u32, height: u32 },

    #[error("grid {width}×{height} is not divisible into {chunk_width}×{chunk_height} chunks")]
    IndivisibleGrid {
        width: u32,
        height: u32,
        chunk_width: u32,
        chunk_height: u32,
    },

    #[error("invalid scale: {0} (must be positive and finite)")]
    InvalidScale(f64),

    #[error("invalid sub-iterations: {0} (must be >= 1)")]
    InvalidSubIterations(u32),

    #[error("invalid bailout: {0} (must be positive and finite)")]
    InvalidBailout(f64),

    #[error("invalid precision: {0} bits (must be >= {min})", min = crate::precise::MIN_PRECISION_BITS)]
    InvalidPrecision(usize),

    #[error("coordinate is not finite: {0}")]
    NonFinite(f64),
}
