pub mod big_complex;
pub mod complex;
pub mod config;
pub mod coords;
pub mod distance;
pub mod error;
pub mod grid;
pub mod model;
pub mod periodicity;
pub mod precise;
pub mod quadratic;
pub mod viewport;

// Re-export primary types for convenience.
pub use big_complex::BigComplex;
pub use complex::Complex;
pub use config::{EngineConfig, ModelKind};
pub use coords::{ChunkCoord, LocalCoord, PixelCoord};
pub use distance::{DistanceEstimate, DistanceState};
pub use error::CoreError;
pub use grid::ChunkGrid;
pub use model::{Family, NumericModel, StepOutcome};
pub use precise::{ArbitraryPrecision, PreciseState};
pub use quadratic::{Quadratic, QuadraticState};
pub use viewport::Viewport;

/// Convenience result type for the core crate.
pub type Result<T> = std::result::Result<T, CoreError>;
