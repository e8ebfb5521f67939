pub mod cancel;
pub mod color;
pub mod engine;
pub mod error;
pub mod executor;
pub mod sampler;
pub mod snapshot;
pub mod store;
pub mod tracker;

pub use cancel::{Checkpoint, PassCancel, StopHandle};
pub use color::{colorize, ColorBuffer, ColorSource, LinearRange, RangeConverter, Rgb};
pub use engine::{build_engine, Engine, FieldEngine, PassReport};
pub use error::ComputeError;
pub use executor::{PassExecutor, PassTotals, ScheduleConfig};
pub use sampler::{HilbertSampler, RasterSampler, Sampler, SamplerKind};
pub use snapshot::FieldSnapshot;
pub use store::{Cell, Chunk, ChunkReport, ChunkStore, ExplodeAt, PERIODIC_SENTINEL};
pub use tracker::ExplodeTracker;

/// Convenience result type for the compute crate.
pub type Result<T> = std::result::Result<T, ComputeError>;
