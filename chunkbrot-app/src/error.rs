use std::path::PathBuf;

use thiserror::Error;

use chunkbrot_compute::ComputeError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("failed to read run configuration {path}: {source}")]
    ReadConfig {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse run configuration {path}: {source}")]
    ParseConfig {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("failed to write field dump {path}: {source}")]
    WriteOutput {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to serialize field dump: {0}")]
    SerializeOutput(#[source] serde_json::Error),

    #[error(transparent)]
    Compute(#[from] ComputeError),
}
