use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use chunkbrot_compute::ScheduleConfig;
use chunkbrot_core::EngineConfig;

use crate::error::AppError;

/// Everything one headless run needs, loaded from a single JSON file.
///
/// Missing fields fall back to their defaults, so `{}` is a valid file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    /// Upper bound on the number of passes.
    #[serde(default = "default_passes")]
    pub passes: u32,
    /// Cancel a pass that runs longer than this. The next pass resumes it.
    #[serde(default)]
    pub pass_deadline_ms: Option<u64>,
    /// Stop early once a pass skips every chunk as excluded.
    #[serde(default = "default_true")]
    pub stop_when_settled: bool,
    /// Where to write the final per-pixel values as JSON.
    #[serde(default)]
    pub output: Option<PathBuf>,
}

fn default_passes() -> u32 {
    10
}

fn default_true() -> bool {
    true
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            schedule: ScheduleConfig::default(),
            passes: default_passes(),
            pass_deadline_ms: None,
            stop_when_settled: true,
            output: None,
        }
    }
}

impl RunConfig {
    pub fn load(path: &Path) -> Result<Self, AppError> {
        let json = fs::read_to_string(path).map_err(|source| AppError::ReadConfig {
            path: path.to_path_buf(),
            source,
        })?;
        let config = serde_json::from_str(&json).map_err(|source| AppError::ParseConfig {
            path: path.to_path_buf(),
            source,
        })?;
        info!("Loaded run configuration from {}", path.display());
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chunkbrot_compute::SamplerKind;
    use chunkbrot_core::ModelKind;

    #[test]
    fn empty_object_gives_defaults() {
        let cfg: RunConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg, RunConfig::default());
    }

    #[test]
    fn nested_sections_merge_with_defaults() {
        let cfg: RunConfig = serde_json::from_str(
            r#"{
                "engine": { "width": 512, "height": 256, "model": "distance_estimate" },
                "schedule": { "sampler": "raster" },
                "passes": 3,
                "output": "field.json"
            }"#,
        )
        .unwrap();
        assert_eq!(cfg.engine.width, 512);
        assert_eq!(cfg.engine.chunk_width, 256);
        assert_eq!(cfg.engine.model, ModelKind::DistanceEstimate);
        assert_eq!(cfg.schedule.sampler, SamplerKind::Raster);
        assert_eq!(cfg.schedule.concurrency, 128);
        assert_eq!(cfg.passes, 3);
        assert_eq!(cfg.output.as_deref(), Some(Path::new("field.json")));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = RunConfig::load(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(matches!(err, AppError::ReadConfig { .. }));
    }
}
