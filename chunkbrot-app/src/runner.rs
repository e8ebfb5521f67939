use std::fs;
use std::path::Path;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, info, warn};

use chunkbrot_compute::{
    build_engine, FieldEngine, FieldSnapshot, PassCancel, PassExecutor, PassReport, Sampler,
};

use crate::error::AppError;
use crate::run_config::RunConfig;

/// What a finished run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub passes_run: u32,
    pub cancelled_passes: u32,
    pub iterations: u64,
    pub max_exploded_at: u64,
    pub escaped: usize,
    pub periodic: usize,
    pub pending: usize,
    pub settled: bool,
    pub elapsed: Duration,
}

/// On-disk form of the final field.
#[derive(Debug, Serialize)]
struct FieldDump<'a> {
    model: &'a str,
    width: u32,
    height: u32,
    iteration: u64,
    max_exploded_at: u64,
    /// Row-major; `0` pending, `-1` periodic, otherwise the escape iteration.
    values: Vec<i64>,
}

/// Build an engine from `config` and run it pass by pass.
pub fn run(config: &RunConfig) -> Result<RunSummary, AppError> {
    let start = Instant::now();
    let mut engine = build_engine(&config.engine)?;
    let executor = PassExecutor::from_config(&config.schedule)?;
    let sampler = config.schedule.sampler.build(engine.grid());
    let cancel = PassCancel::new();
    let deadline = config.pass_deadline_ms.map(Duration::from_millis);

    info!(
        passes = config.passes,
        sampler = config.schedule.sampler.label(),
        concurrency = executor.concurrency(),
        "Starting run"
    );

    let mut passes_run = 0;
    let mut cancelled_passes = 0;
    let mut settled = false;
    for _ in 0..config.passes {
        let report = match deadline {
            Some(limit) => {
                run_with_deadline(engine.as_mut(), &executor, sampler.as_ref(), &cancel, limit)?
            }
            None => engine.run_pass(&executor, sampler.as_ref(), &cancel)?,
        };
        passes_run += 1;

        if report.cancelled {
            cancelled_passes += 1;
            let (done, total) = cancel.progress();
            warn!(
                iteration = report.iteration,
                done, total, "Pass hit its deadline; the next pass resumes it"
            );
        }
        if config.stop_when_settled && report.chunks_skipped == engine.chunked_area() {
            info!(iteration = report.iteration, "Every chunk is excluded, stopping");
            settled = true;
            break;
        }
    }

    let snapshot = engine.snapshot();
    if let Some(path) = &config.output {
        write_dump(path, engine.as_ref(), &snapshot)?;
    }

    let summary = RunSummary {
        passes_run,
        cancelled_passes,
        iterations: engine.iteration_count(),
        max_exploded_at: engine.max_exploded_at(),
        escaped: snapshot.escaped_count(),
        periodic: snapshot.periodic_count(),
        pending: snapshot.pending_count(),
        settled,
        elapsed: start.elapsed(),
    };
    info!(
        elapsed_ms = summary.elapsed.as_millis(),
        passes_run = summary.passes_run,
        cancelled_passes = summary.cancelled_passes,
        iterations = summary.iterations,
        max_exploded_at = summary.max_exploded_at,
        escaped = summary.escaped,
        periodic = summary.periodic,
        pending = summary.pending,
        "Run complete"
    );
    Ok(summary)
}

/// How often the watchdog repeats its cancel once the deadline has passed.
const RECANCEL_INTERVAL: Duration = Duration::from_millis(1);

/// Run one pass with a watchdog that cancels it after `limit`.
///
/// A cancel only reaches a pass that has already captured its checkpoint,
/// so after the deadline the watchdog keeps cancelling until the pass
/// returns.
fn run_with_deadline(
    engine: &mut dyn FieldEngine,
    executor: &PassExecutor,
    sampler: &dyn Sampler,
    cancel: &PassCancel,
    limit: Duration,
) -> Result<PassReport, AppError> {
    let (done_tx, done_rx) = mpsc::channel::<()>();
    let report = thread::scope(|scope| {
        scope.spawn(move || {
            let mut wait = limit;
            while let Err(RecvTimeoutError::Timeout) = done_rx.recv_timeout(wait) {
                if wait == limit {
                    debug!(limit_ms = limit.as_millis(), "Pass deadline reached, cancelling");
                }
                cancel.cancel();
                wait = RECANCEL_INTERVAL;
            }
        });
        let report = engine.run_pass(executor, sampler, cancel);
        // The watchdog may already have hung up.
        let _ = done_tx.send(());
        report
    })?;
    Ok(report)
}

fn write_dump(path: &Path, engine: &dyn FieldEngine, snapshot: &FieldSnapshot) -> Result<(), AppError> {
    let dump = FieldDump {
        model: engine.model_name(),
        width: snapshot.width,
        height: snapshot.height,
        iteration: engine.iteration_count(),
        max_exploded_at: snapshot.max_exploded_at,
        values: snapshot.raw(),
    };
    let json = serde_json::to_string(&dump).map_err(AppError::SerializeOutput)?;
    fs::write(path, json).map_err(|source| AppError::WriteOutput {
        path: path.to_path_buf(),
        source,
    })?;
    info!("Wrote field dump to {}", path.display());
    Ok(())
}
