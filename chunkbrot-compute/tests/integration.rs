use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use chunkbrot_compute::{
    build_engine, ColorSource, Engine, ExplodeAt, FieldEngine, FieldSnapshot, HilbertSampler,
    LinearRange, PassCancel, PassExecutor, RasterSampler, Rgb, SamplerKind, StopHandle,
};
use chunkbrot_core::{
    ChunkCoord, ChunkGrid, Complex, EngineConfig, Family, ModelKind, NumericModel, PixelCoord,
    Quadratic, QuadraticState, StepOutcome, Viewport,
};

fn small_config(model: ModelKind, side: u32) -> EngineConfig {
    EngineConfig {
        width: side,
        height: side,
        chunk_width: side / 4,
        chunk_height: side / 4,
        sub_iterations: 16,
        model,
        ..EngineConfig::default()
    }
}

/// A 2x2 grid of 1x1 chunks centred on `c`; pixel (1, 1) is exactly `c`.
fn point_config(c: Complex, sub_iterations: u32, periodicity: bool) -> EngineConfig {
    EngineConfig {
        width: 2,
        height: 2,
        chunk_width: 1,
        chunk_height: 1,
        center_re: c.re,
        center_im: c.im,
        sub_iterations,
        periodicity,
        ..EngineConfig::default()
    }
}

const TARGET: PixelCoord = PixelCoord { x: 1, y: 1 };

fn run_passes(
    config: &EngineConfig,
    concurrency: usize,
    sampler: SamplerKind,
    passes: usize,
) -> FieldSnapshot {
    let mut engine = build_engine(config).unwrap();
    let exec = PassExecutor::new(concurrency).unwrap();
    let sampler = sampler.build(engine.grid());
    let cancel = PassCancel::new();
    for _ in 0..passes {
        let report = engine.run_pass(&exec, sampler.as_ref(), &cancel).unwrap();
        assert!(!report.cancelled);
    }
    engine.snapshot()
}

// ---------------------------------------------------------------------------
// Determinism
// ---------------------------------------------------------------------------

#[test]
fn pool_size_and_order_do_not_change_results() {
    for (model, side) in [
        (ModelKind::Quadratic, 32),
        (ModelKind::DistanceEstimate, 32),
        (ModelKind::ArbitraryPrecision, 16),
    ] {
        let config = small_config(model, side);
        let reference = run_passes(&config, 1, SamplerKind::Raster, 3);
        assert!(reference.escaped_count() > 0, "{model:?} found no escapes");
        for sampler in [SamplerKind::Raster, SamplerKind::Hilbert] {
            let other = run_passes(&config, 4, sampler, 3);
            assert_eq!(reference, other, "{model:?} with {sampler:?}");
        }
    }
}

#[test]
fn julia_family_is_deterministic() {
    let config = EngineConfig {
        family: Family::Julia {
            c_re: -0.8,
            c_im: 0.156,
        },
        center_re: 0.0,
        ..small_config(ModelKind::Quadratic, 32)
    };
    let a = run_passes(&config, 1, SamplerKind::Hilbert, 2);
    let b = run_passes(&config, 8, SamplerKind::Raster, 2);
    assert_eq!(a, b);
    assert!(a.escaped_count() > 0);
}

#[test]
fn run_pass_matches_performing_every_chunk() {
    let config = small_config(ModelKind::Quadratic, 32);
    let mut by_pass = build_engine(&config).unwrap();
    let mut by_chunk = build_engine(&config).unwrap();
    let exec = PassExecutor::new(2).unwrap();
    let sampler = HilbertSampler::for_grid(by_pass.grid());
    let cancel = PassCancel::new();

    let grid = *by_chunk.grid();
    for _ in 0..2 {
        by_pass.run_pass(&exec, &sampler, &cancel).unwrap();
        for row in 0..grid.chunk_rows() {
            for col in 0..grid.chunk_cols() {
                by_chunk.perform(&cancel, ChunkCoord::new(row, col)).unwrap();
            }
        }
        by_chunk.increase_iteration();
    }

    assert_eq!(by_pass.snapshot(), by_chunk.snapshot());
    assert_eq!(by_pass.iteration_count(), by_chunk.iteration_count());
}

// ---------------------------------------------------------------------------
// Invariants across passes
// ---------------------------------------------------------------------------

#[test]
fn resolutions_are_frozen_and_max_only_grows() {
    for model in [ModelKind::Quadratic, ModelKind::DistanceEstimate] {
        let mut engine = build_engine(&small_config(model, 32)).unwrap();
        let exec = PassExecutor::new(4).unwrap();
        let sampler = RasterSampler::for_grid(engine.grid());
        let cancel = PassCancel::new();

        let mut previous = engine.snapshot();
        assert_eq!(previous.max_exploded_at, 1);
        for pass in 1..=5u64 {
            engine.run_pass(&exec, &sampler, &cancel).unwrap();
            assert_eq!(engine.iteration_count(), pass * 16);
            let current = engine.snapshot();
            assert!(current.max_exploded_at >= previous.max_exploded_at);
            for (before, after) in previous.data.iter().zip(&current.data) {
                if before.is_resolved() {
                    assert_eq!(before, after, "{model:?} overwrote a resolution");
                }
            }
            previous = current;
        }
    }
}

#[test]
fn escape_iterations_are_bounded_by_the_counter() {
    let mut engine = build_engine(&small_config(ModelKind::Quadratic, 32)).unwrap();
    let exec = PassExecutor::new(4).unwrap();
    let sampler = RasterSampler::for_grid(engine.grid());
    let cancel = PassCancel::new();
    for _ in 0..3 {
        engine.run_pass(&exec, &sampler, &cancel).unwrap();
    }
    let snap = engine.snapshot();
    let highest = snap.data.iter().filter_map(|e| e.escaped_at()).max().unwrap();
    assert!(highest <= engine.iteration_count());
    assert_eq!(snap.max_exploded_at, highest);
}

// ---------------------------------------------------------------------------
// Known points
// ---------------------------------------------------------------------------

#[test]
fn origin_never_escapes() {
    let snap = run_passes(&point_config(Complex::ZERO, 64, false), 2, SamplerKind::Raster, 4);
    assert_eq!(snap.get(TARGET), Some(ExplodeAt::Pending));
}

#[test]
fn far_point_escapes_on_first_iteration() {
    let snap = run_passes(
        &point_config(Complex::new(2.0, 2.0), 10, false),
        2,
        SamplerKind::Raster,
        1,
    );
    assert_eq!(snap.get(TARGET), Some(ExplodeAt::Escaped(1)));
    assert_eq!(snap.get(TARGET).map(ExplodeAt::raw), Some(1));
}

#[test]
fn parabolic_point_survives_one_batch() {
    let snap = run_passes(
        &point_config(Complex::new(-0.75, 0.0), 50, false),
        1,
        SamplerKind::Raster,
        1,
    );
    assert_eq!(snap.get(TARGET), Some(ExplodeAt::Pending));
}

#[test]
fn period_two_orbit_gets_sentinel() {
    let snap = run_passes(
        &point_config(Complex::new(-1.0, 0.0), 3, true),
        1,
        SamplerKind::Raster,
        1,
    );
    assert_eq!(snap.get(TARGET), Some(ExplodeAt::Periodic));
    assert_eq!(snap.get(TARGET).map(ExplodeAt::raw), Some(-1));
}

#[test]
fn escape_index_spans_pass_boundaries() {
    // c = 1: 0 -> 1 -> 2 -> 5, escapes on the third iteration.
    let snap = run_passes(&point_config(Complex::ONE, 1, false), 1, SamplerKind::Raster, 3);
    assert_eq!(snap.get(TARGET), Some(ExplodeAt::Escaped(3)));
}

// ---------------------------------------------------------------------------
// Exclusion
// ---------------------------------------------------------------------------

#[test]
fn fully_escaped_chunks_are_excluded_then_skipped() {
    let config = EngineConfig {
        width: 8,
        height: 8,
        chunk_width: 4,
        chunk_height: 4,
        center_re: 10.0,
        center_im: 10.0,
        sub_iterations: 4,
        ..EngineConfig::default()
    };
    let mut engine = build_engine(&config).unwrap();
    let exec = PassExecutor::new(2).unwrap();
    let sampler = RasterSampler::for_grid(engine.grid());
    let cancel = PassCancel::new();

    let first = engine.run_pass(&exec, &sampler, &cancel).unwrap();
    assert_eq!(first.escapes, 64);
    assert_eq!(first.chunks_excluded, 0);

    let second = engine.run_pass(&exec, &sampler, &cancel).unwrap();
    assert_eq!(second.cells_stepped, 0);
    assert_eq!(second.chunks_excluded, 4);
    assert!(engine.is_excluded(ChunkCoord::new(1, 1)));

    let third = engine.run_pass(&exec, &sampler, &cancel).unwrap();
    assert_eq!(third.chunks_skipped, 4);
    assert_eq!(third.chunks_processed, 0);
}

#[test]
fn derivative_model_keeps_revisiting() {
    let config = EngineConfig {
        model: ModelKind::DistanceEstimate,
        width: 4,
        height: 4,
        chunk_width: 2,
        chunk_height: 2,
        center_re: 10.0,
        center_im: 10.0,
        sub_iterations: 4,
        ..EngineConfig::default()
    };
    let mut engine = build_engine(&config).unwrap();
    let exec = PassExecutor::new(2).unwrap();
    let sampler = RasterSampler::for_grid(engine.grid());
    let cancel = PassCancel::new();

    let first = engine.run_pass(&exec, &sampler, &cancel).unwrap();
    let before = engine.snapshot();
    assert_eq!(before.escaped_count(), 16);
    let second = engine.run_pass(&exec, &sampler, &cancel).unwrap();
    assert_eq!(first.cells_stepped, 16);
    assert_eq!(second.cells_stepped, 16);
    assert_eq!(second.escapes, 0);
    assert_eq!(second.chunks_excluded, 0);
    assert_eq!(engine.snapshot(), before);
}

// ---------------------------------------------------------------------------
// Cancellation and stopping
// ---------------------------------------------------------------------------

/// Quadratic model that fires `action` on its `trip_at`-th step.
struct Tripwire {
    inner: Quadratic,
    steps: AtomicUsize,
    trip_at: usize,
    action: Box<dyn Fn() + Send + Sync>,
}

impl NumericModel for Tripwire {
    type Point = Complex;
    type State = QuadraticState;

    fn name(&self) -> &'static str {
        "tripwire"
    }

    fn point(&self, pixel: PixelCoord) -> chunkbrot_core::Result<Complex> {
        self.inner.point(pixel)
    }

    fn initial_state(&self, point: &Complex) -> QuadraticState {
        self.inner.initial_state(point)
    }

    fn step(&self, state: &mut QuadraticState, point: &Complex) -> StepOutcome {
        if self.steps.fetch_add(1, Ordering::SeqCst) + 1 == self.trip_at {
            (self.action)();
        }
        self.inner.step(state, point)
    }
}

const SIDE: u32 = 16;
const SUB: u32 = 8;

fn quadratic() -> Quadratic {
    let vp = Viewport::new(Complex::new(-0.75, 0.0), 1.0, SIDE, SIDE).unwrap();
    Quadratic::new(vp, Family::Mandelbrot, false)
}

fn grid() -> ChunkGrid {
    ChunkGrid::new(SIDE, SIDE, 4, 4).unwrap()
}

#[test]
fn cancelled_pass_resumes_where_it_left_off() {
    let cancel = Arc::new(PassCancel::new());
    let trigger = Arc::clone(&cancel);
    let model = Tripwire {
        inner: quadratic(),
        steps: AtomicUsize::new(0),
        trip_at: 40,
        action: Box::new(move || trigger.cancel()),
    };
    let mut tripped = Engine::new(model, grid(), SUB).unwrap();
    let mut reference = Engine::new(quadratic(), grid(), SUB).unwrap();
    let exec = PassExecutor::new(1).unwrap();
    let sampler = RasterSampler::for_grid(&grid());

    let report = tripped.run_pass(&exec, &sampler, &cancel).unwrap();
    assert!(report.cancelled);
    assert!(report.chunks_processed < 16);
    assert_eq!(tripped.iteration_count(), u64::from(SUB));
    assert!(!tripped.is_stopped());

    // Four clean passes on top of the cancelled one.
    for _ in 0..4 {
        assert!(!tripped.run_pass(&exec, &sampler, &cancel).unwrap().cancelled);
    }
    let reference_cancel = PassCancel::new();
    for _ in 0..4 {
        reference.run_pass(&exec, &sampler, &reference_cancel).unwrap();
    }

    let budget = u64::from(4 * SUB);
    let a = tripped.snapshot();
    let b = reference.snapshot();
    for (t, r) in a.data.iter().zip(&b.data) {
        if let ExplodeAt::Escaped(n) = r {
            assert_eq!(*t, ExplodeAt::Escaped(*n));
        }
        if let ExplodeAt::Escaped(n) = t {
            if *n <= budget {
                assert_eq!(*r, ExplodeAt::Escaped(*n));
            }
        }
    }
}

#[test]
fn stop_from_another_thread_ends_the_engine() {
    let slot: Arc<OnceLock<StopHandle>> = Arc::new(OnceLock::new());
    let trigger = Arc::clone(&slot);
    let model = Tripwire {
        inner: quadratic(),
        steps: AtomicUsize::new(0),
        trip_at: 40,
        action: Box::new(move || {
            if let Some(handle) = trigger.get() {
                handle.stop();
            }
        }),
    };
    let mut engine = Engine::new(model, grid(), SUB).unwrap();
    slot.set(engine.stop_handle()).unwrap();
    let exec = PassExecutor::new(1).unwrap();
    let sampler = RasterSampler::for_grid(&grid());
    let cancel = PassCancel::new();

    let report = engine.run_pass(&exec, &sampler, &cancel).unwrap();
    assert!(report.cancelled);
    assert!(engine.is_stopped());

    let before = engine.snapshot();
    assert!(matches!(
        engine.run_pass(&exec, &sampler, &cancel),
        Err(chunkbrot_compute::ComputeError::Stopped)
    ));
    assert_eq!(engine.snapshot(), before);
}

#[test]
fn mismatched_sampler_fails_before_any_work() {
    let mut engine = build_engine(&small_config(ModelKind::Quadratic, 32)).unwrap();
    let exec = PassExecutor::new(1).unwrap();
    let cancel = PassCancel::new();
    let wrong = RasterSampler::new(2, 2);
    assert!(engine.run_pass(&exec, &wrong, &cancel).is_err());
    assert_eq!(engine.iteration_count(), 0);
    assert_eq!(engine.snapshot().pending_count(), 32 * 32);
}

// ---------------------------------------------------------------------------
// Coloring
// ---------------------------------------------------------------------------

struct Red;

impl ColorSource for Red {
    fn color(&self, normalized: f64) -> Rgb {
        Rgb::new((normalized * 255.0) as u8 | 1, 0, 0)
    }
}

#[test]
fn colorize_covers_every_pixel() {
    let mut engine = build_engine(&small_config(ModelKind::Quadratic, 32)).unwrap();
    let exec = PassExecutor::new(4).unwrap();
    let sampler = HilbertSampler::for_grid(engine.grid());
    engine.run_pass(&exec, &sampler, &PassCancel::new()).unwrap();

    let buffer = engine.colorize(&LinearRange, &Red);
    assert_eq!(buffer.pixels.len(), 32 * 32 * 4);
    let snap = engine.snapshot();
    for y in 0..32 {
        for x in 0..32 {
            let px = buffer.pixel(x, y).unwrap();
            match snap.get(PixelCoord::new(x, y)).unwrap() {
                ExplodeAt::Escaped(_) => assert!(px[0] > 0),
                _ => assert_eq!(px, [0, 0, 0, 255]),
            }
        }
    }
}
