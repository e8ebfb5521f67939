use crate::complex::Complex;
use crate::config::EngineConfig;
use crate::coords::PixelCoord;
use crate::model::{Family, NumericModel, StepOutcome};
use crate::viewport::Viewport;

/// Derivative-augmented recurrence for exterior distance estimation.
///
/// Alongside the orbit `z_{n+1} = z_n² + c` it tracks the derivative
/// `dz_{n+1} = 2·z_n·dz_n + 1` (no `+ 1` in Julia form) and the running sum
/// of derivatives. A cell escapes when the sum's squared magnitude passes
/// `bailout`, not when the orbit does.
///
/// Resolved cells are revisited every pass. The escaping step is never
/// committed, so a revisited cell re-tests from its last bounded iterate and
/// its numbers stay finite. Each revisit reproduces the same escape and
/// records nothing new: the first escape iteration is kept, and a chunk with
/// escaped cells is never excluded.
#[derive(Debug, Clone)]
pub struct DistanceEstimate {
    viewport: Viewport,
    family: Family,
    bailout: f64,
}

/// Per-cell history for [`DistanceEstimate`].
#[derive(Debug, Clone, Copy)]
pub struct DistanceState {
    z: Complex,
    dz: Complex,
    dz_sum: Complex,
}

impl DistanceState {
    pub fn z(&self) -> Complex {
        self.z
    }

    pub fn dz(&self) -> Complex {
        self.dz
    }

    /// Accumulated derivative sum; its magnitude drives the escape test.
    pub fn dz_sum(&self) -> Complex {
        self.dz_sum
    }
}

impl DistanceEstimate {
    pub const DEFAULT_BAILOUT: f64 = 1e4;

    pub fn new(viewport: Viewport, family: Family, bailout: f64) -> Self {
        Self {
            viewport,
            family,
            bailout,
        }
    }

    pub fn from_config(config: &EngineConfig) -> crate::Result<Self> {
        Ok(Self::new(config.viewport()?, config.family, config.bailout))
    }

    pub fn bailout(&self) -> f64 {
        self.bailout
    }
}

impl NumericModel for DistanceEstimate {
    type Point = Complex;
    type State = DistanceState;

    fn name(&self) -> &'static str {
        "distance-estimate"
    }

    fn point(&self, pixel: PixelCoord) -> crate::Result<Complex> {
        Ok(self.viewport.pixel_to_complex(pixel))
    }

    fn initial_state(&self, point: &Complex) -> DistanceState {
        DistanceState {
            z: self.family.seed(*point),
            dz: Complex::ONE,
            dz_sum: Complex::ZERO,
        }
    }

    #[inline]
    fn step(&self, state: &mut DistanceState, point: &Complex) -> StepOutcome {
        let c = self.family.constant(*point);

        let mut dz = state.dz * state.z * 2.0;
        if !self.family.is_julia() {
            dz = dz + Complex::ONE;
        }
        let z = state.z.square() + c;
        let dz_sum = state.dz_sum + dz;

        let norm_sq = dz_sum.norm_sq();
        if norm_sq > self.bailout || norm_sq.is_nan() {
            return StepOutcome::Escaped;
        }

        *state = DistanceState { z, dz, dz_sum };
        StepOutcome::Continue
    }

    fn revisits_resolved(&self) -> bool {
        true
    }
}
