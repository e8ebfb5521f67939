use crate::complex::Complex;
use crate::config::EngineConfig;
use crate::coords::PixelCoord;
use crate::model::{Family, NumericModel, StepOutcome, ESCAPE_NORM_SQ};
use crate::periodicity::OrbitHistory;
use crate::viewport::Viewport;

/// The quadratic recurrence `z_{n+1} = z_n² + c` in `f64`.
///
/// Cells keep `re²` and `im²` of the current iterate between steps, so each
/// step costs three multiplications and the escape test reuses them.
#[derive(Debug, Clone)]
pub struct Quadratic {
    viewport: Viewport,
    family: Family,
    periodicity: bool,
}

/// Per-cell history for [`Quadratic`].
#[derive(Debug, Clone, Copy)]
pub struct QuadraticState {
    z: Complex,
    re2: f64,
    im2: f64,
    orbit: Option<OrbitHistory>,
}

impl QuadraticState {
    fn new(z: Complex, periodicity: bool) -> Self {
        Self {
            z,
            re2: z.re * z.re,
            im2: z.im * z.im,
            orbit: periodicity.then(OrbitHistory::new),
        }
    }

    /// The current iterate.
    pub fn z(&self) -> Complex {
        self.z
    }
}

impl Quadratic {
    pub fn new(viewport: Viewport, family: Family, periodicity: bool) -> Self {
        Self {
            viewport,
            family,
            periodicity,
        }
    }

    pub fn from_config(config: &EngineConfig) -> crate::Result<Self> {
        Ok(Self::new(config.viewport()?, config.family, config.periodicity))
    }

    pub fn periodicity(&self) -> bool {
        self.periodicity
    }
}

impl NumericModel for Quadratic {
    type Point = Complex;
    type State = QuadraticState;

    fn name(&self) -> &'static str {
        if self.periodicity {
            "quadratic+periodicity"
        } else {
            "quadratic"
        }
    }

    fn point(&self, pixel: PixelCoord) -> crate::Result<Complex> {
        Ok(self.viewport.pixel_to_complex(pixel))
    }

    fn initial_state(&self, point: &Complex) -> QuadraticState {
        QuadraticState::new(self.family.seed(*point), self.periodicity)
    }

    #[inline]
    fn step(&self, state: &mut QuadraticState, point: &Complex) -> StepOutcome {
        let c = self.family.constant(*point);
        let current = state.z;

        let next = Complex::new(
            state.re2 - state.im2 + c.re,
            2.0 * current.re * current.im + c.im,
        );
        state.z = next;
        state.re2 = next.re * next.re;
        state.im2 = next.im * next.im;

        if state.re2 + state.im2 > ESCAPE_NORM_SQ {
            return StepOutcome::Escaped;
        }

        if let Some(orbit) = state.orbit.as_mut() {
            if orbit.closes_cycle(current, next) {
                return StepOutcome::Periodic;
            }
        }

        StepOutcome::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model(periodicity: bool) -> Quadratic {
        let vp = Viewport::new(Complex::ZERO, 1.0, 4, 4).unwrap();
        Quadratic::new(vp, Family::Mandelbrot, periodicity)
    }

    /// Steps until something other than `Continue` happens, returning the
    /// 1-based step index and the outcome.
    fn run(m: &Quadratic, c: Complex, max: u32) -> Option<(u32, StepOutcome)> {
        let mut state = m.initial_state(&c);
        (1..=max).find_map(|n| match m.step(&mut state, &c) {
            StepOutcome::Continue => None,
            other => Some((n, other)),
        })
    }

    #[test]
    fn origin_never_escapes_without_periodicity() {
        assert_eq!(run(&model(false), Complex::ZERO, 1000), None);
    }

    #[test]
    fn origin_is_a_fixed_point_with_periodicity() {
        assert_eq!(
            run(&model(true), Complex::ZERO, 10),
            Some((1, StepOutcome::Periodic))
        );
    }

    #[test]
    fn far_point_escapes_on_first_step() {
        assert_eq!(
            run(&model(false), Complex::new(2.0, 2.0), 10),
            Some((1, StepOutcome::Escaped))
        );
    }

    #[test]
    fn known_escape_count() {
        // c = 1: z₁=1, z₂=2 (|z|²=4, not > 4), z₃=5 escapes.
        assert_eq!(
            run(&model(false), Complex::new(1.0, 0.0), 10),
            Some((3, StepOutcome::Escaped))
        );
    }

    #[test]
    fn period_two_orbit_is_caught_within_three_steps() {
        // c = -1: 0 → -1 → 0 → -1 …
        let (n, outcome) = run(&model(true), Complex::new(-1.0, 0.0), 10).unwrap();
        assert_eq!(outcome, StepOutcome::Periodic);
        assert!(n <= 3, "detected after {n} steps");
    }

    #[test]
    fn cardioid_boundary_survives_fifty_steps() {
        assert_eq!(run(&model(false), Complex::new(-0.75, 0.0), 50), None);
    }

    #[test]
    fn escaping_point_escapes_with_periodicity_on() {
        assert_eq!(
            run(&model(true), Complex::new(0.5, 0.0), 100).map(|(_, o)| o),
            Some(StepOutcome::Escaped)
        );
    }

    #[test]
    fn julia_form_starts_from_the_pixel() {
        let vp = Viewport::new(Complex::ZERO, 1.0, 4, 4).unwrap();
        let m = Quadratic::new(vp, Family::Julia { c_re: 0.0, c_im: 0.0 }, false);
        // z² with |z₀| = 3 escapes immediately; |z₀| = 0.5 collapses to 0.
        assert_eq!(
            run(&m, Complex::new(3.0, 0.0), 5),
            Some((1, StepOutcome::Escaped))
        );
        assert_eq!(run(&m, Complex::new(0.5, 0.0), 200), None);
    }

    #[test]
    fn point_uses_viewport_mapping() {
        let m = model(false);
        assert_eq!(m.point(PixelCoord::new(2, 2)).unwrap(), Complex::ZERO);
    }
}
