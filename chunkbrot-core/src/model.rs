use serde::{Deserialize, Serialize};

use crate::complex::Complex;
use crate::coords::PixelCoord;

/// Squared escape radius shared by the quadratic models: `|z|² > 4`.
pub const ESCAPE_NORM_SQ: f64 = 4.0;

/// Which member of the quadratic family a model iterates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Family {
    /// `z₀ = 0`, `c` is the pixel's coordinate.
    #[default]
    Mandelbrot,

    /// `z₀` is the pixel's coordinate, `c` is this fixed constant.
    Julia { c_re: f64, c_im: f64 },
}

impl Family {
    /// The fixed Julia constant, if any.
    pub fn julia_constant(&self) -> Option<Complex> {
        match *self {
            Self::Mandelbrot => None,
            Self::Julia { c_re, c_im } => Some(Complex::new(c_re, c_im)),
        }
    }

    /// Starting iterate for a pixel whose coordinate is `point`.
    #[inline]
    pub fn seed(&self, point: Complex) -> Complex {
        match self {
            Self::Mandelbrot => Complex::ZERO,
            Self::Julia { .. } => point,
        }
    }

    /// The additive constant `c` for a pixel whose coordinate is `point`.
    #[inline]
    pub fn constant(&self, point: Complex) -> Complex {
        match *self {
            Self::Mandelbrot => point,
            Self::Julia { c_re, c_im } => Complex::new(c_re, c_im),
        }
    }

    pub fn is_julia(&self) -> bool {
        matches!(self, Self::Julia { .. })
    }
}

/// The result of advancing one cell by a single iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Still bounded; keep iterating.
    Continue,
    /// The escape test fired on this step.
    Escaped,
    /// The orbit fell into a short cycle and will never escape.
    Periodic,
}

/// An escape-time recurrence that can be advanced one step at a time.
///
/// Implementations hold everything that is fixed for a run (viewport,
/// family, thresholds); the per-cell history lives in [`State`](Self::State)
/// and is owned by the cell. The chunked engine is generic over this trait,
/// so adding a model never touches the scheduler.
pub trait NumericModel: Send + Sync {
    /// The cell's fixed coordinate in this model's numeric representation.
    type Point: Send + Sync;

    /// Mutable per-cell iteration history.
    type State: Send;

    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    /// The coordinate of `pixel`, computed once when the cell is allocated.
    fn point(&self, pixel: PixelCoord) -> crate::Result<Self::Point>;

    /// History before the first iteration.
    fn initial_state(&self, point: &Self::Point) -> Self::State;

    /// Advance `state` by one iteration.
    ///
    /// On [`StepOutcome::Escaped`] a model may leave `state` at the last
    /// bounded iterate; callers must not rely on it afterwards.
    fn step(&self, state: &mut Self::State, point: &Self::Point) -> StepOutcome;

    /// Whether already-resolved cells are stepped again on later passes.
    ///
    /// A revisit never changes a cell's recorded resolution, and a chunk that
    /// still holds revisited cells is never excluded.
    fn revisits_resolved(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mandelbrot_seeds_at_origin() {
        let p = Complex::new(0.3, -0.2);
        assert_eq!(Family::Mandelbrot.seed(p), Complex::ZERO);
        assert_eq!(Family::Mandelbrot.constant(p), p);
        assert_eq!(Family::Mandelbrot.julia_constant(), None);
    }

    #[test]
    fn julia_seeds_at_pixel() {
        let family = Family::Julia {
            c_re: -0.7,
            c_im: 0.27015,
        };
        let p = Complex::new(0.3, -0.2);
        assert_eq!(family.seed(p), p);
        assert_eq!(family.constant(p), Complex::new(-0.7, 0.27015));
        assert!(family.is_julia());
    }

    #[test]
    fn family_serde_tagging() {
        let json = serde_json::to_string(&Family::Julia {
            c_re: 1.0,
            c_im: 2.0,
        })
        .unwrap();
        assert_eq!(json, r#"{"kind":"julia","c_re":1.0,"c_im":2.0}"#);
        let back: Family = serde_json::from_str(r#"{"kind":"mandelbrot"}"#).unwrap();
        assert_eq!(back, Family::Mandelbrot);
    }
}
