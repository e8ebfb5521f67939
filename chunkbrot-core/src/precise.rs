use dashu_float::FBig;
use tracing::debug;

use crate::big_complex::{big_from_f64, BigComplex};
use crate::config::EngineConfig;
use crate::coords::PixelCoord;
use crate::error::CoreError;
use crate::model::{Family, NumericModel, StepOutcome, ESCAPE_NORM_SQ};
use crate::viewport::{Viewport, BASE_SPAN};

/// Smallest accepted working precision: one `f64` mantissa.
pub const MIN_PRECISION_BITS: usize = 53;

/// The quadratic recurrence on arbitrary-precision binary floats.
///
/// Pixel coordinates are rebuilt in full precision from the centre and the
/// per-pixel step, so deep zooms keep distinct points where `f64` would
/// collapse neighbouring pixels onto the same value.
#[derive(Debug, Clone)]
pub struct ArbitraryPrecision {
    viewport: Viewport,
    precision_bits: usize,
    center: BigComplex,
    units_per_pixel: FBig,
    julia_c: Option<BigComplex>,
    escape_norm_sq: FBig,
}

/// Per-cell history for [`ArbitraryPrecision`].
#[derive(Debug, Clone)]
pub struct PreciseState {
    z: BigComplex,
}

impl PreciseState {
    pub fn z(&self) -> &BigComplex {
        &self.z
    }
}

impl ArbitraryPrecision {
    pub fn new(viewport: &Viewport, family: Family, precision_bits: usize) -> crate::Result<Self> {
        if precision_bits < MIN_PRECISION_BITS {
            return Err(CoreError::InvalidPrecision(precision_bits));
        }
        let span = big_from_f64(BASE_SPAN, precision_bits)?;
        let width = big_from_f64(viewport.width as f64, precision_bits)?;
        let scale = big_from_f64(viewport.scale, precision_bits)?;
        let julia_c = family
            .julia_constant()
            .map(|c| BigComplex::from_complex(c, precision_bits))
            .transpose()?;

        debug!(
            precision_bits,
            scale = viewport.scale,
            julia = family.is_julia(),
            "Prepared arbitrary-precision model"
        );

        Ok(Self {
            viewport: *viewport,
            precision_bits,
            center: BigComplex::from_complex(viewport.center, precision_bits)?,
            units_per_pixel: span / (width * scale),
            julia_c,
            escape_norm_sq: big_from_f64(ESCAPE_NORM_SQ, precision_bits)?,
        })
    }

    pub fn from_config(config: &EngineConfig) -> crate::Result<Self> {
        Self::new(&config.viewport()?, config.family, config.precision_bits)
    }

    pub fn precision_bits(&self) -> usize {
        self.precision_bits
    }
}

impl NumericModel for ArbitraryPrecision {
    type Point = BigComplex;
    type State = PreciseState;

    fn name(&self) -> &'static str {
        "arbitrary-precision"
    }

    fn point(&self, pixel: PixelCoord) -> crate::Result<BigComplex> {
        let (dx, dy) = self.viewport.pixel_offset(pixel);
        let dx = big_from_f64(dx, self.precision_bits)?;
        let dy = big_from_f64(dy, self.precision_bits)?;
        Ok(BigComplex::new(
            &self.center.re + &(&dx * &self.units_per_pixel),
            &self.center.im - &(&dy * &self.units_per_pixel),
        ))
    }

    fn initial_state(&self, point: &BigComplex) -> PreciseState {
        let z = match self.julia_c {
            Some(_) => point.clone(),
            None => BigComplex::zero(self.precision_bits),
        };
        PreciseState { z }
    }

    fn step(&self, state: &mut PreciseState, point: &BigComplex) -> StepOutcome {
        let c = self.julia_c.as_ref().unwrap_or(point);
        state.z = state.z.square().add(c);
        if state.z.norm_sq() > self.escape_norm_sq {
            StepOutcome::Escaped
        } else {
            StepOutcome::Continue
        }
    }
}
