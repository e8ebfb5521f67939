use dashu_float::FBig;

use crate::complex::Complex;
use crate::error::CoreError;

/// Lift an `f64` into an [`FBig`] rounded to `precision_bits`.
///
/// Fails only for NaN and infinities, which have no `FBig` representation.
pub fn big_from_f64(value: f64, precision_bits: usize) -> crate::Result<FBig> {
    if !value.is_finite() {
        return Err(CoreError::NonFinite(value));
    }
    let big = FBig::try_from(value).map_err(|_| CoreError::NonFinite(value))?;
    Ok(big.with_precision(precision_bits).value())
}

/// A complex number whose components are arbitrary-precision binary floats.
///
/// The precision of every result is the larger of its operands', so values
/// built through [`big_from_f64`] keep a fixed working precision for the
/// whole orbit.
#[derive(Debug, Clone, PartialEq)]
pub struct BigComplex {
    pub re: FBig,
    pub im: FBig,
}

impl BigComplex {
    pub fn new(re: FBig, im: FBig) -> Self {
        Self { re, im }
    }

    pub fn zero(precision_bits: usize) -> Self {
        Self {
            re: FBig::ZERO.with_precision(precision_bits).value(),
            im: FBig::ZERO.with_precision(precision_bits).value(),
        }
    }

    pub fn from_complex(c: Complex, precision_bits: usize) -> crate::Result<Self> {
        Ok(Self {
            re: big_from_f64(c.re, precision_bits)?,
            im: big_from_f64(c.im, precision_bits)?,
        })
    }

    pub fn add(&self, rhs: &Self) -> Self {
        Self {
            re: &self.re + &rhs.re,
            im: &self.im + &rhs.im,
        }
    }

    /// `(a+bi)(c+di) = (ac−bd) + (ad+bc)i`.
    pub fn mul(&self, rhs: &Self) -> Self {
        let ac = &self.re * &rhs.re;
        let bd = &self.im * &rhs.im;
        let ad = &self.re * &rhs.im;
        let bc = &self.im * &rhs.re;
        Self {
            re: ac - bd,
            im: ad + bc,
        }
    }

    /// `self²` with the cross term computed once: `(a²−b²) + 2ab·i`.
    pub fn square(&self) -> Self {
        let a2 = &self.re * &self.re;
        let b2 = &self.im * &self.im;
        let ab = &self.re * &self.im;
        Self {
            re: a2 - b2,
            im: &ab + &ab,
        }
    }

    /// Returns `re² + im²` without taking the square root.
    pub fn norm_sq(&self) -> FBig {
        &self.re * &self.re + &self.im * &self.im
    }

    /// Downcast to `f64` components (for diagnostics only).
    pub fn to_complex(&self) -> Complex {
        Complex::new(self.re.to_f64().value(), self.im.to_f64().value())
    }
}
