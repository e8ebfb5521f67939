use crate::complex::Complex;
use crate::coords::PixelCoord;
use crate::error::CoreError;

/// Real-axis span of the image at zoom factor 1.
pub const BASE_SPAN: f64 = 3.0;

/// Maps pixels onto the complex plane.
///
/// The view is centred on `center`; at `scale == 1` the image spans
/// [`BASE_SPAN`] units horizontally. Both axes use the same units-per-pixel
/// so non-square images are not stretched.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub center: Complex,

    /// Zoom factor; larger values show a smaller region.
    pub scale: f64,

    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(center: Complex, scale: f64, width: u32, height: u32) -> crate::Result<Self> {
        if width == 0 || height == 0 {
            return Err(CoreError::InvalidDimensions { width, height });
        }
        if scale <= 0.0 || !scale.is_finite() {
            return Err(CoreError::InvalidScale(scale));
        }
        if !center.is_finite() {
            let bad = if center.re.is_finite() { center.im } else { center.re };
            return Err(CoreError::NonFinite(bad));
        }
        Ok(Self {
            center,
            scale,
            width,
            height,
        })
    }

    /// Complex-plane units covered by one pixel.
    #[inline]
    pub fn units_per_pixel(&self) -> f64 {
        BASE_SPAN / (self.width as f64 * self.scale)
    }

    /// Signed pixel distance of `pixel` from the image centre.
    ///
    /// Returned in pixel units (exact in `f64`) so extended-precision models
    /// can do the scaling themselves.
    #[inline]
    pub fn pixel_offset(&self, pixel: PixelCoord) -> (f64, f64) {
        (
            pixel.x as f64 - self.width as f64 / 2.0,
            pixel.y as f64 - self.height as f64 / 2.0,
        )
    }

    /// Map a pixel to a point on the complex plane.
    ///
    /// `(0, 0)` is the top-left pixel; increasing `y` moves toward negative
    /// imaginary values.
    #[inline]
    pub fn pixel_to_complex(&self, pixel: PixelCoord) -> Complex {
        let (dx, dy) = self.pixel_offset(pixel);
        let step = self.units_per_pixel();
        Complex::new(self.center.re + dx * step, self.center.im - dy * step)
    }

    /// Horizontal extent of the viewport in complex-plane units.
    pub fn complex_width(&self) -> f64 {
        self.width as f64 * self.units_per_pixel()
    }

    /// Vertical extent of the viewport in complex-plane units.
    pub fn complex_height(&self) -> f64 {
        self.height as f64 * self.units_per_pixel()
    }
}
