//! Boundary between finished iteration data and whatever colors it.
//!
//! The engine never picks colors itself. A [`RangeConverter`] squashes an
//! escape iteration into `[0, 1)` and a [`ColorSource`] turns that into a
//! pixel; both are supplied by the caller.

use rayon::prelude::*;

use crate::snapshot::FieldSnapshot;
use crate::store::ExplodeAt;
use crate::tracker;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Self = Self::new(0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn to_rgba(self) -> [u8; 4] {
        [self.r, self.g, self.b, 255]
    }
}

/// Maps an escape iteration onto `[0, 1)` given the current maximum.
pub trait RangeConverter: Send + Sync {
    fn convert(&self, explode_at: u64, max: u64) -> f64;
}

/// Maps a normalised value onto a color.
pub trait ColorSource: Send + Sync {
    fn color(&self, normalized: f64) -> Rgb;

    /// Color for cells that have not escaped (pending or periodic).
    fn interior(&self) -> Rgb {
        Rgb::BLACK
    }
}

/// `explode_at / (max + 1)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearRange;

impl RangeConverter for LinearRange {
    fn convert(&self, explode_at: u64, max: u64) -> f64 {
        tracker::normalize(explode_at, max)
    }
}

/// An RGBA pixel buffer, 4 bytes per pixel, row-major.
#[derive(Debug, Clone)]
pub struct ColorBuffer {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl ColorBuffer {
    /// RGBA of the pixel at `(x, y)`.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        self.pixels.get(i..i + 4)?.try_into().ok()
    }
}

/// Color every cell of a snapshot.
pub fn colorize(
    snapshot: &FieldSnapshot,
    converter: &dyn RangeConverter,
    source: &dyn ColorSource,
) -> ColorBuffer {
    let max = snapshot.max_exploded_at;
    let interior = source.interior().to_rgba();
    let mut pixels = vec![0u8; snapshot.data.len() * 4];
    pixels
        .par_chunks_mut(4)
        .zip(snapshot.data.par_iter())
        .for_each(|(pixel, &cell)| {
            let c = match cell {
                ExplodeAt::Escaped(n) => source.color(converter.convert(n, max)).to_rgba(),
                ExplodeAt::Pending | ExplodeAt::Periodic => interior,
            };
            pixel.copy_from_slice(&c);
        });
    ColorBuffer {
        width: snapshot.width,
        height: snapshot.height,
        pixels,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Ramp;

    impl ColorSource for Ramp {
        fn color(&self, normalized: f64) -> Rgb {
            let v = (normalized * 255.0) as u8;
            Rgb::new(v, v, v)
        }

        fn interior(&self) -> Rgb {
            Rgb::new(1, 2, 3)
        }
    }

    #[test]
    fn linear_range_stays_below_one() {
        assert!(LinearRange.convert(10, 10) < 1.0);
        assert_eq!(LinearRange.convert(0, 10), 0.0);
    }

    #[test]
    fn interior_cells_use_interior_color() {
        let snapshot = FieldSnapshot {
            width: 3,
            height: 1,
            max_exploded_at: 3,
            data: vec![ExplodeAt::Pending, ExplodeAt::Periodic, ExplodeAt::Escaped(3)],
        };
        let buf = colorize(&snapshot, &LinearRange, &Ramp);
        assert_eq!(buf.pixel(0, 0), Some([1, 2, 3, 255]));
        assert_eq!(buf.pixel(1, 0), Some([1, 2, 3, 255]));
        // 3 / 4 * 255
        assert_eq!(buf.pixel(2, 0), Some([191, 191, 191, 255]));
        assert_eq!(buf.pixel(3, 0), None);
    }
}
