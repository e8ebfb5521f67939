use chunkbrot_core::PixelCoord;

use crate::color::{self, ColorBuffer, ColorSource, RangeConverter};
use crate::store::ExplodeAt;

/// Row-major copy of every cell's resolution, taken between passes.
///
/// Keeping this separate from the engine lets callers recolor or inspect a
/// frame while the engine moves on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSnapshot {
    pub width: u32,
    pub height: u32,
    pub max_exploded_at: u64,
    pub data: Vec<ExplodeAt>,
}

impl FieldSnapshot {
    pub fn get(&self, pixel: PixelCoord) -> Option<ExplodeAt> {
        if pixel.x >= self.width || pixel.y >= self.height {
            return None;
        }
        self.data
            .get(pixel.y as usize * self.width as usize + pixel.x as usize)
            .copied()
    }

    /// Integer encoding of every cell, see [`ExplodeAt::raw`].
    pub fn raw(&self) -> Vec<i64> {
        self.data.iter().map(|e| e.raw()).collect()
    }

    pub fn escaped_count(&self) -> usize {
        self.data
            .iter()
            .filter(|e| matches!(e, ExplodeAt::Escaped(_)))
            .count()
    }

    pub fn periodic_count(&self) -> usize {
        self.data
            .iter()
            .filter(|e| matches!(e, ExplodeAt::Periodic))
            .count()
    }

    pub fn pending_count(&self) -> usize {
        self.data
            .iter()
            .filter(|e| matches!(e, ExplodeAt::Pending))
            .count()
    }

    pub fn colorize(&self, converter: &dyn RangeConverter, source: &dyn ColorSource) -> ColorBuffer {
        color::colorize(self, converter, source)
    }
}
