//! Coordinate types for the two addressing schemes of a chunked grid.
//!
//! External readers address cells by [`PixelCoord`]. The pass executor
//! addresses them by a [`ChunkCoord`] plus a [`LocalCoord`] inside that
//! chunk. The types are deliberately incompatible so one can never be
//! passed where the other is expected; [`ChunkGrid`](crate::ChunkGrid)
//! converts between them.

use serde::{Deserialize, Serialize};

/// A pixel position in the full image: `x` to the right, `y` downward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PixelCoord {
    pub x: u32,
    pub y: u32,
}

impl PixelCoord {
    #[inline]
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

/// The position of a chunk in the chunk grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkCoord {
    pub row: u32,
    pub col: u32,
}

impl ChunkCoord {
    #[inline]
    pub fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }
}

/// A cell position relative to the top-left corner of its chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LocalCoord {
    pub row: u32,
    pub col: u32,
}

impl LocalCoord {
    #[inline]
    pub fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }
}
