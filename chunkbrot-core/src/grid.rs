use crate::coords::{ChunkCoord, LocalCoord, PixelCoord};
use crate::error::CoreError;

/// The partition of a `width × height` image into equal rectangular chunks.
///
/// Owns every pixel ↔ chunk translation so nothing else does integer
/// division on coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkGrid {
    width: u32,
    height: u32,
    chunk_width: u32,
    chunk_height: u32,
}

impl ChunkGrid {
    pub fn new(width: u32, height: u32, chunk_width: u32, chunk_height: u32) -> crate::Result<Self> {
        if width == 0 || height == 0 {
            return Err(CoreError::InvalidDimensions { width, height });
        }
        if chunk_width == 0 || chunk_height == 0 {
            return Err(CoreError::InvalidChunkSize {
                width: chunk_width,
                height: chunk_height,
            });
        }
        if width % chunk_width != 0 || height % chunk_height != 0 {
            return Err(CoreError::IndivisibleGrid {
                width,
                height,
                chunk_width,
                chunk_height,
            });
        }
        Ok(Self {
            width,
            height,
            chunk_width,
            chunk_height,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn chunk_width(&self) -> u32 {
        self.chunk_width
    }

    pub fn chunk_height(&self) -> u32 {
        self.chunk_height
    }

    /// Number of chunk rows (`chunkCountY`).
    pub fn chunk_rows(&self) -> u32 {
        self.height / self.chunk_height
    }

    /// Number of chunk columns (`chunkCountX`).
    pub fn chunk_cols(&self) -> u32 {
        self.width / self.chunk_width
    }

    /// Total number of chunks, i.e. the number of tasks in one pass.
    pub fn chunk_count(&self) -> usize {
        self.chunk_rows() as usize * self.chunk_cols() as usize
    }

    pub fn cells_per_chunk(&self) -> usize {
        self.chunk_width as usize * self.chunk_height as usize
    }

    pub fn contains_pixel(&self, pixel: PixelCoord) -> bool {
        pixel.x < self.width && pixel.y < self.height
    }

    pub fn contains_chunk(&self, chunk: ChunkCoord) -> bool {
        chunk.row < self.chunk_rows() && chunk.col < self.chunk_cols()
    }

    /// Translate a pixel into its chunk and the position inside that chunk.
    #[inline]
    pub fn locate(&self, pixel: PixelCoord) -> (ChunkCoord, LocalCoord) {
        (
            ChunkCoord::new(pixel.y / self.chunk_height, pixel.x / self.chunk_width),
            LocalCoord::new(pixel.y % self.chunk_height, pixel.x % self.chunk_width),
        )
    }

    /// Inverse of [`locate`](Self::locate).
    #[inline]
    pub fn pixel_of(&self, chunk: ChunkCoord, local: LocalCoord) -> PixelCoord {
        PixelCoord::new(
            chunk.col * self.chunk_width + local.col,
            chunk.row * self.chunk_height + local.row,
        )
    }

    /// Row-major index of a chunk in the chunk arena.
    #[inline]
    pub fn chunk_index(&self, chunk: ChunkCoord) -> usize {
        chunk.row as usize * self.chunk_cols() as usize + chunk.col as usize
    }

    /// Inverse of [`chunk_index`](Self::chunk_index).
    #[inline]
    pub fn chunk_at(&self, index: usize) -> ChunkCoord {
        let cols = self.chunk_cols() as usize;
        ChunkCoord::new((index / cols) as u32, (index % cols) as u32)
    }

    /// Row-major index of a cell inside its chunk's block.
    #[inline]
    pub fn local_index(&self, local: LocalCoord) -> usize {
        local.row as usize * self.chunk_width as usize + local.col as usize
    }

    /// Inverse of [`local_index`](Self::local_index).
    #[inline]
    pub fn local_at(&self, index: usize) -> LocalCoord {
        let w = self.chunk_width as usize;
        LocalCoord::new((index / w) as u32, (index % w) as u32)
    }
}
