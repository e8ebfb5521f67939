use serde::{Deserialize, Serialize};

use crate::complex::Complex;
use crate::error::CoreError;
use crate::grid::ChunkGrid;
use crate::model::Family;
use crate::precise::MIN_PRECISION_BITS;
use crate::viewport::Viewport;

/// Which numeric model an engine iterates with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    /// `f64` quadratic recurrence with optional periodicity detection.
    #[default]
    Quadratic,
    /// Derivative-augmented recurrence for distance-estimation coloring.
    DistanceEstimate,
    /// Quadratic recurrence on arbitrary-precision floats.
    ArbitraryPrecision,
}

impl ModelKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Quadratic => "quadratic",
            Self::DistanceEstimate => "distance-estimate",
            Self::ArbitraryPrecision => "arbitrary-precision",
        }
    }
}

/// Everything fixed for the lifetime of one engine.
///
/// Any change (pan, zoom, chunk size) means building a new engine from a new
/// config; nothing here is re-applied to a live grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default = "default_center_re")]
    pub center_re: f64,
    #[serde(default)]
    pub center_im: f64,
    /// Zoom factor; the real axis spans `3 / scale` units.
    #[serde(default = "default_scale")]
    pub scale: f64,
    /// Iterations every unresolved cell advances per pass.
    #[serde(default = "default_sub_iterations")]
    pub sub_iterations: u32,
    #[serde(default = "default_chunk_size")]
    pub chunk_width: u32,
    #[serde(default = "default_chunk_size")]
    pub chunk_height: u32,
    /// Squared-magnitude bailout for the derivative sum (distance estimate only).
    #[serde(default = "default_bailout")]
    pub bailout: f64,
    #[serde(default)]
    pub model: ModelKind,
    /// Short-cycle detection for the quadratic model.
    #[serde(default = "default_true")]
    pub periodicity: bool,
    /// Working precision of the arbitrary-precision model.
    #[serde(default = "default_precision_bits")]
    pub precision_bits: usize,
    #[serde(default)]
    pub family: Family,
}

fn default_width() -> u32 {
    1024
}
fn default_height() -> u32 {
    1024
}
fn default_center_re() -> f64 {
    -0.75
}
fn default_scale() -> f64 {
    1.0
}
fn default_sub_iterations() -> u32 {
    200
}
fn default_chunk_size() -> u32 {
    256
}
fn default_bailout() -> f64 {
    1e4
}
fn default_true() -> bool {
    true
}
fn default_precision_bits() -> usize {
    128
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            center_re: default_center_re(),
            center_im: 0.0,
            scale: default_scale(),
            sub_iterations: default_sub_iterations(),
            chunk_width: default_chunk_size(),
            chunk_height: default_chunk_size(),
            bailout: default_bailout(),
            model: ModelKind::default(),
            periodicity: true,
            precision_bits: default_precision_bits(),
            family: Family::default(),
        }
    }
}

impl EngineConfig {
    /// Check every construction precondition.
    ///
    /// Called before any cell is allocated; an engine built from a config
    /// that passes this never fails afterwards.
    pub fn validate(&self) -> crate::Result<()> {
        self.grid()?;
        self.viewport()?;
        if self.sub_iterations == 0 {
            return Err(CoreError::InvalidSubIterations(self.sub_iterations));
        }
        if self.bailout <= 0.0 || !self.bailout.is_finite() {
            return Err(CoreError::InvalidBailout(self.bailout));
        }
        if self.precision_bits < MIN_PRECISION_BITS {
            return Err(CoreError::InvalidPrecision(self.precision_bits));
        }
        if let Some(c) = self.family.julia_constant() {
            if !c.re.is_finite() {
                return Err(CoreError::NonFinite(c.re));
            }
            if !c.im.is_finite() {
                return Err(CoreError::NonFinite(c.im));
            }
        }
        Ok(())
    }

    pub fn grid(&self) -> crate::Result<ChunkGrid> {
        ChunkGrid::new(self.width, self.height, self.chunk_width, self.chunk_height)
    }

    pub fn viewport(&self) -> crate::Result<Viewport> {
        Viewport::new(
            Complex::new(self.center_re, self.center_im),
            self.scale,
            self.width,
            self.height,
        )
    }
}
