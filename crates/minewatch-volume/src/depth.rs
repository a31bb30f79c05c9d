//! Elevation patches and the depth fields derived from them.

use crate::{reference::Datum, Result, VolumeError};
use serde::{Deserialize, Serialize};

/// A rectangular window of elevations under a site.
///
/// Cells outside the site mask, and cells without data, are `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct ElevationPatch {
    width: usize,
    height: usize,
    cells: Vec<Option<f64>>,
}

impl ElevationPatch {
    /// Build a patch from row-major cells.
    pub fn new(width: usize, height: usize, cells: Vec<Option<f64>>) -> Result<Self> {
        if cells.len() != width * height {
            return Err(VolumeError::PatchSizeMismatch {
                width,
                height,
                actual: cells.len(),
            });
        }
        Ok(Self { width, height, cells })
    }

    /// Build a fully masked patch from row-major elevations.
    pub fn from_values(width: usize, height: usize, values: &[f64]) -> Result<Self> {
        Self::new(width, height, values.iter().copied().map(Some).collect())
    }

    /// `(width, height)` in cells.
    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// Cell at `(col, row)`; `None` when masked out or out of range.
    pub fn get(&self, col: usize, row: usize) -> Option<f64> {
        if col >= self.width || row >= self.height {
            return None;
        }
        self.cells[row * self.width + col]
    }

    /// Elevations of cells with data, in row-major order.
    pub fn values(&self) -> Vec<f64> {
        self.cells.iter().flatten().copied().collect()
    }

    /// True when no cell holds data.
    pub fn is_empty(&self) -> bool {
        self.cells.iter().all(Option::is_none)
    }
}

/// Per-cell non-negative depths over a patch.
///
/// Cells without data have depth zero.
#[derive(Debug, Clone, PartialEq)]
pub struct DepthField {
    width: usize,
    height: usize,
    depths: Vec<f64>,
}

impl DepthField {
    /// Derive depths from `patch` against `reference`.
    pub fn from_patch(patch: &ElevationPatch, reference: f64, datum: Datum) -> Self {
        let depths = patch
            .cells
            .iter()
            .map(|cell| cell.map_or(0.0, |e| datum.depth(e, reference)))
            .collect();
        Self {
            width: patch.width,
            height: patch.height,
            depths,
        }
    }

    /// `(width, height)` in cells.
    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// Depth at `(col, row)`, zero outside the field.
    pub fn get(&self, col: usize, row: usize) -> f64 {
        if col >= self.width || row >= self.height {
            return 0.0;
        }
        self.depths[row * self.width + col]
    }

    /// Row-major depths.
    pub fn depths(&self) -> &[f64] {
        &self.depths
    }

    /// Sum of all cell depths.
    pub fn sum(&self) -> f64 {
        self.depths.iter().sum()
    }

    /// Summary of the positive depths.
    pub fn stats(&self) -> DepthStats {
        DepthStats::from_depths(&self.depths)
    }
}

/// Statistics over the strictly positive depths of a field.
///
/// All zero when nothing lies below (or above) the datum.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DepthStats {
    /// Mean depth in meters.
    pub mean: f64,
    /// Deepest cell in meters.
    pub max: f64,
    /// Shallowest excavated cell in meters.
    pub min: f64,
    /// Population standard deviation in meters.
    pub std: f64,
}

impl DepthStats {
    fn from_depths(depths: &[f64]) -> Self {
        let positive: Vec<f64> = depths.iter().copied().filter(|&d| d > 0.0).collect();
        if positive.is_empty() {
            return Self::default();
        }
        let n = positive.len() as f64;
        let mean = positive.iter().sum::<f64>() / n;
        let variance = positive.iter().map(|d| (d - mean).powi(2)).sum::<f64>() / n;
        Self {
            mean,
            max: positive.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            min: positive.iter().copied().fold(f64::INFINITY, f64::min),
            std: variance.sqrt(),
        }
    }
}
