//! Polygon rasterization and elevation sampling.

use crate::{DemError, RasterGrid, Result};
use minewatch_geom::Polygon;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// A boolean grid marking cells inside a polygon.
#[derive(Debug, Clone, PartialEq)]
pub struct Mask {
    width: u32,
    height: u32,
    cells: Vec<bool>,
    /// Tight bounds of the set cells.
    window: Option<CellWindow>,
}

/// A rectangular block of cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellWindow {
    /// First column.
    pub col: u32,
    /// First row.
    pub row: u32,
    /// Number of columns.
    pub width: u32,
    /// Number of rows.
    pub height: u32,
}

impl Mask {
    /// An all-false mask.
    pub fn empty(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            cells: vec![false; width as usize * height as usize],
            window: None,
        }
    }

    fn set(&mut self, col: u32, row: u32) {
        self.cells[row as usize * self.width as usize + col as usize] = true;
        self.window = Some(match self.window {
            None => CellWindow {
                col,
                row,
                width: 1,
                height: 1,
            },
            Some(w) => {
                let min_col = w.col.min(col);
                let min_row = w.row.min(row);
                let max_col = (w.col + w.width - 1).max(col);
                let max_row = (w.row + w.height - 1).max(row);
                CellWindow {
                    col: min_col,
                    row: min_row,
                    width: max_col - min_col + 1,
                    height: max_row - min_row + 1,
                }
            }
        });
    }

    /// Mask dimensions, matching the grid it was built for.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Whether a cell is inside. Out-of-range cells are outside.
    pub fn get(&self, col: u32, row: u32) -> bool {
        col < self.width
            && row < self.height
            && self.cells[row as usize * self.width as usize + col as usize]
    }

    /// Number of cells inside.
    pub fn count(&self) -> usize {
        self.cells.iter().filter(|&&c| c).count()
    }

    /// Bounding window of the set cells, `None` when the mask is empty.
    pub fn window(&self) -> Option<CellWindow> {
        self.window
    }
}

/// Rasterize a polygon (in grid pixel space) into a mask of `width x height`.
///
/// Scanline fill with the even-odd rule. A cell is inside when its center
/// `(col + 0.5, row + 0.5)` is inside the ring, which matches
/// [`Polygon::contains`]. Only rows and columns within the polygon's bounding
/// box are visited.
pub fn rasterize(polygon: &Polygon, width: u32, height: u32) -> Mask {
    let mut mask = Mask::empty(width, height);
    if width == 0 || height == 0 {
        return mask;
    }

    let bbox = polygon.bounding_box();
    let first_row = (bbox.min_y - 0.5).ceil().max(0.0);
    let last_row = (bbox.max_y - 0.5).floor().min(height as f64 - 1.0);
    if first_row > last_row {
        return mask;
    }

    let mut crossings: Vec<f64> = Vec::with_capacity(polygon.len());
    for row in first_row as u32..=last_row as u32 {
        let y = row as f64 + 0.5;

        crossings.clear();
        for (p, q) in polygon.edges() {
            if (p.y > y) != (q.y > y) {
                crossings.push((q.x - p.x) * (y - p.y) / (q.y - p.y) + p.x);
            }
        }
        crossings.sort_by(|a, b| a.total_cmp(b));

        // Inside spans are [x0, x1) between consecutive crossing pairs
        for span in crossings.chunks_exact(2) {
            let start = (span[0] - 0.5).ceil().clamp(0.0, width as f64) as u32;
            let end = (span[1] - 0.5).ceil().clamp(0.0, width as f64) as u32;
            for col in start..end {
                mask.set(col, row);
            }
        }
    }

    mask
}

/// Pixel-dimension mismatch between the annotation image and the grid.
///
/// Not an error: the sampler rescales polygons by `scale_x, scale_y`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RasterAlignment {
    /// Annotation image width in pixels.
    pub source_width: u32,
    /// Annotation image height in pixels.
    pub source_height: u32,
    /// Grid width in pixels.
    pub grid_width: u32,
    /// Grid height in pixels.
    pub grid_height: u32,
    /// `grid_width / source_width`.
    pub scale_x: f64,
    /// `grid_height / source_height`.
    pub scale_y: f64,
}

/// The cells of a grid under a polygon.
#[derive(Debug, Clone)]
pub struct SampledSite {
    /// Mask over the full grid.
    pub mask: Mask,
    /// Values of masked cells that hold data, in row-major order.
    pub values: Vec<f64>,
    /// The polygon as rasterized, in grid pixel space.
    pub grid_polygon: Polygon,
}

/// The mask's bounding window as a dense patch of elevations.
///
/// Cells outside the mask, and no-data cells, are `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct MaskedWindow {
    /// Position of the patch in the grid.
    pub window: CellWindow,
    /// Row-major values, `window.width * window.height` long.
    pub cells: Vec<Option<f64>>,
}

impl SampledSite {
    /// True when no masked cell holds data.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Extract the mask's bounding window from `grid`.
    ///
    /// Returns `None` when the mask is empty.
    pub fn masked_window(&self, grid: &RasterGrid) -> Option<MaskedWindow> {
        let window = self.mask.window()?;
        let mut cells = Vec::with_capacity(window.width as usize * window.height as usize);
        for row in window.row..window.row + window.height {
            for col in window.col..window.col + window.width {
                let value = if self.mask.get(col, row) {
                    grid.get(col, row).map(f64::from)
                } else {
                    None
                };
                cells.push(value);
            }
        }
        Some(MaskedWindow { window, cells })
    }

    /// Values of cells outside the mask whose centers lie within `buffer`
    /// grid pixels of the polygon, no-data cells excluded.
    ///
    /// This is the ground around a site: the buffered polygon minus the
    /// polygon itself. Empty when `buffer` is not positive.
    pub fn ring_values(&self, grid: &RasterGrid, buffer: f64) -> Vec<f64> {
        if buffer.is_nan() || buffer <= 0.0 {
            return Vec::new();
        }
        let (width, height) = grid.dimensions();
        let bbox = self.grid_polygon.bounding_box();

        let first_col = (bbox.min_x - buffer - 0.5).ceil().max(0.0);
        let last_col = (bbox.max_x + buffer - 0.5).floor().min(width as f64 - 1.0);
        let first_row = (bbox.min_y - buffer - 0.5).ceil().max(0.0);
        let last_row = (bbox.max_y + buffer - 0.5).floor().min(height as f64 - 1.0);
        if first_col > last_col || first_row > last_row {
            return Vec::new();
        }

        let mut values = Vec::new();
        for row in first_row as u32..=last_row as u32 {
            for col in first_col as u32..=last_col as u32 {
                if self.mask.get(col, row) {
                    continue;
                }
                let (x, y) = (col as f64 + 0.5, row as f64 + 0.5);
                if self.grid_polygon.boundary_distance(x, y) <= buffer {
                    if let Some(v) = grid.get(col, row) {
                        values.push(f64::from(v));
                    }
                }
            }
        }

        debug!(buffer, cells = values.len(), "Sampled ring around polygon");
        values
    }
}

/// Samples grid values under annotation polygons.
///
/// Owns the image-to-grid rescale: annotation polygons are drawn on an image
/// whose pixel dimensions may differ from the grid's, and are scaled by
/// `(grid_width / image_width, grid_height / image_height)` before
/// rasterizing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RasterSampler {
    scale_x: f64,
    scale_y: f64,
    alignment: Option<RasterAlignment>,
}

impl RasterSampler {
    /// Create a sampler for annotations drawn on a `source` image and sampled
    /// on a `grid` raster, both given as `(width, height)`.
    pub fn new(source: (u32, u32), grid: (u32, u32)) -> Result<Self> {
        for (width, height) in [source, grid] {
            if width == 0 || height == 0 {
                return Err(DemError::InvalidDimensions { width, height });
            }
        }

        if source == grid {
            return Ok(Self::identity());
        }

        let alignment = RasterAlignment {
            source_width: source.0,
            source_height: source.1,
            grid_width: grid.0,
            grid_height: grid.1,
            scale_x: grid.0 as f64 / source.0 as f64,
            scale_y: grid.1 as f64 / source.1 as f64,
        };
        warn!(
            image = ?source,
            dem = ?grid,
            scale_x = alignment.scale_x,
            scale_y = alignment.scale_y,
            "Annotation image and DEM pixel dimensions differ; rescaling polygons"
        );

        Ok(Self {
            scale_x: alignment.scale_x,
            scale_y: alignment.scale_y,
            alignment: Some(alignment),
        })
    }

    /// A sampler for annotations drawn directly in grid pixel space.
    pub fn identity() -> Self {
        Self {
            scale_x: 1.0,
            scale_y: 1.0,
            alignment: None,
        }
    }

    /// The rescale applied, when the dimensions differ.
    pub fn alignment(&self) -> Option<RasterAlignment> {
        self.alignment
    }

    /// Scale factors `(x, y)` from annotation pixels to grid pixels.
    pub fn scale(&self) -> (f64, f64) {
        (self.scale_x, self.scale_y)
    }

    /// Map an annotation polygon into grid pixel space.
    pub fn to_grid_space(&self, polygon: &Polygon) -> Polygon {
        if self.alignment.is_none() {
            return polygon.clone();
        }
        polygon.scaled(self.scale_x, self.scale_y)
    }

    /// Rasterize `polygon` over `grid` and collect the values under it.
    ///
    /// A polygon that does not overlap the grid yields an empty mask and no
    /// values; callers treat that as no data.
    pub fn sample(&self, polygon: &Polygon, grid: &RasterGrid) -> SampledSite {
        let grid_polygon = self.to_grid_space(polygon);
        let (width, height) = grid.dimensions();
        let mask = rasterize(&grid_polygon, width, height);

        let mut values = Vec::new();
        if let Some(window) = mask.window() {
            for row in window.row..window.row + window.height {
                for col in window.col..window.col + window.width {
                    if mask.get(col, row) {
                        if let Some(v) = grid.get(col, row) {
                            values.push(f64::from(v));
                        }
                    }
                }
            }
        }

        debug!(
            masked_cells = mask.count(),
            values = values.len(),
            "Sampled polygon over grid"
        );

        SampledSite {
            mask,
            values,
            grid_polygon,
        }
    }
}
