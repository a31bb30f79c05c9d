//! # minewatch-dem
//!
//! Elevation rasters and polygon sampling.
//!
//! This crate provides:
//! - [`RasterGrid`]: a single-band grid with an affine transform, loaded from
//!   a GeoTIFF (SRTM and similar DEM exports) or built in memory.
//! - [`RasterSampler`]: rasterizes annotation polygons into boolean masks over
//!   the grid and extracts the elevations under the mask, rescaling polygons
//!   when the annotation image and the DEM have different pixel dimensions.
//!
//! ## Example
//!
//! ```no_run
//! use minewatch_dem::{RasterGrid, RasterSampler};
//! use minewatch_geom::Polygon;
//!
//! let dem = RasterGrid::from_geotiff("data/Singrauli_SRTM_DEM.tif")?;
//!
//! // Annotations were drawn on a 1500x719 image of the same extent
//! let sampler = RasterSampler::new((1500, 719), dem.dimensions())?;
//!
//! let site = Polygon::from_flat(&[100.0, 100.0, 180.0, 100.0, 180.0, 160.0, 100.0, 160.0])
//!     .expect("valid ring");
//! let sample = sampler.sample(&site, &dem);
//! println!("{} cells under the mask", sample.values.len());
//! # Ok::<(), minewatch_dem::DemError>(())
//! ```

mod error;
mod raster;
mod sampler;

pub use error::DemError;
pub use raster::RasterGrid;
pub use sampler::{rasterize, CellWindow, Mask, MaskedWindow, RasterAlignment, RasterSampler, SampledSite};

/// Result type for raster operations.
pub type Result<T> = std::result::Result<T, DemError>;
