//! # minewatch-geom
//!
//! Planar geometry for mining-site annotations.
//!
//! This crate provides the two leaf components of the metrics engine:
//! - **Coordinate transforms**: raster affine transforms mapping pixel
//!   indices to geographic degrees, and the local meters-per-degree scale
//!   used to turn degrees into meters near a reference latitude.
//! - **Polygons**: annotation rings built from flat `x, y` lists, with area,
//!   perimeter, bounding box and point containment.
//!
//! ## Example
//!
//! ```
//! use minewatch_geom::{AffineTransform, MetricScale, Polygon};
//!
//! // A COCO-style annotation ring in image pixel space
//! let polygon = Polygon::from_flat(&[0.0, 0.0, 10.0, 0.0, 10.0, 10.0, 0.0, 10.0])?;
//! assert_eq!(polygon.area(), 100.0);
//!
//! // North-up raster with 0.001 degree pixels
//! let transform = AffineTransform::new(0.001, 0.0, 82.5, 0.0, -0.001, 24.3);
//! let (lon, lat) = transform.pixel_to_degrees(10.0, 10.0);
//! let scale = MetricScale::for_latitude(lat);
//! let (x_m, y_m) = scale.to_meters(lon, lat);
//! # let _ = (x_m, y_m);
//! # Ok::<(), minewatch_geom::GeomError>(())
//! ```

mod error;
mod polygon;
mod transform;
mod validate;

pub use error::GeomError;
pub use polygon::{BoundingBox, Coord, Polygon};
pub use transform::{
    degrees_to_meters_scale, is_high_latitude, AffineTransform, GeoReference, MetricScale, RasterUnits,
    HIGH_LATITUDE_LIMIT_DEG, METERS_PER_DEGREE,
};
pub use validate::{validate_polygon, PolygonValidation};

/// Result type for geometry operations.
pub type Result<T> = std::result::Result<T, GeomError>;
