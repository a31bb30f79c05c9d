//! Pixel, degree and meter coordinate conversions.

use serde::{Deserialize, Serialize};

/// Meters per degree of latitude (and of longitude at the equator).
pub const METERS_PER_DEGREE: f64 = 111_320.0;

/// Latitudes beyond this magnitude make the planar scale unreliable.
pub const HIGH_LATITUDE_LIMIT_DEG: f64 = 75.0;

/// Affine transform from raster grid indices to source coordinates.
///
/// Uses the same coefficient naming as GDAL/rasterio `Affine`:
///
/// ```text
/// x = a * col + b * row + c
/// y = d * col + e * row + f
/// ```
///
/// For a north-up raster `b` and `d` are zero and `e` is negative.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AffineTransform {
    /// Pixel width (x change per column).
    pub a: f64,
    /// Row rotation (x change per row).
    pub b: f64,
    /// X of the upper-left corner.
    pub c: f64,
    /// Column rotation (y change per column).
    pub d: f64,
    /// Pixel height (y change per row, usually negative).
    pub e: f64,
    /// Y of the upper-left corner.
    pub f: f64,
}

impl AffineTransform {
    /// Create a transform from its six coefficients in `a..f` order.
    pub const fn new(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Self {
        Self { a, b, c, d, e, f }
    }

    /// Create a north-up transform from the upper-left corner and pixel size.
    ///
    /// `pixel_height` is given as a positive size; rows run southward.
    pub fn north_up(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self::new(pixel_width, 0.0, origin_x, 0.0, -pixel_height.abs(), origin_y)
    }

    /// Create from a GDAL geotransform `[c, a, b, f, d, e]`.
    pub fn from_gdal(gt: [f64; 6]) -> Self {
        Self::new(gt[1], gt[2], gt[0], gt[4], gt[5], gt[3])
    }

    /// The identity transform (pixel space is source space).
    pub const fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0, 0.0, 1.0, 0.0)
    }

    /// Convert to a GDAL geotransform `[c, a, b, f, d, e]`.
    pub fn to_gdal(&self) -> [f64; 6] {
        [self.c, self.a, self.b, self.f, self.d, self.e]
    }

    /// Apply the transform to a (fractional) pixel position.
    ///
    /// No bounds checking: positions outside the raster extrapolate.
    pub fn apply(&self, col: f64, row: f64) -> (f64, f64) {
        (
            self.a * col + self.b * row + self.c,
            self.d * col + self.e * row + self.f,
        )
    }

    /// Convert a pixel position to `(lon, lat)` degrees.
    pub fn pixel_to_degrees(&self, col: f64, row: f64) -> (f64, f64) {
        self.apply(col, row)
    }

    /// Determinant of the linear part.
    pub fn determinant(&self) -> f64 {
        self.a * self.e - self.b * self.d
    }

    /// The inverse transform, or `None` when the transform is degenerate.
    pub fn inverse(&self) -> Option<Self> {
        let det = self.determinant();
        if det == 0.0 || !det.is_finite() {
            return None;
        }

        let ia = self.e / det;
        let ib = -self.b / det;
        let id = -self.d / det;
        let ie = self.a / det;
        let ic = -(ia * self.c + ib * self.f);
        let if_ = -(id * self.c + ie * self.f);

        Some(Self::new(ia, ib, ic, id, ie, if_))
    }

    /// Convert `(lon, lat)` degrees back to a fractional pixel position.
    pub fn degrees_to_pixel(&self, lon: f64, lat: f64) -> Option<(f64, f64)> {
        self.inverse().map(|inv| inv.apply(lon, lat))
    }

    /// Area of one cell in source units squared.
    pub fn cell_area(&self) -> f64 {
        self.determinant().abs()
    }

    /// Size of one cell along columns and rows, in source units.
    pub fn cell_size(&self) -> (f64, f64) {
        (self.a.hypot(self.d), self.b.hypot(self.e))
    }
}

impl Default for AffineTransform {
    fn default() -> Self {
        Self::identity()
    }
}

/// Units of a raster's source coordinate system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RasterUnits {
    /// Geographic CRS: coordinates are longitude/latitude degrees.
    #[default]
    Degrees,
    /// Projected CRS: coordinates are already meters.
    Meters,
}

/// Meters per source unit along x and y.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricScale {
    /// Meters per unit of x (longitude).
    pub m_per_unit_x: f64,
    /// Meters per unit of y (latitude).
    pub m_per_unit_y: f64,
}

impl MetricScale {
    /// Local degree-to-meter scale around `latitude`.
    ///
    /// This is a planar approximation; it is not a projection, and error
    /// grows with distance from the reference latitude. See
    /// [`is_high_latitude`] for where it stops being useful.
    pub fn for_latitude(latitude: f64) -> Self {
        let (x, y) = degrees_to_meters_scale(latitude);
        Self {
            m_per_unit_x: x,
            m_per_unit_y: y,
        }
    }

    /// Scale for rasters whose coordinates are already meters.
    pub const fn identity() -> Self {
        Self {
            m_per_unit_x: 1.0,
            m_per_unit_y: 1.0,
        }
    }

    /// Convert a source coordinate to planar meters.
    pub fn to_meters(&self, x: f64, y: f64) -> (f64, f64) {
        (x * self.m_per_unit_x, y * self.m_per_unit_y)
    }
}

/// Whether `latitude` is beyond [`HIGH_LATITUDE_LIMIT_DEG`].
pub fn is_high_latitude(latitude: f64) -> bool {
    latitude.abs() > HIGH_LATITUDE_LIMIT_DEG
}

/// Meters per degree of longitude and latitude at `latitude`.
///
/// Returns `(m_per_deg_x, m_per_deg_y)`. The latitude term is fixed at
/// 111320 m; the longitude term shrinks with `cos(latitude)`.
pub fn degrees_to_meters_scale(latitude: f64) -> (f64, f64) {
    (
        METERS_PER_DEGREE * latitude.to_radians().cos(),
        METERS_PER_DEGREE,
    )
}

/// A raster transform paired with the meter scale for its source units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoReference {
    /// Pixel to source transform.
    pub transform: AffineTransform,
    /// Source to meter scale.
    pub scale: MetricScale,
}

impl GeoReference {
    /// Pair a transform with a meter scale.
    pub fn new(transform: AffineTransform, scale: MetricScale) -> Self {
        Self { transform, scale }
    }

    /// Convert a pixel position to source coordinates.
    pub fn pixel_to_source(&self, col: f64, row: f64) -> (f64, f64) {
        self.transform.apply(col, row)
    }

    /// Convert a pixel position to planar meters.
    pub fn pixel_to_meters(&self, col: f64, row: f64) -> (f64, f64) {
        let (x, y) = self.transform.apply(col, row);
        self.scale.to_meters(x, y)
    }

    /// Area of one raster cell in square meters.
    pub fn cell_area_m2(&self) -> f64 {
        self.transform.cell_area() * self.scale.m_per_unit_x * self.scale.m_per_unit_y
    }

    /// Cell size in meters along columns and rows.
    pub fn cell_size_m(&self) -> (f64, f64) {
        let t = &self.transform;
        let s = &self.scale;
        (
            (t.a * s.m_per_unit_x).hypot(t.d * s.m_per_unit_y),
            (t.b * s.m_per_unit_x).hypot(t.e * s.m_per_unit_y),
        )
    }

    /// Same transform with a different meter scale.
    pub fn with_scale(&self, scale: MetricScale) -> Self {
        Self {
            transform: self.transform,
            scale,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_pixel_to_degrees_north_up() {
        let t = AffineTransform::north_up(82.0, 24.5, 0.001, 0.001);
        let (lon, lat) = t.pixel_to_degrees(100.0, 200.0);
        assert_relative_eq!(lon, 82.1, epsilon = 1e-12);
        assert_relative_eq!(lat, 24.3, epsilon = 1e-12);
    }

    #[test]
    fn test_out_of_range_pixels_extrapolate() {
        let t = AffineTransform::north_up(0.0, 0.0, 1.0, 1.0);
        assert_eq!(t.pixel_to_degrees(-5.0, -5.0), (-5.0, 5.0));
    }

    #[test]
    fn test_gdal_round_trip() {
        let gt = [82.0, 0.00027, 0.0, 24.5, 0.0, -0.00027];
        let t = AffineTransform::from_gdal(gt);
        assert_eq!(t.a, 0.00027);
        assert_eq!(t.c, 82.0);
        assert_eq!(t.e, -0.00027);
        assert_eq!(t.to_gdal(), gt);
    }

    #[test]
    fn test_inverse_with_rotation() {
        let t = AffineTransform::new(0.5, 0.1, 10.0, -0.2, -0.5, 20.0);
        let (x, y) = t.apply(37.0, 12.0);
        let (col, row) = t.degrees_to_pixel(x, y).expect("invertible");
        assert_relative_eq!(col, 37.0, epsilon = 1e-9);
        assert_relative_eq!(row, 12.0, epsilon = 1e-9);
    }

    #[test]
    fn test_degenerate_transform_has_no_inverse() {
        let t = AffineTransform::new(1.0, 2.0, 0.0, 2.0, 4.0, 0.0);
        assert!(t.inverse().is_none());
        assert!(t.degrees_to_pixel(1.0, 1.0).is_none());
    }

    #[test]
    fn test_scale_at_equator() {
        let (x, y) = degrees_to_meters_scale(0.0);
        assert_eq!(x, 111_320.0);
        assert_eq!(y, 111_320.0);
    }

    #[test]
    fn test_scale_is_symmetric_in_latitude() {
        for lat in [5.0, 24.19, 45.0, 60.0, 80.0] {
            assert_eq!(degrees_to_meters_scale(lat), degrees_to_meters_scale(-lat));
        }
    }

    #[test]
    fn test_high_latitude_limit() {
        assert!(!is_high_latitude(75.0));
        assert!(is_high_latitude(-75.5));
        assert!(!is_high_latitude(24.19));
    }

    #[test]
    fn test_latitude_axis_is_fixed() {
        assert_eq!(degrees_to_meters_scale(24.19).1, METERS_PER_DEGREE);
        assert_eq!(degrees_to_meters_scale(70.0).1, METERS_PER_DEGREE);
    }

    #[test]
    fn test_cell_area_m2() {
        let t = AffineTransform::north_up(82.0, 24.5, 0.001, 0.001);
        let geo = GeoReference::new(t, MetricScale::for_latitude(60.0));
        // cos(60) = 0.5
        assert_relative_eq!(geo.cell_area_m2(), 111.32 * 55.66, max_relative = 1e-9);
        let (dx, dy) = geo.cell_size_m();
        assert_relative_eq!(dx, 55.66, max_relative = 1e-9);
        assert_relative_eq!(dy, 111.32, max_relative = 1e-9);
    }

    #[test]
    fn test_meter_units_use_identity_scale() {
        let t = AffineTransform::north_up(500_000.0, 2_700_000.0, 30.0, 30.0);
        let geo = GeoReference::new(t, MetricScale::identity());
        assert_eq!(geo.cell_area_m2(), 900.0);
    }
}
