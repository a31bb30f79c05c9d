//! Site records and the run report.

use crate::config::DataSource;
use chrono::{DateTime, Utc};
use minewatch_dem::RasterAlignment;
use minewatch_volume::{DepthStats, ElevationStats, ReferencePolicy, ReferenceSource, VolumeMethod};
use serde::{Deserialize, Serialize};

/// Square meters per hectare.
pub const SQUARE_METERS_PER_HECTARE: f64 = 10_000.0;

/// Cubic feet per cubic meter.
pub const CUBIC_FEET_PER_CUBIC_METER: f64 = 35.314_666_7;

/// Legal status of a site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    /// Authorized site.
    Legal,
    /// Unauthorized site.
    Illegal,
}

impl Classification {
    /// Lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::Legal => "legal",
            Classification::Illegal => "illegal",
        }
    }

    /// True for [`Classification::Legal`].
    pub fn is_legal(&self) -> bool {
        matches!(self, Classification::Legal)
    }
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A site's ring in each coordinate space.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SiteGeometry {
    /// Annotation image pixels.
    pub pixel: Vec<[f64; 2]>,
    /// DEM pixels, after any rescale.
    pub dem_pixel: Vec<[f64; 2]>,
    /// Source coordinates (lon/lat for degree rasters).
    pub geographic: Vec<[f64; 2]>,
}

/// Measurements for one site.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SiteMetrics {
    /// Planar area in square meters.
    pub area_m2: f64,
    /// Area in hectares.
    pub area_hectares: f64,
    /// Perimeter in meters.
    pub perimeter_m: f64,
    /// Representative depth (deepest cell) in meters.
    pub depth_m: f64,
    /// Estimated volume in cubic meters.
    pub volume_m3: f64,
    /// Estimated volume in cubic feet.
    pub volume_cubic_feet: f64,
    /// Datum the depths were measured from.
    pub reference_elevation_m: f64,
    /// Whether the datum came from the site or the ring around it.
    pub reference_source: ReferenceSource,
    /// Elevations under the mask.
    pub elevation: ElevationStats,
    /// Positive-depth statistics.
    pub depth: DepthStats,
    /// Masked DEM cells with data.
    pub cell_count: usize,
    /// True when no DEM cell with data lies under the site.
    pub no_data: bool,
}

/// Everything computed for one annotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteRecord {
    /// Annotation id.
    pub id: u64,
    /// Human label.
    pub label: String,
    /// Zero-based annotation index.
    pub index: usize,
    /// Legal status.
    pub classification: Classification,
    /// Operator label for the classification.
    pub operator: String,
    /// Share of the site inside the boundary, in boundary mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inside_fraction: Option<f64>,
    /// Rings in each coordinate space.
    pub geometry: SiteGeometry,
    /// Measurements.
    pub metrics: SiteMetrics,
    /// Non-fatal observations (self-intersecting ring, no data).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<String>,
}

/// An annotation that produced no record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedAnnotation {
    /// Zero-based annotation index.
    pub index: usize,
    /// Annotation id.
    pub annotation_id: u64,
    /// Why it was skipped.
    pub reason: String,
}

/// How far outside the boundary an illegal site is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    /// At most 5% inside.
    FullyOutside,
    /// Straddles the boundary.
    PartiallyOutside,
}

/// Violation severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// More than half the site is authorized.
    Medium,
    /// Half or less is authorized.
    High,
}

/// An illegal site found by boundary classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    /// `ILLEGAL_n` or `PARTIAL_n`, numbered per kind.
    pub violation_id: String,
    /// Kind of violation.
    #[serde(rename = "type")]
    pub kind: ViolationKind,
    /// Severity.
    pub severity: Severity,
    /// Index of the offending site.
    pub site_index: usize,
    /// Annotation id of the offending site.
    pub site_id: u64,
    /// Site area in square meters.
    pub area_m2: f64,
    /// Area outside the boundary in square meters.
    pub outside_area_m2: f64,
    /// Share outside the boundary, in percent.
    pub outside_percent: f64,
    /// Site centroid in source coordinates.
    pub centroid: [f64; 2],
}

/// Boundary-mode utilization figures.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundarySummary {
    /// Area of the authorized zone in square meters.
    pub authorized_area_m2: f64,
    /// Legal area as a percentage of the authorized area.
    pub utilization_percent: f64,
    /// Illegal area as a percentage of the total site area.
    pub illegal_percent: f64,
    /// Threshold used for legality.
    pub min_inside_fraction: f64,
}

/// Run-wide totals and provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// When the report was produced.
    pub generated_at: DateTime<Utc>,
    /// Input descriptors.
    pub data_source: DataSource,
    /// Records in the report.
    pub total_sites: usize,
    /// Legal records.
    pub legal_sites: usize,
    /// Illegal records.
    pub illegal_sites: usize,
    /// Records flagged `no_data`.
    pub no_data_sites: usize,
    /// Sum of site areas in square meters.
    pub total_area_m2: f64,
    /// Sum of legal site areas.
    pub legal_area_m2: f64,
    /// Sum of illegal site areas.
    pub illegal_area_m2: f64,
    /// Total area in hectares.
    pub total_area_hectares: f64,
    /// Sum of site volumes in cubic meters.
    pub total_volume_m3: f64,
    /// Sum of legal site volumes.
    pub legal_volume_m3: f64,
    /// Sum of illegal site volumes.
    pub illegal_volume_m3: f64,
    /// Reference latitude of the run.
    pub reference_latitude: Option<f64>,
    /// Reference elevation policy.
    pub reference_policy: ReferencePolicy,
    /// Volume integration method.
    pub volume_method: VolumeMethod,
    /// `static` or `boundary`.
    pub classification_mode: String,
    /// Image-to-DEM rescale, when dimensions differed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raster_alignment: Option<RasterAlignment>,
    /// Annotations without a record.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<SkippedAnnotation>,
    /// Boundary utilization, in boundary mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boundary: Option<BoundarySummary>,
    /// Boundary violations, in boundary mode.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub violations: Vec<Violation>,
}

/// The output of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsReport {
    /// Totals and provenance.
    pub metadata: ReportMetadata,
    /// One record per processed annotation, in annotation order.
    pub sites: Vec<SiteRecord>,
}

impl MetricsReport {
    /// Pretty-printed JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// The record for annotation `index`, if it was processed.
    pub fn site(&self, index: usize) -> Option<&SiteRecord> {
        self.sites.iter().find(|s| s.index == index)
    }
}
