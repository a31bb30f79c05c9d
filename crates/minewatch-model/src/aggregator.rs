//! Run-wide totals.

use crate::config::DataSource;
use crate::report::{
    BoundarySummary, Classification, MetricsReport, ReportMetadata, Severity, SiteRecord, SkippedAnnotation,
    Violation, ViolationKind, SQUARE_METERS_PER_HECTARE,
};
use chrono::{DateTime, Utc};
use minewatch_dem::RasterAlignment;
use minewatch_geom::{Coord, Polygon};
use minewatch_volume::{ReferencePolicy, VolumeMethod};
use tracing::info;

/// Authorized zone figures needed for utilization.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AuthorizedZone {
    /// Zone area in square meters.
    pub area_m2: f64,
    /// Legality threshold.
    pub min_inside_fraction: f64,
}

/// Run settings echoed into the report metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct RunContext {
    /// Input descriptors.
    pub data_source: DataSource,
    /// Reference latitude.
    pub reference_latitude: Option<f64>,
    /// Reference elevation policy.
    pub reference_policy: ReferencePolicy,
    /// Integration method.
    pub volume_method: VolumeMethod,
    /// `static` or `boundary`.
    pub classification_mode: String,
    /// Image-to-DEM rescale, if any.
    pub raster_alignment: Option<RasterAlignment>,
    /// Authorized zone, in boundary mode.
    pub authorized_zone: Option<AuthorizedZone>,
}

/// Builds the [`MetricsReport`] from site records. Performs no I/O.
#[derive(Debug, Clone)]
pub struct MetricsAggregator {
    context: RunContext,
}

fn percent(part: f64, whole: f64) -> f64 {
    if whole > 0.0 {
        part / whole * 100.0
    } else {
        0.0
    }
}

impl MetricsAggregator {
    /// Create an aggregator.
    pub fn new(context: RunContext) -> Self {
        Self { context }
    }

    /// Aggregate with the current time as the timestamp.
    pub fn aggregate(&self, sites: Vec<SiteRecord>, skipped: Vec<SkippedAnnotation>) -> MetricsReport {
        self.aggregate_at(sites, skipped, Utc::now())
    }

    /// Aggregate with an explicit timestamp.
    pub fn aggregate_at(
        &self,
        mut sites: Vec<SiteRecord>,
        mut skipped: Vec<SkippedAnnotation>,
        generated_at: DateTime<Utc>,
    ) -> MetricsReport {
        sites.sort_by_key(|s| s.index);
        skipped.sort_by_key(|s| s.index);

        let mut legal_sites = 0;
        let mut illegal_sites = 0;
        let mut no_data_sites = 0;
        let (mut total_area, mut legal_area, mut illegal_area) = (0.0, 0.0, 0.0);
        let (mut total_volume, mut legal_volume, mut illegal_volume) = (0.0, 0.0, 0.0);

        for site in &sites {
            let m = &site.metrics;
            total_area += m.area_m2;
            total_volume += m.volume_m3;
            match site.classification {
                Classification::Legal => {
                    legal_sites += 1;
                    legal_area += m.area_m2;
                    legal_volume += m.volume_m3;
                }
                Classification::Illegal => {
                    illegal_sites += 1;
                    illegal_area += m.area_m2;
                    illegal_volume += m.volume_m3;
                }
            }
            if m.no_data {
                no_data_sites += 1;
            }
        }

        let boundary = self.context.authorized_zone.map(|zone| BoundarySummary {
            authorized_area_m2: zone.area_m2,
            utilization_percent: percent(legal_area, zone.area_m2),
            illegal_percent: percent(illegal_area, total_area),
            min_inside_fraction: zone.min_inside_fraction,
        });
        let violations = if boundary.is_some() {
            collect_violations(&sites)
        } else {
            Vec::new()
        };

        info!(
            sites = sites.len(),
            legal = legal_sites,
            illegal = illegal_sites,
            skipped = skipped.len(),
            total_area_m2 = total_area,
            total_volume_m3 = total_volume,
            "Aggregated metrics report"
        );

        MetricsReport {
            metadata: ReportMetadata {
                generated_at,
                data_source: self.context.data_source.clone(),
                total_sites: sites.len(),
                legal_sites,
                illegal_sites,
                no_data_sites,
                total_area_m2: total_area,
                legal_area_m2: legal_area,
                illegal_area_m2: illegal_area,
                total_area_hectares: total_area / SQUARE_METERS_PER_HECTARE,
                total_volume_m3: total_volume,
                legal_volume_m3: legal_volume,
                illegal_volume_m3: illegal_volume,
                reference_latitude: self.context.reference_latitude,
                reference_policy: self.context.reference_policy,
                volume_method: self.context.volume_method,
                classification_mode: self.context.classification_mode.clone(),
                raster_alignment: self.context.raster_alignment,
                skipped,
                boundary,
                violations,
            },
            sites,
        }
    }
}

fn centroid_of(ring: &[[f64; 2]]) -> [f64; 2] {
    let vertices = ring.iter().map(|&[x, y]| Coord::new(x, y)).collect();
    match Polygon::from_vertices(vertices) {
        Ok(polygon) => {
            let c = polygon.centroid();
            [c.x, c.y]
        }
        Err(_) => [f64::NAN, f64::NAN],
    }
}

fn collect_violations(sites: &[SiteRecord]) -> Vec<Violation> {
    let mut fully_outside = 0;
    let mut partial = 0;
    let mut violations = Vec::new();

    for site in sites.iter().filter(|s| !s.classification.is_legal()) {
        let Some(fraction) = site.inside_fraction else {
            continue;
        };
        let kind = ViolationKind::for_fraction(fraction);
        let violation_id = match kind {
            ViolationKind::FullyOutside => {
                fully_outside += 1;
                format!("ILLEGAL_{}", fully_outside)
            }
            ViolationKind::PartiallyOutside => {
                partial += 1;
                format!("PARTIAL_{}", partial)
            }
        };
        let severity = match kind {
            ViolationKind::FullyOutside => Severity::High,
            ViolationKind::PartiallyOutside => Severity::for_fraction(fraction),
        };

        let area = site.metrics.area_m2;
        violations.push(Violation {
            violation_id,
            kind,
            severity,
            site_index: site.index,
            site_id: site.id,
            area_m2: area,
            outside_area_m2: area * (1.0 - fraction),
            outside_percent: (1.0 - fraction) * 100.0,
            centroid: centroid_of(&site.geometry.geographic),
        });
    }

    violations
}
