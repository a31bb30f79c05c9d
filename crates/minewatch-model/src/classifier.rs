//! Legal/illegal site classification.

use crate::config::{ClassificationPolicy, Operators, ValidatedConfig};
use crate::report::{Classification, Severity, ViolationKind};
use geo::{Area, BooleanOps, LineString};
use minewatch_geom::{validate_polygon, Polygon};
use tracing::debug;

/// Inside fractions at or below this are fully outside.
pub const FULLY_OUTSIDE_FRACTION: f64 = 0.05;

/// Sample grid resolution for rings geo cannot intersect.
const FALLBACK_SAMPLES_PER_AXIS: usize = 64;

/// Classification of one site.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationOutcome {
    /// Legal status.
    pub classification: Classification,
    /// Operator label.
    pub operator: String,
    /// Share inside the boundary, in boundary mode.
    pub inside_fraction: Option<f64>,
}

/// Classifies sites under a fixed policy.
#[derive(Debug, Clone)]
pub struct SiteClassifier {
    policy: ClassificationPolicy,
    operators: Operators,
}

impl SiteClassifier {
    /// Create a classifier.
    pub fn new(policy: ClassificationPolicy, operators: Operators) -> Self {
        Self { policy, operators }
    }

    /// Create a classifier from a validated configuration.
    pub fn from_config(config: &ValidatedConfig) -> Self {
        Self::new(config.classification.clone(), config.operators.clone())
    }

    /// The policy in use.
    pub fn policy(&self) -> &ClassificationPolicy {
        &self.policy
    }

    /// Classify site `index` whose ring in source coordinates is `geographic`.
    pub fn classify(&self, index: usize, geographic: &Polygon) -> ClassificationOutcome {
        let (classification, inside_fraction) = match &self.policy {
            ClassificationPolicy::Static { illegal } => {
                let class = if illegal.contains(&index) {
                    Classification::Illegal
                } else {
                    Classification::Legal
                };
                (class, None)
            }
            ClassificationPolicy::Boundary(boundary) => {
                let fraction = inside_fraction(geographic, &boundary.polygon);
                let class = if fraction >= boundary.min_inside_fraction {
                    Classification::Legal
                } else {
                    Classification::Illegal
                };
                debug!(index, fraction, %class, "Boundary classification");
                (class, Some(fraction))
            }
        };

        let operator = match classification {
            Classification::Legal => self.operators.legal.clone(),
            Classification::Illegal => self.operators.illegal.clone(),
        };

        ClassificationOutcome {
            classification,
            operator,
            inside_fraction,
        }
    }
}

impl ViolationKind {
    /// Kind of violation for an illegal site with this inside fraction.
    pub fn for_fraction(inside_fraction: f64) -> Self {
        if inside_fraction <= FULLY_OUTSIDE_FRACTION {
            ViolationKind::FullyOutside
        } else {
            ViolationKind::PartiallyOutside
        }
    }
}

impl Severity {
    /// Severity for an illegal site with this inside fraction.
    pub fn for_fraction(inside_fraction: f64) -> Self {
        if inside_fraction > 0.5 {
            Severity::Medium
        } else {
            Severity::High
        }
    }
}

fn to_geo(polygon: &Polygon) -> geo::Polygon<f64> {
    let mut ring: Vec<(f64, f64)> = polygon.vertices().iter().map(|c| (c.x, c.y)).collect();
    // Repeated vertices would become zero-length segments
    ring.dedup();
    while ring.len() > 1 && ring.first() == ring.last() {
        ring.pop();
    }
    geo::Polygon::new(LineString::from(ring), vec![])
}

/// Share of `site`'s area that lies inside `zone`, in `[0, 1]`.
///
/// Zero-area simple rings are fully outside. Self-intersecting rings are
/// estimated on a regular point grid with the even-odd rule.
pub fn inside_fraction(site: &Polygon, zone: &Polygon) -> f64 {
    if !site.bounding_box().intersects(&zone.bounding_box()) {
        return 0.0;
    }

    let fraction = if validate_polygon(site).is_simple() {
        if site.area() <= 0.0 {
            return 0.0;
        }
        let site_geo = to_geo(site);
        let overlap = site_geo.intersection(&to_geo(zone));
        overlap.unsigned_area() / site_geo.unsigned_area()
    } else {
        sampled_inside_fraction(site, zone)
    };
    fraction.clamp(0.0, 1.0)
}

fn sampled_inside_fraction(site: &Polygon, zone: &Polygon) -> f64 {
    let bbox = site.bounding_box();
    let n = FALLBACK_SAMPLES_PER_AXIS;
    let (step_x, step_y) = (bbox.width() / n as f64, bbox.height() / n as f64);

    let mut in_site = 0usize;
    let mut in_both = 0usize;
    for i in 0..n {
        let y = bbox.min_y + (i as f64 + 0.5) * step_y;
        for j in 0..n {
            let x = bbox.min_x + (j as f64 + 0.5) * step_x;
            if site.contains(x, y) {
                in_site += 1;
                if zone.contains(x, y) {
                    in_both += 1;
                }
            }
        }
    }

    if in_site == 0 {
        0.0
    } else {
        in_both as f64 / in_site as f64
    }
}
