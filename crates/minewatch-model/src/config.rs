//! Run configuration.
//!
//! A run is described by a YAML file deserialized into [`RunConfig`]. CLI
//! flags may override individual fields; [`RunConfig::validate`] then checks
//! everything once and produces the [`ValidatedConfig`] the engine consumes.

use crate::boundary::{boundary_from_vertices, load_geojson_boundary};
use crate::{ConfigurationError, ModelError, Result};
use minewatch_geom::{is_high_latitude, MetricScale, Polygon, RasterUnits, HIGH_LATITUDE_LIMIT_DEG};
use minewatch_volume::{Integrator, MonteCarloParams, ReferencePolicy, VolumeCalculator, VolumeMethod};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Default share of a site that must lie inside the boundary to be legal.
pub const DEFAULT_MIN_INSIDE_FRACTION: f64 = 0.95;

// ============================================================================
// File Schema
// ============================================================================

/// Where the authorized boundary comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BoundarySource {
    /// Inline `[[x, y], ...]` ring in source coordinates.
    Vertices(Vec<[f64; 2]>),
    /// Path to a GeoJSON file.
    GeoJson(PathBuf),
}

/// Source of the annotation image's pixel dimensions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReferenceImage {
    /// Explicit dimensions.
    Dimensions {
        /// Width in pixels.
        width: u32,
        /// Height in pixels.
        height: u32,
    },
    /// A raster whose dimensions are read from its header.
    Raster {
        /// Path to the raster.
        path: PathBuf,
    },
}

/// Operator labels attached to each site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operators {
    /// Label for legal sites.
    #[serde(default = "default_legal_operator")]
    pub legal: String,
    /// Label for illegal sites.
    #[serde(default = "default_illegal_operator")]
    pub illegal: String,
}

fn default_legal_operator() -> String {
    "Authorized Operator".to_string()
}

fn default_illegal_operator() -> String {
    "Unauthorized".to_string()
}

impl Default for Operators {
    fn default() -> Self {
        Self {
            legal: default_legal_operator(),
            illegal: default_illegal_operator(),
        }
    }
}

/// Free-form descriptors of the run's inputs, copied into the report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSource {
    /// Human description of the data set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Annotation source label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotations: Option<String>,
    /// Elevation raster label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dem: Option<String>,
    /// Imagery label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imagery: Option<String>,
}

fn default_min_inside_fraction() -> f64 {
    DEFAULT_MIN_INSIDE_FRACTION
}

/// The run configuration as written in YAML.
///
/// ```yaml
/// reference_latitude: 24.19
/// illegal_site_indices: [7, 8, 9]
/// reference_elevation_policy: min
/// volume_method: simpsons
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    /// Latitude for the meters-per-degree scale.
    #[serde(default)]
    pub reference_latitude: Option<f64>,
    /// Units of the DEM's source coordinates.
    #[serde(default)]
    pub raster_units: RasterUnits,
    /// Static classification: zero-based indices of illegal sites.
    #[serde(default)]
    pub illegal_site_indices: Option<Vec<usize>>,
    /// Boundary classification: authorized zone.
    #[serde(default)]
    pub boundary: Option<BoundarySource>,
    /// Share of a site that must be inside the boundary to be legal.
    #[serde(default = "default_min_inside_fraction")]
    pub min_inside_fraction: f64,
    /// Statistic picking each site's depth datum.
    #[serde(default)]
    pub reference_elevation_policy: ReferencePolicy,
    /// Take the reference from a ring of cells this many DEM pixels around
    /// each site instead of from the site itself.
    #[serde(default)]
    pub reference_buffer: Option<f64>,
    /// Volume integration method.
    #[serde(default)]
    pub volume_method: VolumeMethod,
    /// Monte Carlo parameters, read when `volume_method` is `montecarlo`.
    #[serde(default)]
    pub monte_carlo: MonteCarloParams,
    /// Operator labels.
    #[serde(default)]
    pub operators: Operators,
    /// Use each site's centroid latitude for its meter scale.
    #[serde(default)]
    pub per_site_latitude: bool,
    /// Process sites on the rayon thread pool.
    #[serde(default)]
    pub parallel: bool,
    /// Annotation image dimensions or a raster to read them from.
    #[serde(default)]
    pub reference_image: Option<ReferenceImage>,
    /// Descriptors copied into the report.
    #[serde(default)]
    pub data_source: DataSource,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            reference_latitude: None,
            raster_units: RasterUnits::default(),
            illegal_site_indices: None,
            boundary: None,
            min_inside_fraction: DEFAULT_MIN_INSIDE_FRACTION,
            reference_elevation_policy: ReferencePolicy::default(),
            reference_buffer: None,
            volume_method: VolumeMethod::default(),
            monte_carlo: MonteCarloParams::default(),
            operators: Operators::default(),
            per_site_latitude: false,
            parallel: false,
            reference_image: None,
            data_source: DataSource::default(),
        }
    }
}

// ============================================================================
// Validated Configuration
// ============================================================================

/// An authorized zone and the containment threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct Boundary {
    /// Zone ring in source coordinates.
    pub polygon: Polygon,
    /// Minimum inside fraction for a legal site.
    pub min_inside_fraction: f64,
}

/// How sites are classified.
#[derive(Debug, Clone, PartialEq)]
pub enum ClassificationPolicy {
    /// Fixed set of illegal site indices.
    Static {
        /// Zero-based illegal indices.
        illegal: BTreeSet<usize>,
    },
    /// Containment against an authorized zone.
    Boundary(Boundary),
}

impl ClassificationPolicy {
    /// Short name for reports and logs.
    pub fn mode(&self) -> &'static str {
        match self {
            ClassificationPolicy::Static { .. } => "static",
            ClassificationPolicy::Boundary(_) => "boundary",
        }
    }
}

/// A checked configuration, ready for the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedConfig {
    /// Reference latitude; always set for degree rasters.
    pub reference_latitude: Option<f64>,
    /// Units of the DEM's source coordinates.
    pub raster_units: RasterUnits,
    /// Classification policy.
    pub classification: ClassificationPolicy,
    /// Reference policy and integrator.
    pub volume: VolumeCalculator,
    /// Ring width in DEM pixels for surrounding-ground references.
    pub reference_buffer: Option<f64>,
    /// Operator labels.
    pub operators: Operators,
    /// Per-site latitude for the meter scale.
    pub per_site_latitude: bool,
    /// Process sites in parallel.
    pub parallel: bool,
    /// Annotation image dimension source.
    pub reference_image: Option<ReferenceImage>,
    /// Report descriptors.
    pub data_source: DataSource,
}

impl ValidatedConfig {
    /// The run-wide meter scale.
    pub fn metric_scale(&self) -> MetricScale {
        match (self.raster_units, self.reference_latitude) {
            (RasterUnits::Degrees, Some(latitude)) => MetricScale::for_latitude(latitude),
            _ => MetricScale::identity(),
        }
    }

    /// The meter scale for a site centered at `latitude` (source units).
    ///
    /// Equal to [`Self::metric_scale`] unless per-site latitude is enabled.
    pub fn metric_scale_at(&self, latitude: f64) -> MetricScale {
        match self.raster_units {
            RasterUnits::Degrees if self.per_site_latitude && latitude.is_finite() => {
                MetricScale::for_latitude(latitude)
            }
            _ => self.metric_scale(),
        }
    }
}

impl RunConfig {
    /// Resolve relative file paths against `base` (the config file's directory).
    pub fn resolve_paths(&mut self, base: &Path) {
        if let Some(BoundarySource::GeoJson(path)) = &mut self.boundary {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
        if let Some(ReferenceImage::Raster { path }) = &mut self.reference_image {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
    }

    /// Check the configuration and load the boundary.
    pub fn validate(&self) -> std::result::Result<ValidatedConfig, ConfigurationError> {
        let reference_latitude = match (self.raster_units, self.reference_latitude) {
            (_, Some(lat)) if !lat.is_finite() || lat.abs() > 90.0 => {
                return Err(ConfigurationError::InvalidLatitude(lat));
            }
            (RasterUnits::Degrees, None) => return Err(ConfigurationError::MissingReferenceLatitude),
            (_, latitude) => latitude,
        };
        if let (RasterUnits::Degrees, Some(latitude)) = (self.raster_units, reference_latitude) {
            if is_high_latitude(latitude) {
                warn!(
                    latitude,
                    limit = HIGH_LATITUDE_LIMIT_DEG,
                    "Reference latitude is near a pole; meters-per-degree scale degenerates"
                );
            }
        }

        if let Some(buffer) = self.reference_buffer {
            if !buffer.is_finite() || buffer <= 0.0 {
                return Err(ConfigurationError::InvalidReferenceBuffer(buffer));
            }
        }

        if !(0.0..=1.0).contains(&self.min_inside_fraction) {
            return Err(ConfigurationError::InvalidThreshold(self.min_inside_fraction));
        }

        let integrator = Integrator::new(self.volume_method, self.monte_carlo)
            .map_err(|_| ConfigurationError::InvalidSampleCount)?;

        if let Some(ReferenceImage::Dimensions { width, height }) = self.reference_image {
            if width == 0 || height == 0 {
                return Err(ConfigurationError::InvalidReferenceImage { width, height });
            }
        }

        let classification = self.classification_policy()?;

        let validated = ValidatedConfig {
            reference_latitude,
            raster_units: self.raster_units,
            classification,
            volume: VolumeCalculator::new(self.reference_elevation_policy, integrator),
            reference_buffer: self.reference_buffer,
            operators: self.operators.clone(),
            per_site_latitude: self.per_site_latitude,
            parallel: self.parallel,
            reference_image: self.reference_image.clone(),
            data_source: self.data_source.clone(),
        };

        info!(
            mode = validated.classification.mode(),
            policy = %self.reference_elevation_policy,
            method = %self.volume_method,
            latitude = ?reference_latitude,
            "Configuration validated"
        );

        Ok(validated)
    }

    fn classification_policy(&self) -> std::result::Result<ClassificationPolicy, ConfigurationError> {
        match (&self.boundary, &self.illegal_site_indices) {
            (Some(source), static_list) => {
                if static_list.is_some() {
                    warn!("Both boundary and illegal_site_indices are set; classifying by boundary");
                }
                let polygon = match source {
                    BoundarySource::Vertices(vertices) => boundary_from_vertices(vertices)
                        .map_err(|e| ConfigurationError::InvalidBoundary(e.to_string()))?,
                    BoundarySource::GeoJson(path) => {
                        load_geojson_boundary(path).map_err(|e| ConfigurationError::BoundaryUnreadable {
                            path: path.clone(),
                            reason: e.to_string(),
                        })?
                    }
                };
                Ok(ClassificationPolicy::Boundary(Boundary {
                    polygon,
                    min_inside_fraction: self.min_inside_fraction,
                }))
            }
            (None, Some(indices)) => Ok(ClassificationPolicy::Static {
                illegal: indices.iter().copied().collect(),
            }),
            (None, None) => Err(ConfigurationError::NoClassificationPolicy),
        }
    }
}

// ============================================================================
// Loading
// ============================================================================

/// Parse a run configuration from YAML text.
pub fn load_config_from_str(yaml: &str) -> Result<RunConfig> {
    Ok(serde_yaml::from_str(yaml)?)
}

/// Load a run configuration file, resolving relative paths against its
/// directory.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<RunConfig> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|e| ModelError::io(path, e))?;
    let mut config = load_config_from_str(&text)?;
    if let Some(dir) = path.parent() {
        config.resolve_paths(dir);
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn static_config() -> RunConfig {
        RunConfig {
            reference_latitude: Some(24.19),
            illegal_site_indices: Some(vec![1]),
            ..RunConfig::default()
        }
    }

    #[test]
    fn test_parse_minimal_yaml() {
        let config = load_config_from_str(
            "reference_latitude: 24.19\nillegal_site_indices: [7, 8]\n",
        )
        .unwrap();
        assert_eq!(config.reference_latitude, Some(24.19));
        assert_eq!(config.illegal_site_indices, Some(vec![7, 8]));
        assert_eq!(config.reference_elevation_policy, ReferencePolicy::Min);
        assert_eq!(config.volume_method, VolumeMethod::Simpsons);
        assert_eq!(config.min_inside_fraction, DEFAULT_MIN_INSIDE_FRACTION);
        assert_eq!(config.monte_carlo, MonteCarloParams::default());
    }

    #[test]
    fn test_parse_full_yaml() {
        let yaml = r#"
reference_latitude: 24.19
raster_units: degrees
boundary: [[82.5, 24.1], [82.7, 24.1], [82.7, 24.3], [82.5, 24.3]]
min_inside_fraction: 0.9
reference_elevation_policy: median
volume_method: montecarlo
monte_carlo:
  samples: 2000
  seed: 7
operators:
  legal: Northern Coalfields Limited
per_site_latitude: true
parallel: true
reference_image:
  width: 1500
  height: 719
data_source:
  description: Singrauli satellite data + SRTM DEM
"#;
        let config = load_config_from_str(yaml).unwrap();
        assert_eq!(config.monte_carlo, MonteCarloParams { samples: 2000, seed: 7 });
        assert_eq!(config.operators.legal, "Northern Coalfields Limited");
        assert_eq!(config.operators.illegal, "Unauthorized");
        assert_eq!(
            config.reference_image,
            Some(ReferenceImage::Dimensions { width: 1500, height: 719 })
        );

        let validated = config.validate().unwrap();
        assert_eq!(validated.classification.mode(), "boundary");
        assert_eq!(validated.volume.integrator(), Integrator::MonteCarlo(MonteCarloParams { samples: 2000, seed: 7 }));
        assert!(validated.parallel);
    }

    #[test]
    fn test_unknown_field_rejected() {
        assert!(load_config_from_str("reference_lattitude: 24.0\n").is_err());
    }

    #[test]
    fn test_boundary_path_form() {
        let mut config = load_config_from_str("boundary: lease.geojson\n").unwrap();
        config.resolve_paths(Path::new("/data/run"));
        assert_eq!(
            config.boundary,
            Some(BoundarySource::GeoJson(PathBuf::from("/data/run/lease.geojson")))
        );
    }

    #[test]
    fn test_missing_latitude_for_degrees() {
        let config = RunConfig {
            reference_latitude: None,
            ..static_config()
        };
        assert_eq!(config.validate().unwrap_err(), ConfigurationError::MissingReferenceLatitude);
    }

    #[test]
    fn test_meters_need_no_latitude() {
        let config = RunConfig {
            reference_latitude: None,
            raster_units: RasterUnits::Meters,
            ..static_config()
        };
        let validated = config.validate().unwrap();
        assert_eq!(validated.metric_scale(), MetricScale::identity());
    }

    #[test]
    fn test_no_policy_is_error() {
        let config = RunConfig {
            illegal_site_indices: None,
            ..static_config()
        };
        assert_eq!(config.validate().unwrap_err(), ConfigurationError::NoClassificationPolicy);
    }

    #[test]
    fn test_threshold_and_samples_checked() {
        let config = RunConfig {
            min_inside_fraction: 1.5,
            ..static_config()
        };
        assert_eq!(config.validate().unwrap_err(), ConfigurationError::InvalidThreshold(1.5));

        let config = RunConfig {
            volume_method: VolumeMethod::MonteCarlo,
            monte_carlo: MonteCarloParams { samples: 0, seed: 1 },
            ..static_config()
        };
        assert_eq!(config.validate().unwrap_err(), ConfigurationError::InvalidSampleCount);
    }

    #[test]
    fn test_reference_buffer() {
        let config = load_config_from_str(
            "reference_latitude: 24.19\nillegal_site_indices: []\nreference_elevation_policy: percentile\nreference_buffer: 3\n",
        )
        .unwrap();
        let validated = config.validate().unwrap();
        assert_eq!(validated.reference_buffer, Some(3.0));
        assert_eq!(validated.volume.policy(), ReferencePolicy::Percentile);

        for bad in [0.0, -2.0, f64::NAN] {
            let config = RunConfig {
                reference_buffer: Some(bad),
                ..static_config()
            };
            assert!(matches!(
                config.validate().unwrap_err(),
                ConfigurationError::InvalidReferenceBuffer(_)
            ));
        }
    }

    #[test]
    fn test_boundary_with_repeated_vertex_is_valid() {
        let config = RunConfig {
            boundary: Some(BoundarySource::Vertices(vec![
                [0.0, 0.0],
                [1.0, 0.0],
                [1.0, 0.0],
                [1.0, 1.0],
                [0.0, 1.0],
            ])),
            ..static_config()
        };
        let validated = config.validate().unwrap();
        assert!(matches!(validated.classification, ClassificationPolicy::Boundary(_)));
    }

    #[test]
    fn test_unreadable_boundary_file() {
        let config = RunConfig {
            boundary: Some(BoundarySource::GeoJson(PathBuf::from("/nonexistent/lease.geojson"))),
            ..static_config()
        };
        assert!(matches!(
            config.validate().unwrap_err(),
            ConfigurationError::BoundaryUnreadable { .. }
        ));
    }

    #[test]
    fn test_boundary_wins_over_static_list() {
        let config = RunConfig {
            boundary: Some(BoundarySource::Vertices(vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0]])),
            ..static_config()
        };
        let validated = config.validate().unwrap();
        assert!(matches!(validated.classification, ClassificationPolicy::Boundary(_)));
    }

    #[test]
    fn test_static_policy_and_scale() {
        let validated = static_config().validate().unwrap();
        assert_eq!(
            validated.classification,
            ClassificationPolicy::Static { illegal: BTreeSet::from([1]) }
        );
        let scale = validated.metric_scale();
        assert!((scale.m_per_unit_y - 111_320.0).abs() < 1e-9);
        assert_eq!(validated.metric_scale_at(60.0), scale);
    }
}
