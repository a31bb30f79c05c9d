//! Error types for configuration, annotation and boundary loading.

use std::path::PathBuf;
use thiserror::Error;

/// Errors from loading inputs or building the run configuration.
#[derive(Debug, Error)]
pub enum ModelError {
    /// I/O error reading a file.
    #[error("I/O error reading {path}: {source}")]
    Io {
        /// File being read.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// YAML parsing error.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON parsing error.
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// The configuration is unusable.
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// The boundary document is not a usable GeoJSON polygon.
    #[error("Invalid GeoJSON boundary: {0}")]
    InvalidGeoJson(String),
}

impl ModelError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ModelError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Fatal configuration problems, detected before any site is processed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationError {
    /// Degree rasters need a latitude for the meter scale.
    #[error("reference_latitude is required when raster_units is degrees")]
    MissingReferenceLatitude,

    /// Latitude outside [-90, 90] or not finite.
    #[error("reference_latitude {0} is not a valid latitude")]
    InvalidLatitude(f64),

    /// Neither a boundary nor an illegal index list was given.
    #[error("no classification policy: set boundary or illegal_site_indices")]
    NoClassificationPolicy,

    /// `min_inside_fraction` outside [0, 1].
    #[error("min_inside_fraction {0} must be within [0, 1]")]
    InvalidThreshold(f64),

    /// Monte Carlo sample count of zero.
    #[error("monte_carlo.samples must be at least 1")]
    InvalidSampleCount,

    /// The boundary file could not be read or parsed.
    #[error("boundary {path} is unreadable: {reason}")]
    BoundaryUnreadable {
        /// Boundary file path.
        path: PathBuf,
        /// What went wrong.
        reason: String,
    },

    /// The boundary ring is degenerate or self-intersecting.
    #[error("invalid boundary polygon: {0}")]
    InvalidBoundary(String),

    /// Explicit reference image dimensions of zero.
    #[error("reference image dimensions {width}x{height} must be non-zero")]
    InvalidReferenceImage {
        /// Configured width.
        width: u32,
        /// Configured height.
        height: u32,
    },

    /// Reference buffer distance not a positive number.
    #[error("reference_buffer must be a positive number of DEM pixels, got {0}")]
    InvalidReferenceBuffer(f64),
}
