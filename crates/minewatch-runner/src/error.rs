//! Error types for the pipeline and CLI.

use minewatch_dem::DemError;
use minewatch_geom::GeomError;
use minewatch_model::{ConfigurationError, ModelError};
use minewatch_volume::VolumeError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors from running the pipeline.
#[derive(Debug, Error)]
pub enum RunError {
    /// Malformed annotation ring.
    #[error(transparent)]
    Geom(#[from] GeomError),

    /// Raster loading or sampling failure.
    #[error("DEM error: {0}")]
    Dem(#[from] DemError),

    /// Depth patch construction failure.
    #[error("Volume error: {0}")]
    Volume(#[from] VolumeError),

    /// Input loading failure.
    #[error(transparent)]
    Model(#[from] ModelError),

    /// Unusable configuration.
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// Report serialization failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Failure writing the report.
    #[error("I/O error writing {path}: {source}")]
    Output {
        /// Output path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
}
