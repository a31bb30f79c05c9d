//! # minewatch-model
//!
//! Inputs, classification and reporting for the metrics engine.
//!
//! - [`RunConfig`] / [`ValidatedConfig`]: the YAML run configuration and its
//!   checked form.
//! - [`load_coco`]: COCO-style annotation loading.
//! - [`load_geojson_boundary`]: authorized-zone loading.
//! - [`SiteClassifier`]: legal/illegal by static index list or boundary
//!   containment.
//! - [`MetricsAggregator`]: per-site records to a [`MetricsReport`].
//!
//! ## Example
//!
//! ```
//! use minewatch_model::{load_config_from_str, SiteClassifier, Classification};
//! use minewatch_geom::Polygon;
//!
//! let config = load_config_from_str("reference_latitude: 24.19\nillegal_site_indices: [1]\n")?
//!     .validate()?;
//! let classifier = SiteClassifier::from_config(&config);
//!
//! let site = Polygon::from_flat(&[0.0, 0.0, 1.0, 0.0, 1.0, 1.0]).expect("ring");
//! assert_eq!(classifier.classify(1, &site).classification, Classification::Illegal);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod aggregator;
mod annotations;
mod boundary;
mod classifier;
mod config;
mod error;
mod report;

pub use aggregator::{AuthorizedZone, MetricsAggregator, RunContext};
pub use annotations::{load_coco, parse_coco, Annotation, AnnotationSet};
pub use boundary::{boundary_from_vertices, load_geojson_boundary, parse_geojson_boundary};
pub use classifier::{inside_fraction, ClassificationOutcome, SiteClassifier, FULLY_OUTSIDE_FRACTION};
pub use config::{
    load_config, load_config_from_str, Boundary, BoundarySource, ClassificationPolicy, DataSource, Operators,
    ReferenceImage, RunConfig, ValidatedConfig, DEFAULT_MIN_INSIDE_FRACTION,
};
pub use error::{ConfigurationError, ModelError};
pub use report::{
    BoundarySummary, Classification, MetricsReport, ReportMetadata, Severity, SiteGeometry, SiteMetrics,
    SiteRecord, SkippedAnnotation, Violation, ViolationKind, CUBIC_FEET_PER_CUBIC_METER,
    SQUARE_METERS_PER_HECTARE,
};

/// Result type for model operations.
pub type Result<T> = std::result::Result<T, ModelError>;
