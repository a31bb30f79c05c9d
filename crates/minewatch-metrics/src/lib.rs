//! Runtime metrics for the minewatch engine.
//!
//! Every metric the engine emits is declared here as a const [`Metric`], so
//! names and label keys live in one place. The `metrics` crate is re-exported;
//! without an installed recorder every macro call is a no-op.
//!
//! # Example
//!
//! ```rust
//! use minewatch_metrics::{describe_metrics, metric_defs, SiteLabels};
//!
//! describe_metrics();
//!
//! let labels = SiteLabels::new("illegal", "simpsons");
//! metrics::counter!(metric_defs::SITES_PROCESSED.name, &labels.to_labels()).increment(1);
//! metrics::histogram!(metric_defs::SITE_VOLUME.name, &labels.to_labels()).record(1250.0);
//! ```
//!
//! # Metric Type
//!
//! ```rust
//! use minewatch_metrics::{Metric, MetricKind};
//! use metrics::Unit;
//!
//! const SCANNED: Metric = Metric::counter("minewatch.dem.cells_scanned")
//!     .with_description("Cells visited while rasterizing")
//!     .with_unit(Unit::Count);
//!
//! assert_eq!(SCANNED.kind, MetricKind::Counter);
//! ```

pub use metrics;

use metrics::{describe_counter, describe_gauge, describe_histogram, Unit};

/// The kind of metric (counter, gauge, or histogram).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    /// A monotonically increasing counter.
    Counter,
    /// A gauge that can go up and down.
    Gauge,
    /// A histogram for recording distributions.
    Histogram,
}

impl MetricKind {
    /// Returns the kind as a lowercase string.
    pub const fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Counter => "counter",
            MetricKind::Gauge => "gauge",
            MetricKind::Histogram => "histogram",
        }
    }
}

impl std::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A metric declaration with its metadata.
///
/// Built with const constructors so definitions are compile-time constants.
#[derive(Debug, Clone)]
pub struct Metric {
    /// The metric name (e.g., "minewatch.sites.processed").
    pub name: &'static str,
    /// The kind of metric.
    pub kind: MetricKind,
    /// Human-readable description.
    pub description: &'static str,
    /// The unit of measurement, if any.
    pub unit: Option<Unit>,
    /// Expected label keys.
    pub labels: &'static [&'static str],
}

impl Metric {
    const fn with_kind(name: &'static str, kind: MetricKind) -> Self {
        Self {
            name,
            kind,
            description: "",
            unit: None,
            labels: &[],
        }
    }

    /// Creates a counter metric.
    pub const fn counter(name: &'static str) -> Self {
        Self::with_kind(name, MetricKind::Counter)
    }

    /// Creates a gauge metric.
    pub const fn gauge(name: &'static str) -> Self {
        Self::with_kind(name, MetricKind::Gauge)
    }

    /// Creates a histogram metric.
    pub const fn histogram(name: &'static str) -> Self {
        Self::with_kind(name, MetricKind::Histogram)
    }

    /// Sets the description.
    pub const fn with_description(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    /// Sets the unit.
    pub const fn with_unit(mut self, unit: Unit) -> Self {
        self.unit = Some(unit);
        self
    }

    /// Sets the expected label keys.
    pub const fn with_labels(mut self, labels: &'static [&'static str]) -> Self {
        self.labels = labels;
        self
    }

    /// Registers this metric's description with the installed recorder.
    pub fn describe(&self) {
        match (self.kind, self.unit) {
            (MetricKind::Counter, Some(unit)) => describe_counter!(self.name, unit, self.description),
            (MetricKind::Counter, None) => describe_counter!(self.name, self.description),
            (MetricKind::Gauge, Some(unit)) => describe_gauge!(self.name, unit, self.description),
            (MetricKind::Gauge, None) => describe_gauge!(self.name, self.description),
            (MetricKind::Histogram, Some(unit)) => describe_histogram!(self.name, unit, self.description),
            (MetricKind::Histogram, None) => describe_histogram!(self.name, self.description),
        }
    }
}

/// All metric definitions emitted by the engine.
pub mod metric_defs {
    use super::{Metric, Unit};

    /// Labels on per-site metrics.
    pub const SITE_LABELS: &[&str] = &["classification", "method"];

    // ========================================================================
    // Sites
    // ========================================================================

    /// Sites that produced a record.
    ///
    /// Labels: classification, method
    pub const SITES_PROCESSED: Metric = Metric::counter("minewatch.sites.processed")
        .with_description("Sites that produced a metrics record")
        .with_unit(Unit::Count)
        .with_labels(SITE_LABELS);

    /// Sites whose mask held no elevation data.
    pub const SITES_NO_DATA: Metric = Metric::counter("minewatch.sites.no_data")
        .with_description("Sites with no overlapping DEM cells")
        .with_unit(Unit::Count);

    /// Annotations skipped as malformed.
    pub const SITES_SKIPPED: Metric = Metric::counter("minewatch.sites.skipped")
        .with_description("Annotations skipped because their polygon was malformed")
        .with_unit(Unit::Count);

    /// Sites with a self-intersecting ring.
    pub const SITES_SELF_INTERSECTING: Metric = Metric::counter("minewatch.sites.self_intersecting")
        .with_description("Sites whose polygon ring intersects itself")
        .with_unit(Unit::Count);

    // ========================================================================
    // Site measurements
    // ========================================================================

    /// Site area in square meters.
    ///
    /// Labels: classification, method
    pub const SITE_AREA: Metric = Metric::histogram("minewatch.site.area_m2")
        .with_description("Site area in square meters")
        .with_labels(SITE_LABELS);

    /// Site volume in cubic meters.
    ///
    /// Labels: classification, method
    pub const SITE_VOLUME: Metric = Metric::histogram("minewatch.site.volume_m3")
        .with_description("Estimated excavation volume in cubic meters")
        .with_labels(SITE_LABELS);

    /// Masked DEM cells per site.
    pub const SITE_CELLS: Metric = Metric::histogram("minewatch.site.cells")
        .with_description("DEM cells with data under the site mask")
        .with_unit(Unit::Count);

    // ========================================================================
    // Performance
    // ========================================================================

    /// Wall time to process one site.
    pub const SITE_PROCESS_TIME: Metric = Metric::histogram("minewatch.timing.site_process_us")
        .with_description("Wall time to process one site in microseconds")
        .with_unit(Unit::Microseconds);

    /// Wall time of a full run.
    pub const RUN_TIME: Metric = Metric::histogram("minewatch.timing.run_ms")
        .with_description("Wall time of a full run in milliseconds")
        .with_unit(Unit::Milliseconds);

    /// Total excavated volume of the last run.
    pub const RUN_TOTAL_VOLUME: Metric = Metric::gauge("minewatch.run.total_volume_m3")
        .with_description("Total estimated volume of the last run in cubic meters");

    /// All metric definitions.
    pub const ALL: &[&Metric] = &[
        &SITES_PROCESSED,
        &SITES_NO_DATA,
        &SITES_SKIPPED,
        &SITES_SELF_INTERSECTING,
        &SITE_AREA,
        &SITE_VOLUME,
        &SITE_CELLS,
        &SITE_PROCESS_TIME,
        &RUN_TIME,
        &RUN_TOTAL_VOLUME,
    ];
}

/// Labels identifying a site's classification and integration method.
///
/// ```rust
/// use minewatch_metrics::SiteLabels;
///
/// let labels = SiteLabels::new("legal", "trapezoidal");
/// assert!(labels.to_labels().contains(&("classification", "legal".to_string())));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteLabels {
    /// `legal` or `illegal`.
    pub classification: String,
    /// Integration method name.
    pub method: String,
}

impl SiteLabels {
    /// Creates site labels.
    pub fn new(classification: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            classification: classification.into(),
            method: method.into(),
        }
    }

    /// Converts the labels to `metrics` key-value pairs.
    pub fn to_labels(&self) -> Vec<(&'static str, String)> {
        vec![
            ("classification", self.classification.clone()),
            ("method", self.method.clone()),
        ]
    }
}

/// Describes all engine metrics. Call once after installing a recorder.
pub fn describe_metrics() {
    for metric in metric_defs::ALL {
        metric.describe();
    }
}
