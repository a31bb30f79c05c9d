//! # minewatch-volume
//!
//! Depth and volume estimation for excavation sites.
//!
//! A site's elevations arrive as an [`ElevationPatch`]: the bounding window
//! of its mask, with cells outside the mask left empty. A
//! [`ReferencePolicy`] picks the datum, a [`DepthField`] holds the clamped
//! per-cell depths, and an [`Integrator`] turns the field into cubic meters.
//!
//! ## Example
//!
//! ```
//! use minewatch_volume::{ElevationPatch, Integrator, ReferencePolicy, VolumeCalculator};
//!
//! let patch = ElevationPatch::from_values(2, 2, &[100.0, 90.0, 90.0, 100.0])?;
//! let calculator = VolumeCalculator::new(ReferencePolicy::Min, Integrator::Trapezoidal);
//! let estimate = calculator.estimate(Some(&patch), 900.0);
//!
//! assert_eq!(estimate.reference_elevation, 90.0);
//! assert_eq!(estimate.volume_m3, 2.0 * 10.0 * 900.0);
//! # Ok::<(), minewatch_volume::VolumeError>(())
//! ```

mod depth;
mod error;
mod integrate;
mod reference;

pub use depth::{DepthField, DepthStats, ElevationPatch};
pub use error::VolumeError;
pub use integrate::{Integrator, MonteCarloParams, VolumeMethod};
pub use reference::{Datum, ReferencePolicy, ReferenceSource, REFERENCE_PERCENTILE};

use serde::{Deserialize, Serialize};
use tracing::trace;

/// Result type for volume operations.
pub type Result<T> = std::result::Result<T, VolumeError>;

/// Elevation summary over the masked cells with data.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ElevationStats {
    /// Lowest elevation in meters.
    pub min: f64,
    /// Highest elevation in meters.
    pub max: f64,
    /// Mean elevation in meters.
    pub mean: f64,
}

/// Depth and volume computed for one site.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolumeEstimate {
    /// Datum the depths were measured from.
    pub reference_elevation: f64,
    /// Cells the datum was computed from.
    pub reference_source: ReferenceSource,
    /// Elevations under the mask.
    pub elevation: ElevationStats,
    /// Positive-depth statistics.
    pub depth: DepthStats,
    /// Representative site depth (the deepest cell).
    pub depth_m: f64,
    /// Excavated volume in cubic meters.
    pub volume_m3: f64,
    /// Number of masked cells with data.
    pub cell_count: usize,
    /// True when no masked cell had data.
    pub no_data: bool,
    /// Integration method used.
    pub method: VolumeMethod,
}

impl VolumeEstimate {
    /// The zeroed estimate for a site without data.
    pub fn no_data(method: VolumeMethod) -> Self {
        Self {
            reference_elevation: 0.0,
            reference_source: ReferenceSource::Site,
            elevation: ElevationStats::default(),
            depth: DepthStats::default(),
            depth_m: 0.0,
            volume_m3: 0.0,
            cell_count: 0,
            no_data: true,
            method,
        }
    }
}

/// Reference policy and integrator, fixed for a run.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VolumeCalculator {
    policy: ReferencePolicy,
    integrator: Integrator,
}

impl VolumeCalculator {
    /// Create a calculator.
    pub fn new(policy: ReferencePolicy, integrator: Integrator) -> Self {
        Self { policy, integrator }
    }

    /// The reference policy.
    pub fn policy(&self) -> ReferencePolicy {
        self.policy
    }

    /// The integrator.
    pub fn integrator(&self) -> Integrator {
        self.integrator
    }

    /// Estimate depth and volume for a patch, `None` meaning the site has no
    /// cells on the grid.
    pub fn estimate(&self, patch: Option<&ElevationPatch>, cell_area_m2: f64) -> VolumeEstimate {
        self.estimate_with_surroundings(patch, &[], cell_area_m2)
    }

    /// Estimate with the reference taken from `surroundings`, elevations
    /// sampled around the site rather than under it.
    ///
    /// Falls back to the site's own cells when `surroundings` is empty. A
    /// site without data is still `no_data` whatever its surroundings.
    pub fn estimate_with_surroundings(
        &self,
        patch: Option<&ElevationPatch>,
        surroundings: &[f64],
        cell_area_m2: f64,
    ) -> VolumeEstimate {
        let method = self.integrator.method();
        let Some(patch) = patch else {
            return VolumeEstimate::no_data(method);
        };

        let values = patch.values();
        if values.is_empty() {
            return VolumeEstimate::no_data(method);
        }
        let (reference_values, reference_source) = if surroundings.is_empty() {
            (values.as_slice(), ReferenceSource::Site)
        } else {
            (surroundings, ReferenceSource::Ring)
        };
        let Some(reference) = self.policy.reference_elevation(reference_values) else {
            return VolumeEstimate::no_data(method);
        };

        let field = DepthField::from_patch(patch, reference, self.policy.datum());
        let depth = field.stats();
        let volume_m3 = self.integrator.integrate(&field, cell_area_m2);

        let elevation = ElevationStats {
            min: values.iter().copied().fold(f64::INFINITY, f64::min),
            max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            mean: values.iter().sum::<f64>() / values.len() as f64,
        };

        trace!(
            policy = %self.policy,
            %method,
            reference,
            source = ?reference_source,
            cells = values.len(),
            volume_m3,
            "Integrated depth field"
        );

        VolumeEstimate {
            reference_elevation: reference,
            reference_source,
            elevation,
            depth,
            depth_m: depth.max,
            volume_m3,
            cell_count: values.len(),
            no_data: false,
            method,
        }
    }
}
