//! Error types for the volume crate.

use thiserror::Error;

/// Errors from building elevation patches or integrators.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum VolumeError {
    /// Cell count does not match the patch dimensions.
    #[error("Patch has {actual} cells, expected {width}x{height}")]
    PatchSizeMismatch {
        /// Patch width.
        width: usize,
        /// Patch height.
        height: usize,
        /// Provided cell count.
        actual: usize,
    },

    /// Monte Carlo sample count must be positive.
    #[error("Monte Carlo sample count must be at least 1")]
    ZeroSamples,
}
