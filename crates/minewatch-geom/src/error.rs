//! Error types for the geometry crate.

use thiserror::Error;

/// Errors that can occur when building geometry from annotations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeomError {
    /// Flat coordinate list has an odd number of values.
    #[error("Malformed annotation: coordinate list has odd length {len}")]
    OddCoordinateCount {
        /// Number of values in the flat list.
        len: usize,
    },

    /// Fewer than three vertices, so the ring encloses nothing.
    #[error("Malformed annotation: {vertices} vertices (need at least 3)")]
    TooFewVertices {
        /// Number of vertices found.
        vertices: usize,
    },

    /// A coordinate was NaN or infinite.
    #[error("Malformed annotation: non-finite coordinate at position {position}")]
    NonFiniteCoordinate {
        /// Index into the flat list.
        position: usize,
    },
}

impl GeomError {
    /// Whether this error describes a malformed annotation ring.
    ///
    /// Every current variant does; the pipeline relies on this to skip the
    /// site instead of aborting the run.
    pub fn is_malformed_annotation(&self) -> bool {
        matches!(
            self,
            GeomError::OddCoordinateCount { .. }
                | GeomError::TooFewVertices { .. }
                | GeomError::NonFiniteCoordinate { .. }
        )
    }
}
