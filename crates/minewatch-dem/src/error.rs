//! Error types for the raster crate.

use thiserror::Error;

/// Errors that can occur when loading or building rasters.
#[derive(Debug, Error)]
pub enum DemError {
    /// I/O error reading a file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TIFF decoding error.
    #[error("TIFF decode error: {0}")]
    TiffDecode(#[from] tiff::TiffError),

    /// Invalid GeoTIFF - missing required tags.
    #[error("Invalid GeoTIFF: {0}")]
    InvalidGeoTiff(String),

    /// Unsupported data type or band layout in the TIFF file.
    #[error("Unsupported TIFF data type: {0}")]
    UnsupportedDataType(String),

    /// Data length does not match the declared grid size.
    #[error("Raster data has {actual} cells, expected {expected} ({width}x{height})")]
    DataLengthMismatch {
        /// Declared width.
        width: u32,
        /// Declared height.
        height: u32,
        /// Expected cell count.
        expected: usize,
        /// Provided cell count.
        actual: usize,
    },

    /// A raster dimension was zero.
    #[error("Invalid raster dimensions {width}x{height}")]
    InvalidDimensions {
        /// Width in pixels.
        width: u32,
        /// Height in pixels.
        height: u32,
    },
}
