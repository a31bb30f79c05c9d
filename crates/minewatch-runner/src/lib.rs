//! # minewatch-runner
//!
//! The excavation metrics pipeline: annotation polygons and a DEM in, one
//! [`MetricsReport`](minewatch_model::MetricsReport) out.
//!
//! [`Engine::process_site`] is the per-site unit (polygon, rescale, sample,
//! depth and volume, classify); [`Engine::run`] processes a batch and
//! aggregates. The `minewatch` binary wraps [`cli::execute`].

pub mod cli;
mod engine;
mod error;

pub use engine::{resolve_image_size, Engine};
pub use error::RunError;

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, RunError>;
