//! Command-line arguments and the file-based batch run.

use crate::{resolve_image_size, Engine, Result, RunError};
use clap::Parser;
use minewatch_dem::RasterGrid;
use minewatch_model::{load_coco, load_config, BoundarySource, MetricsReport, RunConfig};
use minewatch_volume::{ReferencePolicy, VolumeMethod};
use std::path::{Path, PathBuf};
use tracing::info;

/// Estimate excavation area, depth and volume for annotated mining sites.
#[derive(Debug, Clone, Parser)]
#[command(name = "minewatch", author, version, about, long_about = None)]
pub struct Args {
    /// COCO-style annotation JSON.
    #[arg(short, long)]
    pub annotations: PathBuf,

    /// Single-band elevation GeoTIFF.
    #[arg(short, long)]
    pub dem: PathBuf,

    /// Run configuration YAML.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Report output path (JSON). Printed to stdout when omitted.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Reference latitude for the meter scale.
    #[arg(long)]
    pub latitude: Option<f64>,

    /// Zero-based illegal site indices, comma separated.
    #[arg(long, value_delimiter = ',')]
    pub illegal: Option<Vec<usize>>,

    /// GeoJSON authorized boundary.
    #[arg(long)]
    pub boundary: Option<PathBuf>,

    /// Reference elevation policy (mean, median, min, max, percentile).
    #[arg(long)]
    pub reference: Option<ReferencePolicy>,

    /// Take the reference from a ring this many DEM pixels around each site.
    #[arg(long)]
    pub reference_buffer: Option<f64>,

    /// Volume method (simpsons, trapezoidal, montecarlo).
    #[arg(long)]
    pub method: Option<VolumeMethod>,

    /// Process sites in parallel.
    #[arg(long)]
    pub parallel: bool,

    /// Enable debug logging.
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// Apply command-line overrides on top of the file configuration.
    pub fn apply_overrides(&self, config: &mut RunConfig) {
        if let Some(latitude) = self.latitude {
            config.reference_latitude = Some(latitude);
        }
        if let Some(illegal) = &self.illegal {
            config.illegal_site_indices = Some(illegal.clone());
        }
        if let Some(boundary) = &self.boundary {
            config.boundary = Some(BoundarySource::GeoJson(boundary.clone()));
        }
        if let Some(reference) = self.reference {
            config.reference_elevation_policy = reference;
        }
        if let Some(buffer) = self.reference_buffer {
            config.reference_buffer = Some(buffer);
        }
        if let Some(method) = self.method {
            config.volume_method = method;
        }
        if self.parallel {
            config.parallel = true;
        }
    }
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Load inputs, run the engine and write the report.
pub fn execute(args: &Args) -> Result<MetricsReport> {
    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => RunConfig::default(),
    };
    args.apply_overrides(&mut config);

    config.data_source.annotations.get_or_insert_with(|| file_label(&args.annotations));
    config.data_source.dem.get_or_insert_with(|| file_label(&args.dem));

    let config = config.validate()?;

    let annotations = load_coco(&args.annotations)?;
    let dem = RasterGrid::from_geotiff(&args.dem)?;
    info!(
        annotations = annotations.annotations.len(),
        dem = ?dem.dimensions(),
        "Loaded inputs"
    );

    let image_size = resolve_image_size(&config, annotations.image_size, dem.dimensions())?;
    let engine = Engine::new(config, dem, image_size)?;
    let report = engine.run(&annotations.annotations);

    let json = report.to_json()?;
    match &args.output {
        Some(path) => {
            std::fs::write(path, json).map_err(|source| RunError::Output {
                path: path.clone(),
                source,
            })?;
            info!(path = %path.display(), "Wrote report");
        }
        None => println!("{}", json),
    }

    Ok(report)
}
