//! The per-site pipeline and the batch run.

use crate::Result;
use minewatch_dem::{RasterAlignment, RasterGrid, RasterSampler};
use minewatch_geom::{validate_polygon, Coord, GeoReference, Polygon};
use minewatch_metrics::{metric_defs, SiteLabels};
use minewatch_model::{
    Annotation, AuthorizedZone, ClassificationPolicy, MetricsAggregator, MetricsReport, ReferenceImage,
    RunContext, SiteClassifier, SiteGeometry, SiteMetrics, SiteRecord, SkippedAnnotation, ValidatedConfig,
    CUBIC_FEET_PER_CUBIC_METER, SQUARE_METERS_PER_HECTARE,
};
use minewatch_volume::ElevationPatch;
use rayon::prelude::*;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Pick the annotation image dimensions.
///
/// Priority: configured dimensions, a configured raster's header, the COCO
/// `images[0]` entry, and finally the DEM itself (no rescale).
pub fn resolve_image_size(
    config: &ValidatedConfig,
    coco_image: Option<(u32, u32)>,
    dem: (u32, u32),
) -> Result<(u32, u32)> {
    let size = match &config.reference_image {
        Some(ReferenceImage::Dimensions { width, height }) => (*width, *height),
        Some(ReferenceImage::Raster { path }) => RasterGrid::read_dimensions(path)?,
        None => coco_image.unwrap_or(dem),
    };
    debug!(image = ?size, dem = ?dem, "Resolved annotation image dimensions");
    Ok(size)
}

/// Runs the metrics pipeline over one DEM.
///
/// The DEM is loaded once and only borrowed while processing sites, so
/// [`Engine::process_site`] can run from several threads.
#[derive(Debug)]
pub struct Engine {
    config: ValidatedConfig,
    dem: RasterGrid,
    sampler: RasterSampler,
    classifier: SiteClassifier,
}

impl Engine {
    /// Create an engine for annotations drawn on an image of `image_size`.
    pub fn new(config: ValidatedConfig, dem: RasterGrid, image_size: (u32, u32)) -> Result<Self> {
        let sampler = RasterSampler::new(image_size, dem.dimensions())?;
        let classifier = SiteClassifier::from_config(&config);
        Ok(Self {
            config,
            dem,
            sampler,
            classifier,
        })
    }

    /// The configuration in use.
    pub fn config(&self) -> &ValidatedConfig {
        &self.config
    }

    /// The elevation raster.
    pub fn dem(&self) -> &RasterGrid {
        &self.dem
    }

    /// Image-to-DEM rescale, when dimensions differ.
    pub fn alignment(&self) -> Option<RasterAlignment> {
        self.sampler.alignment()
    }

    /// Compute the record for one annotation.
    ///
    /// Fails only when the annotation ring is malformed. A site with no DEM
    /// cells under it still yields a record, flagged `no_data`.
    pub fn process_site(&self, annotation: &Annotation) -> Result<SiteRecord> {
        let started = Instant::now();
        let mut diagnostics = Vec::new();

        let pixel = Polygon::from_flat(&annotation.segmentation)?;

        let validation = validate_polygon(&pixel);
        if !validation.is_simple() {
            warn!(
                index = annotation.index,
                id = annotation.id,
                crossings = validation.self_intersections.len(),
                "Site ring self-intersects; area and mask use the even-odd rule"
            );
            metrics::counter!(metric_defs::SITES_SELF_INTERSECTING.name).increment(1);
            diagnostics.push(format!(
                "self-intersecting ring (edge pairs {:?})",
                validation.self_intersections
            ));
        }

        let sample = self.sampler.sample(&pixel, &self.dem);
        let dem_pixel = &sample.grid_polygon;

        let transform = self.dem.transform();
        let geographic = dem_pixel.map_coords(|c| {
            let (x, y) = transform.apply(c.x, c.y);
            Coord::new(x, y)
        });

        let scale = self.config.metric_scale_at(geographic.centroid().y);
        let meters = geographic.map_coords(|c| {
            let (x, y) = scale.to_meters(c.x, c.y);
            Coord::new(x, y)
        });
        let area_m2 = meters.area();
        let perimeter_m = meters.perimeter();
        let cell_area_m2 = GeoReference::new(transform, scale).cell_area_m2();

        let patch = match sample.masked_window(&self.dem) {
            Some(window) => Some(ElevationPatch::new(
                window.window.width as usize,
                window.window.height as usize,
                window.cells,
            )?),
            None => None,
        };
        let surroundings = match self.config.reference_buffer {
            Some(buffer) => sample.ring_values(&self.dem, buffer),
            None => Vec::new(),
        };
        let estimate = self
            .config
            .volume
            .estimate_with_surroundings(patch.as_ref(), &surroundings, cell_area_m2);
        if self.config.reference_buffer.is_some() && surroundings.is_empty() && !estimate.no_data {
            diagnostics.push("no DEM cells with data around the site; reference taken from the site".to_string());
        }

        if estimate.no_data {
            warn!(
                index = annotation.index,
                id = annotation.id,
                "No DEM data under site; depth and volume set to zero"
            );
            metrics::counter!(metric_defs::SITES_NO_DATA.name).increment(1);
            diagnostics.push("no DEM cells with data under the site".to_string());
        }

        let outcome = self.classifier.classify(annotation.index, &geographic);

        let labels = SiteLabels::new(outcome.classification.as_str(), estimate.method.as_str()).to_labels();
        metrics::counter!(metric_defs::SITES_PROCESSED.name, &labels).increment(1);
        metrics::histogram!(metric_defs::SITE_AREA.name, &labels).record(area_m2);
        metrics::histogram!(metric_defs::SITE_VOLUME.name, &labels).record(estimate.volume_m3);
        metrics::histogram!(metric_defs::SITE_CELLS.name).record(estimate.cell_count as f64);

        debug!(
            index = annotation.index,
            label = %annotation.label,
            classification = %outcome.classification,
            area_m2,
            volume_m3 = estimate.volume_m3,
            cells = estimate.cell_count,
            "Processed site"
        );

        let record = SiteRecord {
            id: annotation.id,
            label: annotation.label.clone(),
            index: annotation.index,
            classification: outcome.classification,
            operator: outcome.operator,
            inside_fraction: outcome.inside_fraction,
            geometry: SiteGeometry {
                pixel: pixel.to_pairs(),
                dem_pixel: dem_pixel.to_pairs(),
                geographic: geographic.to_pairs(),
            },
            metrics: SiteMetrics {
                area_m2,
                area_hectares: area_m2 / SQUARE_METERS_PER_HECTARE,
                perimeter_m,
                depth_m: estimate.depth_m,
                volume_m3: estimate.volume_m3,
                volume_cubic_feet: estimate.volume_m3 * CUBIC_FEET_PER_CUBIC_METER,
                reference_elevation_m: estimate.reference_elevation,
                reference_source: estimate.reference_source,
                elevation: estimate.elevation,
                depth: estimate.depth,
                cell_count: estimate.cell_count,
                no_data: estimate.no_data,
            },
            diagnostics,
        };

        metrics::histogram!(metric_defs::SITE_PROCESS_TIME.name).record(started.elapsed().as_micros() as f64);
        Ok(record)
    }

    /// Process every annotation and aggregate the report.
    ///
    /// Malformed annotations are skipped and listed in the report metadata.
    /// Output order follows annotation order whether or not sites run in
    /// parallel.
    pub fn run(&self, annotations: &[Annotation]) -> MetricsReport {
        let started = Instant::now();
        info!(
            sites = annotations.len(),
            parallel = self.config.parallel,
            "Processing sites"
        );

        let results: Vec<(&Annotation, Result<SiteRecord>)> = if self.config.parallel {
            annotations.par_iter().map(|a| (a, self.process_site(a))).collect()
        } else {
            annotations.iter().map(|a| (a, self.process_site(a))).collect()
        };

        let mut sites = Vec::with_capacity(results.len());
        let mut skipped = Vec::new();
        for (annotation, result) in results {
            match result {
                Ok(record) => sites.push(record),
                Err(e) => {
                    warn!(index = annotation.index, id = annotation.id, error = %e, "Skipping annotation");
                    metrics::counter!(metric_defs::SITES_SKIPPED.name).increment(1);
                    skipped.push(SkippedAnnotation {
                        index: annotation.index,
                        annotation_id: annotation.id,
                        reason: e.to_string(),
                    });
                }
            }
        }

        let report = MetricsAggregator::new(self.run_context()).aggregate(sites, skipped);

        metrics::gauge!(metric_defs::RUN_TOTAL_VOLUME.name).set(report.metadata.total_volume_m3);
        metrics::histogram!(metric_defs::RUN_TIME.name).record(started.elapsed().as_secs_f64() * 1000.0);
        report
    }

    fn run_context(&self) -> RunContext {
        let authorized_zone = match &self.config.classification {
            ClassificationPolicy::Boundary(boundary) => {
                let scale = self.config.metric_scale();
                let zone_m = boundary.polygon.map_coords(|c| {
                    let (x, y) = scale.to_meters(c.x, c.y);
                    Coord::new(x, y)
                });
                Some(AuthorizedZone {
                    area_m2: zone_m.area(),
                    min_inside_fraction: boundary.min_inside_fraction,
                })
            }
            ClassificationPolicy::Static { .. } => None,
        };

        let volume = self.config.volume;
        RunContext {
            data_source: self.config.data_source.clone(),
            reference_latitude: self.config.reference_latitude,
            reference_policy: volume.policy(),
            volume_method: volume.integrator().method(),
            classification_mode: self.config.classification.mode().to_string(),
            raster_alignment: self.sampler.alignment(),
            authorized_zone,
        }
    }
}

