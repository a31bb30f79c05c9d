//! End-to-end pipeline tests over in-memory DEMs.

use approx::assert_relative_eq;
use minewatch_dem::RasterGrid;
use minewatch_geom::{AffineTransform, GeoReference, MetricScale};
use minewatch_model::{
    Annotation, BoundarySource, Classification, RunConfig, Severity, ValidatedConfig, ViolationKind,
};
use minewatch_runner::{resolve_image_size, Engine};
use minewatch_volume::{ReferencePolicy, ReferenceSource, VolumeMethod};
use std::sync::{Arc, Mutex};
use tracing_subscriber::fmt::MakeWriter;

const LATITUDE: f64 = 24.19;

fn transform() -> AffineTransform {
    AffineTransform::north_up(82.0, 24.5, 0.001, 0.001)
}

fn cell_area_m2() -> f64 {
    GeoReference::new(transform(), MetricScale::for_latitude(LATITUDE)).cell_area_m2()
}

fn flat_dem(width: u32, height: u32, elevation: f32) -> RasterGrid {
    RasterGrid::from_fn(width, height, transform(), |_, _| elevation).unwrap()
}

fn square(min: f64, max: f64) -> Vec<f64> {
    vec![min, min, max, min, max, max, min, max]
}

fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Vec<f64> {
    vec![x0, y0, x1, y0, x1, y1, x0, y1]
}

fn static_config(illegal: Vec<usize>) -> RunConfig {
    RunConfig {
        reference_latitude: Some(LATITUDE),
        illegal_site_indices: Some(illegal),
        ..RunConfig::default()
    }
}

fn engine(config: ValidatedConfig, dem: RasterGrid) -> Engine {
    let dims = dem.dimensions();
    Engine::new(config, dem, dims).unwrap()
}

#[test]
fn test_flat_dem_has_zero_depth_and_volume() {
    let engine = engine(static_config(vec![]).validate().unwrap(), flat_dem(20, 20, 100.0));
    let record = engine
        .process_site(&Annotation::new(1, 0, "Flat", square(0.0, 10.0)))
        .unwrap();

    assert_eq!(record.metrics.depth_m, 0.0);
    assert_eq!(record.metrics.volume_m3, 0.0);
    assert_eq!(record.metrics.cell_count, 100);
    assert!(!record.metrics.no_data);
    assert_relative_eq!(record.metrics.area_m2, 100.0 * cell_area_m2(), max_relative = 1e-9);
}

#[test]
fn test_min_policy_counts_raised_cells() {
    // Columns 0..5 at 100 m, the rest at 90 m
    let dem = RasterGrid::from_fn(20, 20, transform(), |col, _| if col < 5 { 100.0 } else { 90.0 }).unwrap();
    let config = RunConfig {
        reference_elevation_policy: ReferencePolicy::Min,
        volume_method: VolumeMethod::Trapezoidal,
        ..static_config(vec![])
    };
    let engine = engine(config.validate().unwrap(), dem);

    let record = engine
        .process_site(&Annotation::new(1, 0, "Stepped", square(0.0, 10.0)))
        .unwrap();

    assert_eq!(record.metrics.reference_elevation_m, 90.0);
    assert_eq!(record.metrics.depth_m, 10.0);
    assert_relative_eq!(record.metrics.volume_m3, 50.0 * 10.0 * cell_area_m2(), max_relative = 1e-9);
}

#[test]
fn test_every_method_is_non_negative() {
    let dem = RasterGrid::from_fn(30, 30, transform(), |col, row| 200.0 + ((col * 7 + row * 3) % 13) as f32).unwrap();
    for method in VolumeMethod::ALL {
        for policy in ReferencePolicy::ALL {
            let config = RunConfig {
                reference_elevation_policy: policy,
                volume_method: method,
                ..static_config(vec![])
            };
            let engine = engine(config.validate().unwrap(), dem.clone());
            let record = engine
                .process_site(&Annotation::new(1, 0, "Rough", vec![2.0, 3.0, 25.0, 5.0, 21.0, 27.0, 4.0, 22.0]))
                .unwrap();
            assert!(record.metrics.volume_m3 >= 0.0, "{} / {}", method, policy);
        }
    }
}

#[test]
fn test_static_classification_and_totals() {
    let engine = engine(static_config(vec![1]).validate().unwrap(), flat_dem(40, 40, 100.0));
    let annotations = vec![
        Annotation::new(10, 0, "North", square(0.0, 10.0)),
        Annotation::new(11, 1, "South", rect(20.0, 20.0, 35.0, 30.0)),
    ];

    let report = engine.run(&annotations);
    let meta = &report.metadata;

    assert_eq!(report.sites.len(), 2);
    assert_eq!(report.sites[0].classification, Classification::Legal);
    assert_eq!(report.sites[1].classification, Classification::Illegal);
    assert_eq!(report.sites[1].operator, "Unauthorized");
    assert_eq!((meta.legal_sites, meta.illegal_sites), (1, 1));
    assert_eq!(
        meta.total_area_m2,
        report.sites[0].metrics.area_m2 + report.sites[1].metrics.area_m2
    );
    assert_eq!(meta.classification_mode, "static");
    assert!(meta.raster_alignment.is_none());
}

#[test]
fn test_rescaled_annotations_stay_within_dem() {
    let dem = flat_dem(854, 409, 300.0);
    let engine = Engine::new(static_config(vec![]).validate().unwrap(), dem, (1500, 719)).unwrap();

    let alignment = engine.alignment().expect("dimensions differ");
    assert_eq!(alignment.scale_x, 854.0 / 1500.0);
    assert_eq!(alignment.scale_y, 409.0 / 719.0);

    let annotations = vec![Annotation::new(
        1,
        0,
        "Corner",
        vec![1200.0, 500.0, 1499.5, 520.0, 1499.0, 718.5, 1180.0, 700.0],
    )];
    let report = engine.run(&annotations);

    let record = &report.sites[0];
    for [x, y] in &record.geometry.dem_pixel {
        assert!((0.0..=854.0).contains(x) && (0.0..=409.0).contains(y), "({}, {})", x, y);
    }
    assert!(!record.metrics.no_data);
    assert_eq!(report.metadata.raster_alignment, Some(alignment));
}

#[test]
fn test_malformed_annotation_is_skipped() {
    let engine = engine(static_config(vec![]).validate().unwrap(), flat_dem(20, 20, 100.0));
    let annotations = vec![
        Annotation::new(1, 0, "Good", square(0.0, 5.0)),
        Annotation::new(2, 1, "Odd", vec![0.0, 0.0, 5.0, 0.0, 5.0]),
        Annotation::new(3, 2, "Line", vec![0.0, 0.0, 5.0, 5.0]),
        Annotation::new(4, 3, "Also good", square(10.0, 15.0)),
    ];

    let report = engine.run(&annotations);
    let indices: Vec<usize> = report.sites.iter().map(|s| s.index).collect();
    assert_eq!(indices, vec![0, 3]);

    let skipped = &report.metadata.skipped;
    assert_eq!(skipped.len(), 2);
    assert_eq!((skipped[0].index, skipped[0].annotation_id), (1, 2));
    assert!(skipped[0].reason.contains("odd length"), "{}", skipped[0].reason);
    assert_eq!(skipped[1].index, 2);
}

#[test]
fn test_repeated_and_closing_vertices_are_not_diagnosed() {
    let engine = engine(static_config(vec![]).validate().unwrap(), flat_dem(20, 20, 100.0));
    let repeated = vec![0.0, 0.0, 10.0, 0.0, 10.0, 0.0, 10.0, 10.0, 0.0, 10.0];
    let closed = vec![0.0, 0.0, 10.0, 0.0, 10.0, 10.0, 0.0, 10.0, 0.0, 0.0];

    for (index, ring) in [repeated, closed].into_iter().enumerate() {
        let record = engine.process_site(&Annotation::new(1, index, "Pit", ring)).unwrap();
        assert!(record.diagnostics.is_empty(), "{:?}", record.diagnostics);
        assert_eq!(record.metrics.cell_count, 100);
    }
}

#[test]
fn test_site_off_the_dem_is_no_data() {
    let engine = engine(static_config(vec![]).validate().unwrap(), flat_dem(20, 20, 100.0));
    let report = engine.run(&[Annotation::new(1, 0, "Far", square(50.0, 60.0))]);

    let record = &report.sites[0];
    assert!(record.metrics.no_data);
    assert_eq!(record.metrics.volume_m3, 0.0);
    assert_eq!(record.metrics.depth_m, 0.0);
    assert!(record.metrics.area_m2 > 0.0);
    assert!(!record.diagnostics.is_empty());
    assert_eq!(report.metadata.no_data_sites, 1);
}

#[test]
fn test_boundary_classification() {
    // Authorized zone covers longitudes 82.000..82.025 (DEM columns 0..25)
    let config = RunConfig {
        reference_latitude: Some(LATITUDE),
        boundary: Some(BoundarySource::Vertices(vec![
            [82.0, 24.45],
            [82.025, 24.45],
            [82.025, 24.5],
            [82.0, 24.5],
        ])),
        ..RunConfig::default()
    };
    let engine = engine(config.validate().unwrap(), flat_dem(50, 50, 100.0));
    let annotations = vec![
        Annotation::new(1, 0, "Inside", square(5.0, 15.0)),
        Annotation::new(2, 1, "Outside", rect(30.0, 5.0, 40.0, 15.0)),
        Annotation::new(3, 2, "Straddling", rect(15.0, 20.0, 30.0, 30.0)),
    ];

    let report = engine.run(&annotations);
    let meta = &report.metadata;

    assert_eq!(report.sites[0].classification, Classification::Legal);
    assert_relative_eq!(report.sites[0].inside_fraction.unwrap(), 1.0, epsilon = 1e-6);
    assert_eq!(report.sites[1].classification, Classification::Illegal);
    assert_eq!(report.sites[2].classification, Classification::Illegal);
    assert_relative_eq!(report.sites[2].inside_fraction.unwrap(), 2.0 / 3.0, epsilon = 1e-6);

    assert_eq!(meta.classification_mode, "boundary");
    assert_eq!(meta.violations.len(), 2);
    assert_eq!(meta.violations[0].kind, ViolationKind::FullyOutside);
    assert_eq!(meta.violations[0].site_index, 1);
    assert_eq!(meta.violations[1].kind, ViolationKind::PartiallyOutside);
    assert_eq!(meta.violations[1].severity, Severity::Medium);

    let summary = meta.boundary.expect("boundary summary");
    let zone_area = 25.0 * 50.0 * cell_area_m2();
    assert_relative_eq!(summary.authorized_area_m2, zone_area, max_relative = 1e-9);
    assert_relative_eq!(
        summary.utilization_percent,
        meta.legal_area_m2 / zone_area * 100.0,
        max_relative = 1e-9
    );
}

#[test]
fn test_parallel_run_matches_sequential() {
    let dem = RasterGrid::from_fn(60, 60, transform(), |col, row| 150.0 - ((col + row) % 9) as f32).unwrap();
    let annotations: Vec<Annotation> = (0..12)
        .map(|i| {
            let offset = (i % 4) as f64 * 14.0;
            let row = (i / 4) as f64 * 18.0;
            Annotation::new(i as u64, i, format!("Site {}", i), rect(offset, row, offset + 12.0, row + 15.0))
        })
        .collect();

    let sequential = engine(static_config(vec![2, 5]).validate().unwrap(), dem.clone()).run(&annotations);
    let config = RunConfig {
        parallel: true,
        ..static_config(vec![2, 5])
    };
    let parallel = engine(config.validate().unwrap(), dem).run(&annotations);

    assert_eq!(sequential.sites, parallel.sites);
    assert_eq!(sequential.metadata.total_volume_m3, parallel.metadata.total_volume_m3);
}

#[test]
fn test_per_site_latitude_changes_east_west_scale() {
    let annotation = Annotation::new(1, 0, "Site", square(0.0, 10.0));

    let fixed = engine(static_config(vec![]).validate().unwrap(), flat_dem(20, 20, 100.0))
        .process_site(&annotation)
        .unwrap();
    let config = RunConfig {
        reference_latitude: Some(0.0),
        per_site_latitude: true,
        ..static_config(vec![])
    };
    let per_site = engine(config.validate().unwrap(), flat_dem(20, 20, 100.0))
        .process_site(&annotation)
        .unwrap();

    // Per-site scale uses the centroid latitude, 24.495
    let ratio = per_site.metrics.area_m2 / fixed.metrics.area_m2;
    let expected = 24.495_f64.to_radians().cos() / LATITUDE.to_radians().cos();
    assert_relative_eq!(ratio, expected, max_relative = 1e-7);
}

#[test]
fn test_image_size_priority() {
    let mut config = static_config(vec![]);
    let validated = config.clone().validate().unwrap();
    assert_eq!(resolve_image_size(&validated, Some((1500, 719)), (854, 409)).unwrap(), (1500, 719));
    assert_eq!(resolve_image_size(&validated, None, (854, 409)).unwrap(), (854, 409));

    config.reference_image = Some(minewatch_model::ReferenceImage::Dimensions { width: 100, height: 50 });
    let validated = config.validate().unwrap();
    assert_eq!(resolve_image_size(&validated, Some((1500, 719)), (854, 409)).unwrap(), (100, 50));
}

#[test]
fn test_reference_from_surrounding_ring() {
    // 90 m pit floor in a 100 m plain
    let dem = RasterGrid::from_fn(20, 20, transform(), |col, row| {
        if (5..10).contains(&col) && (5..10).contains(&row) {
            90.0
        } else {
            100.0
        }
    })
    .unwrap();
    let base = RunConfig {
        reference_elevation_policy: ReferencePolicy::Mean,
        volume_method: VolumeMethod::Trapezoidal,
        ..static_config(vec![])
    };
    let site = Annotation::new(1, 0, "Pit", square(5.0, 10.0));

    let own = engine(base.clone().validate().unwrap(), dem.clone()).process_site(&site).unwrap();
    assert_eq!(own.metrics.reference_source, ReferenceSource::Site);
    assert_eq!(own.metrics.reference_elevation_m, 90.0);
    assert_eq!(own.metrics.volume_m3, 0.0);

    let config = RunConfig {
        reference_buffer: Some(2.0),
        ..base
    };
    let ring = engine(config.validate().unwrap(), dem).process_site(&site).unwrap();
    assert_eq!(ring.metrics.reference_source, ReferenceSource::Ring);
    assert_eq!(ring.metrics.reference_elevation_m, 100.0);
    assert_eq!(ring.metrics.depth_m, 10.0);
    assert_relative_eq!(ring.metrics.volume_m3, 25.0 * 10.0 * cell_area_m2(), max_relative = 1e-9);
}

#[derive(Clone, Default)]
struct CapturedLog(Arc<Mutex<Vec<u8>>>);

impl CapturedLog {
    fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl std::io::Write for CapturedLog {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLog {
    type Writer = CapturedLog;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

#[test]
fn test_high_latitude_warns_once_per_run() {
    let log = CapturedLog::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(log.clone())
        .with_ansi(false)
        .finish();

    tracing::subscriber::with_default(subscriber, || {
        let config = RunConfig {
            reference_latitude: Some(80.0),
            per_site_latitude: true,
            ..static_config(vec![])
        };
        let engine = engine(config.validate().unwrap(), flat_dem(40, 40, 100.0));
        let sites: Vec<Annotation> = (0..3)
            .map(|i| Annotation::new(i as u64, i, "Pit", square(i as f64 * 10.0, i as f64 * 10.0 + 5.0)))
            .collect();
        let report = engine.run(&sites);
        assert_eq!(report.sites.len(), 3);
    });

    assert_eq!(log.text().matches("near a pole").count(), 1, "{}", log.text());
}
