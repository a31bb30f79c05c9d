//! Authorized-zone boundary loading.
//!
//! A boundary is a single ring in the raster's source coordinates (lon/lat
//! for degree rasters). It comes from inline vertices in the run config or
//! from a GeoJSON document holding a `Polygon`, `MultiPolygon`, `Feature` or
//! `FeatureCollection`; the first polygon's exterior ring is used.

use crate::{ModelError, Result};
use minewatch_geom::{validate_polygon, Coord, Polygon};
use serde_json::Value;
use std::path::Path;

/// Build a boundary from `[[x, y], ...]` vertices.
///
/// A trailing vertex equal to the first (a closed ring) is dropped.
pub fn boundary_from_vertices(vertices: &[[f64; 2]]) -> Result<Polygon> {
    let mut coords: Vec<Coord> = vertices.iter().map(|&[x, y]| Coord::new(x, y)).collect();
    if coords.len() > 1 && coords.first() == coords.last() {
        coords.pop();
    }
    if coords.iter().any(|c| !c.x.is_finite() || !c.y.is_finite()) {
        return Err(ModelError::InvalidGeoJson("boundary has a non-finite coordinate".into()));
    }

    let polygon = Polygon::from_vertices(coords)
        .map_err(|e| ModelError::InvalidGeoJson(format!("boundary ring: {}", e)))?;

    let validation = validate_polygon(&polygon);
    if !validation.is_simple() {
        return Err(ModelError::InvalidGeoJson(format!(
            "boundary ring self-intersects at edges {:?}",
            validation.self_intersections
        )));
    }
    Ok(polygon)
}

/// Parse a GeoJSON document into a boundary ring.
pub fn parse_geojson_boundary(text: &str) -> Result<Polygon> {
    let document: Value = serde_json::from_str(text)?;
    let ring = first_exterior_ring(&document)
        .ok_or_else(|| ModelError::InvalidGeoJson("no Polygon geometry found".into()))?;
    boundary_from_vertices(&ring)
}

/// Load a GeoJSON boundary file.
pub fn load_geojson_boundary<P: AsRef<Path>>(path: P) -> Result<Polygon> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|e| ModelError::io(path, e))?;
    parse_geojson_boundary(&text)
}

fn first_exterior_ring(value: &Value) -> Option<Vec<[f64; 2]>> {
    match value.get("type")?.as_str()? {
        "FeatureCollection" => value
            .get("features")?
            .as_array()?
            .iter()
            .find_map(first_exterior_ring),
        "Feature" => first_exterior_ring(value.get("geometry")?),
        "Polygon" => parse_ring(value.get("coordinates")?.get(0)?),
        "MultiPolygon" => parse_ring(value.get("coordinates")?.get(0)?.get(0)?),
        _ => None,
    }
}

fn parse_ring(ring: &Value) -> Option<Vec<[f64; 2]>> {
    ring.as_array()?
        .iter()
        .map(|position| {
            let position = position.as_array()?;
            Some([position.first()?.as_f64()?, position.get(1)?.as_f64()?])
        })
        .collect()
}
