//! Annotation polygons.

use crate::{GeomError, Result};
use serde::{Deserialize, Serialize};

/// A 2D coordinate in a single coordinate space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coord {
    /// Horizontal component (column, longitude, or easting).
    pub x: f64,
    /// Vertical component (row, latitude, or northing).
    pub y: f64,
}

impl Coord {
    /// Create a coordinate.
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another coordinate.
    pub fn distance(&self, other: &Coord) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

impl From<(f64, f64)> for Coord {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Minimum x.
    pub min_x: f64,
    /// Minimum y.
    pub min_y: f64,
    /// Maximum x.
    pub max_x: f64,
    /// Maximum y.
    pub max_y: f64,
}

impl BoundingBox {
    /// Width of the box.
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    /// Height of the box.
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Check if a coordinate is within the box (edges included).
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }

    /// Whether two boxes share any area or edge.
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.min_x <= other.max_x
            && other.min_x <= self.max_x
            && self.min_y <= other.max_y
            && other.min_y <= self.max_y
    }
}

/// A simple polygon ring, implicitly closed.
///
/// The last vertex connects back to the first; the ring is never stored
/// closed. Vertices are not deduplicated and self-intersection is not
/// checked here (see [`crate::validate_polygon`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    vertices: Vec<Coord>,
}

impl Polygon {
    /// Build a polygon from a flat `[x1, y1, x2, y2, ...]` list.
    ///
    /// This is the COCO segmentation layout. Fails when the list length is
    /// odd, when it holds fewer than three vertices, or when a value is not
    /// finite.
    pub fn from_flat(values: &[f64]) -> Result<Self> {
        if values.len() % 2 != 0 {
            return Err(GeomError::OddCoordinateCount { len: values.len() });
        }
        if let Some(position) = values.iter().position(|v| !v.is_finite()) {
            return Err(GeomError::NonFiniteCoordinate { position });
        }

        let vertices: Vec<Coord> = values
            .chunks_exact(2)
            .map(|pair| Coord::new(pair[0], pair[1]))
            .collect();

        Self::from_vertices(vertices)
    }

    /// Build a polygon from explicit vertices.
    pub fn from_vertices(vertices: Vec<Coord>) -> Result<Self> {
        if vertices.len() < 3 {
            return Err(GeomError::TooFewVertices {
                vertices: vertices.len(),
            });
        }
        Ok(Self { vertices })
    }

    /// The ring's vertices, without a repeated closing vertex.
    pub fn vertices(&self) -> &[Coord] {
        &self.vertices
    }

    /// Number of vertices.
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    /// Always false; a polygon has at least three vertices.
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Iterate over the ring's edges, including the closing edge.
    pub fn edges(&self) -> impl Iterator<Item = (Coord, Coord)> + '_ {
        let n = self.vertices.len();
        (0..n).map(move |i| (self.vertices[i], self.vertices[(i + 1) % n]))
    }

    /// Signed shoelace area (positive for counter-clockwise rings in a
    /// y-up space).
    ///
    /// Computed relative to the first vertex, so rings far from the origin
    /// (projected meters) keep their precision.
    pub fn signed_area(&self) -> f64 {
        let o = self.vertices[0];
        let twice: f64 = self
            .edges()
            .map(|(p, q)| (p.x - o.x) * (q.y - o.y) - (q.x - o.x) * (p.y - o.y))
            .sum();
        twice / 2.0
    }

    /// Enclosed area in the units of the vertex space, always non-negative.
    ///
    /// For an annotation this is the area in square pixels.
    pub fn area(&self) -> f64 {
        self.signed_area().abs()
    }

    /// Ring length in the units of the vertex space.
    pub fn perimeter(&self) -> f64 {
        self.edges().map(|(p, q)| p.distance(&q)).sum()
    }

    /// Axis-aligned bounding box of the vertices.
    pub fn bounding_box(&self) -> BoundingBox {
        let mut bbox = BoundingBox {
            min_x: f64::INFINITY,
            min_y: f64::INFINITY,
            max_x: f64::NEG_INFINITY,
            max_y: f64::NEG_INFINITY,
        };
        for v in &self.vertices {
            bbox.min_x = bbox.min_x.min(v.x);
            bbox.min_y = bbox.min_y.min(v.y);
            bbox.max_x = bbox.max_x.max(v.x);
            bbox.max_y = bbox.max_y.max(v.y);
        }
        bbox
    }

    /// Area centroid. Falls back to the vertex mean for zero-area rings.
    pub fn centroid(&self) -> Coord {
        let area = self.signed_area();
        if area.abs() < f64::EPSILON {
            let n = self.vertices.len() as f64;
            let (sx, sy) = self
                .vertices
                .iter()
                .fold((0.0, 0.0), |(sx, sy), v| (sx + v.x, sy + v.y));
            return Coord::new(sx / n, sy / n);
        }

        let o = self.vertices[0];
        let (cx, cy) = self.edges().fold((0.0, 0.0), |(cx, cy), (p, q)| {
            let (px, py, qx, qy) = (p.x - o.x, p.y - o.y, q.x - o.x, q.y - o.y);
            let cross = px * qy - qx * py;
            (cx + (px + qx) * cross, cy + (py + qy) * cross)
        });
        Coord::new(o.x + cx / (6.0 * area), o.y + cy / (6.0 * area))
    }

    /// Even-odd point-in-polygon test.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        let mut inside = false;
        for (p, q) in self.edges() {
            if (p.y > y) != (q.y > y) && x < (q.x - p.x) * (y - p.y) / (q.y - p.y) + p.x {
                inside = !inside;
            }
        }
        inside
    }

    /// Shortest distance from `(x, y)` to any edge of the ring.
    pub fn boundary_distance(&self, x: f64, y: f64) -> f64 {
        let point = Coord::new(x, y);
        self.edges()
            .map(|(p, q)| segment_distance(p, q, point))
            .fold(f64::INFINITY, f64::min)
    }

    /// Polygon with every vertex scaled by `(sx, sy)` about the origin.
    pub fn scaled(&self, sx: f64, sy: f64) -> Self {
        self.map_coords(|c| Coord::new(c.x * sx, c.y * sy))
    }

    /// Polygon with every vertex passed through `f`.
    pub fn map_coords<F>(&self, f: F) -> Self
    where
        F: Fn(Coord) -> Coord,
    {
        Self {
            vertices: self.vertices.iter().copied().map(f).collect(),
        }
    }

    /// Vertices as `[x, y]` pairs, convenient for serialization.
    pub fn to_pairs(&self) -> Vec<[f64; 2]> {
        self.vertices.iter().map(|v| [v.x, v.y]).collect()
    }
}

fn segment_distance(p: Coord, q: Coord, r: Coord) -> f64 {
    let (dx, dy) = (q.x - p.x, q.y - p.y);
    let length_sq = dx * dx + dy * dy;
    if length_sq == 0.0 {
        return p.distance(&r);
    }
    let t = (((r.x - p.x) * dx + (r.y - p.y) * dy) / length_sq).clamp(0.0, 1.0);
    Coord::new(p.x + t * dx, p.y + t * dy).distance(&r)
}
