//! Opt-in polygon validation.
//!
//! Area and mask computations silently degrade on self-intersecting rings,
//! so callers that care run this check and decide what to do. Nothing here
//! modifies geometry.

use crate::{Coord, Polygon};
use serde::{Deserialize, Serialize};

/// Result of validating a polygon ring.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PolygonValidation {
    /// Pairs of edge indices that cross or touch (non-adjacent edges only).
    pub self_intersections: Vec<(usize, usize)>,
    /// Whether all turns go the same way.
    pub is_convex: bool,
    /// Indices of vertices equal to their successor.
    pub duplicate_vertices: Vec<usize>,
}

impl PolygonValidation {
    /// True when the ring is simple (no self-intersections).
    pub fn is_simple(&self) -> bool {
        self.self_intersections.is_empty()
    }
}

/// Validate a polygon ring.
///
/// Edge `i` runs from vertex `i` to vertex `i + 1` (wrapping). Repeated
/// consecutive vertices (including a closing vertex equal to the first) are
/// reported in `duplicate_vertices` but are not crossings: the intersection
/// and convexity checks run over the distinct vertices, and reported edge
/// indices refer to the edge's first vertex in the input ring. The check is
/// quadratic in the vertex count, which is fine for hand-drawn annotations.
pub fn validate_polygon(polygon: &Polygon) -> PolygonValidation {
    let v = polygon.vertices();
    let n = v.len();

    let duplicate_vertices = (0..n).filter(|&i| v[i] == v[(i + 1) % n]).collect();

    let distinct = distinct_vertices(v);
    let points: Vec<Coord> = distinct.iter().map(|&(_, c)| c).collect();
    let m = points.len();

    let mut self_intersections = Vec::new();
    if m >= 3 {
        for i in 0..m {
            for j in (i + 1)..m {
                // Adjacent edges share a vertex by construction
                if j == i + 1 || (i == 0 && j == m - 1) {
                    continue;
                }
                if segments_intersect(points[i], points[(i + 1) % m], points[j], points[(j + 1) % m]) {
                    self_intersections.push((distinct[i].0, distinct[j].0));
                }
            }
        }
    }

    PolygonValidation {
        is_convex: self_intersections.is_empty() && turns_one_way(&points),
        self_intersections,
        duplicate_vertices,
    }
}

/// Vertices with consecutive repeats removed, paired with their input index.
///
/// A run of equal vertices keeps its first index; a trailing run equal to
/// the first vertex is dropped.
fn distinct_vertices(v: &[Coord]) -> Vec<(usize, Coord)> {
    let mut distinct: Vec<(usize, Coord)> = Vec::with_capacity(v.len());
    for (i, &c) in v.iter().enumerate() {
        if distinct.last().map_or(true, |&(_, last)| last != c) {
            distinct.push((i, c));
        }
    }
    while distinct.len() > 1 && distinct.last().map(|&(_, c)| c) == distinct.first().map(|&(_, c)| c) {
        distinct.pop();
    }
    distinct
}

fn cross(o: Coord, a: Coord, b: Coord) -> f64 {
    (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
}

fn on_segment(p: Coord, q: Coord, r: Coord) -> bool {
    r.x >= p.x.min(q.x) && r.x <= p.x.max(q.x) && r.y >= p.y.min(q.y) && r.y <= p.y.max(q.y)
}

fn segments_intersect(p1: Coord, p2: Coord, p3: Coord, p4: Coord) -> bool {
    let d1 = cross(p3, p4, p1);
    let d2 = cross(p3, p4, p2);
    let d3 = cross(p1, p2, p3);
    let d4 = cross(p1, p2, p4);

    if ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
        && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
    {
        return true;
    }

    (d1 == 0.0 && on_segment(p3, p4, p1))
        || (d2 == 0.0 && on_segment(p3, p4, p2))
        || (d3 == 0.0 && on_segment(p1, p2, p3))
        || (d4 == 0.0 && on_segment(p1, p2, p4))
}

fn turns_one_way(v: &[Coord]) -> bool {
    let n = v.len();
    let mut sign = 0.0_f64;
    for i in 0..n {
        let turn = cross(v[i], v[(i + 1) % n], v[(i + 2) % n]);
        if turn == 0.0 {
            continue;
        }
        if sign == 0.0 {
            sign = turn.signum();
        } else if turn.signum() != sign {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_square_is_simple_and_convex() {
        let p = Polygon::from_flat(&[0.0, 0.0, 10.0, 0.0, 10.0, 10.0, 0.0, 10.0]).unwrap();
        let report = validate_polygon(&p);
        assert!(report.is_simple());
        assert!(report.is_convex);
        assert!(report.duplicate_vertices.is_empty());
    }

    #[test]
    fn test_bowtie_self_intersects() {
        let p = Polygon::from_flat(&[0.0, 0.0, 10.0, 10.0, 10.0, 0.0, 0.0, 10.0]).unwrap();
        let report = validate_polygon(&p);
        assert_eq!(report.self_intersections, vec![(0, 2)]);
        assert!(!report.is_convex);
    }

    #[test]
    fn test_concave_is_simple_but_not_convex() {
        let p = Polygon::from_flat(&[0.0, 0.0, 10.0, 0.0, 5.0, 3.0, 10.0, 10.0, 0.0, 10.0])
            .unwrap();
        let report = validate_polygon(&p);
        assert!(report.is_simple());
        assert!(!report.is_convex);
    }

    #[test]
    fn test_duplicate_vertex_reported() {
        let p = Polygon::from_flat(&[0.0, 0.0, 4.0, 0.0, 4.0, 0.0, 4.0, 4.0]).unwrap();
        let report = validate_polygon(&p);
        assert_eq!(report.duplicate_vertices, vec![1]);
        assert!(report.is_simple());
    }

    #[test]
    fn test_repeated_vertex_is_not_a_crossing() {
        let p = Polygon::from_flat(&[0.0, 0.0, 10.0, 0.0, 10.0, 0.0, 10.0, 10.0, 0.0, 10.0]).unwrap();
        let report = validate_polygon(&p);
        assert!(report.is_simple(), "{:?}", report.self_intersections);
        assert!(report.is_convex);
        assert_eq!(report.duplicate_vertices, vec![1]);
    }

    #[test]
    fn test_closed_ring_is_simple() {
        let p = Polygon::from_flat(&[0.0, 0.0, 10.0, 0.0, 10.0, 10.0, 0.0, 10.0, 0.0, 0.0]).unwrap();
        let report = validate_polygon(&p);
        assert!(report.is_simple(), "{:?}", report.self_intersections);
        assert!(report.is_convex);
        assert_eq!(report.duplicate_vertices, vec![4]);
    }

    #[test]
    fn test_bowtie_with_repeated_vertex_keeps_input_edge_indices() {
        let p = Polygon::from_flat(&[0.0, 0.0, 0.0, 0.0, 10.0, 10.0, 10.0, 0.0, 0.0, 10.0]).unwrap();
        let report = validate_polygon(&p);
        assert_eq!(report.self_intersections, vec![(0, 3)]);
    }

    #[test]
    fn test_all_equal_vertices_have_no_crossings() {
        let p = Polygon::from_flat(&[3.0, 3.0, 3.0, 3.0, 3.0, 3.0]).unwrap();
        let report = validate_polygon(&p);
        assert!(report.is_simple());
        assert_eq!(report.duplicate_vertices, vec![0, 1, 2]);
    }
}
