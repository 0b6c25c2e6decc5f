//! Proximity queries against polyline vertices and segment interiors.

use crate::geometry::Polyline;
use crate::point::Point3d;

/// Address of a vertex inside a multi-part polyline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexRef {
    pub path: usize,
    pub vertex: usize,
}

/// A segment found within search distance of a query point.
#[derive(Debug, Clone, Copy)]
pub struct SegmentHit {
    pub path: usize,
    pub segment: usize,
    /// Closest point on the segment.
    pub point: Point3d,
    /// XY distance from the query point to `point`.
    pub distance: f64,
    /// Clamped parameter of `point` along the segment, in [0, 1].
    pub along: f64,
}

impl SegmentHit {
    /// Distance from the hit to the nearer segment endpoint, in XY.
    pub fn distance_to_nearer_end(&self, polyline: &Polyline) -> f64 {
        let seg = match polyline.paths.get(self.path).and_then(|p| p.segment(self.segment).ok()) {
            Some(seg) => seg,
            None => return 0.0,
        };
        self.point
            .distance_2d(&seg.from)
            .min(self.point.distance_2d(&seg.to))
    }
}

/// All vertices within `tolerance` (XY) of the query point.
pub fn vertices_near(
    polyline: &Polyline,
    point: &Point3d,
    tolerance: f64,
) -> Vec<(VertexRef, Point3d)> {
    let mut hits = Vec::new();
    for (pi, path) in polyline.paths.iter().enumerate() {
        for (vi, vertex) in path.points.iter().enumerate() {
            if vertex.equal_2d(point, tolerance) {
                hits.push((VertexRef { path: pi, vertex: vi }, *vertex));
            }
        }
    }
    hits
}

/// The closest vertex within `tolerance` (XY), if any.
pub fn nearest_vertex_within(
    polyline: &Polyline,
    point: &Point3d,
    tolerance: f64,
) -> Option<(VertexRef, Point3d, f64)> {
    let mut best: Option<(VertexRef, Point3d, f64)> = None;
    for (vref, vertex) in vertices_near(polyline, point, tolerance) {
        let d = vertex.distance_2d(point);
        if best.map_or(true, |(_, _, bd)| d < bd) {
            best = Some((vref, vertex, d));
        }
    }
    best
}

/// All segments whose closest point lies within `tolerance` (XY) of the query
/// point.
pub fn segments_near(polyline: &Polyline, point: &Point3d, tolerance: f64) -> Vec<SegmentHit> {
    let mut hits = Vec::new();
    for (pi, path) in polyline.paths.iter().enumerate() {
        for (si, seg) in path.segments().enumerate() {
            let (closest, along) = seg.closest_point_2d(point);
            let distance = closest.distance_2d(point);
            if distance <= tolerance {
                hits.push(SegmentHit {
                    path: pi,
                    segment: si,
                    point: closest,
                    distance,
                    along,
                });
            }
        }
    }
    hits
}

/// The closest point on any segment within `tolerance` (XY), if any.
pub fn nearest_point_on_boundary(
    polyline: &Polyline,
    point: &Point3d,
    tolerance: f64,
) -> Option<SegmentHit> {
    segments_near(polyline, point, tolerance)
        .into_iter()
        .min_by(|a, b| a.distance.total_cmp(&b.distance))
}

/// Whether the point coincides with a start or end vertex of any open path.
pub fn is_path_endpoint(polyline: &Polyline, point: &Point3d, tolerance: f64) -> bool {
    polyline.paths.iter().any(|path| {
        if path.is_closed() {
            return false;
        }
        let start = path.start_point().is_some_and(|p| p.equal_2d(point, tolerance));
        let end = path.end_point().is_some_and(|p| p.equal_2d(point, tolerance));
        start || end
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Path;

    fn l_shape() -> Polyline {
        Polyline::single(Path::new(vec![
            Point3d::new_2d(0.0, 0.0),
            Point3d::new_2d(10.0, 0.0),
            Point3d::new_2d(10.0, 10.0),
        ]))
    }

    #[test]
    fn test_vertices_near_finds_corner() {
        let hits = vertices_near(&l_shape(), &Point3d::new_2d(10.0, 0.05), 0.1);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].0, VertexRef { path: 0, vertex: 1 });
    }

    #[test]
    fn test_segments_near_corner_hits_both() {
        let hits = segments_near(&l_shape(), &Point3d::new_2d(10.0, 0.0), 0.01);
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn test_nearest_point_on_interior() {
        let hit = nearest_point_on_boundary(&l_shape(), &Point3d::new_2d(5.0, 0.2), 0.5).unwrap();
        assert_eq!(hit.segment, 0);
        assert!((hit.point.x - 5.0).abs() < 1e-12);
        assert!((hit.distance - 0.2).abs() < 1e-12);
        assert!((hit.along - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_is_path_endpoint() {
        let line = l_shape();
        assert!(is_path_endpoint(&line, &Point3d::new_2d(0.0, 0.0), 0.01));
        assert!(is_path_endpoint(&line, &Point3d::new_2d(10.0, 10.0), 0.01));
        assert!(!is_path_endpoint(&line, &Point3d::new_2d(10.0, 0.0), 0.01));
    }
}
