//! Tolerance-aware intersection of polylines.
//!
//! Points of crossing and touching are reported individually; collinear
//! stretches are reported as linear overlaps with their interior joints, so
//! callers can choose between overlap endpoints and every point on the
//! overlap.

use tracing::debug;

use crate::cluster;
use crate::envelope::Envelope;
use crate::errors::KernelError;
use crate::geometry::Polyline;
use crate::point::Point3d;
use crate::segment::Segment;

/// A maximal collinear stretch shared by the two inputs, traced along the
/// first input.
#[derive(Debug, Clone)]
pub struct LinearOverlap {
    pub start: Point3d,
    pub end: Point3d,
    /// Vertices where overlap pieces join, strictly between start and end.
    pub interior_points: Vec<Point3d>,
}

impl LinearOverlap {
    pub fn contains_2d(&self, point: &Point3d, tolerance: f64) -> bool {
        Segment::new(self.start, self.end).distance_2d_to(point) <= tolerance
            || self
                .interior_points
                .iter()
                .any(|p| p.equal_2d(point, tolerance))
    }
}

/// Result of intersecting two polylines at a tolerance. Z values are taken
/// from the first input.
#[derive(Debug, Clone, Default)]
pub struct IntersectionRun {
    pub points: Vec<Point3d>,
    pub linear_overlaps: Vec<LinearOverlap>,
}

impl IntersectionRun {
    pub fn is_empty(&self) -> bool {
        self.points.is_empty() && self.linear_overlaps.is_empty()
    }

    /// Overlap endpoints, without interior joints.
    pub fn overlap_end_points(&self) -> Vec<Point3d> {
        let mut points = Vec::new();
        for overlap in &self.linear_overlaps {
            points.push(overlap.start);
            points.push(overlap.end);
        }
        points
    }

    /// Every point on the overlaps, interior joints included.
    pub fn overlap_all_points(&self) -> Vec<Point3d> {
        let mut points = Vec::new();
        for overlap in &self.linear_overlaps {
            points.push(overlap.start);
            points.extend(overlap.interior_points.iter().copied());
            points.push(overlap.end);
        }
        points
    }
}

/// Intersect two polylines at the given XY tolerance.
///
/// Fails with [`KernelError::ClusterToleranceTooLarge`] when the tolerance is
/// out of proportion to the combined extent; results at such a tolerance
/// would collapse the geometries.
pub fn intersect_polylines(
    a: &Polyline,
    b: &Polyline,
    tolerance: f64,
) -> Result<IntersectionRun, KernelError> {
    if a.is_empty() || b.is_empty() {
        return Err(KernelError::EmptyGeometry);
    }
    let envelope = combined_envelope(a, b).ok_or(KernelError::EmptyGeometry)?;
    let extent = envelope.max_dimension();
    if extent > 0.0 && tolerance > extent / 2.0 {
        return Err(KernelError::ClusterToleranceTooLarge { tolerance, extent });
    }

    let mut points = Vec::new();
    let mut overlap_pieces: Vec<(Point3d, Point3d)> = Vec::new();

    for path_a in &a.paths {
        for seg_a in path_a.segments() {
            for path_b in &b.paths {
                for seg_b in path_b.segments() {
                    intersect_segments(
                        &seg_a,
                        &seg_b,
                        tolerance,
                        &mut points,
                        &mut overlap_pieces,
                    );
                }
            }
        }
    }

    let linear_overlaps = merge_overlap_pieces(overlap_pieces, tolerance);
    // Drop touch points that only restate an overlap.
    let points: Vec<Point3d> = points
        .into_iter()
        .filter(|p| !linear_overlaps.iter().any(|o| o.contains_2d(p, tolerance)))
        .collect();
    let points = cluster::cluster_points(&points, tolerance, None);

    debug!(
        points = points.len(),
        overlaps = linear_overlaps.len(),
        tolerance,
        "polyline intersection"
    );
    Ok(IntersectionRun {
        points,
        linear_overlaps,
    })
}

fn combined_envelope(a: &Polyline, b: &Polyline) -> Option<Envelope> {
    Envelope::of_points(a.points().chain(b.points()))
}

/// Intersect one segment pair, appending crossing/touch points and collinear
/// overlap pieces.
fn intersect_segments(
    seg_a: &Segment,
    seg_b: &Segment,
    tolerance: f64,
    points: &mut Vec<Point3d>,
    overlaps: &mut Vec<(Point3d, Point3d)>,
) {
    let dax = seg_a.to.x - seg_a.from.x;
    let day = seg_a.to.y - seg_a.from.y;
    let dbx = seg_b.to.x - seg_b.from.x;
    let dby = seg_b.to.y - seg_b.from.y;
    let len_a = seg_a.length_2d();
    let len_b = seg_b.length_2d();
    if len_a < 1e-15 || len_b < 1e-15 {
        return;
    }
    let denom = dax * dby - day * dbx;

    // Parallel within tolerance: sine of the angle between the segments,
    // scaled back to a distance over the shorter segment.
    let parallel = denom.abs() / (len_a * len_b) * len_a.min(len_b) <= tolerance;
    if parallel {
        collinear_overlap(seg_a, seg_b, tolerance, points, overlaps);
        return;
    }

    let ex = seg_b.from.x - seg_a.from.x;
    let ey = seg_b.from.y - seg_a.from.y;
    let t = (ex * dby - ey * dbx) / denom;
    let u = (ex * day - ey * dax) / denom;
    let margin_t = tolerance / len_a;
    let margin_u = tolerance / len_b;
    if t >= -margin_t && t <= 1.0 + margin_t && u >= -margin_u && u <= 1.0 + margin_u {
        points.push(seg_a.point_at(t.clamp(0.0, 1.0)));
        return;
    }

    // No crossing; an endpoint may still touch the other segment.
    for end_b in [&seg_b.from, &seg_b.to] {
        let (closest, _) = seg_a.closest_point_2d(end_b);
        if closest.distance_2d(end_b) <= tolerance {
            points.push(closest);
        }
    }
    for end_a in [&seg_a.from, &seg_a.to] {
        if seg_b.distance_2d_to(end_a) <= tolerance {
            points.push(*end_a);
        }
    }
}

/// Shared stretch of two near-parallel segments, projected onto `seg_a`.
fn collinear_overlap(
    seg_a: &Segment,
    seg_b: &Segment,
    tolerance: f64,
    points: &mut Vec<Point3d>,
    overlaps: &mut Vec<(Point3d, Point3d)>,
) {
    if seg_a.distance_2d_to(&seg_b.from) > tolerance && seg_a.distance_2d_to(&seg_b.to) > tolerance
    {
        return;
    }
    let (_, t_from) = seg_a.closest_point_2d(&seg_b.from);
    let (_, t_to) = seg_a.closest_point_2d(&seg_b.to);
    let (t0, t1) = if t_from <= t_to {
        (t_from, t_to)
    } else {
        (t_to, t_from)
    };
    let start = seg_a.point_at(t0);
    let end = seg_a.point_at(t1);
    // Only count the clipped part actually close to seg_b.
    if seg_b.distance_2d_to(&start) > tolerance || seg_b.distance_2d_to(&end) > tolerance {
        return;
    }
    if start.distance_2d(&end) <= tolerance {
        points.push(start);
    } else {
        overlaps.push((start, end));
    }
}

/// Chain per-segment overlap pieces into maximal runs; shared piece joints
/// become interior points of the run.
fn merge_overlap_pieces(pieces: Vec<(Point3d, Point3d)>, tolerance: f64) -> Vec<LinearOverlap> {
    let mut remaining = pieces;
    let mut runs = Vec::new();
    while let Some((mut start, mut end)) = remaining.pop() {
        let mut interior = Vec::new();
        loop {
            let mut extended = false;
            let mut i = 0;
            while i < remaining.len() {
                let (ps, pe) = remaining[i];
                if ps.equal_2d(&end, tolerance) {
                    interior.push(end);
                    end = pe;
                } else if pe.equal_2d(&end, tolerance) {
                    interior.push(end);
                    end = ps;
                } else if pe.equal_2d(&start, tolerance) {
                    interior.push(start);
                    start = ps;
                } else if ps.equal_2d(&start, tolerance) {
                    interior.push(start);
                    start = pe;
                } else {
                    i += 1;
                    continue;
                }
                remaining.remove(i);
                extended = true;
            }
            if !extended {
                break;
            }
        }
        runs.push(LinearOverlap {
            start,
            end,
            interior_points: interior,
        });
    }
    runs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Path;

    fn line(points: Vec<Point3d>) -> Polyline {
        Polyline::single(Path::new(points))
    }

    #[test]
    fn test_proper_crossing() {
        let a = line(vec![Point3d::new_2d(0.0, 0.0), Point3d::new_2d(10.0, 10.0)]);
        let b = line(vec![Point3d::new_2d(0.0, 10.0), Point3d::new_2d(10.0, 0.0)]);
        let run = intersect_polylines(&a, &b, 0.01).unwrap();
        assert_eq!(run.points.len(), 1);
        assert!(run.points[0].equal_2d(&Point3d::new_2d(5.0, 5.0), 1e-9));
        assert!(run.linear_overlaps.is_empty());
    }

    #[test]
    fn test_near_miss_within_tolerance() {
        let a = line(vec![Point3d::new_2d(0.0, 0.0), Point3d::new_2d(10.0, 0.0)]);
        let b = line(vec![Point3d::new_2d(5.0, 0.05), Point3d::new_2d(5.0, 10.0)]);
        let strict = intersect_polylines(&a, &b, 0.01).unwrap();
        assert!(strict.is_empty());
        let loose = intersect_polylines(&a, &b, 0.1).unwrap();
        assert_eq!(loose.points.len(), 1);
    }

    #[test]
    fn test_crossing_takes_z_from_first_input() {
        let a = line(vec![
            Point3d::new(0.0, 0.0, 100.0),
            Point3d::new(10.0, 0.0, 200.0),
        ]);
        let b = line(vec![Point3d::new(5.0, -5.0, 7.0), Point3d::new(5.0, 5.0, 7.0)]);
        let run = intersect_polylines(&a, &b, 0.01).unwrap();
        assert_eq!(run.points.len(), 1);
        assert!((run.points[0].z - 150.0).abs() < 1e-6);
    }

    #[test]
    fn test_linear_overlap_with_interior_joint() {
        // b runs along a from x=2 to x=8 with a vertex at x=5.
        let a = line(vec![Point3d::new_2d(0.0, 0.0), Point3d::new_2d(10.0, 0.0)]);
        let b = line(vec![
            Point3d::new_2d(2.0, 0.0),
            Point3d::new_2d(5.0, 0.0),
            Point3d::new_2d(8.0, 0.0),
        ]);
        let run = intersect_polylines(&a, &b, 0.01).unwrap();
        assert_eq!(run.linear_overlaps.len(), 1);
        let overlap = &run.linear_overlaps[0];
        let mut xs = [overlap.start.x, overlap.end.x];
        xs.sort_by(f64::total_cmp);
        assert!((xs[0] - 2.0).abs() < 1e-9 && (xs[1] - 8.0).abs() < 1e-9);
        assert_eq!(overlap.interior_points.len(), 1);
        assert!((overlap.interior_points[0].x - 5.0).abs() < 1e-9);
        // Touch points on the overlap are not reported separately.
        assert!(run.points.is_empty());
    }

    #[test]
    fn test_excessive_tolerance_is_rejected() {
        let a = line(vec![Point3d::new_2d(0.0, 0.0), Point3d::new_2d(1.0, 0.0)]);
        let b = line(vec![Point3d::new_2d(0.0, 1.0), Point3d::new_2d(1.0, 1.0)]);
        let err = intersect_polylines(&a, &b, 10.0).unwrap_err();
        assert!(matches!(err, KernelError::ClusterToleranceTooLarge { .. }));
    }
}
