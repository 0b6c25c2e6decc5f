//! Splitting lines at crack points, and ordering chop points for cutting
//! tools.

use geom_kernel::{Path, Point3d, Polyline};

/// Distance along the path of the projection of `point`, when the point lies
/// within `tolerance` of the path.
fn position_along(path: &Path, point: &Point3d, tolerance: f64) -> Option<f64> {
    let mut traversed = 0.0;
    let mut best: Option<(f64, f64)> = None;
    for seg in path.segments() {
        let (closest, t) = seg.closest_point_2d(point);
        let distance = closest.distance_2d(point);
        if distance <= tolerance && best.map_or(true, |(_, bd)| distance < bd) {
            best = Some((traversed + t * seg.length_2d(), distance));
        }
        traversed += seg.length_2d();
    }
    best.map(|(position, _)| position)
}

/// Order chop points so the longest piece keeps the feature's identity:
/// the shorter end piece is chopped off first, repeatedly.
pub fn ordered_chop_points(
    path: &Path,
    chop_points: &[Point3d],
    tolerance: f64,
) -> Vec<Point3d> {
    let mut located: Vec<(f64, Point3d)> = chop_points
        .iter()
        .filter_map(|p| position_along(path, p, tolerance).map(|pos| (pos, *p)))
        .collect();
    located.sort_by(|a, b| a.0.total_cmp(&b.0));

    let total = path.length_2d();
    let mut start = 0.0;
    let mut end = total;
    let mut ordered = Vec::with_capacity(located.len());
    let mut remaining: std::collections::VecDeque<(f64, Point3d)> = located.into();
    while let (Some(front), Some(back)) = (remaining.front().copied(), remaining.back().copied()) {
        let front_piece = front.0 - start;
        let back_piece = end - back.0;
        if front_piece <= back_piece {
            ordered.push(front.1);
            start = front.0;
            remaining.pop_front();
        } else {
            ordered.push(back.1);
            end = back.0;
            remaining.pop_back();
        }
    }
    ordered
}

/// Cut a path into sub-paths at the given points. Points not on the path
/// (within tolerance) and points at the path ends are ignored.
pub fn split_path(path: &Path, split_points: &[Point3d], tolerance: f64) -> Vec<Path> {
    let total = path.length_2d();
    let mut positions: Vec<f64> = split_points
        .iter()
        .filter_map(|p| position_along(path, p, tolerance))
        .filter(|pos| *pos > tolerance && *pos < total - tolerance)
        .collect();
    positions.sort_by(f64::total_cmp);
    positions.dedup_by(|a, b| (*a - *b).abs() <= tolerance);
    if positions.is_empty() {
        return vec![path.clone()];
    }

    let mut parts = Vec::with_capacity(positions.len() + 1);
    let mut current = vec![path.points[0]];
    let mut traversed = 0.0;
    let mut next_cut = positions.iter().copied().peekable();
    for seg in path.segments() {
        let length = seg.length_2d();
        while let Some(&cut) = next_cut.peek() {
            if cut > traversed + length - tolerance {
                break;
            }
            let t = if length > 0.0 {
                ((cut - traversed) / length).clamp(0.0, 1.0)
            } else {
                0.0
            };
            let cut_point = seg.point_at(t);
            // A cut at an existing vertex must not double that vertex.
            if current
                .last()
                .map_or(true, |last| last.distance_2d(&cut_point) > tolerance)
            {
                current.push(cut_point);
            }
            parts.push(Path::new(current));
            current = vec![cut_point];
            next_cut.next();
        }
        current.push(seg.to);
        traversed += length;
    }
    parts.push(Path::new(current));
    parts
}

/// Split every path of a polyline; each resulting piece becomes its own
/// single-part polyline.
pub fn split_polyline(
    polyline: &Polyline,
    split_points: &[Point3d],
    tolerance: f64,
) -> Vec<Polyline> {
    polyline
        .paths
        .iter()
        .flat_map(|path| split_path(path, split_points, tolerance))
        .map(Polyline::single)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line() -> Path {
        Path::new(vec![Point3d::new_2d(0.0, 0.0), Point3d::new_2d(10.0, 0.0)])
    }

    #[test]
    fn test_split_path_at_interior_points() {
        let parts = split_path(
            &line(),
            &[Point3d::new_2d(3.0, 0.0), Point3d::new_2d(7.0, 0.0)],
            0.01,
        );
        assert_eq!(parts.len(), 3);
        assert!((parts[0].length_2d() - 3.0).abs() < 1e-9);
        assert!((parts[1].length_2d() - 4.0).abs() < 1e-9);
        assert!((parts[2].length_2d() - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_points_off_the_path_ignored() {
        let parts = split_path(&line(), &[Point3d::new_2d(5.0, 3.0)], 0.01);
        assert_eq!(parts.len(), 1);
    }

    #[test]
    fn test_ordered_chop_points_shorter_end_first() {
        // Pieces: 2, 3, 5. The 2-piece end goes first, then the 3-piece
        // remainder at the other end, leaving the 5-piece with the identity.
        let ordered = ordered_chop_points(
            &line(),
            &[Point3d::new_2d(2.0, 0.0), Point3d::new_2d(5.0, 0.0)],
            0.01,
        );
        assert_eq!(ordered.len(), 2);
        assert!((ordered[0].x - 2.0).abs() < 1e-9);
        assert!((ordered[1].x - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_ordered_chop_points_from_far_end() {
        // Pieces: 5, 3, 2. Chop the far 2-piece first.
        let ordered = ordered_chop_points(
            &line(),
            &[Point3d::new_2d(5.0, 0.0), Point3d::new_2d(8.0, 0.0)],
            0.01,
        );
        assert!((ordered[0].x - 8.0).abs() < 1e-9);
        assert!((ordered[1].x - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_split_preserves_z_interpolation() {
        let path = Path::new(vec![
            Point3d::new(0.0, 0.0, 0.0),
            Point3d::new(10.0, 0.0, 100.0),
        ]);
        let parts = split_path(&path, &[Point3d::new_2d(5.0, 0.0)], 0.01);
        assert_eq!(parts.len(), 2);
        assert!((parts[0].points[1].z - 50.0).abs() < 1e-9);
    }
}
