//! Redundant-vertex detection.
//!
//! Generalizes a linearized copy of each path and reports the vertices the
//! generalization would drop. Curved segments are excluded beforehand;
//! generalizing them would fabricate vertices that never existed. The first
//! and last vertex of every path are never reported, and neither is any
//! vertex coinciding with a protected intersection point.

use geom_kernel::{generalize, Point3d, Polyline, SegmentKind};
use tracing::debug;

/// Vertices of `polyline` that a Douglas-Peucker generalization at
/// `tolerance` would remove. With `use_3d`, deviation is measured spatially.
pub fn weed_points(
    polyline: &Polyline,
    tolerance: f64,
    use_3d: bool,
    protected: &[Point3d],
    protect_tolerance: f64,
) -> Vec<Point3d> {
    let mut removable = Vec::new();
    for path in &polyline.paths {
        // Maximal straight-line runs; curve vertices stay untouched.
        let mut run_start = 0;
        for (i, kind) in path.kinds.iter().enumerate() {
            if *kind == SegmentKind::Curve {
                weed_run(&path.points[run_start..=i], tolerance, use_3d, &mut removable);
                run_start = i + 1;
            }
        }
        if run_start < path.points.len() {
            weed_run(
                &path.points[run_start..],
                tolerance,
                use_3d,
                &mut removable,
            );
        }
    }

    let before = removable.len();
    removable.retain(|candidate| {
        !protected
            .iter()
            .any(|p| p.equal_2d(candidate, protect_tolerance))
    });
    if removable.len() < before {
        debug!(
            protected = before - removable.len(),
            "weed candidates kept as intersection points"
        );
    }
    removable
}

fn weed_run(points: &[Point3d], tolerance: f64, use_3d: bool, removable: &mut Vec<Point3d>) {
    if points.len() < 3 {
        return;
    }
    let keep = generalize::douglas_peucker_keep(points, tolerance, use_3d);
    for (point, kept) in points.iter().zip(&keep) {
        if !kept {
            removable.push(*point);
        }
    }
}
