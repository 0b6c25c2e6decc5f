//! Choosing the point actually inserted for a raw intersection candidate.

use geom_kernel::{query, Point3d, Polyline};

use crate::classify::{PointClassifier, PointSpace};
use crate::registry::CrackPointRegistry;

/// Outcome of one snap attempt.
#[derive(Debug, Clone, Copy)]
pub enum SnapResult {
    Snapped { point: Point3d, distance: f64 },
    NotSnapped,
}

impl SnapResult {
    pub fn point(&self) -> Option<Point3d> {
        match self {
            SnapResult::Snapped { point, .. } => Some(*point),
            SnapResult::NotSnapped => None,
        }
    }
}

/// Reuse an already placed crack point so repeated pairwise computations stay
/// mutually consistent (same location, same chosen Z). A registry point with
/// a real XY offset from the candidate is not reused; it describes a
/// different crack.
pub fn snap_to_registry<S: PointSpace>(
    candidate: &Point3d,
    registry: &CrackPointRegistry,
    snap_tolerance: f64,
    classifier: &PointClassifier,
    space: &S,
) -> SnapResult {
    let Some(found) = registry.find_within(candidate, snap_tolerance, space) else {
        return SnapResult::NotSnapped;
    };
    if classifier
        .is_perfectly_matching(&found, candidate)
        .different_within_tolerance
    {
        return SnapResult::NotSnapped;
    }
    SnapResult::Snapped {
        point: found,
        distance: space.distance(&found, candidate),
    }
}

/// Pull the candidate onto the nearest target vertex within the snap
/// tolerance. With `use_source_zs` the snapped location keeps the source's Z.
pub fn snap_to_target_vertex(
    candidate: &Point3d,
    target: &Polyline,
    snap_tolerance: f64,
    use_source_zs: bool,
) -> SnapResult {
    let Some((_, vertex, distance)) = query::nearest_vertex_within(target, candidate, snap_tolerance)
    else {
        return SnapResult::NotSnapped;
    };
    let point = if use_source_zs {
        vertex.with_z(candidate.z)
    } else {
        vertex
    };
    SnapResult::Snapped { point, distance }
}

/// Pick the insertion point from the two snap attempts: whichever snapped
/// point is closer to the raw candidate wins, the raw candidate is the
/// fallback.
pub fn resolve(candidate: &Point3d, registry: SnapResult, target: SnapResult) -> Point3d {
    match (registry, target) {
        (
            SnapResult::Snapped {
                point: rp,
                distance: rd,
            },
            SnapResult::Snapped {
                point: tp,
                distance: td,
            },
        ) => {
            if rd <= td {
                rp
            } else {
                tp
            }
        }
        (SnapResult::Snapped { point, .. }, SnapResult::NotSnapped) => point,
        (SnapResult::NotSnapped, SnapResult::Snapped { point, .. }) => point,
        (SnapResult::NotSnapped, SnapResult::NotSnapped) => *candidate,
    }
}
