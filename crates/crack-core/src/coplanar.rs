//! Z reconciliation for vertices shared by several facet planes.
//!
//! When a crack point coincides with a vertex that several approximately
//! coplanar facets pass through, the inserted Z must lie on all of those
//! planes at once instead of adopting one facet's Z.

use tracing::debug;

use geom_kernel::{Plane3d, Point3d};

/// Reconcile a vertex against the facet planes through it. Falls back to the
/// vertex unchanged whenever the planes give no answer within
/// `coplanarity_tolerance`.
pub fn reconcile(vertex: &Point3d, planes: &[Plane3d], coplanarity_tolerance: f64) -> Point3d {
    match planes {
        [] => *vertex,
        [plane] => project_onto_plane(vertex, plane),
        [first, second] => {
            let Some(line) = first.intersect_plane(second) else {
                // Near-parallel planes; either one serves.
                return project_onto_plane(vertex, first);
            };
            let projected = line.project_point(vertex);
            if projected.distance_3d(vertex) <= coplanarity_tolerance {
                projected
            } else {
                debug!("vertex too far from plane intersection line, keeping original");
                *vertex
            }
        }
        [first, second, rest @ ..] => {
            let Some(line) = first.intersect_plane(second) else {
                return project_onto_plane(vertex, first);
            };
            let mut agreed: Option<Point3d> = None;
            for plane in rest {
                let Some(point) = line.intersect_plane(plane) else {
                    return *vertex;
                };
                match agreed {
                    None => agreed = Some(point),
                    Some(previous) => {
                        if previous.distance_3d(&point) > coplanarity_tolerance {
                            debug!("facet planes disagree beyond tolerance, keeping original");
                            return *vertex;
                        }
                    }
                }
            }
            match agreed {
                Some(point) if point.distance_3d(vertex) <= coplanarity_tolerance => point,
                _ => *vertex,
            }
        }
    }
}

fn project_onto_plane(vertex: &Point3d, plane: &Plane3d) -> Point3d {
    match plane.z_at(vertex.x, vertex.y) {
        Some(z) => vertex.with_z(z),
        // A vertical plane has no unique Z here.
        None => *vertex,
    }
}
