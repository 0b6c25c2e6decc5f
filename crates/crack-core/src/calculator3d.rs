//! Crack-point computation for 3D surfaces (multipatches).
//!
//! Candidates arrive pre-clustered at the snap tolerance. The policy is the
//! same as the 2D pipeline, but matching is spatial (the same XY at another
//! height is another location) and minimum-segment-length rejection is
//! all-or-nothing per connected facet group, so a surface is never left
//! partially cracked around one location.

use geom_kernel::{cluster, Multipatch, Point3d, Ring};
use tracing::debug;

use crate::calculator::CrackPointCalculator;
use crate::classify::{PointSpace, Spatial};
use crate::crack_point::CrackPoint;
use crate::snap::{self, SnapResult};

/// A segment of one facet found near a candidate.
#[derive(Debug, Clone, Copy)]
struct FacetHit {
    ring: usize,
    /// 3D distance from the candidate to the segment.
    distance: f64,
    /// 3D distance from the hit to the nearer segment end.
    end_distance: f64,
}

impl CrackPointCalculator {
    /// Cluster raw 3D candidates the way the kernel hands them to the
    /// pipeline: XY first, then by Z, both at the snap tolerance.
    pub fn cluster_candidates_3d(&self, candidates: &[Point3d]) -> Vec<Vec<Point3d>> {
        let tolerance = self
            .tolerance()
            .snap_tolerance
            .unwrap_or_else(|| self.tolerance().xy_equality_tolerance());
        cluster::cluster_groups(candidates, tolerance, Some(tolerance))
    }

    /// Evaluate pre-clustered candidates against a surface.
    pub fn compute_crack_points_3d(
        &mut self,
        surface: &Multipatch,
        clusters: &[Vec<Point3d>],
    ) -> Vec<CrackPoint> {
        let xy_tolerance = self.tolerance().xy_equality_tolerance();
        let snap_tolerance = self.tolerance().snap_tolerance.unwrap_or(xy_tolerance);
        let native = self.tolerance().native_intersection_tolerance();
        let search_tolerance = self.tolerance().search_tolerance(native, native);
        let groups = facet_groups(&surface.rings, xy_tolerance);

        let mut accepted: Vec<CrackPoint> = Vec::new();
        for group in clusters {
            if group.is_empty() {
                continue;
            }
            let candidate = cluster::center_of(group);
            if !self.tolerance().within_perimeter(&candidate) {
                continue;
            }

            if self.matches_existing_surface_vertex(surface, &candidate, search_tolerance) {
                continue;
            }

            let registry_hit = self.snap_registry_3d(&candidate, snap_tolerance);
            let vertex_hit = match self.tolerance().snap_tolerance {
                Some(tolerance) => {
                    snap_to_surface_vertex(surface, &candidate, tolerance, self.tolerance().use_source_zs)
                }
                None => SnapResult::NotSnapped,
            };
            let chosen = snap::resolve(&candidate, registry_hit, vertex_hit);

            if accepted
                .iter()
                .any(|cp| Spatial.distance(&cp.location, &chosen) <= snap_tolerance)
            {
                continue;
            }

            let violates = self.violates_in_facet_group(
                surface,
                &groups,
                &chosen,
                search_tolerance,
            );

            let crack_point = if violates {
                CrackPoint::violating(chosen)
            } else {
                self.register_3d(chosen);
                CrackPoint::new(chosen)
            };
            accepted.push(crack_point);
        }
        accepted
    }

    fn matches_existing_surface_vertex(
        &self,
        surface: &Multipatch,
        candidate: &Point3d,
        search_tolerance: f64,
    ) -> bool {
        let Some(vertex) = nearest_surface_vertex(surface, candidate, search_tolerance) else {
            return false;
        };
        if !self.classifier().is_perfectly_matching(candidate, &vertex).matches {
            return false;
        }
        // Another facet segment through the same location, not ending there,
        // still needs its crack.
        let extra = facet_hits(surface, candidate, search_tolerance)
            .iter()
            .any(|hit| hit.distance <= search_tolerance && hit.end_distance > search_tolerance);
        if extra {
            debug!("surface vertex match overridden by uncracked facet segment");
            return false;
        }
        true
    }

    /// All-or-nothing minimum-length rejection: one too-short or ambiguous
    /// insertion in any touched facet rejects the candidate for the whole
    /// connected facet group. Only enforced when a minimum is configured;
    /// ambiguity is counted per facet, like the per-path rule in 2D.
    fn violates_in_facet_group(
        &self,
        surface: &Multipatch,
        groups: &[usize],
        point: &Point3d,
        search_tolerance: f64,
    ) -> bool {
        let Some(minimum) = self.tolerance().minimum_segment_length else {
            return false;
        };
        let hits = facet_hits(surface, point, search_tolerance);
        let touched_groups: Vec<usize> = hits.iter().map(|h| groups[h.ring]).collect();

        for ring_index in 0..surface.rings.len() {
            if !touched_groups.contains(&groups[ring_index]) {
                continue;
            }
            let ring_hits: Vec<&FacetHit> =
                hits.iter().filter(|h| h.ring == ring_index).collect();
            let interior: Vec<&&FacetHit> = ring_hits
                .iter()
                .filter(|h| h.end_distance > search_tolerance)
                .collect();
            if interior.len() >= 2 {
                debug!(ring = ring_index, "ambiguous insertion in facet");
                return true;
            }
            if interior.iter().any(|h| h.end_distance < minimum) {
                debug!(ring = ring_index, "crack point too close to facet vertex");
                return true;
            }
        }
        false
    }
}

/// Connected facet groups: rings sharing a vertex belong to one group.
/// Returns the group id per ring.
fn facet_groups(rings: &[Ring], tolerance: f64) -> Vec<usize> {
    let n = rings.len();
    let mut group: Vec<usize> = (0..n).collect();

    fn root(group: &mut [usize], mut i: usize) -> usize {
        while group[i] != i {
            group[i] = group[group[i]];
            i = group[i];
        }
        i
    }

    for i in 0..n {
        for j in (i + 1)..n {
            let shares_vertex = rings[i].points.iter().any(|a| {
                rings[j]
                    .points
                    .iter()
                    .any(|b| a.distance_3d(b) <= tolerance)
            });
            if shares_vertex {
                let (ri, rj) = (root(&mut group, i), root(&mut group, j));
                group[ri] = rj;
            }
        }
    }
    (0..n).map(|i| root(&mut group, i)).collect()
}

fn nearest_surface_vertex(
    surface: &Multipatch,
    point: &Point3d,
    tolerance: f64,
) -> Option<Point3d> {
    let mut best: Option<(Point3d, f64)> = None;
    for ring in &surface.rings {
        for vertex in &ring.points {
            let d = vertex.distance_3d(point);
            if d <= tolerance && best.map_or(true, |(_, bd)| d < bd) {
                best = Some((*vertex, d));
            }
        }
    }
    best.map(|(v, _)| v)
}

fn snap_to_surface_vertex(
    surface: &Multipatch,
    candidate: &Point3d,
    tolerance: f64,
    use_source_zs: bool,
) -> SnapResult {
    let Some(vertex) = nearest_surface_vertex(surface, candidate, tolerance) else {
        return SnapResult::NotSnapped;
    };
    let point = if use_source_zs {
        vertex.with_z(candidate.z)
    } else {
        vertex
    };
    SnapResult::Snapped {
        point,
        distance: vertex.distance_3d(candidate),
    }
}

/// Facet segments within `tolerance` (3D) of a point.
fn facet_hits(surface: &Multipatch, point: &Point3d, tolerance: f64) -> Vec<FacetHit> {
    let mut hits = Vec::new();
    for (ring_index, ring) in surface.rings.iter().enumerate() {
        for seg in ring.segments() {
            let (closest, _) = seg.closest_point_2d(point);
            let distance = closest.distance_3d(point);
            if distance > tolerance {
                continue;
            }
            let end_distance = closest
                .distance_3d(&seg.from)
                .min(closest.distance_3d(&seg.to));
            hits.push(FacetHit {
                ring: ring_index,
                distance,
                end_distance,
            });
        }
    }
    hits
}
