//! Applying accepted crack points and deletions to geometries.
//!
//! Existing vertices within snap tolerance are moved rather than duplicated;
//! new vertices are spliced into the matched segment. Deletions run after
//! insertions so moved vertices are never re-found at stale locations.

use crack_core::{coplanar, CrackPoint};
use geom_kernel::{
    Geometry, KernelError, Multipatch, Path, Plane3d, Point3d, Ring, Segment,
};
use tracing::{debug, warn};

use crate::error::EngineError;

/// Settings for one materialization run.
#[derive(Debug, Clone)]
pub struct MaterializeOptions {
    pub snap_tolerance: f64,
    /// An existing vertex's Z is only updated when |ΔZ| stays below this
    /// budget; XY is always snapped.
    pub max_existing_z_update: Option<f64>,
    pub coplanarity_tolerance: f64,
    /// Re-validated per facet right before splicing into a multipatch.
    pub minimum_segment_length: Option<f64>,
}

impl MaterializeOptions {
    pub fn new(snap_tolerance: f64) -> Self {
        Self {
            snap_tolerance,
            max_existing_z_update: None,
            coplanarity_tolerance: 0.01,
            minimum_segment_length: None,
        }
    }
}

/// Number of vertices moved, inserted and deleted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MaterializeStats {
    pub moved: usize,
    pub inserted: usize,
    pub deleted: usize,
}

/// One editable part of a geometry; paths and rings materialize the same way.
trait Part {
    fn vertices(&self) -> &[Point3d];
    fn part_segment_count(&self) -> usize;
    fn part_segment(&self, index: usize) -> Option<Segment>;
    fn move_vertex(&mut self, index: usize, point: Point3d) -> Result<(), KernelError>;
    fn splice(&mut self, segment_index: usize, point: Point3d) -> Result<(), KernelError>;
    fn delete_vertex(&mut self, index: usize) -> Result<(), KernelError>;
    /// End vertices of open parts must never be deleted.
    fn deletable(&self, index: usize) -> bool;
}

impl Part for Path {
    fn vertices(&self) -> &[Point3d] {
        &self.points
    }

    fn part_segment_count(&self) -> usize {
        self.segment_count()
    }

    fn part_segment(&self, index: usize) -> Option<Segment> {
        self.segment(index).ok()
    }

    fn move_vertex(&mut self, index: usize, point: Point3d) -> Result<(), KernelError> {
        self.update_point(index, point)
    }

    fn splice(&mut self, segment_index: usize, point: Point3d) -> Result<(), KernelError> {
        self.insert_point(segment_index, point)
    }

    fn delete_vertex(&mut self, index: usize) -> Result<(), KernelError> {
        self.remove_point(index)
    }

    fn deletable(&self, index: usize) -> bool {
        self.is_closed() || (index > 0 && index + 1 < self.points.len())
    }
}

impl Part for Ring {
    fn vertices(&self) -> &[Point3d] {
        &self.points
    }

    fn part_segment_count(&self) -> usize {
        self.segment_count()
    }

    fn part_segment(&self, index: usize) -> Option<Segment> {
        self.segment(index).ok()
    }

    fn move_vertex(&mut self, index: usize, point: Point3d) -> Result<(), KernelError> {
        self.update_point(index, point)
    }

    fn splice(&mut self, segment_index: usize, point: Point3d) -> Result<(), KernelError> {
        self.insert_point(segment_index, point)
    }

    fn delete_vertex(&mut self, index: usize) -> Result<(), KernelError> {
        self.remove_point(index)
    }

    fn deletable(&self, _index: usize) -> bool {
        self.points.len() > 3
    }
}

/// Apply crack points and deletions to any geometry.
pub fn apply(
    geometry: &mut Geometry,
    crack_points: &[CrackPoint],
    points_to_delete: &[Point3d],
    options: &MaterializeOptions,
) -> Result<MaterializeStats, EngineError> {
    match geometry {
        Geometry::Polyline(polyline) => {
            apply_to_parts(&mut polyline.paths, crack_points, points_to_delete, options)
        }
        Geometry::Polygon(polygon) => {
            apply_to_parts(&mut polygon.rings, crack_points, points_to_delete, options)
        }
        Geometry::Multipatch(patch) => {
            apply_to_multipatch(patch, crack_points, points_to_delete, options)
        }
    }
}

fn apply_to_parts<P: Part>(
    parts: &mut [P],
    crack_points: &[CrackPoint],
    points_to_delete: &[Point3d],
    options: &MaterializeOptions,
) -> Result<MaterializeStats, EngineError> {
    let mut stats = MaterializeStats::default();
    for point in crack_points.iter().filter(|p| p.is_insertable()) {
        if let Some((part, index)) =
            nearest_vertex(parts, &point.location, options.snap_tolerance)
        {
            let moved = moved_vertex(parts[part].vertices()[index], point.location, options);
            parts[part].move_vertex(index, moved)?;
            stats.moved += 1;
            continue;
        }
        let hits = segment_hits(parts, &point.location, options.snap_tolerance);
        let Some(best) = hits.first() else {
            return Err(EngineError::VertexNotFound {
                x: point.location.x,
                y: point.location.y,
            });
        };
        if hits
            .iter()
            .skip(1)
            .any(|h| h.part == best.part && h.segment.abs_diff(best.segment) == 1)
        {
            // Splicing one location into two adjacent segments would cut the
            // corner back into a sliver.
            warn!(
                x = point.location.x,
                y = point.location.y,
                "crack point matches adjacent segments, inserting into nearest only"
            );
        }
        let resolved = resolve_z(point.location, &best.closest);
        parts[best.part].splice(best.segment, resolved)?;
        stats.inserted += 1;
    }

    for delete in points_to_delete {
        match nearest_vertex(parts, delete, options.snap_tolerance) {
            Some((part, index)) if parts[part].deletable(index) => {
                parts[part].delete_vertex(index)?;
                stats.deleted += 1;
            }
            Some(_) => debug!(x = delete.x, y = delete.y, "vertex not deletable, skipped"),
            None => debug!(x = delete.x, y = delete.y, "vertex to delete not found, skipped"),
        }
    }
    Ok(stats)
}

/// Multipatch materialization: every touched facet gets the vertex, with the
/// Z reconciled against the planes of the facets that must stay coplanar
/// through it.
fn apply_to_multipatch(
    patch: &mut Multipatch,
    crack_points: &[CrackPoint],
    points_to_delete: &[Point3d],
    options: &MaterializeOptions,
) -> Result<MaterializeStats, EngineError> {
    let mut stats = MaterializeStats::default();
    for point in crack_points.iter().filter(|p| p.is_insertable()) {
        let touched = touched_rings(patch, &point.location, options.snap_tolerance);
        if touched.is_empty() {
            return Err(EngineError::VertexNotFound {
                x: point.location.x,
                y: point.location.y,
            });
        }

        let planes: Vec<Plane3d> = touched
            .iter()
            .filter_map(|&r| Plane3d::fit(&patch.rings[r].points))
            .filter(|plane| {
                plane.distance_abs(&point.location) <= options.coplanarity_tolerance
            })
            .collect();
        let location = coplanar::reconcile(&point.location, &planes, options.coplanarity_tolerance);

        for &ring_index in &touched {
            let ring = &mut patch.rings[ring_index];
            if let Some(index) = ring_vertex_within(ring, &location, options.snap_tolerance) {
                let moved = moved_vertex(ring.points[index], location, options);
                ring.update_point(index, moved)?;
                stats.moved += 1;
                continue;
            }
            // Segment-level re-validation against the updated vertex set.
            let Some((segment_index, closest, end_distance)) =
                nearest_ring_segment(ring, &location, options.snap_tolerance)
            else {
                continue;
            };
            if options
                .minimum_segment_length
                .is_some_and(|min| end_distance < min)
            {
                debug!(
                    ring = ring_index,
                    "crack point too close to facet vertex after updates, skipped"
                );
                continue;
            }
            let resolved = resolve_z(location, &closest);
            ring.insert_point(segment_index, resolved)?;
            stats.inserted += 1;
        }
    }

    for delete in points_to_delete {
        for ring in &mut patch.rings {
            if let Some(index) = ring_vertex_within(ring, delete, options.snap_tolerance) {
                if ring.points.len() > 3 {
                    ring.remove_point(index)?;
                    stats.deleted += 1;
                }
            }
        }
    }
    Ok(stats)
}

/// A vertex moved onto a crack point: XY always snaps, Z only moves within
/// the update budget.
fn moved_vertex(existing: Point3d, target: Point3d, options: &MaterializeOptions) -> Point3d {
    let z = if !target.has_z() {
        existing.z
    } else if !existing.has_z() {
        target.z
    } else {
        match options.max_existing_z_update {
            Some(budget) if (target.z - existing.z).abs() > budget => existing.z,
            _ => target.z,
        }
    };
    Point3d::new(target.x, target.y, z)
}

/// An inserted point without Z inherits the segment's interpolated Z.
fn resolve_z(point: Point3d, on_segment: &Point3d) -> Point3d {
    if point.has_z() || !on_segment.has_z() {
        point
    } else {
        point.with_z(on_segment.z)
    }
}

fn nearest_vertex<P: Part>(
    parts: &[P],
    point: &Point3d,
    tolerance: f64,
) -> Option<(usize, usize)> {
    let mut best: Option<(usize, usize, f64)> = None;
    for (pi, part) in parts.iter().enumerate() {
        for (vi, vertex) in part.vertices().iter().enumerate() {
            let d = vertex.distance_2d(point);
            if d <= tolerance && best.map_or(true, |(_, _, bd)| d < bd) {
                best = Some((pi, vi, d));
            }
        }
    }
    best.map(|(p, v, _)| (p, v))
}

struct PartSegmentHit {
    part: usize,
    segment: usize,
    closest: Point3d,
    distance: f64,
}

fn segment_hits<P: Part>(parts: &[P], point: &Point3d, tolerance: f64) -> Vec<PartSegmentHit> {
    let mut hits = Vec::new();
    for (pi, part) in parts.iter().enumerate() {
        for si in 0..part.part_segment_count() {
            let Some(seg) = part.part_segment(si) else {
                continue;
            };
            let (closest, _) = seg.closest_point_2d(point);
            let distance = closest.distance_2d(point);
            if distance <= tolerance {
                hits.push(PartSegmentHit {
                    part: pi,
                    segment: si,
                    closest,
                    distance,
                });
            }
        }
    }
    hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    hits
}

fn ring_vertex_within(ring: &Ring, point: &Point3d, tolerance: f64) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, vertex) in ring.points.iter().enumerate() {
        let d = vertex.distance_3d(point);
        if d <= tolerance && best.map_or(true, |(_, bd)| d < bd) {
            best = Some((i, d));
        }
    }
    best.map(|(i, _)| i)
}

fn nearest_ring_segment(
    ring: &Ring,
    point: &Point3d,
    tolerance: f64,
) -> Option<(usize, Point3d, f64)> {
    let mut best: Option<(usize, Point3d, f64, f64)> = None;
    for i in 0..ring.segment_count() {
        let Ok(seg) = ring.segment(i) else { continue };
        let (closest, _) = seg.closest_point_2d(point);
        let distance = closest.distance_3d(point);
        if distance <= tolerance && best.map_or(true, |(_, _, _, bd)| distance < bd) {
            let end_distance = closest
                .distance_3d(&seg.from)
                .min(closest.distance_3d(&seg.to));
            best = Some((i, closest, end_distance, distance));
        }
    }
    best.map(|(i, closest, end_distance, _)| (i, closest, end_distance))
}

fn touched_rings(patch: &Multipatch, point: &Point3d, tolerance: f64) -> Vec<usize> {
    (0..patch.rings.len())
        .filter(|&i| {
            let ring = &patch.rings[i];
            ring_vertex_within(ring, point, tolerance).is_some()
                || nearest_ring_segment(ring, point, tolerance).is_some()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use geom_kernel::Polyline;

    fn options(snap: f64) -> MaterializeOptions {
        MaterializeOptions::new(snap)
    }

    fn source() -> Geometry {
        Geometry::Polyline(Polyline::single(Path::new(vec![
            Point3d::new_2d(0.0, 0.0),
            Point3d::new_2d(10.0, 0.0),
        ])))
    }

    #[test]
    fn test_insert_into_segment() {
        let mut geometry = source();
        let stats = apply(
            &mut geometry,
            &[CrackPoint::new(Point3d::new_2d(5.0, 0.0))],
            &[],
            &options(0.1),
        )
        .unwrap();
        assert_eq!(stats.inserted, 1);
        let Geometry::Polyline(line) = &geometry else {
            unreachable!()
        };
        assert_eq!(line.paths[0].points.len(), 3);
        assert!((line.paths[0].points[1].x - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_existing_vertex_moved_not_duplicated() {
        let mut geometry = Geometry::Polyline(Polyline::single(Path::new(vec![
            Point3d::new_2d(0.0, 0.0),
            Point3d::new_2d(5.02, 0.0),
            Point3d::new_2d(10.0, 0.0),
        ])));
        let stats = apply(
            &mut geometry,
            &[CrackPoint::new(Point3d::new_2d(5.0, 0.0))],
            &[],
            &options(0.1),
        )
        .unwrap();
        assert_eq!(stats.moved, 1);
        assert_eq!(stats.inserted, 0);
        let Geometry::Polyline(line) = &geometry else {
            unreachable!()
        };
        assert_eq!(line.paths[0].points.len(), 3);
        assert!((line.paths[0].points[1].x - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_z_update_budget() {
        let mut geometry = Geometry::Polyline(Polyline::single(Path::new(vec![
            Point3d::new(0.0, 0.0, 0.0),
            Point3d::new(5.02, 0.0, 100.0),
            Point3d::new(10.0, 0.0, 0.0),
        ])));
        let mut opts = options(0.1);
        opts.max_existing_z_update = Some(1.0);
        apply(
            &mut geometry,
            &[CrackPoint::new(Point3d::new(5.0, 0.0, 150.0))],
            &[],
            &opts,
        )
        .unwrap();
        let Geometry::Polyline(line) = &geometry else {
            unreachable!()
        };
        // XY snapped, Z left alone because the change exceeds the budget.
        assert!((line.paths[0].points[1].x - 5.0).abs() < 1e-12);
        assert!((line.paths[0].points[1].z - 100.0).abs() < 1e-12);
    }

    #[test]
    fn test_violating_point_never_inserted() {
        let mut geometry = source();
        let stats = apply(
            &mut geometry,
            &[CrackPoint::violating(Point3d::new_2d(1.0, 0.0))],
            &[],
            &options(0.1),
        )
        .unwrap();
        assert_eq!(stats, MaterializeStats::default());
        let Geometry::Polyline(line) = &geometry else {
            unreachable!()
        };
        assert_eq!(line.paths[0].points.len(), 2);
    }

    #[test]
    fn test_unlocatable_point_is_fatal() {
        let mut geometry = source();
        let result = apply(
            &mut geometry,
            &[CrackPoint::new(Point3d::new_2d(500.0, 500.0))],
            &[],
            &options(0.1),
        );
        assert!(matches!(result, Err(EngineError::VertexNotFound { .. })));
    }

    #[test]
    fn test_deletion_runs_after_insertion() {
        let mut geometry = Geometry::Polyline(Polyline::single(Path::new(vec![
            Point3d::new_2d(0.0, 0.0),
            Point3d::new_2d(4.0, 0.0),
            Point3d::new_2d(10.0, 0.0),
        ])));
        let stats = apply(
            &mut geometry,
            &[CrackPoint::new(Point3d::new_2d(7.0, 0.0))],
            &[Point3d::new_2d(4.0, 0.0)],
            &options(0.1),
        )
        .unwrap();
        assert_eq!(stats.inserted, 1);
        assert_eq!(stats.deleted, 1);
        let Geometry::Polyline(line) = &geometry else {
            unreachable!()
        };
        let xs: Vec<f64> = line.paths[0].points.iter().map(|p| p.x).collect();
        assert_eq!(xs, vec![0.0, 7.0, 10.0]);
    }

    #[test]
    fn test_open_path_endpoints_never_deleted() {
        let mut geometry = source();
        let stats = apply(
            &mut geometry,
            &[],
            &[Point3d::new_2d(0.0, 0.0)],
            &options(0.1),
        )
        .unwrap();
        assert_eq!(stats.deleted, 0);
    }

    #[test]
    fn test_multipatch_insert_into_touched_facets() {
        let mut geometry = Geometry::Multipatch(Multipatch {
            rings: vec![
                Ring::new(vec![
                    Point3d::new(0.0, 0.0, 1.0),
                    Point3d::new(10.0, 0.0, 1.0),
                    Point3d::new(0.0, 10.0, 1.0),
                ]),
                Ring::new(vec![
                    Point3d::new(0.0, 0.0, 1.0),
                    Point3d::new(10.0, 0.0, 1.0),
                    Point3d::new(0.0, -10.0, 1.0),
                ]),
            ],
        });
        let stats = apply(
            &mut geometry,
            &[CrackPoint::new(Point3d::new(5.0, 0.0, 1.0))],
            &[],
            &options(0.1),
        )
        .unwrap();
        // The shared edge belongs to both facets; both get the vertex.
        assert_eq!(stats.inserted, 2);
        let Geometry::Multipatch(patch) = &geometry else {
            unreachable!()
        };
        assert_eq!(patch.rings[0].points.len(), 4);
        assert_eq!(patch.rings[1].points.len(), 4);
    }
}
