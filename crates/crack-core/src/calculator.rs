//! Turning raw intersection candidates into accepted or rejected crack
//! points for one source geometry.

use crack_types::{FeatureRef, IntersectionPointOptions};
use geom_kernel::{cluster, intersect, query, Geometry, KernelError, Point3d, Polyline};
use tracing::{debug, warn};

use crate::classify::{Planar, PointClassifier, PointSpace, Spatial};
use crate::crack_point::CrackPoint;
use crate::error::CrackError;
use crate::registry::CrackPointRegistry;
use crate::snap::{self, SnapResult};
use crate::tolerance::ToleranceModel;

/// How candidates on existing vertices are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalculatorMode {
    /// Reject candidates already represented by a source vertex.
    Standard,
    /// Accept candidates on existing vertices; used by cutting/chopping
    /// tools, which need a chop point even where a vertex already exists.
    /// Only the end points of the source curve are rejected.
    ChopAtExistingVertices,
}

/// Optional transformation of the intersection target before intersecting,
/// e.g. vertex extraction or boundary-only reduction.
pub type TargetTransform = Box<dyn Fn(&Geometry) -> Option<Geometry>>;

/// Computes crack points for one source geometry against one target (or
/// against itself). One instance serves one session: its registry keeps
/// repeated nearby decisions mutually consistent and must not be shared
/// across sessions.
pub struct CrackPointCalculator {
    tolerance: ToleranceModel,
    classifier: PointClassifier,
    mode: CalculatorMode,
    intersection_point_options: IntersectionPointOptions,
    target_transform: Option<TargetTransform>,
    registry: CrackPointRegistry,
    failed_operations: Vec<(FeatureRef, String)>,
}

impl CrackPointCalculator {
    pub fn new(tolerance: ToleranceModel) -> Self {
        let cell = tolerance
            .snap_tolerance
            .unwrap_or_else(|| tolerance.native_intersection_tolerance());
        Self {
            classifier: PointClassifier::from_model(&tolerance),
            registry: CrackPointRegistry::new(cell),
            tolerance,
            mode: CalculatorMode::Standard,
            intersection_point_options:
                IntersectionPointOptions::IncludeLinearIntersectionEndpoints,
            target_transform: None,
            failed_operations: Vec::new(),
        }
    }

    /// Calculator for cutting/chopping tools.
    pub fn for_chopping(tolerance: ToleranceModel) -> Self {
        let mut calculator = Self::new(tolerance);
        calculator.mode = CalculatorMode::ChopAtExistingVertices;
        calculator
    }

    pub fn with_intersection_point_options(mut self, options: IntersectionPointOptions) -> Self {
        self.intersection_point_options = options;
        self
    }

    pub fn set_target_transform(&mut self, transform: TargetTransform) {
        self.target_transform = Some(transform);
    }

    pub fn tolerance(&self) -> &ToleranceModel {
        &self.tolerance
    }

    pub(crate) fn classifier(&self) -> &PointClassifier {
        &self.classifier
    }

    pub(crate) fn snap_registry_3d(&self, candidate: &Point3d, tolerance: f64) -> SnapResult {
        snap::snap_to_registry(candidate, &self.registry, tolerance, &self.classifier, &Spatial)
    }

    pub(crate) fn register_3d(&mut self, point: Point3d) {
        self.registry.insert(point);
    }

    pub fn tolerance_mut(&mut self) -> &mut ToleranceModel {
        &mut self.tolerance
    }

    /// Re-derive the classifier after a tolerance change.
    pub fn refresh_classifier(&mut self) {
        self.classifier = PointClassifier::from_model(&self.tolerance);
    }

    pub fn record_failure(&mut self, feature: &FeatureRef, message: impl Into<String>) {
        let message = message.into();
        warn!(%feature, %message, "cracking failed for feature");
        self.failed_operations.push((feature.clone(), message));
    }

    pub fn failed_operations(&self) -> &[(FeatureRef, String)] {
        &self.failed_operations
    }

    pub fn take_failed_operations(&mut self) -> Vec<(FeatureRef, String)> {
        std::mem::take(&mut self.failed_operations)
    }

    /// Full 2D computation: intersect source and target, then evaluate the
    /// candidates.
    pub fn compute_crack_points(
        &mut self,
        source: &Polyline,
        target: &Geometry,
    ) -> Result<Vec<CrackPoint>, CrackError> {
        if source.is_empty() {
            return Err(CrackError::EmptySource);
        }
        let transformed = self.target_transform.as_ref().and_then(|t| t(target));
        let target_line = transformed
            .as_ref()
            .unwrap_or(target)
            .boundary_polyline();
        if target_line.is_empty() {
            return Err(CrackError::EmptyTarget);
        }
        let candidates = self.intersection_candidates(source, &target_line)?;
        Ok(self.evaluate_candidates(source, &candidates, Some(&target_line)))
    }

    /// Raw candidates from the dual-tolerance intersection strategy.
    ///
    /// A precise pass at the data's native tolerance keeps exact locations; a
    /// second pass at the (larger) snap tolerance recovers near-misses. A
    /// loose-pass point only counts as an extra when no precise point lies
    /// within five snap tolerances of it, and precise points on the loose
    /// pass's linear overlaps are dropped as redundant with the shared edge.
    pub fn intersection_candidates(
        &self,
        source: &Polyline,
        target: &Polyline,
    ) -> Result<Vec<Point3d>, CrackError> {
        let native = self.tolerance.native_intersection_tolerance();
        let precise = intersect::intersect_polylines(source, target, native)?;

        let Some(snap_tolerance) = self.tolerance.snap_tolerance else {
            let overlap_points = self.overlap_points(&precise);
            let mut points = precise.points;
            points.extend(overlap_points);
            return Ok(points);
        };

        let loose = match intersect::intersect_polylines(source, target, snap_tolerance) {
            Ok(run) => run,
            Err(KernelError::ClusterToleranceTooLarge { tolerance, extent }) => {
                // The only tolerated automatic retry: fall back to the native
                // tolerance once; a second failure propagates.
                warn!(
                    tolerance,
                    extent, "snap tolerance too large for extent, retrying at native tolerance"
                );
                intersect::intersect_polylines(source, target, native)?
            }
            Err(e) => return Err(e.into()),
        };

        let mut points: Vec<Point3d> = precise
            .points
            .into_iter()
            .filter(|p| {
                !loose
                    .linear_overlaps
                    .iter()
                    .any(|o| o.contains_2d(p, snap_tolerance))
            })
            .collect();

        for extra in &loose.points {
            let duplicates_precise = points
                .iter()
                .any(|p| p.distance_2d(extra) <= 5.0 * snap_tolerance);
            if !duplicates_precise {
                points.push(*extra);
            }
        }
        points.extend(self.overlap_points(&loose));

        debug!(candidates = points.len(), "dual-tolerance intersection candidates");
        Ok(points)
    }

    fn overlap_points(&self, run: &intersect::IntersectionRun) -> Vec<Point3d> {
        match self.intersection_point_options {
            IntersectionPointOptions::IncludeLinearIntersectionEndpoints => {
                run.overlap_end_points()
            }
            IntersectionPointOptions::IncludeLinearIntersectionAllPoints => {
                run.overlap_all_points()
            }
        }
    }

    /// The per-candidate pipeline: perimeter filter, existing-vertex test,
    /// snap, minimum-segment-length validation, registration.
    pub fn evaluate_candidates(
        &mut self,
        source: &Polyline,
        candidates: &[Point3d],
        snap_target: Option<&Polyline>,
    ) -> Vec<CrackPoint> {
        let xy_tolerance = self.tolerance.xy_equality_tolerance();
        let snap_tolerance = self.tolerance.snap_tolerance.unwrap_or(xy_tolerance);
        let native = self.tolerance.native_intersection_tolerance();
        let search_tolerance = self.tolerance.search_tolerance(native, native);

        // Nearby raw candidates describe one crack.
        let candidates = cluster::cluster_points(candidates, snap_tolerance, None);

        let mut accepted = Vec::new();
        for candidate in &candidates {
            if !self.tolerance.within_perimeter(candidate) {
                continue;
            }

            match self.mode {
                CalculatorMode::ChopAtExistingVertices => {
                    if query::is_path_endpoint(source, candidate, xy_tolerance) {
                        continue;
                    }
                }
                CalculatorMode::Standard => {
                    if self.matches_existing_source_vertex(source, candidate, search_tolerance) {
                        continue;
                    }
                }
            }

            let target_verdict = snap_target.and_then(|target| {
                query::nearest_vertex_within(target, candidate, snap_tolerance)
                    .map(|(_, vertex, _)| self.classifier.is_perfectly_matching(candidate, &vertex))
            });

            let registry_hit = snap::snap_to_registry(
                candidate,
                &self.registry,
                snap_tolerance,
                &self.classifier,
                &Planar,
            );
            let target_hit = match (snap_target, self.tolerance.snap_tolerance) {
                (Some(target), Some(tolerance)) => snap::snap_to_target_vertex(
                    candidate,
                    target,
                    tolerance,
                    self.tolerance.use_source_zs,
                ),
                _ => SnapResult::NotSnapped,
            };
            let chosen = snap::resolve(candidate, registry_hit, target_hit);

            if accepted
                .iter()
                .any(|cp: &CrackPoint| Planar.distance(&cp.location, &chosen) <= snap_tolerance)
            {
                continue;
            }

            let violates = self.violates_minimum_segment_length(source, &chosen, search_tolerance);

            let mut crack_point = if violates {
                CrackPoint::violating(chosen)
            } else {
                CrackPoint::new(chosen)
            };
            if let Some(verdict) = target_verdict {
                crack_point.target_vertex_different_within_tolerance =
                    verdict.different_within_tolerance;
                crack_point.target_vertex_only_different_in_z = verdict.only_different_in_z();
            }

            if crack_point.is_insertable() {
                self.registry.insert(chosen);
            }
            accepted.push(crack_point);
        }
        accepted
    }

    /// A candidate already represented by a source vertex needs no crack,
    /// unless another segment passes through the same XY without terminating
    /// there (stacked surfaces) and still needs one.
    fn matches_existing_source_vertex(
        &self,
        source: &Polyline,
        candidate: &Point3d,
        search_tolerance: f64,
    ) -> bool {
        let Some((_, vertex, _)) = query::nearest_vertex_within(source, candidate, search_tolerance)
        else {
            return false;
        };
        let verdict = self.classifier.is_perfectly_matching(candidate, &vertex);
        if !verdict.matches {
            return false;
        }
        if self.tolerance.use_source_zs && !self.tolerance.in_3d {
            if has_uncracked_extra_segment(source, candidate, search_tolerance) {
                debug!("vertex match overridden by uncracked extra segment");
                return false;
            }
        }
        true
    }

    /// Minimum-segment-length validation against the source curve; only
    /// enforced when a minimum is configured.
    ///
    /// Two or more matched segment interiors of the same path make the
    /// insertion ambiguous and reject the point. Counting per path keeps
    /// crossings between different parts of one feature insertable; a path
    /// crossing itself stays rejected. One matched interior violates when the
    /// nearer segment end is closer than the minimum. A point near an
    /// existing end vertex never violates, it simply snaps there.
    fn violates_minimum_segment_length(
        &self,
        source: &Polyline,
        point: &Point3d,
        search_tolerance: f64,
    ) -> bool {
        let Some(minimum) = self.tolerance.minimum_segment_length else {
            return false;
        };
        let hits = query::segments_near(source, point, search_tolerance);
        let interior: Vec<&query::SegmentHit> = hits
            .iter()
            .filter(|hit| hit.distance_to_nearer_end(source) > search_tolerance)
            .collect();

        for path_index in 0..source.paths.len() {
            let in_path = interior.iter().filter(|hit| hit.path == path_index).count();
            if in_path >= 2 {
                debug!(
                    x = point.x,
                    y = point.y,
                    path = path_index,
                    segments = in_path,
                    "ambiguous insertion point, several interiors of one path match"
                );
                return true;
            }
        }
        interior
            .iter()
            .any(|hit| hit.distance_to_nearer_end(source) < minimum)
    }
}

/// A segment passing near the XY without terminating there; occurs in
/// stacked surfaces where the same XY recurs at different Z.
fn has_uncracked_extra_segment(source: &Polyline, point: &Point3d, tolerance: f64) -> bool {
    query::segments_near(source, point, tolerance)
        .iter()
        .any(|hit| hit.distance_to_nearer_end(source) > tolerance)
}
