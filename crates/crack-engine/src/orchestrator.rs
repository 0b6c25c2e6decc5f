//! Driving the pairwise cracking work across a selection of features.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crack_core::{CrackError, CrackPointCalculator, ToleranceModel};
use crack_types::{CrackingOptions, ErrorPolicy, FeatureRef, TargetFeatureSelection};
use geom_kernel::{Envelope, Geometry, Multipatch, Polyline, SpatialResolution};
use tracing::{debug, info};

use crate::error::EngineError;
use crate::materialize::{self, MaterializeOptions, MaterializeStats};
use crate::vertex_info::FeatureVertexInfo;
use crate::weed;

/// Cooperative cancellation flag, polled between feature pairs. Work already
/// accumulated for completed pairs stays in place, so a cancelled operation
/// is resumable per feature but not atomic across the batch.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

/// Runs the cracking passes for a selection of features and merges the
/// results into one [`FeatureVertexInfo`] per feature.
///
/// Single-threaded by design: the calculator's registry is mutated across
/// calls and its cross-call consistency requires strict ordering.
pub struct CrackOrchestrator {
    options: CrackingOptions,
    calculator: CrackPointCalculator,
    cancellation: CancellationToken,
    /// Z budget for moving existing vertices at materialization.
    pub max_existing_z_update: Option<f64>,
}

impl CrackOrchestrator {
    pub fn new(options: CrackingOptions, resolution: SpatialResolution) -> Self {
        let tolerance = ToleranceModel::from_options(&options, resolution);
        Self {
            calculator: CrackPointCalculator::new(tolerance),
            options,
            cancellation: CancellationToken::new(),
            max_existing_z_update: None,
        }
    }

    pub fn with_perimeter(mut self, perimeter: Envelope) -> Self {
        self.calculator.tolerance_mut().perimeter = Some(perimeter);
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    /// Install a transformation applied to every intersection target before
    /// intersecting, e.g. vertex extraction or boundary-only reduction for
    /// chopping tools.
    pub fn set_target_transform(&mut self, transform: crack_core::TargetTransform) {
        self.calculator.set_target_transform(transform);
    }

    pub fn calculator(&self) -> &CrackPointCalculator {
        &self.calculator
    }

    /// Failures recorded under the continue-on-error policy.
    pub fn failed_operations(&self) -> &[(FeatureRef, String)] {
        self.calculator.failed_operations()
    }

    /// Run the target-intersection, self-intersection and multipatch passes
    /// for every feature of the selection.
    ///
    /// With [`TargetFeatureSelection::SelectedFeatures`] the selection itself
    /// is the target pool; otherwise `targets` holds the visible neighbors
    /// (already filtered to the same class for
    /// [`TargetFeatureSelection::SameClass`] callers that can, the class
    /// filter is applied here regardless).
    pub fn crack_features(
        &mut self,
        selection: &[(FeatureRef, Geometry)],
        targets: &[(FeatureRef, Geometry)],
    ) -> Result<Vec<FeatureVertexInfo>, EngineError> {
        let target_pool: &[(FeatureRef, Geometry)] =
            match self.options.target_feature_selection {
                TargetFeatureSelection::SelectedFeatures => selection,
                _ => targets,
            };

        let mut infos = Vec::with_capacity(selection.len());
        let mut cancelled = false;
        for (feature, geometry) in selection {
            if cancelled {
                break;
            }
            if !feature.geometry_class.is_crackable() {
                debug!(%feature, "not a crackable geometry class, skipped");
                continue;
            }
            let mut info = FeatureVertexInfo::new(feature.clone());
            info.perimeter = self.calculator.tolerance().perimeter;
            info.snap_tolerance = self.calculator.tolerance().snap_tolerance;
            info.minimum_segment_length = self.calculator.tolerance().minimum_segment_length;

            match geometry {
                Geometry::Multipatch(patch) => {
                    if self.cancellation.is_cancelled() {
                        cancelled = true;
                    } else {
                        self.multipatch_pass(feature, patch, &mut info)?;
                    }
                }
                _ => {
                    for (target_ref, target_geometry) in target_pool {
                        if self.cancellation.is_cancelled() {
                            cancelled = true;
                            break;
                        }
                        if feature.same_feature(target_ref) {
                            continue;
                        }
                        if self.options.target_feature_selection
                            == TargetFeatureSelection::SameClass
                            && feature.class_id != target_ref.class_id
                        {
                            continue;
                        }
                        self.crack_pair(feature, geometry, target_geometry, &mut info)?;
                    }
                    if !cancelled {
                        self.add_self_intersections(feature, geometry, &mut info)?;
                    }
                }
            }
            infos.push(info);
        }
        if cancelled {
            info!("cracking cancelled, returning results accumulated so far");
        }
        Ok(infos)
    }

    /// One source/target pair of the target-intersection pass.
    fn crack_pair(
        &mut self,
        feature: &FeatureRef,
        geometry: &Geometry,
        target_geometry: &Geometry,
        info: &mut FeatureVertexInfo,
    ) -> Result<(), EngineError> {
        let prefilter_tolerance = self.prefilter_tolerance();
        if cannot_intersect(
            geometry.envelope(),
            target_geometry.envelope(),
            prefilter_tolerance,
        ) {
            debug!(%feature, "envelopes disjoint, pair skipped");
            return Ok(());
        }
        let source = info.working_boundary(geometry);
        match self.calculator.compute_crack_points(&source, target_geometry) {
            Ok(points) => {
                info.add_intersection_points(
                    points
                        .iter()
                        .filter(|p| p.is_insertable())
                        .map(|p| p.location),
                );
                info.add_crack_points(points);
                Ok(())
            }
            Err(e) => self.handle_failure(feature, e),
        }
    }

    /// Self-intersection pass: explode the boundary into independent
    /// single-part curves, intersect every pair, then run the candidate
    /// pipeline once against the whole boundary.
    pub fn add_self_intersections(
        &mut self,
        feature: &FeatureRef,
        geometry: &Geometry,
        info: &mut FeatureVertexInfo,
    ) -> Result<(), EngineError> {
        let boundary = info.working_boundary(geometry);
        let parts: Vec<Polyline> = boundary
            .exploded()
            .into_iter()
            .filter(|p| !p.is_empty())
            .collect();
        if parts.len() < 2 {
            return Ok(());
        }
        let prefilter_tolerance = self.prefilter_tolerance();
        let mut candidates = Vec::new();
        for i in 0..parts.len() {
            for j in (i + 1)..parts.len() {
                if cannot_intersect(
                    parts[i].envelope(),
                    parts[j].envelope(),
                    prefilter_tolerance,
                ) {
                    continue;
                }
                match self.calculator.intersection_candidates(&parts[i], &parts[j]) {
                    Ok(points) => candidates.extend(points),
                    Err(e) => {
                        self.handle_failure(feature, e)?;
                    }
                }
            }
        }
        if candidates.is_empty() {
            return Ok(());
        }
        let points = self
            .calculator
            .evaluate_candidates(&boundary, &candidates, Some(&boundary));
        info.add_intersection_points(
            points
                .iter()
                .filter(|p| p.is_insertable())
                .map(|p| p.location),
        );
        info.add_crack_points(points);
        Ok(())
    }

    /// Multipatch pass: intersect every facet pair, cluster spatially, then
    /// evaluate against the whole surface.
    fn multipatch_pass(
        &mut self,
        feature: &FeatureRef,
        patch: &Multipatch,
        info: &mut FeatureVertexInfo,
    ) -> Result<(), EngineError> {
        let parts: Vec<Polyline> = patch
            .rings
            .iter()
            .map(|r| Polyline::single(r.to_closed_path()))
            .collect();
        let prefilter_tolerance = self.prefilter_tolerance();
        let mut candidates = Vec::new();
        for i in 0..parts.len() {
            for j in (i + 1)..parts.len() {
                if cannot_intersect(
                    parts[i].envelope(),
                    parts[j].envelope(),
                    prefilter_tolerance,
                ) {
                    continue;
                }
                match self.calculator.intersection_candidates(&parts[i], &parts[j]) {
                    Ok(points) => candidates.extend(points),
                    Err(e) => {
                        self.handle_failure(feature, e)?;
                    }
                }
            }
        }
        if candidates.is_empty() {
            return Ok(());
        }
        let clusters = self.calculator.cluster_candidates_3d(&candidates);
        let points = self.calculator.compute_crack_points_3d(patch, &clusters);
        info.add_intersection_points(
            points
                .iter()
                .filter(|p| p.is_insertable())
                .map(|p| p.location),
        );
        info.add_crack_points(points);
        Ok(())
    }

    /// Apply a feature's accumulated crack points and deletions.
    pub fn materialize(
        &self,
        info: &FeatureVertexInfo,
        geometry: &mut Geometry,
    ) -> Result<MaterializeStats, EngineError> {
        let options = MaterializeOptions {
            snap_tolerance: self.prefilter_tolerance(),
            max_existing_z_update: self.max_existing_z_update,
            coplanarity_tolerance: self.options.coplanarity_tolerance,
            minimum_segment_length: self.calculator.tolerance().minimum_segment_length,
        };
        materialize::apply(
            geometry,
            &info.get_crack_points(None),
            &info.get_points_to_delete(None),
            &options,
        )
    }

    /// Mark redundant vertices of the feature for deletion, protecting the
    /// computed intersection points.
    pub fn add_weed_points(
        &self,
        info: &mut FeatureVertexInfo,
        geometry: &Geometry,
        weed_tolerance: f64,
    ) -> usize {
        let boundary = geometry.boundary_polyline();
        let protected = info.intersection_points().to_vec();
        let points = weed::weed_points(
            &boundary,
            weed_tolerance,
            self.options.in_3d,
            &protected,
            self.prefilter_tolerance(),
        );
        let count = points.len();
        info.add_points_to_delete(points);
        count
    }

    fn prefilter_tolerance(&self) -> f64 {
        self.calculator
            .tolerance()
            .snap_tolerance
            .unwrap_or_else(|| self.calculator.tolerance().native_intersection_tolerance())
    }

    fn handle_failure(&mut self, feature: &FeatureRef, error: CrackError) -> Result<(), EngineError> {
        match self.options.error_policy {
            ErrorPolicy::ContinueOnError => {
                self.calculator.record_failure(feature, error.to_string());
                Ok(())
            }
            ErrorPolicy::AbortOnFirstError => Err(error.into()),
        }
    }
}

/// Cheap envelope pre-filter before any exact intersection.
fn cannot_intersect(a: Option<Envelope>, b: Option<Envelope>, tolerance: f64) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a.disjoint(&b, tolerance),
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crack_types::GeometryClass;
    use geom_kernel::{Path, Point3d};

    fn feature(class_id: u32) -> FeatureRef {
        FeatureRef::new(class_id, GeometryClass::Polyline)
    }

    fn line(points: Vec<Point3d>) -> Geometry {
        Geometry::Polyline(Polyline::single(Path::new(points)))
    }

    fn options(snap: f64) -> CrackingOptions {
        CrackingOptions {
            snap_tolerance: snap,
            ..Default::default()
        }
    }

    #[test]
    fn test_crossing_pair_produces_crack_points_for_both() {
        let a = (
            feature(1),
            line(vec![Point3d::new_2d(0.0, 0.0), Point3d::new_2d(10.0, 0.0)]),
        );
        let b = (
            feature(1),
            line(vec![Point3d::new_2d(5.0, -5.0), Point3d::new_2d(5.0, 5.0)]),
        );
        let mut orchestrator =
            CrackOrchestrator::new(options(0.1), SpatialResolution::new(1e-4, 1e-4));
        let selection = vec![a, b];
        let infos = orchestrator.crack_features(&selection, &selection).unwrap();
        assert_eq!(infos.len(), 2);
        for info in &infos {
            assert_eq!(info.get_crack_points(None).len(), 1);
            assert!(info.get_crack_points(None)[0]
                .location
                .equal_2d(&Point3d::new_2d(5.0, 0.0), 1e-3));
        }
    }

    #[test]
    fn test_disjoint_features_skipped() {
        let a = (
            feature(1),
            line(vec![Point3d::new_2d(0.0, 0.0), Point3d::new_2d(10.0, 0.0)]),
        );
        let b = (
            feature(1),
            line(vec![
                Point3d::new_2d(1000.0, 1000.0),
                Point3d::new_2d(1010.0, 1000.0),
            ]),
        );
        let mut orchestrator =
            CrackOrchestrator::new(options(0.1), SpatialResolution::new(1e-4, 1e-4));
        let selection = vec![a, b];
        let infos = orchestrator.crack_features(&selection, &selection).unwrap();
        assert!(infos.iter().all(|i| i.get_crack_points(None).is_empty()));
    }

    #[test]
    fn test_same_class_filter() {
        let a = (
            feature(1),
            line(vec![Point3d::new_2d(0.0, 0.0), Point3d::new_2d(10.0, 0.0)]),
        );
        let b = (
            feature(2),
            line(vec![Point3d::new_2d(5.0, -5.0), Point3d::new_2d(5.0, 5.0)]),
        );
        let mut opts = options(0.1);
        opts.target_feature_selection = TargetFeatureSelection::SameClass;
        let mut orchestrator =
            CrackOrchestrator::new(opts, SpatialResolution::new(1e-4, 1e-4));
        let selection = vec![a];
        let targets = vec![b];
        let infos = orchestrator.crack_features(&selection, &targets).unwrap();
        assert!(infos[0].get_crack_points(None).is_empty());
    }

    #[test]
    fn test_cancellation_stops_early() {
        let a = (
            feature(1),
            line(vec![Point3d::new_2d(0.0, 0.0), Point3d::new_2d(10.0, 0.0)]),
        );
        let b = (
            feature(1),
            line(vec![Point3d::new_2d(5.0, -5.0), Point3d::new_2d(5.0, 5.0)]),
        );
        let mut orchestrator =
            CrackOrchestrator::new(options(0.1), SpatialResolution::new(1e-4, 1e-4));
        orchestrator.cancellation_token().cancel();
        let selection = vec![a, b];
        let infos = orchestrator.crack_features(&selection, &selection).unwrap();
        assert!(infos
            .iter()
            .all(|info| info.get_crack_points(None).is_empty()));
    }

    #[test]
    fn test_target_transform_reduces_target() {
        // The installed transform keeps only the target's first path, so the
        // crossing at x = 7 disappears.
        let source = (
            feature(1),
            line(vec![Point3d::new_2d(0.0, 0.0), Point3d::new_2d(10.0, 0.0)]),
        );
        let target = (
            feature(1),
            Geometry::Polyline(Polyline::new(vec![
                Path::new(vec![Point3d::new_2d(3.0, -5.0), Point3d::new_2d(3.0, 5.0)]),
                Path::new(vec![Point3d::new_2d(7.0, -5.0), Point3d::new_2d(7.0, 5.0)]),
            ])),
        );
        let mut orchestrator =
            CrackOrchestrator::new(options(0.1), SpatialResolution::new(1e-4, 1e-4));
        orchestrator.set_target_transform(Box::new(|geometry| match geometry {
            Geometry::Polyline(polyline) => Some(Geometry::Polyline(Polyline::single(
                polyline.paths[0].clone(),
            ))),
            _ => None,
        }));
        let selection = vec![source];
        let targets = vec![target];
        let infos = orchestrator.crack_features(&selection, &targets).unwrap();
        let points = infos[0].get_crack_points(None);
        assert_eq!(points.len(), 1);
        assert!(points[0]
            .location
            .equal_2d(&Point3d::new_2d(3.0, 0.0), 1e-3));
    }

    #[test]
    fn test_self_intersection_of_crossing_paths() {
        let geometry = Geometry::Polyline(Polyline::new(vec![
            Path::new(vec![Point3d::new_2d(0.0, 0.0), Point3d::new_2d(10.0, 0.0)]),
            Path::new(vec![Point3d::new_2d(5.0, -5.0), Point3d::new_2d(5.0, 5.0)]),
        ]));
        let mut orchestrator =
            CrackOrchestrator::new(options(0.1), SpatialResolution::new(1e-4, 1e-4));
        let selection = vec![(feature(1), geometry)];
        let infos = orchestrator.crack_features(&selection, &[]).unwrap();
        assert_eq!(infos[0].get_crack_points(None).len(), 1);
    }
}
