//! Point matching: is a candidate already represented by an existing vertex.

use geom_kernel::Point3d;

use crate::tolerance::ToleranceModel;

/// Verdict on two points expected to coincide.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchClassification {
    /// Coincide up to storage/rounding noise; nothing to do.
    pub matches: bool,
    /// Measurably different, but close enough that snapping should pull them
    /// into exact coincidence.
    pub different_within_tolerance: bool,
    /// Z values differ beyond the Z equality tolerance.
    pub different_in_z: bool,
}

impl MatchClassification {
    /// XY coincides; only the height is off.
    pub fn only_different_in_z(&self) -> bool {
        self.different_in_z && !self.different_within_tolerance
    }
}

/// Whether point comparisons run planar or include Z.
///
/// The 2D and 3D pipelines share one candidate policy; this seam is the only
/// place they diverge on what "the same location" means.
pub trait PointSpace {
    fn distance(&self, a: &Point3d, b: &Point3d) -> f64;
    fn compares_z(&self) -> bool;
}

/// XY-only comparisons; Z is payload, not identity.
#[derive(Debug, Clone, Copy, Default)]
pub struct Planar;

impl PointSpace for Planar {
    fn distance(&self, a: &Point3d, b: &Point3d) -> f64 {
        a.distance_2d(b)
    }

    fn compares_z(&self) -> bool {
        false
    }
}

/// Full 3D comparisons; the same XY at another height is another location.
#[derive(Debug, Clone, Copy, Default)]
pub struct Spatial;

impl PointSpace for Spatial {
    fn distance(&self, a: &Point3d, b: &Point3d) -> f64 {
        a.distance_3d(b)
    }

    fn compares_z(&self) -> bool {
        true
    }
}

/// Classifies candidate/vertex pairs under the session tolerances.
#[derive(Debug, Clone, Copy)]
pub struct PointClassifier {
    pub tolerance_xy: f64,
    pub tolerance_z: Option<f64>,
    /// Z band within which a real Z difference is still snappable.
    pub z_snap_band: Option<f64>,
}

impl PointClassifier {
    pub fn from_model(model: &ToleranceModel) -> Self {
        Self {
            tolerance_xy: model.xy_equality_tolerance(),
            tolerance_z: model.z_equality_tolerance(),
            z_snap_band: model.snap_tolerance,
        }
    }

    /// Compare two points expected to coincide.
    pub fn is_perfectly_matching(&self, p1: &Point3d, p2: &Point3d) -> MatchClassification {
        let dx = (p1.x - p2.x).abs();
        let dy = (p1.y - p2.y).abs();
        let mut different_within_tolerance = dx >= self.tolerance_xy || dy >= self.tolerance_xy;

        let mut different_in_z = false;
        if let Some(tolerance_z) = self.tolerance_z {
            if p1.has_z() && p2.has_z() {
                let dz = (p1.z - p2.z).abs();
                different_in_z = dz >= tolerance_z;
                // A Z difference that is real by resolution standards but
                // still closeable by snapping must be corrected, not ignored.
                if different_in_z && self.z_snap_band.is_some_and(|band| dz < band) {
                    different_within_tolerance = true;
                }
            }
        }

        MatchClassification {
            matches: !different_within_tolerance && !different_in_z,
            different_within_tolerance,
            different_in_z,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn classifier() -> PointClassifier {
        PointClassifier {
            tolerance_xy: 5e-7,
            tolerance_z: Some(5e-7),
            z_snap_band: Some(0.5),
        }
    }

    #[test]
    fn test_storage_noise_is_a_match() {
        let c = classifier();
        let verdict = c.is_perfectly_matching(
            &Point3d::new_2d(10.0, 0.0),
            &Point3d::new_2d(9.9999999, 0.0000001),
        );
        assert!(verdict.matches);
        assert!(!verdict.different_within_tolerance);
    }

    #[test]
    fn test_measurable_offset_is_different() {
        let c = classifier();
        let verdict =
            c.is_perfectly_matching(&Point3d::new_2d(10.0, 0.0), &Point3d::new_2d(10.001, 0.0));
        assert!(!verdict.matches);
        assert!(verdict.different_within_tolerance);
        assert!(!verdict.different_in_z);
    }

    #[test]
    fn test_snappable_z_difference_is_flagged_for_correction() {
        let c = classifier();
        let verdict = c.is_perfectly_matching(
            &Point3d::new(10.0, 0.0, 100.0),
            &Point3d::new(10.0, 0.0, 100.1),
        );
        assert!(verdict.different_in_z);
        assert!(verdict.different_within_tolerance);
        assert!(!verdict.matches);
    }

    #[test]
    fn test_large_z_difference_is_not_snappable() {
        let c = classifier();
        let verdict = c.is_perfectly_matching(
            &Point3d::new(10.0, 0.0, 100.0),
            &Point3d::new(10.0, 0.0, 130.0),
        );
        assert!(verdict.different_in_z);
        assert!(!verdict.different_within_tolerance);
        assert!(verdict.only_different_in_z());
    }

    #[test]
    fn test_missing_z_compares_planar() {
        let c = classifier();
        let verdict = c.is_perfectly_matching(
            &Point3d::new(10.0, 0.0, 100.0),
            &Point3d::new_2d(10.0, 0.0),
        );
        assert!(verdict.matches);
    }

    proptest! {
        #[test]
        fn prop_identical_points_always_match(
            x in -1e6..1e6f64,
            y in -1e6..1e6f64,
            z in -1e4..1e4f64,
        ) {
            let c = classifier();
            let p = Point3d::new(x, y, z);
            let verdict = c.is_perfectly_matching(&p, &p);
            prop_assert!(verdict.matches);
            prop_assert!(!verdict.different_in_z);
        }

        #[test]
        fn prop_verdict_is_symmetric(
            ax in -100.0..100.0f64, ay in -100.0..100.0f64,
            bx in -100.0..100.0f64, by in -100.0..100.0f64,
        ) {
            let c = classifier();
            let a = Point3d::new_2d(ax, ay);
            let b = Point3d::new_2d(bx, by);
            prop_assert_eq!(c.is_perfectly_matching(&a, &b), c.is_perfectly_matching(&b, &a));
        }
    }
}
