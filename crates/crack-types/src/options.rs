use serde::{Deserialize, Serialize};

/// Which features are eligible as cracking targets for a selected feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TargetFeatureSelection {
    /// Only the other selected features; pairwise within the selection.
    SelectedFeatures,
    /// Visible/provided neighbor features of any class.
    VisibleFeatures,
    /// Neighbor features of the same feature class only.
    SameClass,
}

/// Which points of a linear (overlap) intersection are reported as candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum IntersectionPointOptions {
    /// Only the end points of shared linear stretches.
    IncludeLinearIntersectionEndpoints,
    /// End points plus every interior vertex of shared linear stretches.
    IncludeLinearIntersectionAllPoints,
}

/// How the orchestrator reacts when cracking a single feature pair fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ErrorPolicy {
    /// Record the failure per feature and keep processing the batch.
    ContinueOnError,
    /// Propagate the first failure and abort the whole operation.
    AbortOnFirstError,
}

/// Flat user-facing options for one cracking session.
///
/// Tolerances of `0.0` mean "not set"; the effective value then falls back to
/// the data tolerance of the geometry being processed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrackingOptions {
    /// Pull candidate points onto existing target vertices within this distance.
    pub snap_to_target_vertices: bool,
    pub snap_tolerance: f64,
    /// Reject candidates that would create a segment shorter than this.
    pub respect_minimum_segment_length: bool,
    pub minimum_segment_length: f64,
    /// Keep the source geometry's Z at inserted points instead of the target's.
    pub use_source_zs: bool,
    /// Crack segments at every Z level separately (surface mode).
    pub in_3d: bool,
    /// Do not snap two rings into coplanarity beyond this tolerance.
    pub coplanarity_tolerance: f64,
    pub target_feature_selection: TargetFeatureSelection,
    pub error_policy: ErrorPolicy,
}

impl Default for CrackingOptions {
    fn default() -> Self {
        Self {
            snap_to_target_vertices: true,
            snap_tolerance: 0.0,
            respect_minimum_segment_length: true,
            minimum_segment_length: 0.0,
            use_source_zs: false,
            in_3d: false,
            coplanarity_tolerance: 0.01,
            target_feature_selection: TargetFeatureSelection::VisibleFeatures,
            error_policy: ErrorPolicy::ContinueOnError,
        }
    }
}

impl CrackingOptions {
    /// The snap tolerance if snapping is enabled and a positive value is set.
    pub fn effective_snap_tolerance(&self) -> Option<f64> {
        if self.snap_to_target_vertices && self.snap_tolerance > 0.0 {
            Some(self.snap_tolerance)
        } else {
            None
        }
    }

    /// The minimum segment length if enabled and a positive value is set.
    pub fn effective_minimum_segment_length(&self) -> Option<f64> {
        if self.respect_minimum_segment_length && self.minimum_segment_length > 0.0 {
            Some(self.minimum_segment_length)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_tolerances_mean_unset() {
        let options = CrackingOptions::default();
        assert_eq!(options.effective_snap_tolerance(), None);
        assert_eq!(options.effective_minimum_segment_length(), None);
    }

    #[test]
    fn test_disabled_flags_override_values() {
        let options = CrackingOptions {
            snap_to_target_vertices: false,
            snap_tolerance: 0.5,
            respect_minimum_segment_length: false,
            minimum_segment_length: 2.0,
            ..Default::default()
        };
        assert_eq!(options.effective_snap_tolerance(), None);
        assert_eq!(options.effective_minimum_segment_length(), None);
    }

    #[test]
    fn test_positive_tolerances_pass_through() {
        let options = CrackingOptions {
            snap_tolerance: 0.5,
            minimum_segment_length: 2.0,
            ..Default::default()
        };
        assert_eq!(options.effective_snap_tolerance(), Some(0.5));
        assert_eq!(options.effective_minimum_segment_length(), Some(2.0));
    }
}
