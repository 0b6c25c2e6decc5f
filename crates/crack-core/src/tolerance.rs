//! Derivation of equality and search tolerances for one cracking session.

use serde::{Deserialize, Serialize};

use crack_types::CrackingOptions;
use geom_kernel::{Envelope, SpatialResolution, COORDINATE_TOLERANCE};

/// A few ulps at the magnitude of `value`. Differences below this are
/// floating-point noise, not data.
pub fn significance_epsilon(value: f64) -> f64 {
    value.abs() * 4.0 * f64::EPSILON
}

/// Tolerance settings of one cracking session.
///
/// Constructed once from the options plus the data resolution of the feature
/// class being processed, then read-only; [`ToleranceModel::set_data_resolution`]
/// refreshes the resolution-derived values when the session moves to a
/// feature class with a different resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToleranceModel {
    pub snap_tolerance: Option<f64>,
    pub minimum_segment_length: Option<f64>,
    pub data_xy_resolution: Option<f64>,
    pub data_z_resolution: Option<f64>,
    /// Explicit overrides; when unset the equality tolerances derive from the
    /// data resolution.
    pub equality_tolerance_xy: Option<f64>,
    pub equality_tolerance_z: Option<f64>,
    pub use_source_zs: bool,
    pub in_3d: bool,
    /// Candidates outside this area are discarded.
    pub perimeter: Option<Envelope>,
    /// Largest coordinate magnitude of the data, for the significance epsilon.
    reference_coordinate: f64,
}

impl ToleranceModel {
    pub fn from_options(options: &CrackingOptions, resolution: SpatialResolution) -> Self {
        Self {
            snap_tolerance: options.effective_snap_tolerance(),
            minimum_segment_length: options.effective_minimum_segment_length(),
            data_xy_resolution: Some(resolution.xy),
            data_z_resolution: resolution.z,
            equality_tolerance_xy: None,
            equality_tolerance_z: None,
            use_source_zs: options.use_source_zs,
            in_3d: options.in_3d,
            perimeter: None,
            reference_coordinate: 0.0,
        }
    }

    /// Refresh the resolution-derived tolerances for another feature class.
    /// The envelope, when given, anchors the significance epsilon at the
    /// data's coordinate magnitude.
    pub fn set_data_resolution(
        &mut self,
        resolution: SpatialResolution,
        envelope: Option<&Envelope>,
    ) {
        self.data_xy_resolution = Some(resolution.xy);
        self.data_z_resolution = resolution.z;
        if let Some(envelope) = envelope {
            self.reference_coordinate = envelope
                .x_min
                .abs()
                .max(envelope.x_max.abs())
                .max(envelope.y_min.abs())
                .max(envelope.y_max.abs());
        }
    }

    pub fn with_perimeter(mut self, perimeter: Envelope) -> Self {
        self.perimeter = Some(perimeter);
        self
    }

    /// Effective XY equality tolerance: the explicit override, else half the
    /// data resolution minus the significance epsilon. Never negative, never
    /// below the kernel's intrinsic coordinate tolerance.
    pub fn xy_equality_tolerance(&self) -> f64 {
        match self.equality_tolerance_xy {
            Some(tolerance) => tolerance.max(COORDINATE_TOLERANCE),
            None => derive_equality_tolerance(
                self.data_xy_resolution.unwrap_or(COORDINATE_TOLERANCE),
                self.reference_coordinate,
            ),
        }
    }

    /// Effective Z equality tolerance, None for 2D data.
    pub fn z_equality_tolerance(&self) -> Option<f64> {
        match self.equality_tolerance_z {
            Some(tolerance) => Some(tolerance.max(COORDINATE_TOLERANCE)),
            None => self
                .data_z_resolution
                .map(|r| derive_equality_tolerance(r, self.reference_coordinate)),
        }
    }

    /// Tolerance of the precise intersection pass: the data tolerance of the
    /// stored coordinates, one order of magnitude above the resolution grid.
    pub fn native_intersection_tolerance(&self) -> f64 {
        self.data_xy_resolution
            .map(|r| (r * 10.0).max(COORDINATE_TOLERANCE))
            .unwrap_or(COORDINATE_TOLERANCE)
    }

    /// Search distance for matching a candidate to existing vertices and
    /// segment interiors.
    pub fn search_tolerance(&self, source_tolerance: f64, target_tolerance: f64) -> f64 {
        self.snap_tolerance
            .unwrap_or(0.0)
            .max(source_tolerance)
            .max(target_tolerance)
            .max(self.xy_equality_tolerance())
    }

    pub fn within_perimeter(&self, point: &geom_kernel::Point3d) -> bool {
        self.perimeter.map_or(true, |p| p.contains(point))
    }
}

fn derive_equality_tolerance(resolution: f64, reference_coordinate: f64) -> f64 {
    let tolerance = resolution / 2.0 - significance_epsilon(reference_coordinate);
    tolerance.max(0.0).max(COORDINATE_TOLERANCE)
}
