//! Linear geometry kernel for vertex-level editing operations.
//!
//! Provides the primitives the cracking core consumes: tolerance-aware
//! intersection, proximity queries against vertices and segment interiors,
//! point clustering, plane fitting/intersection and Douglas-Peucker
//! generalization. All curves are polylines; callers that carry true curve
//! segments mark them so they can be excluded from vertex comparisons.

pub mod cluster;
pub mod envelope;
pub mod errors;
pub mod generalize;
pub mod geometry;
pub mod intersect;
pub mod plane;
pub mod point;
pub mod query;
pub mod segment;
pub mod vector;

pub use envelope::Envelope;
pub use errors::KernelError;
pub use geometry::{Geometry, Multipatch, Path, Polygon, Polyline, Ring, SegmentKind};
pub use plane::{Line3d, Plane3d};
pub use point::Point3d;
pub use segment::Segment;
pub use vector::Vec3;

/// Intrinsic coordinate tolerance of the kernel. No derived tolerance may be
/// smaller than this; coordinates closer than this are indistinguishable.
pub const COORDINATE_TOLERANCE: f64 = 1e-9;

/// Storage resolution of a dataset. Coordinates are assumed snapped to a grid
/// of this cell size when persisted, so two stored values can legitimately
/// differ by up to one resolution step and still mean the same location.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SpatialResolution {
    pub xy: f64,
    /// None for 2D datasets.
    pub z: Option<f64>,
}

impl Default for SpatialResolution {
    fn default() -> Self {
        Self {
            xy: 1e-4,
            z: Some(1e-4),
        }
    }
}

impl SpatialResolution {
    pub fn xy_only(xy: f64) -> Self {
        Self { xy, z: None }
    }

    pub fn new(xy: f64, z: f64) -> Self {
        Self { xy, z: Some(z) }
    }

    /// The default data tolerance derived from the resolution (one order of
    /// magnitude above the grid, the usual convention for snapped storage).
    pub fn xy_tolerance(&self) -> f64 {
        (self.xy * 10.0).max(COORDINATE_TOLERANCE)
    }

    pub fn z_tolerance(&self) -> Option<f64> {
        self.z.map(|z| (z * 10.0).max(COORDINATE_TOLERANCE))
    }
}
