use serde::{Deserialize, Serialize};

use geom_kernel::Point3d;

/// A vertex to be inserted into a feature boundary. Immutable once created.
///
/// A crack point is materialized iff `violates_minimum_segment_length` is
/// false; violating points are kept for diagnostics only.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CrackPoint {
    pub location: Point3d,
    /// Inserting here would create a segment shorter than allowed, or the
    /// insertion site is ambiguous (several segment interiors match).
    pub violates_minimum_segment_length: bool,
    /// A target vertex exists at this XY whose Z alone differs.
    pub target_vertex_only_different_in_z: bool,
    /// A target vertex exists nearby that snapping should be pulled onto.
    pub target_vertex_different_within_tolerance: bool,
}

impl CrackPoint {
    pub fn new(location: Point3d) -> Self {
        Self {
            location,
            violates_minimum_segment_length: false,
            target_vertex_only_different_in_z: false,
            target_vertex_different_within_tolerance: false,
        }
    }

    pub fn violating(location: Point3d) -> Self {
        Self {
            violates_minimum_segment_length: true,
            ..Self::new(location)
        }
    }

    pub fn is_insertable(&self) -> bool {
        !self.violates_minimum_segment_length
    }
}
