//! Session-scoped registry of already placed crack points.
//!
//! Repeated pairwise computations must make the same choice for the same
//! location (in particular the same Z). The registry is a tolerance-bucketed
//! grid rebuilt per session; it is owned by the calculator and never shared
//! across sessions.

use std::collections::HashMap;

use geom_kernel::Point3d;

use crate::classify::PointSpace;

/// Grid-bucketed point index with cell size tied to the lookup tolerance.
#[derive(Debug, Clone)]
pub struct CrackPointRegistry {
    cell_size: f64,
    cells: HashMap<(i64, i64), Vec<Point3d>>,
    len: usize,
}

impl CrackPointRegistry {
    /// `cell_size` should be at least the largest tolerance later passed to
    /// [`CrackPointRegistry::find_within`], so a lookup touches at most the
    /// 3x3 cell neighborhood.
    pub fn new(cell_size: f64) -> Self {
        Self {
            cell_size: cell_size.max(1e-9),
            cells: HashMap::new(),
            len: 0,
        }
    }

    fn cell_of(&self, point: &Point3d) -> (i64, i64) {
        (
            (point.x / self.cell_size).floor() as i64,
            (point.y / self.cell_size).floor() as i64,
        )
    }

    pub fn insert(&mut self, point: Point3d) {
        let cell = self.cell_of(&point);
        self.cells.entry(cell).or_default().push(point);
        self.len += 1;
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Nearest registered point within `tolerance` of `point`, measured in
    /// the given space.
    pub fn find_within<S: PointSpace>(
        &self,
        point: &Point3d,
        tolerance: f64,
        space: &S,
    ) -> Option<Point3d> {
        let reach = (tolerance / self.cell_size).ceil() as i64;
        let (cx, cy) = self.cell_of(point);
        let mut best: Option<(Point3d, f64)> = None;
        for dx in -reach..=reach {
            for dy in -reach..=reach {
                let Some(points) = self.cells.get(&(cx + dx, cy + dy)) else {
                    continue;
                };
                for candidate in points {
                    let d = space.distance(candidate, point);
                    if d <= tolerance && best.map_or(true, |(_, bd)| d < bd) {
                        best = Some((*candidate, d));
                    }
                }
            }
        }
        best.map(|(p, _)| p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::{Planar, Spatial};

    #[test]
    fn test_find_within_across_cell_boundary() {
        let mut registry = CrackPointRegistry::new(0.5);
        registry.insert(Point3d::new_2d(0.49, 0.0));
        let hit = registry.find_within(&Point3d::new_2d(0.51, 0.0), 0.1, &Planar);
        assert!(hit.is_some());
    }

    #[test]
    fn test_nearest_wins() {
        let mut registry = CrackPointRegistry::new(1.0);
        registry.insert(Point3d::new_2d(0.0, 0.0));
        registry.insert(Point3d::new_2d(0.3, 0.0));
        let hit = registry
            .find_within(&Point3d::new_2d(0.25, 0.0), 0.5, &Planar)
            .unwrap();
        assert!((hit.x - 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_spatial_lookup_separates_z_levels() {
        let mut registry = CrackPointRegistry::new(1.0);
        registry.insert(Point3d::new(5.0, 5.0, 100.0));
        assert!(registry
            .find_within(&Point3d::new(5.0, 5.0, 130.0), 0.5, &Spatial)
            .is_none());
        assert!(registry
            .find_within(&Point3d::new(5.0, 5.0, 100.1), 0.5, &Spatial)
            .is_some());
    }

    #[test]
    fn test_out_of_tolerance_is_none() {
        let mut registry = CrackPointRegistry::new(0.5);
        registry.insert(Point3d::new_2d(0.0, 0.0));
        assert!(registry
            .find_within(&Point3d::new_2d(2.0, 0.0), 0.5, &Planar)
            .is_none());
    }
}
