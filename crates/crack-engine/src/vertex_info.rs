//! Per-feature accumulation of crack points and related point sets.

use crack_core::CrackPoint;
use crack_types::FeatureRef;
use geom_kernel::{Envelope, Geometry, Point3d, Polyline};

/// Collects the results of many pairwise calculations for one feature under
/// edit: crack points from every neighbor and from the feature itself,
/// vertices marked for deletion by weeding, and protected intersection
/// points. Created at the start of a cracking operation, mutated additively,
/// read once at materialization, then discarded.
#[derive(Debug, Clone)]
pub struct FeatureVertexInfo {
    pub feature: FeatureRef,
    pub perimeter: Option<Envelope>,
    pub snap_tolerance: Option<f64>,
    pub minimum_segment_length: Option<f64>,
    crack_points: Vec<CrackPoint>,
    points_to_delete: Vec<Point3d>,
    intersection_points: Vec<Point3d>,
    /// Locations where a crack was needed but rejected.
    non_crackable_points: Vec<Point3d>,
    /// Working boundary reduced to the area of interest, built on demand.
    clipped_boundary: Option<Polyline>,
}

impl FeatureVertexInfo {
    pub fn new(feature: FeatureRef) -> Self {
        Self {
            feature,
            perimeter: None,
            snap_tolerance: None,
            minimum_segment_length: None,
            crack_points: Vec::new(),
            points_to_delete: Vec::new(),
            intersection_points: Vec::new(),
            non_crackable_points: Vec::new(),
            clipped_boundary: None,
        }
    }

    pub fn add_crack_points(&mut self, points: impl IntoIterator<Item = CrackPoint>) {
        let merge_tolerance = self.snap_tolerance.unwrap_or(1e-9);
        for point in points {
            // The first decision for a location wins; later pairwise results
            // for the same spot are restatements.
            let known = self
                .crack_points
                .iter()
                .any(|existing| existing.location.equal_2d(&point.location, merge_tolerance));
            if known {
                continue;
            }
            if !point.is_insertable() {
                self.non_crackable_points.push(point.location);
            }
            self.crack_points.push(point);
        }
    }

    pub fn add_points_to_delete(&mut self, points: impl IntoIterator<Item = Point3d>) {
        self.points_to_delete.extend(points);
    }

    pub fn add_intersection_points(&mut self, points: impl IntoIterator<Item = Point3d>) {
        self.intersection_points.extend(points);
    }

    pub fn crack_points(&self) -> &[CrackPoint] {
        &self.crack_points
    }

    pub fn intersection_points(&self) -> &[Point3d] {
        &self.intersection_points
    }

    pub fn non_crackable_points(&self) -> &[Point3d] {
        &self.non_crackable_points
    }

    /// Insertable crack points, optionally restricted to an area.
    pub fn get_crack_points(&self, area: Option<&Envelope>) -> Vec<CrackPoint> {
        self.crack_points
            .iter()
            .filter(|p| p.is_insertable())
            .filter(|p| area.map_or(true, |a| a.contains(&p.location)))
            .copied()
            .collect()
    }

    /// Vertices marked for deletion, optionally restricted to an area.
    pub fn get_points_to_delete(&self, area: Option<&Envelope>) -> Vec<Point3d> {
        self.points_to_delete
            .iter()
            .filter(|p| area.map_or(true, |a| a.contains(p)))
            .copied()
            .collect()
    }

    /// The feature boundary reduced to the perimeter of interest, cached
    /// after the first call. The clip window is expanded so segments that
    /// merely reach into the perimeter stay comparable: by the snap
    /// tolerance, the minimum segment length and the longest segment of the
    /// boundary, whichever is largest.
    pub fn working_boundary(&mut self, geometry: &Geometry) -> Polyline {
        if let Some(clipped) = &self.clipped_boundary {
            return clipped.clone();
        }
        let boundary = geometry.boundary_polyline();
        let clipped = match self.perimeter {
            None => boundary,
            Some(perimeter) => {
                let expansion = self
                    .snap_tolerance
                    .unwrap_or(0.0)
                    .max(self.minimum_segment_length.unwrap_or(0.0))
                    .max(boundary.longest_segment_2d());
                let window = perimeter.expanded(expansion);
                let paths = boundary
                    .paths
                    .into_iter()
                    .filter(|path| {
                        path.envelope()
                            .map_or(false, |env| !env.disjoint(&window, 0.0))
                    })
                    .collect();
                Polyline::new(paths)
            }
        };
        self.clipped_boundary = Some(clipped.clone());
        clipped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crack_types::GeometryClass;
    use geom_kernel::Path;

    fn info() -> FeatureVertexInfo {
        let mut info = FeatureVertexInfo::new(FeatureRef::new(1, GeometryClass::Polyline));
        info.snap_tolerance = Some(0.1);
        info
    }

    #[test]
    fn test_add_crack_points_merges_restatements() {
        let mut info = info();
        info.add_crack_points([CrackPoint::new(Point3d::new_2d(5.0, 0.0))]);
        info.add_crack_points([CrackPoint::new(Point3d::new_2d(5.05, 0.0))]);
        assert_eq!(info.crack_points().len(), 1);
    }

    #[test]
    fn test_violating_points_tracked_but_not_returned() {
        let mut info = info();
        info.add_crack_points([
            CrackPoint::new(Point3d::new_2d(5.0, 0.0)),
            CrackPoint::violating(Point3d::new_2d(9.0, 0.0)),
        ]);
        assert_eq!(info.get_crack_points(None).len(), 1);
        assert_eq!(info.non_crackable_points().len(), 1);
    }

    #[test]
    fn test_area_filter() {
        let mut info = info();
        info.add_crack_points([
            CrackPoint::new(Point3d::new_2d(5.0, 0.0)),
            CrackPoint::new(Point3d::new_2d(50.0, 0.0)),
        ]);
        let area = Envelope::new(0.0, -1.0, 10.0, 1.0);
        assert_eq!(info.get_crack_points(Some(&area)).len(), 1);
    }

    #[test]
    fn test_working_boundary_drops_far_paths() {
        let mut info = info();
        info.perimeter = Some(Envelope::new(0.0, 0.0, 10.0, 10.0));
        let geometry = Geometry::Polyline(Polyline::new(vec![
            Path::new(vec![Point3d::new_2d(1.0, 1.0), Point3d::new_2d(2.0, 2.0)]),
            Path::new(vec![
                Point3d::new_2d(1000.0, 1000.0),
                Point3d::new_2d(1001.0, 1001.0),
            ]),
        ]));
        let working = info.working_boundary(&geometry);
        assert_eq!(working.paths.len(), 1);
    }
}
