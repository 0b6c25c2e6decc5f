use serde::{Deserialize, Serialize};

use crate::envelope::Envelope;
use crate::errors::KernelError;
use crate::point::Point3d;
use crate::segment::Segment;

/// Kind of a segment in a path. Curves are kept only so they can be excluded
/// from vertex-level comparisons; all kernel math treats paths as linear.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SegmentKind {
    Line,
    /// Circular/elliptic arc or Bezier carried through from the data source.
    Curve,
}

/// An open (or explicitly closed) sequence of vertices. Segment `i` connects
/// vertex `i` to vertex `i + 1`; a closed path repeats its first vertex at
/// the end.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Path {
    pub points: Vec<Point3d>,
    /// One entry per segment; all `Line` unless the source carried curves.
    pub kinds: Vec<SegmentKind>,
}

impl Path {
    pub fn new(points: Vec<Point3d>) -> Self {
        let segment_count = points.len().saturating_sub(1);
        Self {
            points,
            kinds: vec![SegmentKind::Line; segment_count],
        }
    }

    pub fn with_kinds(points: Vec<Point3d>, kinds: Vec<SegmentKind>) -> Self {
        debug_assert_eq!(kinds.len(), points.len().saturating_sub(1));
        Self { points, kinds }
    }

    pub fn segment_count(&self) -> usize {
        self.points.len().saturating_sub(1)
    }

    pub fn segment(&self, index: usize) -> Result<Segment, KernelError> {
        if index >= self.segment_count() {
            return Err(KernelError::SegmentIndexOutOfRange {
                index,
                count: self.segment_count(),
            });
        }
        Ok(Segment::new(self.points[index], self.points[index + 1]))
    }

    pub fn segments(&self) -> impl Iterator<Item = Segment> + '_ {
        self.points.windows(2).map(|w| Segment::new(w[0], w[1]))
    }

    pub fn has_curves(&self) -> bool {
        self.kinds.iter().any(|k| *k == SegmentKind::Curve)
    }

    /// First and last vertex coincide exactly (polygon boundary path).
    pub fn is_closed(&self) -> bool {
        match (self.points.first(), self.points.last()) {
            (Some(first), Some(last)) => {
                self.points.len() > 2 && first.x == last.x && first.y == last.y
            }
            _ => false,
        }
    }

    pub fn start_point(&self) -> Option<&Point3d> {
        self.points.first()
    }

    pub fn end_point(&self) -> Option<&Point3d> {
        self.points.last()
    }

    pub fn length_2d(&self) -> f64 {
        self.segments().map(|s| s.length_2d()).sum()
    }

    pub fn longest_segment_2d(&self) -> f64 {
        self.segments().map(|s| s.length_2d()).fold(0.0, f64::max)
    }

    pub fn envelope(&self) -> Option<Envelope> {
        Envelope::of_points(&self.points)
    }

    /// Split the segment `segment_index` by inserting `point` after its
    /// from-vertex.
    pub fn insert_point(
        &mut self,
        segment_index: usize,
        point: Point3d,
    ) -> Result<(), KernelError> {
        if segment_index >= self.segment_count() {
            return Err(KernelError::SegmentIndexOutOfRange {
                index: segment_index,
                count: self.segment_count(),
            });
        }
        self.points.insert(segment_index + 1, point);
        let kind = self.kinds[segment_index];
        self.kinds.insert(segment_index + 1, kind);
        Ok(())
    }

    pub fn update_point(&mut self, index: usize, point: Point3d) -> Result<(), KernelError> {
        if index >= self.points.len() {
            return Err(KernelError::VertexIndexOutOfRange {
                index,
                count: self.points.len(),
            });
        }
        self.points[index] = point;
        // Keep closure intact when an end vertex of a closed path moves.
        if self.is_closed_index_pair(index) {
            let other = if index == 0 { self.points.len() - 1 } else { 0 };
            self.points[other] = point;
        }
        Ok(())
    }

    fn is_closed_index_pair(&self, index: usize) -> bool {
        (index == 0 || index == self.points.len() - 1) && self.is_closed()
    }

    pub fn remove_point(&mut self, index: usize) -> Result<(), KernelError> {
        if index >= self.points.len() {
            return Err(KernelError::VertexIndexOutOfRange {
                index,
                count: self.points.len(),
            });
        }
        self.points.remove(index);
        if !self.kinds.is_empty() {
            self.kinds.remove(index.min(self.kinds.len() - 1));
        }
        Ok(())
    }
}

/// A multi-part line geometry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Polyline {
    pub paths: Vec<Path>,
}

impl Polyline {
    pub fn new(paths: Vec<Path>) -> Self {
        Self { paths }
    }

    pub fn single(path: Path) -> Self {
        Self { paths: vec![path] }
    }

    pub fn is_empty(&self) -> bool {
        self.paths.iter().all(|p| p.points.len() < 2)
    }

    pub fn points(&self) -> impl Iterator<Item = &Point3d> {
        self.paths.iter().flat_map(|p| p.points.iter())
    }

    pub fn point_count(&self) -> usize {
        self.paths.iter().map(|p| p.points.len()).sum()
    }

    pub fn envelope(&self) -> Option<Envelope> {
        Envelope::of_points(self.points())
    }

    pub fn longest_segment_2d(&self) -> f64 {
        self.paths
            .iter()
            .map(|p| p.longest_segment_2d())
            .fold(0.0, f64::max)
    }

    /// Each path as an independent single-part polyline.
    pub fn exploded(&self) -> Vec<Polyline> {
        self.paths.iter().map(|p| Polyline::single(p.clone())).collect()
    }
}

/// A closed facet or polygon ring. The closing vertex is implicit: segment
/// `n - 1` connects the last vertex back to the first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ring {
    pub points: Vec<Point3d>,
}

impl Ring {
    pub fn new(points: Vec<Point3d>) -> Self {
        Self { points }
    }

    pub fn segment_count(&self) -> usize {
        if self.points.len() < 3 {
            0
        } else {
            self.points.len()
        }
    }

    pub fn segment(&self, index: usize) -> Result<Segment, KernelError> {
        let n = self.segment_count();
        if index >= n {
            return Err(KernelError::SegmentIndexOutOfRange { index, count: n });
        }
        Ok(Segment::new(
            self.points[index],
            self.points[(index + 1) % self.points.len()],
        ))
    }

    pub fn segments(&self) -> impl Iterator<Item = Segment> + '_ {
        (0..self.segment_count()).map(move |i| self.segment(i).unwrap_or(Segment::new(
            self.points[i],
            self.points[i],
        )))
    }

    /// The ring boundary as a closed path (first vertex repeated at the end).
    pub fn to_closed_path(&self) -> Path {
        let mut points = self.points.clone();
        if let Some(first) = points.first().copied() {
            points.push(first);
        }
        Path::new(points)
    }

    pub fn envelope(&self) -> Option<Envelope> {
        Envelope::of_points(&self.points)
    }

    /// Insert `point` into segment `segment_index`, after its from-vertex.
    pub fn insert_point(
        &mut self,
        segment_index: usize,
        point: Point3d,
    ) -> Result<(), KernelError> {
        let n = self.segment_count();
        if segment_index >= n {
            return Err(KernelError::SegmentIndexOutOfRange {
                index: segment_index,
                count: n,
            });
        }
        self.points.insert(segment_index + 1, point);
        Ok(())
    }

    pub fn update_point(&mut self, index: usize, point: Point3d) -> Result<(), KernelError> {
        if index >= self.points.len() {
            return Err(KernelError::VertexIndexOutOfRange {
                index,
                count: self.points.len(),
            });
        }
        self.points[index] = point;
        Ok(())
    }

    pub fn remove_point(&mut self, index: usize) -> Result<(), KernelError> {
        if index >= self.points.len() {
            return Err(KernelError::VertexIndexOutOfRange {
                index,
                count: self.points.len(),
            });
        }
        self.points.remove(index);
        Ok(())
    }
}

/// An area geometry bounded by one or more rings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Polygon {
    pub rings: Vec<Ring>,
}

/// A 3D surface made of planar facets (rings). Facets may share XY locations
/// at different Z levels.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Multipatch {
    pub rings: Vec<Ring>,
}

/// Any geometry the cracking core can operate on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Geometry {
    Polyline(Polyline),
    Polygon(Polygon),
    Multipatch(Multipatch),
}

impl Geometry {
    pub fn envelope(&self) -> Option<Envelope> {
        match self {
            Geometry::Polyline(p) => p.envelope(),
            Geometry::Polygon(p) => {
                Envelope::of_points(p.rings.iter().flat_map(|r| r.points.iter()))
            }
            Geometry::Multipatch(m) => {
                Envelope::of_points(m.rings.iter().flat_map(|r| r.points.iter()))
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Geometry::Polyline(p) => p.is_empty(),
            Geometry::Polygon(p) => p.rings.iter().all(|r| r.points.len() < 3),
            Geometry::Multipatch(m) => m.rings.iter().all(|r| r.points.len() < 3),
        }
    }

    /// All vertices of the geometry.
    pub fn points(&self) -> Vec<Point3d> {
        match self {
            Geometry::Polyline(p) => p.points().copied().collect(),
            Geometry::Polygon(p) => p.rings.iter().flat_map(|r| r.points.iter()).copied().collect(),
            Geometry::Multipatch(m) => {
                m.rings.iter().flat_map(|r| r.points.iter()).copied().collect()
            }
        }
    }

    /// The boundary as a multi-part polyline; every ring becomes its own
    /// closed path ("polyline salad" for surfaces).
    pub fn boundary_polyline(&self) -> Polyline {
        match self {
            Geometry::Polyline(p) => p.clone(),
            Geometry::Polygon(p) => {
                Polyline::new(p.rings.iter().map(|r| r.to_closed_path()).collect())
            }
            Geometry::Multipatch(m) => {
                Polyline::new(m.rings.iter().map(|r| r.to_closed_path()).collect())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_path() -> Path {
        Path::new(vec![
            Point3d::new_2d(0.0, 0.0),
            Point3d::new_2d(10.0, 0.0),
            Point3d::new_2d(10.0, 10.0),
        ])
    }

    #[test]
    fn test_path_insert_point_splits_segment() {
        let mut path = open_path();
        path.insert_point(0, Point3d::new_2d(5.0, 0.0)).unwrap();
        assert_eq!(path.points.len(), 4);
        assert!((path.points[1].x - 5.0).abs() < 1e-12);
        assert_eq!(path.kinds.len(), 3);
    }

    #[test]
    fn test_closed_path_update_keeps_closure() {
        let mut path = Path::new(vec![
            Point3d::new_2d(0.0, 0.0),
            Point3d::new_2d(10.0, 0.0),
            Point3d::new_2d(5.0, 5.0),
            Point3d::new_2d(0.0, 0.0),
        ]);
        assert!(path.is_closed());
        path.update_point(0, Point3d::new_2d(1.0, 1.0)).unwrap();
        assert_eq!(path.points[0].x, path.points[3].x);
        assert_eq!(path.points[0].y, path.points[3].y);
    }

    #[test]
    fn test_remove_point_drops_one_merged_kind() {
        // Removing vertex 1 merges segments 0 (Curve) and 1 (Line); one of
        // those two kinds goes, and the trailing segment keeps its own.
        let mut path = Path::with_kinds(
            vec![
                Point3d::new_2d(0.0, 0.0),
                Point3d::new_2d(5.0, 0.0),
                Point3d::new_2d(10.0, 0.0),
                Point3d::new_2d(10.0, 5.0),
            ],
            vec![SegmentKind::Curve, SegmentKind::Line, SegmentKind::Line],
        );
        path.remove_point(1).unwrap();
        assert_eq!(path.kinds.len(), path.points.len() - 1);
        assert_eq!(path.kinds, vec![SegmentKind::Curve, SegmentKind::Line]);
    }

    #[test]
    fn test_remove_end_points_drop_end_kinds() {
        let mut path = Path::with_kinds(
            vec![
                Point3d::new_2d(0.0, 0.0),
                Point3d::new_2d(5.0, 0.0),
                Point3d::new_2d(10.0, 0.0),
            ],
            vec![SegmentKind::Curve, SegmentKind::Line],
        );
        path.remove_point(2).unwrap();
        assert_eq!(path.kinds, vec![SegmentKind::Curve]);
        path.remove_point(0).unwrap();
        assert!(path.kinds.is_empty());
    }

    #[test]
    fn test_ring_segments_wrap_around() {
        let ring = Ring::new(vec![
            Point3d::new_2d(0.0, 0.0),
            Point3d::new_2d(10.0, 0.0),
            Point3d::new_2d(5.0, 5.0),
        ]);
        assert_eq!(ring.segment_count(), 3);
        let last = ring.segment(2).unwrap();
        assert!((last.to.x - 0.0).abs() < 1e-12);
    }

    #[test]
    fn test_boundary_polyline_of_multipatch_is_salad() {
        let patch = Multipatch {
            rings: vec![
                Ring::new(vec![
                    Point3d::new(0.0, 0.0, 1.0),
                    Point3d::new(1.0, 0.0, 1.0),
                    Point3d::new(0.0, 1.0, 1.0),
                ]),
                Ring::new(vec![
                    Point3d::new(0.0, 0.0, 2.0),
                    Point3d::new(1.0, 0.0, 2.0),
                    Point3d::new(0.0, 1.0, 2.0),
                ]),
            ],
        };
        let salad = Geometry::Multipatch(patch).boundary_polyline();
        assert_eq!(salad.paths.len(), 2);
        assert!(salad.paths.iter().all(|p| p.is_closed()));
    }
}
