use serde::{Deserialize, Serialize};

use crate::point::Point3d;
use crate::vector::Vec3;

/// A plane in normal form `normal . p = offset`, with a unit normal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Plane3d {
    pub normal: Vec3,
    pub offset: f64,
}

impl Plane3d {
    /// Best-fit plane through a point set using Newell's method. Returns None
    /// for fewer than three points or a degenerate (collinear) set.
    pub fn fit(points: &[Point3d]) -> Option<Self> {
        if points.len() < 3 {
            return None;
        }
        let mut normal = Vec3::ZERO;
        let mut centroid = Vec3::ZERO;
        let n = points.len();
        for i in 0..n {
            let cur = points[i].to_vec3();
            let next = points[(i + 1) % n].to_vec3();
            normal.x += (cur.y - next.y) * (cur.z + next.z);
            normal.y += (cur.z - next.z) * (cur.x + next.x);
            normal.z += (cur.x - next.x) * (cur.y + next.y);
            centroid = centroid + cur;
        }
        let normal = normal.normalized()?;
        let centroid = centroid * (1.0 / n as f64);
        Some(Self {
            normal,
            offset: normal.dot(&centroid),
        })
    }

    pub fn from_normal_and_point(normal: Vec3, point: &Point3d) -> Option<Self> {
        let normal = normal.normalized()?;
        Some(Self {
            normal,
            offset: normal.dot(&point.to_vec3()),
        })
    }

    pub fn distance_abs(&self, point: &Point3d) -> f64 {
        (self.normal.dot(&point.to_vec3()) - self.offset).abs()
    }

    /// A vertical plane has no unique Z for an XY location.
    pub fn is_vertical(&self, tolerance: f64) -> bool {
        self.normal.z.abs() <= tolerance
    }

    /// Z of the plane at an XY location, None for a (near-)vertical plane.
    pub fn z_at(&self, x: f64, y: f64) -> Option<f64> {
        if self.is_vertical(1e-12) {
            return None;
        }
        Some((self.offset - self.normal.x * x - self.normal.y * y) / self.normal.z)
    }

    /// Intersection line of two planes, None when they are (near-)parallel.
    pub fn intersect_plane(&self, other: &Plane3d) -> Option<Line3d> {
        let direction = self.normal.cross(&other.normal);
        let det = direction.dot(&direction);
        if det < 1e-18 {
            return None;
        }
        // Point on both planes closest to the origin.
        let p = (other.normal.cross(&direction) * self.offset
            + direction.cross(&self.normal) * other.offset)
            * (1.0 / det);
        Some(Line3d {
            origin: Point3d::new(p.x, p.y, p.z),
            direction: direction.normalized()?,
        })
    }
}

/// An infinite line with a unit direction.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Line3d {
    pub origin: Point3d,
    pub direction: Vec3,
}

impl Line3d {
    /// Orthogonal projection of a point onto the line.
    pub fn project_point(&self, point: &Point3d) -> Point3d {
        let rel = point.to_vec3() - self.origin.to_vec3();
        let t = rel.dot(&self.direction);
        let p = self.origin.to_vec3() + self.direction * t;
        Point3d::new(p.x, p.y, p.z)
    }

    pub fn distance_to(&self, point: &Point3d) -> f64 {
        self.project_point(point).distance_3d(point)
    }

    /// Intersection with a plane, None when the line runs parallel to it.
    pub fn intersect_plane(&self, plane: &Plane3d) -> Option<Point3d> {
        let denom = plane.normal.dot(&self.direction);
        if denom.abs() < 1e-15 {
            return None;
        }
        let t = (plane.offset - plane.normal.dot(&self.origin.to_vec3())) / denom;
        let p = self.origin.to_vec3() + self.direction * t;
        Some(Point3d::new(p.x, p.y, p.z))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_horizontal_plane() {
        let points = [
            Point3d::new(0.0, 0.0, 5.0),
            Point3d::new(10.0, 0.0, 5.0),
            Point3d::new(10.0, 10.0, 5.0),
            Point3d::new(0.0, 10.0, 5.0),
        ];
        let plane = Plane3d::fit(&points).unwrap();
        assert!((plane.normal.z.abs() - 1.0).abs() < 1e-12);
        assert!((plane.z_at(3.0, 7.0).unwrap() - 5.0).abs() < 1e-12);
        assert!(plane.distance_abs(&Point3d::new(1.0, 1.0, 6.0)) - 1.0 < 1e-12);
    }

    #[test]
    fn test_fit_collinear_is_none() {
        let points = [
            Point3d::new(0.0, 0.0, 0.0),
            Point3d::new(1.0, 1.0, 1.0),
            Point3d::new(2.0, 2.0, 2.0),
        ];
        assert!(Plane3d::fit(&points).is_none());
    }

    #[test]
    fn test_plane_plane_intersection() {
        // z = 0 and x = 0 intersect in the y axis.
        let a = Plane3d::from_normal_and_point(Vec3::new(0.0, 0.0, 1.0), &Point3d::new(0.0, 0.0, 0.0))
            .unwrap();
        let b = Plane3d::from_normal_and_point(Vec3::new(1.0, 0.0, 0.0), &Point3d::new(0.0, 0.0, 0.0))
            .unwrap();
        let line = a.intersect_plane(&b).unwrap();
        assert!(line.direction.y.abs() > 0.999);
        assert!(line.distance_to(&Point3d::new(0.0, 42.0, 0.0)) < 1e-9);
    }

    #[test]
    fn test_parallel_planes_do_not_intersect() {
        let a = Plane3d::from_normal_and_point(Vec3::new(0.0, 0.0, 1.0), &Point3d::new(0.0, 0.0, 0.0))
            .unwrap();
        let b = Plane3d::from_normal_and_point(Vec3::new(0.0, 0.0, 1.0), &Point3d::new(0.0, 0.0, 3.0))
            .unwrap();
        assert!(a.intersect_plane(&b).is_none());
    }

    #[test]
    fn test_project_point_onto_line() {
        let line = Line3d {
            origin: Point3d::new(0.0, 0.0, 0.0),
            direction: Vec3::new(1.0, 0.0, 0.0),
        };
        let p = line.project_point(&Point3d::new(4.0, 3.0, 0.0));
        assert!((p.x - 4.0).abs() < 1e-12);
        assert!(p.y.abs() < 1e-12);
    }
}
