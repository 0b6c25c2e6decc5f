use serde::{Deserialize, Serialize};

use crate::point::Point3d;

/// A straight segment between two vertices.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Segment {
    pub from: Point3d,
    pub to: Point3d,
}

impl Segment {
    pub fn new(from: Point3d, to: Point3d) -> Self {
        Self { from, to }
    }

    pub fn length_2d(&self) -> f64 {
        self.from.distance_2d(&self.to)
    }

    pub fn length_3d(&self) -> f64 {
        self.from.distance_3d(&self.to)
    }

    /// Point at parameter `t` in [0, 1], Z interpolated when both ends have one.
    pub fn point_at(&self, t: f64) -> Point3d {
        let z = if self.from.has_z() && self.to.has_z() {
            self.from.z + t * (self.to.z - self.from.z)
        } else {
            f64::NAN
        };
        Point3d::new(
            self.from.x + t * (self.to.x - self.from.x),
            self.from.y + t * (self.to.y - self.from.y),
            z,
        )
    }

    /// Closest point on the segment in XY, with the clamped parameter.
    pub fn closest_point_2d(&self, point: &Point3d) -> (Point3d, f64) {
        let dx = self.to.x - self.from.x;
        let dy = self.to.y - self.from.y;
        let len2 = dx * dx + dy * dy;
        if len2 < 1e-30 {
            return (self.from, 0.0);
        }
        let t = ((point.x - self.from.x) * dx + (point.y - self.from.y) * dy) / len2;
        let t = t.clamp(0.0, 1.0);
        (self.point_at(t), t)
    }

    /// Perpendicular (clamped) XY distance from a point to the segment.
    pub fn distance_2d_to(&self, point: &Point3d) -> f64 {
        let (closest, _) = self.closest_point_2d(point);
        closest.distance_2d(point)
    }

    /// Z of the segment at the XY location of `point` (projected onto the
    /// segment), or NaN if the segment carries no Z.
    pub fn z_at(&self, point: &Point3d) -> f64 {
        let (closest, _) = self.closest_point_2d(point);
        closest.z
    }
}
