use serde::{Deserialize, Serialize};

use crate::vector::Vec3;

/// A vertex location. `z` is NaN for 2D points; use [`Point3d::has_z`] before
/// reading it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Point3d {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3d {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// A point without a Z value.
    pub fn new_2d(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            z: f64::NAN,
        }
    }

    pub fn has_z(&self) -> bool {
        !self.z.is_nan()
    }

    pub fn with_z(&self, z: f64) -> Self {
        Self { z, ..*self }
    }

    pub fn distance_2d(&self, other: &Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// 3D distance when both points carry Z, planar distance otherwise.
    pub fn distance_3d(&self, other: &Self) -> f64 {
        if !self.has_z() || !other.has_z() {
            return self.distance_2d(other);
        }
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    pub fn equal_2d(&self, other: &Self, tolerance: f64) -> bool {
        self.distance_2d(other) <= tolerance
    }

    pub fn equal_3d(&self, other: &Self, tolerance: f64) -> bool {
        self.distance_3d(other) <= tolerance
    }

    pub fn to_vec3(&self) -> Vec3 {
        Vec3::new(self.x, self.y, if self.has_z() { self.z } else { 0.0 })
    }
}
