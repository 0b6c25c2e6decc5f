use serde::{Deserialize, Serialize};

use crate::point::Point3d;

/// Axis-aligned 2D bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub x_min: f64,
    pub y_min: f64,
    pub x_max: f64,
    pub y_max: f64,
}

impl Envelope {
    pub fn new(x_min: f64, y_min: f64, x_max: f64, y_max: f64) -> Self {
        Self {
            x_min,
            y_min,
            x_max,
            y_max,
        }
    }

    /// Envelope of a non-empty point sequence, or None when empty.
    pub fn of_points<'a>(points: impl IntoIterator<Item = &'a Point3d>) -> Option<Self> {
        let mut result: Option<Envelope> = None;
        for p in points {
            match &mut result {
                None => {
                    result = Some(Envelope::new(p.x, p.y, p.x, p.y));
                }
                Some(env) => {
                    env.x_min = env.x_min.min(p.x);
                    env.y_min = env.y_min.min(p.y);
                    env.x_max = env.x_max.max(p.x);
                    env.y_max = env.y_max.max(p.y);
                }
            }
        }
        result
    }

    pub fn width(&self) -> f64 {
        self.x_max - self.x_min
    }

    pub fn height(&self) -> f64 {
        self.y_max - self.y_min
    }

    pub fn max_dimension(&self) -> f64 {
        self.width().max(self.height())
    }

    /// Grown by `d` on all sides.
    pub fn expanded(&self, d: f64) -> Self {
        Self {
            x_min: self.x_min - d,
            y_min: self.y_min - d,
            x_max: self.x_max + d,
            y_max: self.y_max + d,
        }
    }

    /// Whether the two envelopes are farther apart than `tolerance`.
    pub fn disjoint(&self, other: &Envelope, tolerance: f64) -> bool {
        self.x_max + tolerance < other.x_min
            || other.x_max + tolerance < self.x_min
            || self.y_max + tolerance < other.y_min
            || other.y_max + tolerance < self.y_min
    }

    pub fn contains(&self, point: &Point3d) -> bool {
        point.x >= self.x_min
            && point.x <= self.x_max
            && point.y >= self.y_min
            && point.y <= self.y_max
    }
}
