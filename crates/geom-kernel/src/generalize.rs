//! Douglas-Peucker generalization.

use crate::point::Point3d;
use crate::segment::Segment;
use crate::vector::Vec3;

/// Keep-flags for a vertex sequence generalized at `tolerance`. The first and
/// last vertices are always kept. With `use_z`, deviation is measured in 3D
/// where the points carry Z.
pub fn douglas_peucker_keep(points: &[Point3d], tolerance: f64, use_z: bool) -> Vec<bool> {
    let n = points.len();
    let mut keep = vec![false; n];
    if n == 0 {
        return keep;
    }
    keep[0] = true;
    keep[n - 1] = true;
    if n <= 2 {
        return keep;
    }

    let mut stack = vec![(0usize, n - 1)];
    while let Some((first, last)) = stack.pop() {
        if last <= first + 1 {
            continue;
        }
        let chord = Segment::new(points[first], points[last]);
        let mut max_deviation = 0.0;
        let mut max_index = first;
        for (i, point) in points.iter().enumerate().take(last).skip(first + 1) {
            let deviation = if use_z {
                deviation_3d(&chord, point)
            } else {
                chord.distance_2d_to(point)
            };
            if deviation > max_deviation {
                max_deviation = deviation;
                max_index = i;
            }
        }
        if max_deviation > tolerance {
            keep[max_index] = true;
            stack.push((first, max_index));
            stack.push((max_index, last));
        }
    }
    keep
}

fn deviation_3d(chord: &Segment, point: &Point3d) -> f64 {
    if !chord.from.has_z() || !chord.to.has_z() || !point.has_z() {
        return chord.distance_2d_to(point);
    }
    let d: Vec3 = chord.to.to_vec3() - chord.from.to_vec3();
    let len2 = d.dot(&d);
    if len2 < 1e-30 {
        return chord.from.distance_3d(point);
    }
    let rel = point.to_vec3() - chord.from.to_vec3();
    let t = (rel.dot(&d) / len2).clamp(0.0, 1.0);
    let closest = chord.from.to_vec3() + d * t;
    (point.to_vec3() - closest).length()
}
