//! Point clustering in XY, with an optional second stage that keeps points at
//! clearly different heights apart.

use crate::point::Point3d;

/// Group points whose XY locations coincide within `xy_tolerance`. When
/// `z_tolerance` is given, each XY group is further split so that members of
/// one group also agree in Z; points without Z join the first Z group.
pub fn cluster_groups(
    points: &[Point3d],
    xy_tolerance: f64,
    z_tolerance: Option<f64>,
) -> Vec<Vec<Point3d>> {
    let mut groups: Vec<Vec<Point3d>> = Vec::new();
    for point in points {
        match groups
            .iter_mut()
            .find(|g| g[0].equal_2d(point, xy_tolerance))
        {
            Some(group) => group.push(*point),
            None => groups.push(vec![*point]),
        }
    }

    let Some(z_tolerance) = z_tolerance else {
        return groups;
    };
    let mut split = Vec::new();
    for group in groups {
        split.extend(split_by_z(group, z_tolerance));
    }
    split
}

fn split_by_z(mut group: Vec<Point3d>, z_tolerance: f64) -> Vec<Vec<Point3d>> {
    group.sort_by(|a, b| a.z.total_cmp(&b.z));
    let mut result: Vec<Vec<Point3d>> = Vec::new();
    for point in group {
        if !point.has_z() {
            match result.first_mut() {
                Some(first) => first.push(point),
                None => result.push(vec![point]),
            }
            continue;
        }
        match result
            .iter_mut()
            .find(|g| g.iter().any(|p| p.has_z() && (p.z - point.z).abs() < z_tolerance))
        {
            Some(sub) => sub.push(point),
            None => result.push(vec![point]),
        }
    }
    result
}

/// Cluster centers: coordinate averages of each group, Z averaged over the
/// members that carry one.
pub fn cluster_points(
    points: &[Point3d],
    xy_tolerance: f64,
    z_tolerance: Option<f64>,
) -> Vec<Point3d> {
    cluster_groups(points, xy_tolerance, z_tolerance)
        .iter()
        .map(|g| center_of(g))
        .collect()
}

pub fn center_of(group: &[Point3d]) -> Point3d {
    let n = group.len() as f64;
    let x = group.iter().map(|p| p.x).sum::<f64>() / n;
    let y = group.iter().map(|p| p.y).sum::<f64>() / n;
    let with_z: Vec<f64> = group.iter().filter(|p| p.has_z()).map(|p| p.z).collect();
    let z = if with_z.is_empty() {
        f64::NAN
    } else {
        with_z.iter().sum::<f64>() / with_z.len() as f64
    };
    Point3d::new(x, y, z)
}
