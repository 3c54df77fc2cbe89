//! Planar geometry helpers.

use crate::models::{PlanarPoint, Pose2D};
use std::f64::consts::{PI, TAU};

/// Euclidean distance in the planar frame.
pub fn planar_distance(a: PlanarPoint, b: PlanarPoint) -> f64 {
    (b.x - a.x).hypot(b.y - a.y)
}

/// Heading from `a` towards `b`, radians counter-clockwise from +x.
pub fn heading_between(a: PlanarPoint, b: PlanarPoint) -> f64 {
    (b.y - a.y).atan2(b.x - a.x)
}

/// Wrap an angle into `[0, 2π)`.
pub fn mod2pi(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(TAU);
    if wrapped >= TAU {
        0.0
    } else {
        wrapped
    }
}

/// Wrap an angle into `(-π, π]`.
pub fn wrap_pi(angle: f64) -> f64 {
    let wrapped = mod2pi(angle);
    if wrapped > PI {
        wrapped - TAU
    } else {
        wrapped
    }
}

/// Attach a heading to every point: each faces the next one, the last keeps
/// the heading of the final leg.
pub fn poses_with_heading(points: &[PlanarPoint]) -> Vec<Pose2D> {
    let mut poses = Vec::with_capacity(points.len());
    let mut last_heading = 0.0;
    for (i, point) in points.iter().enumerate() {
        if let Some(next) = points.get(i + 1) {
            last_heading = heading_between(*point, *next);
        }
        poses.push(Pose2D::new(point.x, point.y, last_heading));
    }
    poses
}
