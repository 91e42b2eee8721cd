use std::f64::consts::{PI, TAU};

use super::Vector2;

/// Wraps an angle into `[0, 2π)`.
#[must_use]
pub fn angle_wrap(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(TAU);
    // rem_euclid can round up to exactly TAU for tiny negative inputs.
    if wrapped >= TAU {
        0.0
    } else {
        wrapped
    }
}

/// Signed smallest rotation taking `from` onto `to`, in `[-π, π)`.
#[must_use]
pub fn angle_diff(from: f64, to: f64) -> f64 {
    (to - from + PI).rem_euclid(TAU) - PI
}

/// Angle of a vector measured counter-clockwise from +X.
///
/// A zero vector has angle 0.
#[must_use]
pub fn angle_of(v: &Vector2) -> f64 {
    v.y.atan2(v.x)
}

/// Returns true if two angles describe the same direction within `delta`.
#[must_use]
pub fn angles_close(a: f64, b: f64, delta: f64) -> bool {
    angle_diff(a, b).abs() <= delta
}
