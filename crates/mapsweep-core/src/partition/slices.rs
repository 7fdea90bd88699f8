//! Subregion type and angular slice planning.

use std::f64::consts::TAU;

/// Geographic centroid of a location.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub long: f64,
}

/// One angular slice `[start_angle, end_angle)` (radians) around a centroid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Subregion {
    pub lat_center: f64,
    pub long_center: f64,
    /// Start angle (inclusive).
    pub start_angle: f64,
    /// End angle (exclusive).
    pub end_angle: f64,
}

impl Subregion {
    /// Angular width of this slice in radians.
    pub fn sweep(&self) -> f64 {
        self.end_angle - self.start_angle
    }

    /// Whether `angle` (radians, in `[0, 2π)`) falls inside this slice.
    pub fn contains(&self, angle: f64) -> bool {
        angle >= self.start_angle && angle < self.end_angle
    }
}

/// Splits `[0, 2π)` into `count` equal slices in increasing order.
///
/// Adjacent slices share their boundary value exactly and the last slice
/// ends at exactly `2π`. Returns an empty vec if `count` is 0.
pub fn angular_slices(center: GeoPoint, count: usize) -> Vec<Subregion> {
    if count == 0 {
        return Vec::new();
    }

    let n = count as f64;
    let boundary = |i: usize| {
        if i == count {
            TAU
        } else {
            TAU * i as f64 / n
        }
    };

    (0..count)
        .map(|i| Subregion {
            lat_center: center.lat,
            long_center: center.long,
            start_angle: boundary(i),
            end_angle: boundary(i + 1),
        })
        .collect()
}
