//! Joint angle calculation using the dot product.
//!
//! cos(θ) = (v1 · v2) / (|v1| × |v2|), clamped to [-1, 1] before `acos` so that
//! rounding error on nearly collinear vectors cannot produce NaN.

use std::ops::{Add, Sub};

use crate::landmarks::Landmark;

const MIN_MAGNITUDE: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);
    /// Straight up in image space (y grows downward).
    pub const UP: Self = Self::new(0.0, -1.0, 0.0);
    pub const RIGHT: Self = Self::new(1.0, 0.0, 0.0);
    /// Optical axis pointing at the camera.
    pub const TOWARD_CAMERA: Self = Self::new(0.0, 0.0, -1.0);

    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn dot(self, other: Self) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn cross(self, other: Self) -> Self {
        Self {
            x: self.y * other.z - self.z * other.y,
            y: self.z * other.x - self.x * other.z,
            z: self.x * other.y - self.y * other.x,
        }
    }

    pub fn length(self) -> f64 {
        self.dot(self).sqrt()
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl Add for Vec3 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3 {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl From<Landmark> for Vec3 {
    fn from(point: Landmark) -> Self {
        Self::new(point.x, point.y, point.z)
    }
}

/// Angle between two direction vectors in degrees, or `None` when either is degenerate.
pub fn angle_between_vectors(v1: Vec3, v2: Vec3) -> Option<f64> {
    if !v1.is_finite() || !v2.is_finite() {
        return None;
    }

    let mag1 = v1.length();
    let mag2 = v2.length();
    if mag1 < MIN_MAGNITUDE || mag2 < MIN_MAGNITUDE {
        return None;
    }

    let cos_angle = (v1.dot(v2) / (mag1 * mag2)).clamp(-1.0, 1.0);
    Some(cos_angle.acos().to_degrees())
}

/// Angle at `vertex` formed by `p1` and `p2`, in degrees within [0, 180].
///
/// Returns 0.0 when either arm has zero length; callers that need to tell the
/// sentinel apart from a real 0° reading use [`angle_between_vectors`].
pub fn angle_between(p1: Landmark, vertex: Landmark, p2: Landmark) -> f64 {
    let vertex = Vec3::from(vertex);
    angle_between_vectors(Vec3::from(p1) - vertex, Vec3::from(p2) - vertex).unwrap_or(0.0)
}

/// Fold an axis angle into [0, 90]: a line has no direction, so 170° means 10°.
pub fn fold_axis_angle(angle: f64) -> f64 {
    angle.min(180.0 - angle)
}

pub fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
