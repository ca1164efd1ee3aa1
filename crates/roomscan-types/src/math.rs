//! Immutable 3-D value types shared by every RoomScan crate.
//!
//! All types are `Copy` and every operation returns a new value; nothing is
//! mutated in place.  World convention: +Y is up, +Z is the default forward
//! direction, and a positive yaw turns +Z towards +X.

use serde::{Deserialize, Serialize};

// ────────────────────────────────────────────────────────────────────────────
// Vec3
// ────────────────────────────────────────────────────────────────────────────

/// A 3-D point or direction.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    /// Create a new vector.
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// The zero vector.
    pub const fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    /// The world "up" axis (+Y).
    pub const fn up() -> Self {
        Self::new(0.0, 1.0, 0.0)
    }

    /// The default forward axis (+Z).
    pub const fn forward() -> Self {
        Self::new(0.0, 0.0, 1.0)
    }

    pub fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }

    pub fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }

    pub fn scale(self, s: f32) -> Self {
        Self::new(self.x * s, self.y * s, self.z * s)
    }

    pub fn dot(self, rhs: Self) -> f32 {
        self.x * rhs.x + self.y * rhs.y + self.z * rhs.z
    }

    /// Euclidean length.
    pub fn length(self) -> f32 {
        self.dot(self).sqrt()
    }

    /// Unit vector in the same direction.  The zero vector stays zero.
    pub fn normalize(self) -> Self {
        let len = self.length();
        if len <= f32::EPSILON {
            Self::zero()
        } else {
            self.scale(1.0 / len)
        }
    }

    /// Euclidean distance between two points.
    pub fn distance(self, other: Self) -> f32 {
        self.sub(other).length()
    }

    /// Component-wise minimum.
    pub fn min(self, other: Self) -> Self {
        Self::new(self.x.min(other.x), self.y.min(other.y), self.z.min(other.z))
    }

    /// Component-wise maximum.
    pub fn max(self, other: Self) -> Self {
        Self::new(self.x.max(other.x), self.y.max(other.y), self.z.max(other.z))
    }

    /// Unsigned angle between two vectors in degrees, in `[0, 180]`.
    ///
    /// Returns `0.0` when either vector has (near) zero length.
    pub fn angle_deg(self, other: Self) -> f32 {
        let denom = self.length() * other.length();
        if denom <= 1e-15 {
            return 0.0;
        }
        let cos = (self.dot(other) / denom).clamp(-1.0, 1.0);
        cos.acos().to_degrees()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Quaternion
// ────────────────────────────────────────────────────────────────────────────

/// A unit quaternion representing a 3-D rotation (w, x, y, z convention).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quaternion {
    pub w: f32,
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Quaternion {
    /// Create a quaternion.  The caller is responsible for providing a unit
    /// quaternion (|q| = 1).
    pub const fn new(w: f32, x: f32, y: f32, z: f32) -> Self {
        Self { w, x, y, z }
    }

    /// The identity rotation (no rotation).
    pub const fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0, 0.0)
    }

    /// Right-handed rotation of `angle_rad` around `axis`.
    ///
    /// A zero axis yields the identity rotation.
    pub fn from_axis_angle(axis: Vec3, angle_rad: f32) -> Self {
        let axis = axis.normalize();
        if axis == Vec3::zero() {
            return Self::identity();
        }
        let (s, c) = (angle_rad * 0.5).sin_cos();
        Self::new(c, axis.x * s, axis.y * s, axis.z * s)
    }

    /// Rotation that turns [`Vec3::forward`] to the given yaw (around +Y) and
    /// pitch (positive looks up), both in degrees.
    pub fn from_yaw_pitch(yaw_deg: f32, pitch_deg: f32) -> Self {
        let yaw = Self::from_axis_angle(Vec3::up(), yaw_deg.to_radians());
        // Rotating +Z towards +Y is a negative turn around +X.
        let pitch = Self::from_axis_angle(Vec3::new(1.0, 0.0, 0.0), -pitch_deg.to_radians());
        yaw.mul(pitch)
    }

    /// Hamilton product: compose two rotations (`rhs` applied first).
    pub fn mul(self, rhs: Self) -> Self {
        Self::new(
            self.w * rhs.w - self.x * rhs.x - self.y * rhs.y - self.z * rhs.z,
            self.w * rhs.x + self.x * rhs.w + self.y * rhs.z - self.z * rhs.y,
            self.w * rhs.y - self.x * rhs.z + self.y * rhs.w + self.z * rhs.x,
            self.w * rhs.z + self.x * rhs.y - self.y * rhs.x + self.z * rhs.w,
        )
    }

    /// Conjugate (== inverse for a unit quaternion).
    pub fn conjugate(self) -> Self {
        Self::new(self.w, -self.x, -self.y, -self.z)
    }

    /// Rotate a vector by this quaternion: p' = q * p * q*.
    pub fn rotate(self, v: Vec3) -> Vec3 {
        let p = Self::new(0.0, v.x, v.y, v.z);
        let rotated = self.mul(p).mul(self.conjugate());
        Vec3::new(rotated.x, rotated.y, rotated.z)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Pose
// ────────────────────────────────────────────────────────────────────────────

/// One observer pose sample: where the observer is and where it looks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    /// World-space position of the observer's eye.
    pub position: Vec3,
    /// Gaze direction.  Not required to be normalised.
    pub forward: Vec3,
}

impl Pose {
    pub fn new(position: Vec3, forward: Vec3) -> Self {
        Self { position, forward }
    }

    /// Pose looking along the given yaw / pitch (degrees).
    pub fn looking(position: Vec3, yaw_deg: f32, pitch_deg: f32) -> Self {
        Self::new(
            position,
            Quaternion::from_yaw_pitch(yaw_deg, pitch_deg).rotate(Vec3::forward()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_vec_eq(a: Vec3, b: Vec3) {
        assert!(a.distance(b) < 1e-5, "expected {b:?}, got {a:?}");
    }

    #[test]
    fn normalize_zero_vector_stays_zero() {
        assert_eq!(Vec3::zero().normalize(), Vec3::zero());
    }

    #[test]
    fn distance_and_length() {
        let a = Vec3::new(1.0, 2.0, 2.0);
        assert!((a.length() - 3.0).abs() < 1e-6);
        assert!((a.distance(Vec3::zero()) - 3.0).abs() < 1e-6);
    }

    #[test]
    fn component_wise_min_max() {
        let a = Vec3::new(1.0, -2.0, 3.0);
        let b = Vec3::new(-1.0, 2.0, 0.0);
        assert_eq!(a.min(b), Vec3::new(-1.0, -2.0, 0.0));
        assert_eq!(a.max(b), Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn angle_between_axes() {
        assert!((Vec3::up().angle_deg(Vec3::up())).abs() < 1e-3);
        assert!((Vec3::new(1.0, 0.0, 0.0).angle_deg(Vec3::up()) - 90.0).abs() < 1e-3);
        assert!((Vec3::new(0.0, -1.0, 0.0).angle_deg(Vec3::up()) - 180.0).abs() < 1e-3);
        assert_eq!(Vec3::zero().angle_deg(Vec3::up()), 0.0);
    }

    #[test]
    fn positive_yaw_turns_forward_towards_x() {
        let q = Quaternion::from_axis_angle(Vec3::up(), 90f32.to_radians());
        assert_vec_eq(q.rotate(Vec3::forward()), Vec3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn positive_pitch_looks_up() {
        let q = Quaternion::from_yaw_pitch(0.0, 90.0);
        assert_vec_eq(q.rotate(Vec3::forward()), Vec3::up());
    }

    #[test]
    fn conjugate_undoes_rotation() {
        let q = Quaternion::from_yaw_pitch(37.0, -12.0);
        let v = Vec3::new(0.3, -1.2, 2.0);
        assert_vec_eq(q.conjugate().rotate(q.rotate(v)), v);
    }

    #[test]
    fn pose_looking_is_unit_length() {
        let p = Pose::looking(Vec3::zero(), 123.0, -30.0);
        assert!((p.forward.length() - 1.0).abs() < 1e-5);
        assert!((p.forward.y - (-30f32).to_radians().sin()).abs() < 1e-5);
    }
}
