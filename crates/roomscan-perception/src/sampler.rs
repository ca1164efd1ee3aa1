//! Direction Sampler.
//!
//! Quantizes a continuous gaze direction into a [`DirectionBin`] and keeps
//! the set of bins already visited in the current session.
//!
//! # Quantization
//!
//! The direction is expressed as two angles, each snapped independently to
//! the nearest multiple of the resolution (15° by default):
//!
//! ```text
//! yaw   = atan2(x, z)      wrapped to one turn
//! pitch = asin(y / |d|)    at ±90° the yaw collapses to 0
//! ```
//!
//! Distinct raw directions collapse onto the same bin, and the bins are a
//! per-axis grid rather than an equal solid-angle partition.
//!
//! # Coverage
//!
//! Coverage is `visited / (360 / scan_angle)` clamped to `1.0`.  The scan
//! angle (30° by default) is independent of the quantization resolution.
//!
//! # Example
//!
//! ```rust
//! use roomscan_perception::sampler::DirectionSampler;
//! use roomscan_types::Vec3;
//!
//! let mut sampler = DirectionSampler::new(15.0, 30.0);
//! let bin = sampler.quantize(Vec3::new(0.0, 0.0, 1.0));
//! assert!(sampler.observe(bin));
//! assert!(!sampler.observe(bin));
//! assert!((sampler.coverage_ratio() - 1.0 / 12.0).abs() < 1e-6);
//! ```

use std::collections::HashSet;

use roomscan_types::{DirectionBin, Quaternion, Vec3};

/// Tracks which direction bins have been scanned in the current session.
#[derive(Debug, Clone)]
pub struct DirectionSampler {
    resolution_deg: f32,
    expected_bins: f32,
    visited: HashSet<DirectionBin>,
}

impl DirectionSampler {
    /// Create a sampler.
    ///
    /// - `resolution_deg` – quantization step for both angular axes.
    /// - `scan_angle_deg` – the coverage divisor: full coverage is
    ///   `360 / scan_angle_deg` distinct bins.
    pub fn new(resolution_deg: f32, scan_angle_deg: f32) -> Self {
        Self {
            resolution_deg,
            expected_bins: 360.0 / scan_angle_deg,
            visited: HashSet::new(),
        }
    }

    /// Snap `direction` to its bin.  A zero vector maps to the forward bin.
    pub fn quantize(&self, direction: Vec3) -> DirectionBin {
        let d = direction.normalize();
        if d == Vec3::zero() {
            return DirectionBin { yaw_step: 0, pitch_step: 0 };
        }

        let pitch_deg = d.y.clamp(-1.0, 1.0).asin().to_degrees();
        let yaw_deg = d.x.atan2(d.z).to_degrees();

        let pitch_step = (pitch_deg / self.resolution_deg).round() as i32;
        let mut yaw_step = (yaw_deg / self.resolution_deg).round() as i32;

        let steps_per_turn = (360.0 / self.resolution_deg).round() as i32;
        if steps_per_turn > 0 {
            yaw_step = yaw_step.rem_euclid(steps_per_turn);
        }
        if (pitch_step as f32 * self.resolution_deg).abs() >= 90.0 - 1e-3 {
            yaw_step = 0;
        }

        DirectionBin { yaw_step, pitch_step }
    }

    /// Canonical unit direction represented by `bin`.
    pub fn bin_direction(&self, bin: DirectionBin) -> Vec3 {
        let yaw = bin.yaw_step as f32 * self.resolution_deg;
        let pitch = (bin.pitch_step as f32 * self.resolution_deg).clamp(-90.0, 90.0);
        Quaternion::from_yaw_pitch(yaw, pitch).rotate(Vec3::forward())
    }

    /// Record `bin` as visited.  Returns `true` the first time a bin is seen.
    pub fn observe(&mut self, bin: DirectionBin) -> bool {
        self.visited.insert(bin)
    }

    /// True when `bin` has already been visited this session.
    pub fn is_visited(&self, bin: DirectionBin) -> bool {
        self.visited.contains(&bin)
    }

    /// Number of distinct bins visited.
    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }

    /// Fraction of the expected bins visited, in `[0, 1]`.
    pub fn coverage_ratio(&self) -> f32 {
        if self.expected_bins <= 0.0 {
            return 0.0;
        }
        (self.visited.len() as f32 / self.expected_bins).clamp(0.0, 1.0)
    }

    /// Forget every visited bin.
    pub fn reset(&mut self) {
        self.visited.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yaw_dir(yaw_deg: f32) -> Vec3 {
        Quaternion::from_yaw_pitch(yaw_deg, 0.0).rotate(Vec3::forward())
    }

    #[test]
    fn forward_maps_to_origin_bin() {
        let sampler = DirectionSampler::new(15.0, 30.0);
        assert_eq!(
            sampler.quantize(Vec3::forward()),
            DirectionBin { yaw_step: 0, pitch_step: 0 }
        );
    }

    #[test]
    fn nearby_directions_collapse_into_one_bin() {
        let sampler = DirectionSampler::new(15.0, 30.0);
        assert_eq!(sampler.quantize(yaw_dir(29.0)), sampler.quantize(yaw_dir(31.0)));
        assert_ne!(sampler.quantize(yaw_dir(0.0)), sampler.quantize(yaw_dir(30.0)));
    }

    #[test]
    fn yaw_wraps_around_full_turn() {
        let sampler = DirectionSampler::new(15.0, 30.0);
        assert_eq!(sampler.quantize(yaw_dir(-1.0)), sampler.quantize(yaw_dir(359.0)));
        assert_eq!(sampler.quantize(yaw_dir(-90.0)).yaw_step, 18);
    }

    #[test]
    fn looking_straight_up_ignores_yaw() {
        let sampler = DirectionSampler::new(15.0, 30.0);
        let a = sampler.quantize(Vec3::new(0.01, 1.0, 0.0));
        let b = sampler.quantize(Vec3::new(-0.01, 1.0, 0.01));
        assert_eq!(a, b);
        assert_eq!(a.pitch_step, 6);
        assert_eq!(a.yaw_step, 0);
    }

    #[test]
    fn bin_direction_is_canonical() {
        let sampler = DirectionSampler::new(15.0, 30.0);
        let bin = sampler.quantize(yaw_dir(47.0));
        let canonical = sampler.bin_direction(bin);
        assert!((canonical.length() - 1.0).abs() < 1e-5);
        assert_eq!(sampler.quantize(canonical), bin);
        assert!(canonical.distance(yaw_dir(45.0)) < 1e-5);
    }

    #[test]
    fn coverage_is_monotonic_and_clamped() {
        let mut sampler = DirectionSampler::new(15.0, 30.0);
        let mut last = sampler.coverage_ratio();
        for i in 0..40 {
            // Revisit directions regularly; coverage must never drop.
            let bin = sampler.quantize(yaw_dir((i % 30) as f32 * 15.0));
            sampler.observe(bin);
            let now = sampler.coverage_ratio();
            assert!(now >= last);
            last = now;
        }
        assert!((last - 1.0).abs() < 1e-6, "24 bins visited, clamp to 1");
    }

    #[test]
    fn ten_bins_of_twelve_cross_eighty_percent() {
        let mut sampler = DirectionSampler::new(15.0, 30.0);
        for i in 0..9 {
            assert!(sampler.observe(sampler.quantize(yaw_dir(i as f32 * 30.0))));
        }
        assert!(sampler.coverage_ratio() < 0.8);
        sampler.observe(sampler.quantize(yaw_dir(270.0)));
        assert!((sampler.coverage_ratio() - 10.0 / 12.0).abs() < 1e-6);
        assert!(sampler.coverage_ratio() >= 0.8);
    }

    #[test]
    fn reset_clears_visited_bins() {
        let mut sampler = DirectionSampler::new(15.0, 30.0);
        let bin = sampler.quantize(Vec3::forward());
        sampler.observe(bin);
        sampler.reset();
        assert_eq!(sampler.visited_count(), 0);
        assert!(!sampler.is_visited(bin));
        assert_eq!(sampler.coverage_ratio(), 0.0);
    }
}
