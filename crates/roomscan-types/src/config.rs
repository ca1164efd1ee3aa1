//! Tunable calibration constants.

use serde::{Deserialize, Serialize};

use crate::ScanError;

/// Every constant the calibration engine reads, with the shipped defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Surfaces whose `width * depth` drops below this are pruned.
    pub minimum_surface_area: f32,
    /// Merge (and dedup) distance between a sample and a surface anchor.
    pub scan_resolution: f32,
    /// Half angle of the ray fan, also the divisor of the coverage bin count.
    pub min_scan_angle_deg: f32,
    /// Angular resolution of direction bins.
    pub quantization_deg: f32,
    /// Angular step between neighbouring rays in the fan.
    pub fan_step_deg: f32,
    /// Length of each scan ray.
    pub max_ray_range: f32,
    /// Coverage ratio at which scanning stops.
    pub required_coverage: f32,
    /// Delay between scan iterations.
    pub poll_interval_ms: u64,
    /// Delay before the room center is established.
    pub tracking_warmup_ms: u64,
    /// How far short of the anchor the visibility ray stops.
    pub visibility_epsilon: f32,
    /// Key under which the finished record is stored.
    pub storage_key: String,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            minimum_surface_area: 0.25,
            scan_resolution: 0.1,
            min_scan_angle_deg: 30.0,
            quantization_deg: 15.0,
            fan_step_deg: 5.0,
            max_ray_range: 10.0,
            required_coverage: 0.8,
            poll_interval_ms: 100,
            tracking_warmup_ms: 1000,
            visibility_epsilon: 0.1,
            storage_key: "RoomCalibration".to_string(),
        }
    }
}

impl CalibrationConfig {
    /// Number of direction bins that make up full coverage.
    pub fn expected_bin_count(&self) -> f32 {
        360.0 / self.min_scan_angle_deg
    }

    /// Number of distinct direction bins `quantization_deg` can produce.
    ///
    /// Each full pitch row holds `360 / q` yaw bins.  A row snapped to ±90°
    /// collapses into a single pole bin.
    pub fn reachable_bin_count(&self) -> f32 {
        let q = self.quantization_deg;
        let per_turn = (360.0 / q).round().max(1.0);
        let top_step = (90.0 / q).round();
        if top_step * q >= 90.0 - 1e-3 {
            per_turn * (2.0 * top_step - 1.0).max(0.0) + 2.0
        } else {
            per_turn * (2.0 * top_step + 1.0)
        }
    }

    /// Reject configurations the scan loop cannot run with.
    pub fn validate(&self) -> Result<(), ScanError> {
        let positive = [
            ("minimum_surface_area", self.minimum_surface_area),
            ("scan_resolution", self.scan_resolution),
            ("min_scan_angle_deg", self.min_scan_angle_deg),
            ("quantization_deg", self.quantization_deg),
            ("fan_step_deg", self.fan_step_deg),
            ("max_ray_range", self.max_ray_range),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(ScanError::InvalidConfig(format!(
                    "{name} must be a positive number, got {value}"
                )));
            }
        }
        if !(self.required_coverage > 0.0 && self.required_coverage <= 1.0) {
            return Err(ScanError::InvalidConfig(format!(
                "required_coverage must lie in (0, 1], got {}",
                self.required_coverage
            )));
        }
        let needed = (self.required_coverage * self.expected_bin_count() - 1e-4).ceil();
        let reachable = self.reachable_bin_count();
        if reachable < needed {
            return Err(ScanError::InvalidConfig(format!(
                "required_coverage {} needs {needed} distinct directions but \
                 quantization_deg {} yields only {reachable}",
                self.required_coverage, self.quantization_deg
            )));
        }
        if self.visibility_epsilon < 0.0 || !self.visibility_epsilon.is_finite() {
            return Err(ScanError::InvalidConfig(format!(
                "visibility_epsilon must be non-negative, got {}",
                self.visibility_epsilon
            )));
        }
        if self.poll_interval_ms == 0 {
            return Err(ScanError::InvalidConfig(
                "poll_interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.storage_key.is_empty() {
            return Err(ScanError::InvalidConfig("storage_key must not be empty".to_string()));
        }
        Ok(())
    }
}
