//! Generic `PoseSource` trait for head / device tracking hardware.

use roomscan_types::{Pose, Vec3};

/// A tracking device that reports where the observer is and where they look.
///
/// Drivers implement this trait and are handed to the calibration
/// controller, which polls [`current_pose`][Self::current_pose] once per scan
/// iteration.
pub trait PoseSource: Send {
    /// Stable identifier for this device, e.g. `"hmd"`.
    fn id(&self) -> &str;

    /// True once the device has acquired tracking.
    fn tracking_available(&self) -> bool;

    /// Sample the current pose.  `None` when no pose is available for this
    /// poll (the scan iteration is then skipped).
    fn current_pose(&mut self) -> Option<Pose>;

    /// Play-area boundary points, if the device knows them.  When non-empty
    /// their centroid is used as the room center.
    fn boundary_points(&self) -> Vec<Vec3> {
        Vec::new()
    }
}

/// Centroid of `points`, or `None` for an empty slice.
pub fn centroid(points: &[Vec3]) -> Option<Vec3> {
    if points.is_empty() {
        return None;
    }
    let sum = points.iter().fold(Vec3::zero(), |acc, p| acc.add(*p));
    Some(sum.scale(1.0 / points.len() as f32))
}
