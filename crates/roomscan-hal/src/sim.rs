//! Simulated tracking devices for CI and the CLI demo.
//!
//! Neither source talks to hardware; both produce deterministic pose
//! sequences so a full calibration can run headless.
//!
//! # Example
//!
//! ```rust
//! use roomscan_hal::pose::PoseSource;
//! use roomscan_hal::sim::SweepPoseSource;
//! use roomscan_types::Vec3;
//!
//! let mut hmd = SweepPoseSource::new(Vec3::new(0.0, 1.6, 0.0), 20.0, -15.0);
//! let first = hmd.current_pose().unwrap();
//! let second = hmd.current_pose().unwrap();
//! assert_ne!(first.forward, second.forward);
//! ```

use roomscan_types::{Pose, Vec3};
use tracing::trace;

use crate::pose::PoseSource;

// ────────────────────────────────────────────────────────────────────────────
// Scripted source
// ────────────────────────────────────────────────────────────────────────────

/// Replays a fixed list of poses, then repeats the last one.
///
/// A `None` entry simulates a poll on which the device had no pose.
pub struct ScriptedPoseSource {
    id: String,
    script: Vec<Option<Pose>>,
    cursor: usize,
    tracking: bool,
    boundary: Vec<Vec3>,
}

impl ScriptedPoseSource {
    pub fn new(id: impl Into<String>, script: Vec<Option<Pose>>) -> Self {
        Self {
            id: id.into(),
            script,
            cursor: 0,
            tracking: true,
            boundary: Vec::new(),
        }
    }

    /// Convenience: a script of poses that are all present.
    pub fn from_poses(id: impl Into<String>, poses: Vec<Pose>) -> Self {
        Self::new(id, poses.into_iter().map(Some).collect())
    }

    /// A device that never acquires tracking.
    pub fn untracked(id: impl Into<String>) -> Self {
        let mut source = Self::new(id, Vec::new());
        source.tracking = false;
        source
    }

    /// Report these play-area boundary points.
    pub fn with_boundary(mut self, points: Vec<Vec3>) -> Self {
        self.boundary = points;
        self
    }

    /// Number of polls served so far.
    pub fn polls(&self) -> usize {
        self.cursor
    }
}

impl PoseSource for ScriptedPoseSource {
    fn id(&self) -> &str {
        &self.id
    }

    fn tracking_available(&self) -> bool {
        self.tracking
    }

    fn current_pose(&mut self) -> Option<Pose> {
        if !self.tracking || self.script.is_empty() {
            return None;
        }
        let index = self.cursor.min(self.script.len() - 1);
        self.cursor += 1;
        self.script[index]
    }

    fn boundary_points(&self) -> Vec<Vec3> {
        self.boundary.clone()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Sweeping source
// ────────────────────────────────────────────────────────────────────────────

/// An observer standing still and turning on the spot.
///
/// Every poll advances the yaw by `yaw_step_deg`; the pitch alternates
/// between `pitch_deg` and level so both low surfaces and walls are swept.
pub struct SweepPoseSource {
    position: Vec3,
    yaw_step_deg: f32,
    pitch_deg: f32,
    yaw_deg: f32,
    polls: u64,
}

impl SweepPoseSource {
    pub fn new(position: Vec3, yaw_step_deg: f32, pitch_deg: f32) -> Self {
        Self {
            position,
            yaw_step_deg,
            pitch_deg,
            yaw_deg: 0.0,
            polls: 0,
        }
    }
}

impl PoseSource for SweepPoseSource {
    fn id(&self) -> &str {
        "sim_sweep"
    }

    fn tracking_available(&self) -> bool {
        true
    }

    fn current_pose(&mut self) -> Option<Pose> {
        let pitch = if self.polls % 2 == 0 { self.pitch_deg } else { 0.0 };
        let pose = Pose::looking(self.position, self.yaw_deg, pitch);
        trace!(yaw = self.yaw_deg, pitch, "sim pose");
        self.yaw_deg = (self.yaw_deg + self.yaw_step_deg) % 360.0;
        self.polls += 1;
        Some(pose)
    }
}
