//! `roomscan-types` – shared vocabulary of the RoomScan workspace.
//!
//! # Modules
//!
//! - [`math`] – immutable [`Vec3`], [`Quaternion`] and [`Pose`] values.
//! - [`surface`] – [`Surface`] records built during a scan and the persisted
//!   [`CalibrationRecord`].
//! - [`config`] – [`CalibrationConfig`] with every tunable constant.
//!
//! The crate root holds the bus [`Event`] envelope and the workspace-wide
//! [`ScanError`].

pub mod config;
pub mod math;
pub mod surface;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub use config::CalibrationConfig;
pub use math::{Pose, Quaternion, Vec3};
pub use surface::{CalibrationRecord, Surface, SurfaceRecord, SurfaceType};

/// Discrete identifier of a quantized gaze direction.
///
/// Each field counts whole quantization steps; see
/// `roomscan_perception::sampler` for how directions are snapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DirectionBin {
    pub yaw_step: i32,
    pub pitch_step: i32,
}

/// Unified event wrapper for the calibration event bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    /// e.g. "roomscan-runtime::controller"
    pub source: String,
    pub payload: EventPayload,
}

impl Event {
    /// Wrap `payload` with a fresh id and the current time.
    pub fn new(source: impl Into<String>, payload: EventPayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            source: source.into(),
            payload,
        }
    }
}

/// Signals emitted while a calibration session runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventPayload {
    /// Coverage after one scan iteration, in `[0, 1]`.
    ScanProgress { coverage: f32 },
    /// A new direction bin was scanned; `marker` is where a feedback
    /// indicator belongs.
    DirectionScanned { bin: DirectionBin, marker: Vec3 },
    CalibrationStarted { session_id: Uuid },
    /// Emitted exactly once per successful calibration.
    CalibrationComplete,
    CalibrationFailed { reason: String },
    CalibrationCancelled,
}

/// Global error type for scanning, persistence and signalling failures.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ScanError {
    #[error("Tracking unavailable: {0}")]
    TrackingUnavailable(String),

    #[error("Invalid calibration state: expected {expected}, found {found}")]
    InvalidState { expected: String, found: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Storage Error: {0}")]
    Storage(String),

    #[error("Event Channel Error: {0}")]
    Channel(String),
}
