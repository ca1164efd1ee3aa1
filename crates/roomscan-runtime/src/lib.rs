//! `roomscan-runtime` – Calibration session engine.
//!
//! Turns the perception building blocks into a running calibration session.
//!
//! # Modules
//!
//! - [`controller`] – [`CalibrationController`][controller::CalibrationController]:
//!   the `Idle → Scanning → Finalizing → Idle` state machine.  Polls a
//!   [`PoseSource`][roomscan_hal::PoseSource], scans new gaze directions with
//!   a ray fan, finalizes the surface set and persists the
//!   [`CalibrationRecord`][roomscan_types::CalibrationRecord].  Signals go
//!   out on the [`EventBus`][roomscan_middleware::EventBus]; a
//!   [`CalibrationHandle`][controller::CalibrationHandle] cancels a running
//!   session from another task.
//! - [`clock`] – [`Clock`][clock::Clock]: the two suspension points of the
//!   scan loop (tracking warm-up and polling interval).
//!   [`ManualClock`][clock::ManualClock] makes loop timing deterministic in
//!   tests.
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing]:
//!   initialises the global `tracing` subscriber with an optional OTLP span
//!   exporter.  Set `OTEL_EXPORTER_OTLP_ENDPOINT` to enable live trace export.

pub mod clock;
pub mod controller;
pub mod telemetry;

pub use clock::{Clock, ManualClock, TokioClock};
pub use controller::{
    CalibrationController, CalibrationHandle, CalibrationState, RunOutcome, StartOutcome,
    TickReport,
};
pub use telemetry::{init_tracing, TracerProviderGuard};
