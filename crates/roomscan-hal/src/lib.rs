//! `roomscan-hal` – tracking hardware abstraction.
//!
//! # Modules
//!
//! - [`pose`] – the [`PoseSource`][pose::PoseSource] trait every tracking
//!   driver implements.
//! - [`sim`] – [`ScriptedPoseSource`][sim::ScriptedPoseSource] and
//!   [`SweepPoseSource`][sim::SweepPoseSource], deterministic stand-ins for
//!   a head-mounted display.

pub mod pose;
pub mod sim;

pub use pose::{PoseSource, centroid};
pub use sim::{ScriptedPoseSource, SweepPoseSource};
