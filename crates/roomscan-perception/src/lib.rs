//! `roomscan-perception` – room-surface calibration algorithms.
//!
//! Turns a stream of ray hits into a small set of planar surface records.
//! Everything here is synchronous and free of I/O; the scan loop lives in
//! `roomscan-runtime`.
//!
//! # Modules
//!
//! - [`sampler`] – [`DirectionSampler`][sampler::DirectionSampler]: quantizes
//!   gaze directions into bins and reports scan coverage.
//! - [`accumulator`] – [`SurfaceAccumulator`][accumulator::SurfaceAccumulator]
//!   and [`DimensionTracker`][accumulator::DimensionTracker]: the incremental
//!   merge-or-create step with extent recomputation and area pruning.
//! - [`classifier`] – [`classify`][classifier::classify]: Floor / Wall /
//!   Table / Shelf from the anchor normal and height.
//! - [`finalize`] – [`dedupe`][finalize::dedupe] and
//!   [`apply_visibility`][finalize::apply_visibility]: the one-shot passes
//!   run after scanning stops.
//! - [`raycast`] – [`RayCaster`][raycast::RayCaster] contract and the
//!   [`BoxScene`][raycast::BoxScene] implementation.

pub mod accumulator;
pub mod classifier;
pub mod finalize;
pub mod raycast;
pub mod sampler;

pub use accumulator::{DimensionTracker, IngestOutcome, SurfaceAccumulator};
pub use classifier::classify;
pub use finalize::{apply_visibility, dedupe, evaluate_visibility};
pub use raycast::{Aabb, BoxScene, RayCaster, RayHit};
pub use sampler::DirectionSampler;
