//! [`CalibrationController`] – the room calibration state machine.
//!
//! Drives one calibration session from start to the persisted record:
//!
//! | State | Entered by | Work done |
//! |---|---|---|
//! | `Idle` | construction, completion, failure, cancellation | nothing |
//! | `Scanning` | [`start`][CalibrationController::start] | room center, then one scan per [`tick`][CalibrationController::tick] |
//! | `Finalizing` | a tick that reaches `required_coverage` | dedup, visibility, persistence |
//!
//! Each tick:
//!
//! 1. **Sample** – poll the [`PoseSource`] for the observer's pose.
//! 2. **Quantize** – snap the gaze direction to a bin.  A bin already
//!    scanned this session ends the tick here.
//! 3. **Scan** – cast the horizontal ray fan through the [`RayCaster`] and
//!    fold every intersection into the [`SurfaceAccumulator`].
//! 4. **Report** – publish coverage on [`Topic::Progress`] and, for new
//!    bins, a feedback marker on [`Topic::Feedback`].
//!
//! [`run`][CalibrationController::run] wraps the whole lifecycle in an async
//! loop paced by the injected [`Clock`].  The step methods are public so a
//! host with its own scheduler can drive the machine directly.
//!
//! # Session guard
//!
//! Only one session may be active per controller.  `start` while active is
//! ignored.  The guard is released on completion, on cancellation and when
//! the room center cannot be established, so a later `start` can succeed.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use roomscan_hal::sim::ScriptedPoseSource;
//! use roomscan_memory::InMemoryStore;
//! use roomscan_perception::BoxScene;
//! use roomscan_runtime::controller::{CalibrationController, CalibrationState};
//! use roomscan_types::{CalibrationConfig, Pose, Vec3};
//!
//! let eye = Vec3::new(0.0, 1.6, 0.0);
//! let poses = (0..11).map(|i| Pose::looking(eye, i as f32 * 30.0, 0.0)).collect();
//! let mut controller = CalibrationController::new(
//!     CalibrationConfig::default(),
//!     Box::new(ScriptedPoseSource::from_poses("hmd", poses)),
//!     Arc::new(BoxScene::demo_room()),
//!     Arc::new(InMemoryStore::new()),
//! )
//! .unwrap();
//!
//! controller.start();
//! controller.establish_room_center().unwrap();
//! while controller.state() == CalibrationState::Scanning {
//!     controller.tick().unwrap();
//! }
//! let record = controller.finalize().unwrap();
//! assert!(record.scan_coverage >= 0.8);
//! ```

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use roomscan_hal::pose::{PoseSource, centroid};
use roomscan_memory::{KeyValueStore, save_calibration};
use roomscan_middleware::{EventBus, Topic};
use roomscan_perception::{DirectionSampler, RayCaster, SurfaceAccumulator, apply_visibility, dedupe};
use roomscan_types::{
    CalibrationConfig, CalibrationRecord, Event, EventPayload, Pose, Quaternion, ScanError,
    Surface, Vec3,
};
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::clock::{Clock, TokioClock};

const EVENT_SOURCE: &str = "roomscan-runtime::controller";

// ─────────────────────────────────────────────────────────────────────────────
// Public types
// ─────────────────────────────────────────────────────────────────────────────

/// Lifecycle state of a [`CalibrationController`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationState {
    Idle,
    Scanning,
    Finalizing,
}

impl fmt::Display for CalibrationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "Idle",
            Self::Scanning => "Scanning",
            Self::Finalizing => "Finalizing",
        };
        f.write_str(name)
    }
}

/// Result of [`CalibrationController::start`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// A new session began with this id.
    Started(Uuid),
    /// A session is already active; nothing changed.
    AlreadyActive,
}

/// What one scan iteration did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickReport {
    /// Coverage after this iteration.
    pub coverage: f32,
    /// True when the gaze landed in a bin not scanned before.
    pub new_direction: bool,
    /// Ray intersections folded into the surface set.
    pub hits: usize,
    /// True when coverage reached the threshold and the controller moved to
    /// `Finalizing`.
    pub threshold_reached: bool,
}

/// How [`CalibrationController::run`] ended.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// The record that was persisted.
    Completed(CalibrationRecord),
    Cancelled,
    /// Another session was already active.
    AlreadyActive,
}

/// Cloneable remote control for a running session.
///
/// Safe to move into a signal handler or another task.
#[derive(Debug, Clone)]
pub struct CalibrationHandle {
    active: Arc<AtomicBool>,
    cancel: Arc<AtomicBool>,
}

impl CalibrationHandle {
    /// Ask the session to stop at its next suspension point.
    ///
    /// A request made before the session starts cancels it right after the
    /// warm-up.  The request is cleared when a session ends.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Release);
    }

    /// `true` while a session holds the guard.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// CalibrationController
// ─────────────────────────────────────────────────────────────────────────────

/// Owns the pose source, the in-progress surface set and the session state.
///
/// The surface set is only mutated from the controller's own methods; callers
/// see finished surfaces through [`result`][Self::result] once a session has
/// completed.
pub struct CalibrationController {
    config: CalibrationConfig,
    pose_source: Box<dyn PoseSource>,
    caster: Arc<dyn RayCaster>,
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    bus: EventBus,
    state: CalibrationState,
    sampler: DirectionSampler,
    accumulator: SurfaceAccumulator,
    room_center: Option<Vec3>,
    coverage: f32,
    session_id: Option<Uuid>,
    // ── Shared with CalibrationHandle ─────────────────────────────────────────
    active: Arc<AtomicBool>,
    cancel: Arc<AtomicBool>,
    /// Immutable snapshot of the last completed session.
    result: Option<Arc<[Surface]>>,
}

impl CalibrationController {
    /// Build a controller in the `Idle` state.
    ///
    /// Uses a [`TokioClock`] and a fresh [`EventBus`]; override either with
    /// [`with_clock`][Self::with_clock] / [`with_bus`][Self::with_bus].
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::InvalidConfig`] when `config` fails validation.
    pub fn new(
        config: CalibrationConfig,
        pose_source: Box<dyn PoseSource>,
        caster: Arc<dyn RayCaster>,
        store: Arc<dyn KeyValueStore>,
    ) -> Result<Self, ScanError> {
        config.validate()?;
        let sampler = DirectionSampler::new(config.quantization_deg, config.min_scan_angle_deg);
        let accumulator =
            SurfaceAccumulator::new(config.scan_resolution, config.minimum_surface_area);

        Ok(Self {
            config,
            pose_source,
            caster,
            store,
            clock: Arc::new(TokioClock::new()),
            bus: EventBus::default(),
            state: CalibrationState::Idle,
            sampler,
            accumulator,
            room_center: None,
            coverage: 0.0,
            session_id: None,
            active: Arc::new(AtomicBool::new(false)),
            cancel: Arc::new(AtomicBool::new(false)),
            result: None,
        })
    }

    /// Replace the time source used by [`run`][Self::run].
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Publish signals on an existing bus instead of a private one.
    pub fn with_bus(mut self, bus: EventBus) -> Self {
        self.bus = bus;
        self
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    /// Clone of the [`EventBus`] so callers can subscribe to signals.
    pub fn bus(&self) -> EventBus {
        self.bus.clone()
    }

    pub fn handle(&self) -> CalibrationHandle {
        CalibrationHandle {
            active: Arc::clone(&self.active),
            cancel: Arc::clone(&self.cancel),
        }
    }

    pub fn config(&self) -> &CalibrationConfig {
        &self.config
    }

    pub fn state(&self) -> CalibrationState {
        self.state
    }

    /// Coverage of the current (or last) session, in `[0, 1]`.
    pub fn coverage(&self) -> f32 {
        self.coverage
    }

    pub fn room_center(&self) -> Option<Vec3> {
        self.room_center
    }

    pub fn session_id(&self) -> Option<Uuid> {
        self.session_id
    }

    /// Surfaces of the last completed session.  `None` until a session
    /// completes; never the in-progress set.
    pub fn result(&self) -> Option<Arc<[Surface]>> {
        self.result.clone()
    }

    // -------------------------------------------------------------------------
    // Lifecycle steps
    // -------------------------------------------------------------------------

    /// Engage the session guard, clear the previous session and enter
    /// `Scanning`.
    pub fn start(&mut self) -> StartOutcome {
        if self
            .active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!(state = %self.state, "start ignored: calibration already active");
            return StartOutcome::AlreadyActive;
        }

        self.clear_session();
        let session_id = Uuid::new_v4();
        self.session_id = Some(session_id);
        self.state = CalibrationState::Scanning;

        info!(%session_id, device = self.pose_source.id(), "calibration started");
        self.emit(Topic::Lifecycle, EventPayload::CalibrationStarted { session_id });
        StartOutcome::Started(session_id)
    }

    /// Fix the room center for this session.
    ///
    /// Uses the centroid of the device's boundary points when it reports any,
    /// otherwise the observer's current position.
    ///
    /// # Errors
    ///
    /// [`ScanError::TrackingUnavailable`] when the device has no tracking.
    /// The session then fails: the guard is released and the controller
    /// returns to `Idle`.
    pub fn establish_room_center(&mut self) -> Result<Vec3, ScanError> {
        self.expect_state(CalibrationState::Scanning)?;

        let center = if self.pose_source.tracking_available() {
            let boundary = self.pose_source.boundary_points();
            match centroid(&boundary) {
                Some(c) => Some(c),
                None => self.pose_source.current_pose().map(|pose| pose.position),
            }
        } else {
            None
        };

        match center {
            Some(center) => {
                self.room_center = Some(center);
                info!(?center, "room center established");
                Ok(center)
            }
            None => {
                let err = ScanError::TrackingUnavailable(format!(
                    "no tracked pose from device '{}'",
                    self.pose_source.id()
                ));
                self.fail(&err);
                Err(err)
            }
        }
    }

    /// Run one scan iteration.
    ///
    /// A poll without a pose scans nothing but still reports coverage.
    pub fn tick(&mut self) -> Result<TickReport, ScanError> {
        self.expect_state(CalibrationState::Scanning)?;
        if self.room_center.is_none() {
            return Err(ScanError::InvalidState {
                expected: "Scanning with a room center".to_string(),
                found: "Scanning without a room center".to_string(),
            });
        }

        let mut report = TickReport {
            coverage: 0.0,
            new_direction: false,
            hits: 0,
            threshold_reached: false,
        };

        match self.pose_source.current_pose() {
            Some(pose) => {
                let bin = self.sampler.quantize(pose.forward);
                if self.sampler.observe(bin) {
                    report.new_direction = true;
                    report.hits = self.scan_fan(pose);
                    let marker = pose.position.add(self.sampler.bin_direction(bin));
                    self.emit(Topic::Feedback, EventPayload::DirectionScanned { bin, marker });
                }
            }
            None => debug!(device = self.pose_source.id(), "no pose this tick"),
        }

        self.coverage = self.sampler.coverage_ratio();
        report.coverage = self.coverage;
        self.emit(Topic::Progress, EventPayload::ScanProgress { coverage: self.coverage });

        if self.coverage >= self.config.required_coverage {
            report.threshold_reached = true;
            self.state = CalibrationState::Finalizing;
            info!(coverage = self.coverage, surfaces = self.accumulator.len(), "coverage threshold reached");
        }

        debug!(
            coverage = report.coverage,
            new_direction = report.new_direction,
            hits = report.hits,
            surfaces = self.accumulator.len(),
            "scan tick"
        );
        Ok(report)
    }

    /// Deduplicate, evaluate visibility, persist and publish the result.
    ///
    /// # Errors
    ///
    /// [`ScanError::Storage`] when the record cannot be written; the session
    /// then fails and nothing is published as complete.
    pub fn finalize(&mut self) -> Result<CalibrationRecord, ScanError> {
        self.expect_state(CalibrationState::Finalizing)?;
        let center = self.room_center.ok_or_else(|| ScanError::InvalidState {
            expected: "Finalizing with a room center".to_string(),
            found: "Finalizing without a room center".to_string(),
        })?;

        let mut surfaces = dedupe(self.accumulator.take_surfaces(), self.config.scan_resolution);
        let visible = apply_visibility(
            self.caster.as_ref(),
            &mut surfaces,
            center,
            self.config.visibility_epsilon,
        );

        let session_id = self.session_id.unwrap_or_else(Uuid::nil);
        let record = CalibrationRecord::new(session_id, &surfaces, center, self.coverage);

        if let Err(e) = save_calibration(self.store.as_ref(), &self.config.storage_key, &record) {
            let err = ScanError::Storage(e.to_string());
            self.fail(&err);
            return Err(err);
        }

        self.result = Some(Arc::from(surfaces));
        self.end_session();

        info!(
            %session_id,
            surfaces = record.surfaces.len(),
            visible,
            coverage = record.scan_coverage,
            "calibration complete"
        );
        self.emit(Topic::Lifecycle, EventPayload::CalibrationComplete);
        Ok(record)
    }

    /// Abandon the active session without persisting anything.
    ///
    /// Returns `false` when no session was active.
    pub fn cancel(&mut self) -> bool {
        if self.state == CalibrationState::Idle {
            return false;
        }
        self.clear_session();
        self.end_session();

        info!(session_id = ?self.session_id, "calibration cancelled");
        self.emit(Topic::Lifecycle, EventPayload::CalibrationCancelled);
        true
    }

    // -------------------------------------------------------------------------
    // Async driver
    // -------------------------------------------------------------------------

    /// Run a complete session: warm-up, room center, scan loop, finalize.
    ///
    /// Cancellation through a [`CalibrationHandle`] is checked before every
    /// tick and after every sleep.
    pub async fn run(&mut self) -> Result<RunOutcome, ScanError> {
        if self.start() == StartOutcome::AlreadyActive {
            return Ok(RunOutcome::AlreadyActive);
        }

        self.clock
            .sleep(Duration::from_millis(self.config.tracking_warmup_ms))
            .await;
        if self.cancel_requested() {
            self.cancel();
            return Ok(RunOutcome::Cancelled);
        }

        self.establish_room_center()?;

        let poll_interval = Duration::from_millis(self.config.poll_interval_ms);
        loop {
            if self.cancel_requested() {
                self.cancel();
                return Ok(RunOutcome::Cancelled);
            }
            if self.tick()?.threshold_reached {
                break;
            }
            self.clock.sleep(poll_interval).await;
        }

        self.finalize().map(RunOutcome::Completed)
    }

    // -------------------------------------------------------------------------
    // Private helpers
    // -------------------------------------------------------------------------

    /// Cast the horizontal fan around `pose.forward` and ingest every hit.
    fn scan_fan(&mut self, pose: Pose) -> usize {
        let cone = self.config.min_scan_angle_deg;
        let step = self.config.fan_step_deg;
        let mut hits = 0;

        for i in 0..fan_ray_count(cone, step) {
            let angle = -cone + i as f32 * step;
            let direction =
                Quaternion::from_axis_angle(Vec3::up(), angle.to_radians()).rotate(pose.forward);
            for hit in self
                .caster
                .cast_all(pose.position, direction, self.config.max_ray_range)
            {
                self.accumulator.ingest(hit.point, hit.normal);
                hits += 1;
            }
        }
        hits
    }

    fn clear_session(&mut self) {
        self.sampler.reset();
        self.accumulator.clear();
        self.room_center = None;
        self.coverage = 0.0;
        self.result = None;
    }

    /// Back to `Idle` with the guard released and no pending cancel request.
    fn end_session(&mut self) {
        self.state = CalibrationState::Idle;
        self.cancel.store(false, Ordering::Release);
        self.active.store(false, Ordering::Release);
    }

    fn cancel_requested(&self) -> bool {
        self.cancel.load(Ordering::Acquire)
    }

    fn fail(&mut self, err: &ScanError) {
        error!(session_id = ?self.session_id, error = %err, "calibration failed");
        self.accumulator.clear();
        self.end_session();
        self.emit(
            Topic::Lifecycle,
            EventPayload::CalibrationFailed {
                reason: err.to_string(),
            },
        );
    }

    fn expect_state(&self, expected: CalibrationState) -> Result<(), ScanError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(ScanError::InvalidState {
                expected: expected.to_string(),
                found: self.state.to_string(),
            })
        }
    }

    fn emit(&self, topic: Topic, payload: EventPayload) {
        // Best-effort publish – no subscribers is not an error.
        let _ = self.bus.publish_to(topic, Event::new(EVENT_SOURCE, payload));
    }
}

/// Rays in a fan from `-cone_deg` to `+cone_deg` inclusive, `step_deg` apart.
fn fan_ray_count(cone_deg: f32, step_deg: f32) -> usize {
    ((2.0 * cone_deg) / step_deg + 1e-3).floor() as usize + 1
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use async_trait::async_trait;
    use roomscan_hal::sim::{ScriptedPoseSource, SweepPoseSource};
    use roomscan_memory::{InMemoryStore, StoreError, load_calibration};
    use roomscan_middleware::TopicReceiver;
    use roomscan_perception::BoxScene;

    const EYE: Vec3 = Vec3::new(0.0, 1.6, 0.0);

    fn controller_for(
        source: impl PoseSource + 'static,
    ) -> (CalibrationController, Arc<InMemoryStore>, Arc<ManualClock>) {
        let store = Arc::new(InMemoryStore::new());
        let clock = Arc::new(ManualClock::new());
        let controller = CalibrationController::new(
            CalibrationConfig::default(),
            Box::new(source),
            Arc::new(BoxScene::demo_room()),
            store.clone(),
        )
        .unwrap()
        .with_clock(clock.clone());
        (controller, store, clock)
    }

    /// Ten level poses 30° apart: ten distinct bins out of twelve.
    fn ten_direction_source() -> ScriptedPoseSource {
        let poses = (0..10).map(|i| Pose::looking(EYE, i as f32 * 30.0, 0.0)).collect();
        ScriptedPoseSource::from_poses("hmd", poses)
            .with_boundary(vec![Vec3::new(-1.0, 1.6, -1.0), Vec3::new(1.0, 1.6, 1.0)])
    }

    fn lifecycle(rx: &mut TopicReceiver) -> Vec<EventPayload> {
        rx.drain().into_iter().map(|e| e.payload).collect()
    }

    fn coverages(rx: &mut TopicReceiver) -> Vec<f32> {
        rx.drain()
            .into_iter()
            .filter_map(|e| match e.payload {
                EventPayload::ScanProgress { coverage } => Some(coverage),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = CalibrationConfig {
            required_coverage: 1.5,
            ..CalibrationConfig::default()
        };
        let built = CalibrationController::new(
            config,
            Box::new(ten_direction_source()),
            Arc::new(BoxScene::demo_room()),
            Arc::new(InMemoryStore::new()),
        );
        assert!(matches!(built.err(), Some(ScanError::InvalidConfig(_))));
    }

    #[test]
    fn fan_spans_cone_inclusive() {
        assert_eq!(fan_ray_count(30.0, 5.0), 13);
        assert_eq!(fan_ray_count(30.0, 7.0), 9);
        assert_eq!(fan_ray_count(0.0, 5.0), 1);
    }

    #[test]
    fn second_start_is_ignored() {
        let (mut controller, _, _) = controller_for(ten_direction_source());
        let mut rx = controller.bus().subscribe_to(Topic::Lifecycle);

        let first = controller.start();
        assert!(matches!(first, StartOutcome::Started(_)));
        assert_eq!(controller.start(), StartOutcome::AlreadyActive);
        assert_eq!(controller.state(), CalibrationState::Scanning);
        assert_eq!(lifecycle(&mut rx).len(), 1, "only one CalibrationStarted");
    }

    #[test]
    fn tick_requires_scanning_state() {
        let (mut controller, _, _) = controller_for(ten_direction_source());
        assert!(matches!(controller.tick(), Err(ScanError::InvalidState { .. })));
        assert!(matches!(controller.finalize(), Err(ScanError::InvalidState { .. })));

        controller.start();
        assert!(
            matches!(controller.tick(), Err(ScanError::InvalidState { .. })),
            "room center must be established first"
        );
    }

    #[test]
    fn room_center_prefers_boundary_centroid() {
        let (mut controller, _, _) = controller_for(ten_direction_source());
        controller.start();
        let center = controller.establish_room_center().unwrap();
        assert_eq!(center, Vec3::new(0.0, 1.6, 0.0));
        assert_eq!(controller.room_center(), Some(center));
    }

    #[test]
    fn room_center_falls_back_to_observer_position() {
        let at = Vec3::new(0.5, 1.7, -0.25);
        let source = ScriptedPoseSource::from_poses("hmd", vec![Pose::looking(at, 0.0, 0.0)]);
        let (mut controller, _, _) = controller_for(source);
        controller.start();
        assert_eq!(controller.establish_room_center().unwrap(), at);
    }

    #[tokio::test]
    async fn missing_tracking_fails_and_releases_guard() {
        let (mut controller, store, _) = controller_for(ScriptedPoseSource::untracked("hmd"));
        let handle = controller.handle();
        let mut rx = controller.bus().subscribe_to(Topic::Lifecycle);

        let err = controller.run().await.unwrap_err();
        assert!(matches!(err, ScanError::TrackingUnavailable(_)));
        assert!(!handle.is_active());
        assert_eq!(controller.state(), CalibrationState::Idle);
        assert!(store.read("RoomCalibration").unwrap().is_none());

        let events = lifecycle(&mut rx);
        assert!(matches!(events[0], EventPayload::CalibrationStarted { .. }));
        assert!(matches!(events[1], EventPayload::CalibrationFailed { .. }));

        // The guard was released, so a retry really starts a new session.
        let retry = controller.run().await;
        assert!(matches!(retry, Err(ScanError::TrackingUnavailable(_))));
    }

    #[test]
    fn threshold_crossed_on_tenth_distinct_direction() {
        let (mut controller, _, _) = controller_for(ten_direction_source());
        controller.start();
        controller.establish_room_center().unwrap();

        for _ in 0..9 {
            let report = controller.tick().unwrap();
            assert!(report.new_direction);
            assert!(!report.threshold_reached);
            assert_eq!(controller.state(), CalibrationState::Scanning);
        }
        assert!((controller.coverage() - 0.75).abs() < 1e-5);

        let report = controller.tick().unwrap();
        assert!(report.threshold_reached);
        assert!((report.coverage - 10.0 / 12.0).abs() < 1e-5);
        assert_eq!(controller.state(), CalibrationState::Finalizing);
    }

    #[test]
    fn revisited_direction_casts_no_rays() {
        let pose = Pose::looking(EYE, 0.0, 0.0);
        let source = ScriptedPoseSource::from_poses("hmd", vec![pose, pose])
            .with_boundary(vec![EYE]);
        let (mut controller, _, _) = controller_for(source);
        let mut feedback = controller.bus().subscribe_to(Topic::Feedback);
        controller.start();
        controller.establish_room_center().unwrap();

        let first = controller.tick().unwrap();
        assert!(first.new_direction);
        assert!(first.hits > 0, "looking at the north wall");

        let second = controller.tick().unwrap();
        assert!(!second.new_direction);
        assert_eq!(second.hits, 0);
        assert_eq!(second.coverage, first.coverage);

        let markers = feedback.drain();
        assert_eq!(markers.len(), 1);
        match &markers[0].payload {
            EventPayload::DirectionScanned { marker, .. } => {
                assert!((marker.z - 1.0).abs() < 1e-4, "one unit ahead of the eye");
                assert!((marker.y - 1.6).abs() < 1e-4);
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[test]
    fn tick_without_pose_still_reports_progress() {
        let source = ScriptedPoseSource::new("hmd", vec![None]).with_boundary(vec![EYE]);
        let (mut controller, _, _) = controller_for(source);
        let mut progress = controller.bus().subscribe_to(Topic::Progress);
        controller.start();
        controller.establish_room_center().unwrap();

        let report = controller.tick().unwrap();
        assert!(!report.new_direction);
        assert_eq!(report.hits, 0);
        assert_eq!(coverages(&mut progress), vec![0.0]);
    }

    #[tokio::test]
    async fn full_run_persists_record_and_signals_once() {
        let source = SweepPoseSource::new(EYE, 20.0, -20.0);
        let (mut controller, store, clock) = controller_for(source);
        let handle = controller.handle();
        let bus = controller.bus();
        let mut progress = bus.subscribe_to(Topic::Progress);
        let mut feedback = bus.subscribe_to(Topic::Feedback);
        let mut lifecycle_rx = bus.subscribe_to(Topic::Lifecycle);

        assert!(controller.result().is_none());
        let outcome = controller.run().await.unwrap();
        let record = match outcome {
            RunOutcome::Completed(record) => record,
            other => panic!("expected completion, got {other:?}"),
        };

        // Warm-up plus nine inter-tick sleeps; the tenth tick ends the loop.
        assert_eq!(clock.elapsed(), Duration::from_millis(1000 + 9 * 100));
        assert_eq!(clock.sleep_count(), 10);

        let seen = coverages(&mut progress);
        assert_eq!(seen.len(), 10);
        assert!(seen.windows(2).all(|w| w[0] <= w[1]), "coverage never decreases");
        assert!(seen.iter().all(|c| (0.0..=1.0).contains(c)));
        assert!(*seen.last().unwrap() >= 0.8);
        assert_eq!(feedback.drain().len(), 10);

        let events = lifecycle(&mut lifecycle_rx);
        assert!(matches!(events.first(), Some(EventPayload::CalibrationStarted { .. })));
        let completions = events
            .iter()
            .filter(|e| matches!(e, EventPayload::CalibrationComplete))
            .count();
        assert_eq!(completions, 1);

        assert!(!record.surfaces.is_empty());
        assert_eq!(record.center_point, EYE);
        assert_eq!(Some(record.session_id), controller.session_id());

        let stored = load_calibration(store.as_ref(), "RoomCalibration").unwrap().unwrap();
        assert_eq!(stored, record);

        let snapshot = controller.result().unwrap();
        assert_eq!(snapshot.len(), record.surfaces.len());
        assert_eq!(controller.state(), CalibrationState::Idle);
        assert!(!handle.is_active());
    }

    #[tokio::test]
    async fn controller_runs_again_after_completion() {
        let (mut controller, _, _) = controller_for(SweepPoseSource::new(EYE, 20.0, -20.0));
        let first = controller.run().await.unwrap();
        let second = controller.run().await.unwrap();
        match (first, second) {
            (RunOutcome::Completed(a), RunOutcome::Completed(b)) => {
                assert_ne!(a.session_id, b.session_id);
            }
            other => panic!("expected two completions, got {other:?}"),
        }
    }

    /// Cancels through the handle once a given number of sleeps have passed.
    struct CancellingClock {
        inner: ManualClock,
        handle: CalibrationHandle,
        after_sleeps: usize,
    }

    #[async_trait]
    impl Clock for CancellingClock {
        fn elapsed(&self) -> Duration {
            self.inner.elapsed()
        }

        async fn sleep(&self, duration: Duration) {
            self.inner.sleep(duration).await;
            if self.inner.sleep_count() >= self.after_sleeps {
                self.handle.cancel();
            }
        }
    }

    #[tokio::test]
    async fn cancel_stops_without_persisting() {
        let (controller, store, _) = controller_for(SweepPoseSource::new(EYE, 20.0, -20.0));
        let handle = controller.handle();
        let mut controller = controller.with_clock(Arc::new(CancellingClock {
            inner: ManualClock::new(),
            handle: handle.clone(),
            after_sleeps: 3,
        }));
        let mut rx = controller.bus().subscribe_to(Topic::Lifecycle);

        let outcome = controller.run().await.unwrap();
        assert_eq!(outcome, RunOutcome::Cancelled);
        assert_eq!(controller.state(), CalibrationState::Idle);
        assert!(!handle.is_active());
        assert!(controller.result().is_none());
        assert!(store.read("RoomCalibration").unwrap().is_none());

        let events = lifecycle(&mut rx);
        assert_eq!(events.last(), Some(&EventPayload::CalibrationCancelled));
        assert!(!events.contains(&EventPayload::CalibrationComplete));
    }

    #[tokio::test]
    async fn cancel_before_run_stops_after_warmup() {
        let (mut controller, store, clock) =
            controller_for(SweepPoseSource::new(EYE, 20.0, -20.0));
        let handle = controller.handle();
        handle.cancel();

        let outcome = controller.run().await.unwrap();
        assert_eq!(outcome, RunOutcome::Cancelled);
        assert_eq!(clock.sleep_count(), 1);
        assert!(controller.room_center().is_none());
        assert!(store.read("RoomCalibration").unwrap().is_none());

        // The request was consumed by the cancelled session.
        let outcome = controller.run().await.unwrap();
        assert!(matches!(outcome, RunOutcome::Completed(_)));
        assert!(store.read("RoomCalibration").unwrap().is_some());
    }

    #[test]
    fn cancel_when_idle_is_a_no_op() {
        let (mut controller, _, _) = controller_for(ten_direction_source());
        assert!(!controller.cancel());
        controller.start();
        assert!(controller.cancel());
        assert!(!controller.handle().is_active());
    }

    /// Store whose writes always fail.
    struct ReadOnlyStore;

    impl KeyValueStore for ReadOnlyStore {
        fn read(&self, _key: &str) -> Result<Option<String>, StoreError> {
            Ok(None)
        }

        fn write(&self, _key: &str, _value: &str) -> Result<(), StoreError> {
            Err(StoreError::Poisoned)
        }
    }

    #[test]
    fn storage_failure_fails_the_session() {
        let mut controller = CalibrationController::new(
            CalibrationConfig::default(),
            Box::new(ten_direction_source()),
            Arc::new(BoxScene::demo_room()),
            Arc::new(ReadOnlyStore),
        )
        .unwrap();
        let mut rx = controller.bus().subscribe_to(Topic::Lifecycle);

        controller.start();
        controller.establish_room_center().unwrap();
        while controller.state() == CalibrationState::Scanning {
            controller.tick().unwrap();
        }
        let err = controller.finalize().unwrap_err();
        assert!(matches!(err, ScanError::Storage(_)));
        assert!(controller.result().is_none());
        assert!(!controller.handle().is_active());
        assert!(
            lifecycle(&mut rx)
                .iter()
                .all(|e| !matches!(e, EventPayload::CalibrationComplete))
        );
    }
}
