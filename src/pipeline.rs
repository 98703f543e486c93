//! Complete gesture pipeline: one session object per user session.
//!
//! Each `PoseFrame` flows through the stages in order:
//! 1. **Detection health**: loss/recovery hysteresis and host notifications
//! 2. **Calibration**: the first qualifying frames build the baseline
//! 3. **Classification**: head shake, hand raise/visibility, hand stability
//! 4. **Arbitration**: priority rules and temporal controllers pick at most
//!    one command
//! 5. **Dispatch**: the command is applied to the game collaborator
//!
//! The engine owns every window and timer. It is driven strictly
//! sequentially; the only cross-thread entry point is `ResetHandle`, whose
//! request is applied at the start of the next frame.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::arbiter::{ActionArbiter, ArbiterConfig, GestureSignals};
use crate::calibration::{Baseline, CalibrationConfig, CalibrationStatus, CalibrationUnit};
use crate::classifiers::{
    are_both_hands_up, read_hand, ClassifierConfig, HandTracker, HeadShakeDetector, ShakeState,
};
use crate::controllers::{ContinuousMoveController, ControllerConfig, FastDropController};
use crate::detection_health::{DetectionConfig, DetectionHealthMonitor, DetectionStatus};
use crate::error::{EngineError, Result};
use crate::game::{dispatch, DispatchOutcome, GameCollaborator};
use crate::history::TrackedPoint;
use crate::types::{Command, Hand, HostEvent, LandmarkId, LandmarkSet, PieceId, PoseFrame};

/// Configuration for the complete engine.
///
/// Bundles every stage's configuration. Missing fields in a JSON document
/// fall back to the tuned defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub calibration: CalibrationConfig,
    pub detection: DetectionConfig,
    pub classifier: ClassifierConfig,
    pub controller: ControllerConfig,
    pub arbiter: ArbiterConfig,
}

impl EngineConfig {
    /// Parse and validate a JSON configuration document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON configuration file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&text)?;
        info!("Loaded engine configuration from {}", path.display());
        Ok(config)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject values the stages cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.calibration.frames == 0 {
            return Err(EngineError::invalid("calibration.frames must be at least 1"));
        }

        let d = &self.detection;
        if d.recent_window == 0 {
            return Err(EngineError::invalid("detection.recent_window must be at least 1"));
        }
        check_unit("detection.min_success_rate", d.min_success_rate)?;

        let c = &self.classifier;
        check_non_negative("classifier.raise_threshold", c.raise_threshold)?;
        check_unit("classifier.visibility_threshold", c.visibility_threshold)?;
        check_unit("classifier.frame_margin_min", c.frame_margin_min)?;
        check_unit("classifier.frame_margin_max", c.frame_margin_max)?;
        if c.frame_margin_min >= c.frame_margin_max {
            return Err(EngineError::invalid(
                "classifier.frame_margin_min must be below frame_margin_max",
            ));
        }
        if let Some(limit) = c.max_height_difference {
            check_non_negative("classifier.max_height_difference", limit)?;
        }
        if c.head_window == 0 || c.hand_window == 0 {
            return Err(EngineError::invalid("classifier windows must hold at least one sample"));
        }
        check_non_negative("classifier.shake_min_range", c.shake_min_range)?;
        check_non_negative("classifier.shake_min_variance", c.shake_min_variance)?;
        if c.shake_confirm_frames == 0 {
            return Err(EngineError::invalid("classifier.shake_confirm_frames must be at least 1"));
        }
        if c.stability_samples == 0 || c.stability_samples > c.hand_window {
            return Err(EngineError::invalid(format!(
                "classifier.stability_samples must be in 1..={}",
                c.hand_window
            )));
        }
        check_non_negative("classifier.stability_max_variance", c.stability_max_variance)?;

        let t = &self.controller;
        for (name, value) in [
            ("controller.fast_drop_delay_ms", t.fast_drop_delay_ms),
            ("controller.fast_drop_interval_ms", t.fast_drop_interval_ms),
            ("controller.continuous_hold_ms", t.continuous_hold_ms),
            ("controller.continuous_interval_ms", t.continuous_interval_ms),
        ] {
            if value == 0 {
                return Err(EngineError::invalid(format!("{} must be positive", name)));
            }
        }
        Ok(())
    }
}

fn check_non_negative(name: &str, value: f32) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(EngineError::invalid(format!(
            "{} must be a finite non-negative number, got {}",
            name, value
        )));
    }
    Ok(())
}

fn check_unit(name: &str, value: f32) -> Result<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(EngineError::invalid(format!("{} must be within [0, 1], got {}", name, value)));
    }
    Ok(())
}

/// Thread-safe request to reset an engine on its next frame.
#[derive(Debug, Clone, Default)]
pub struct ResetHandle {
    requested: Arc<AtomicBool>,
}

impl ResetHandle {
    pub fn request(&self) {
        self.requested.store(true, Ordering::Release);
    }

    pub fn is_pending(&self) -> bool {
        self.requested.load(Ordering::Acquire)
    }

    fn take(&self) -> bool {
        self.requested.swap(false, Ordering::AcqRel)
    }
}

/// Commands emitted, by kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandCounts {
    pub move_left: u64,
    pub move_right: u64,
    pub rotate: u64,
    pub fast_drop_step: u64,
}

impl CommandCounts {
    fn record(&mut self, command: Command) {
        match command {
            Command::MoveLeft => self.move_left += 1,
            Command::MoveRight => self.move_right += 1,
            Command::Rotate => self.rotate += 1,
            Command::FastDropStep => self.fast_drop_step += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.move_left + self.move_right + self.rotate + self.fast_drop_step
    }
}

/// Per-session counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineStats {
    pub frames_seen: u64,
    pub valid_frames: u64,
    /// Commands sent to the game, whatever it made of them.
    pub commands: CommandCounts,
    /// Moves the game refused.
    pub blocked_moves: u64,
    /// Collaborator calls that failed.
    pub failed_calls: u64,
    /// Commands dropped because the game was not running.
    pub suppressed_commands: u64,
    pub detection_losses: u64,
}

/// Everything that happened while processing one frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameReport {
    pub timestamp_ms: u64,
    pub detection: DetectionStatus,
    pub calibration: CalibrationStatus,
    pub events: Vec<HostEvent>,
    pub command: Option<Command>,
    pub outcome: Option<DispatchOutcome>,
}

impl FrameReport {
    /// Serialize for host telemetry.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// The command, if the game actually applied it.
    pub fn applied_command(&self) -> Option<Command> {
        match (&self.command, &self.outcome) {
            (Some(command), Some(DispatchOutcome::Applied)) => Some(*command),
            _ => None,
        }
    }
}

/// The gesture recognition and arbitration engine.
pub struct GestureEngine {
    config: EngineConfig,

    // Stages
    health: DetectionHealthMonitor,
    calibration: CalibrationUnit,
    head_shake: HeadShakeDetector,
    hands: HandTracker,
    arbiter: ActionArbiter,
    fast_drop: FastDropController,
    continuous: ContinuousMoveController,

    last_piece: Option<PieceId>,
    reset_handle: ResetHandle,
    stats: EngineStats,
}

impl GestureEngine {
    /// Create an engine after validating `config`.
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    /// Create an engine with the tuned defaults.
    pub fn with_defaults() -> Self {
        Self::build(EngineConfig::default())
    }

    fn build(config: EngineConfig) -> Self {
        Self {
            health: DetectionHealthMonitor::new(config.detection.clone()),
            calibration: CalibrationUnit::new(config.calibration.clone()),
            head_shake: HeadShakeDetector::new(&config.classifier),
            hands: HandTracker::new(&config.classifier),
            arbiter: ActionArbiter::new(&config.arbiter),
            fast_drop: FastDropController::new(&config.controller),
            continuous: ContinuousMoveController::new(&config.controller),
            config,
            last_piece: None,
            reset_handle: ResetHandle::default(),
            stats: EngineStats::default(),
        }
    }

    /// Process one frame and dispatch at most one command to `game`.
    ///
    /// Never fails: missing landmarks skip stages and collaborator failures
    /// are reported in the returned `FrameReport`.
    pub fn process_frame<G: GameCollaborator + ?Sized>(
        &mut self,
        frame: &PoseFrame,
        game: &mut G,
    ) -> FrameReport {
        if self.reset_handle.take() {
            self.reset();
        }

        let now_ms = frame.timestamp_ms;
        self.stats.frames_seen += 1;

        let valid = frame.is_valid_detection();
        let detection = self.health.on_frame(valid);
        let mut report = FrameReport {
            timestamp_ms: now_ms,
            detection,
            calibration: self.calibration.status(false),
            events: Vec::new(),
            command: None,
            outcome: None,
        };

        if detection.changed {
            report.events.push(HostEvent::DetectionChanged {
                detected: detection.detected,
            });
            if !detection.detected {
                self.stats.detection_losses += 1;
                self.clear_gesture_state();
            }
        }

        if !valid {
            return report;
        }
        self.stats.valid_frames += 1;

        if !self.calibration.is_complete() {
            let status = self.calibration.accumulate(&frame.landmarks);
            report.calibration = status;
            if status.just_completed {
                report.events.push(HostEvent::CalibrationComplete);
            }
            return report;
        }
        let Some(baseline) = self.calibration.baseline().copied() else {
            return report;
        };

        self.track_piece(game.current_piece_id(), now_ms);
        let signals = self.classify(&frame.landmarks, &baseline, now_ms);

        let Some(command) = self.arbiter.decide(
            &signals,
            now_ms,
            &mut self.continuous,
            &mut self.fast_drop,
            self.last_piece,
        ) else {
            return report;
        };

        let outcome = if game.is_running() {
            dispatch(game, command)
        } else {
            self.continuous.cancel();
            self.fast_drop.cancel();
            DispatchOutcome::Suppressed
        };
        self.record_outcome(command, &outcome, now_ms);

        report.command = Some(command);
        report.outcome = Some(outcome);
        report
    }

    fn track_piece(&mut self, current: Option<PieceId>, now_ms: u64) {
        if current != self.last_piece {
            debug!("Active piece changed {:?} -> {:?}", self.last_piece, current);
            self.fast_drop.release_piece(self.last_piece, now_ms);
            self.last_piece = current;
        }
    }

    fn classify(&mut self, landmarks: &LandmarkSet, baseline: &Baseline, now_ms: u64) -> GestureSignals {
        let config = &self.config.classifier;

        // Valid detections always carry the nose.
        let Some(nose) = landmarks.get(LandmarkId::Nose) else {
            return GestureSignals::default();
        };
        let shake = self
            .head_shake
            .observe(TrackedPoint::new(nose.x, nose.y, now_ms));

        for hand in [Hand::Left, Hand::Right] {
            if let Some(wrist) = landmarks.wrist(hand) {
                self.hands
                    .record(hand, TrackedPoint::new(wrist.x, wrist.y, now_ms));
            }
        }

        let left = read_hand(Hand::Left, landmarks, baseline, config);
        let right = read_hand(Hand::Right, landmarks, baseline, config);
        let both_up = match (&left, &right) {
            (Some(l), Some(r)) => Some(are_both_hands_up(l, r, config)),
            _ => None,
        };

        GestureSignals {
            left,
            right,
            both_up,
            left_stable: self.hands.is_stable(Hand::Left),
            right_stable: self.hands.is_stable(Hand::Right),
            shake,
        }
    }

    fn record_outcome(&mut self, command: Command, outcome: &DispatchOutcome, now_ms: u64) {
        match outcome {
            DispatchOutcome::Suppressed => {
                self.stats.suppressed_commands += 1;
                return;
            }
            DispatchOutcome::Applied => {}
            DispatchOutcome::Blocked => self.stats.blocked_moves += 1,
            DispatchOutcome::Failed(_) => self.stats.failed_calls += 1,
        }
        self.stats.commands.record(command);
        debug!("Dispatched {} -> {:?}", command.as_str(), outcome);

        // A refused or failed drop means the piece has landed.
        if command == Command::FastDropStep && !outcome.is_applied() {
            self.fast_drop.on_drop_failed(now_ms);
        }
    }

    /// The game placed its active piece; forget any drop binding.
    pub fn on_piece_placed(&mut self) {
        if self.fast_drop.is_armed() || self.fast_drop.shake_start_ms().is_some() {
            debug!("Piece placed: clearing fast drop state");
        }
        self.fast_drop.cancel();
    }

    /// Clear windows, gesture states and timers. The baseline is kept.
    fn clear_gesture_state(&mut self) {
        self.head_shake.reset();
        self.hands.reset();
        self.arbiter.reset();
        self.fast_drop.cancel();
        self.continuous.cancel();
    }

    /// Start a new calibration session: clears baseline, windows, timers
    /// and counters. The next accepted frame is calibration frame zero.
    pub fn reset(&mut self) {
        info!("Engine reset; recalibrating");
        self.calibration.reset();
        self.health.reset();
        self.clear_gesture_state();
        self.last_piece = None;
        self.stats = EngineStats::default();
    }

    /// A handle other threads can use to request a reset.
    pub fn reset_handle(&self) -> ResetHandle {
        self.reset_handle.clone()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn is_calibrated(&self) -> bool {
        self.calibration.is_complete()
    }

    pub fn baseline(&self) -> Option<&Baseline> {
        self.calibration.baseline()
    }

    pub fn calibration_status(&self) -> CalibrationStatus {
        self.calibration.status(false)
    }

    pub fn detection_status(&self) -> DetectionStatus {
        self.health.status(false)
    }

    pub fn shake_state(&self) -> ShakeState {
        self.head_shake.state()
    }

    pub fn fast_drop(&self) -> &FastDropController {
        &self.fast_drop
    }

    pub fn continuous_move(&self) -> &ContinuousMoveController {
        &self.continuous
    }

    pub fn stats(&self) -> &EngineStats {
        &self.stats
    }
}

impl Default for GestureEngine {
    fn default() -> Self {
        Self::with_defaults()
    }
}
