//! Gesture classifiers.
//!
//! Per-frame evaluators over the current landmarks, the calibration
//! baseline and the sliding windows:
//! - Hand raise: wrist sufficiently above the calibrated shoulder
//! - Hand visibility: confident detection inside the inner frame margin
//! - Both hands up: both hands visible and raised
//! - Head shake: wide, high-variance horizontal nose motion sustained over
//!   consecutive frames
//! - Hand stability: low positional variance over the newest hand samples
//!
//! The raise and visibility checks are pure functions. The head-shake
//! detector and hand tracker own the windows they read, but each call only
//! mutates that detector's own history.

use serde::{Deserialize, Serialize};

use crate::calibration::Baseline;
use crate::history::{Axis, SlidingWindow, TrackedPoint};
use crate::types::{Hand, Landmark, LandmarkSet};

/// Thresholds for every classifier.
///
/// All distances are in normalized frame units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Minimum (shoulder_y - wrist_y) for a hand to count as raised.
    /// Image-Y grows downward, so larger means higher.
    pub raise_threshold: f32,

    /// Visibility score a wrist must exceed to be usable.
    pub visibility_threshold: f32,

    /// Inner frame margin: positions outside [min, max] on either axis are
    /// rejected as likely partial detections.
    pub frame_margin_min: f32,
    pub frame_margin_max: f32,

    /// Optional limit on the height difference between the two wrists for
    /// both-hands-up. `None` leaves the gesture unconstrained, which is the
    /// tuned behavior.
    pub max_height_difference: Option<f32>,

    /// Head window capacity (samples).
    pub head_window: usize,
    /// Hand window capacity (samples).
    pub hand_window: usize,

    /// Head-shake: minimum x range across the head window.
    pub shake_min_range: f32,
    /// Head-shake: minimum x variance across the head window.
    pub shake_min_variance: f32,
    /// Consecutive shaking frames needed to confirm a shake.
    pub shake_confirm_frames: u32,

    /// Newest hand samples used for stability.
    pub stability_samples: usize,
    /// Per-axis variance below which a hand counts as stable.
    pub stability_max_variance: f32,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            raise_threshold: 0.12,
            visibility_threshold: 0.6,
            frame_margin_min: 0.05,
            frame_margin_max: 0.95,
            max_height_difference: None,
            head_window: 20,
            hand_window: 10,
            shake_min_range: 0.08,
            shake_min_variance: 0.001,
            shake_confirm_frames: 12,
            stability_samples: 5,
            stability_max_variance: 0.01,
        }
    }
}

// ── Hand classifiers ───────────────────────────────────────

/// Whether a wrist sits above the shoulder by more than `threshold`.
pub fn is_hand_raised(shoulder_y: f32, wrist_y: f32, threshold: f32) -> bool {
    (shoulder_y - wrist_y) > threshold
}

/// Whether a wrist detection is trustworthy enough to drive a gesture.
pub fn is_hand_visible(wrist: &Landmark, config: &ClassifierConfig) -> bool {
    let inside = |v: f32| v >= config.frame_margin_min && v <= config.frame_margin_max;
    wrist.visibility > config.visibility_threshold && inside(wrist.x) && inside(wrist.y)
}

/// Classification of one hand for the current frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HandReading {
    pub raised: bool,
    pub visible: bool,
    pub wrist_y: f32,
}

impl HandReading {
    /// A hand drives gestures only when it is both visible and raised.
    pub fn is_up(&self) -> bool {
        self.raised && self.visible
    }
}

/// Classify one hand. `None` when its wrist is missing from the frame.
pub fn read_hand(
    hand: Hand,
    landmarks: &LandmarkSet,
    baseline: &Baseline,
    config: &ClassifierConfig,
) -> Option<HandReading> {
    let wrist = landmarks.wrist(hand)?;
    let shoulder_y = baseline.shoulder(hand).y;
    Some(HandReading {
        raised: is_hand_raised(shoulder_y, wrist.y, config.raise_threshold),
        visible: is_hand_visible(wrist, config),
        wrist_y: wrist.y,
    })
}

/// Both hands visible and raised, within the optional height constraint.
pub fn are_both_hands_up(left: &HandReading, right: &HandReading, config: &ClassifierConfig) -> bool {
    if !(left.is_up() && right.is_up()) {
        return false;
    }
    match config.max_height_difference {
        Some(limit) => (left.wrist_y - right.wrist_y).abs() <= limit,
        None => true,
    }
}

// ── Head shake ─────────────────────────────────────────────

/// Output of the head-shake detector for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ShakeState {
    /// The instantaneous shake condition held this frame.
    pub shaking_now: bool,
    /// Consecutive frames the instantaneous condition has held.
    pub consecutive_frames: u32,
    /// The shake has been sustained long enough to act on.
    pub confirmed: bool,
}

/// Two-stage head-shake detector: an instantaneous range/variance test
/// followed by a consecutive-frame confirmation count.
#[derive(Debug, Clone)]
pub struct HeadShakeDetector {
    window: SlidingWindow,
    state: ShakeState,
    min_range: f32,
    min_variance: f32,
    confirm_frames: u32,
}

impl HeadShakeDetector {
    pub fn new(config: &ClassifierConfig) -> Self {
        Self {
            window: SlidingWindow::new(config.head_window),
            state: ShakeState::default(),
            min_range: config.shake_min_range,
            min_variance: config.shake_min_variance,
            confirm_frames: config.shake_confirm_frames.max(1),
        }
    }

    /// Evaluate the shake condition, then record the head position.
    ///
    /// The condition is tested over the full window of frames preceding this
    /// one, so a shaking stream first confirms after `window + confirm`
    /// frames.
    pub fn observe(&mut self, head: TrackedPoint) -> ShakeState {
        let shaking_now = self.window.is_full() && self.window_shows_shake();
        self.window.push(head);

        if shaking_now {
            self.state.consecutive_frames = self.state.consecutive_frames.saturating_add(1);
        } else {
            self.state.consecutive_frames = 0;
        }
        self.state.shaking_now = shaking_now;
        self.state.confirmed = self.state.consecutive_frames >= self.confirm_frames;
        self.state
    }

    fn window_shows_shake(&self) -> bool {
        match (self.window.range(Axis::X), self.window.variance(Axis::X)) {
            (Some(range), Some(variance)) => range > self.min_range && variance > self.min_variance,
            _ => false,
        }
    }

    pub fn state(&self) -> ShakeState {
        self.state
    }

    pub fn window(&self) -> &SlidingWindow {
        &self.window
    }

    pub fn reset(&mut self) {
        self.window.clear();
        self.state = ShakeState::default();
    }
}

// ── Hand history / stability ───────────────────────────────

/// Position history for both wrists, used for stability checks.
#[derive(Debug, Clone)]
pub struct HandTracker {
    left: SlidingWindow,
    right: SlidingWindow,
    stability_samples: usize,
    stability_max_variance: f32,
}

impl HandTracker {
    pub fn new(config: &ClassifierConfig) -> Self {
        Self {
            left: SlidingWindow::new(config.hand_window),
            right: SlidingWindow::new(config.hand_window),
            stability_samples: config.stability_samples.max(1),
            stability_max_variance: config.stability_max_variance,
        }
    }

    pub fn record(&mut self, hand: Hand, point: TrackedPoint) {
        self.window_mut(hand).push(point);
    }

    /// Stable when the newest samples vary less than the limit on both axes.
    /// Too few samples means not stable.
    pub fn is_stable(&self, hand: Hand) -> bool {
        let window = self.window(hand);
        let n = self.stability_samples;
        match (
            window.recent_variance(Axis::X, n),
            window.recent_variance(Axis::Y, n),
        ) {
            (Some(vx), Some(vy)) => {
                vx < self.stability_max_variance && vy < self.stability_max_variance
            }
            _ => false,
        }
    }

    pub fn window(&self, hand: Hand) -> &SlidingWindow {
        match hand {
            Hand::Left => &self.left,
            Hand::Right => &self.right,
        }
    }

    fn window_mut(&mut self, hand: Hand) -> &mut SlidingWindow {
        match hand {
            Hand::Left => &mut self.left,
            Hand::Right => &mut self.right,
        }
    }

    pub fn reset(&mut self) {
        self.left.clear();
        self.right.clear();
    }
}
