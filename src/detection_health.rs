//! Detection health monitoring.
//!
//! Tracks whether the landmark producer is still seeing the user. Loss is
//! declared slowly (a long run of misses and a low recent success rate)
//! while recovery is immediate on the first valid frame. Between the two,
//! a missed frame only produces a soft "face the camera" hint.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Parameters for loss/recovery hysteresis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Number of recent frame outcomes kept for the success rate.
    pub recent_window: usize,
    /// Consecutive misses required before loss can be declared.
    pub max_consecutive_failures: u32,
    /// Loss additionally requires the recent success rate below this.
    pub min_success_rate: f32,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            recent_window: 10,
            max_consecutive_failures: 30,
            min_success_rate: 0.2,
        }
    }
}

/// User-facing tracking state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackingHint {
    /// The last frame was a valid detection.
    Tracking,
    /// Recent misses, but loss has not been declared. Ask the user to face the camera.
    FaceCamera,
    /// Detection is declared lost.
    Lost,
}

/// Result of one health update.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectionStatus {
    pub detected: bool,
    pub hint: TrackingHint,
    pub consecutive_failures: u32,
    pub success_rate: f32,
    /// True only on the frame where `detected` flipped.
    pub changed: bool,
}

/// Consecutive-failure counter plus a bounded window of recent outcomes.
#[derive(Debug, Clone)]
pub struct DetectionHealthMonitor {
    config: DetectionConfig,
    recent: VecDeque<bool>,
    consecutive_failures: u32,
    detected: bool,
    hint: TrackingHint,
}

impl DetectionHealthMonitor {
    /// Starts in the detected state; loss has to be earned.
    pub fn new(config: DetectionConfig) -> Self {
        let capacity = config.recent_window.max(1);
        Self {
            config,
            recent: VecDeque::with_capacity(capacity),
            consecutive_failures: 0,
            detected: true,
            hint: TrackingHint::Tracking,
        }
    }

    /// Record whether this frame carried a valid sample.
    pub fn on_frame(&mut self, has_valid_sample: bool) -> DetectionStatus {
        if self.recent.len() >= self.config.recent_window.max(1) {
            self.recent.pop_front();
        }
        self.recent.push_back(has_valid_sample);

        let mut changed = false;

        if has_valid_sample {
            self.consecutive_failures = 0;
            if !self.detected {
                self.detected = true;
                changed = true;
                info!("Detection regained");
            }
            self.hint = TrackingHint::Tracking;
        } else {
            self.consecutive_failures = self.consecutive_failures.saturating_add(1);
            let rate = self.success_rate();
            if self.detected
                && self.consecutive_failures >= self.config.max_consecutive_failures
                && rate < self.config.min_success_rate
            {
                self.detected = false;
                changed = true;
                info!(
                    "Detection lost after {} consecutive misses (success rate {:.2})",
                    self.consecutive_failures, rate
                );
            } else if self.detected && self.consecutive_failures == 1 {
                debug!("Frame without a valid sample; asking user to face the camera");
            }
            self.hint = if self.detected {
                TrackingHint::FaceCamera
            } else {
                TrackingHint::Lost
            };
        }

        self.status(changed)
    }

    /// Fraction of valid frames in the recent window (1.0 when empty).
    pub fn success_rate(&self) -> f32 {
        if self.recent.is_empty() {
            return 1.0;
        }
        let ok = self.recent.iter().filter(|v| **v).count();
        ok as f32 / self.recent.len() as f32
    }

    pub fn is_detected(&self) -> bool {
        self.detected
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn status(&self, changed: bool) -> DetectionStatus {
        DetectionStatus {
            detected: self.detected,
            hint: self.hint,
            consecutive_failures: self.consecutive_failures,
            success_rate: self.success_rate(),
            changed,
        }
    }

    /// Clear the counters and the recent window.
    ///
    /// The detected flag survives so that a loss announced before the reset
    /// is still answered by a regained edge on the next valid frame.
    pub fn reset(&mut self) {
        self.recent.clear();
        self.consecutive_failures = 0;
        self.hint = if self.detected {
            TrackingHint::Tracking
        } else {
            TrackingHint::Lost
        };
    }
}
