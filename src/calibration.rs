//! Per-user calibration.
//!
//! Averages the first N frames that show the calibration points (nose and
//! both shoulders) into a `Baseline`. Gesture detection is gated until the
//! baseline exists. Frames missing a calibration point are skipped without
//! counting, so intermittent occlusion only stretches wall-clock time.
//!
//! There is no outlier rejection: a single badly occluded frame skews the
//! baseline for the whole session.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::types::{Hand, Landmark, LandmarkId, LandmarkSet};

/// Parameters for calibration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Number of qualifying frames averaged into the baseline.
    pub frames: u32,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self { frames: 30 }
    }
}

/// Averaged position of one calibration point.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BaselinePoint {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// Reference body geometry for one calibration session.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Baseline {
    pub left_shoulder: BaselinePoint,
    pub right_shoulder: BaselinePoint,
    pub nose: BaselinePoint,
}

impl Baseline {
    pub fn shoulder(&self, hand: Hand) -> &BaselinePoint {
        match hand {
            Hand::Left => &self.left_shoulder,
            Hand::Right => &self.right_shoulder,
        }
    }
}

/// Progress reported after every accumulation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalibrationStatus {
    pub frames_done: u32,
    pub total: u32,
    pub complete: bool,
    /// True only on the frame that completed calibration.
    pub just_completed: bool,
}

#[derive(Debug, Clone, Copy, Default)]
struct PointSum {
    x: f64,
    y: f64,
    z: f64,
}

impl PointSum {
    fn add(&mut self, landmark: &Landmark) {
        self.x += landmark.x as f64;
        self.y += landmark.y as f64;
        self.z += landmark.z as f64;
    }

    fn average(&self, count: u32) -> BaselinePoint {
        let n = count as f64;
        BaselinePoint {
            x: (self.x / n) as f32,
            y: (self.y / n) as f32,
            z: (self.z / n) as f32,
        }
    }
}

/// Accumulates calibration frames and owns the resulting baseline.
#[derive(Debug, Clone)]
pub struct CalibrationUnit {
    config: CalibrationConfig,
    frames_done: u32,
    left_shoulder: PointSum,
    right_shoulder: PointSum,
    nose: PointSum,
    baseline: Option<Baseline>,
}

impl CalibrationUnit {
    pub fn new(config: CalibrationConfig) -> Self {
        Self {
            config,
            frames_done: 0,
            left_shoulder: PointSum::default(),
            right_shoulder: PointSum::default(),
            nose: PointSum::default(),
            baseline: None,
        }
    }

    /// Feed one frame's landmarks.
    ///
    /// A no-op after completion, and for frames missing any calibration point.
    pub fn accumulate(&mut self, landmarks: &LandmarkSet) -> CalibrationStatus {
        if self.baseline.is_some() {
            return self.status(false);
        }

        let (Some(nose), Some(left), Some(right)) = (
            landmarks.get(LandmarkId::Nose),
            landmarks.get(LandmarkId::LeftShoulder),
            landmarks.get(LandmarkId::RightShoulder),
        ) else {
            return self.status(false);
        };

        self.nose.add(nose);
        self.left_shoulder.add(left);
        self.right_shoulder.add(right);
        self.frames_done += 1;

        if self.frames_done < self.total() {
            debug!(
                "Calibration frame {}/{}",
                self.frames_done,
                self.total()
            );
            return self.status(false);
        }

        let baseline = Baseline {
            left_shoulder: self.left_shoulder.average(self.frames_done),
            right_shoulder: self.right_shoulder.average(self.frames_done),
            nose: self.nose.average(self.frames_done),
        };
        info!(
            "Calibration complete: nose=({:.3}, {:.3}) shoulders y=({:.3}, {:.3})",
            baseline.nose.x, baseline.nose.y, baseline.left_shoulder.y, baseline.right_shoulder.y
        );
        self.baseline = Some(baseline);
        self.status(true)
    }

    pub fn baseline(&self) -> Option<&Baseline> {
        self.baseline.as_ref()
    }

    pub fn is_complete(&self) -> bool {
        self.baseline.is_some()
    }

    pub fn frames_done(&self) -> u32 {
        self.frames_done
    }

    pub fn total(&self) -> u32 {
        self.config.frames.max(1)
    }

    pub fn status(&self, just_completed: bool) -> CalibrationStatus {
        CalibrationStatus {
            frames_done: self.frames_done,
            total: self.total(),
            complete: self.baseline.is_some(),
            just_completed,
        }
    }

    /// Discard accumulated sums and the baseline.
    pub fn reset(&mut self) {
        *self = Self::new(self.config.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn calibration_pose() -> LandmarkSet {
        LandmarkSet::empty()
            .with(LandmarkId::Nose, Landmark::new(0.5, 0.3))
            .with(LandmarkId::LeftShoulder, Landmark::new(0.4, 0.5))
            .with(LandmarkId::RightShoulder, Landmark::new(0.6, 0.5))
    }

    #[test]
    fn test_baseline_equals_constant_input() {
        let mut unit = CalibrationUnit::new(CalibrationConfig::default());
        let pose = calibration_pose();

        let mut completions = 0;
        for _ in 0..30 {
            if unit.accumulate(&pose).just_completed {
                completions += 1;
            }
        }
        assert_eq!(completions, 1);

        let baseline = unit.baseline().expect("baseline after 30 frames");
        assert!((baseline.nose.x - 0.5).abs() < 1e-6);
        assert!((baseline.nose.y - 0.3).abs() < 1e-6);
        assert!((baseline.left_shoulder.x - 0.4).abs() < 1e-6);
        assert!((baseline.left_shoulder.y - 0.5).abs() < 1e-6);
        assert!((baseline.right_shoulder.x - 0.6).abs() < 1e-6);
        assert!((baseline.right_shoulder.y - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_fewer_frames_never_complete() {
        let mut unit = CalibrationUnit::new(CalibrationConfig::default());
        let pose = calibration_pose();
        for _ in 0..29 {
            let status = unit.accumulate(&pose);
            assert!(!status.complete);
        }
        assert!(unit.baseline().is_none());
        assert_eq!(unit.frames_done(), 29);
    }

    #[test]
    fn test_missing_points_do_not_count() {
        let mut unit = CalibrationUnit::new(CalibrationConfig { frames: 3 });
        let mut partial = calibration_pose();
        partial.remove(LandmarkId::RightShoulder);

        unit.accumulate(&calibration_pose());
        unit.accumulate(&partial);
        unit.accumulate(&LandmarkSet::empty());
        assert_eq!(unit.frames_done(), 1);

        unit.accumulate(&calibration_pose());
        let status = unit.accumulate(&calibration_pose());
        assert!(status.complete);
        assert!(status.just_completed);
    }

    #[test]
    fn test_averaging_mixed_frames() {
        let mut unit = CalibrationUnit::new(CalibrationConfig { frames: 2 });
        let near = calibration_pose().with(LandmarkId::Nose, Landmark::new(0.4, 0.2));
        let far = calibration_pose().with(LandmarkId::Nose, Landmark::new(0.6, 0.4));
        unit.accumulate(&near);
        unit.accumulate(&far);
        let nose = unit.baseline().unwrap().nose;
        assert!((nose.x - 0.5).abs() < 1e-6);
        assert!((nose.y - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_accumulate_after_completion_is_noop() {
        let mut unit = CalibrationUnit::new(CalibrationConfig { frames: 1 });
        assert!(unit.accumulate(&calibration_pose()).just_completed);

        let shifted = calibration_pose().with(LandmarkId::Nose, Landmark::new(0.9, 0.9));
        let status = unit.accumulate(&shifted);
        assert!(status.complete);
        assert!(!status.just_completed);
        assert_eq!(unit.frames_done(), 1);
        assert!((unit.baseline().unwrap().nose.x - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_reset_clears_baseline() {
        let mut unit = CalibrationUnit::new(CalibrationConfig { frames: 1 });
        unit.accumulate(&calibration_pose());
        unit.reset();
        assert!(!unit.is_complete());
        assert_eq!(unit.frames_done(), 0);
        unit.reset();
        assert!(!unit.is_complete());
    }
}
