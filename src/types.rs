//! Core data types for the pose gesture engine.
//!
//! These types form the contract between the external landmark producer,
//! the recognition stages, and the game collaborator. Every concept that
//! crosses a module boundary gets a named type; raw tuples stay private.
//!
//! Coordinates follow the producer's convention: `x` and `y` are normalized
//! to [0, 1] in frame space with image-Y growing downward, `z` is relative
//! depth, and `visibility` is the producer's confidence in [0, 1].

use serde::{Deserialize, Serialize};

/// Identifiers of the body points the engine consumes.
///
/// The producer may report many more keypoints; only these five are read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LandmarkId {
    Nose,
    LeftShoulder,
    RightShoulder,
    LeftWrist,
    RightWrist,
}

impl LandmarkId {
    /// All tracked identifiers, in storage order.
    pub const ALL: [LandmarkId; 5] = [
        LandmarkId::Nose,
        LandmarkId::LeftShoulder,
        LandmarkId::RightShoulder,
        LandmarkId::LeftWrist,
        LandmarkId::RightWrist,
    ];

    fn index(self) -> usize {
        match self {
            LandmarkId::Nose => 0,
            LandmarkId::LeftShoulder => 1,
            LandmarkId::RightShoulder => 2,
            LandmarkId::LeftWrist => 3,
            LandmarkId::RightWrist => 4,
        }
    }
}

/// A single normalized keypoint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub z: f32,
    #[serde(default = "full_visibility")]
    pub visibility: f32,
}

fn full_visibility() -> f32 {
    1.0
}

impl Landmark {
    /// Creates a fully visible landmark at depth zero.
    pub fn new(x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            z: 0.0,
            visibility: 1.0,
        }
    }

    /// Creates a landmark with an explicit visibility score.
    pub fn with_visibility(x: f32, y: f32, visibility: f32) -> Self {
        Self {
            x,
            y,
            z: 0.0,
            visibility,
        }
    }
}

/// The keypoints reported for one frame.
///
/// Each identifier has an explicit presence slot. An empty set means the
/// producer saw nobody this frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LandmarkSet {
    points: [Option<Landmark>; 5],
}

impl LandmarkSet {
    /// A set with no points present.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, id: LandmarkId, landmark: Landmark) -> Self {
        self.set(id, landmark);
        self
    }

    pub fn set(&mut self, id: LandmarkId, landmark: Landmark) {
        self.points[id.index()] = Some(landmark);
    }

    pub fn remove(&mut self, id: LandmarkId) {
        self.points[id.index()] = None;
    }

    pub fn get(&self, id: LandmarkId) -> Option<&Landmark> {
        self.points[id.index()].as_ref()
    }

    pub fn contains(&self, id: LandmarkId) -> bool {
        self.points[id.index()].is_some()
    }

    /// True when no point at all is present.
    pub fn is_empty(&self) -> bool {
        self.points.iter().all(Option::is_none)
    }

    /// Whether the frame shows a body: nose and both shoulders present.
    pub fn has_body(&self) -> bool {
        self.contains(LandmarkId::Nose)
            && self.contains(LandmarkId::LeftShoulder)
            && self.contains(LandmarkId::RightShoulder)
    }

    /// The wrist for the given hand, if reported.
    pub fn wrist(&self, hand: Hand) -> Option<&Landmark> {
        self.get(hand.wrist())
    }
}

/// One frame delivered by the landmark producer.
///
/// `timestamp_ms` must be monotonic across a session; every temporal rule in
/// the engine is measured against it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PoseFrame {
    pub timestamp_ms: u64,
    #[serde(default)]
    pub landmarks: LandmarkSet,
}

impl PoseFrame {
    pub fn new(timestamp_ms: u64, landmarks: LandmarkSet) -> Self {
        Self {
            timestamp_ms,
            landmarks,
        }
    }

    /// A frame in which the producer detected nothing.
    pub fn empty(timestamp_ms: u64) -> Self {
        Self {
            timestamp_ms,
            landmarks: LandmarkSet::empty(),
        }
    }

    pub fn is_valid_detection(&self) -> bool {
        self.landmarks.has_body()
    }
}

/// Which of the user's hands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Hand {
    Left,
    Right,
}

impl Hand {
    pub fn wrist(self) -> LandmarkId {
        match self {
            Hand::Left => LandmarkId::LeftWrist,
            Hand::Right => LandmarkId::RightWrist,
        }
    }

    pub fn shoulder(self) -> LandmarkId {
        match self {
            Hand::Left => LandmarkId::LeftShoulder,
            Hand::Right => LandmarkId::RightShoulder,
        }
    }

    pub fn other(self) -> Hand {
        match self {
            Hand::Left => Hand::Right,
            Hand::Right => Hand::Left,
        }
    }

    /// The directional move a raise of this hand requests.
    pub fn move_command(self) -> Command {
        match self {
            Hand::Left => Command::MoveLeft,
            Hand::Right => Command::MoveRight,
        }
    }
}

/// A discrete game command. Consumed once by the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    MoveLeft,
    MoveRight,
    Rotate,
    FastDropStep,
}

impl Command {
    pub fn as_str(&self) -> &'static str {
        match self {
            Command::MoveLeft => "move-left",
            Command::MoveRight => "move-right",
            Command::Rotate => "rotate",
            Command::FastDropStep => "fast-drop-step",
        }
    }
}

/// Opaque identifier of the game's active falling piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PieceId(pub u64);

/// Notifications for the host application.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum HostEvent {
    /// Fired exactly once per calibration session.
    CalibrationComplete,
    /// Fired on each edge of the detected flag, never repeatedly.
    DetectionChanged { detected: bool },
}
