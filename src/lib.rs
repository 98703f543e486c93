//! Pose Gesture Engine Library
//!
//! Turns a stream of noisy per-frame pose landmarks into a small set of
//! discrete falling-block game commands: move left, move right, rotate and
//! fast drop.
//!
//! # Design Philosophy
//!
//! - **Debounce before acting**: every command needs an edge or a sustained,
//!   confirmed signal. A single noisy frame never moves a piece.
//! - **One command per frame**: competing gestures are resolved by a fixed
//!   priority, never by emitting several commands at once.
//! - **Tolerate loss**: missing landmarks skip stages rather than failing,
//!   and detection loss is declared slowly but recovered immediately.
//! - **Adapt to the user**: thresholds are measured against a per-session
//!   calibration baseline.
//!
//! # Example
//!
//! ```ignore
//! use pose_gesture::{GestureEngine, PoseFrame};
//!
//! let mut engine = GestureEngine::with_defaults();
//! for frame in frames {
//!     let report = engine.process_frame(&frame, &mut game);
//!     for event in &report.events {
//!         host.notify(event);
//!     }
//! }
//! ```

pub mod arbiter;
pub mod calibration;
pub mod classifiers;
pub mod controllers;
pub mod detection_health;
pub mod error;
pub mod game;
pub mod history;
pub mod pipeline;
pub mod types;


// Re-export commonly used types
pub use calibration::{Baseline, CalibrationStatus};
pub use detection_health::{DetectionStatus, TrackingHint};
pub use error::EngineError;
pub use game::{DispatchOutcome, GameCollaborator, GameError};
pub use pipeline::{EngineConfig, EngineStats, FrameReport, GestureEngine, ResetHandle};
pub use types::{
    Command, Hand, HostEvent, Landmark, LandmarkId, LandmarkSet, PieceId, PoseFrame,
};
