//! Action arbitration.
//!
//! Merges the per-frame classifier signals and the temporal controllers
//! into at most one command per frame. Priority, highest first:
//!
//! 1. Rotate on the rising edge of both-hands-up
//! 2. Directional move on a single hand's down→up edge (cooldown gated)
//! 3. Continuous repeat for a single hand held up
//! 4. Fast-drop step
//!
//! Rotation and repeat ticks bypass the cooldown gate. Rotation still
//! starts a cooldown window, since it is a discrete action.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::classifiers::{HandReading, ShakeState};
use crate::controllers::{ContinuousMoveController, FastDropController};
use crate::types::{Command, Hand, PieceId};

/// Parameters for arbitration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArbiterConfig {
    /// Minimum spacing after a discrete action before the next edge move.
    pub cooldown_ms: u64,
}

impl Default for ArbiterConfig {
    fn default() -> Self {
        Self { cooldown_ms: 150 }
    }
}

/// Whether a hand is currently driving a gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GesturePhase {
    Up,
    Down,
}

/// Current and previous phase of one hand, for edge detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandGestureState {
    current: GesturePhase,
    previous: GesturePhase,
    /// False until a reading has been seen since the last reset. The first
    /// reading sets both phases, so it can never be an edge.
    seeded: bool,
}

impl HandGestureState {
    /// Starts down, so a raise on the first frame is an edge.
    pub fn new() -> Self {
        Self {
            current: GesturePhase::Down,
            previous: GesturePhase::Down,
            seeded: true,
        }
    }

    /// Phase unknown: the next reading is adopted without an edge.
    pub fn unseeded() -> Self {
        Self {
            seeded: false,
            ..Self::new()
        }
    }

    /// Advance one frame. `None` (wrist not reported) keeps the phase.
    pub fn update(&mut self, up: Option<bool>) {
        self.previous = self.current;
        if let Some(up) = up {
            let phase = if up { GesturePhase::Up } else { GesturePhase::Down };
            if !self.seeded {
                self.previous = phase;
                self.seeded = true;
            }
            self.current = phase;
        }
    }

    pub fn phase(&self) -> GesturePhase {
        self.current
    }

    pub fn is_up(&self) -> bool {
        self.current == GesturePhase::Up
    }

    /// Down on the previous frame, up on this one.
    pub fn just_raised(&self) -> bool {
        self.previous == GesturePhase::Down && self.current == GesturePhase::Up
    }
}

impl Default for HandGestureState {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything the classifiers concluded about one frame.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GestureSignals {
    /// `None` when the wrist was not reported.
    pub left: Option<HandReading>,
    pub right: Option<HandReading>,
    /// `None` when either wrist was not reported.
    pub both_up: Option<bool>,
    pub left_stable: bool,
    pub right_stable: bool,
    pub shake: ShakeState,
}

impl GestureSignals {
    pub fn reading(&self, hand: Hand) -> Option<&HandReading> {
        match hand {
            Hand::Left => self.left.as_ref(),
            Hand::Right => self.right.as_ref(),
        }
    }

    pub fn is_stable(&self, hand: Hand) -> bool {
        match hand {
            Hand::Left => self.left_stable,
            Hand::Right => self.right_stable,
        }
    }
}

/// Resolves competing gesture signals into one command per frame.
#[derive(Debug, Clone)]
pub struct ActionArbiter {
    cooldown_ms: u64,
    cooldown_until_ms: u64,
    left: HandGestureState,
    right: HandGestureState,
    both_up: bool,
    both_up_seeded: bool,
    /// Hand whose raise was swallowed by the cooldown. It stays inert
    /// until lowered.
    swallowed: Option<Hand>,
}

impl ActionArbiter {
    pub fn new(config: &ArbiterConfig) -> Self {
        Self {
            cooldown_ms: config.cooldown_ms,
            cooldown_until_ms: 0,
            left: HandGestureState::new(),
            right: HandGestureState::new(),
            both_up: false,
            both_up_seeded: true,
            swallowed: None,
        }
    }

    /// Update gesture states from this frame's signals without deciding.
    ///
    /// Returns true on the rising edge of both-hands-up.
    pub fn track(&mut self, signals: &GestureSignals) -> bool {
        self.left.update(signals.left.map(|r| r.is_up()));
        self.right.update(signals.right.map(|r| r.is_up()));

        let was_both_up = self.both_up;
        if let Some(both_up) = signals.both_up {
            self.both_up = both_up;
            if !self.both_up_seeded {
                self.both_up_seeded = true;
                return false;
            }
        }
        self.both_up && !was_both_up
    }

    /// Decide this frame's command.
    pub fn decide(
        &mut self,
        signals: &GestureSignals,
        now_ms: u64,
        continuous: &mut ContinuousMoveController,
        fast_drop: &mut FastDropController,
        current_piece: Option<PieceId>,
    ) -> Option<Command> {
        let rotate_edge = self.track(signals);

        let hand_command = if rotate_edge {
            continuous.cancel();
            self.cooldown_until_ms = now_ms.saturating_add(self.cooldown_ms);
            debug!("Both hands raised: rotate");
            Some(Command::Rotate)
        } else if self.both_up {
            continuous.cancel();
            None
        } else {
            self.single_hand(signals, now_ms, continuous)
        };

        // The drop timers advance every frame, even when a hand command wins.
        let drop_due = fast_drop.update(signals.shake.confirmed, now_ms, current_piece);

        if hand_command.is_some() {
            return hand_command;
        }
        if drop_due {
            fast_drop.record_step(now_ms);
            return Some(Command::FastDropStep);
        }
        None
    }

    fn single_hand(
        &mut self,
        signals: &GestureSignals,
        now_ms: u64,
        continuous: &mut ContinuousMoveController,
    ) -> Option<Command> {
        let hand = match (self.left.is_up(), self.right.is_up()) {
            (true, false) => Hand::Left,
            (false, true) => Hand::Right,
            _ => {
                continuous.cancel();
                self.swallowed = None;
                return None;
            }
        };
        if self.swallowed.is_some_and(|h| h != hand) {
            self.swallowed = None;
        }

        if self.state(hand).just_raised() {
            if now_ms < self.cooldown_until_ms {
                debug!(
                    "{:?} raise ignored: cooldown active for {}ms",
                    hand,
                    self.cooldown_until_ms - now_ms
                );
                continuous.cancel();
                self.swallowed = Some(hand);
                return None;
            }
            self.swallowed = None;
            continuous.begin(hand, now_ms);
            self.cooldown_until_ms = now_ms.saturating_add(self.cooldown_ms);
            debug!("{:?} hand raised: {}", hand, hand.move_command().as_str());
            return Some(hand.move_command());
        }

        if self.swallowed == Some(hand) {
            return None;
        }
        continuous.evaluate(hand, now_ms, signals.is_stable(hand))
    }

    pub fn state(&self, hand: Hand) -> &HandGestureState {
        match hand {
            Hand::Left => &self.left,
            Hand::Right => &self.right,
        }
    }

    pub fn both_up(&self) -> bool {
        self.both_up
    }

    pub fn cooldown_until_ms(&self) -> u64 {
        self.cooldown_until_ms
    }

    /// Forget timers and phases. Phases are re-read from the next frame
    /// that reports each hand, so a hand held up across the reset is not
    /// taken as a fresh raise.
    pub fn reset(&mut self) {
        self.cooldown_until_ms = 0;
        self.left = HandGestureState::unseeded();
        self.right = HandGestureState::unseeded();
        self.both_up = false;
        self.both_up_seeded = false;
        self.swallowed = None;
    }
}
