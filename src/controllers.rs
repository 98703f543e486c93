//! Temporal controllers layered on top of classifier signals.
//!
//! - `FastDropController`: a confirmed head shake held for a qualification
//!   delay arms repeated one-row drops, bound to the piece that was active
//!   when it armed.
//! - `ContinuousMoveController`: a single raised hand held still for the
//!   hold threshold enters repeat mode.
//!
//! Both controllers are driven by caller-supplied timestamps. Neither
//! schedules anything; every deadline is a stored timestamp compared on
//! the next frame.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::{Command, Hand, PieceId};

/// Timing parameters for the temporal controllers (milliseconds).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Confirmed shaking required before fast-drop arms.
    pub fast_drop_delay_ms: u64,
    /// Minimum spacing between fast-drop steps.
    pub fast_drop_interval_ms: u64,
    /// Single-hand hold required before continuous mode.
    pub continuous_hold_ms: u64,
    /// Spacing between continuous-mode repeats.
    pub continuous_interval_ms: u64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            fast_drop_delay_ms: 500,
            fast_drop_interval_ms: 80,
            continuous_hold_ms: 800,
            continuous_interval_ms: 120,
        }
    }
}

// ── Fast drop ──────────────────────────────────────────────

/// Delay-then-repeat controller driven by a confirmed head shake.
///
/// The engine has no "piece locked" signal. Landing is inferred from the
/// bound piece id changing or a drop step failing; either disarms the
/// controller, and a still-running shake must qualify again before it
/// re-arms against the next piece.
#[derive(Debug, Clone)]
pub struct FastDropController {
    delay_ms: u64,
    interval_ms: u64,
    shake_start_ms: Option<u64>,
    armed: bool,
    bound_piece: Option<PieceId>,
    last_step_ms: Option<u64>,
}

impl FastDropController {
    pub fn new(config: &ControllerConfig) -> Self {
        Self {
            delay_ms: config.fast_drop_delay_ms,
            interval_ms: config.fast_drop_interval_ms,
            shake_start_ms: None,
            armed: false,
            bound_piece: None,
            last_step_ms: None,
        }
    }

    /// Advance the controller for one frame.
    ///
    /// Returns true when a drop step is due. The caller confirms emission
    /// with `record_step`.
    pub fn update(&mut self, confirmed: bool, now_ms: u64, current_piece: Option<PieceId>) -> bool {
        if !confirmed {
            if self.shake_start_ms.is_some() {
                debug!("Fast drop cleared: shake no longer confirmed");
            }
            self.cancel();
            return false;
        }

        if self.shake_start_ms.is_none() {
            debug!("Fast drop qualification started at {}ms", now_ms);
            self.shake_start_ms = Some(now_ms);
        }

        if self.armed && self.bound_piece != current_piece {
            debug!(
                "Fast drop disarmed: bound piece {:?} replaced by {:?}",
                self.bound_piece, current_piece
            );
            self.requalify(now_ms);
            return false;
        }

        if !self.armed {
            let start = self.shake_start_ms.unwrap_or(now_ms);
            if now_ms.saturating_sub(start) < self.delay_ms {
                return false;
            }
            let Some(piece) = current_piece else {
                return false;
            };
            self.armed = true;
            self.bound_piece = Some(piece);
            self.last_step_ms = None;
            debug!("Fast drop armed for piece {:?}", piece);
        }

        match self.last_step_ms {
            None => true,
            Some(last) => now_ms.saturating_sub(last) >= self.interval_ms,
        }
    }

    /// Mark a drop step as emitted.
    pub fn record_step(&mut self, now_ms: u64) {
        self.last_step_ms = Some(now_ms);
    }

    /// A drop attempt failed: the piece landed.
    pub fn on_drop_failed(&mut self, now_ms: u64) {
        if self.armed {
            debug!("Fast drop disarmed: piece {:?} cannot move down", self.bound_piece);
            self.requalify(now_ms);
        }
    }

    /// The game reported a piece change; drop any binding to `previous`.
    pub fn release_piece(&mut self, previous: Option<PieceId>, now_ms: u64) {
        if self.armed && self.bound_piece == previous {
            debug!("Fast drop released piece {:?}", previous);
            self.requalify(now_ms);
        }
    }

    /// Disarm and require a fresh qualification delay if shaking continues.
    fn requalify(&mut self, now_ms: u64) {
        self.armed = false;
        self.bound_piece = None;
        self.last_step_ms = None;
        if self.shake_start_ms.is_some() {
            self.shake_start_ms = Some(now_ms);
        }
    }

    /// Clear all state.
    pub fn cancel(&mut self) {
        self.shake_start_ms = None;
        self.armed = false;
        self.bound_piece = None;
        self.last_step_ms = None;
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    pub fn bound_piece(&self) -> Option<PieceId> {
        self.bound_piece
    }

    pub fn shake_start_ms(&self) -> Option<u64> {
        self.shake_start_ms
    }
}

// ── Continuous move ────────────────────────────────────────

/// Hold-then-repeat controller for a single raised hand.
#[derive(Debug, Clone)]
pub struct ContinuousMoveController {
    hold_ms: u64,
    interval_ms: u64,
    hand: Option<Hand>,
    hold_start_ms: Option<u64>,
    continuous: bool,
    last_fire_ms: u64,
}

impl ContinuousMoveController {
    pub fn new(config: &ControllerConfig) -> Self {
        Self {
            hold_ms: config.continuous_hold_ms,
            interval_ms: config.continuous_interval_ms,
            hand: None,
            hold_start_ms: None,
            continuous: false,
            last_fire_ms: 0,
        }
    }

    /// Start timing a fresh hold for `hand`.
    pub fn begin(&mut self, hand: Hand, now_ms: u64) {
        self.hand = Some(hand);
        self.hold_start_ms = Some(now_ms);
        self.continuous = false;
        self.last_fire_ms = 0;
    }

    /// Evaluate a hand that stayed up since the last frame.
    ///
    /// Returns a repeat command when one is due.
    pub fn evaluate(&mut self, hand: Hand, now_ms: u64, stable: bool) -> Option<Command> {
        let start = match self.hold_start_ms {
            Some(start) if self.hand == Some(hand) => start,
            _ => {
                self.begin(hand, now_ms);
                return None;
            }
        };

        if !self.continuous {
            if stable && now_ms.saturating_sub(start) >= self.hold_ms {
                self.continuous = true;
                self.last_fire_ms = now_ms;
                debug!(
                    "Continuous {:?} move entered after {}ms hold",
                    hand,
                    now_ms.saturating_sub(start)
                );
                return Some(hand.move_command());
            }
            return None;
        }

        if !stable {
            debug!("Continuous {:?} move exited: hand unstable", hand);
            self.cancel();
            return None;
        }

        if now_ms.saturating_sub(self.last_fire_ms) >= self.interval_ms {
            self.last_fire_ms = now_ms;
            return Some(hand.move_command());
        }
        None
    }

    /// Leave continuous mode and forget the hold.
    pub fn cancel(&mut self) {
        if self.continuous {
            debug!("Continuous move cleared");
        }
        self.hand = None;
        self.hold_start_ms = None;
        self.continuous = false;
        self.last_fire_ms = 0;
    }

    pub fn is_continuous(&self) -> bool {
        self.continuous
    }

    pub fn hold_start_ms(&self) -> Option<u64> {
        self.hold_start_ms
    }

    pub fn hand(&self) -> Option<Hand> {
        self.hand
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const P1: PieceId = PieceId(1);
    const P2: PieceId = PieceId(2);

    fn fast_drop() -> FastDropController {
        FastDropController::new(&ControllerConfig::default())
    }

    fn continuous() -> ContinuousMoveController {
        ContinuousMoveController::new(&ControllerConfig::default())
    }

    /// Drive the controller every `step` ms and return the times a step fired.
    fn run_drop(
        controller: &mut FastDropController,
        from: u64,
        to: u64,
        step: u64,
        piece: Option<PieceId>,
    ) -> Vec<u64> {
        let mut fired = Vec::new();
        let mut t = from;
        while t <= to {
            if controller.update(true, t, piece) {
                controller.record_step(t);
                fired.push(t);
            }
            t += step;
        }
        fired
    }

    #[test]
    fn test_fast_drop_waits_for_delay() {
        let mut controller = fast_drop();
        let fired = run_drop(&mut controller, 0, 490, 10, Some(P1));
        assert!(fired.is_empty());
        assert!(!controller.is_armed());

        assert!(controller.update(true, 500, Some(P1)));
        assert!(controller.is_armed());
        assert_eq!(controller.bound_piece(), Some(P1));
    }

    #[test]
    fn test_fast_drop_step_spacing() {
        let mut controller = fast_drop();
        let fired = run_drop(&mut controller, 0, 1000, 10, Some(P1));
        assert_eq!(fired.first(), Some(&500));
        for pair in fired.windows(2) {
            assert!(pair[1] - pair[0] >= 80);
        }
        assert_eq!(fired, vec![500, 580, 660, 740, 820, 900, 980]);
    }

    #[test]
    fn test_fast_drop_piece_change_requires_requalification() {
        let mut controller = fast_drop();
        run_drop(&mut controller, 0, 600, 10, Some(P1));
        assert!(controller.is_armed());

        // New piece appears while still shaking.
        assert!(!controller.update(true, 610, Some(P2)));
        assert!(!controller.is_armed());
        assert_eq!(controller.bound_piece(), None);

        let fired = run_drop(&mut controller, 620, 1100, 10, Some(P2));
        assert!(fired.is_empty(), "re-armed too early: {:?}", fired);

        assert!(controller.update(true, 1110, Some(P2)));
        assert_eq!(controller.bound_piece(), Some(P2));
    }

    #[test]
    fn test_fast_drop_requalifies_after_landing() {
        let mut controller = fast_drop();
        run_drop(&mut controller, 0, 500, 10, Some(P1));
        assert!(controller.is_armed());

        controller.on_drop_failed(520);
        assert!(!controller.is_armed());
        assert_eq!(controller.shake_start_ms(), Some(520));
        assert!(!controller.update(true, 1000, Some(P2)));
        assert!(controller.update(true, 1020, Some(P2)));
        assert_eq!(controller.bound_piece(), Some(P2));
    }

    #[test]
    fn test_fast_drop_cleared_when_shake_stops() {
        let mut controller = fast_drop();
        run_drop(&mut controller, 0, 600, 10, Some(P1));
        assert!(!controller.update(false, 610, Some(P1)));
        assert!(!controller.is_armed());
        assert_eq!(controller.shake_start_ms(), None);

        // A new shake needs the full delay again.
        assert!(!controller.update(true, 620, Some(P1)));
        assert!(!controller.update(true, 1110, Some(P1)));
        assert!(controller.update(true, 1120, Some(P1)));
    }

    #[test]
    fn test_fast_drop_needs_a_piece_to_arm() {
        let mut controller = fast_drop();
        assert!(!controller.update(true, 0, None));
        assert!(!controller.update(true, 700, None));
        assert!(!controller.is_armed());
        assert!(controller.update(true, 710, Some(P1)));
    }

    #[test]
    fn test_release_piece_only_affects_bound_piece() {
        let mut controller = fast_drop();
        run_drop(&mut controller, 0, 500, 10, Some(P1));
        controller.release_piece(Some(P2), 510);
        assert!(controller.is_armed());
        controller.release_piece(Some(P1), 520);
        assert!(!controller.is_armed());
    }

    #[test]
    fn test_continuous_enters_after_hold() {
        let mut controller = continuous();
        controller.begin(Hand::Left, 0);

        let mut fired = Vec::new();
        let mut t = 33;
        while t <= 1500 {
            if let Some(cmd) = controller.evaluate(Hand::Left, t, true) {
                assert_eq!(cmd, Command::MoveLeft);
                fired.push(t);
            }
            t += 33;
        }
        assert!(fired[0] >= 800);
        assert!(controller.is_continuous());
        for pair in fired.windows(2) {
            assert!(pair[1] - pair[0] >= 120, "repeats too close: {:?}", pair);
        }
    }

    #[test]
    fn test_continuous_waits_for_stability() {
        let mut controller = continuous();
        controller.begin(Hand::Right, 0);
        assert_eq!(controller.evaluate(Hand::Right, 900, false), None);
        assert!(!controller.is_continuous());
        assert_eq!(controller.evaluate(Hand::Right, 933, true), Some(Command::MoveRight));
    }

    #[test]
    fn test_continuous_exit_requires_fresh_hold() {
        let mut controller = continuous();
        controller.begin(Hand::Left, 0);
        assert!(controller.evaluate(Hand::Left, 800, true).is_some());

        assert_eq!(controller.evaluate(Hand::Left, 850, false), None);
        assert!(!controller.is_continuous());
        assert_eq!(controller.hold_start_ms(), None);

        // Next evaluation restarts the hold.
        assert_eq!(controller.evaluate(Hand::Left, 900, true), None);
        assert_eq!(controller.hold_start_ms(), Some(900));
        assert_eq!(controller.evaluate(Hand::Left, 1600, true), None);
        assert!(controller.evaluate(Hand::Left, 1700, true).is_some());
    }

    #[test]
    fn test_continuous_switching_hands_restarts_hold() {
        let mut controller = continuous();
        controller.begin(Hand::Left, 0);
        assert_eq!(controller.evaluate(Hand::Right, 900, true), None);
        assert_eq!(controller.hand(), Some(Hand::Right));
        assert_eq!(controller.hold_start_ms(), Some(900));
    }

    #[test]
    fn test_zero_hold_tolerates_backwards_time() {
        let mut controller = ContinuousMoveController::new(&ControllerConfig {
            continuous_hold_ms: 0,
            ..ControllerConfig::default()
        });
        controller.begin(Hand::Right, 1_000);
        assert_eq!(controller.evaluate(Hand::Right, 500, true), Some(Command::MoveRight));
        assert!(controller.is_continuous());
    }
}
