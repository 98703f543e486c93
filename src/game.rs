//! Boundary with the game being driven.
//!
//! The engine only reads the running flag and the active piece id, and
//! calls two mutating operations. A call that fails is logged and treated
//! as having no effect; it never interrupts frame processing.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::types::{Command, PieceId};

/// Failure raised by a game collaborator call.
#[derive(Debug, Error)]
pub enum GameError {
    #[error("game rejected the call: {0}")]
    Rejected(String),

    #[error("game state unavailable: {0}")]
    Unavailable(String),
}

/// Capabilities the engine requires from the game.
///
/// Calls are expected to return synchronously and quickly.
pub trait GameCollaborator {
    /// Try to shift the active piece. `Ok(true)` iff it moved.
    fn attempt_move(&mut self, dx: i32, dy: i32) -> Result<bool, GameError>;

    /// Rotate the active piece.
    fn rotate(&mut self) -> Result<(), GameError>;

    /// Commands are suppressed entirely while this is false.
    fn is_running(&self) -> bool;

    /// Identifier of the active falling piece, if any.
    fn current_piece_id(&self) -> Option<PieceId>;
}

/// What became of a command after arbitration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "reason", rename_all = "snake_case")]
pub enum DispatchOutcome {
    /// The game applied the command.
    Applied,
    /// The game refused the move (wall, floor, or occupied cell).
    Blocked,
    /// The collaborator call failed.
    Failed(String),
    /// The game was not running, so nothing was sent.
    Suppressed,
}

impl DispatchOutcome {
    /// Whether the game state changed.
    pub fn is_applied(&self) -> bool {
        matches!(self, DispatchOutcome::Applied)
    }
}

/// Grid offset a movement command maps to.
pub fn move_offset(command: Command) -> Option<(i32, i32)> {
    match command {
        Command::MoveLeft => Some((-1, 0)),
        Command::MoveRight => Some((1, 0)),
        Command::FastDropStep => Some((0, 1)),
        Command::Rotate => None,
    }
}

/// Apply one command to the game, folding failures into the outcome.
pub fn dispatch<G: GameCollaborator + ?Sized>(game: &mut G, command: Command) -> DispatchOutcome {
    let result = match move_offset(command) {
        Some((dx, dy)) => game.attempt_move(dx, dy).map(|moved| {
            if moved {
                DispatchOutcome::Applied
            } else {
                DispatchOutcome::Blocked
            }
        }),
        None => game.rotate().map(|()| DispatchOutcome::Applied),
    };

    result.unwrap_or_else(|err| {
        warn!("Game call for {} failed: {}", command.as_str(), err);
        DispatchOutcome::Failed(err.to_string())
    })
}


#[cfg(test)]
mod tests {
    use super::testing::ScriptedGame;
    use super::*;

    #[test]
    fn test_dispatch_maps_commands() {
        let mut game = ScriptedGame::new();
        assert_eq!(dispatch(&mut game, Command::MoveLeft), DispatchOutcome::Applied);
        assert_eq!(dispatch(&mut game, Command::MoveRight), DispatchOutcome::Applied);
        assert_eq!(dispatch(&mut game, Command::Rotate), DispatchOutcome::Applied);
        assert_eq!(dispatch(&mut game, Command::FastDropStep), DispatchOutcome::Applied);
        assert_eq!(
            game.applied,
            vec![
                Command::MoveLeft,
                Command::MoveRight,
                Command::Rotate,
                Command::FastDropStep
            ]
        );
    }

    #[test]
    fn test_dispatch_blocked_drop() {
        let mut game = ScriptedGame::new();
        game.drops_until_landing = Some(0);
        assert_eq!(dispatch(&mut game, Command::FastDropStep), DispatchOutcome::Blocked);
        assert!(game.applied.is_empty());
    }

    #[test]
    fn test_dispatch_folds_errors() {
        let mut game = ScriptedGame::new();
        game.fail_calls = true;
        let outcome = dispatch(&mut game, Command::Rotate);
        assert!(matches!(outcome, DispatchOutcome::Failed(ref reason) if reason.contains("scripted")));
        assert!(!outcome.is_applied());
        assert!(matches!(
            dispatch(&mut game, Command::MoveLeft),
            DispatchOutcome::Failed(_)
        ));
    }

    #[test]
    fn test_move_offsets() {
        assert_eq!(move_offset(Command::MoveLeft), Some((-1, 0)));
        assert_eq!(move_offset(Command::FastDropStep), Some((0, 1)));
        assert_eq!(move_offset(Command::Rotate), None);
    }
}
