//! Pose Gesture Engine demo
//!
//! Replays a scripted session against an in-memory grid game and logs every
//! host event and command. Pass a JSON configuration path as the first
//! argument to override the tuned defaults.
//!
//! Set `RUST_LOG=pose_gesture=trace` for more detail.

use pose_gesture::{
    Command, DispatchOutcome, EngineConfig, EngineError, GameCollaborator, GameError,
    GestureEngine, HostEvent, Landmark, LandmarkId, LandmarkSet, PieceId, PoseFrame,
};
use tracing::{info, warn};

const FRAME_MS: u64 = 33;
const BOARD_WIDTH: i32 = 10;
const BOARD_HEIGHT: i32 = 20;

/// A single-cell falling piece on an empty board.
struct GridGame {
    piece: PieceId,
    column: i32,
    row: i32,
    rotation: u8,
    placed: u32,
}

impl GridGame {
    fn new() -> Self {
        Self {
            piece: PieceId(1),
            column: BOARD_WIDTH / 2,
            row: 0,
            rotation: 0,
            placed: 0,
        }
    }

    fn spawn(&mut self) {
        self.placed += 1;
        self.piece = PieceId(self.piece.0 + 1);
        self.column = BOARD_WIDTH / 2;
        self.row = 0;
        self.rotation = 0;
        info!("Piece landed; spawned {:?}", self.piece);
    }
}

impl GameCollaborator for GridGame {
    fn attempt_move(&mut self, dx: i32, dy: i32) -> Result<bool, GameError> {
        let column = self.column + dx;
        let row = self.row + dy;
        if !(0..BOARD_WIDTH).contains(&column) {
            return Ok(false);
        }
        if row >= BOARD_HEIGHT {
            self.spawn();
            return Ok(false);
        }
        self.column = column;
        self.row = row;
        Ok(true)
    }

    fn rotate(&mut self) -> Result<(), GameError> {
        self.rotation = (self.rotation + 1) % 4;
        Ok(())
    }

    fn is_running(&self) -> bool {
        true
    }

    fn current_piece_id(&self) -> Option<PieceId> {
        Some(self.piece)
    }
}

/// One stretch of the scripted session.
#[derive(Clone, Copy)]
enum Pose {
    Standing,
    LeftUp,
    BothUp,
    Shaking,
    OutOfView,
}

fn landmarks(pose: Pose, index: u64) -> LandmarkSet {
    let wrist_down = |x| Landmark::with_visibility(x, 0.7, 0.9);
    let wrist_up = |x| Landmark::with_visibility(x, 0.2, 0.9);
    let nose_x = match pose {
        Pose::Shaking if index % 2 == 0 => 0.44,
        Pose::Shaking => 0.56,
        _ => 0.5,
    };

    let body = LandmarkSet::empty()
        .with(LandmarkId::Nose, Landmark::new(nose_x, 0.3))
        .with(LandmarkId::LeftShoulder, Landmark::new(0.4, 0.5))
        .with(LandmarkId::RightShoulder, Landmark::new(0.6, 0.5));

    match pose {
        Pose::OutOfView => LandmarkSet::empty(),
        Pose::LeftUp => body
            .with(LandmarkId::LeftWrist, wrist_up(0.35))
            .with(LandmarkId::RightWrist, wrist_down(0.65)),
        Pose::BothUp => body
            .with(LandmarkId::LeftWrist, wrist_up(0.35))
            .with(LandmarkId::RightWrist, wrist_up(0.65)),
        Pose::Standing | Pose::Shaking => body
            .with(LandmarkId::LeftWrist, wrist_down(0.35))
            .with(LandmarkId::RightWrist, wrist_down(0.65)),
    }
}

fn load_config() -> Result<EngineConfig, EngineError> {
    match std::env::args().nth(1) {
        Some(path) => EngineConfig::from_json_file(path),
        None => Ok(EngineConfig::default()),
    }
}

fn main() -> Result<(), EngineError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pose_gesture=debug,pose_gesture_demo=info".into()),
        )
        .init();

    info!("pose-gesture-demo v{} starting", env!("CARGO_PKG_VERSION"));

    let mut engine = GestureEngine::new(load_config()?)?;
    let mut game = GridGame::new();

    let script = [
        (Pose::Standing, 40),
        (Pose::LeftUp, 45),
        (Pose::Standing, 10),
        (Pose::BothUp, 20),
        (Pose::Standing, 10),
        (Pose::Shaking, 120),
        (Pose::OutOfView, 40),
        (Pose::Standing, 10),
    ];

    let mut index = 0u64;
    for (pose, frames) in script {
        for _ in 0..frames {
            let frame = PoseFrame::new(index * FRAME_MS, landmarks(pose, index));
            let report = engine.process_frame(&frame, &mut game);

            for event in &report.events {
                match event {
                    HostEvent::CalibrationComplete => info!("Host: calibration complete"),
                    HostEvent::DetectionChanged { detected: true } => info!("Host: player found"),
                    HostEvent::DetectionChanged { detected: false } => {
                        info!("Host: player lost ({:?})", report.detection.hint)
                    }
                }
            }

            match (report.command, &report.outcome) {
                (Some(command), Some(DispatchOutcome::Applied)) => info!(
                    "t={}ms {} -> column {} row {} rotation {}",
                    report.timestamp_ms,
                    command.as_str(),
                    game.column,
                    game.row,
                    game.rotation
                ),
                (Some(Command::FastDropStep), Some(DispatchOutcome::Blocked)) => {
                    info!("t={}ms fast drop landed the piece", report.timestamp_ms)
                }
                (Some(command), Some(outcome)) => {
                    warn!("t={}ms {} -> {:?}", report.timestamp_ms, command.as_str(), outcome)
                }
                _ => {}
            }
            index += 1;
        }
    }

    let stats = engine.stats();
    info!(
        "Session done: {} frames ({} valid), {} commands, {} pieces placed, {} detection losses",
        stats.frames_seen,
        stats.valid_frames,
        stats.commands.total(),
        game.placed,
        stats.detection_losses
    );
    match serde_json::to_string(stats) {
        Ok(json) => info!("Stats: {}", json),
        Err(err) => warn!("Could not serialize stats: {}", err),
    }
    Ok(())
}
