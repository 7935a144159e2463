//! Game simulation modules

pub mod engine;
pub mod physics;
pub mod runner;
pub mod snapshot;

pub use engine::{CapacityError, MatchEngine, MatchPhase, MatchState, Participant};
pub use runner::{MatchHandle, MatchRegistry, MatchRunner};

use serde::{Deserialize, Serialize};

/// External user identifier
pub type UserId = i64;

/// Persisted match identifier, assigned by the storage collaborator
pub type GameId = i64;

/// Supported match sizes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchSize {
    Two,
    Four,
}

impl MatchSize {
    /// All sizes in matching priority order
    pub const ALL: [MatchSize; 2] = [MatchSize::Two, MatchSize::Four];

    pub fn player_count(self) -> usize {
        match self {
            MatchSize::Two => 2,
            MatchSize::Four => 4,
        }
    }

    pub fn arena_height(self) -> f32 {
        match self {
            MatchSize::Two => 30.0,
            MatchSize::Four => 40.0,
        }
    }

    pub fn from_player_count(count: u8) -> Option<Self> {
        match count {
            2 => Some(MatchSize::Two),
            4 => Some(MatchSize::Four),
            _ => None,
        }
    }
}

/// Paddle input direction for one participant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaddleDir {
    Up,
    Down,
    None,
}

impl PaddleDir {
    /// Signed movement factor along the paddle's axis
    pub fn sign(self) -> f32 {
        match self {
            PaddleDir::Up => 1.0,
            PaddleDir::Down => -1.0,
            PaddleDir::None => 0.0,
        }
    }
}

impl Default for PaddleDir {
    fn default() -> Self {
        Self::None
    }
}
