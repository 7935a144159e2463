//! Snapshot building for state broadcast

use serde::{Deserialize, Serialize};

use super::engine::{MatchPhase, MatchState};
use super::physics::{MoveAxis, Vec2};
use super::{GameId, UserId};

/// Ball state in a snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BallSnapshot {
    pub position: Vec2,
    pub velocity: Vec2,
    pub speed: f32,
}

/// Player state in a snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub user_id: UserId,
    pub position: Vec2,
    pub score: u32,
    pub axis: MoveAxis,
}

/// Full match state sent to observers at regular intervals
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchSnapshot {
    pub game_id: GameId,
    /// Server tick number
    pub tick: u64,
    pub phase: MatchPhase,
    pub ball: BallSnapshot,
    pub players: Vec<PlayerSnapshot>,
}

impl MatchSnapshot {
    /// Capture the current state of a match
    pub fn capture(game_id: GameId, state: &MatchState) -> Self {
        Self {
            game_id,
            tick: state.tick,
            phase: state.phase,
            ball: BallSnapshot {
                position: state.ball.position,
                velocity: state.ball.velocity,
                speed: state.ball.speed,
            },
            players: state
                .players
                .iter()
                .map(|p| PlayerSnapshot {
                    user_id: p.user_id,
                    position: p.position,
                    score: p.score,
                    axis: p.axis,
                })
                .collect(),
        }
    }
}

/// Paces full-state snapshots below the simulation tick rate
pub struct SnapshotBuilder {
    game_id: GameId,
    /// Tick counter since last snapshot
    ticks_since_snapshot: u32,
    /// Snapshot interval in ticks
    snapshot_interval: u32,
}

impl SnapshotBuilder {
    pub fn new(game_id: GameId, snapshot_interval: u32) -> Self {
        Self {
            game_id,
            ticks_since_snapshot: 0,
            snapshot_interval,
        }
    }

    /// Check if it's time to send a snapshot
    pub fn should_send(&mut self) -> bool {
        self.ticks_since_snapshot += 1;
        if self.ticks_since_snapshot >= self.snapshot_interval {
            self.ticks_since_snapshot = 0;
            true
        } else {
            false
        }
    }

    /// Force a snapshot on the next check (used for phase changes)
    pub fn force_next(&mut self) {
        self.ticks_since_snapshot = self.snapshot_interval;
    }

    /// Build a snapshot message from the current match state
    pub fn build(&self, state: &MatchState) -> MatchSnapshot {
        MatchSnapshot::capture(self.game_id, state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{MatchEngine, MatchSize};

    #[test]
    fn builder_paces_snapshots() {
        let mut builder = SnapshotBuilder::new(1, 3);
        assert!(!builder.should_send());
        assert!(!builder.should_send());
        assert!(builder.should_send());
        assert!(!builder.should_send());
    }

    #[test]
    fn force_next_overrides_the_interval() {
        let mut builder = SnapshotBuilder::new(1, 100);
        builder.force_next();
        assert!(builder.should_send());
    }

    #[test]
    fn snapshot_mirrors_match_state() {
        let mut engine = MatchEngine::new(MatchSize::Two, 9);
        engine.add_player(7).unwrap();
        engine.add_player(8).unwrap();

        let snapshot = SnapshotBuilder::new(42, 1).build(engine.state());

        assert_eq!(snapshot.game_id, 42);
        assert_eq!(snapshot.phase, MatchPhase::Waiting);
        assert_eq!(snapshot.players.len(), 2);
        assert_eq!(snapshot.players[0].user_id, 7);
        assert!((snapshot.ball.velocity.length() - 1.0).abs() < 1e-5);

        // Snapshots serialize for the transport layer
        let json = serde_json::to_string(&snapshot).unwrap();
        assert!(json.contains("\"game_id\":42"));
    }
}
