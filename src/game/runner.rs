//! Per-match tick task, handle and registry

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio::time::{interval, MissedTickBehavior};
use tracing::info;

use crate::bus::{DomainEvent, EventBus};
use crate::util::time::{tick_delta, SIMULATION_TPS, SNAPSHOT_TPS, TICK_DURATION_MICROS};

use super::engine::{MatchEngine, MatchPhase};
use super::snapshot::{MatchSnapshot, SnapshotBuilder};
use super::{GameId, UserId};

/// Per-match lifecycle events published on the `game` domain
#[derive(Debug, Clone)]
pub enum MatchEvent {
    /// A participant's score changed
    Score {
        game_id: GameId,
        user_id: UserId,
        score: u32,
    },
    /// The match phase changed
    Status { game_id: GameId, phase: MatchPhase },
}

impl DomainEvent for MatchEvent {
    const DOMAIN: &'static str = "game";

    fn kind(&self) -> &'static str {
        match self {
            MatchEvent::Score { .. } => "score",
            MatchEvent::Status { .. } => "status",
        }
    }
}

/// Handle to a running match
#[derive(Clone)]
pub struct MatchHandle {
    pub game_id: GameId,
    /// Engine access is serialized through this mutex; the guard is never
    /// held across an await
    pub engine: Arc<Mutex<MatchEngine>>,
    pub snapshot_tx: broadcast::Sender<MatchSnapshot>,
}

impl MatchHandle {
    pub fn subscribe_snapshots(&self) -> broadcast::Receiver<MatchSnapshot> {
        self.snapshot_tx.subscribe()
    }
}

/// Registry of all active matches
pub struct MatchRegistry {
    matches: DashMap<GameId, MatchHandle>,
}

impl MatchRegistry {
    pub fn new() -> Self {
        Self {
            matches: DashMap::new(),
        }
    }

    pub fn get(&self, id: GameId) -> Option<MatchHandle> {
        self.matches.get(&id).map(|m| m.value().clone())
    }

    pub fn insert(&self, handle: MatchHandle) {
        self.matches.insert(handle.game_id, handle);
    }

    pub fn remove(&self, id: GameId) -> Option<MatchHandle> {
        self.matches.remove(&id).map(|(_, h)| h)
    }

    pub fn active_matches(&self) -> usize {
        self.matches.len()
    }
}

impl Default for MatchRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Drives one match at the fixed simulation rate
///
/// Each tick advances the engine, publishes score/status changes on the
/// match event bus and broadcasts periodic state snapshots. The task ends
/// once the match finishes.
pub struct MatchRunner {
    game_id: GameId,
    engine: Arc<Mutex<MatchEngine>>,
    snapshot_tx: broadcast::Sender<MatchSnapshot>,
    bus: EventBus<MatchEvent>,
    snapshot_builder: SnapshotBuilder,
}

impl MatchRunner {
    pub fn new(
        game_id: GameId,
        engine: Arc<Mutex<MatchEngine>>,
        snapshot_tx: broadcast::Sender<MatchSnapshot>,
        bus: EventBus<MatchEvent>,
    ) -> Self {
        let snapshot_interval = SIMULATION_TPS / SNAPSHOT_TPS;
        Self {
            game_id,
            engine,
            snapshot_tx,
            bus,
            snapshot_builder: SnapshotBuilder::new(game_id, snapshot_interval),
        }
    }

    /// Run the fixed-rate tick loop until the match finishes
    pub async fn run(mut self) {
        info!(game_id = self.game_id, "match runner started");

        let mut tick_interval = interval(Duration::from_micros(TICK_DURATION_MICROS));
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut last_phase = MatchPhase::Waiting;
        let mut last_scores: HashMap<UserId, u32> = HashMap::new();

        loop {
            tick_interval.tick().await;

            let mut snapshot = None;
            let mut finished = false;
            {
                let mut engine = self.engine.lock();
                engine.update(tick_delta());
                let state = engine.state();

                for player in &state.players {
                    let previous = last_scores.get(&player.user_id).copied().unwrap_or(0);
                    if player.score != previous {
                        last_scores.insert(player.user_id, player.score);
                        self.bus.emit(MatchEvent::Score {
                            game_id: self.game_id,
                            user_id: player.user_id,
                            score: player.score,
                        });
                    }
                }

                if state.phase != last_phase {
                    last_phase = state.phase;
                    self.bus.emit(MatchEvent::Status {
                        game_id: self.game_id,
                        phase: state.phase,
                    });
                    self.snapshot_builder.force_next();
                    finished = state.phase == MatchPhase::Finished;
                }

                if self.snapshot_builder.should_send() {
                    snapshot = Some(self.snapshot_builder.build(state));
                }
            }

            if let Some(snapshot) = snapshot {
                // No receivers is fine; observers come and go
                let _ = self.snapshot_tx.send(snapshot);
            }

            if finished {
                break;
            }
        }

        info!(game_id = self.game_id, "match runner stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{MatchSize, PaddleDir};

    fn spawn_match() -> (MatchHandle, EventBus<MatchEvent>, tokio::task::JoinHandle<()>) {
        let mut engine = MatchEngine::new(MatchSize::Two, 11);
        engine.add_player(1).unwrap();
        engine.add_player(2).unwrap();

        let engine = Arc::new(Mutex::new(engine));
        let (snapshot_tx, _) = broadcast::channel(64);
        let bus = EventBus::<MatchEvent>::new();
        let handle = MatchHandle {
            game_id: 5,
            engine: engine.clone(),
            snapshot_tx: snapshot_tx.clone(),
        };

        let runner = MatchRunner::new(5, engine, snapshot_tx, bus.clone());
        let task = tokio::spawn(runner.run());
        (handle, bus, task)
    }

    #[tokio::test(start_paused = true)]
    async fn runner_publishes_status_transitions() {
        let (handle, bus, task) = spawn_match();
        let mut statuses = bus.subscribe_kind("status");

        handle.engine.lock().start();

        match statuses.next().await.unwrap() {
            MatchEvent::Status { game_id, phase } => {
                assert_eq!(game_id, 5);
                assert_eq!(phase, MatchPhase::Playing);
            }
            other => panic!("unexpected event: {other:?}"),
        }

        handle.engine.lock().state_mut().phase = MatchPhase::Finished;
        match statuses.next().await.unwrap() {
            MatchEvent::Status { phase, .. } => assert_eq!(phase, MatchPhase::Finished),
            other => panic!("unexpected event: {other:?}"),
        }

        // The runner task ends with the match
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn runner_publishes_score_changes_and_snapshots() {
        let (handle, bus, task) = spawn_match();
        let mut scores = bus.subscribe_kind("score");
        let mut snapshots = handle.subscribe_snapshots();

        handle.engine.lock().start();
        {
            let mut engine = handle.engine.lock();
            engine.set_input(1, PaddleDir::Up);
            engine.state_mut().players[0].score = 3;
        }

        match scores.next().await.unwrap() {
            MatchEvent::Score {
                game_id,
                user_id,
                score,
            } => {
                assert_eq!(game_id, 5);
                assert_eq!(user_id, 1);
                assert_eq!(score, 3);
            }
            other => panic!("unexpected event: {other:?}"),
        }

        let snapshot = snapshots.recv().await.unwrap();
        assert_eq!(snapshot.game_id, 5);
        assert_eq!(snapshot.players.len(), 2);

        handle.engine.lock().state_mut().phase = MatchPhase::Finished;
        task.await.unwrap();
    }

    #[test]
    fn registry_tracks_handles() {
        let registry = MatchRegistry::new();
        let (snapshot_tx, _) = broadcast::channel(8);
        let handle = MatchHandle {
            game_id: 9,
            engine: Arc::new(Mutex::new(MatchEngine::new(MatchSize::Two, 1))),
            snapshot_tx,
        };

        registry.insert(handle);
        assert_eq!(registry.active_matches(), 1);
        assert!(registry.get(9).is_some());
        assert!(registry.get(10).is_none());

        registry.remove(9);
        assert_eq!(registry.active_matches(), 0);
    }
}
