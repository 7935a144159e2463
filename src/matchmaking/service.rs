//! Matchmaking coordinator - queue management and match lifecycle

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{broadcast, Mutex};
use tracing::info;

use crate::bus::{DomainEvent, EventBus};
use crate::game::runner::MatchEvent;
use crate::game::snapshot::MatchSnapshot;
use crate::game::{
    CapacityError, GameId, MatchEngine, MatchHandle, MatchPhase, MatchRegistry, MatchRunner,
    MatchSize, PaddleDir, UserId,
};
use crate::store::{NewGameRecord, NewParticipantRecord, Storage, StoreError};

use super::queue::WaitingQueue;

/// Invite matches are head-to-head
pub const PRIVATE_MATCH_SIZE: MatchSize = MatchSize::Two;

/// Queue lifecycle events published on the `queue` domain
#[derive(Debug, Clone)]
pub enum QueueEvent {
    /// Full roster of currently queued players, emitted after any change
    Players(Vec<QueuedPlayer>),
    /// A match formed for this participant
    NewMatch { user_id: UserId, game_id: GameId },
}

impl DomainEvent for QueueEvent {
    const DOMAIN: &'static str = "queue";

    fn kind(&self) -> &'static str {
        match self {
            QueueEvent::Players(_) => "players",
            QueueEvent::NewMatch { .. } => "newMatch",
        }
    }
}

/// Queued player resolved against the storage collaborator
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueuedPlayer {
    pub user_id: UserId,
    pub display_name: String,
}

/// Matchmaking failures reported to the transport caller
#[derive(Debug, thiserror::Error)]
pub enum MatchmakingError {
    #[error("match is full: {0}")]
    MatchFull(#[from] CapacityError),

    #[error("game {0} not found")]
    GameNotFound(GameId),

    #[error("storage operation failed: {0}")]
    Storage(#[from] StoreError),
}

/// Matchmaking coordinator
///
/// Owns the waiting queue and the registry of live matches. Constructed
/// once at composition time and shared behind an `Arc`; there is no
/// hidden global instance.
pub struct MatchmakingService {
    /// Single-writer queue: this lock is held across the whole
    /// join -> match -> persist sequence, so concurrent joins serialize
    /// and an entry can never be drafted into two matches
    queue: Mutex<WaitingQueue>,
    registry: Arc<MatchRegistry>,
    storage: Arc<dyn Storage>,
    queue_events: EventBus<QueueEvent>,
    match_events: EventBus<MatchEvent>,
}

impl MatchmakingService {
    pub fn new(registry: Arc<MatchRegistry>, storage: Arc<dyn Storage>) -> Self {
        Self {
            queue: Mutex::new(WaitingQueue::new()),
            registry,
            storage,
            queue_events: EventBus::new(),
            match_events: EventBus::new(),
        }
    }

    /// Bus carrying `queue:players` and `queue:newMatch`
    pub fn queue_events(&self) -> &EventBus<QueueEvent> {
        &self.queue_events
    }

    /// Bus carrying per-match `game:score` and `game:status`
    pub fn match_events(&self) -> &EventBus<MatchEvent> {
        &self.match_events
    }

    /// Join the waiting queue, forming matches where possible
    ///
    /// Re-joining updates the requested size in place. Emits the queue
    /// roster after the change.
    pub async fn join_queue(
        &self,
        user_id: UserId,
        size: MatchSize,
    ) -> Result<(), MatchmakingError> {
        let mut queue = self.queue.lock().await;
        queue.enqueue(user_id, size);
        info!(
            user_id,
            queue_size = queue.len(),
            "player joined matchmaking queue"
        );

        self.run_matching(&mut queue).await?;
        self.emit_roster(&queue).await?;
        Ok(())
    }

    /// Leave the waiting queue; no-op if absent
    pub async fn leave_queue(&self, user_id: UserId) -> Result<(), MatchmakingError> {
        let mut queue = self.queue.lock().await;
        if queue.remove(user_id).is_some() {
            info!(
                user_id,
                queue_size = queue.len(),
                "player left matchmaking queue"
            );
        }
        self.emit_roster(&queue).await?;
        Ok(())
    }

    pub async fn queue_size(&self) -> usize {
        self.queue.lock().await.len()
    }

    pub async fn is_in_queue(&self, user_id: UserId) -> bool {
        self.queue.lock().await.contains(user_id)
    }

    /// Create a private head-to-head match for an inviting player
    ///
    /// The match is persisted and registered but deliberately not started
    /// and not announced; it stays in waiting until an invite is accepted.
    pub async fn create_private_game(&self, user_id: UserId) -> Result<GameId, MatchmakingError> {
        let record = self
            .storage
            .insert_game(&NewGameRecord {
                status: MatchPhase::Waiting,
                max_players: PRIVATE_MATCH_SIZE.player_count() as u8,
                private: true,
            })
            .await?;
        let game_id = record.id;

        self.storage
            .insert_participant(&NewParticipantRecord { game_id, user_id })
            .await?;

        self.register_engine(game_id, PRIVATE_MATCH_SIZE, &[user_id])?;

        info!(game_id, user_id, "created private match");
        Ok(game_id)
    }

    /// Accept an invite into a registered waiting match and start it
    ///
    /// Every participant already in the match receives the `newMatch`
    /// notice, not just the joiner.
    pub async fn accept_invite(
        &self,
        game_id: GameId,
        user_id: UserId,
    ) -> Result<(), MatchmakingError> {
        let record = self
            .storage
            .get_game(game_id)
            .await?
            .ok_or(MatchmakingError::GameNotFound(game_id))?;

        self.storage
            .insert_participant(&NewParticipantRecord {
                game_id: record.id,
                user_id,
            })
            .await?;

        let handle = self
            .registry
            .get(game_id)
            .ok_or(MatchmakingError::GameNotFound(game_id))?;

        let participants: Vec<UserId> = {
            let mut engine = handle.engine.lock();
            engine.add_player(user_id)?;
            engine.state().players.iter().map(|p| p.user_id).collect()
        };

        for participant in participants {
            self.queue_events.emit(QueueEvent::NewMatch {
                user_id: participant,
                game_id,
            });
        }

        self.storage
            .update_game_status(game_id, MatchPhase::Playing)
            .await?;
        handle.engine.lock().start();

        info!(game_id, user_id, "invite accepted, match started");
        Ok(())
    }

    /// Forward a paddle input to the relevant match
    pub fn set_input(
        &self,
        game_id: GameId,
        user_id: UserId,
        input: PaddleDir,
    ) -> Result<(), MatchmakingError> {
        let handle = self
            .registry
            .get(game_id)
            .ok_or(MatchmakingError::GameNotFound(game_id))?;
        handle.engine.lock().set_input(user_id, input);
        Ok(())
    }

    /// Current state of a match, for transport broadcast
    pub fn snapshot(&self, game_id: GameId) -> Option<MatchSnapshot> {
        let handle = self.registry.get(game_id)?;
        let engine = handle.engine.lock();
        Some(MatchSnapshot::capture(game_id, engine.state()))
    }

    /// Snapshot channel of a live match
    pub fn subscribe_snapshots(&self, game_id: GameId) -> Option<broadcast::Receiver<MatchSnapshot>> {
        self.registry.get(game_id).map(|h| h.subscribe_snapshots())
    }

    /// Form matches per size, FIFO within each size
    async fn run_matching(&self, queue: &mut WaitingQueue) -> Result<(), MatchmakingError> {
        for size in MatchSize::ALL {
            while let Some(players) = queue.take_group(size) {
                self.create_game(&players, size).await?;
            }
        }
        Ok(())
    }

    /// Persist and start a public match for the drafted players
    async fn create_game(
        &self,
        player_ids: &[UserId],
        size: MatchSize,
    ) -> Result<GameId, MatchmakingError> {
        let record = self
            .storage
            .insert_game(&NewGameRecord {
                status: MatchPhase::Waiting,
                max_players: size.player_count() as u8,
                private: false,
            })
            .await?;
        let game_id = record.id;

        // A failure here aborts the creation; the waiting-status record is
        // left behind rather than compensated (no transactional storage)
        for &user_id in player_ids {
            self.storage
                .insert_participant(&NewParticipantRecord { game_id, user_id })
                .await?;
        }

        let handle = self.register_engine(game_id, size, player_ids)?;

        for &user_id in player_ids {
            self.queue_events
                .emit(QueueEvent::NewMatch { user_id, game_id });
        }

        self.storage
            .update_game_status(game_id, MatchPhase::Playing)
            .await?;
        handle.engine.lock().start();

        info!(
            game_id,
            player_count = player_ids.len(),
            "created new match"
        );
        Ok(game_id)
    }

    /// Build an engine for the players, register it and spawn its runner
    fn register_engine(
        &self,
        game_id: GameId,
        size: MatchSize,
        player_ids: &[UserId],
    ) -> Result<MatchHandle, MatchmakingError> {
        let mut engine = MatchEngine::new(size, rand::random());
        for &user_id in player_ids {
            engine.add_player(user_id)?;
        }

        let engine = Arc::new(parking_lot::Mutex::new(engine));
        let (snapshot_tx, _) = broadcast::channel(64);
        let handle = MatchHandle {
            game_id,
            engine: engine.clone(),
            snapshot_tx: snapshot_tx.clone(),
        };
        self.registry.insert(handle.clone());

        let runner = MatchRunner::new(game_id, engine, snapshot_tx, self.match_events.clone());
        let registry = self.registry.clone();
        tokio::spawn(async move {
            runner.run().await;
            registry.remove(game_id);
            info!(game_id, "match removed from registry");
        });

        Ok(handle)
    }

    /// Emit the full queued-player roster, names resolved via storage
    async fn emit_roster(&self, queue: &WaitingQueue) -> Result<(), StoreError> {
        let ids: Vec<UserId> = queue.iter().map(|e| e.user_id).collect();
        let users = self.storage.get_users(&ids).await?;

        let roster = ids
            .iter()
            .map(|&user_id| {
                let display_name = users
                    .iter()
                    .find(|u| u.id == user_id)
                    .map(|u| u.display_name.clone())
                    .unwrap_or_else(|| format!("player-{user_id}"));
                QueuedPlayer {
                    user_id,
                    display_name,
                }
            })
            .collect();

        self.queue_events.emit(QueueEvent::Players(roster));
        Ok(())
    }
}
