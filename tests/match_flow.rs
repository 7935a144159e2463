//! End-to-end scenarios across matchmaking, simulation and events

use std::sync::Arc;

use async_trait::async_trait;

use arena_server::game::{MatchEngine, MatchSize, PaddleDir, UserId};
use arena_server::matchmaking::{MatchmakingService, QueueEvent};
use arena_server::store::{
    GameRecord, MemoryStorage, NewGameRecord, NewParticipantRecord, ParticipantRecord, Storage,
    StoreError, UserRecord,
};
use arena_server::{GameId, MatchPhase, MatchRegistry};

fn service_over(storage: Arc<dyn Storage>) -> Arc<MatchmakingService> {
    Arc::new(MatchmakingService::new(
        Arc::new(MatchRegistry::new()),
        storage,
    ))
}

fn seeded_storage() -> Arc<MemoryStorage> {
    let storage = Arc::new(MemoryStorage::new());
    for (id, name) in [(1, "alice"), (2, "bob"), (3, "carol"), (4, "dave")] {
        storage.add_user(id, name);
    }
    storage
}

#[tokio::test]
async fn queue_to_playing_match() {
    let storage = seeded_storage();
    let service = service_over(storage.clone());
    let mut new_matches = service.queue_events().subscribe_kind("newMatch");

    service.join_queue(1, MatchSize::Two).await.unwrap();
    service.join_queue(2, MatchSize::Two).await.unwrap();

    let QueueEvent::NewMatch { game_id, .. } = new_matches.next().await.unwrap() else {
        panic!("expected newMatch event");
    };

    let snapshot = service.snapshot(game_id).unwrap();
    assert_eq!(snapshot.phase, MatchPhase::Playing);
    assert_eq!(snapshot.players.len(), 2);
    assert!(snapshot.players.iter().all(|p| p.score == 0));

    // Two-player serves are biased toward the side walls
    let velocity = snapshot.ball.velocity;
    assert!(velocity.x.abs() >= velocity.y.abs() - 1e-5);

    // The persisted record mirrors the live match
    let record = storage.game(game_id).unwrap();
    assert_eq!(record.status, MatchPhase::Playing);
    assert_eq!(record.max_players, 2);
    assert_eq!(storage.participants_of(game_id).len(), 2);
    assert_eq!(service.queue_size().await, 0);
}

#[tokio::test]
async fn four_player_queue_fills_a_square_arena() {
    let storage = seeded_storage();
    let service = service_over(storage);
    let mut new_matches = service.queue_events().subscribe_kind("newMatch");

    for id in 1..=4 {
        service.join_queue(id, MatchSize::Four).await.unwrap();
    }

    let QueueEvent::NewMatch { game_id, .. } = new_matches.next().await.unwrap() else {
        panic!("expected newMatch event");
    };

    let snapshot = service.snapshot(game_id).unwrap();
    assert_eq!(snapshot.players.len(), 4);
    assert_eq!(snapshot.phase, MatchPhase::Playing);
    assert_eq!(service.queue_size().await, 0);
}

/// Drive a full match to completion through the public engine API: both
/// paddles track the ball, the rally speed grows until someone misses,
/// and the match finishes at five points.
#[test]
fn tracked_rally_reaches_victory() {
    let mut engine = MatchEngine::new(MatchSize::Two, 123);
    engine.add_player(1).unwrap();
    engine.add_player(2).unwrap();
    engine.start();

    let dt = 1.0 / 60.0;
    let mut ticks: u64 = 0;
    while engine.state().phase == MatchPhase::Playing {
        for seat in 0..2 {
            let (user_id, paddle_y) = {
                let p = &engine.state().players[seat];
                (p.user_id, p.position.y)
            };
            let ball_y = engine.state().ball.position.y;
            let input = if ball_y > paddle_y + 0.5 {
                PaddleDir::Up
            } else if ball_y < paddle_y - 0.5 {
                PaddleDir::Down
            } else {
                PaddleDir::None
            };
            engine.set_input(user_id, input);
        }

        engine.update(dt);
        ticks += 1;
        assert!(ticks < 500_000, "match did not finish");
    }

    assert_eq!(engine.state().phase, MatchPhase::Finished);
    let winner = engine.winner().expect("finished match has a winner");
    assert_eq!(winner.score, 5);
    assert!(winner.user_id == 1 || winner.user_id == 2);

    // The loser never reached the threshold
    let loser = engine
        .state()
        .players
        .iter()
        .find(|p| p.user_id != winner.user_id)
        .unwrap();
    assert!(loser.score < 5);
}

/// Storage wrapper that yields to the scheduler before every call,
/// widening the interleaving windows between concurrent joins.
struct YieldingStorage(MemoryStorage);

#[async_trait]
impl Storage for YieldingStorage {
    async fn insert_game(&self, new_game: &NewGameRecord) -> Result<GameRecord, StoreError> {
        tokio::task::yield_now().await;
        self.0.insert_game(new_game).await
    }

    async fn get_game(&self, id: GameId) -> Result<Option<GameRecord>, StoreError> {
        tokio::task::yield_now().await;
        self.0.get_game(id).await
    }

    async fn update_game_status(&self, id: GameId, status: MatchPhase) -> Result<(), StoreError> {
        tokio::task::yield_now().await;
        self.0.update_game_status(id, status).await
    }

    async fn insert_participant(
        &self,
        new_participant: &NewParticipantRecord,
    ) -> Result<ParticipantRecord, StoreError> {
        tokio::task::yield_now().await;
        self.0.insert_participant(new_participant).await
    }

    async fn get_users(&self, ids: &[UserId]) -> Result<Vec<UserRecord>, StoreError> {
        tokio::task::yield_now().await;
        self.0.get_users(ids).await
    }
}

/// The single-writer queue serializes interleaved joins: no player is
/// ever drafted into two matches, even with suspension points inside the
/// join sequence.
#[tokio::test]
async fn concurrent_joins_form_exactly_one_match_per_player() {
    let storage = MemoryStorage::new();
    for (id, name) in [(1, "alice"), (2, "bob"), (3, "carol"), (4, "dave")] {
        storage.add_user(id, name);
    }
    let service = service_over(Arc::new(YieldingStorage(storage)));
    let mut new_matches = service.queue_events().subscribe_kind("newMatch");

    let joins: Vec<_> = (1..=4)
        .map(|id| {
            let service = service.clone();
            tokio::spawn(async move { service.join_queue(id, MatchSize::Two).await })
        })
        .collect();
    for join in joins {
        join.await.unwrap().unwrap();
    }

    let mut seen_players = Vec::new();
    let mut games = Vec::new();
    while let Some(event) = new_matches.try_next() {
        let QueueEvent::NewMatch { user_id, game_id } = event else {
            panic!("expected newMatch event");
        };
        assert!(
            !seen_players.contains(&user_id),
            "player {user_id} drafted twice"
        );
        seen_players.push(user_id);
        if !games.contains(&game_id) {
            games.push(game_id);
        }
    }

    assert_eq!(seen_players.len(), 4);
    assert_eq!(games.len(), 2);
    assert_eq!(service.queue_size().await, 0);
}
