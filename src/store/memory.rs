//! In-memory storage backend for tests and local runs

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::game::{GameId, MatchPhase, UserId};

use super::games::{
    GameRecord, NewGameRecord, NewParticipantRecord, ParticipantRecord, Storage, UserRecord,
};
use super::rest::StoreError;

#[derive(Default)]
struct Tables {
    games: HashMap<GameId, GameRecord>,
    participants: Vec<ParticipantRecord>,
    users: HashMap<UserId, UserRecord>,
    next_game_id: GameId,
    next_participant_id: i64,
}

/// Storage backed by process memory; ids are assigned sequentially
#[derive(Default)]
pub struct MemoryStorage {
    tables: Mutex<Tables>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a user row
    pub fn add_user(&self, id: UserId, display_name: &str) {
        self.tables.lock().users.insert(
            id,
            UserRecord {
                id,
                display_name: display_name.to_string(),
            },
        );
    }

    pub fn game(&self, id: GameId) -> Option<GameRecord> {
        self.tables.lock().games.get(&id).cloned()
    }

    pub fn participants_of(&self, game_id: GameId) -> Vec<ParticipantRecord> {
        self.tables
            .lock()
            .participants
            .iter()
            .filter(|p| p.game_id == game_id)
            .cloned()
            .collect()
    }

    pub fn game_count(&self) -> usize {
        self.tables.lock().games.len()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn insert_game(&self, new_game: &NewGameRecord) -> Result<GameRecord, StoreError> {
        let mut tables = self.tables.lock();
        tables.next_game_id += 1;
        let now = chrono::Utc::now();
        let record = GameRecord {
            id: tables.next_game_id,
            status: new_game.status,
            max_players: new_game.max_players,
            private: new_game.private,
            created_at: now,
            updated_at: now,
        };
        tables.games.insert(record.id, record.clone());
        Ok(record)
    }

    async fn get_game(&self, id: GameId) -> Result<Option<GameRecord>, StoreError> {
        Ok(self.tables.lock().games.get(&id).cloned())
    }

    async fn update_game_status(&self, id: GameId, status: MatchPhase) -> Result<(), StoreError> {
        let mut tables = self.tables.lock();
        let game = tables.games.get_mut(&id).ok_or(StoreError::NoRowReturned)?;
        game.status = status;
        game.updated_at = chrono::Utc::now();
        Ok(())
    }

    async fn insert_participant(
        &self,
        new_participant: &NewParticipantRecord,
    ) -> Result<ParticipantRecord, StoreError> {
        let mut tables = self.tables.lock();
        tables.next_participant_id += 1;
        let record = ParticipantRecord {
            id: tables.next_participant_id,
            game_id: new_participant.game_id,
            user_id: new_participant.user_id,
        };
        tables.participants.push(record.clone());
        Ok(record)
    }

    async fn get_users(&self, ids: &[UserId]) -> Result<Vec<UserRecord>, StoreError> {
        let tables = self.tables.lock();
        Ok(ids
            .iter()
            .filter_map(|id| tables.users.get(id).cloned())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn assigns_sequential_ids_and_updates_status() {
        let storage = MemoryStorage::new();

        let first = storage
            .insert_game(&NewGameRecord {
                status: MatchPhase::Waiting,
                max_players: 2,
                private: false,
            })
            .await
            .unwrap();
        let second = storage
            .insert_game(&NewGameRecord {
                status: MatchPhase::Waiting,
                max_players: 4,
                private: true,
            })
            .await
            .unwrap();

        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        assert!(second.private);

        storage
            .update_game_status(first.id, MatchPhase::Playing)
            .await
            .unwrap();
        let loaded = storage.get_game(first.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, MatchPhase::Playing);
    }

    #[tokio::test]
    async fn resolves_only_known_users() {
        let storage = MemoryStorage::new();
        storage.add_user(1, "alice");
        storage.add_user(2, "bob");

        let users = storage.get_users(&[1, 2, 3]).await.unwrap();
        assert_eq!(users.len(), 2);
    }
}
