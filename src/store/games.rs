//! Persisted match and user records

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::game::{GameId, MatchPhase, UserId};

use super::rest::{RestClient, StoreError};

/// Persisted match record, mirroring one live match
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameRecord {
    pub id: GameId,
    pub status: MatchPhase,
    pub max_players: u8,
    pub private: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// New match record for insertion
#[derive(Debug, Clone, Serialize)]
pub struct NewGameRecord {
    pub status: MatchPhase,
    pub max_players: u8,
    pub private: bool,
}

/// One player's membership in a persisted match
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantRecord {
    pub id: i64,
    pub game_id: GameId,
    pub user_id: UserId,
}

/// New participant row for insertion
#[derive(Debug, Clone, Serialize)]
pub struct NewParticipantRecord {
    pub game_id: GameId,
    pub user_id: UserId,
}

/// User row, read to resolve queue rosters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: UserId,
    pub display_name: String,
}

/// Storage collaborator consumed by the matchmaking coordinator
///
/// The core assumes no transactional guarantees across calls; a failed
/// insert mid-sequence is surfaced as-is and never rolled back.
#[async_trait]
pub trait Storage: Send + Sync {
    async fn insert_game(&self, new_game: &NewGameRecord) -> Result<GameRecord, StoreError>;

    async fn get_game(&self, id: GameId) -> Result<Option<GameRecord>, StoreError>;

    async fn update_game_status(&self, id: GameId, status: MatchPhase) -> Result<(), StoreError>;

    async fn insert_participant(
        &self,
        new_participant: &NewParticipantRecord,
    ) -> Result<ParticipantRecord, StoreError>;

    async fn get_users(&self, ids: &[UserId]) -> Result<Vec<UserRecord>, StoreError>;
}

/// Storage backed by the PostgREST API
#[derive(Clone)]
pub struct RestStorage {
    client: RestClient,
}

impl RestStorage {
    pub fn new(client: RestClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Storage for RestStorage {
    async fn insert_game(&self, new_game: &NewGameRecord) -> Result<GameRecord, StoreError> {
        self.client.insert("games", new_game).await
    }

    async fn get_game(&self, id: GameId) -> Result<Option<GameRecord>, StoreError> {
        let query = format!("id=eq.{}", id);
        self.client.get_one("games", &query).await
    }

    async fn update_game_status(&self, id: GameId, status: MatchPhase) -> Result<(), StoreError> {
        let query = format!("id=eq.{}", id);
        let patch = serde_json::json!({ "status": status });
        self.client.update("games", &query, &patch).await
    }

    async fn insert_participant(
        &self,
        new_participant: &NewParticipantRecord,
    ) -> Result<ParticipantRecord, StoreError> {
        self.client.insert("game_participants", new_participant).await
    }

    async fn get_users(&self, ids: &[UserId]) -> Result<Vec<UserRecord>, StoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let id_list = ids
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(",");
        let query = format!("id=in.({})&select=id,display_name", id_list);
        self.client.get("users", &query).await
    }
}
