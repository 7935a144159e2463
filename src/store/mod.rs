//! Storage collaborator seam

pub mod games;
pub mod memory;
pub mod rest;

pub use games::{
    GameRecord, NewGameRecord, NewParticipantRecord, ParticipantRecord, RestStorage, Storage,
    UserRecord,
};
pub use memory::MemoryStorage;
pub use rest::{RestClient, StoreError};
