//! Matchmaking modules

pub mod queue;
pub mod service;

pub use queue::{QueueEntry, WaitingQueue};
pub use service::{MatchmakingError, MatchmakingService, QueueEvent, QueuedPlayer};
