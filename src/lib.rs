//! Arena match core - authoritative simulation, matchmaking and events
//!
//! The crate owns three cooperating pieces:
//! - the match engine, a fixed-tick paddle-and-ball simulation
//! - the matchmaking coordinator, forming matches from a shared queue and
//!   persisting them through the storage collaborator
//! - the typed event bus carrying queue and match lifecycle events to
//!   long-lived subscribers
//!
//! Transport (HTTP/WS routing, sessions) and the storage engine itself
//! are external collaborators; the binary in `main.rs` is only the
//! composition root.

pub mod app;
pub mod bus;
pub mod config;
pub mod game;
pub mod matchmaking;
pub mod store;
pub mod util;

pub use app::AppState;
pub use bus::{DomainEvent, EventBus, EventName, ProtocolError, Subscription};
pub use game::runner::MatchEvent;
pub use game::{
    CapacityError, GameId, MatchEngine, MatchPhase, MatchRegistry, MatchSize, PaddleDir, UserId,
};
pub use matchmaking::{MatchmakingError, MatchmakingService, QueueEvent, QueuedPlayer};
