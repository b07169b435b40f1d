//! Persistence adapter for conversation turns.

pub mod errors;
pub mod transcript_store;
pub mod turn;

pub use errors::{StoreError, StoreResult};
pub use transcript_store::{SqliteTranscriptStore, StoreFuture, TranscriptStore};
pub use turn::{SessionId, Turn, TurnRole};
