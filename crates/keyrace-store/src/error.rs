//! Error types for the store.

use keyrace_protocol::{RoomCode, RoomId};

/// Errors the persistence layer can report.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No document exists for this room (never created, or deleted).
    #[error("room {0} not found")]
    RoomNotFound(RoomId),

    /// Another live room already uses this join code.
    #[error("room code {0} is already in use")]
    CodeTaken(RoomCode),
}
