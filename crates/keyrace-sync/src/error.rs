//! Error types for the sync layer.

use keyrace_room::RoomError;

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error(transparent)]
    Room(#[from] RoomError),

    /// The subscription already delivered `Removed` or `Vanished`.
    #[error("subscription closed")]
    Closed,
}
