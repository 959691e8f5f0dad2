//! Unified error type for Keyrace.

use keyrace_protocol::ProtocolError;
use keyrace_room::RoomError;
use keyrace_session::SessionError;
use keyrace_sync::SyncError;
use keyrace_transport::TransportError;

/// Top-level error that wraps every crate-specific error.
///
/// `?` converts sub-crate errors automatically, so server code deals with
/// this one type.
#[derive(Debug, thiserror::Error)]
pub enum KeyraceError {
    /// Connection, send or receive failure.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Malformed frame or unsupported protocol version.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The identity provider rejected the client.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A coordinator operation was refused.
    #[error(transparent)]
    Room(#[from] RoomError),

    #[error(transparent)]
    Sync(#[from] SyncError),
}

impl KeyraceError {
    /// The code reported to the client in a `ServerMessage::Error`.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Room(e) | Self::Sync(SyncError::Room(e)) => e.status_code(),
            Self::Protocol(_) => 400,
            Self::Session(_) => 401,
            Self::Transport(_) | Self::Sync(SyncError::Closed) => 500,
        }
    }
}
