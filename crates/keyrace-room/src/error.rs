//! Error types for the coordination layer.

use keyrace_protocol::{ParticipantId, ProtocolError, RoomCode, RoomId, SessionId};
use keyrace_store::StoreError;

/// Errors a [`RoomCoordinator`](crate::RoomCoordinator) operation can return.
///
/// Every error leaves the room exactly as it was.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// No live room has this code.
    #[error("no room with code {0}")]
    CodeNotFound(RoomCode),

    /// The room does not exist (never created, deleted, or purged).
    #[error("room {0} not found")]
    RoomNotFound(RoomId),

    /// The caller has no participant row in this room.
    #[error("session {session_id} is not in room {room_id}")]
    NotInRoom {
        room_id: RoomId,
        session_id: SessionId,
    },

    /// The kick target has no row in this room.
    #[error("participant {0} not found")]
    ParticipantNotFound(ParticipantId),

    /// Only the host may do this.
    #[error("only the host can {0}")]
    Permission(&'static str),

    /// The room is not in a state that allows this.
    #[error("{0}")]
    Precondition(String),

    /// The request itself is malformed.
    #[error("invalid {field}: {reason}")]
    Validation {
        field: &'static str,
        reason: String,
    },

    /// Every generated code collided with a live room.
    #[error("could not find a free room code after {0} attempts")]
    CodeSpaceExhausted(u32),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl RoomError {
    pub fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field,
            reason: reason.into(),
        }
    }

    pub fn precondition(reason: impl Into<String>) -> Self {
        Self::Precondition(reason.into())
    }

    /// `true` for the not-found family, including a store-level miss.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::CodeNotFound(_)
                | Self::RoomNotFound(_)
                | Self::NotInRoom { .. }
                | Self::ParticipantNotFound(_)
                | Self::Store(StoreError::RoomNotFound(_))
        )
    }

    /// The numeric code sent to clients in `ServerMessage::Error`.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation { .. } => 400,
            Self::Permission(_) => 403,
            e if e.is_not_found() => 404,
            Self::Precondition(_) => 409,
            _ => 500,
        }
    }
}

impl From<ProtocolError> for RoomError {
    fn from(error: ProtocolError) -> Self {
        match error {
            ProtocolError::InvalidField { field, reason } => Self::Validation { field, reason },
            other => Self::Validation {
                field: "request",
                reason: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_code_maps_taxonomy() {
        assert_eq!(RoomError::validation("name", "empty").status_code(), 400);
        assert_eq!(RoomError::Permission("start the race").status_code(), 403);
        assert_eq!(RoomError::RoomNotFound(RoomId(1)).status_code(), 404);
        assert_eq!(
            RoomError::Store(StoreError::RoomNotFound(RoomId(1))).status_code(),
            404
        );
        assert_eq!(RoomError::precondition("not ready").status_code(), 409);
        assert_eq!(RoomError::CodeSpaceExhausted(16).status_code(), 500);
    }

    #[test]
    fn test_from_protocol_error_becomes_validation() {
        let err: RoomError = SessionId::new("").unwrap_err().into();
        assert_eq!(err.status_code(), 400);
    }
}
