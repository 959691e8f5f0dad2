//! Messages exchanged over the socket.
//!
//! Both directions use internally tagged JSON (`{"type": "JoinRoom", ...}`),
//! which maps directly onto a TypeScript discriminated union on the client.

use serde::{Deserialize, Serialize};

use crate::{
    GameMode, ParticipantId, ProgressReport, RoomCode, RoomId, RoomSnapshot, SessionId,
    SettingsPatch,
};

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// Top-level wire frame.
///
/// Each side numbers its own frames; `timestamp` is the sender's wall clock
/// in epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub seq: u64,
    pub timestamp: i64,
    pub payload: T,
}

impl<T> Envelope<T> {
    pub fn new(seq: u64, timestamp: i64, payload: T) -> Self {
        Self {
            seq,
            timestamp,
            payload,
        }
    }
}

// ---------------------------------------------------------------------------
// Client → Server
// ---------------------------------------------------------------------------

/// Requests a client may send once connected.
///
/// Room-scoped requests act on the room the connection joined; the caller's
/// identity is the session established by the handshake.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientRequest {
    /// Must be the first frame. `token` is handed to the identity provider.
    Handshake { version: u32, token: Option<String> },

    /// Keep-alive and clock sync probe.
    Heartbeat { client_time: i64 },

    CreateRoom {
        host_name: String,
        #[serde(default)]
        game_mode: GameMode,
    },

    JoinRoom {
        code: RoomCode,
        name: String,
        avatar: Option<String>,
    },

    LeaveRoom,

    SetReady { ready: bool },

    UpdateSettings { patch: SettingsPatch },

    SetRaceText {
        difficulty: Option<String>,
        word_count: Option<u32>,
        custom_text: Option<String>,
    },

    /// Defaults to a 5 second countdown when omitted.
    StartRace { countdown_seconds: Option<u32> },

    ReportProgress { report: ProgressReport },

    EndRace,

    ResetRace,

    Kick { participant_id: ParticipantId },

    DeleteRoom,

    Disconnect { reason: String },
}

// ---------------------------------------------------------------------------
// Server → Client
// ---------------------------------------------------------------------------

/// Messages the server sends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    HandshakeAck {
        session_id: SessionId,
        server_time: i64,
    },

    HeartbeatAck {
        client_time: i64,
        server_time: i64,
    },

    RoomCreated { room_id: RoomId, code: RoomCode },

    Joined {
        room_id: RoomId,
        participant_id: ParticipantId,
    },

    /// Latest composite state of the joined room.
    Snapshot { snapshot: RoomSnapshot },

    /// This client's row was deleted (kicked) while the room lives on.
    Removed { room_id: RoomId },

    /// The room itself is gone.
    Vanished { room_id: RoomId },

    /// `code` follows HTTP conventions: 400 validation, 403 permission,
    /// 404 not found, 409 precondition, 500 internal.
    Error { code: u16, message: String },
}
