//! Data model and wire protocol for Keyrace.
//!
//! This crate defines everything that crosses a boundary: the room and
//! participant records the store persists, the snapshots subscribers
//! receive, and the request/response messages clients exchange with the
//! server.
//!
//! - **Identity** ([`RoomId`], [`ParticipantId`], [`SessionId`],
//!   [`RoomCode`]): validated newtypes.
//! - **Model** ([`Room`], [`Participant`], [`RoomSettings`], …): plain
//!   data with the small invariant-preserving helpers that belong to it.
//! - **Snapshot** ([`RoomSnapshot`], [`Standing`]): the composite view
//!   pushed to subscribers.
//! - **Messages** ([`ClientRequest`], [`ServerMessage`], [`Envelope`]):
//!   what travels on the socket.
//! - **Codec** ([`Codec`], [`JsonCodec`]): bytes in, types out.
//!
//! ```text
//! Transport (bytes) → Protocol (Envelope) → Coordinator (room state)
//! ```

mod codec;
mod error;
mod ids;
mod messages;
mod model;
mod snapshot;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use ids::{ParticipantId, RoomCode, RoomId, SessionId};
pub use messages::{ClientRequest, Envelope, ServerMessage};
pub use model::{
    Difficulty, GameMode, Participant, ProgressReport, QuoteLength,
    RaceStats, Room, RoomSettings, RoomStatus, SettingsPatch, TestMode,
    TextAlign,
};
pub use snapshot::{ParticipantView, RoomSnapshot, Standing};

/// Current wire protocol version. Clients send it in their handshake.
pub const PROTOCOL_VERSION: u32 = 1;
