//! # Keyrace
//!
//! Multiplayer typing-race server.
//!
//! A host creates a room and shares its five-character code; others join
//! with it, mark themselves ready, and race on the same text. The server
//! keeps the authoritative room document, assigns finish positions in the
//! order finishes arrive, and pushes a fresh snapshot to every member
//! after each change.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use keyrace::prelude::*;
//!
//! # async fn run() -> Result<(), KeyraceError> {
//! let server = KeyraceServerBuilder::new()
//!     .bind("0.0.0.0:8080")
//!     .build(AnonymousIdentity)
//!     .await?;
//! server.run().await
//! # }
//! ```
//!
//! The building blocks live in their own crates and are re-exported here:
//! [`keyrace_room`] for the coordinator, [`keyrace_store`] for persistence,
//! [`keyrace_sync`] for snapshot delivery.

mod error;
mod handler;
pub mod logging;
mod server;

pub use error::KeyraceError;
pub use server::{Coordinator, KeyraceServer, KeyraceServerBuilder};

pub use keyrace_protocol;
pub use keyrace_room;
pub use keyrace_session;
pub use keyrace_store;
pub use keyrace_sync;
pub use keyrace_transport;

pub mod prelude {
    pub use crate::{Coordinator, KeyraceError, KeyraceServer, KeyraceServerBuilder};

    pub use keyrace_protocol::{
        ClientRequest, Difficulty, Envelope, GameMode, PROTOCOL_VERSION, ParticipantId,
        ProgressReport, RaceStats, RoomCode, RoomId, RoomSnapshot, RoomStatus, ServerMessage,
        SessionId, SettingsPatch,
    };
    pub use keyrace_room::{CoordinatorConfig, RoomCoordinator, RoomError};
    pub use keyrace_session::{AnonymousIdentity, Identity, IdentityProvider, SessionError};
    pub use keyrace_store::{MemoryRoomStore, RoomStore};
    pub use keyrace_sync::{RoomConnection, SyncEvent};
}
