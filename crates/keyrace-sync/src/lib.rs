//! Push-based delivery of room state for Keyrace.
//!
//! The store publishes every committed room document; this crate turns
//! that feed into the events a client cares about:
//!
//! - [`SyncEvent::Snapshot`] whenever the room changes
//! - [`SyncEvent::Removed`] when the client's own row disappears (kick or
//!   leave from elsewhere) while the room lives on
//! - [`SyncEvent::Vanished`] when the room itself is deleted
//!
//! [`RoomConnection`] bundles a join with its subscription and owns the
//! matching disconnect.

mod connection;
mod error;
mod subscription;

pub use connection::RoomConnection;
pub use error::SyncError;
pub use subscription::{RoomSubscription, SyncEvent};
