//! Room persistence for Keyrace.
//!
//! A room and its participant rows form one [`RoomDocument`]. Every
//! mutation is a [`RoomStore::transact`] over exactly one document: the
//! closure sees a private draft, and the draft replaces the stored document
//! only if the closure succeeds. Subscribers watch a per-room feed that
//! carries the latest committed document, so nobody ever observes half of a
//! mutation.
//!
//! # Key types
//!
//! - [`RoomStore`]: the persistence contract the coordinator depends on
//! - [`MemoryRoomStore`]: in-process implementation
//! - [`RoomDocument`]: room + participants + revision
//! - [`ParticipantTable`]: the participant rows of one room

#![allow(async_fn_in_trait)]

mod document;
mod error;
mod memory;
mod participants;
mod store;

pub use document::RoomDocument;
pub use error::StoreError;
pub use memory::MemoryRoomStore;
pub use participants::{ParticipantTable, Upsert};
pub use store::{Commit, DocumentFeed, RoomStore};
