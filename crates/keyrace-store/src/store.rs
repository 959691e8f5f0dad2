//! The persistence contract.

use std::future::Future;
use std::sync::Arc;

use keyrace_protocol::{Room, RoomCode, RoomId};
use tokio::sync::watch;

use crate::{RoomDocument, StoreError};

/// Latest committed document of one room. `None` once the room is deleted.
pub type DocumentFeed = watch::Receiver<Option<Arc<RoomDocument>>>;

/// What a successful [`RoomStore::transact`] hands back.
#[derive(Debug, Clone)]
pub struct Commit<T> {
    /// Whatever the closure returned.
    pub value: T,
    /// The document as committed (or as it already was, if nothing changed).
    pub document: RoomDocument,
    /// `false` when the closure left the document untouched and nothing was
    /// published.
    pub changed: bool,
}

/// Transactional storage for room documents.
///
/// Every method touches at most one room. Implementations must serialize
/// transactions on the same room and must publish each changed commit to
/// that room's subscribers.
pub trait RoomStore: Send + Sync + 'static {
    /// Reserves `code` and stores the room built by `build`.
    ///
    /// The store allocates the id and passes it to `build`. A code held by
    /// a room whose `expires_at` is at or before the new room's
    /// `created_at` is reclaimed: the old room is deleted first.
    ///
    /// # Errors
    /// `StoreError::CodeTaken` when a live room holds `code`.
    fn insert_room<F>(
        &self,
        code: RoomCode,
        build: F,
    ) -> impl Future<Output = Result<RoomDocument, StoreError>> + Send
    where
        F: FnOnce(RoomId) -> Room + Send;

    /// Looks up the room currently holding `code`.
    fn find_by_code(&self, code: &RoomCode) -> impl Future<Output = Option<RoomId>> + Send;

    /// Reads the latest committed document.
    fn load(
        &self,
        room_id: RoomId,
    ) -> impl Future<Output = Result<RoomDocument, StoreError>> + Send;

    /// Runs `f` against a private copy of the document under the room's
    /// lock. The copy is committed only if `f` returns `Ok`; if it returns
    /// `Err` the stored document is untouched.
    fn transact<T, E, F>(
        &self,
        room_id: RoomId,
        f: F,
    ) -> impl Future<Output = Result<Commit<T>, E>> + Send
    where
        T: Send,
        E: From<StoreError> + Send,
        F: FnOnce(&mut RoomDocument) -> Result<T, E> + Send;

    /// Removes the room and all its participants. Subscribers see `None`.
    fn delete_room(
        &self,
        room_id: RoomId,
    ) -> impl Future<Output = Result<RoomDocument, StoreError>> + Send;

    /// Opens a feed on the room's committed documents.
    fn subscribe(
        &self,
        room_id: RoomId,
    ) -> impl Future<Output = Result<DocumentFeed, StoreError>> + Send;

    /// Rooms whose `expires_at` is at or before `now`.
    fn expired_rooms(&self, now: i64) -> impl Future<Output = Vec<RoomId>> + Send;

    fn room_count(&self) -> impl Future<Output = usize> + Send;
}
