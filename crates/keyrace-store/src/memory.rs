//! In-process [`RoomStore`].

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use keyrace_protocol::{Room, RoomCode, RoomId};
use tokio::sync::{Mutex, watch};

use crate::{Commit, DocumentFeed, RoomDocument, RoomStore, StoreError};

/// One room's document plus the feed its subscribers watch.
struct RoomSlot {
    /// `None` after deletion. A transaction that was waiting on this lock
    /// when the room was deleted finds `None` and reports `RoomNotFound`.
    document: Mutex<Option<RoomDocument>>,
    feed: watch::Sender<Option<Arc<RoomDocument>>>,
}

impl RoomSlot {
    fn new(document: RoomDocument) -> Self {
        let (feed, _) = watch::channel(Some(Arc::new(document.clone())));
        Self {
            document: Mutex::new(Some(document)),
            feed,
        }
    }

    /// Takes the document out and tells subscribers it is gone.
    async fn clear(&self) -> Option<RoomDocument> {
        let taken = self.document.lock().await.take();
        self.feed.send_replace(None);
        taken
    }
}

struct IndexEntry {
    code: RoomCode,
    expires_at: i64,
    slot: Arc<RoomSlot>,
}

#[derive(Default)]
struct Index {
    rooms: HashMap<RoomId, IndexEntry>,
    codes: HashMap<RoomCode, RoomId>,
}

impl Index {
    fn remove(&mut self, room_id: RoomId) -> Option<IndexEntry> {
        let entry = self.rooms.remove(&room_id)?;
        if self.codes.get(&entry.code) == Some(&room_id) {
            self.codes.remove(&entry.code);
        }
        Some(entry)
    }
}

/// Keeps every room in memory.
///
/// Lock order is index, then room. The index lock is held only for lookups
/// and for inserting or removing entries; transactions run under the room
/// lock alone, so different rooms never wait on each other.
pub struct MemoryRoomStore {
    index: Mutex<Index>,
    next_room_id: AtomicU64,
}

impl MemoryRoomStore {
    pub fn new() -> Self {
        Self {
            index: Mutex::new(Index::default()),
            next_room_id: AtomicU64::new(1),
        }
    }

    async fn slot(&self, room_id: RoomId) -> Result<Arc<RoomSlot>, StoreError> {
        self.index
            .lock()
            .await
            .rooms
            .get(&room_id)
            .map(|entry| Arc::clone(&entry.slot))
            .ok_or(StoreError::RoomNotFound(room_id))
    }
}

impl Default for MemoryRoomStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RoomStore for MemoryRoomStore {
    async fn insert_room<F>(&self, code: RoomCode, build: F) -> Result<RoomDocument, StoreError>
    where
        F: FnOnce(RoomId) -> Room + Send,
    {
        let room_id = RoomId(self.next_room_id.fetch_add(1, Ordering::Relaxed));
        let room = build(room_id);

        let mut index = self.index.lock().await;

        if let Some(&holder) = index.codes.get(&code) {
            let expired = index
                .rooms
                .get(&holder)
                .is_some_and(|entry| entry.expires_at <= room.created_at);
            if !expired {
                return Err(StoreError::CodeTaken(code));
            }
            if let Some(entry) = index.remove(holder) {
                entry.slot.clear().await;
                tracing::info!(room_id = %holder, %code, "expired room evicted for code reuse");
            }
        }

        let document = RoomDocument::new(room);
        let entry = IndexEntry {
            code: code.clone(),
            expires_at: document.room.expires_at,
            slot: Arc::new(RoomSlot::new(document.clone())),
        };
        index.codes.insert(code, room_id);
        index.rooms.insert(room_id, entry);
        Ok(document)
    }

    async fn find_by_code(&self, code: &RoomCode) -> Option<RoomId> {
        self.index.lock().await.codes.get(code).copied()
    }

    async fn load(&self, room_id: RoomId) -> Result<RoomDocument, StoreError> {
        let slot = self.slot(room_id).await?;
        let guard = slot.document.lock().await;
        guard.clone().ok_or(StoreError::RoomNotFound(room_id))
    }

    async fn transact<T, E, F>(&self, room_id: RoomId, f: F) -> Result<Commit<T>, E>
    where
        T: Send,
        E: From<StoreError> + Send,
        F: FnOnce(&mut RoomDocument) -> Result<T, E> + Send,
    {
        let slot = self.slot(room_id).await?;
        let mut guard = slot.document.lock().await;
        let current = guard.as_ref().ok_or(StoreError::RoomNotFound(room_id))?;

        let mut draft = current.clone();
        let value = f(&mut draft)?;

        if draft == *current {
            return Ok(Commit {
                value,
                document: draft,
                changed: false,
            });
        }

        draft.revision = current.revision + 1;
        slot.feed.send_replace(Some(Arc::new(draft.clone())));
        *guard = Some(draft.clone());
        Ok(Commit {
            value,
            document: draft,
            changed: true,
        })
    }

    async fn delete_room(&self, room_id: RoomId) -> Result<RoomDocument, StoreError> {
        let entry = self
            .index
            .lock()
            .await
            .remove(room_id)
            .ok_or(StoreError::RoomNotFound(room_id))?;
        entry
            .slot
            .clear()
            .await
            .ok_or(StoreError::RoomNotFound(room_id))
    }

    async fn subscribe(&self, room_id: RoomId) -> Result<DocumentFeed, StoreError> {
        Ok(self.slot(room_id).await?.feed.subscribe())
    }

    async fn expired_rooms(&self, now: i64) -> Vec<RoomId> {
        let index = self.index.lock().await;
        let mut expired: Vec<RoomId> = index
            .rooms
            .iter()
            .filter(|(_, entry)| entry.expires_at <= now)
            .map(|(id, _)| *id)
            .collect();
        expired.sort();
        expired
    }

    async fn room_count(&self) -> usize {
        self.index.lock().await.rooms.len()
    }
}
