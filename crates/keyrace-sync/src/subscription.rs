//! Turning a room's document feed into client events.

use std::sync::Arc;

use keyrace_protocol::{RoomId, RoomSnapshot, SessionId};
use keyrace_room::{Clock, RoomCoordinator};
use keyrace_store::{DocumentFeed, RoomDocument, RoomStore};

use crate::SyncError;

/// What a subscriber is told.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    /// The room at a new revision.
    Snapshot(RoomSnapshot),
    /// The watched session's row is gone but the room still exists.
    /// Terminal.
    Removed { room_id: RoomId },
    /// The room was deleted. Terminal.
    Vanished { room_id: RoomId },
}

impl SyncEvent {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Snapshot(_))
    }
}

/// Follows one room.
///
/// Intermediate revisions may be skipped when the subscriber falls behind;
/// each snapshot is always a complete committed state.
pub struct RoomSubscription<S, C> {
    coordinator: Arc<RoomCoordinator<S, C>>,
    room_id: RoomId,
    feed: DocumentFeed,
    member: Option<SessionId>,
    /// Set once the member's row has been observed (or is known to exist),
    /// so its absence means removal rather than "not joined yet".
    member_seen: bool,
    last_revision: Option<u64>,
    closed: bool,
}

impl<S: RoomStore, C: Clock> RoomSubscription<S, C> {
    /// Watches a room as an observer. If `member` is given, its row
    /// disappearing ends the subscription with `Removed`.
    pub async fn open(
        coordinator: Arc<RoomCoordinator<S, C>>,
        room_id: RoomId,
        member: Option<SessionId>,
    ) -> Result<Self, SyncError> {
        let feed = coordinator.feed(room_id).await?;
        Ok(Self {
            coordinator,
            room_id,
            feed,
            member,
            member_seen: false,
            last_revision: None,
            closed: false,
        })
    }

    /// Like [`open`](Self::open) for a session that has already joined at
    /// `revision`. A commit newer than the join that lacks the row counts
    /// as removal, even if the subscriber never saw the row itself.
    pub(crate) async fn for_member(
        coordinator: Arc<RoomCoordinator<S, C>>,
        room_id: RoomId,
        member: SessionId,
        revision: u64,
    ) -> Result<Self, SyncError> {
        let mut subscription = Self::open(coordinator, room_id, Some(member)).await?;
        subscription.member_seen = true;
        subscription.last_revision = Some(revision);
        Ok(subscription)
    }

    pub fn room_id(&self) -> RoomId {
        self.room_id
    }

    /// Waits for the next event.
    ///
    /// # Errors
    /// `SyncError::Closed` once a terminal event has been delivered.
    pub async fn next_event(&mut self) -> Result<SyncEvent, SyncError> {
        loop {
            if self.closed {
                return Err(SyncError::Closed);
            }

            let latest = self.feed.borrow_and_update().clone();
            if let Some(event) = self.observe(latest) {
                if event.is_terminal() {
                    self.closed = true;
                    tracing::debug!(room_id = %self.room_id, ?event, "subscription ended");
                }
                return Ok(event);
            }

            if self.feed.changed().await.is_err() {
                // Publisher gone without a final value we could see.
                self.closed = true;
                return Ok(SyncEvent::Vanished {
                    room_id: self.room_id,
                });
            }
        }
    }

    fn observe(&mut self, latest: Option<Arc<RoomDocument>>) -> Option<SyncEvent> {
        let Some(document) = latest else {
            return Some(SyncEvent::Vanished {
                room_id: self.room_id,
            });
        };

        if let Some(member) = &self.member {
            let present = document.participants.contains_session(member);
            let newer = self.last_revision.is_none_or(|seen| document.revision > seen);
            if present {
                self.member_seen = true;
            } else if self.member_seen && newer {
                return Some(SyncEvent::Removed {
                    room_id: self.room_id,
                });
            }
        }

        if self.last_revision == Some(document.revision) {
            return None;
        }
        self.last_revision = Some(document.revision);
        Some(SyncEvent::Snapshot(self.coordinator.project(&document)))
    }
}
