//! An owned membership in one room.

use std::sync::Arc;

use keyrace_protocol::{ParticipantId, RoomCode, RoomId, RoomSnapshot, SessionId};
use keyrace_room::{Clock, RoomCoordinator};
use keyrace_store::{RoomDocument, RoomStore};

use crate::{RoomSubscription, SyncError, SyncEvent};

/// A joined session plus its subscription.
///
/// Created by [`connect`](Self::connect). End it with
/// [`disconnect`](Self::disconnect) (row stays, marked disconnected) or
/// [`leave`](Self::leave) (row removed). Dropping it without either
/// schedules a disconnect on the current Tokio runtime.
pub struct RoomConnection<S: RoomStore, C: Clock> {
    coordinator: Arc<RoomCoordinator<S, C>>,
    room_id: RoomId,
    session: SessionId,
    participant_id: ParticipantId,
    subscription: RoomSubscription<S, C>,
    /// Cleared once the connection was ended explicitly.
    armed: bool,
}

impl<S: RoomStore, C: Clock> RoomConnection<S, C> {
    /// Joins the room with `code` and starts following it.
    ///
    /// Returns the snapshot produced by the join itself, so the caller
    /// sees its own row without waiting for the feed.
    pub async fn connect(
        coordinator: Arc<RoomCoordinator<S, C>>,
        code: &RoomCode,
        session: SessionId,
        name: &str,
        avatar: Option<String>,
    ) -> Result<(Self, RoomSnapshot), SyncError> {
        let joined = coordinator.join_room(code, &session, name, avatar).await?;
        let room_id = joined.snapshot.room.id;
        let subscription = RoomSubscription::for_member(
            Arc::clone(&coordinator),
            room_id,
            session.clone(),
            joined.snapshot.revision,
        )
        .await?;

        tracing::debug!(%room_id, %session, participant_id = %joined.participant_id, "room connection opened");
        let connection = Self {
            coordinator,
            room_id,
            session,
            participant_id: joined.participant_id,
            subscription,
            armed: true,
        };
        Ok((connection, joined.snapshot))
    }

    pub fn room_id(&self) -> RoomId {
        self.room_id
    }

    pub fn session(&self) -> &SessionId {
        &self.session
    }

    pub fn participant_id(&self) -> ParticipantId {
        self.participant_id
    }

    pub fn coordinator(&self) -> &Arc<RoomCoordinator<S, C>> {
        &self.coordinator
    }

    /// Waits for the next change to the room.
    pub async fn next_event(&mut self) -> Result<SyncEvent, SyncError> {
        let event = self.subscription.next_event().await?;
        if event.is_terminal() {
            // Nothing left to disconnect from.
            self.armed = false;
        }
        Ok(event)
    }

    /// Marks the row disconnected and ends the connection.
    pub async fn disconnect(mut self) -> Result<RoomDocument, SyncError> {
        self.armed = false;
        Ok(self
            .coordinator
            .disconnect(self.room_id, &self.session)
            .await?)
    }

    /// Removes the row and ends the connection.
    pub async fn leave(mut self) -> Result<RoomDocument, SyncError> {
        self.armed = false;
        Ok(self
            .coordinator
            .leave_room(self.room_id, &self.session)
            .await?)
    }
}

impl<S: RoomStore, C: Clock> Drop for RoomConnection<S, C> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(room_id = %self.room_id, session = %self.session, "connection dropped outside a runtime, disconnect skipped");
            return;
        };
        let coordinator = Arc::clone(&self.coordinator);
        let room_id = self.room_id;
        let session = self.session.clone();
        runtime.spawn(async move {
            if let Err(e) = coordinator.disconnect(room_id, &session).await {
                tracing::debug!(%room_id, %session, error = %e, "disconnect on drop failed");
            }
        });
    }
}
