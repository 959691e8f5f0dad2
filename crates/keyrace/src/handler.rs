//! Per-connection handler: handshake, request routing and snapshot push.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Receive Handshake → check version
//!   2. Identify token → get the session
//!   3. Send HandshakeAck
//!   4. Loop: client requests go to the coordinator, room events go back
//!      to the client
//!
//! Mutating requests get no direct reply on success. The change reaches
//! the client like any other: as the next `Snapshot` of its room.

use std::sync::Arc;
use std::time::Duration;

use keyrace_protocol::{
    ClientRequest, Codec, Envelope, PROTOCOL_VERSION, ProtocolError, RoomId, ServerMessage,
};
use keyrace_room::{ProgressOutcome, RoomError};
use keyrace_session::{Identity, IdentityProvider};
use keyrace_sync::{RoomConnection, SyncError, SyncEvent};
use keyrace_transport::{Connection, WebSocketConnection};
use tokio::time::Instant;

use crate::KeyraceError;
use crate::server::{Membership, ServerState};

/// How long a client has to send its handshake.
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

/// Silence after which a connection is dropped. Clients heartbeat well
/// within this.
const IDLE_TIMEOUT: Duration = Duration::from_secs(15);

// ---------------------------------------------------------------------------
// Outbound frames
// ---------------------------------------------------------------------------

/// Numbers and stamps every frame this side sends.
struct Outbox<'a, I: IdentityProvider, C: Codec> {
    conn: &'a WebSocketConnection,
    state: &'a ServerState<I, C>,
    seq: u64,
}

impl<I: IdentityProvider, C: Codec> Outbox<'_, I, C> {
    async fn send(&mut self, payload: ServerMessage) -> Result<(), KeyraceError> {
        let envelope = Envelope::new(self.seq, self.state.coordinator.now(), payload);
        self.seq += 1;
        let bytes = self.state.codec.encode(&envelope)?;
        self.conn.send(&bytes).await?;
        Ok(())
    }

    async fn send_error(&mut self, code: u16, message: impl Into<String>) -> Result<(), KeyraceError> {
        self.send(ServerMessage::Error {
            code,
            message: message.into(),
        })
        .await
    }
}

// ---------------------------------------------------------------------------
// Connection lifecycle
// ---------------------------------------------------------------------------

/// Handles a single connection from accept to close.
///
/// Dropping the membership on an error path schedules the disconnect
/// through [`RoomConnection`]'s drop guard.
pub(crate) async fn handle_connection<I, C>(
    conn: WebSocketConnection,
    state: Arc<ServerState<I, C>>,
) -> Result<(), KeyraceError>
where
    I: IdentityProvider,
    C: Codec,
{
    let conn_id = conn.id();
    tracing::debug!(%conn_id, peer = %conn.peer_addr(), "handling new connection");

    let mut outbox = Outbox {
        conn: &conn,
        state: &*state,
        seq: 0,
    };
    let identity = perform_handshake(&conn, &state, &mut outbox).await?;
    let session = identity.session_id.clone();
    tracing::info!(%conn_id, %session, "client identified");

    let mut membership: Option<Membership> = None;
    let idle = tokio::time::sleep(IDLE_TIMEOUT);
    tokio::pin!(idle);

    loop {
        tokio::select! {
            received = conn.recv() => {
                let data = match received {
                    Ok(Some(data)) => data,
                    Ok(None) => {
                        tracing::info!(%session, "connection closed cleanly");
                        break;
                    }
                    Err(e) => {
                        tracing::debug!(%session, error = %e, "recv error");
                        break;
                    }
                };
                idle.as_mut().reset(Instant::now() + IDLE_TIMEOUT);

                let envelope: Envelope<ClientRequest> = match state.codec.decode(&data) {
                    Ok(envelope) => envelope,
                    Err(e) => {
                        tracing::warn!(%session, error = %e, "dropping undecodable frame");
                        outbox.send_error(400, format!("invalid request: {e}")).await?;
                        continue;
                    }
                };

                if let ClientRequest::Disconnect { reason } = &envelope.payload {
                    tracing::info!(%session, %reason, "client disconnected");
                    break;
                }

                let replies = match dispatch(&state, &identity, &mut membership, envelope.payload).await {
                    Ok(replies) => replies,
                    Err(e) => vec![ServerMessage::Error {
                        code: e.status_code(),
                        message: e.to_string(),
                    }],
                };
                for reply in replies {
                    outbox.send(reply).await?;
                }
            }

            event = next_room_event(&mut membership) => {
                match event {
                    Ok(SyncEvent::Snapshot(snapshot)) => {
                        outbox.send(ServerMessage::Snapshot { snapshot }).await?;
                    }
                    Ok(SyncEvent::Removed { room_id }) => {
                        tracing::info!(%session, %room_id, "removed from room");
                        membership = None;
                        outbox.send(ServerMessage::Removed { room_id }).await?;
                    }
                    Ok(SyncEvent::Vanished { room_id }) => {
                        tracing::info!(%session, %room_id, "room vanished");
                        membership = None;
                        outbox.send(ServerMessage::Vanished { room_id }).await?;
                    }
                    Err(e) => {
                        tracing::debug!(%session, error = %e, "room subscription ended");
                        membership = None;
                    }
                }
            }

            () = &mut idle => {
                tracing::info!(%session, "connection timed out");
                break;
            }
        }
    }

    if let Some(membership) = membership.take() {
        let room_id = membership.room_id();
        if let Err(e) = membership.disconnect().await {
            tracing::debug!(%session, %room_id, error = %e, "disconnect failed");
        }
    }
    let _ = conn.close().await;
    Ok(())
}

/// Receives the Handshake, checks the version, identifies the token and
/// sends the HandshakeAck.
async fn perform_handshake<I, C>(
    conn: &WebSocketConnection,
    state: &ServerState<I, C>,
    outbox: &mut Outbox<'_, I, C>,
) -> Result<Identity, KeyraceError>
where
    I: IdentityProvider,
    C: Codec,
{
    let data = match tokio::time::timeout(HANDSHAKE_TIMEOUT, conn.recv()).await {
        Ok(Ok(Some(data))) => data,
        Ok(Ok(None)) => {
            return Err(ProtocolError::InvalidMessage("connection closed before handshake".into()).into());
        }
        Ok(Err(e)) => return Err(e.into()),
        Err(_) => {
            return Err(ProtocolError::InvalidMessage("handshake timed out".into()).into());
        }
    };

    let envelope: Envelope<ClientRequest> = match state.codec.decode(&data) {
        Ok(envelope) => envelope,
        Err(e) => {
            outbox.send_error(400, "expected Handshake").await?;
            return Err(e.into());
        }
    };

    let ClientRequest::Handshake { version, token } = envelope.payload else {
        outbox.send_error(400, "expected Handshake").await?;
        return Err(ProtocolError::InvalidMessage("first message must be Handshake".into()).into());
    };

    if version != PROTOCOL_VERSION {
        outbox
            .send_error(
                400,
                format!("version mismatch: expected {PROTOCOL_VERSION}, got {version}"),
            )
            .await?;
        return Err(ProtocolError::InvalidMessage("protocol version mismatch".into()).into());
    }

    let identity = match state.identity.identify(token.as_deref().unwrap_or("")).await {
        Ok(identity) => identity,
        Err(e) => {
            outbox.send_error(401, "unauthorized").await?;
            return Err(e.into());
        }
    };

    outbox
        .send(ServerMessage::HandshakeAck {
            session_id: identity.session_id.clone(),
            server_time: state.coordinator.now(),
        })
        .await?;
    Ok(identity)
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Waits for the next event of the joined room, or forever when the
/// connection is not in a room.
async fn next_room_event(membership: &mut Option<Membership>) -> Result<SyncEvent, SyncError> {
    match membership {
        Some(membership) => membership.next_event().await,
        None => std::future::pending().await,
    }
}

/// The room this connection joined.
fn joined_room(membership: &Option<Membership>) -> Result<RoomId, RoomError> {
    membership
        .as_ref()
        .map(Membership::room_id)
        .ok_or_else(|| RoomError::precondition("join a room first"))
}

/// Ends the current membership, leaving the row in place.
async fn step_out(membership: &mut Option<Membership>) {
    if let Some(previous) = membership.take() {
        let room_id = previous.room_id();
        if let Err(e) = previous.disconnect().await {
            tracing::debug!(%room_id, error = %e, "disconnect from previous room failed");
        }
    }
}

/// Runs one request against the coordinator and returns the frames to send
/// back.
async fn dispatch<I, C>(
    state: &ServerState<I, C>,
    identity: &Identity,
    membership: &mut Option<Membership>,
    request: ClientRequest,
) -> Result<Vec<ServerMessage>, KeyraceError>
where
    I: IdentityProvider,
    C: Codec,
{
    let coordinator = &state.coordinator;
    let session = &identity.session_id;

    match request {
        ClientRequest::Handshake { .. } => {
            Err(ProtocolError::InvalidMessage("already handshaken".into()).into())
        }

        ClientRequest::Heartbeat { client_time } => Ok(vec![ServerMessage::HeartbeatAck {
            client_time,
            server_time: coordinator.now(),
        }]),

        ClientRequest::CreateRoom {
            host_name,
            game_mode,
        } => {
            step_out(membership).await;
            let name = identity.display_name(&host_name);
            let document = coordinator.create_room(session, name, game_mode).await?;
            let room_id = document.room.id;
            let code = document.room.code.clone();

            // The host takes part like anyone else.
            let (connection, snapshot) =
                RoomConnection::connect(Arc::clone(coordinator), &code, session.clone(), name, None)
                    .await?;
            let participant_id = connection.participant_id();
            *membership = Some(connection);

            Ok(vec![
                ServerMessage::RoomCreated { room_id, code },
                ServerMessage::Joined {
                    room_id,
                    participant_id,
                },
                ServerMessage::Snapshot { snapshot },
            ])
        }

        ClientRequest::JoinRoom { code, name, avatar } => {
            step_out(membership).await;
            let name = identity.display_name(&name);
            let (connection, snapshot) =
                RoomConnection::connect(Arc::clone(coordinator), &code, session.clone(), name, avatar)
                    .await?;
            let room_id = connection.room_id();
            let participant_id = connection.participant_id();
            *membership = Some(connection);

            Ok(vec![
                ServerMessage::Joined {
                    room_id,
                    participant_id,
                },
                ServerMessage::Snapshot { snapshot },
            ])
        }

        ClientRequest::LeaveRoom => {
            let room_id = joined_room(membership)?;
            if let Some(connection) = membership.take() {
                connection.leave().await?;
            }
            Ok(vec![ServerMessage::Removed { room_id }])
        }

        ClientRequest::SetReady { ready } => {
            coordinator
                .set_ready(joined_room(membership)?, session, ready)
                .await?;
            Ok(Vec::new())
        }

        ClientRequest::UpdateSettings { patch } => {
            coordinator
                .update_settings(joined_room(membership)?, session, &patch)
                .await?;
            Ok(Vec::new())
        }

        ClientRequest::SetRaceText {
            difficulty,
            word_count,
            custom_text,
        } => {
            coordinator
                .set_race_text(
                    joined_room(membership)?,
                    session,
                    difficulty.as_deref(),
                    word_count,
                    custom_text.as_deref(),
                )
                .await?;
            Ok(Vec::new())
        }

        ClientRequest::StartRace { countdown_seconds } => {
            coordinator
                .start_race(joined_room(membership)?, session, countdown_seconds)
                .await?;
            Ok(Vec::new())
        }

        ClientRequest::ReportProgress { report } => {
            let room_id = joined_room(membership)?;
            let (outcome, _) = coordinator.report_progress(room_id, session, report).await?;
            if outcome == ProgressOutcome::Ignored {
                tracing::debug!(%room_id, %session, "stale progress report ignored");
            }
            Ok(Vec::new())
        }

        ClientRequest::EndRace => {
            coordinator.end_race(joined_room(membership)?, session).await?;
            Ok(Vec::new())
        }

        ClientRequest::ResetRace => {
            coordinator
                .reset_for_new_race(joined_room(membership)?, session)
                .await?;
            Ok(Vec::new())
        }

        ClientRequest::Kick { participant_id } => {
            coordinator
                .kick(joined_room(membership)?, session, participant_id)
                .await?;
            Ok(Vec::new())
        }

        ClientRequest::DeleteRoom => {
            // Vanished arrives through the room subscription.
            coordinator.delete_room(joined_room(membership)?, session).await?;
            Ok(Vec::new())
        }

        // Handled by the connection loop before dispatch.
        ClientRequest::Disconnect { .. } => Ok(Vec::new()),
    }
}
