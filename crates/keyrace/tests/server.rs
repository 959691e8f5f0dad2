//! End-to-end tests: real WebSocket clients against a server on a free port.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use keyrace::prelude::*;
use tokio_tungstenite::tungstenite::Message;

// =========================================================================
// Helpers
// =========================================================================

type ClientWs = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

/// Starts a server on a random port and returns its address and
/// coordinator.
async fn start_server() -> (String, Arc<Coordinator>) {
    let server = KeyraceServerBuilder::new()
        .bind("127.0.0.1:0")
        .build(AnonymousIdentity)
        .await
        .expect("server should build");

    let addr = server
        .local_addr()
        .expect("should have local addr")
        .to_string();
    let coordinator = Arc::clone(server.coordinator());

    tokio::spawn(async move {
        let _ = server.run().await;
    });
    (addr, coordinator)
}

struct Client {
    ws: ClientWs,
    seq: u64,
}

impl Client {
    async fn connect(addr: &str) -> Self {
        let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
            .await
            .expect("should connect");
        Self { ws, seq: 0 }
    }

    /// Connects and completes the handshake with `token` as the session.
    async fn identified(addr: &str, token: &str) -> Self {
        let mut client = Self::connect(addr).await;
        client.handshake(PROTOCOL_VERSION, Some(token)).await;
        match client.recv().await {
            ServerMessage::HandshakeAck { session_id, .. } => {
                assert_eq!(session_id.as_str(), token);
            }
            other => panic!("expected HandshakeAck, got {other:?}"),
        }
        client
    }

    async fn handshake(&mut self, version: u32, token: Option<&str>) {
        self.send(ClientRequest::Handshake {
            version,
            token: token.map(str::to_string),
        })
        .await;
    }

    async fn send(&mut self, payload: ClientRequest) {
        let envelope = Envelope::new(self.seq, 0, payload);
        self.seq += 1;
        let json = serde_json::to_string(&envelope).expect("encode");
        self.ws.send(Message::Text(json.into())).await.expect("send");
    }

    async fn recv(&mut self) -> ServerMessage {
        let msg = tokio::time::timeout(Duration::from_secs(2), self.ws.next())
            .await
            .expect("no frame within 2s")
            .expect("stream ended")
            .expect("recv failed");
        let envelope: Envelope<ServerMessage> =
            serde_json::from_slice(&msg.into_data()).expect("decode");
        envelope.payload
    }

    /// Skips frames until one matches.
    async fn recv_until(&mut self, wanted: impl Fn(&ServerMessage) -> bool) -> ServerMessage {
        loop {
            let msg = self.recv().await;
            if wanted(&msg) {
                return msg;
            }
        }
    }

    /// Skips frames until a snapshot matches.
    async fn snapshot_where(&mut self, wanted: impl Fn(&RoomSnapshot) -> bool) -> RoomSnapshot {
        match self
            .recv_until(|m| matches!(m, ServerMessage::Snapshot { snapshot } if wanted(snapshot)))
            .await
        {
            ServerMessage::Snapshot { snapshot } => snapshot,
            _ => unreachable!(),
        }
    }

    async fn expect_error(&mut self) -> u16 {
        match self.recv_until(|m| matches!(m, ServerMessage::Error { .. })).await {
            ServerMessage::Error { code, .. } => code,
            _ => unreachable!(),
        }
    }

    /// Creates a room and returns its id and code.
    async fn create_room(&mut self, name: &str, game_mode: GameMode) -> (RoomId, RoomCode) {
        self.send(ClientRequest::CreateRoom {
            host_name: name.into(),
            game_mode,
        })
        .await;
        let created = match self.recv().await {
            ServerMessage::RoomCreated { room_id, code } => (room_id, code),
            other => panic!("expected RoomCreated, got {other:?}"),
        };
        assert!(matches!(self.recv().await, ServerMessage::Joined { .. }));
        assert!(matches!(self.recv().await, ServerMessage::Snapshot { .. }));
        created
    }

    /// Joins by code and returns the participant id plus the first
    /// snapshot.
    async fn join(&mut self, code: &RoomCode, name: &str) -> (ParticipantId, RoomSnapshot) {
        self.send(ClientRequest::JoinRoom {
            code: code.clone(),
            name: name.into(),
            avatar: None,
        })
        .await;
        let participant_id = match self.recv().await {
            ServerMessage::Joined { participant_id, .. } => participant_id,
            other => panic!("expected Joined, got {other:?}"),
        };
        match self.recv().await {
            ServerMessage::Snapshot { snapshot } => (participant_id, snapshot),
            other => panic!("expected Snapshot, got {other:?}"),
        }
    }
}

// =========================================================================
// Handshake
// =========================================================================

#[tokio::test]
async fn test_handshake_valid_token_returns_session() {
    let (addr, _) = start_server().await;
    let _client = Client::identified(&addr, "browser-1").await;
}

#[tokio::test]
async fn test_handshake_wrong_version_returns_400() {
    let (addr, _) = start_server().await;
    let mut client = Client::connect(&addr).await;

    client.handshake(999, Some("browser-1")).await;

    match client.recv().await {
        ServerMessage::Error { code, message } => {
            assert_eq!(code, 400);
            assert!(message.contains("version"));
        }
        other => panic!("expected Error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_handshake_missing_token_returns_401() {
    let (addr, _) = start_server().await;
    let mut client = Client::connect(&addr).await;

    client.handshake(PROTOCOL_VERSION, None).await;

    assert_eq!(client.expect_error().await, 401);
}

#[tokio::test]
async fn test_first_frame_not_handshake_returns_400() {
    let (addr, _) = start_server().await;
    let mut client = Client::connect(&addr).await;

    client.send(ClientRequest::Heartbeat { client_time: 1 }).await;

    assert_eq!(client.expect_error().await, 400);
}

#[tokio::test]
async fn test_heartbeat_echoes_client_time() {
    let (addr, _) = start_server().await;
    let mut client = Client::identified(&addr, "browser-1").await;

    client.send(ClientRequest::Heartbeat { client_time: 42 }).await;

    match client.recv().await {
        ServerMessage::HeartbeatAck {
            client_time,
            server_time,
        } => {
            assert_eq!(client_time, 42);
            assert!(server_time > 0);
        }
        other => panic!("expected HeartbeatAck, got {other:?}"),
    }
}

#[tokio::test]
async fn test_garbage_frame_returns_400_and_keeps_connection() {
    let (addr, _) = start_server().await;
    let mut client = Client::identified(&addr, "browser-1").await;

    client.ws.send(Message::Text("not json".to_string().into())).await.unwrap();
    assert_eq!(client.expect_error().await, 400);

    client.send(ClientRequest::Heartbeat { client_time: 7 }).await;
    assert!(matches!(
        client.recv().await,
        ServerMessage::HeartbeatAck { client_time: 7, .. }
    ));
}

// =========================================================================
// Rooms
// =========================================================================

#[tokio::test]
async fn test_create_room_host_joins_own_room() {
    let (addr, coordinator) = start_server().await;
    let mut host = Client::identified(&addr, "host").await;

    let (room_id, code) = host.create_room("Ada", GameMode::Race).await;

    let snapshot = coordinator.snapshot(room_id).await.unwrap();
    assert_eq!(snapshot.room.code, code);
    let me = snapshot.participant(&SessionId::new("host").unwrap()).unwrap();
    assert!(me.is_host);
    assert_eq!(me.participant.name, "Ada");
}

#[tokio::test]
async fn test_join_pushes_snapshot_to_existing_members() {
    let (addr, _) = start_server().await;
    let mut host = Client::identified(&addr, "host").await;
    let (_, code) = host.create_room("Ada", GameMode::Race).await;

    let mut guest = Client::identified(&addr, "guest").await;
    let (_, snapshot) = guest.join(&code, "Grace").await;
    assert_eq!(snapshot.participants.len(), 2);

    let pushed = host.snapshot_where(|s| s.participants.len() == 2).await;
    assert!(pushed.participant(&SessionId::new("guest").unwrap()).is_some());
}

#[tokio::test]
async fn test_join_unknown_code_returns_404() {
    let (addr, _) = start_server().await;
    let mut client = Client::identified(&addr, "guest").await;

    client
        .send(ClientRequest::JoinRoom {
            code: RoomCode::parse("ZZZZZ").unwrap(),
            name: "Grace".into(),
            avatar: None,
        })
        .await;

    assert_eq!(client.expect_error().await, 404);
}

#[tokio::test]
async fn test_room_request_before_join_returns_409() {
    let (addr, _) = start_server().await;
    let mut client = Client::identified(&addr, "guest").await;

    client.send(ClientRequest::SetReady { ready: true }).await;

    assert_eq!(client.expect_error().await, 409);
}

// =========================================================================
// Races
// =========================================================================

#[tokio::test]
async fn test_start_race_waits_for_everyone_ready() {
    let (addr, _) = start_server().await;
    let mut host = Client::identified(&addr, "s1").await;
    let (_, code) = host.create_room("Ada", GameMode::Race).await;
    let mut guest = Client::identified(&addr, "s2").await;
    guest.join(&code, "Grace").await;

    host.send(ClientRequest::SetReady { ready: true }).await;
    host.snapshot_where(|s| s.room.ready_participants.len() == 1).await;

    host.send(ClientRequest::StartRace { countdown_seconds: None }).await;
    assert_eq!(host.expect_error().await, 409);

    guest.send(ClientRequest::SetReady { ready: true }).await;
    host.snapshot_where(|s| s.room.ready_participants.len() == 2).await;

    host.send(ClientRequest::StartRace { countdown_seconds: None }).await;
    let started = guest.snapshot_where(|s| s.room.status == RoomStatus::Active).await;
    let remaining = started.countdown_remaining_ms().unwrap();
    assert!(remaining > 4_000 && remaining <= 5_000);
    assert!(started.room.target_text.is_some());
}

#[tokio::test]
async fn test_start_race_by_guest_returns_403() {
    let (addr, _) = start_server().await;
    let mut host = Client::identified(&addr, "s1").await;
    let (_, code) = host.create_room("Ada", GameMode::Race).await;
    let mut guest = Client::identified(&addr, "s2").await;
    guest.join(&code, "Grace").await;

    guest.send(ClientRequest::StartRace { countdown_seconds: None }).await;

    assert_eq!(guest.expect_error().await, 403);
}

#[tokio::test]
async fn test_practice_progress_reaches_other_members() {
    let (addr, _) = start_server().await;
    let mut host = Client::identified(&addr, "s1").await;
    let (_, code) = host.create_room("Ada", GameMode::Practice).await;
    let mut guest = Client::identified(&addr, "s2").await;
    guest.join(&code, "Grace").await;

    guest
        .send(ClientRequest::ReportProgress {
            report: ProgressReport {
                stats: RaceStats {
                    wpm: 60.0,
                    accuracy: 97.0,
                    progress: 40.0,
                    words_typed: 10,
                    time_elapsed: 10_000,
                    is_finished: false,
                },
                typed_progress: 50,
                typed_text: None,
            },
        })
        .await;

    let snapshot = host
        .snapshot_where(|s| {
            s.participant(&SessionId::new("s2").unwrap())
                .is_some_and(|p| p.participant.stats.words_typed == 10)
        })
        .await;
    assert!(snapshot.standings.is_empty());
}

// =========================================================================
// Removal
// =========================================================================

#[tokio::test]
async fn test_kick_sends_removed_to_target() {
    let (addr, _) = start_server().await;
    let mut host = Client::identified(&addr, "s1").await;
    let (room_id, code) = host.create_room("Ada", GameMode::Race).await;
    let mut guest = Client::identified(&addr, "s2").await;
    let (guest_id, _) = guest.join(&code, "Grace").await;

    host.send(ClientRequest::Kick {
        participant_id: guest_id,
    })
    .await;

    let removed = guest
        .recv_until(|m| matches!(m, ServerMessage::Removed { .. }))
        .await;
    assert_eq!(removed, ServerMessage::Removed { room_id });

    // No longer a member.
    guest.send(ClientRequest::SetReady { ready: true }).await;
    assert_eq!(guest.expect_error().await, 409);
}

#[tokio::test]
async fn test_delete_room_sends_vanished_to_everyone() {
    let (addr, coordinator) = start_server().await;
    let mut host = Client::identified(&addr, "s1").await;
    let (room_id, code) = host.create_room("Ada", GameMode::Race).await;
    let mut guest = Client::identified(&addr, "s2").await;
    guest.join(&code, "Grace").await;

    host.send(ClientRequest::DeleteRoom).await;

    for client in [&mut host, &mut guest] {
        let vanished = client
            .recv_until(|m| matches!(m, ServerMessage::Vanished { .. }))
            .await;
        assert_eq!(vanished, ServerMessage::Vanished { room_id });
    }
    assert!(coordinator.snapshot(room_id).await.is_err());
}

#[tokio::test]
async fn test_socket_close_marks_participant_disconnected() {
    let (addr, coordinator) = start_server().await;
    let mut host = Client::identified(&addr, "s1").await;
    let (room_id, code) = host.create_room("Ada", GameMode::Race).await;
    let mut guest = Client::identified(&addr, "s2").await;
    guest.join(&code, "Grace").await;

    guest.ws.close(None).await.unwrap();

    let snapshot = host
        .snapshot_where(|s| {
            s.participant(&SessionId::new("s2").unwrap())
                .is_some_and(|p| !p.participant.is_connected)
        })
        .await;
    assert_eq!(snapshot.participants.len(), 2);
    assert_eq!(coordinator.snapshot(room_id).await.unwrap().participants.len(), 2);
}

#[tokio::test]
async fn test_leave_room_removes_row_and_acks_with_removed() {
    let (addr, _) = start_server().await;
    let mut host = Client::identified(&addr, "s1").await;
    let (room_id, code) = host.create_room("Ada", GameMode::Race).await;
    let mut guest = Client::identified(&addr, "s2").await;
    guest.join(&code, "Grace").await;

    guest.send(ClientRequest::LeaveRoom).await;

    assert_eq!(
        guest
            .recv_until(|m| matches!(m, ServerMessage::Removed { .. }))
            .await,
        ServerMessage::Removed { room_id }
    );
    host.snapshot_where(|s| s.participants.len() == 1).await;
}
