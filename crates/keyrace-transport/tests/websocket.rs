//! Integration tests for the WebSocket transport against a real client.

#[cfg(feature = "websocket")]
mod websocket {
    use std::time::Duration;

    use futures_util::{SinkExt, StreamExt};
    use keyrace_transport::{Connection, Transport, WebSocketConnection, WebSocketTransport};
    use tokio_tungstenite::tungstenite::Message;

    type ClientWs = tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >;

    /// Binds on a free port and returns the accepted server side plus a client.
    async fn pair() -> (WebSocketConnection, ClientWs) {
        let mut transport = WebSocketTransport::bind("127.0.0.1:0")
            .await
            .expect("should bind");
        let addr = transport.local_addr().unwrap();

        let server = tokio::spawn(async move { transport.accept().await.expect("should accept") });
        let (client, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
            .await
            .expect("client should connect");
        (server.await.unwrap(), client)
    }

    #[tokio::test]
    async fn test_send_utf8_arrives_as_text_frame() {
        let (server, mut client) = pair().await;
        assert!(server.id().get() > 0);
        assert!(server.peer_addr().ip().is_loopback());

        server.send(br#"{"type":"heartbeat_ack"}"#).await.unwrap();

        match client.next().await.unwrap().unwrap() {
            Message::Text(text) => assert_eq!(text.as_str(), r#"{"type":"heartbeat_ack"}"#),
            other => panic!("expected text frame, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_recv_accepts_text_and_binary() {
        let (server, mut client) = pair().await;

        client.send(Message::Text("hello".to_string().into())).await.unwrap();
        client
            .send(Message::Binary(vec![0xff, 0x00].into()))
            .await
            .unwrap();

        assert_eq!(server.recv().await.unwrap().unwrap(), b"hello");
        assert_eq!(server.recv().await.unwrap().unwrap(), vec![0xff, 0x00]);
    }

    #[tokio::test]
    async fn test_send_while_recv_pending_does_not_block() {
        let (server, mut client) = pair().await;
        let server = std::sync::Arc::new(server);

        let reader = {
            let server = std::sync::Arc::clone(&server);
            tokio::spawn(async move { server.recv().await })
        };
        tokio::task::yield_now().await;

        tokio::time::timeout(Duration::from_secs(1), server.send(b"push"))
            .await
            .expect("send must not wait for recv")
            .unwrap();
        assert_eq!(client.next().await.unwrap().unwrap().into_data().as_ref(), b"push");

        client.send(Message::Text("reply".to_string().into())).await.unwrap();
        assert_eq!(reader.await.unwrap().unwrap().unwrap(), b"reply");
    }

    #[tokio::test]
    async fn test_recv_returns_none_on_client_close() {
        let (server, mut client) = pair().await;
        client.send(Message::Close(None)).await.unwrap();
        assert!(server.recv().await.unwrap().is_none());
    }
}
