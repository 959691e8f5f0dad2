//! `KeyraceServer` builder and accept loop.
//!
//! Ties the layers together: transport → protocol → session → coordinator
//! → sync. One coordinator (and its store) is shared by every connection.

use std::sync::Arc;

use keyrace_protocol::{Codec, JsonCodec};
use keyrace_room::{CoordinatorConfig, RoomCoordinator, SystemClock};
use keyrace_session::IdentityProvider;
use keyrace_store::MemoryRoomStore;
use keyrace_sync::RoomConnection;
use keyrace_transport::{Transport, WebSocketTransport};

use crate::KeyraceError;
use crate::handler::handle_connection;

/// The coordinator a server runs on.
pub type Coordinator = RoomCoordinator<MemoryRoomStore, SystemClock>;

/// A connection's membership in one room.
pub(crate) type Membership = RoomConnection<MemoryRoomStore, SystemClock>;

/// Shared state handed to each connection task.
pub(crate) struct ServerState<I: IdentityProvider, C: Codec> {
    pub(crate) coordinator: Arc<Coordinator>,
    pub(crate) identity: I,
    pub(crate) codec: C,
}

/// Builder for configuring and starting a Keyrace server.
///
/// # Example
///
/// ```rust,no_run
/// use keyrace::prelude::*;
///
/// # async fn run() -> Result<(), KeyraceError> {
/// let server = KeyraceServerBuilder::new()
///     .bind("0.0.0.0:8080")
///     .build(AnonymousIdentity)
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct KeyraceServerBuilder {
    bind_addr: String,
    coordinator_config: CoordinatorConfig,
}

impl KeyraceServerBuilder {
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            coordinator_config: CoordinatorConfig::default(),
        }
    }

    /// Sets the address to bind to. Port 0 picks a free port.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Sets room limits, TTL and race defaults.
    pub fn coordinator_config(mut self, config: CoordinatorConfig) -> Self {
        self.coordinator_config = config;
        self
    }

    /// Binds the transport and sets up an in-memory room store.
    ///
    /// `identity` resolves each client's handshake token into a session.
    pub async fn build<I: IdentityProvider>(
        self,
        identity: I,
    ) -> Result<KeyraceServer<I, JsonCodec>, KeyraceError> {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;
        let coordinator = Arc::new(RoomCoordinator::new(
            Arc::new(MemoryRoomStore::new()),
            self.coordinator_config,
        ));

        let state = Arc::new(ServerState {
            coordinator,
            identity,
            codec: JsonCodec,
        });
        Ok(KeyraceServer { transport, state })
    }
}

impl Default for KeyraceServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Keyrace server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct KeyraceServer<I: IdentityProvider, C: Codec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<I, C>>,
}

impl<I: IdentityProvider, C: Codec> KeyraceServer<I, C> {
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// The coordinator every connection talks to. Hand a clone to the
    /// expiry sweeper, or use it to inspect rooms.
    pub fn coordinator(&self) -> &Arc<Coordinator> {
        &self.state.coordinator
    }

    /// Accepts connections and spawns a handler task for each one. Runs
    /// until the process is terminated.
    pub async fn run(mut self) -> Result<(), KeyraceError> {
        tracing::info!("Keyrace server running");

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}
