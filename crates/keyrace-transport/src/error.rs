/// Boxed cause attached to a transport failure.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The peer went away, or the socket was already closed on this side.
    #[error("connection closed")]
    ConnectionClosed,

    #[error("could not listen on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// The TCP accept or the WebSocket upgrade failed.
    #[error("accept failed: {0}")]
    AcceptFailed(#[source] BoxError),

    #[error("send failed: {0}")]
    SendFailed(#[source] BoxError),

    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] BoxError),
}
