//! Error types for the session layer.

/// Errors that can occur while establishing a caller's identity.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The token was missing, malformed, expired, or rejected by the
    /// [`IdentityProvider`](crate::IdentityProvider).
    #[error("authentication failed: {0}")]
    AuthFailed(String),
}
