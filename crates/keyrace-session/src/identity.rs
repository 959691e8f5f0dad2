//! The identity hook.

use keyrace_protocol::SessionId;

use crate::SessionError;

/// Who a connected client is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Stable across reconnects and visits.
    pub session_id: SessionId,
    /// A name the provider vouches for. When present it overrides whatever
    /// name the client asks to join with.
    pub verified_name: Option<String>,
}

impl Identity {
    pub fn anonymous(session_id: SessionId) -> Self {
        Self {
            session_id,
            verified_name: None,
        }
    }

    /// The name to show for this identity: the verified one if any,
    /// otherwise the one the client requested.
    pub fn display_name<'a>(&'a self, requested: &'a str) -> &'a str {
        self.verified_name.as_deref().unwrap_or(requested)
    }
}

/// Resolves a client token into an [`Identity`].
///
/// Implement this with your auth provider. The server calls it once per
/// connection, during the handshake.
///
/// # Example
///
/// ```rust
/// use keyrace_protocol::SessionId;
/// use keyrace_session::{Identity, IdentityProvider, SessionError};
///
/// /// Accepts `name:session` tokens and trusts the name.
/// struct TrustingProvider;
///
/// impl IdentityProvider for TrustingProvider {
///     async fn identify(&self, token: &str) -> Result<Identity, SessionError> {
///         let (name, session) = token
///             .split_once(':')
///             .ok_or_else(|| SessionError::AuthFailed("expected name:session".into()))?;
///         let session_id = SessionId::new(session)
///             .map_err(|e| SessionError::AuthFailed(e.to_string()))?;
///         Ok(Identity { session_id, verified_name: Some(name.to_string()) })
///     }
/// }
/// ```
pub trait IdentityProvider: Send + Sync + 'static {
    /// Validates `token` and returns the caller's identity.
    ///
    /// # Errors
    /// `SessionError::AuthFailed` when the token is not acceptable.
    fn identify(
        &self,
        token: &str,
    ) -> impl std::future::Future<Output = Result<Identity, SessionError>> + Send;
}

/// Treats the token itself as the session id.
///
/// This is what a browser client with a random id in local storage gets:
/// no verification, no verified name, but a stable session across visits.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnonymousIdentity;

impl IdentityProvider for AnonymousIdentity {
    async fn identify(&self, token: &str) -> Result<Identity, SessionError> {
        let session_id =
            SessionId::new(token).map_err(|e| SessionError::AuthFailed(e.to_string()))?;
        tracing::debug!(%session_id, "anonymous session identified");
        Ok(Identity::anonymous(session_id))
    }
}
