//! Session identity for Keyrace.
//!
//! Keyrace doesn't provision identities itself. A client arrives with a
//! token (a cookie, a JWT, a random id kept in local storage) and an
//! [`IdentityProvider`] turns that token into an [`Identity`]: a stable
//! [`SessionId`](keyrace_protocol::SessionId) and, when the provider has
//! verified one, a display name.
//!
//! ```text
//! Coordinator (above)  ← uses SessionId as the only authorization token
//!     ↕
//! Session layer (this crate)  ← token → Identity
//!     ↕
//! Protocol layer (below)  ← SessionId type
//! ```

#![allow(async_fn_in_trait)]

mod error;
mod identity;

pub use error::SessionError;
pub use identity::{AnonymousIdentity, Identity, IdentityProvider};
