//! Identity newtypes.
//!
//! Rooms and participants get numeric ids allocated by the store. Sessions
//! and room codes come from outside (the identity provider and humans
//! typing a code), so those two validate on construction *and* on
//! deserialization via `#[serde(try_from = "String")]`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Store-allocated ids
// ---------------------------------------------------------------------------

/// Unique identifier of a room, allocated by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(pub u64);

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R-{}", self.0)
    }
}

/// Identifier of a participant row, unique within its room.
///
/// Ids increase in arrival order, which the ranking uses as its last
/// tie-breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(pub u64);

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// SessionId
// ---------------------------------------------------------------------------

/// A client-stable session identifier.
///
/// Issued by the identity provider and persisted by the client across
/// visits. It is the only authorization token the coordinator looks at:
/// "is this caller the host" and "which row is mine" are both answered by
/// comparing session ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SessionId(String);

impl SessionId {
    /// Longest accepted session id, in bytes.
    pub const MAX_LEN: usize = 128;

    /// Validates and wraps a session id. Surrounding whitespace is trimmed.
    pub fn new(raw: impl Into<String>) -> Result<Self, ProtocolError> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ProtocolError::field("session id", "must not be empty"));
        }
        if trimmed.len() > Self::MAX_LEN {
            return Err(ProtocolError::field(
                "session id",
                format!("longer than {} bytes", Self::MAX_LEN),
            ));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for SessionId {
    type Error = ProtocolError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SessionId> for String {
    fn from(value: SessionId) -> Self {
        value.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// RoomCode
// ---------------------------------------------------------------------------

/// The short join code humans type to enter a room.
///
/// Always stored uppercase, so lookups are case-insensitive: `"ab12c"` and
/// `"AB12C"` parse to the same code. Visually ambiguous characters (`0`/`O`,
/// `1`/`I`) are not excluded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoomCode(String);

impl RoomCode {
    /// Number of characters in a code.
    pub const LEN: usize = 5;

    /// The base-36 alphabet codes are drawn from.
    pub const ALPHABET: &'static [u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

    /// Parses user input into a code: trims, uppercases, then checks for
    /// exactly [`Self::LEN`] ASCII alphanumerics.
    pub fn parse(input: &str) -> Result<Self, ProtocolError> {
        let code = input.trim().to_ascii_uppercase();
        if code.len() != Self::LEN {
            return Err(ProtocolError::field(
                "room code",
                format!("expected {} characters, got {}", Self::LEN, code.len()),
            ));
        }
        if !code.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return Err(ProtocolError::field(
                "room code",
                "only letters and digits are allowed",
            ));
        }
        Ok(Self(code))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for RoomCode {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for RoomCode {
    type Error = ProtocolError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<RoomCode> for String {
    fn from(value: RoomCode) -> Self {
        value.0
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
