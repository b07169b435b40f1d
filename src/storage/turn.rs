//! Persisted conversation turns and session identity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Maximum accepted length of a client-supplied session token.
const MAX_SESSION_TOKEN_LEN: usize = 128;

/// Opaque session key carried by the client cookie.
///
/// The core never interprets the token; it only checks that it is a
/// plausible key before using it for storage lookups.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Generate a fresh random session key.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Accept a client-supplied token if it looks like a session key.
    #[must_use]
    pub fn parse(token: &str) -> Option<Self> {
        let token = token.trim();
        let plausible = !token.is_empty()
            && token.len() <= MAX_SESSION_TOKEN_LEN
            && token.chars().all(|c| c.is_ascii_alphanumeric() || c == '-');
        plausible.then(|| Self(token.to_string()))
    }

    /// Borrow the raw token.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Author of a persisted turn.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnRole {
    /// Message typed by the traveller.
    User,
    /// Reply produced by the assistant.
    Assistant,
}

impl TurnRole {
    /// Stable string form for storage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl fmt::Display for TurnRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TurnRole {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "user" => Ok(Self::User),
            "assistant" => Ok(Self::Assistant),
            _ => Err(value.to_string()),
        }
    }
}

/// One stored message of a conversation.
///
/// Assistant content is usually a serialized structured reply, but older or
/// degraded rows may hold plain text.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    /// Insertion sequence number; defines ordering.
    pub id: i64,
    /// Owning session.
    pub session_id: SessionId,
    /// Author of the turn.
    pub role: TurnRole,
    /// Raw stored content.
    pub content: String,
    /// Time the turn was written.
    pub timestamp: DateTime<Utc>,
}
