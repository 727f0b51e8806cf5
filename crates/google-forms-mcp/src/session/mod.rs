//! Per-session OAuth2 credential storage.
//!
//! A session is a caller-chosen opaque id (the OAuth2 `state`) mapped to the
//! most recently issued token pair. Records are only written by a successful
//! code exchange and live for the lifetime of the process.

mod manager;
mod store;

pub use manager::SessionManager;
pub use store::InMemorySessionStore;

use chrono::{DateTime, Utc};

/// Opaque caller-chosen session identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Mint a random id for transports that open a session themselves.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for SessionId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Credentials stored for one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    pub session_id: String,
    pub access_token: String,
    /// Empty when the provider issued no refresh token.
    pub refresh_token: String,
    pub updated_at: DateTime<Utc>,
}

impl SessionRecord {
    #[must_use]
    pub fn new(
        session_id: impl Into<String>,
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
            updated_at: Utc::now(),
        }
    }

    /// Replace both tokens with a freshly issued pair.
    pub fn replace_tokens(&mut self, access_token: String, refresh_token: String) {
        self.access_token = access_token;
        self.refresh_token = refresh_token;
        self.updated_at = Utc::now();
    }

    /// Check if the provider issued a refresh token.
    #[must_use]
    pub fn has_refresh_token(&self) -> bool {
        !self.refresh_token.is_empty()
    }
}

/// Storage backend for session records.
///
/// Implementations must tolerate concurrent `get`/`upsert` calls. Neither
/// operation fails: an unknown id is `None`, and writes are unconditional.
#[async_trait::async_trait]
pub trait SessionStore: Send + Sync {
    /// Look up the record for a session.
    async fn get(&self, session_id: &str) -> Option<SessionRecord>;

    /// Insert or overwrite the record keyed by its `session_id`.
    async fn upsert(&self, record: SessionRecord);
}
