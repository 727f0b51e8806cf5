//! Session manager: the broker's only door to session storage.

use std::sync::Arc;

use super::{InMemorySessionStore, SessionRecord, SessionStore};

/// Resolves and updates sessions through a swappable [`SessionStore`].
#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
}

impl SessionManager {
    /// Create a manager over the given backend.
    #[must_use]
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    /// Create a manager backed by a fresh in-memory store.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemorySessionStore::new()))
    }

    /// Look up a session by id.
    pub async fn get_session(&self, session_id: &str) -> Option<SessionRecord> {
        self.store.get(session_id).await
    }

    /// Write a session record.
    pub async fn upsert_session(&self, record: SessionRecord) {
        tracing::debug!(session_id = %record.session_id, "Upserting session");
        self.store.upsert(record).await;
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager").finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_delegates_to_injected_store() {
        let store = InMemorySessionStore::new();
        let manager = SessionManager::new(Arc::new(store.clone()));

        manager.upsert_session(SessionRecord::new("abc", "token", "refresh")).await;

        // Visible through the backend directly
        assert_eq!(store.get("abc").await.unwrap().access_token, "token");
        assert_eq!(manager.get_session("abc").await.unwrap().refresh_token, "refresh");
        assert!(manager.get_session("other").await.is_none());
    }

    #[tokio::test]
    async fn test_in_memory_managers_are_isolated() {
        let a = SessionManager::in_memory();
        let b = SessionManager::in_memory();
        a.upsert_session(SessionRecord::new("x", "t", "")).await;
        assert!(b.get_session("x").await.is_none());
    }
}
