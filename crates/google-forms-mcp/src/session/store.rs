//! In-memory session store.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use super::{SessionRecord, SessionStore};

/// Volatile session store; a restart clears every session.
///
/// There is no eviction, so the map grows with the number of distinct
/// session ids that complete a callback.
#[derive(Clone, Default)]
pub struct InMemorySessionStore {
    sessions: Arc<RwLock<HashMap<String, SessionRecord>>>,
}

impl InMemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored sessions.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[async_trait::async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, session_id: &str) -> Option<SessionRecord> {
        self.sessions.read().await.get(session_id).cloned()
    }

    async fn upsert(&self, record: SessionRecord) {
        self.sessions.write().await.insert(record.session_id.clone(), record);
    }
}

impl std::fmt::Debug for InMemorySessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemorySessionStore").finish()
    }
}
