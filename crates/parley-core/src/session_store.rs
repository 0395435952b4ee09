//! In-memory session store and per-session pipeline locks.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::{OwnedMutexGuard, RwLock};
use tracing::debug;

use crate::error::Result;
use crate::session::{SessionStore, Turn};

/// Process-lifetime session store. Nothing is persisted or evicted.
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, Vec<Turn>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of sessions that have at least one turn.
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, session_id: &str) -> Result<Vec<Turn>> {
        Ok(self
            .sessions
            .read()
            .await
            .get(session_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn append(&self, session_id: &str, turn: Turn) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        let history = sessions.entry(session_id.to_string()).or_default();
        history.push(turn);
        debug!(session_id, turns = history.len(), "Appended session turn");
        Ok(())
    }
}

/// Hands out one async mutex per session key.
///
/// Holding the guard across a whole read-generate-append cycle keeps
/// concurrent requests for the same session from interleaving their turns.
#[derive(Default)]
pub struct SessionLocks {
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl SessionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, session_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self
                .locks
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            locks.entry(session_id.to_string()).or_default().clone()
        };
        lock.lock_owned().await
    }
}
