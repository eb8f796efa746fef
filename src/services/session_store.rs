//! Process-wide session registry with lazy TTL expiry.
//!
//! The store is constructed once at daemon start and shared via `Arc`; there
//! is no ambient global. The registry lock guards only map lookups, while
//! each session carries its own mutex, so work on different sessions never
//! contends.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, RwLock};

use crate::error::SessionError;
use crate::models::ChatTurn;
use crate::providers::Provider;
use crate::services::VectorIndex;

pub type SharedSession = Arc<Mutex<Session>>;

/// State for one conversation: its index, history, file list, and provider
/// binding. Owned exclusively by the store; mutate only under the session
/// lock.
#[derive(Debug)]
pub struct Session {
    pub id: String,
    pub provider: Provider,
    pub api_key: String,
    pub index: Option<VectorIndex>,
    pub files: Vec<String>,
    pub history: Vec<ChatTurn>,
    /// Wall-clock creation/reset time, for display.
    pub started_at: DateTime<Utc>,
    /// Monotonic creation/reset time, for expiry.
    created_at: Instant,
}

impl Session {
    fn new(id: &str, provider: Provider, api_key: &str) -> Self {
        Self {
            id: id.to_string(),
            provider,
            api_key: api_key.to_string(),
            index: None,
            files: Vec::new(),
            history: Vec::new(),
            started_at: Utc::now(),
            created_at: Instant::now(),
        }
    }

    /// Drop all uploaded content and restart the expiry clock. Identity and
    /// provider binding survive.
    pub fn clear(&mut self) {
        self.index = None;
        self.files.clear();
        self.history.clear();
        self.started_at = Utc::now();
        self.created_at = Instant::now();
    }

    /// Time since creation or the last reset.
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }
}

/// Registry mapping session ids to live sessions, expiring lazily on read.
pub struct SessionStore {
    ttl: Duration,
    sessions: RwLock<HashMap<String, SharedSession>>,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Register a new session. Callers generate fresh UUIDs, so a duplicate
    /// id is reported rather than overwritten.
    pub async fn create(
        &self,
        id: &str,
        provider: Provider,
        api_key: &str,
    ) -> Result<SharedSession, SessionError> {
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(id) {
            return Err(SessionError::Duplicate(id.to_string()));
        }
        let handle = Arc::new(Mutex::new(Session::new(id, provider, api_key)));
        sessions.insert(id.to_string(), Arc::clone(&handle));
        Ok(handle)
    }

    /// Fetch a session, expiring it lazily: a read past the TTL removes the
    /// session and reports `Expired`; later reads report `NotFound`. The
    /// check runs on every read, there is no background sweep between ticks.
    pub async fn get(&self, id: &str) -> Result<SharedSession, SessionError> {
        let handle = {
            let sessions = self.sessions.read().await;
            sessions.get(id).cloned()
        };
        let Some(handle) = handle else {
            return Err(SessionError::NotFound(id.to_string()));
        };

        let lapsed = handle.lock().await.age() > self.ttl;
        if lapsed {
            let mut sessions = self.sessions.write().await;
            // Re-check under the write lock; a concurrent reset may have
            // restarted the clock.
            if let Some(current) = sessions.get(id) {
                if current.lock().await.age() > self.ttl {
                    sessions.remove(id);
                }
            }
            return Err(SessionError::Expired(id.to_string()));
        }
        Ok(handle)
    }

    /// Apply `f` to the session under its lock. Silently a no-op when the
    /// session is absent or expired; callers that care check via `get`
    /// first, since "session vanished mid-request" is an expected race.
    pub async fn update<F>(&self, id: &str, f: F)
    where
        F: FnOnce(&mut Session),
    {
        if let Ok(handle) = self.get(id).await {
            f(&mut *handle.lock().await);
        }
    }

    /// Clear the session's content and restart its expiry clock; no-op when
    /// absent.
    pub async fn reset(&self, id: &str) {
        if let Ok(handle) = self.get(id).await {
            handle.lock().await.clear();
        }
    }

    pub async fn delete(&self, id: &str) {
        self.sessions.write().await.remove(id);
    }

    /// Remove every lapsed session. Expiry is otherwise lazy, so the daemon
    /// calls this from its periodic tick to keep idle sessions from pinning
    /// memory for the life of the process.
    pub async fn sweep_expired(&self) -> usize {
        let mut sessions = self.sessions.write().await;
        let mut lapsed = Vec::new();
        for (id, handle) in sessions.iter() {
            if handle.lock().await.age() > self.ttl {
                lapsed.push(id.clone());
            }
        }
        for id in &lapsed {
            sessions.remove(id);
        }
        lapsed.len()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(60);

    fn store() -> SessionStore {
        SessionStore::new(TTL)
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let store = store();
        store.create("s1", Provider::OpenAi, "key").await.unwrap();

        let handle = store.get("s1").await.unwrap();
        let session = handle.lock().await;
        assert_eq!(session.id, "s1");
        assert_eq!(session.provider, Provider::OpenAi);
        assert_eq!(session.api_key, "key");
        assert!(session.index.is_none());
        assert!(session.files.is_empty());
        assert!(session.history.is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_create_rejected() {
        let store = store();
        store.create("s1", Provider::OpenAi, "key").await.unwrap();
        let err = store.create("s1", Provider::Gemini, "other").await;
        assert!(matches!(err, Err(SessionError::Duplicate(_))));
    }

    #[tokio::test]
    async fn test_get_unknown_is_not_found() {
        let store = store();
        assert!(matches!(
            store.get("missing").await,
            Err(SessionError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_get_past_ttl_expires_and_removes() {
        let store = SessionStore::new(Duration::from_millis(20));
        store.create("s1", Provider::OpenAi, "key").await.unwrap();

        tokio::time::sleep(Duration::from_millis(40)).await;

        assert!(matches!(
            store.get("s1").await,
            Err(SessionError::Expired(_))
        ));
        // Removal happened as a side effect; repeated reads stay absent.
        assert!(matches!(
            store.get("s1").await,
            Err(SessionError::NotFound(_))
        ));
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn test_update_merges_fields_in_place() {
        let store = store();
        store.create("s1", Provider::OpenAi, "key").await.unwrap();

        store
            .update("s1", |s| s.files = vec!["a.txt".to_string()])
            .await;
        store
            .update("s1", |s| {
                s.files = vec!["a.txt".to_string(), "b.txt".to_string()]
            })
            .await;

        let handle = store.get("s1").await.unwrap();
        let session = handle.lock().await;
        assert_eq!(session.files, vec!["a.txt", "b.txt"]);
        assert!(session.history.is_empty());
    }

    #[tokio::test]
    async fn test_update_missing_is_silent_noop() {
        let store = store();
        store.update("missing", |s| s.files.push("x".to_string())).await;
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_reset_preserves_identity() {
        let store = store();
        store.create("s1", Provider::Gemini, "key").await.unwrap();
        store
            .update("s1", |s| {
                s.index = Some(VectorIndex::new());
                s.files.push("a.txt".to_string());
                s.history.push(ChatTurn::human("hi"));
            })
            .await;

        store.reset("s1").await;

        let handle = store.get("s1").await.unwrap();
        let session = handle.lock().await;
        assert_eq!(session.id, "s1");
        assert_eq!(session.provider, Provider::Gemini);
        assert_eq!(session.api_key, "key");
        assert!(session.index.is_none());
        assert!(session.files.is_empty());
        assert!(session.history.is_empty());
    }

    #[tokio::test]
    async fn test_reset_restarts_expiry_clock() {
        let store = SessionStore::new(Duration::from_millis(50));
        store.create("s1", Provider::OpenAi, "key").await.unwrap();

        tokio::time::sleep(Duration::from_millis(30)).await;
        store.reset("s1").await;
        tokio::time::sleep(Duration::from_millis(30)).await;

        // 60ms since create but only 30ms since reset
        assert!(store.get("s1").await.is_ok());
    }

    #[tokio::test]
    async fn test_delete_removes_unconditionally() {
        let store = store();
        store.create("s1", Provider::OpenAi, "key").await.unwrap();
        store.delete("s1").await;
        assert!(matches!(
            store.get("s1").await,
            Err(SessionError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_sweep_removes_only_lapsed() {
        let store = SessionStore::new(Duration::from_millis(30));
        store.create("old", Provider::OpenAi, "key").await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        store.create("fresh", Provider::OpenAi, "key").await.unwrap();

        let removed = store.sweep_expired().await;
        assert_eq!(removed, 1);
        assert_eq!(store.len().await, 1);
        assert!(store.get("fresh").await.is_ok());
    }
}
