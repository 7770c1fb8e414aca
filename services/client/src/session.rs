//! services/client/src/session.rs
//!
//! The client-side session singleton: one active interview at a time, with
//! identity, expiry and run quota, persisted through the storage port on
//! every mutation.

use chrono::Utc;
use interview_buddy_core::domain::Session;
use interview_buddy_core::ports::SessionStorageService;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::best_effort;

/// Owns the single active [`Session`] and the process-wide client key.
///
/// All storage failures are swallowed: the store then behaves as if no
/// session existed, favoring a reset into a fresh flow over crashing.
pub struct SessionStore {
    storage: Arc<dyn SessionStorageService>,
    current: RwLock<Option<Session>>,
}

impl SessionStore {
    pub fn new(storage: Arc<dyn SessionStorageService>) -> Self {
        Self {
            storage,
            current: RwLock::new(None),
        }
    }

    /// The current session, if any.
    pub async fn get(&self) -> Option<Session> {
        self.current.read().await.clone()
    }

    /// Installs a new session, replacing any existing one unconditionally
    /// (overwrite semantics, not merge).
    pub async fn create(&self, session: Session) {
        best_effort("persist session", self.storage.store_session(&session).await);
        *self.current.write().await = Some(session);
    }

    /// Records a completed run, saturating at the quota. Returns the new run
    /// count, or `None` when no session exists (a silent no-op).
    pub async fn increment_run_count(&self) -> Option<u8> {
        let mut guard = self.current.write().await;
        let session = guard.as_mut()?;
        session.record_run();
        best_effort("persist session", self.storage.store_session(session).await);
        Some(session.run_count)
    }

    /// Clears the session entirely, removing the persisted copy.
    pub async fn reset(&self) {
        *self.current.write().await = None;
        best_effort("clear persisted session", self.storage.clear_session().await);
    }

    /// True iff a session exists and its expiry has passed.
    pub async fn is_expired(&self) -> bool {
        match self.current.read().await.as_ref() {
            Some(session) => session.is_expired_at(Utc::now()),
            None => false,
        }
    }

    /// The stable anonymous client key. Falls back to an ephemeral key when
    /// storage is unavailable.
    pub async fn client_key(&self) -> String {
        match best_effort("load client key", self.storage.client_key().await) {
            Some(key) => key,
            None => {
                let key = Uuid::new_v4().to_string();
                warn!("using ephemeral client key {}", key);
                key
            }
        }
    }

    /// Startup recovery: a session still persisted when the process starts
    /// means the previous run died (or the page reloaded) with an interview
    /// active. The abandoned session is removed from storage and handed back
    /// so the caller can invalidate it server-side; the in-flight run, if
    /// any, is never resumed.
    pub async fn recover_abandoned(&self) -> Option<Session> {
        let abandoned = best_effort("load persisted session", self.storage.load_session().await)
            .flatten()?;
        info!(
            "found abandoned session {} from a previous run",
            abandoned.session_id
        );
        best_effort("clear persisted session", self.storage.clear_session().await);
        Some(abandoned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Duration;
    use interview_buddy_core::ports::{PortError, PortResult};
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemoryStorage {
        session: Mutex<Option<Session>>,
        fail_writes: bool,
        fail_reads: bool,
    }

    #[async_trait]
    impl SessionStorageService for MemoryStorage {
        async fn load_session(&self) -> PortResult<Option<Session>> {
            if self.fail_reads {
                return Err(PortError::Unexpected("read failed".to_string()));
            }
            Ok(self.session.lock().unwrap().clone())
        }

        async fn store_session(&self, session: &Session) -> PortResult<()> {
            if self.fail_writes {
                return Err(PortError::Unexpected("write failed".to_string()));
            }
            *self.session.lock().unwrap() = Some(session.clone());
            Ok(())
        }

        async fn clear_session(&self) -> PortResult<()> {
            *self.session.lock().unwrap() = None;
            Ok(())
        }

        async fn client_key(&self) -> PortResult<String> {
            if self.fail_reads {
                return Err(PortError::Unexpected("read failed".to_string()));
            }
            Ok("stable-key".to_string())
        }
    }

    fn fresh_session() -> Session {
        Session::new("s-1".to_string(), Utc::now() + Duration::hours(1))
    }

    #[tokio::test]
    async fn create_overwrites_and_persists() {
        let storage = Arc::new(MemoryStorage::default());
        let store = SessionStore::new(storage.clone());

        store.create(fresh_session()).await;
        let mut replacement = fresh_session();
        replacement.session_id = "s-2".to_string();
        store.create(replacement).await;

        assert_eq!(store.get().await.unwrap().session_id, "s-2");
        assert_eq!(
            storage.session.lock().unwrap().as_ref().unwrap().session_id,
            "s-2"
        );
    }

    #[tokio::test]
    async fn increment_without_session_is_a_no_op() {
        let store = SessionStore::new(Arc::new(MemoryStorage::default()));
        assert_eq!(store.increment_run_count().await, None);
    }

    #[tokio::test]
    async fn increment_saturates_and_persists() {
        let storage = Arc::new(MemoryStorage::default());
        let store = SessionStore::new(storage.clone());
        store.create(fresh_session()).await;

        for expected in [1, 2, 3, 3] {
            let count = store.increment_run_count().await.unwrap();
            assert_eq!(count, expected);
        }
        assert_eq!(
            storage.session.lock().unwrap().as_ref().unwrap().run_count,
            3
        );
    }

    #[tokio::test]
    async fn storage_failures_are_swallowed() {
        let storage = Arc::new(MemoryStorage {
            fail_writes: true,
            fail_reads: true,
            ..Default::default()
        });
        let store = SessionStore::new(storage);

        store.create(fresh_session()).await;
        assert!(store.get().await.is_some());
        assert_eq!(store.increment_run_count().await, Some(1));
        // Ephemeral fallback key is still produced.
        assert!(!store.client_key().await.is_empty());
        assert!(store.recover_abandoned().await.is_none());
    }

    #[tokio::test]
    async fn reset_clears_memory_and_storage() {
        let storage = Arc::new(MemoryStorage::default());
        let store = SessionStore::new(storage.clone());
        store.create(fresh_session()).await;

        store.reset().await;
        assert!(store.get().await.is_none());
        assert!(storage.session.lock().unwrap().is_none());
    }

    #[tokio::test]
    async fn expiry_only_applies_to_existing_sessions() {
        let store = SessionStore::new(Arc::new(MemoryStorage::default()));
        assert!(!store.is_expired().await);

        let mut session = fresh_session();
        session.expires_at = Utc::now() - Duration::milliseconds(5);
        store.create(session).await;
        assert!(store.is_expired().await);
    }

    #[tokio::test]
    async fn recover_abandoned_drains_storage() {
        let storage = Arc::new(MemoryStorage::default());
        *storage.session.lock().unwrap() = Some(fresh_session());
        let store = SessionStore::new(storage.clone());

        let abandoned = store.recover_abandoned().await.unwrap();
        assert_eq!(abandoned.session_id, "s-1");
        assert!(storage.session.lock().unwrap().is_none());
        // A second recovery finds nothing.
        assert!(store.recover_abandoned().await.is_none());
    }
}
