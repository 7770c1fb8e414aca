//! services/client/src/adapters/storage.rs
//!
//! This module contains the adapter for durable client-local storage. It
//! implements the `SessionStorageService` port over small JSON files in the
//! configured storage directory, keyed the same way the browser build keyed
//! its local storage.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use interview_buddy_core::domain::Session;
use interview_buddy_core::ports::{PortError, PortResult, SessionStorageService};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

/// Storage key of the persisted session singleton.
const SESSION_KEY: &str = "aiib_session";
/// Storage key of the stable anonymous client key.
const CLIENT_KEY: &str = "aiib_client_key";

/// The persisted session shape. Field names match what the browser build
/// wrote, so a switchover keeps existing sessions readable.
#[derive(Debug, Serialize, Deserialize)]
struct StoredSession {
    #[serde(rename = "sessionId")]
    session_id: String,
    #[serde(rename = "expiresAt")]
    expires_at: DateTime<Utc>,
    #[serde(rename = "runCount")]
    run_count: u8,
}

pub struct FileStorageAdapter {
    dir: PathBuf,
}

impl FileStorageAdapter {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }

    async fn read_if_present(path: &Path) -> PortResult<Option<String>> {
        match tokio::fs::read_to_string(path).await {
            Ok(raw) => Ok(Some(raw)),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(error) => Err(PortError::Unexpected(format!(
                "reading {}: {}",
                path.display(),
                error
            ))),
        }
    }

    async fn write(&self, key: &str, contents: &str) -> PortResult<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| PortError::Unexpected(format!("creating storage dir: {}", e)))?;
        let path = self.path(key);
        tokio::fs::write(&path, contents)
            .await
            .map_err(|e| PortError::Unexpected(format!("writing {}: {}", path.display(), e)))
    }
}

#[async_trait]
impl SessionStorageService for FileStorageAdapter {
    async fn load_session(&self) -> PortResult<Option<Session>> {
        let Some(raw) = Self::read_if_present(&self.path(SESSION_KEY)).await? else {
            return Ok(None);
        };
        // A corrupt record is treated as absent rather than fatal.
        let stored: StoredSession = match serde_json::from_str(&raw) {
            Ok(stored) => stored,
            Err(error) => {
                debug!("discarding unreadable stored session: {}", error);
                return Ok(None);
            }
        };
        let mut session = Session::new(stored.session_id, stored.expires_at);
        session.run_count = stored.run_count;
        Ok(Some(session))
    }

    async fn store_session(&self, session: &Session) -> PortResult<()> {
        let stored = StoredSession {
            session_id: session.session_id.clone(),
            expires_at: session.expires_at,
            run_count: session.run_count,
        };
        let json = serde_json::to_string(&stored)
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        self.write(SESSION_KEY, &json).await
    }

    async fn clear_session(&self) -> PortResult<()> {
        match tokio::fs::remove_file(self.path(SESSION_KEY)).await {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(error) => Err(PortError::Unexpected(format!(
                "clearing stored session: {}",
                error
            ))),
        }
    }

    async fn client_key(&self) -> PortResult<String> {
        if let Some(existing) = Self::read_if_present(&self.path(CLIENT_KEY)).await? {
            let trimmed = existing.trim();
            if !trimmed.is_empty() {
                return Ok(trimmed.to_string());
            }
        }
        // First use: mint a stable anonymous key. It never expires.
        let key = Uuid::new_v4().to_string();
        self.write(CLIENT_KEY, &key).await?;
        Ok(key)
    }
}
