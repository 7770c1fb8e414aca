//! services/client/src/adapters/playback.rs
//!
//! This module contains the adapter for playing interviewer audio. The
//! console build writes each response to the configured playback directory
//! instead of a hardware sink; the play future still resolves only once the
//! bytes are durably handed off, which is what sequences the speaking
//! signals and idle-clock resets upstream.

use async_trait::async_trait;
use interview_buddy_core::ports::{AudioPlaybackService, PortError, PortResult};
use std::path::PathBuf;
use tracing::{debug, info};
use uuid::Uuid;

pub struct FilePlaybackAdapter {
    dir: Option<PathBuf>,
}

impl FilePlaybackAdapter {
    pub fn new(dir: Option<PathBuf>) -> Self {
        Self { dir }
    }
}

#[async_trait]
impl AudioPlaybackService for FilePlaybackAdapter {
    async fn play(&self, audio: Vec<u8>) -> PortResult<()> {
        let Some(dir) = &self.dir else {
            debug!("discarding {} bytes of interviewer audio (no sink)", audio.len());
            return Ok(());
        };
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| PortError::Unexpected(format!("creating playback dir: {}", e)))?;
        let path = dir.join(format!("reply-{}.mp3", Uuid::new_v4()));
        tokio::fs::write(&path, &audio)
            .await
            .map_err(|e| PortError::Unexpected(format!("writing {}: {}", path.display(), e)))?;
        info!("interviewer audio written to {}", path.display());
        Ok(())
    }
}
