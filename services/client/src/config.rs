//! services/client/src/config.rs
//!
//! Defines the client's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    /// Base URL of the backend API, e.g. `http://localhost:8080/api/v1`.
    pub api_base_url: String,
    pub log_level: Level,
    /// Directory holding the persisted session and client key.
    pub storage_dir: PathBuf,
    /// Period of the repeating observation timer.
    pub observe_period: Duration,
    /// How often the idle watcher checks for inactivity.
    pub idle_check_every: Duration,
    /// How long without a tracked interaction counts as idle.
    pub idle_threshold: Duration,
    /// Length of one microphone recording segment.
    pub voice_segment: Duration,
    /// Still image standing in for the rendered interview view; captures are
    /// skipped when unset.
    pub capture_frame_path: Option<PathBuf>,
    /// WAV file standing in for the microphone device; `mic on` is denied
    /// when unset.
    pub microphone_wav_path: Option<PathBuf>,
    /// Where returned interviewer audio is written; discarded when unset.
    pub playback_dir: Option<PathBuf>,
}

fn duration_ms_var(name: &str, default_ms: u64) -> Result<Duration, ConfigError> {
    match std::env::var(name) {
        Ok(raw) => raw
            .parse::<u64>()
            .map(Duration::from_millis)
            .map_err(|_| {
                ConfigError::InvalidValue(
                    name.to_string(),
                    format!("'{}' is not a millisecond count", raw),
                )
            }),
        Err(_) => Ok(Duration::from_millis(default_ms)),
    }
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let api_base_url = std::env::var("API_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:8080/api/v1".to_string());

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let storage_dir = std::env::var("STORAGE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./.interview_buddy"));

        // Timer settings; defaults mirror the product behavior (30s samples,
        // one-minute idle checks, five-minute idle threshold, one-second
        // recording slices).
        let observe_period = duration_ms_var("OBSERVE_PERIOD_MS", 30_000)?;
        let idle_check_every = duration_ms_var("IDLE_CHECK_MS", 60_000)?;
        let idle_threshold = duration_ms_var("IDLE_THRESHOLD_MS", 300_000)?;
        let voice_segment = duration_ms_var("VOICE_SEGMENT_MS", 1_000)?;

        let capture_frame_path = std::env::var("CAPTURE_FRAME_PATH").ok().map(PathBuf::from);
        let microphone_wav_path = std::env::var("MICROPHONE_WAV_PATH").ok().map(PathBuf::from);
        let playback_dir = std::env::var("PLAYBACK_DIR").ok().map(PathBuf::from);

        Ok(Self {
            api_base_url,
            log_level,
            storage_dir,
            observe_period,
            idle_check_every,
            idle_threshold,
            voice_segment,
            capture_frame_path,
            microphone_wav_path,
            playback_dir,
        })
    }
}
