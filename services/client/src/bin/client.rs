//! services/client/src/bin/client.rs

use client_lib::{
    adapters::{
        FilePlaybackAdapter, FileStorageAdapter, FrameCaptureAdapter, HttpBackendAdapter,
        WavMicrophoneAdapter,
    },
    config::Config,
    console::Console,
    error::ClientError,
    state::AppState,
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), ClientError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting client...");

    // --- 2. Initialize Service Adapters ---
    let backend = Arc::new(HttpBackendAdapter::new(config.api_base_url.clone()));
    let storage = Arc::new(FileStorageAdapter::new(config.storage_dir.clone()));
    let capture = Arc::new(FrameCaptureAdapter::new(config.capture_frame_path.clone()));
    let microphone = Arc::new(WavMicrophoneAdapter::new(
        config.microphone_wav_path.clone(),
        config.voice_segment,
    ));
    let playback = Arc::new(FilePlaybackAdapter::new(config.playback_dir.clone()));

    // --- 3. Assemble Shared State ---
    let state = AppState {
        config: config.clone(),
        storage,
        interviews: backend.clone(),
        execution: backend.clone(),
        observation: backend.clone(),
        voice_chat: backend,
        capture,
        playback,
        microphone,
    };
    info!("Talking to backend at {}", config.api_base_url);

    // --- 4. Run the Console Driver ---
    Console::new(state).run().await
}
