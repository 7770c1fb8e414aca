//! services/client/src/state.rs
//!
//! Defines the application's shared state: the injected port bundle, the
//! shared UI-state record, and the event channel feeding the view layer.

use crate::config::Config;
use interview_buddy_core::domain::{RunResult, UiState};
use interview_buddy_core::ports::{
    AudioPlaybackService, ExecutionService, InterviewService, MicrophoneService,
    ObservationService, ScreenCaptureService, SessionStorageService, VoiceChatService,
};
use std::sync::{Arc, RwLock};

//=========================================================================================
// AppState (Shared Across All Components)
//=========================================================================================

/// The shared application state, created once at startup and injected into
/// every lifecycle component. Components never reach for ambient globals;
/// everything flows through this bundle.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub storage: Arc<dyn SessionStorageService>,
    pub interviews: Arc<dyn InterviewService>,
    pub execution: Arc<dyn ExecutionService>,
    pub observation: Arc<dyn ObservationService>,
    pub voice_chat: Arc<dyn VoiceChatService>,
    pub capture: Arc<dyn ScreenCaptureService>,
    pub playback: Arc<dyn AudioPlaybackService>,
    pub microphone: Arc<dyn MicrophoneService>,
}

//=========================================================================================
// Shared UI state
//=========================================================================================

/// Shared handle over the tracked UI state (current problem, language, last
/// run status). This is the caller-supplied accessor feeding observations
/// and voice context.
#[derive(Clone, Default)]
pub struct UiStateHandle(Arc<RwLock<UiState>>);

impl UiStateHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> UiState {
        self.0.read().expect("ui state lock poisoned").clone()
    }

    pub fn update(&self, mutate: impl FnOnce(&mut UiState)) {
        let mut state = self.0.write().expect("ui state lock poisoned");
        mutate(&mut state);
    }
}

//=========================================================================================
// Events toward the view layer
//=========================================================================================

/// Events the lifecycle components emit toward whatever renders the client.
#[derive(Debug, Clone)]
pub enum UiEvent {
    /// A run completed and its result is available for display.
    ResultReady(RunResult),
    /// The interview ended; the view should move to the results/stats view.
    NavigateToStats,
    /// The session is gone (expired or reset); back to the entry flow.
    NavigateToEntry,
}

pub type UiEventSender = tokio::sync::mpsc::UnboundedSender<UiEvent>;
pub type UiEventReceiver = tokio::sync::mpsc::UnboundedReceiver<UiEvent>;

pub fn ui_event_channel() -> (UiEventSender, UiEventReceiver) {
    tokio::sync::mpsc::unbounded_channel()
}
