//! crates/interview_buddy_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the client's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the
//! lifecycle components to be independent of the concrete HTTP transport,
//! local storage, and media devices.

use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;

use crate::domain::{
    CaptureRegion, MicEvent, Observation, ObserverReply, Problem, RunRequest, RunResult, Session,
    SessionStats, VisualSnapshot, VoiceSegment,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (network,
/// filesystem, media devices).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    /// The upstream service answered but is unavailable (gateway errors).
    /// Callers rate-limit warnings for this class.
    #[error("Upstream unavailable: {0}")]
    Unavailable(String),
    /// Access was denied. The only error class surfaced to the user
    /// (microphone permission).
    #[error("Access denied: {0}")]
    Denied(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Execution streaming types
//=========================================================================================

/// A named event delivered on a run's server-initiated event stream.
#[derive(Debug, Clone)]
pub enum RunEvent {
    /// The run finished; carries the full result payload.
    Completed(RunResult),
}

/// The server-initiated event stream scoped to one run. Dropping the stream
/// closes the underlying connection.
pub type RunEventStream = Pin<Box<dyn Stream<Item = PortResult<RunEvent>> + Send>>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// Interview session lifecycle against the backend.
#[async_trait]
pub trait InterviewService: Send + Sync {
    /// Creates a new interview, tagged with the anonymous client key.
    async fn create_interview(&self, client_key: &str) -> PortResult<Session>;

    /// Invalidates an interview server-side (fire-and-forget on reload
    /// detection).
    async fn delete_interview(&self, session_id: &str) -> PortResult<()>;

    /// Finalizes an interview, triggering stats computation.
    async fn end_interview(&self, session_id: &str) -> PortResult<()>;

    async fn fetch_stats(&self, session_id: &str) -> PortResult<SessionStats>;

    async fn random_problem(&self) -> PortResult<Problem>;
}

/// Asynchronous code execution: submit, stream, polling fallback.
#[async_trait]
pub trait ExecutionService: Send + Sync {
    /// Submits a run and returns the backend-assigned run identifier.
    async fn submit_run(&self, session_id: &str, request: RunRequest) -> PortResult<String>;

    /// Opens the event stream scoped to `run_id`.
    async fn watch_run(&self, run_id: &str) -> PortResult<RunEventStream>;

    /// One-shot result fetch, used as the fallback after a stream error.
    /// `None` means no result body was available.
    async fn fetch_result(&self, run_id: &str) -> PortResult<Option<RunResult>>;
}

/// The AI observation endpoint consuming visual + UI-state snapshots.
#[async_trait]
pub trait ObservationService: Send + Sync {
    async fn observe(&self, observation: Observation) -> PortResult<ObserverReply>;
}

/// The AI voice-chat endpoint. Returns response audio when the AI chose to
/// speak, `None` otherwise.
#[async_trait]
pub trait VoiceChatService: Send + Sync {
    async fn chat(&self, segment: VoiceSegment) -> PortResult<Option<Vec<u8>>>;
}

/// Durable client-local storage for the session singleton and the stable
/// anonymous client key.
#[async_trait]
pub trait SessionStorageService: Send + Sync {
    async fn load_session(&self) -> PortResult<Option<Session>>;

    async fn store_session(&self, session: &Session) -> PortResult<()>;

    async fn clear_session(&self) -> PortResult<()>;

    /// Returns the stable client key, generating and persisting it on first
    /// use. The key never expires.
    async fn client_key(&self) -> PortResult<String>;
}

/// Rasterizes a region of the interview view into a compressed image.
#[async_trait]
pub trait ScreenCaptureService: Send + Sync {
    /// `Ok(None)` means the region is not currently mounted; the caller
    /// skips the capture without error.
    async fn capture(&self, region: CaptureRegion) -> PortResult<Option<VisualSnapshot>>;
}

/// Plays a returned audio response. The future resolves once playback has
/// finished, which callers use to sequence "AI speaking" signals and idle
/// clock resets.
#[async_trait]
pub trait AudioPlaybackService: Send + Sync {
    async fn play(&self, audio: Vec<u8>) -> PortResult<()>;
}

/// Microphone access. `open` fails with [`PortError::Denied`] when permission
/// is refused; this is the one error class surfaced to the user.
#[async_trait]
pub trait MicrophoneService: Send + Sync {
    async fn open(&self) -> PortResult<Box<dyn MicrophoneStream>>;
}

/// A live microphone capture. Implementations must release the underlying
/// device in `close`; leaking a live microphone handle is a correctness
/// defect, not cosmetic.
#[async_trait]
pub trait MicrophoneStream: Send {
    /// The next capture event, or `None` once the source is exhausted.
    async fn next_event(&mut self) -> Option<MicEvent>;

    /// Stops capture and releases the device. Returns the final partial
    /// segment, if any audio was still buffered.
    async fn close(&mut self) -> Option<Vec<u8>>;
}
