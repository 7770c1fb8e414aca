//! services/client/src/voice.rs
//!
//! Voice chat with the AI interviewer: an open microphone feeds time-sliced
//! recording segments, amplitude frames drive a "candidate is speaking"
//! indicator, and each completed segment ships with visual and UI context
//! for a spoken reply.

use interview_buddy_core::domain::{CaptureRegion, MicEvent, VoiceSegment};
use interview_buddy_core::ports::{
    AudioPlaybackService, MicrophoneService, MicrophoneStream, PortResult, ScreenCaptureService,
    VoiceChatService,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::best_effort;
use crate::session::SessionStore;
use crate::speaking::{SpeakingBus, SpeakingState};
use crate::state::{AppState, UiStateHandle};

/// Root-mean-square amplitude above which a frame counts as speech.
pub const SPEAKING_RMS_THRESHOLD: f32 = 0.05;

/// Root-mean-square amplitude of a block of time-domain samples.
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_squares: f32 = samples.iter().map(|s| s * s).sum();
    (sum_squares / samples.len() as f32).sqrt()
}

//=========================================================================================
// VoiceSession
//=========================================================================================

pub struct VoiceSession {
    voice_chat: Arc<dyn VoiceChatService>,
    capture: Arc<dyn ScreenCaptureService>,
    playback: Arc<dyn AudioPlaybackService>,
    microphone: Arc<dyn MicrophoneService>,
    sessions: Arc<SessionStore>,
    ui_state: UiStateHandle,
    speaking: SpeakingBus,
    user_speaking: AtomicBool,
}

/// Handle over a running voice loop. Stopping cancels the loop, flushes the
/// final recording segment, and closes the microphone.
pub struct VoiceHandle {
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl VoiceHandle {
    pub async fn stop(self) {
        self.token.cancel();
        if let Err(error) = self.task.await {
            warn!("voice loop task failed on shutdown: {}", error);
        }
    }
}

impl VoiceSession {
    pub fn new(
        state: &AppState,
        sessions: Arc<SessionStore>,
        ui_state: UiStateHandle,
        speaking: SpeakingBus,
    ) -> Self {
        Self {
            voice_chat: state.voice_chat.clone(),
            capture: state.capture.clone(),
            playback: state.playback.clone(),
            microphone: state.microphone.clone(),
            sessions,
            ui_state,
            speaking,
            user_speaking: AtomicBool::new(false),
        }
    }

    /// Whether the most recent amplitude frame crossed the speech threshold.
    pub fn user_speaking(&self) -> bool {
        self.user_speaking.load(Ordering::SeqCst)
    }

    /// Opens the microphone and starts the recording loop. Microphone denial
    /// is the one failure surfaced to the caller; everything downstream of an
    /// open microphone is absorbed.
    pub async fn start(self: Arc<Self>) -> PortResult<VoiceHandle> {
        let stream = self.microphone.open().await?;
        info!("microphone open, voice loop starting");

        let token = CancellationToken::new();
        let task = tokio::spawn(Self::run(self, stream, token.clone()));
        Ok(VoiceHandle { token, task })
    }

    async fn run(
        session: Arc<Self>,
        mut stream: Box<dyn MicrophoneStream>,
        token: CancellationToken,
    ) {
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                event = stream.next_event() => match event {
                    Some(MicEvent::Frame(samples)) => {
                        let level = rms(&samples);
                        session
                            .user_speaking
                            .store(level >= SPEAKING_RMS_THRESHOLD, Ordering::SeqCst);
                    }
                    Some(MicEvent::Segment(audio)) => session.send_segment(audio).await,
                    None => {
                        debug!("microphone stream ended");
                        break;
                    }
                },
            }
        }

        // The close both releases the device and flushes whatever was
        // recorded since the last segment boundary.
        if let Some(tail) = stream.close().await {
            session.send_segment(tail).await;
        }
        session.user_speaking.store(false, Ordering::SeqCst);
        info!("voice loop stopped");
    }

    /// Bundles one recording segment with a code-editor capture and the
    /// current UI context, sends it, and plays any spoken reply. Every
    /// failure past this point is logged and dropped.
    async fn send_segment(&self, audio: Vec<u8>) {
        if audio.is_empty() {
            return;
        }
        let session = match self.sessions.get().await {
            Some(session) => session,
            None => return,
        };

        let screenshot = best_effort(
            "code editor capture",
            self.capture.capture(CaptureRegion::CodeEditor).await,
        )
        .flatten();

        // Voice context carries the identifiers but not the diff bookkeeping:
        // the failing-test list and diff hash stay empty here.
        let mut ui = self.ui_state.snapshot();
        ui.failing_test_cases.clear();
        let context = ui.into_snapshot(session.session_id, String::new());

        let segment = VoiceSegment {
            audio,
            screenshot,
            context: Some(context),
        };
        let reply = match best_effort("voice chat send", self.voice_chat.chat(segment).await) {
            Some(reply) => reply,
            None => return,
        };

        if let Some(audio) = reply {
            self.speaking.publish(SpeakingState::Speaking);
            best_effort("voice reply playback", self.playback.play(audio).await);
            self.speaking.publish(SpeakingState::Idle);
        }
    }
}
