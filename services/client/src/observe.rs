//! services/client/src/observe.rs
//!
//! Periodic and idle-triggered observation sampling: rasterize the interview
//! view, bundle it with the UI state and a change-detection hash, and send it
//! to the AI observation endpoint. Returned audio is played back; returned
//! text is surfaced at log level only.

use interview_buddy_core::domain::{CaptureRegion, Observation, UiState};
use interview_buddy_core::ports::{
    AudioPlaybackService, ObservationService, PortError, ScreenCaptureService,
};
use serde::Serialize;
use std::sync::{Arc, Mutex};
use tokio::time::{Duration, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::best_effort;
use crate::interaction::InteractionTracker;
use crate::session::SessionStore;
use crate::speaking::{SpeakingBus, SpeakingState};
use crate::state::{AppState, UiStateHandle};

/// At most one upstream-unavailable warning per this window, to keep a dead
/// gateway from flooding the log.
const UNAVAILABLE_WARN_EVERY: Duration = Duration::from_secs(60);

//=========================================================================================
// Change-detection hash
//=========================================================================================

/// The hash input is the tracked UI state only; session identifiers are
/// excluded. Field names and order are part of the wire contract: the
/// backend compares hashes across samples, so they must stay stable.
#[derive(Serialize)]
struct DiffHashInput<'a> {
    #[serde(rename = "problemId")]
    problem_id: i64,
    lang: &'a str,
    #[serde(rename = "lastRunStatus")]
    last_run_status: &'a str,
    #[serde(rename = "failingTests")]
    failing_tests: &'a [i64],
}

/// The classic `h = (h << 5) - h + c` string hash over UTF-16 code units,
/// rendered as an unsigned decimal. Order-sensitive, cheap, and emphatically
/// not cryptographic; collisions are acceptable.
pub fn js_string_hash(s: &str) -> String {
    let mut h: i32 = 0;
    for unit in s.encode_utf16() {
        h = (h << 5).wrapping_sub(h).wrapping_add(unit as i32);
    }
    (h as u32).to_string()
}

/// Deterministic change-detection hash over the serialized UI state.
pub fn diff_hash(state: &UiState) -> String {
    let input = DiffHashInput {
        problem_id: state.problem_id,
        lang: &state.language,
        last_run_status: &state.last_run_status,
        failing_tests: &state.failing_test_cases,
    };
    let json = serde_json::to_string(&input).unwrap();
    js_string_hash(&json)
}

//=========================================================================================
// The Observer
//=========================================================================================

/// Capture-and-send pipeline shared by the periodic timer, the idle watcher,
/// and the run controller's one-shot observation.
pub struct Observer {
    observation: Arc<dyn ObservationService>,
    capture: Arc<dyn ScreenCaptureService>,
    playback: Arc<dyn AudioPlaybackService>,
    sessions: Arc<SessionStore>,
    ui_state: UiStateHandle,
    speaking: SpeakingBus,
    unavailable_warned_at: Mutex<Option<Instant>>,
}

impl Observer {
    pub fn new(
        state: &AppState,
        sessions: Arc<SessionStore>,
        ui_state: UiStateHandle,
        speaking: SpeakingBus,
    ) -> Self {
        Self {
            observation: state.observation.clone(),
            capture: state.capture.clone(),
            playback: state.playback.clone(),
            sessions,
            ui_state,
            speaking,
            unavailable_warned_at: Mutex::new(None),
        }
    }

    /// Fires a single observation immediately (the periodic-timer variant:
    /// no speaking signals around playback).
    pub async fn sample_once(&self) {
        self.observe(false).await;
    }

    /// One full capture-and-send cycle. With `announce`, AI-speaking
    /// start/stop signals are published around playback (the idle-watch
    /// variant). Returns true iff a returned audio response played to
    /// completion, which is what resets the idle clock.
    async fn observe(&self, announce: bool) -> bool {
        let Some(session) = self.sessions.get().await else {
            return false;
        };

        let screenshot = match self.capture.capture(CaptureRegion::InterviewRoot).await {
            Ok(Some(screenshot)) => screenshot,
            // The interview view is not mounted; nothing to observe.
            Ok(None) => return false,
            Err(error) => {
                warn!("screen capture failed (suppressed): {}", error);
                return false;
            }
        };

        let ui = self.ui_state.snapshot();
        let hash = diff_hash(&ui);
        let observation = Observation {
            interview_id: session.session_id.clone(),
            session_id: session.session_id.clone(),
            screenshot,
            ui_state: ui.into_snapshot(session.session_id, hash),
        };

        let reply = match self.observation.observe(observation).await {
            Ok(reply) => reply,
            Err(PortError::Unavailable(message)) => {
                if self.allow_unavailable_warning() {
                    warn!("observation endpoint unavailable (suppressed): {}", message);
                }
                return false;
            }
            Err(error) => {
                warn!("observation failed (suppressed): {}", error);
                return false;
            }
        };

        if let Some(audio) = reply.audio {
            if announce {
                self.speaking.publish(SpeakingState::Speaking);
            }
            let played =
                best_effort("interviewer audio playback", self.playback.play(audio).await)
                    .is_some();
            if announce {
                self.speaking.publish(SpeakingState::Idle);
            }
            played
        } else {
            if let Some(text) = reply.display_text {
                info!("[interviewer] {}", text);
            }
            false
        }
    }

    /// 60-second throttle for the upstream-unavailable warning class.
    fn allow_unavailable_warning(&self) -> bool {
        let mut warned_at = self
            .unavailable_warned_at
            .lock()
            .expect("warn throttle lock poisoned");
        match *warned_at {
            Some(last) if last.elapsed() < UNAVAILABLE_WARN_EVERY => false,
            _ => {
                *warned_at = Some(Instant::now());
                true
            }
        }
    }
}

//=========================================================================================
// Timers
//=========================================================================================

/// Starts the repeating observation timer. The returned token, once
/// cancelled, guarantees no further samples fire from this timer; a sample
/// already in flight is not aborted.
pub fn start_periodic(observer: Arc<Observer>, period: Duration) -> CancellationToken {
    let token = CancellationToken::new();
    let stop = token.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first interval tick is immediate; the first sample should wait
        // a full period.
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = stop.cancelled() => break,
                _ = ticker.tick() => {
                    // Samples are fired without awaiting so a slow request
                    // never delays the schedule; overlapping in-flight
                    // observations are an accepted race.
                    let observer = observer.clone();
                    tokio::spawn(async move { observer.sample_once().await });
                }
            }
        }
    });
    token
}

/// Starts the idle watcher: every `check_every`, compare the time since the
/// last tracked interaction against `threshold`; when exceeded, run one
/// observation with speaking signals, and reset the idle clock only once
/// playback of a returned audio response completes.
pub fn start_idle_watch(
    observer: Arc<Observer>,
    interactions: InteractionTracker,
    check_every: Duration,
    threshold: Duration,
) -> CancellationToken {
    let token = CancellationToken::new();
    let stop = token.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(check_every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = stop.cancelled() => break,
                _ = ticker.tick() => {
                    if interactions.idle_for() >= threshold {
                        let played = observer.observe(true).await;
                        if played {
                            // The AI just spoke; don't re-trigger while the
                            // candidate digests the prompt.
                            interactions.touch();
                        }
                    }
                }
            }
        }
    });
    token
}
