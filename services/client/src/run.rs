//! services/client/src/run.rs
//!
//! Orchestrates a single run/submit cycle: submit the code, wait on the
//! run's event stream, fall back to one poll on stream failure, record the
//! result against the session quota, and end the interview when the quota is
//! spent.

use futures::StreamExt;
use interview_buddy_core::domain::{RunKind, RunMode, RunRequest, RunResult, MAX_RUNS};
use interview_buddy_core::ports::{
    ExecutionService, InterviewService, RunEvent, RunEventStream,
};
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::best_effort;
use crate::interaction::InteractionTracker;
use crate::observe::Observer;
use crate::session::SessionStore;
use crate::state::{UiEvent, UiEventSender, UiStateHandle};

/// How a run reached completion. The streaming path triggers a one-shot
/// observation; the polling path does not (preserved asymmetry).
enum Completion {
    Streamed(RunResult),
    Polled(RunResult),
}

pub struct RunController {
    execution: Arc<dyn ExecutionService>,
    interviews: Arc<dyn InterviewService>,
    sessions: Arc<SessionStore>,
    observer: Arc<Observer>,
    interactions: InteractionTracker,
    ui_state: UiStateHandle,
    events: UiEventSender,
}

impl RunController {
    pub fn new(
        execution: Arc<dyn ExecutionService>,
        interviews: Arc<dyn InterviewService>,
        sessions: Arc<SessionStore>,
        observer: Arc<Observer>,
        interactions: InteractionTracker,
        ui_state: UiStateHandle,
        events: UiEventSender,
    ) -> Self {
        Self {
            execution,
            interviews,
            sessions,
            observer,
            interactions,
            ui_state,
            events,
        }
    }

    /// Submits one run. Precondition violations (no session, expired session,
    /// exhausted quota) are silent no-ops: no HTTP is issued and no error is
    /// surfaced. Transport failures are likewise absorbed; the user simply
    /// sees no result and may retry.
    pub async fn submit(
        &self,
        language: &str,
        language_id: i64,
        source_code: String,
        kind: RunKind,
    ) -> Option<RunResult> {
        let session = self.sessions.get().await?;
        if session.is_expired_at(chrono::Utc::now()) {
            let _ = self.events.send(UiEvent::NavigateToEntry);
            return None;
        }
        if session.quota_exhausted() {
            return None;
        }

        self.interactions.touch();
        self.ui_state.update(|state| state.language = language.to_string());

        let mode = match kind {
            RunKind::FinishEarly => RunMode::Hidden,
            RunKind::Scored => RunMode::for_attempt(session.run_count),
        };
        let request = RunRequest {
            language_id,
            source_code,
            problem_id: self.ui_state.snapshot().problem_id,
            mode,
        };

        let run_id = match self.execution.submit_run(&session.session_id, request).await {
            Ok(run_id) => run_id,
            Err(error) => {
                // Deliberate simplification: no retry, no result produced.
                warn!("run submission failed (suppressed): {}", error);
                return None;
            }
        };
        info!("run {} submitted ({} tests)", run_id, mode.as_str());

        let completion = match self.execution.watch_run(&run_id).await {
            Ok(stream) => match Self::await_completed(stream).await {
                Some(result) => Some(Completion::Streamed(result)),
                None => self.poll_once(&run_id).await,
            },
            Err(error) => {
                warn!("run event stream failed to open: {}", error);
                self.poll_once(&run_id).await
            }
        };
        let result = match completion {
            Some(completion) => self.record(&session.session_id, kind, completion).await,
            None => return None,
        };
        Some(result)
    }

    /// Waits for the named `completed` event. Any stream error, or the
    /// stream ending without the event, closes the channel and returns
    /// `None`; a received event closes the channel too, so a completed run
    /// can never also consume the polling fallback.
    async fn await_completed(mut stream: RunEventStream) -> Option<RunResult> {
        while let Some(event) = stream.next().await {
            match event {
                Ok(RunEvent::Completed(result)) => return Some(result),
                Err(error) => {
                    warn!("run event stream errored: {}", error);
                    return None;
                }
            }
        }
        None
    }

    /// Exactly one fallback GET against the result-by-id endpoint.
    async fn poll_once(&self, run_id: &str) -> Option<Completion> {
        best_effort("run result poll", self.execution.fetch_result(run_id).await)
            .flatten()
            .map(Completion::Polled)
    }

    /// Records the completed result: updates the UI state, counts the run,
    /// fires the one-shot observation on the streaming path, and ends the
    /// interview once the quota is spent (or immediately on an early finish).
    async fn record(&self, session_id: &str, kind: RunKind, completion: Completion) -> RunResult {
        let (result, streamed) = match completion {
            Completion::Streamed(result) => (result, true),
            Completion::Polled(result) => (result, false),
        };

        self.ui_state
            .update(|state| state.last_run_status = result.status_description().to_string());
        let _ = self.events.send(UiEvent::ResultReady(result.clone()));

        match kind {
            RunKind::FinishEarly => {
                // An early finish always ends the interview; it is not
                // counted against the quota.
                self.end_interview(session_id).await;
            }
            RunKind::Scored => {
                let new_count = self.sessions.increment_run_count().await;
                if streamed {
                    self.observer.sample_once().await;
                }
                if new_count == Some(MAX_RUNS) {
                    self.end_interview(session_id).await;
                }
            }
        }
        result
    }

    /// Fire-and-forget end-of-interview call with forced continuation: its
    /// failure never blocks the transition to the results view.
    async fn end_interview(&self, session_id: &str) {
        best_effort(
            "end-interview call",
            self.interviews.end_interview(session_id).await,
        );
        let _ = self.events.send(UiEvent::NavigateToStats);
    }
}
