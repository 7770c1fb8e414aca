//! crates/interview_buddy_core/src/domain.rs
//!
//! Defines the pure, core data structures for the interview client.
//! These structs are independent of any HTTP wire format or storage encoding.

use chrono::{DateTime, Utc};

/// The run/submit quota for a single interview session.
pub const MAX_RUNS: u8 = 3;

/// The single active interview session tracked client-side.
///
/// At most one `Session` exists per client at a time; creating a new one
/// replaces the old unconditionally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub session_id: String,
    pub expires_at: DateTime<Utc>,
    pub run_count: u8,
}

impl Session {
    pub fn new(session_id: String, expires_at: DateTime<Utc>) -> Self {
        Self {
            session_id,
            expires_at,
            run_count: 0,
        }
    }

    /// True iff the session has expired at `now` (`now >= expires_at`).
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// True once the run quota is used up.
    pub fn quota_exhausted(&self) -> bool {
        self.run_count >= MAX_RUNS
    }

    /// Records a completed run. Saturates at [`MAX_RUNS`].
    pub fn record_run(&mut self) {
        self.run_count = (self.run_count + 1).min(MAX_RUNS);
    }
}

/// Which test set a run executes against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Visible/sample tests (the first two attempts).
    Sample,
    /// Graded hidden tests (the final attempt, or an early finish).
    Hidden,
}

impl RunMode {
    /// Mode selection rule: attempts 0 and 1 run the sample tests, the third
    /// (final) attempt runs the hidden tests.
    pub fn for_attempt(run_count: u8) -> Self {
        if run_count < 2 {
            RunMode::Sample
        } else {
            RunMode::Hidden
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RunMode::Sample => "sample",
            RunMode::Hidden => "hidden",
        }
    }
}

/// How a submission was initiated by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunKind {
    /// A normal Run/Submit attempt counted against the quota.
    Scored,
    /// An explicit "finish early" action; forces hidden tests and ends the
    /// interview once the result arrives.
    FinishEarly,
}

/// A single code-execution request sent to the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRequest {
    pub language_id: i64,
    pub source_code: String,
    pub problem_id: i64,
    pub mode: RunMode,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunStatus {
    pub id: i64,
    pub description: String,
}

/// The outcome of one code execution, produced by the backend. The client
/// does not validate its shape beyond optional-field access.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunResult {
    pub stdout: Option<String>,
    pub stderr: Option<String>,
    pub compile_output: Option<String>,
    pub time: Option<String>,
    pub memory: Option<i64>,
    pub status: Option<RunStatus>,
}

impl RunResult {
    /// The status description, or an empty string when absent.
    pub fn status_description(&self) -> &str {
        self.status.as_ref().map(|s| s.description.as_str()).unwrap_or("")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl std::str::FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(format!("unknown difficulty '{}'", other)),
        }
    }
}

/// A coding problem presented to the candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Problem {
    pub id: i64,
    pub title: String,
    pub difficulty: Difficulty,
    pub description: Option<String>,
}

/// The portion of the UI state tracked between observations. The observation
/// diff hash is computed over exactly these fields; session identifiers are
/// excluded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UiState {
    pub problem_id: i64,
    pub language: String,
    pub last_run_status: String,
    pub failing_test_cases: Vec<i64>,
}

/// A full UI-state snapshot as sent alongside an observation or voice segment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UiStateSnapshot {
    pub session_id: String,
    pub problem_id: i64,
    pub language: String,
    pub last_run_status: String,
    pub failing_test_cases: Vec<i64>,
    pub diff_hash: String,
}

impl UiState {
    pub fn into_snapshot(self, session_id: String, diff_hash: String) -> UiStateSnapshot {
        UiStateSnapshot {
            session_id,
            problem_id: self.problem_id,
            language: self.language,
            last_run_status: self.last_run_status,
            failing_test_cases: self.failing_test_cases,
            diff_hash,
        }
    }
}

pub const WEBP_MIME: &str = "image/webp";

/// A compressed rasterization of a region of the interview view, constructed
/// fresh per send and never retained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisualSnapshot {
    pub mime: String,
    pub data: String,
}

impl VisualSnapshot {
    pub fn webp(base64_data: String) -> Self {
        Self {
            mime: WEBP_MIME.to_string(),
            data: base64_data,
        }
    }
}

/// Which part of the interview view a capture targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureRegion {
    /// The whole interview root.
    InterviewRoot,
    /// The code-editor pane only (used for voice-segment context).
    CodeEditor,
}

/// One observation payload: visual snapshot plus UI state.
#[derive(Debug, Clone)]
pub struct Observation {
    pub interview_id: String,
    pub session_id: String,
    pub screenshot: VisualSnapshot,
    pub ui_state: UiStateSnapshot,
}

/// What the observation endpoint answered with, if anything.
#[derive(Debug, Clone, Default)]
pub struct ObserverReply {
    /// Decoded audio to play back (interviewer commentary).
    pub audio: Option<Vec<u8>>,
    /// Text to surface at log level when no audio was produced.
    pub display_text: Option<String>,
}

/// One completed microphone recording, bundled with visual and UI context
/// and sent as a unit for an AI voice response.
#[derive(Debug, Clone)]
pub struct VoiceSegment {
    pub audio: Vec<u8>,
    pub screenshot: Option<VisualSnapshot>,
    pub context: Option<UiStateSnapshot>,
}

/// An event produced by an open microphone.
#[derive(Debug, Clone)]
pub enum MicEvent {
    /// A completed, encoded recording segment.
    Segment(Vec<u8>),
    /// A block of time-domain samples for amplitude analysis.
    Frame(Vec<f32>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub status: String,
    pub time: Option<String>,
    pub memory: Option<i64>,
}

/// Per-session statistics shown on the results view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStats {
    pub session_id: String,
    pub total_runs: i64,
    pub final_status: String,
    pub per_run: Vec<RunSummary>,
    pub remarks: Option<String>,
}
