//! services/client/src/protocol.rs
//!
//! Defines the wire-level request/response shapes exchanged with the backend
//! REST API, and their conversions to the core domain types. Field spellings
//! follow the backend exactly, including its inconsistencies.

use interview_buddy_core::domain::{
    Problem, RunRequest, RunResult, RunStatus, RunSummary, SessionStats, UiStateSnapshot,
    VisualSnapshot,
};
use interview_buddy_core::ports::{PortError, PortResult};
use serde::{Deserialize, Serialize};

//=========================================================================================
// Interview lifecycle
//=========================================================================================

/// `POST /interviews` response. `expires_at` arrives as an RFC3339 string.
#[derive(Debug, Deserialize)]
pub struct CreateInterviewResponse {
    #[serde(rename = "interviewId")]
    pub interview_id: String,
    #[serde(rename = "expiresAt")]
    pub expires_at: Option<String>,
}

//=========================================================================================
// Code execution
//=========================================================================================

#[derive(Debug, Serialize)]
pub struct ExecuteRequest {
    pub language_id: i64,
    pub source_code: String,
    pub problem_id: i64,
    pub mode: &'static str,
}

impl From<RunRequest> for ExecuteRequest {
    fn from(request: RunRequest) -> Self {
        Self {
            language_id: request.language_id,
            source_code: request.source_code,
            problem_id: request.problem_id,
            mode: request.mode.as_str(),
        }
    }
}

/// `POST /execute` response. The backend has shipped both spellings of the
/// run identifier; tolerate either.
#[derive(Debug, Deserialize)]
pub struct ExecuteResponse {
    #[serde(rename = "runID")]
    pub run_id_upper: Option<String>,
    #[serde(rename = "runId")]
    pub run_id_lower: Option<String>,
}

impl ExecuteResponse {
    pub fn into_run_id(self) -> Option<String> {
        self.run_id_upper.or(self.run_id_lower)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RunStatusDto {
    pub id: i64,
    pub description: String,
}

/// A run result as delivered on the `completed` stream event and by the
/// result-by-id fallback endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RunResultDto {
    pub stdout: Option<String>,
    pub stderr: Option<String>,
    pub compile_output: Option<String>,
    pub time: Option<String>,
    pub memory: Option<i64>,
    pub status: Option<RunStatusDto>,
}

impl From<RunResultDto> for RunResult {
    fn from(dto: RunResultDto) -> Self {
        RunResult {
            stdout: dto.stdout,
            stderr: dto.stderr,
            compile_output: dto.compile_output,
            time: dto.time,
            memory: dto.memory,
            status: dto.status.map(|s| RunStatus {
                id: s.id,
                description: s.description,
            }),
        }
    }
}

//=========================================================================================
// Problems
//=========================================================================================

/// The backend's nullable-string wrapper.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SqlString {
    #[serde(rename = "String", default)]
    pub value: String,
    #[serde(rename = "Valid", default)]
    pub valid: bool,
}

impl SqlString {
    pub fn into_option(self) -> Option<String> {
        if self.valid {
            Some(self.value)
        } else {
            None
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RandomProblemResponse {
    #[allow(dead_code)]
    pub status_code: i64,
    pub id: i64,
    pub title: String,
    pub difficulty: String,
    #[serde(default)]
    pub description: Option<SqlString>,
}

impl RandomProblemResponse {
    pub fn into_problem(self) -> PortResult<Problem> {
        let difficulty = self
            .difficulty
            .parse()
            .map_err(PortError::Unexpected)?;
        Ok(Problem {
            id: self.id,
            title: self.title,
            difficulty,
            description: self.description.and_then(SqlString::into_option),
        })
    }
}

//=========================================================================================
// Observation
//=========================================================================================

#[derive(Debug, Serialize)]
pub struct ScreenshotDto {
    pub mime: String,
    pub data: String,
}

impl From<VisualSnapshot> for ScreenshotDto {
    fn from(snapshot: VisualSnapshot) -> Self {
        Self {
            mime: snapshot.mime,
            data: snapshot.data,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UiStateDto {
    pub session_id: String,
    pub problem_id: i64,
    pub language: String,
    pub last_run_status: String,
    pub failing_test_cases: Vec<i64>,
    pub diff_hash: String,
}

impl From<UiStateSnapshot> for UiStateDto {
    fn from(snapshot: UiStateSnapshot) -> Self {
        Self {
            session_id: snapshot.session_id,
            problem_id: snapshot.problem_id,
            language: snapshot.language,
            last_run_status: snapshot.last_run_status,
            failing_test_cases: snapshot.failing_test_cases,
            diff_hash: snapshot.diff_hash,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ObserveRequest {
    pub interview_id: String,
    pub session_id: String,
    pub screenshot: ScreenshotDto,
    pub ui_state: UiStateDto,
}

/// `POST /vision/observe` response. Both fields optional; an empty or
/// malformed body means "no action".
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ObserveResponse {
    #[serde(default)]
    pub audio_b64: Option<String>,
    #[serde(default)]
    pub display_text: Option<String>,
}

//=========================================================================================
// Stats
//=========================================================================================

#[derive(Debug, Deserialize)]
pub struct RunSummaryDto {
    pub status: String,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub memory: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct SessionStatsDto {
    #[serde(rename = "sessionId")]
    pub session_id: String,
    #[serde(rename = "totalRuns")]
    pub total_runs: i64,
    #[serde(rename = "finalStatus")]
    pub final_status: String,
    #[serde(rename = "perRun", default)]
    pub per_run: Vec<RunSummaryDto>,
    #[serde(default)]
    pub remarks: Option<String>,
}

impl From<SessionStatsDto> for SessionStats {
    fn from(dto: SessionStatsDto) -> Self {
        SessionStats {
            session_id: dto.session_id,
            total_runs: dto.total_runs,
            final_status: dto.final_status,
            per_run: dto
                .per_run
                .into_iter()
                .map(|r| RunSummary {
                    status: r.status,
                    time: r.time,
                    memory: r.memory,
                })
                .collect(),
            remarks: dto.remarks,
        }
    }
}
