//! services/client/src/adapters/http.rs
//!
//! This module contains the adapter for the backend REST API. One struct
//! implements the `InterviewService`, `ExecutionService`,
//! `ObservationService`, and `VoiceChatService` ports over a shared
//! `reqwest::Client`.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use futures::StreamExt;
use interview_buddy_core::domain::{
    Observation, ObserverReply, Problem, RunRequest, RunResult, Session, SessionStats,
    VoiceSegment,
};
use interview_buddy_core::ports::{
    ExecutionService, InterviewService, ObservationService, PortError, PortResult, RunEvent,
    RunEventStream, VoiceChatService,
};
use reqwest::StatusCode;
use tracing::{debug, warn};

use crate::protocol::{
    CreateInterviewResponse, ExecuteRequest, ExecuteResponse, ObserveRequest, ObserveResponse,
    RandomProblemResponse, RunResultDto, ScreenshotDto, SessionStatsDto, UiStateDto,
};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter over the backend REST API, e.g. `http://localhost:8080/api/v1`.
#[derive(Clone)]
pub struct HttpBackendAdapter {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBackendAdapter {
    pub fn new(base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Maps a transport-level failure (connection refused, reset mid-body).
fn transport_error(error: reqwest::Error) -> PortError {
    PortError::Unexpected(error.to_string())
}

/// Maps a non-success status to the port error classes: 404 is `NotFound`,
/// gateway statuses are `Unavailable`, everything else `Unexpected`.
async fn ensure_success(response: reqwest::Response) -> PortResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = format!("{}: {}", status, body);
    match status {
        StatusCode::NOT_FOUND => Err(PortError::NotFound(message)),
        StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT => {
            Err(PortError::Unavailable(message))
        }
        _ => Err(PortError::Unexpected(message)),
    }
}

//=========================================================================================
// `InterviewService` Trait Implementation
//=========================================================================================

#[async_trait]
impl InterviewService for HttpBackendAdapter {
    async fn create_interview(&self, client_key: &str) -> PortResult<Session> {
        let response = self
            .client
            .post(self.url("/interviews"))
            .header("X-Client-Key", client_key)
            .send()
            .await
            .map_err(transport_error)?;
        let body: CreateInterviewResponse = ensure_success(response)
            .await?
            .json()
            .await
            .map_err(transport_error)?;

        // A missing or unparseable expiry falls back to one hour from now,
        // matching the backend's session lifetime.
        let expires_at = body
            .expires_at
            .as_deref()
            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
            .map(|parsed| parsed.with_timezone(&Utc))
            .unwrap_or_else(|| Utc::now() + Duration::hours(1));

        Ok(Session::new(body.interview_id, expires_at))
    }

    async fn delete_interview(&self, session_id: &str) -> PortResult<()> {
        let response = self
            .client
            .delete(self.url(&format!("/interviews/{}", session_id)))
            .send()
            .await
            .map_err(transport_error)?;
        ensure_success(response).await?;
        Ok(())
    }

    async fn end_interview(&self, session_id: &str) -> PortResult<()> {
        let response = self
            .client
            .post(self.url(&format!("/interviews/{}/end", session_id)))
            .send()
            .await
            .map_err(transport_error)?;
        ensure_success(response).await?;
        Ok(())
    }

    async fn fetch_stats(&self, session_id: &str) -> PortResult<SessionStats> {
        let response = self
            .client
            .get(self.url(&format!("/stats/session/{}", session_id)))
            .send()
            .await
            .map_err(transport_error)?;
        let dto: SessionStatsDto = ensure_success(response)
            .await?
            .json()
            .await
            .map_err(transport_error)?;
        Ok(dto.into())
    }

    async fn random_problem(&self) -> PortResult<Problem> {
        let response = self
            .client
            .get(self.url("/problems/random"))
            .send()
            .await
            .map_err(transport_error)?;
        let dto: RandomProblemResponse = ensure_success(response)
            .await?
            .json()
            .await
            .map_err(transport_error)?;
        dto.into_problem()
    }
}

//=========================================================================================
// `ExecutionService` Trait Implementation
//=========================================================================================

#[async_trait]
impl ExecutionService for HttpBackendAdapter {
    async fn submit_run(&self, session_id: &str, request: RunRequest) -> PortResult<String> {
        let response = self
            .client
            .post(self.url("/execute"))
            .header("X-Session-ID", session_id)
            .json(&ExecuteRequest::from(request))
            .send()
            .await
            .map_err(transport_error)?;
        let body: ExecuteResponse = ensure_success(response)
            .await?
            .json()
            .await
            .map_err(transport_error)?;
        body.into_run_id()
            .ok_or_else(|| PortError::Unexpected("execute response carried no run id".to_string()))
    }

    async fn watch_run(&self, run_id: &str) -> PortResult<RunEventStream> {
        let response = self
            .client
            .get(self.url(&format!("/execute/{}/events", run_id)))
            .send()
            .await
            .map_err(transport_error)?;
        let response = ensure_success(response).await?;
        Ok(completed_event_stream(response.bytes_stream()))
    }

    async fn fetch_result(&self, run_id: &str) -> PortResult<Option<RunResult>> {
        let response = self
            .client
            .get(self.url(&format!("/execute/{}", run_id)))
            .send()
            .await
            .map_err(transport_error)?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let body = ensure_success(response)
            .await?
            .text()
            .await
            .map_err(transport_error)?;
        if body.trim().is_empty() {
            return Ok(None);
        }
        let dto: RunResultDto = serde_json::from_str(&body)
            .map_err(|e| PortError::Unexpected(format!("malformed run result: {}", e)))?;
        Ok(Some(dto.into()))
    }
}

//=========================================================================================
// Server-sent events
//=========================================================================================

/// One parsed server-sent message: the accumulated `data:` payload tagged
/// with the preceding `event:` name, if any.
#[derive(Debug, Default, PartialEq, Eq)]
struct SseMessage {
    event: Option<String>,
    data: String,
}

/// Incremental line-buffered parser over raw SSE chunks. Chunk boundaries do
/// not align with line or message boundaries, so partial lines are carried
/// between pushes.
#[derive(Default)]
struct SseParser {
    buffer: String,
    event: Option<String>,
    data: Vec<String>,
}

impl SseParser {
    fn push(&mut self, chunk: &[u8]) -> Vec<SseMessage> {
        self.buffer.push_str(&String::from_utf8_lossy(chunk));
        let mut messages = vec![];
        while let Some(newline) = self.buffer.find('\n') {
            let line: String = self.buffer.drain(..=newline).collect();
            if let Some(message) = self.take_line(line.trim_end_matches(['\n', '\r'])) {
                messages.push(message);
            }
        }
        messages
    }

    /// Flushes a message left unterminated when the connection closes.
    fn finish(&mut self) -> Option<SseMessage> {
        let trailing = std::mem::take(&mut self.buffer);
        if !trailing.trim().is_empty() {
            self.take_line(trailing.trim_end_matches(['\n', '\r']));
        }
        if self.data.is_empty() {
            return None;
        }
        Some(self.take_message())
    }

    fn take_line(&mut self, line: &str) -> Option<SseMessage> {
        if line.is_empty() {
            // Blank line terminates a message.
            if self.data.is_empty() {
                self.event = None;
                return None;
            }
            return Some(self.take_message());
        }
        if line.starts_with(':') {
            return None;
        }
        if let Some(name) = line.strip_prefix("event:") {
            self.event = Some(name.trim_start().to_string());
        } else if let Some(data) = line.strip_prefix("data:") {
            self.data.push(data.strip_prefix(' ').unwrap_or(data).to_string());
        }
        // Unknown fields (id, retry) are ignored.
        None
    }

    fn take_message(&mut self) -> SseMessage {
        SseMessage {
            event: self.event.take(),
            data: std::mem::take(&mut self.data).join("\n"),
        }
    }
}

/// Adapts a raw byte stream into the run event stream, keeping only the
/// named `completed` events. A transport error is surfaced once and ends
/// the stream.
fn completed_event_stream<S>(bytes: S) -> RunEventStream
where
    S: futures::Stream<Item = Result<bytes::Bytes, reqwest::Error>> + Send + 'static,
{
    struct State<S> {
        bytes: std::pin::Pin<Box<S>>,
        parser: SseParser,
        ready: std::collections::VecDeque<PortResult<RunEvent>>,
        done: bool,
    }

    let state = State {
        bytes: Box::pin(bytes),
        parser: SseParser::default(),
        ready: std::collections::VecDeque::new(),
        done: false,
    };

    let stream = futures::stream::unfold(state, |mut state| async move {
        loop {
            if let Some(item) = state.ready.pop_front() {
                return Some((item, state));
            }
            if state.done {
                return None;
            }
            match state.bytes.next().await {
                Some(Ok(chunk)) => {
                    for message in state.parser.push(&chunk) {
                        if let Some(event) = parse_completed(message) {
                            state.ready.push_back(event);
                        }
                    }
                }
                Some(Err(error)) => {
                    state.done = true;
                    state.ready.push_back(Err(transport_error(error)));
                }
                None => {
                    state.done = true;
                    if let Some(event) = state.parser.finish().and_then(parse_completed) {
                        state.ready.push_back(event);
                    }
                }
            }
        }
    });
    Box::pin(stream)
}

fn parse_completed(message: SseMessage) -> Option<PortResult<RunEvent>> {
    if message.event.as_deref() != Some("completed") {
        debug!("ignoring stream event {:?}", message.event);
        return None;
    }
    match serde_json::from_str::<RunResultDto>(&message.data) {
        Ok(dto) => Some(Ok(RunEvent::Completed(dto.into()))),
        Err(error) => Some(Err(PortError::Unexpected(format!(
            "malformed completed event: {}",
            error
        )))),
    }
}

//=========================================================================================
// `ObservationService` Trait Implementation
//=========================================================================================

#[async_trait]
impl ObservationService for HttpBackendAdapter {
    async fn observe(&self, observation: Observation) -> PortResult<ObserverReply> {
        let request = ObserveRequest {
            interview_id: observation.interview_id,
            session_id: observation.session_id,
            screenshot: observation.screenshot.into(),
            ui_state: observation.ui_state.into(),
        };
        let response = self
            .client
            .post(self.url("/vision/observe"))
            .json(&request)
            .send()
            .await
            .map_err(transport_error)?;
        let body = ensure_success(response)
            .await?
            .text()
            .await
            .map_err(transport_error)?;

        // A malformed or empty body means "no action", not an error.
        let reply: ObserveResponse = serde_json::from_str(&body).unwrap_or_default();
        let audio = match reply.audio_b64 {
            Some(encoded) => match BASE64.decode(encoded.as_bytes()) {
                Ok(decoded) => Some(decoded),
                Err(error) => {
                    warn!("undecodable observation audio (dropped): {}", error);
                    None
                }
            },
            None => None,
        };
        Ok(ObserverReply {
            audio,
            display_text: reply.display_text,
        })
    }
}

//=========================================================================================
// `VoiceChatService` Trait Implementation
//=========================================================================================

#[async_trait]
impl VoiceChatService for HttpBackendAdapter {
    async fn chat(&self, segment: VoiceSegment) -> PortResult<Option<Vec<u8>>> {
        let mut form = reqwest::multipart::Form::new().part(
            "audio",
            reqwest::multipart::Part::bytes(segment.audio)
                .file_name("segment.wav")
                .mime_str("audio/wav")
                .map_err(|e| PortError::Unexpected(e.to_string()))?,
        );
        if let Some(screenshot) = segment.screenshot {
            let dto = ScreenshotDto::from(screenshot);
            let json = serde_json::to_string(&dto)
                .map_err(|e| PortError::Unexpected(e.to_string()))?;
            form = form.text("screenshot", json);
        }
        if let Some(context) = segment.context {
            let dto = UiStateDto::from(context);
            let json = serde_json::to_string(&dto)
                .map_err(|e| PortError::Unexpected(e.to_string()))?;
            form = form.text("context", json);
        }

        let response = self
            .client
            .post(self.url("/voice/chat"))
            .multipart(form)
            .send()
            .await
            .map_err(transport_error)?;
        let body = ensure_success(response)
            .await?
            .bytes()
            .await
            .map_err(transport_error)?;
        if body.is_empty() {
            return Ok(None);
        }
        Ok(Some(body.to_vec()))
    }
}
