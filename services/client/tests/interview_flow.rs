//! End-to-end lifecycle tests over the public wiring: real storage, capture
//! and playback adapters with a scripted backend in place of HTTP.

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use client_lib::adapters::{FilePlaybackAdapter, FileStorageAdapter, FrameCaptureAdapter};
use client_lib::config::Config;
use client_lib::interaction::InteractionTracker;
use client_lib::observe::Observer;
use client_lib::run::RunController;
use client_lib::session::SessionStore;
use client_lib::speaking::SpeakingBus;
use client_lib::state::{ui_event_channel, AppState, UiEvent, UiEventReceiver, UiStateHandle};
use interview_buddy_core::domain::{
    Difficulty, Observation, ObserverReply, Problem, RunKind, RunRequest, RunResult, RunStatus,
    Session, SessionStats, VoiceSegment,
};
use interview_buddy_core::ports::{
    ExecutionService, InterviewService, MicrophoneService, MicrophoneStream, ObservationService,
    PortError, PortResult, RunEvent, RunEventStream, SessionStorageService, VoiceChatService,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

//=========================================================================================
// Scripted backend
//=========================================================================================

#[derive(Clone, Copy, PartialEq)]
enum ExecuteScript {
    Streams,
    SubmitFails,
    StreamErrorsPollSucceeds,
}

struct ScriptedBackend {
    script: ExecuteScript,
    submits: AtomicUsize,
    polls: AtomicUsize,
    ends: AtomicUsize,
    deletes: Mutex<Vec<String>>,
    observations: AtomicUsize,
}

impl ScriptedBackend {
    fn new(script: ExecuteScript) -> Self {
        Self {
            script,
            submits: AtomicUsize::new(0),
            polls: AtomicUsize::new(0),
            ends: AtomicUsize::new(0),
            deletes: Mutex::new(vec![]),
            observations: AtomicUsize::new(0),
        }
    }
}

fn accepted() -> RunResult {
    RunResult {
        status: Some(RunStatus {
            id: 3,
            description: "Accepted".to_string(),
        }),
        time: Some("0.02".to_string()),
        memory: Some(2048),
        ..Default::default()
    }
}

#[async_trait]
impl InterviewService for ScriptedBackend {
    async fn create_interview(&self, _client_key: &str) -> PortResult<Session> {
        Ok(Session::new(
            "itv-1".to_string(),
            Utc::now() + ChronoDuration::hours(1),
        ))
    }

    async fn delete_interview(&self, session_id: &str) -> PortResult<()> {
        self.deletes.lock().unwrap().push(session_id.to_string());
        Ok(())
    }

    async fn end_interview(&self, _session_id: &str) -> PortResult<()> {
        self.ends.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn fetch_stats(&self, session_id: &str) -> PortResult<SessionStats> {
        Ok(SessionStats {
            session_id: session_id.to_string(),
            total_runs: 3,
            final_status: "Accepted".to_string(),
            per_run: vec![],
            remarks: None,
        })
    }

    async fn random_problem(&self) -> PortResult<Problem> {
        Ok(Problem {
            id: 42,
            title: "Two Sum".to_string(),
            difficulty: Difficulty::Easy,
            description: None,
        })
    }
}

#[async_trait]
impl ExecutionService for ScriptedBackend {
    async fn submit_run(&self, _session_id: &str, _request: RunRequest) -> PortResult<String> {
        if self.script == ExecuteScript::SubmitFails {
            return Err(PortError::Unexpected("500 Internal Server Error".into()));
        }
        let n = self.submits.fetch_add(1, Ordering::SeqCst);
        Ok(format!("run-{}", n + 1))
    }

    async fn watch_run(&self, _run_id: &str) -> PortResult<RunEventStream> {
        let events: Vec<PortResult<RunEvent>> = match self.script {
            ExecuteScript::Streams => vec![Ok(RunEvent::Completed(accepted()))],
            _ => vec![Err(PortError::Unexpected("stream reset".into()))],
        };
        Ok(Box::pin(futures::stream::iter(events)))
    }

    async fn fetch_result(&self, _run_id: &str) -> PortResult<Option<RunResult>> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        match self.script {
            ExecuteScript::StreamErrorsPollSucceeds => Ok(Some(accepted())),
            _ => Ok(None),
        }
    }
}

#[async_trait]
impl ObservationService for ScriptedBackend {
    async fn observe(&self, _observation: Observation) -> PortResult<ObserverReply> {
        self.observations.fetch_add(1, Ordering::SeqCst);
        Ok(ObserverReply::default())
    }
}

#[async_trait]
impl VoiceChatService for ScriptedBackend {
    async fn chat(&self, _segment: VoiceSegment) -> PortResult<Option<Vec<u8>>> {
        Ok(None)
    }
}

struct NoMicrophone;

#[async_trait]
impl MicrophoneService for NoMicrophone {
    async fn open(&self) -> PortResult<Box<dyn MicrophoneStream>> {
        Err(PortError::Denied("not under test".into()))
    }
}

//=========================================================================================
// Harness
//=========================================================================================

fn test_config(storage_dir: std::path::PathBuf, frame: Option<std::path::PathBuf>) -> Config {
    Config {
        api_base_url: "http://localhost:0".to_string(),
        log_level: tracing::Level::INFO,
        storage_dir,
        observe_period: std::time::Duration::from_secs(30),
        idle_check_every: std::time::Duration::from_secs(60),
        idle_threshold: std::time::Duration::from_secs(300),
        voice_segment: std::time::Duration::from_secs(1),
        capture_frame_path: frame,
        microphone_wav_path: None,
        playback_dir: None,
    }
}

struct Harness {
    backend: Arc<ScriptedBackend>,
    storage: Arc<dyn SessionStorageService>,
    sessions: Arc<SessionStore>,
    controller: RunController,
    events: UiEventReceiver,
    _dir: tempfile::TempDir,
}

fn harness(script: ExecuteScript) -> Harness {
    let dir = tempfile::tempdir().unwrap();

    // A real frame on disk so observations flow through the image pipeline.
    let frame_path = dir.path().join("frame.png");
    image::RgbaImage::from_pixel(4, 4, image::Rgba([0, 0, 0, 255]))
        .save(&frame_path)
        .unwrap();

    let backend = Arc::new(ScriptedBackend::new(script));
    let storage: Arc<dyn SessionStorageService> =
        Arc::new(FileStorageAdapter::new(dir.path().join("storage")));
    let state = AppState {
        config: Arc::new(test_config(dir.path().join("storage"), Some(frame_path))),
        storage: storage.clone(),
        interviews: backend.clone(),
        execution: backend.clone(),
        observation: backend.clone(),
        voice_chat: backend.clone(),
        capture: Arc::new(FrameCaptureAdapter::new(Some(
            dir.path().join("frame.png"),
        ))),
        playback: Arc::new(FilePlaybackAdapter::new(None)),
        microphone: Arc::new(NoMicrophone),
    };

    let sessions = Arc::new(SessionStore::new(state.storage.clone()));
    let ui_state = UiStateHandle::new();
    ui_state.update(|ui| {
        ui.problem_id = 42;
        ui.language = "python".to_string();
    });
    let observer = Arc::new(Observer::new(
        &state,
        sessions.clone(),
        ui_state.clone(),
        SpeakingBus::new(),
    ));
    let (events_tx, events_rx) = ui_event_channel();
    let controller = RunController::new(
        state.execution.clone(),
        state.interviews.clone(),
        sessions.clone(),
        observer,
        InteractionTracker::new(),
        ui_state,
        events_tx,
    );

    Harness {
        backend,
        storage,
        sessions,
        controller,
        events: events_rx,
        _dir: dir,
    }
}

async fn start_interview(harness: &Harness) -> Session {
    let key = harness.sessions.client_key().await;
    let session = harness.backend.create_interview(&key).await.unwrap();
    harness.sessions.create(session.clone()).await;
    session
}

fn drain(events: &mut UiEventReceiver) -> Vec<UiEvent> {
    let mut drained = vec![];
    while let Ok(event) = events.try_recv() {
        drained.push(event);
    }
    drained
}

//=========================================================================================
// Scenarios
//=========================================================================================

#[tokio::test]
async fn three_streamed_runs_complete_an_interview() {
    let mut h = harness(ExecuteScript::Streams);
    start_interview(&h).await;

    for _ in 0..3 {
        let result = h
            .controller
            .submit("python", 71, "print(1)".into(), RunKind::Scored)
            .await
            .unwrap();
        assert_eq!(result.status_description(), "Accepted");
    }

    assert_eq!(h.sessions.get().await.unwrap().run_count, 3);
    assert_eq!(h.backend.ends.load(Ordering::SeqCst), 1);
    // Each streamed completion fired its one-shot observation through the
    // real capture pipeline.
    assert_eq!(h.backend.observations.load(Ordering::SeqCst), 3);
    assert_eq!(h.backend.polls.load(Ordering::SeqCst), 0);

    let events = drain(&mut h.events);
    let results = events
        .iter()
        .filter(|e| matches!(e, UiEvent::ResultReady(_)))
        .count();
    let stats = events
        .iter()
        .filter(|e| matches!(e, UiEvent::NavigateToStats))
        .count();
    assert_eq!((results, stats), (3, 1));

    // A fourth submission is a silent no-op.
    let extra = h
        .controller
        .submit("python", 71, "print(1)".into(), RunKind::Scored)
        .await;
    assert!(extra.is_none());
    assert_eq!(h.backend.submits.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn run_count_survives_in_durable_storage() {
    let h = harness(ExecuteScript::Streams);
    start_interview(&h).await;

    h.controller
        .submit("python", 71, "print(1)".into(), RunKind::Scored)
        .await
        .unwrap();

    let persisted = h.storage.load_session().await.unwrap().unwrap();
    assert_eq!(persisted.run_count, 1);
    assert_eq!(persisted.session_id, "itv-1");
}

#[tokio::test]
async fn failed_execute_post_changes_nothing() {
    let mut h = harness(ExecuteScript::SubmitFails);
    start_interview(&h).await;

    let result = h
        .controller
        .submit("python", 71, "print(1)".into(), RunKind::Scored)
        .await;
    assert!(result.is_none());
    assert_eq!(h.sessions.get().await.unwrap().run_count, 0);
    assert_eq!(h.backend.polls.load(Ordering::SeqCst), 0);
    assert!(drain(&mut h.events).is_empty());
}

#[tokio::test]
async fn stream_failure_recovers_through_a_single_poll() {
    let h = harness(ExecuteScript::StreamErrorsPollSucceeds);
    start_interview(&h).await;

    let result = h
        .controller
        .submit("python", 71, "print(1)".into(), RunKind::Scored)
        .await
        .unwrap();
    assert_eq!(result.status_description(), "Accepted");
    assert_eq!(h.backend.polls.load(Ordering::SeqCst), 1);
    assert_eq!(h.sessions.get().await.unwrap().run_count, 1);
    // The polling path never fires the one-shot observation.
    assert_eq!(h.backend.observations.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn abandoned_session_is_recovered_and_invalidated() {
    let h = harness(ExecuteScript::Streams);
    let session = start_interview(&h).await;

    // Simulate a process restart over the same storage directory.
    let revived = SessionStore::new(h.storage.clone());
    let abandoned = revived.recover_abandoned().await.unwrap();
    assert_eq!(abandoned.session_id, session.session_id);

    // The console invalidates it server-side.
    h.backend
        .delete_interview(&abandoned.session_id)
        .await
        .unwrap();
    assert_eq!(
        h.backend.deletes.lock().unwrap().as_slice(),
        ["itv-1".to_string()]
    );

    // Storage was drained; a second restart finds nothing.
    assert!(revived.recover_abandoned().await.is_none());
}

#[tokio::test]
async fn finish_early_ends_without_spending_the_quota() {
    let mut h = harness(ExecuteScript::Streams);
    start_interview(&h).await;

    h.controller
        .submit("python", 71, "print(1)".into(), RunKind::Scored)
        .await
        .unwrap();
    h.controller
        .submit("python", 71, "print(1)".into(), RunKind::FinishEarly)
        .await
        .unwrap();

    assert_eq!(h.sessions.get().await.unwrap().run_count, 1);
    assert_eq!(h.backend.ends.load(Ordering::SeqCst), 1);
    assert!(drain(&mut h.events)
        .iter()
        .any(|e| matches!(e, UiEvent::NavigateToStats)));
}
