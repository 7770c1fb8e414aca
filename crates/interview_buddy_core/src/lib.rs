pub mod domain;
pub mod ports;

pub use domain::{
    CaptureRegion, Difficulty, MicEvent, Observation, ObserverReply, Problem, RunKind, RunMode,
    RunRequest, RunResult, RunStatus, RunSummary, Session, SessionStats, UiState, UiStateSnapshot,
    VisualSnapshot, VoiceSegment, MAX_RUNS, WEBP_MIME,
};
pub use ports::{
    AudioPlaybackService, ExecutionService, InterviewService, MicrophoneService, MicrophoneStream,
    ObservationService, PortError, PortResult, RunEvent, RunEventStream, ScreenCaptureService,
    SessionStorageService, VoiceChatService,
};
