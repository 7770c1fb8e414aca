//! services/client/src/console.rs
//!
//! The interactive console driver. This is the control loop for one
//! operator session: it owns the entry flow, dispatches commands to the
//! lifecycle components, and renders the events they emit.

use interview_buddy_core::domain::{Problem, RunKind, RunResult, SessionStats};
use interview_buddy_core::ports::PortError;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::{best_effort, ClientError};
use crate::interaction::InteractionTracker;
use crate::observe::{start_idle_watch, start_periodic, Observer};
use crate::run::RunController;
use crate::session::SessionStore;
use crate::speaking::SpeakingBus;
use crate::state::{ui_event_channel, AppState, UiEvent, UiEventReceiver, UiStateHandle};
use crate::voice::{VoiceHandle, VoiceSession};

/// Execution-backend language identifiers, with a minimal JavaScript
/// fallback for anything unmapped.
fn language_id(language: &str) -> i64 {
    match language {
        "c" => 50,
        "cpp" | "c++" => 54,
        "go" => 60,
        "java" => 62,
        "javascript" | "js" => 63,
        "typescript" | "ts" => 74,
        "python" | "py" => 71,
        "rust" => 73,
        _ => 63,
    }
}

pub struct Console {
    state: AppState,
    sessions: Arc<SessionStore>,
    ui_state: UiStateHandle,
    interactions: InteractionTracker,
    controller: RunController,
    voice: Arc<VoiceSession>,
    observer: Arc<Observer>,
    events: UiEventReceiver,
    timers: Vec<CancellationToken>,
    mic: Option<VoiceHandle>,
}

impl Console {
    pub fn new(state: AppState) -> Self {
        let sessions = Arc::new(SessionStore::new(state.storage.clone()));
        let ui_state = UiStateHandle::new();
        let speaking = SpeakingBus::new();
        let interactions = InteractionTracker::new();
        let observer = Arc::new(Observer::new(
            &state,
            sessions.clone(),
            ui_state.clone(),
            speaking.clone(),
        ));
        let voice = Arc::new(VoiceSession::new(
            &state,
            sessions.clone(),
            ui_state.clone(),
            speaking,
        ));
        let (events_tx, events_rx) = ui_event_channel();
        let controller = RunController::new(
            state.execution.clone(),
            state.interviews.clone(),
            sessions.clone(),
            observer.clone(),
            interactions.clone(),
            ui_state.clone(),
            events_tx,
        );
        Self {
            state,
            sessions,
            ui_state,
            interactions,
            controller,
            voice,
            observer,
            events: events_rx,
            timers: vec![],
            mic: None,
        }
    }

    /// The console control loop. Returns when the operator quits or stdin
    /// closes.
    pub async fn run(mut self) -> Result<(), ClientError> {
        // A session still on disk means the previous process died with an
        // interview active; invalidate it server-side and start fresh.
        if let Some(abandoned) = self.sessions.recover_abandoned().await {
            best_effort(
                "invalidate abandoned interview",
                self.state
                    .interviews
                    .delete_interview(&abandoned.session_id)
                    .await,
            );
        }

        println!("interview buddy console - type 'help' for commands");
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            tokio::select! {
                event = self.events.recv() => match event {
                    Some(event) => {
                        if self.render_event(event).await {
                            break;
                        }
                    }
                    None => break,
                },
                line = lines.next_line() => match line? {
                    Some(line) => {
                        if self.dispatch(line.trim()).await {
                            break;
                        }
                    }
                    None => break,
                },
            }
        }
        self.shutdown().await;
        Ok(())
    }

    /// Handles one command line. Returns true when the loop should exit.
    async fn dispatch(&mut self, line: &str) -> bool {
        let mut parts = line.split_whitespace();
        let command = match parts.next() {
            Some(command) => command,
            None => return false,
        };
        let args: Vec<&str> = parts.collect();

        // A session that lapsed while idle is torn down before any command
        // acts on it.
        if self.sessions.is_expired().await {
            println!("session expired; interview over");
            self.teardown_session().await;
        }

        match (command, args.as_slice()) {
            ("help", _) => {
                println!("commands:");
                println!("  start                begin an interview and fetch a problem");
                println!("  run <lang> <file>    submit <file> as a scored run");
                println!("  finish <lang> <file> submit and end the interview early");
                println!("  lang <lang>          switch the tracked language");
                println!("  mic on|off           toggle voice chat");
                println!("  status               show the session state");
                println!("  quit                 exit");
            }
            ("start", _) => self.start_interview().await,
            ("run", [language, path]) => {
                self.submit(language, path, RunKind::Scored).await;
            }
            ("finish", [language, path]) => {
                self.submit(language, path, RunKind::FinishEarly).await;
            }
            ("lang", [language]) => {
                self.interactions.touch();
                let language = language.to_string();
                self.ui_state.update(|ui| ui.language = language);
            }
            ("mic", ["on"]) => self.mic_on().await,
            ("mic", ["off"]) => self.mic_off().await,
            ("status", _) => self.print_status().await,
            ("quit", _) => return true,
            _ => println!("unrecognized command (try 'help')"),
        }
        false
    }

    /// The entry flow: create an interview tagged with the stable client
    /// key, preload a random problem, and start both observation timers.
    async fn start_interview(&mut self) {
        if self.sessions.get().await.is_some() {
            println!("an interview is already running");
            return;
        }

        let client_key = self.sessions.client_key().await;
        let session = match self.state.interviews.create_interview(&client_key).await {
            Ok(session) => session,
            Err(error) => {
                println!("could not start an interview: {}", error);
                return;
            }
        };
        info!(
            "interview {} created, expires {}",
            session.session_id, session.expires_at
        );
        self.sessions.create(session).await;
        self.interactions.touch();

        match self.state.interviews.random_problem().await {
            Ok(problem) => {
                self.ui_state.update(|ui| {
                    ui.problem_id = problem.id;
                    ui.last_run_status = String::new();
                    ui.failing_test_cases.clear();
                });
                render_problem(&problem);
            }
            Err(error) => {
                // The interview still stands; the operator can retry runs
                // against problem 0 or restart.
                warn!("problem fetch failed: {}", error);
                println!("could not fetch a problem: {}", error);
            }
        }

        let config = &self.state.config;
        self.timers.push(start_periodic(
            self.observer.clone(),
            config.observe_period,
        ));
        self.timers.push(start_idle_watch(
            self.observer.clone(),
            self.interactions.clone(),
            config.idle_check_every,
            config.idle_threshold,
        ));
    }

    async fn submit(&mut self, language: &str, path: &str, kind: RunKind) {
        let source_code = match tokio::fs::read_to_string(path).await {
            Ok(source) => source,
            Err(error) => {
                println!("could not read {}: {}", path, error);
                return;
            }
        };
        let result = self
            .controller
            .submit(language, language_id(language), source_code, kind)
            .await;
        if result.is_none() {
            println!("no result recorded");
        }
        // The result itself arrives as a ResultReady event.
    }

    async fn mic_on(&mut self) {
        if self.mic.is_some() {
            println!("microphone is already on");
            return;
        }
        if self.sessions.get().await.is_none() {
            println!("start an interview first");
            return;
        }
        self.interactions.touch();
        match self.voice.clone().start().await {
            Ok(handle) => {
                println!("microphone on");
                self.mic = Some(handle);
            }
            // Denial is the one microphone failure the operator must see.
            Err(PortError::Denied(reason)) => {
                println!("microphone access denied: {}", reason)
            }
            Err(error) => println!("microphone unavailable: {}", error),
        }
    }

    async fn mic_off(&mut self) {
        match self.mic.take() {
            Some(handle) => {
                handle.stop().await;
                println!("microphone off");
            }
            None => println!("microphone is not on"),
        }
    }

    async fn print_status(&self) {
        match self.sessions.get().await {
            Some(session) => {
                let ui = self.ui_state.snapshot();
                println!("session {}", session.session_id);
                println!("  expires   {}", session.expires_at);
                println!("  runs used {}/3", session.run_count);
                println!("  problem   {}", ui.problem_id);
                println!(
                    "  language  {}",
                    if ui.language.is_empty() { "-" } else { &ui.language }
                );
                if !ui.last_run_status.is_empty() {
                    println!("  last run  {}", ui.last_run_status);
                }
                println!(
                    "  mic       {}",
                    if self.mic.is_some() { "on" } else { "off" }
                );
            }
            None => println!("no active session"),
        }
    }

    /// Renders one lifecycle event. Returns true when the loop should exit.
    async fn render_event(&mut self, event: UiEvent) -> bool {
        match event {
            UiEvent::ResultReady(result) => render_result(&result),
            UiEvent::NavigateToStats => {
                if let Some(session) = self.sessions.get().await {
                    match self.state.interviews.fetch_stats(&session.session_id).await {
                        Ok(stats) => render_stats(&stats),
                        Err(error) => println!("stats unavailable: {}", error),
                    }
                }
                println!("interview over");
                self.teardown_session().await;
            }
            UiEvent::NavigateToEntry => {
                println!("session expired; interview over");
                self.teardown_session().await;
            }
        }
        false
    }

    /// Stops the timers and microphone and drops the session.
    async fn teardown_session(&mut self) {
        for timer in self.timers.drain(..) {
            timer.cancel();
        }
        if let Some(handle) = self.mic.take() {
            handle.stop().await;
        }
        self.sessions.reset().await;
        self.ui_state.update(|ui| *ui = Default::default());
    }

    async fn shutdown(&mut self) {
        for timer in self.timers.drain(..) {
            timer.cancel();
        }
        if let Some(handle) = self.mic.take() {
            handle.stop().await;
        }
        info!("console session ended");
    }
}

//=========================================================================================
// Rendering
//=========================================================================================

fn render_problem(problem: &Problem) {
    println!("problem #{}: {} ({:?})", problem.id, problem.title, problem.difficulty);
    if let Some(description) = &problem.description {
        println!("{}", description);
    }
}

fn render_result(result: &RunResult) {
    println!("run finished: {}", result.status_description());
    if let Some(time) = &result.time {
        println!("  time   {}s", time);
    }
    if let Some(memory) = result.memory {
        println!("  memory {} KB", memory);
    }
    if let Some(stdout) = &result.stdout {
        if !stdout.is_empty() {
            println!("  stdout:\n{}", stdout);
        }
    }
    if let Some(stderr) = &result.stderr {
        if !stderr.is_empty() {
            println!("  stderr:\n{}", stderr);
        }
    }
    if let Some(compile_output) = &result.compile_output {
        if !compile_output.is_empty() {
            println!("  compiler:\n{}", compile_output);
        }
    }
}

fn render_stats(stats: &SessionStats) {
    println!("session stats for {}", stats.session_id);
    println!("  total runs   {}", stats.total_runs);
    println!("  final status {}", stats.final_status);
    for (index, run) in stats.per_run.iter().enumerate() {
        println!(
            "  run {}: {} ({}s, {} KB)",
            index + 1,
            run.status,
            run.time.as_deref().unwrap_or("?"),
            run.memory.map_or("?".to_string(), |m| m.to_string()),
        );
    }
    if let Some(remarks) = &stats.remarks {
        println!("  remarks: {}", remarks);
    }
}
