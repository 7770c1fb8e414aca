//! services/client/src/interaction.rs
//!
//! Tracks the time of the last user interaction (run submissions, console
//! commands, language changes). The idle watcher reads it to decide when the
//! candidate has gone quiet.

use std::sync::{Arc, Mutex};
use tokio::time::{Duration, Instant};

/// Shared last-interaction clock. Uses `tokio::time::Instant` so tests can
/// drive it with a paused runtime clock.
#[derive(Clone)]
pub struct InteractionTracker(Arc<Mutex<Instant>>);

impl InteractionTracker {
    pub fn new() -> Self {
        Self(Arc::new(Mutex::new(Instant::now())))
    }

    /// Marks an interaction now, resetting the idle clock.
    pub fn touch(&self) {
        *self.0.lock().expect("interaction lock poisoned") = Instant::now();
    }

    /// Time elapsed since the last tracked interaction.
    pub fn idle_for(&self) -> Duration {
        self.0
            .lock()
            .expect("interaction lock poisoned")
            .elapsed()
    }
}

impl Default for InteractionTracker {
    fn default() -> Self {
        Self::new()
    }
}
