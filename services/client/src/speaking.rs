//! services/client/src/speaking.rs
//!
//! A small shared state bus for the "AI is currently producing speech"
//! indicator, so the observation sampler and the voice session present a
//! unified signal instead of broadcasting untyped global events.

use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeakingState {
    Idle,
    Speaking,
}

/// Publish/subscribe handle over the speaking state. Cloning shares the
/// underlying channel.
#[derive(Clone)]
pub struct SpeakingBus {
    tx: std::sync::Arc<watch::Sender<SpeakingState>>,
}

impl SpeakingBus {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(SpeakingState::Idle);
        Self {
            tx: std::sync::Arc::new(tx),
        }
    }

    pub fn publish(&self, state: SpeakingState) {
        // send_replace never fails even with no subscribers.
        self.tx.send_replace(state);
    }

    pub fn subscribe(&self) -> watch::Receiver<SpeakingState> {
        self.tx.subscribe()
    }

    pub fn current(&self) -> SpeakingState {
        *self.tx.borrow()
    }
}

impl Default for SpeakingBus {
    fn default() -> Self {
        Self::new()
    }
}
