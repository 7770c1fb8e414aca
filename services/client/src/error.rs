//! services/client/src/error.rs
//!
//! Defines the primary error type for the client, plus the typed
//! logged-and-dropped helper used wherever the design calls for silent
//! best-effort behavior.

use crate::config::ConfigError;
use interview_buddy_core::ports::{PortError, PortResult};
use tracing::warn;

/// The primary error type for the `client` service.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error that propagated up from one of the core service ports.
    #[error("Service Port Error: {0}")]
    Port(#[from] PortError),

    /// Represents a standard Input/Output error (e.g., reading console input).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

/// Absorbs a port failure at the boundary where it occurred.
///
/// Observation and voice features are best-effort layers on top of the run
/// flow: their failures are logged at warning level and dropped, never
/// surfaced to the user. Routing every such suppression through this helper
/// keeps the policy explicit instead of scattering bare catch-and-ignore.
pub fn best_effort<T>(what: &str, result: PortResult<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(error) => {
            warn!("{} failed (suppressed): {}", what, error);
            None
        }
    }
}
