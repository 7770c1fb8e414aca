//! services/client/src/lib.rs
//!
//! The interview client service: session lifecycle, run execution,
//! observation sampling and voice chat over the `interview_buddy_core`
//! ports, plus the concrete HTTP/storage/media adapters and the console
//! driver wiring them together.

pub mod adapters;
pub mod config;
pub mod console;
pub mod error;
pub mod interaction;
pub mod observe;
pub mod protocol;
pub mod run;
pub mod session;
pub mod speaking;
pub mod state;
pub mod voice;

pub use config::Config;
pub use console::Console;
pub use error::ClientError;
pub use state::AppState;
