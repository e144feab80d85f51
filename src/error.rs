//! # Error Types
//!
//! Only start-up failures travel as `Error`. Everything recoverable at run time
//! (missing image, empty sound, no compositor) is resolved where it happens and
//! surfaces as a `bool` or `Option` plus a log line.

use thiserror::Error;

/// Fatal start-up errors. The daemon cannot run without its timers.
#[derive(Debug, Error)]
pub enum Error {
    /// A periodic timer could not be created (no async runtime on this thread)
    #[error("failed to create timer `{name}`: {reason}")]
    Timer { name: &'static str, reason: String },

    /// D-Bus connection or registration failed
    #[error("D-Bus error: {0}")]
    DBus(#[from] zbus::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
