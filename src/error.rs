//! Error types for the game core.
//!
//! Three failure domains, mirroring how each one is handled:
//! hardware errors degrade to the mock backend, webhook errors are
//! logged and swallowed by the round loop, config errors are fatal
//! before the loop ever starts.

use thiserror::Error;

/// All errors surfaced by the game core.
#[derive(Debug, Error)]
pub enum GameError {
    /// Device open / permission / missing-library failures.
    ///
    /// Recoverable: the hardware factory falls back to the mock
    /// backend instead of failing process startup.
    #[error("hardware error: {0}")]
    Hardware(String),

    /// Automation webhook failure after all retry attempts.
    ///
    /// Never fatal to the hardware loop or the round cycle.
    #[error("automation API error{}: {message}", status.map(|s| format!(" (HTTP {s})")).unwrap_or_default())]
    Api {
        /// HTTP status of the last response, if one was received.
        status: Option<u16>,
        /// Human-readable failure description.
        message: String,
    },

    /// Invalid or unreadable configuration.
    ///
    /// Fatal at startup: the binary exits non-zero before entering
    /// the game loop.
    #[error("config error: {0}")]
    Config(String),
}

impl GameError {
    /// Shorthand for a hardware failure with context.
    pub fn hardware(message: impl Into<String>) -> Self {
        Self::Hardware(message.into())
    }

    /// Shorthand for a config failure with context.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}
