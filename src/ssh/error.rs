// ABOUTME: SSH session error types.
// ABOUTME: Covers connection, authentication, prompt timeouts, and channel lifecycle failures.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("authentication failed: credentials rejected")]
    AuthenticationFailed,

    #[error("SSH agent not available: {0}")]
    AgentUnavailable(String),

    #[error("failed to load key from {path}: {reason}")]
    KeyLoadFailed { path: PathBuf, reason: String },

    #[error("no prompt received within {0:?}")]
    Timeout(Duration),

    #[error("channel closed by remote end")]
    ChannelClosed,

    #[error("session is closed")]
    UseAfterClose,

    #[error("input buffer full ({0} bytes)")]
    BufferFull(usize),

    #[error("invalid prompt pattern: {0}")]
    InvalidPrompt(#[from] regex::Error),

    #[error("SSH protocol error: {0}")]
    Protocol(#[from] russh::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether the session that produced this error has released its channel.
    ///
    /// Errors that leave the session open (timeouts, buffer overflows) return
    /// `false`. Stale output left on the channel is discarded before the next
    /// command is sent.
    pub fn closes_session(&self) -> bool {
        matches!(
            self,
            Error::ChannelClosed | Error::UseAfterClose | Error::Protocol(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
