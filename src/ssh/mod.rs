// ABOUTME: Interactive SSH shell sessions for line-based command execution.
// ABOUTME: Connection and authentication via russh; prompt detection and output capture on top.

mod channel;
mod client;
mod credential;
mod decode;
mod error;
mod prompt;
mod session;
mod transcript;

pub use channel::{Connector, ShellChannel};
pub use client::{DEFAULT_MAX_BUFFER, RusshConnector, RusshShell, SessionConfig};
pub use credential::Credential;
pub use decode::{Decoder, clean};
pub use error::{Error, Result};
pub use prompt::{DEFAULT_PROMPT, Prompt};
pub use session::Session;
pub use transcript::{TranscriptConfig, TranscriptMode};
