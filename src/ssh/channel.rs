// ABOUTME: Byte-stream abstraction over an interactive shell channel.
// ABOUTME: Lets Session drive a russh channel in production and a scripted channel in tests.

use super::client::SessionConfig;
use super::credential::Credential;
use super::error::Result;
use async_trait::async_trait;
use bytes::Bytes;

/// A duplex, ordered byte stream carrying one interactive shell.
///
/// `recv` must be cancel-safe: [`Session`](super::Session) races it against
/// deadlines and drops the future when the deadline wins.
#[async_trait]
pub trait ShellChannel: Send {
    /// Write bytes to the remote shell.
    async fn send(&mut self, data: &[u8]) -> Result<()>;

    /// Wait for the next chunk of output.
    ///
    /// Returns `Ok(None)` once the remote end has closed the channel.
    async fn recv(&mut self) -> Result<Option<Bytes>>;

    /// Release the channel and its underlying connection.
    async fn close(&mut self) -> Result<()>;
}

/// Establishes an authenticated transport and opens a shell on it.
#[async_trait]
pub trait Connector: Send + Sync {
    type Channel: ShellChannel;

    /// Connect to `config.host`, authenticate with `credential`, and start a shell.
    ///
    /// Fails with `Connection` when the host cannot be reached and
    /// `AuthenticationFailed` when the credential is rejected.
    async fn open(&self, config: &SessionConfig, credential: Credential) -> Result<Self::Channel>;
}
