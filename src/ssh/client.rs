// ABOUTME: Connection setup using russh: configuration, host key checks, and the shell channel.
// ABOUTME: Produces an authenticated PTY shell wrapped as a ShellChannel.

use super::channel::{Connector, ShellChannel};
use super::credential::{self as auth, Credential};
use super::error::{Error, Result};
use super::prompt::Prompt;
use super::transcript::TranscriptConfig;
use async_trait::async_trait;
use bytes::Bytes;
use russh::client::{self, Config, Handle, Msg};
use russh::keys::known_hosts::{
    check_known_hosts, check_known_hosts_path, learn_known_hosts, learn_known_hosts_path,
};
use russh::keys::ssh_key;
use russh::{Channel, ChannelMsg, Disconnect};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Default maximum amount of text accumulated while waiting for a prompt.
pub const DEFAULT_MAX_BUFFER: usize = 1024 * 1024;

/// Configuration for establishing a shell session.
///
/// Holds everything except the credential, which is passed to
/// [`Session::connect`](super::Session::connect) separately and never kept.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Remote host to connect to.
    pub host: String,
    /// SSH port (default: 22).
    pub port: u16,
    /// Username for authentication.
    pub user: String,
    /// Marker the remote shell prints when ready for a command.
    pub prompt: Prompt,
    /// Upper bound on a single command or read (default: 10 seconds).
    pub timeout: Duration,
    /// Upper bound on TCP connect plus key exchange (default: 10 seconds).
    pub connect_timeout: Duration,
    /// Keep the previous prompt and echoed command in command output.
    pub echo: bool,
    /// Terminator appended to every command line.
    pub line_ending: String,
    /// Terminal type requested for the PTY.
    pub term: String,
    pub cols: u32,
    pub rows: u32,
    /// Largest amount of text buffered while waiting for a prompt.
    pub max_buffer: usize,
    /// Consume the login banner up to the first prompt while connecting.
    pub wait_for_banner: bool,
    /// Whether to accept unknown hosts (Trust On First Use).
    /// If false, connection to unknown hosts will fail.
    pub trust_on_first_use: bool,
    /// Optional path to known_hosts file.
    /// If None, uses the default ~/.ssh/known_hosts.
    pub known_hosts_path: Option<PathBuf>,
    /// Optional log of everything read from the shell.
    pub transcript: Option<TranscriptConfig>,
}

impl SessionConfig {
    pub fn new(host: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: 22,
            user: user.into(),
            prompt: Prompt::default(),
            timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(10),
            echo: false,
            line_ending: "\n".to_string(),
            term: "vt100".to_string(),
            cols: 160,
            rows: 20000,
            max_buffer: DEFAULT_MAX_BUFFER,
            wait_for_banner: true,
            trust_on_first_use: false,
            known_hosts_path: None,
            transcript: None,
        }
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn prompt(mut self, prompt: Prompt) -> Self {
        self.prompt = prompt;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    pub fn line_ending(mut self, line_ending: impl Into<String>) -> Self {
        self.line_ending = line_ending.into();
        self
    }

    pub fn terminal(mut self, term: impl Into<String>, cols: u32, rows: u32) -> Self {
        self.term = term.into();
        self.cols = cols;
        self.rows = rows;
        self
    }

    pub fn max_buffer(mut self, bytes: usize) -> Self {
        self.max_buffer = bytes;
        self
    }

    pub fn wait_for_banner(mut self, wait: bool) -> Self {
        self.wait_for_banner = wait;
        self
    }

    pub fn trust_on_first_use(mut self, tofu: bool) -> Self {
        self.trust_on_first_use = tofu;
        self
    }

    pub fn known_hosts_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.known_hosts_path = Some(path.into());
        self
    }

    pub fn transcript(mut self, transcript: TranscriptConfig) -> Self {
        self.transcript = Some(transcript);
        self
    }
}

/// SSH client handler for russh.
pub(crate) struct SshHandler {
    host: String,
    port: u16,
    trust_on_first_use: bool,
    known_hosts_path: Option<PathBuf>,
}

impl SshHandler {
    fn new(config: &SessionConfig) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
            trust_on_first_use: config.trust_on_first_use,
            known_hosts_path: config.known_hosts_path.clone(),
        }
    }

    fn is_known(&self, key: &ssh_key::PublicKey) -> std::result::Result<bool, russh::keys::Error> {
        match &self.known_hosts_path {
            Some(path) => check_known_hosts_path(&self.host, self.port, key, path),
            None => check_known_hosts(&self.host, self.port, key),
        }
    }

    fn remember(&self, key: &ssh_key::PublicKey) -> std::result::Result<(), russh::keys::Error> {
        match &self.known_hosts_path {
            Some(path) => learn_known_hosts_path(&self.host, self.port, key, path),
            None => learn_known_hosts(&self.host, self.port, key),
        }
    }
}

impl client::Handler for SshHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &ssh_key::PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        let known = match self.is_known(server_public_key) {
            Ok(known) => known,
            Err(russh::keys::Error::KeyChanged { .. }) => {
                tracing::warn!(host = %self.host, port = self.port, "host key changed, refusing");
                return Ok(false);
            }
            Err(e) => {
                tracing::debug!("known_hosts unreadable, treating host as new: {}", e);
                false
            }
        };
        if known {
            return Ok(true);
        }
        if !self.trust_on_first_use {
            tracing::warn!(host = %self.host, port = self.port, "unknown host key");
            return Ok(false);
        }

        tracing::warn!(host = %self.host, port = self.port, "recording new host key");
        if let Err(e) = self.remember(server_public_key) {
            tracing::warn!("could not update known_hosts: {}", e);
        }
        Ok(true)
    }
}

/// Connector backed by russh.
#[derive(Debug, Clone, Copy, Default)]
pub struct RusshConnector;

#[async_trait]
impl Connector for RusshConnector {
    type Channel = RusshShell;

    async fn open(&self, config: &SessionConfig, credential: Credential) -> Result<RusshShell> {
        RusshShell::open(config, credential).await
    }
}

/// Interactive PTY shell on a russh session channel.
pub struct RusshShell {
    handle: Handle<SshHandler>,
    channel: Channel<Msg>,
}

impl RusshShell {
    /// Connect, authenticate, and start a shell.
    async fn open(config: &SessionConfig, credential: Credential) -> Result<Self> {
        let method = auth::resolve(credential).await?;

        let russh_config = Config {
            inactivity_timeout: None,
            ..Default::default()
        };

        tracing::debug!(host = %config.host, port = config.port, "connecting");
        let connect = client::connect(
            Arc::new(russh_config),
            (config.host.as_str(), config.port),
            SshHandler::new(config),
        );

        let mut handle = match tokio::time::timeout(config.connect_timeout, connect).await {
            Ok(Ok(handle)) => handle,
            Ok(Err(e)) => {
                return Err(if e.to_string().contains("Connection refused") {
                    Error::Connection(format!(
                        "connection refused to {}:{}",
                        config.host, config.port
                    ))
                } else {
                    Error::Connection(e.to_string())
                });
            }
            Err(_) => {
                return Err(Error::Connection(format!(
                    "timed out connecting to {}:{} after {:?}",
                    config.host, config.port, config.connect_timeout
                )));
            }
        };

        auth::authenticate(&mut handle, &config.user, method).await?;

        let channel = handle.channel_open_session().await?;
        channel
            .request_pty(false, &config.term, config.cols, config.rows, 0, 0, &[])
            .await?;
        channel.request_shell(false).await?;
        tracing::debug!(host = %config.host, term = %config.term, "shell started");

        Ok(Self { handle, channel })
    }
}

impl std::fmt::Debug for RusshShell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RusshShell")
            .field("channel", &self.channel.id())
            .field("handle", &"<russh::Handle>")
            .finish()
    }
}

#[async_trait]
impl ShellChannel for RusshShell {
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        self.channel.data(data).await?;
        Ok(())
    }

    async fn recv(&mut self) -> Result<Option<Bytes>> {
        loop {
            match self.channel.wait().await {
                Some(ChannelMsg::Data { data }) => return Ok(Some(Bytes::copy_from_slice(&data))),
                // PTY sessions normally merge stderr, but some servers still split it.
                Some(ChannelMsg::ExtendedData { data, .. }) => {
                    return Ok(Some(Bytes::copy_from_slice(&data)));
                }
                Some(ChannelMsg::Eof) | Some(ChannelMsg::Close) | None => return Ok(None),
                Some(ChannelMsg::ExitStatus { exit_status }) => {
                    tracing::debug!(exit_status, "remote shell exited");
                }
                Some(_) => {}
            }
        }
    }

    async fn close(&mut self) -> Result<()> {
        if let Err(e) = self.channel.close().await {
            // Already closed by the remote end; the disconnect below still applies.
            tracing::debug!("channel close failed: {}", e);
        }
        self.handle
            .disconnect(Disconnect::ByApplication, "", "en")
            .await?;
        Ok(())
    }
}
