// ABOUTME: Interactive command session over a single shell channel.
// ABOUTME: Sends command lines and collects output up to the next prompt, with hard deadlines.

use super::channel::{Connector, ShellChannel};
use super::client::{RusshConnector, RusshShell, SessionConfig};
use super::credential::Credential;
use super::decode::Decoder;
use super::error::{Error, Result};
use super::prompt::Prompt;
use super::transcript::Transcript;
use futures::FutureExt;
use tokio::time::Instant;

/// A live interactive shell on a remote host.
///
/// The session is either open (the channel is usable) or closed (the channel
/// has been released). Every I/O operation takes `&mut self`, so at most one
/// command is in flight on the channel at a time.
pub struct Session<C: ShellChannel = RusshShell> {
    config: SessionConfig,
    channel: Option<C>,
    decoder: Decoder,
    /// Decoded text read from the channel but not yet consumed.
    pending: String,
    last_prompt: String,
    transcript: Option<Transcript>,
}

impl<C: ShellChannel> std::fmt::Debug for Session<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("host", &self.config.host)
            .field("port", &self.config.port)
            .field("user", &self.config.user)
            .field("open", &self.is_open())
            .field("last_prompt", &self.last_prompt)
            .finish()
    }
}

impl Session<RusshShell> {
    /// Connect to the remote host and start an interactive shell.
    ///
    /// The credential is consumed by authentication and dropped before this
    /// returns.
    pub async fn connect(config: SessionConfig, credential: Credential) -> Result<Self> {
        Self::connect_with(&RusshConnector, config, credential).await
    }
}

impl<C: ShellChannel> Session<C> {
    /// Connect through a custom connector.
    pub async fn connect_with<K>(connector: &K, config: SessionConfig, credential: Credential) -> Result<Self>
    where
        K: Connector<Channel = C>,
    {
        let channel = connector.open(&config, credential).await?;
        Self::from_channel(config, channel).await
    }

    /// Build a session over an already-open shell channel.
    ///
    /// When `config.wait_for_banner` is set, the login banner is read and
    /// discarded up to the first prompt. If that fails the channel is closed
    /// and no session is returned.
    pub async fn from_channel(config: SessionConfig, channel: C) -> Result<Self> {
        let transcript = match &config.transcript {
            Some(transcript) => Some(Transcript::create(transcript).await?),
            None => None,
        };

        let mut session = Self {
            config,
            channel: Some(channel),
            decoder: Decoder::new(),
            pending: String::new(),
            last_prompt: String::new(),
            transcript,
        };

        if session.config.wait_for_banner {
            let prompt = session.config.prompt.clone();
            let deadline = session.deadline();
            match session.wait_until(&prompt, deadline).await {
                Ok((banner, matched)) => {
                    tracing::debug!(banner_len = banner.len(), prompt = %matched, "shell ready");
                    session.last_prompt = matched;
                }
                Err(e) => {
                    if let Err(close_err) = session.close().await {
                        tracing::debug!("close after failed banner wait: {}", close_err);
                    }
                    return Err(e);
                }
            }
        }

        Ok(session)
    }

    pub fn host(&self) -> &str {
        &self.config.host
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn is_open(&self) -> bool {
        self.channel.is_some()
    }

    /// The prompt text that ended the most recent command.
    pub fn last_prompt(&self) -> &str {
        &self.last_prompt
    }

    /// Run a command and return its output.
    ///
    /// Output still pending from earlier commands is discarded first. The
    /// echoed command line and the trailing prompt are stripped unless
    /// `config.echo` is set, in which case the previous prompt and the echo
    /// are kept. Fails with `Timeout` when no prompt arrives within
    /// `config.timeout`.
    pub async fn cmd(&mut self, command: &str) -> Result<String> {
        self.ensure_open()?;
        self.discard_pending().await?;

        let deadline = self.deadline();
        tracing::debug!(host = %self.config.host, command, "running command");
        let line = self.terminated(command);
        self.send_until(line.as_bytes(), deadline).await?;

        let prompt = self.config.prompt.clone();
        let (before, matched) = self.wait_until(&prompt, deadline).await?;

        let output = if self.config.echo {
            let mut output = std::mem::take(&mut self.last_prompt);
            output.push_str(trim_line_end(&before));
            output
        } else {
            strip_echo(&before).to_string()
        };
        self.last_prompt = matched;
        Ok(output)
    }

    /// Write raw bytes to the shell.
    ///
    /// Fails with `Timeout` if the peer does not accept the data within
    /// `config.timeout`.
    pub async fn send(&mut self, data: &[u8]) -> Result<()> {
        let deadline = self.deadline();
        self.send_until(data, deadline).await
    }

    /// Write `text` followed by the configured line ending.
    pub async fn send_line(&mut self, text: &str) -> Result<()> {
        let line = self.terminated(text);
        self.send(line.as_bytes()).await
    }

    /// Return pending text, or wait for the next chunk from the shell.
    pub async fn read_chunk(&mut self) -> Result<String> {
        self.ensure_open()?;
        let deadline = self.deadline();
        while self.pending.is_empty() {
            self.fill(deadline).await?;
        }
        Ok(std::mem::take(&mut self.pending))
    }

    /// Read up to the next newline. The newline is consumed but not returned.
    pub async fn read_line(&mut self) -> Result<String> {
        self.ensure_open()?;
        let deadline = self.deadline();
        loop {
            if let Some(end) = self.pending.find('\n') {
                let line = self.pending[..end].to_string();
                self.pending.drain(..=end);
                return Ok(line);
            }
            self.fill(deadline).await?;
        }
    }

    /// Read until `prompt` matches at the end of the output.
    ///
    /// Returns the text before the match and the matched text. Anything after
    /// the match stays pending.
    pub async fn wait_for(&mut self, prompt: &Prompt) -> Result<(String, String)> {
        self.ensure_open()?;
        let deadline = self.deadline();
        self.wait_until(prompt, deadline).await
    }

    /// Release the channel and the underlying connection.
    ///
    /// Closing an already-closed session does nothing. Dropping a session
    /// without closing it loses no transcript data, but the connection is only
    /// torn down when the transport notices.
    pub async fn close(&mut self) -> Result<()> {
        let Some(mut channel) = self.channel.take() else {
            return Ok(());
        };
        tracing::debug!(host = %self.config.host, "closing session");
        self.pending.clear();

        let closed = channel.close().await;
        let finished = match self.transcript.take() {
            Some(transcript) => transcript.finish().await,
            None => Ok(()),
        };
        closed.and(finished)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_open() {
            Ok(())
        } else {
            Err(Error::UseAfterClose)
        }
    }

    fn deadline(&self) -> Instant {
        Instant::now() + self.config.timeout
    }

    fn terminated(&self, text: &str) -> String {
        let mut line = String::with_capacity(text.len() + self.config.line_ending.len());
        line.push_str(text);
        line.push_str(&self.config.line_ending);
        line
    }

    async fn send_until(&mut self, data: &[u8], deadline: Instant) -> Result<()> {
        let channel = self.channel.as_mut().ok_or(Error::UseAfterClose)?;
        match tokio::time::timeout_at(deadline, channel.send(data)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(self.abandon(e).await),
            Err(_) => {
                tracing::debug!(host = %self.config.host, "timed out writing to shell");
                Err(Error::Timeout(self.config.timeout))
            }
        }
    }

    async fn wait_until(&mut self, prompt: &Prompt, deadline: Instant) -> Result<(String, String)> {
        loop {
            if let Some(range) = prompt.find(&self.pending) {
                let before = self.pending[..range.start].to_string();
                let matched = self.pending[range.clone()].to_string();
                self.pending.drain(..range.end);
                return Ok((before, matched));
            }
            self.fill(deadline).await?;
        }
    }

    /// Read one chunk into the pending buffer, giving up at `deadline`.
    async fn fill(&mut self, deadline: Instant) -> Result<()> {
        let channel = self.channel.as_mut().ok_or(Error::UseAfterClose)?;
        let chunk = match tokio::time::timeout_at(deadline, channel.recv()).await {
            Ok(Ok(Some(chunk))) => chunk,
            Ok(Ok(None)) => return Err(self.abandon(Error::ChannelClosed).await),
            Ok(Err(e)) => return Err(self.abandon(e).await),
            Err(_) => {
                tracing::debug!(host = %self.config.host, "timed out waiting for output");
                return Err(Error::Timeout(self.config.timeout));
            }
        };

        let text = self.decoder.push(&chunk);
        let overflow = self.pending.len() + text.len() > self.config.max_buffer;
        if overflow {
            self.pending.clear();
        } else {
            self.pending.push_str(&text);
        }
        // Buffer first: the chunk stays readable even if recording fails.
        self.record(&chunk, &text).await?;
        if overflow {
            return Err(Error::BufferFull(self.config.max_buffer));
        }
        Ok(())
    }

    /// Drop output that is already waiting on the channel.
    async fn discard_pending(&mut self) -> Result<()> {
        self.pending.clear();
        loop {
            let channel = self.channel.as_mut().ok_or(Error::UseAfterClose)?;
            match channel.recv().now_or_never() {
                Some(Ok(Some(chunk))) => {
                    let stale = self.decoder.push(&chunk);
                    tracing::trace!(len = stale.len(), "discarded stale output");
                    self.record(&chunk, &stale).await?;
                }
                Some(Ok(None)) => return Err(self.abandon(Error::ChannelClosed).await),
                Some(Err(e)) => return Err(self.abandon(e).await),
                None => return Ok(()),
            }
        }
    }

    async fn record(&mut self, chunk: &[u8], text: &str) -> Result<()> {
        tracing::trace!(bytes = chunk.len(), "read from shell");
        match self.transcript.as_mut() {
            Some(transcript) => transcript.record(chunk, text).await,
            None => Ok(()),
        }
    }

    /// Release the channel after it failed, returning the original error.
    async fn abandon(&mut self, err: Error) -> Error {
        tracing::debug!(host = %self.config.host, "releasing channel: {}", err);
        if let Err(close_err) = self.close().await {
            tracing::debug!("close after channel failure: {}", close_err);
        }
        err
    }
}

/// Remove the echoed command line and the newline before the prompt.
fn strip_echo(before: &str) -> &str {
    match before.find('\n') {
        Some(end) => trim_line_end(&before[end + 1..]),
        None => "",
    }
}

fn trim_line_end(text: &str) -> &str {
    text.strip_suffix('\n').unwrap_or(text)
}
