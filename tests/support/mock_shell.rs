// ABOUTME: Scripted in-memory shell channel for session tests.
// ABOUTME: Replies to each command line via a responder function, like a remote PTY would.

use async_trait::async_trait;
use bytes::Bytes;
use sshline::ssh::{Connector, Credential, Error, Result, SessionConfig, ShellChannel};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};

/// Something the fake remote end does.
#[derive(Debug, Clone)]
pub enum Event {
    Data(Bytes),
    HangUp,
}

impl Event {
    pub fn text(text: &str) -> Self {
        Event::Data(Bytes::copy_from_slice(text.as_bytes()))
    }
}

pub type Responder = Arc<dyn Fn(&str) -> Vec<Event> + Send + Sync>;

#[derive(Debug, Default)]
struct Probe {
    sent: Vec<String>,
    close_calls: usize,
    stalled: bool,
}

/// Test-side view of a mock shell: inspect traffic and inject output.
#[derive(Clone)]
pub struct ShellHandle {
    tx: UnboundedSender<Event>,
    probe: Arc<Mutex<Probe>>,
}

impl ShellHandle {
    /// Queue output as if the remote shell printed it.
    pub fn push(&self, text: &str) {
        self.tx.send(Event::text(text)).unwrap();
    }

    /// Stop accepting writes, like a peer whose receive window never reopens.
    pub fn stall_writes(&self) {
        self.probe.lock().unwrap().stalled = true;
    }

    pub fn hang_up(&self) {
        self.tx.send(Event::HangUp).unwrap();
    }

    /// Command lines written to the shell, without line endings.
    pub fn sent(&self) -> Vec<String> {
        self.probe.lock().unwrap().sent.clone()
    }

    pub fn close_calls(&self) -> usize {
        self.probe.lock().unwrap().close_calls
    }
}

pub struct MockShell {
    tx: UnboundedSender<Event>,
    rx: UnboundedReceiver<Event>,
    responder: Responder,
    line: String,
    hung_up: bool,
    probe: Arc<Mutex<Probe>>,
}

impl MockShell {
    /// Create a shell that prints `banner` on connect and answers with `responder`.
    pub fn new(banner: &str, responder: Responder) -> (Self, ShellHandle) {
        let (tx, rx) = unbounded_channel();
        let probe = Arc::new(Mutex::new(Probe::default()));
        if !banner.is_empty() {
            tx.send(Event::text(banner)).unwrap();
        }
        let handle = ShellHandle {
            tx: tx.clone(),
            probe: Arc::clone(&probe),
        };
        let shell = Self {
            tx,
            rx,
            responder,
            line: String::new(),
            hung_up: false,
            probe,
        };
        (shell, handle)
    }
}

#[async_trait]
impl ShellChannel for MockShell {
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        if self.hung_up {
            return Err(Error::ChannelClosed);
        }
        let stalled = self.probe.lock().unwrap().stalled;
        if stalled {
            std::future::pending::<()>().await;
        }
        self.line.push_str(&String::from_utf8_lossy(data));
        while let Some(end) = self.line.find('\n') {
            let command = self.line[..end].trim_end_matches('\r').to_string();
            self.line.drain(..=end);
            self.probe.lock().unwrap().sent.push(command.clone());
            for event in (self.responder)(&command) {
                self.tx.send(event).map_err(|_| Error::ChannelClosed)?;
            }
        }
        Ok(())
    }

    async fn recv(&mut self) -> Result<Option<Bytes>> {
        if self.hung_up {
            return Ok(None);
        }
        match self.rx.recv().await {
            Some(Event::Data(data)) => Ok(Some(data)),
            Some(Event::HangUp) | None => {
                self.hung_up = true;
                Ok(None)
            }
        }
    }

    async fn close(&mut self) -> Result<()> {
        self.probe.lock().unwrap().close_calls += 1;
        self.hung_up = true;
        Ok(())
    }
}

/// Connector that accepts exactly one password on one host.
pub struct MockConnector {
    host: String,
    password: String,
    banner: String,
    responder: Responder,
    handles: Mutex<Vec<ShellHandle>>,
}

impl MockConnector {
    pub fn new(host: &str, password: &str, banner: &str, responder: Responder) -> Self {
        Self {
            host: host.to_string(),
            password: password.to_string(),
            banner: banner.to_string(),
            responder,
            handles: Mutex::new(Vec::new()),
        }
    }

    /// Handle of the most recently opened shell.
    pub fn last_handle(&self) -> Option<ShellHandle> {
        self.handles.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl Connector for MockConnector {
    type Channel = MockShell;

    async fn open(&self, config: &SessionConfig, credential: Credential) -> Result<MockShell> {
        if config.host != self.host {
            return Err(Error::Connection(format!(
                "connection refused to {}:{}",
                config.host, config.port
            )));
        }
        match credential {
            Credential::Password(password) if password.as_str() == self.password => {
                let (shell, handle) = MockShell::new(&self.banner, Arc::clone(&self.responder));
                self.handles.lock().unwrap().push(handle);
                Ok(shell)
            }
            _ => Err(Error::AuthenticationFailed),
        }
    }
}

/// A network device CLI with a `router#` prompt.
pub fn router() -> Responder {
    Arc::new(|command: &str| match command {
        "show version" => vec![Event::text("show version\r\nOS 1.0\r\nrouter#")],
        "show interfaces" => vec![
            Event::text("show interfaces\r\n"),
            Event::text("\x1b[1mGi0/1\x1b[0m  up\r\nGi0/2  do"),
            Event::text("wn\r\nrou"),
            Event::text("ter#"),
        ],
        "terminal length 0" => vec![Event::text("terminal length 0\r\nrouter#")],
        "reload" => vec![Event::text("reload\r\nProceed? "), Event::HangUp],
        "flood" => vec![Event::text(&"x".repeat(4096))],
        "slow" => vec![],
        other => vec![Event::text(&format!(
            "{other}\r\n% Invalid input detected\r\nrouter#"
        ))],
    })
}
