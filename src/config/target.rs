// ABOUTME: Per-target connection settings.
// ABOUTME: Parses short forms like "host", "user@host", "host:port", "user@host:port".

use super::secret::Secret;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct TargetConfig {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub password: Option<Secret>,
    #[serde(default)]
    pub key: Option<PathBuf>,
    #[serde(default)]
    pub passphrase: Option<Secret>,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default, with = "humantime_serde")]
    pub timeout: Option<Duration>,
    #[serde(default)]
    pub echo: bool,
    #[serde(default = "default_trust_first_connection")]
    pub trust_first_connection: bool,
}

fn default_port() -> u16 {
    22
}

fn default_trust_first_connection() -> bool {
    true
}

impl TargetConfig {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: default_port(),
            user: None,
            password: None,
            key: None,
            passphrase: None,
            prompt: None,
            timeout: None,
            echo: false,
            trust_first_connection: default_trust_first_connection(),
        }
    }

    pub fn parse(s: &str) -> Result<Self, String> {
        let s = s.trim();
        if s.is_empty() {
            return Err("target address cannot be empty".to_string());
        }

        // Parse format: [user@]host[:port]
        let (user_part, rest) = if let Some(at_pos) = s.find('@') {
            (Some(&s[..at_pos]), &s[at_pos + 1..])
        } else {
            (None, s)
        };

        if user_part.is_some_and(str::is_empty) {
            return Err("username cannot be empty".to_string());
        }

        let (host, port) = if let Some(colon_pos) = rest.rfind(':') {
            let port_str = &rest[colon_pos + 1..];
            let port = port_str
                .parse::<u16>()
                .map_err(|_| format!("invalid port: {}", port_str))?;
            (&rest[..colon_pos], port)
        } else {
            (rest, default_port())
        };

        if host.is_empty() {
            return Err("hostname cannot be empty".to_string());
        }

        let mut target = TargetConfig::new(host);
        target.port = port;
        target.user = user_part.map(|s| s.to_string());
        Ok(target)
    }
}
