// ABOUTME: Configuration types and parsing for sshline.yml.
// ABOUTME: Handles YAML parsing, target lookup, and resolution into session settings.

mod init;
mod secret;
mod target;

pub use init::init_config;
pub use secret::Secret;
pub use target::TargetConfig;

use crate::error::{Error, Result};
use crate::ssh::{Credential, Prompt, SessionConfig};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

pub const CONFIG_FILENAME: &str = "sshline.yml";
pub const CONFIG_FILENAME_ALT: &str = "sshline.yaml";
pub const CONFIG_FILENAME_DIR: &str = ".sshline/config.yml";

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub defaults: Defaults,

    #[serde(default, deserialize_with = "deserialize_targets")]
    pub targets: BTreeMap<String, TargetConfig>,
}

/// Settings applied to every target that does not override them.
#[derive(Debug, Clone, Deserialize)]
pub struct Defaults {
    #[serde(default)]
    pub user: Option<String>,

    #[serde(default)]
    pub prompt: Option<String>,

    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,

    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub connect_timeout: Duration,

    #[serde(default)]
    pub term: Option<String>,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            user: None,
            prompt: None,
            timeout: default_timeout(),
            connect_timeout: default_timeout(),
            term: None,
        }
    }
}

fn default_timeout() -> Duration {
    Duration::from_secs(10)
}

/// A target resolved into everything needed to open a session.
#[derive(Debug)]
pub struct Target {
    pub session: SessionConfig,
    pub credential: Credential,
}

impl Config {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(Error::from)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn discover(dir: &Path) -> Result<Self> {
        let candidates = [
            dir.join(CONFIG_FILENAME),
            dir.join(CONFIG_FILENAME_ALT),
            dir.join(CONFIG_FILENAME_DIR),
        ];

        for path in &candidates {
            if path.exists() {
                return Self::load(path);
            }
        }

        Err(Error::ConfigNotFound(dir.to_path_buf()))
    }

    /// Resolve a configured target by name.
    pub fn target(&self, name: &str) -> Result<Target> {
        let target = self
            .targets
            .get(name)
            .ok_or_else(|| Error::UnknownTarget(name.to_string()))?;
        self.resolve(target)
    }

    /// Resolve a configured target name, or parse `name` as `[user@]host[:port]`.
    pub fn lookup(&self, name: &str) -> Result<Target> {
        if self.targets.contains_key(name) {
            return self.target(name);
        }
        let target = TargetConfig::parse(name).map_err(Error::InvalidConfig)?;
        self.resolve(&target)
    }

    /// Merge `target` with the defaults and resolve secrets.
    pub fn resolve(&self, target: &TargetConfig) -> Result<Target> {
        let user = target
            .user
            .clone()
            .or_else(|| self.defaults.user.clone())
            .unwrap_or_else(|| std::env::var("USER").unwrap_or_else(|_| "root".to_string()));

        let mut session = SessionConfig::new(&target.host, user)
            .port(target.port)
            .timeout(target.timeout.unwrap_or(self.defaults.timeout))
            .connect_timeout(self.defaults.connect_timeout)
            .echo(target.echo)
            .trust_on_first_use(target.trust_first_connection);

        if let Some(pattern) = target.prompt.as_ref().or(self.defaults.prompt.as_ref()) {
            let prompt = Prompt::new(pattern)
                .map_err(|e| Error::InvalidConfig(format!("prompt for {}: {}", target.host, e)))?;
            session = session.prompt(prompt);
        }

        if let Some(term) = &self.defaults.term {
            let (cols, rows) = (session.cols, session.rows);
            session = session.terminal(term.clone(), cols, rows);
        }

        let credential = match (&target.password, &target.key) {
            (Some(password), _) => Credential::password(password.reveal()?),
            (None, Some(key)) => match &target.passphrase {
                Some(passphrase) => Credential::key_file_with_passphrase(key, passphrase.reveal()?),
                None => Credential::key_file(key),
            },
            (None, None) => Credential::Auto,
        };

        Ok(Target {
            session,
            credential,
        })
    }

    pub fn template() -> Self {
        let mut target = TargetConfig::new("router.example.com");
        target.user = Some("admin".to_string());
        target.password = Some(Secret::Env {
            var: "ROUTER_PASSWORD".to_string(),
            default: None,
        });

        let mut targets = BTreeMap::new();
        targets.insert("router".to_string(), target);

        Config {
            defaults: Defaults::default(),
            targets,
        }
    }
}

// Custom deserializers

fn deserialize_targets<'de, D>(
    deserializer: D,
) -> std::result::Result<BTreeMap<String, TargetConfig>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let entries: BTreeMap<String, TargetEntry> = BTreeMap::deserialize(deserializer)?;
    entries
        .into_iter()
        .map(|(name, entry)| {
            entry
                .into_target_config()
                .map(|target| (name.clone(), target))
                .map_err(|e| serde::de::Error::custom(format!("target {}: {}", name, e)))
        })
        .collect()
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TargetEntry {
    Simple(String),
    Detailed(TargetConfig),
}

impl TargetEntry {
    fn into_target_config(self) -> std::result::Result<TargetConfig, String> {
        match self {
            TargetEntry::Simple(s) => TargetConfig::parse(&s),
            TargetEntry::Detailed(c) => Ok(c),
        }
    }
}
