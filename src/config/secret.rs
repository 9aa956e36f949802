// ABOUTME: Target secrets given either inline or by naming an environment variable.
// ABOUTME: Keeps passwords and passphrases out of committed config files.

use crate::error::{Error, Result};
use serde::Deserialize;

/// A password or passphrase from the config file.
///
/// ```yaml
/// password: hunter2
/// password: { env: ROUTER_PASSWORD }
/// password: { env: ROUTER_PASSWORD, default: changeme }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Secret {
    Inline(String),
    Env {
        #[serde(rename = "env")]
        var: String,
        #[serde(default)]
        default: Option<String>,
    },
}

impl Secret {
    /// Read the secret, consulting the environment at call time.
    pub fn reveal(&self) -> Result<String> {
        match self {
            Secret::Inline(value) => Ok(value.clone()),
            Secret::Env { var, default } => std::env::var(var)
                .ok()
                .or_else(|| default.clone())
                .ok_or_else(|| Error::MissingEnvVar(var.clone())),
        }
    }
}
