// ABOUTME: Credentials for authenticating a session and the logic that spends them.
// ABOUTME: Secret material is zeroized on drop and never stored on the Session.

use super::client::SshHandler;
use super::error::{Error, Result};
use russh::client::Handle;
use russh::keys::agent::client::AgentClient;
use russh::keys::{PrivateKeyWithHashAlg, load_secret_key, ssh_key};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::net::UnixStream;
use zeroize::Zeroizing;

/// How to prove identity to the remote host.
///
/// A credential is consumed by [`Session::connect`](super::Session::connect)
/// and dropped as soon as authentication finishes.
#[derive(Clone)]
pub enum Credential {
    Password(Zeroizing<String>),
    KeyFile {
        path: PathBuf,
        passphrase: Option<Zeroizing<String>>,
    },
    /// Every identity offered by the running SSH agent.
    Agent,
    /// SSH agent when available, otherwise the first default key in `~/.ssh`.
    Auto,
}

impl Credential {
    pub fn password(password: impl Into<String>) -> Self {
        Self::Password(Zeroizing::new(password.into()))
    }

    pub fn key_file(path: impl Into<PathBuf>) -> Self {
        Self::KeyFile {
            path: path.into(),
            passphrase: None,
        }
    }

    pub fn key_file_with_passphrase(path: impl Into<PathBuf>, passphrase: impl Into<String>) -> Self {
        Self::KeyFile {
            path: path.into(),
            passphrase: Some(Zeroizing::new(passphrase.into())),
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credential::Password(_) => f.write_str("Password(<redacted>)"),
            Credential::KeyFile { path, .. } => {
                f.debug_struct("KeyFile").field("path", path).finish_non_exhaustive()
            }
            Credential::Agent => f.write_str("Agent"),
            Credential::Auto => f.write_str("Auto"),
        }
    }
}

/// Authentication method resolved from a credential.
pub(crate) enum AuthMethod {
    Password(Zeroizing<String>),
    Agent(AgentClient<UnixStream>),
    KeyFile(Arc<ssh_key::PrivateKey>),
}

/// Authenticate `handle` as `user`, consuming the resolved method.
pub(crate) async fn authenticate(
    handle: &mut Handle<SshHandler>,
    user: &str,
    method: AuthMethod,
) -> Result<()> {
    let accepted = match method {
        AuthMethod::Password(password) => handle
            .authenticate_password(user, password.as_str())
            .await?
            .success(),
        AuthMethod::Agent(mut agent) => {
            let keys = agent.request_identities().await.map_err(|e| {
                Error::AgentUnavailable(format!("failed to list agent keys: {}", e))
            })?;

            if keys.is_empty() {
                return Err(Error::AgentUnavailable("no keys in SSH agent".to_string()));
            }

            let mut accepted = false;
            for key in &keys {
                match handle
                    .authenticate_publickey_with(user, key.clone(), None, &mut agent)
                    .await
                {
                    Ok(result) if result.success() => {
                        accepted = true;
                        break;
                    }
                    _ => continue,
                }
            }
            accepted
        }
        AuthMethod::KeyFile(key) => {
            let hash_alg = handle.best_supported_rsa_hash().await?.flatten();
            handle
                .authenticate_publickey(user, PrivateKeyWithHashAlg::new(key, hash_alg))
                .await?
                .success()
        }
    };

    if accepted {
        tracing::debug!(user, "authenticated");
        Ok(())
    } else {
        Err(Error::AuthenticationFailed)
    }
}

/// Key files tried, in order, for [`Credential::Auto`].
const DEFAULT_KEYS: [&str; 3] = ["id_ed25519", "id_rsa", "id_ecdsa"];

/// Load key material or reach the agent before any connection is made.
pub(crate) async fn resolve(credential: Credential) -> Result<AuthMethod> {
    match credential {
        Credential::Password(password) => Ok(AuthMethod::Password(password)),
        Credential::KeyFile { path, passphrase } => {
            load_key(&path, passphrase.as_ref().map(|p| p.as_str())).map(AuthMethod::KeyFile)
        }
        Credential::Agent => AgentClient::connect_env()
            .await
            .map(AuthMethod::Agent)
            .map_err(|e| Error::AgentUnavailable(e.to_string())),
        Credential::Auto => {
            match AgentClient::connect_env().await {
                Ok(agent) => return Ok(AuthMethod::Agent(agent)),
                Err(e) => tracing::debug!("no SSH agent, trying default keys: {}", e),
            }
            let ssh_dir = std::env::var_os("HOME")
                .map(|home| PathBuf::from(home).join(".ssh"))
                .ok_or_else(|| Error::AgentUnavailable("no agent and HOME is not set".to_string()))?;
            DEFAULT_KEYS
                .iter()
                .find_map(|name| load_key(&ssh_dir.join(name), None).ok())
                .map(AuthMethod::KeyFile)
                .ok_or_else(|| {
                    Error::AgentUnavailable(format!(
                        "no agent and no usable key in {}",
                        ssh_dir.display()
                    ))
                })
        }
    }
}

fn load_key(path: &Path, passphrase: Option<&str>) -> Result<Arc<ssh_key::PrivateKey>> {
    load_secret_key(path, passphrase)
        .map(Arc::new)
        .map_err(|e| Error::KeyLoadFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
}
