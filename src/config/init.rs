// ABOUTME: Config scaffolding for new inventories.
// ABOUTME: Creates sshline.yml template files.

use std::path::Path;

use crate::error::{Error, Result};
use crate::ssh::DEFAULT_PROMPT;

use super::{CONFIG_FILENAME, Config, Secret};

pub fn init_config(dir: &Path, force: bool) -> Result<()> {
    let config_path = dir.join(CONFIG_FILENAME);

    if config_path.exists() && !force {
        return Err(Error::AlreadyExists(config_path));
    }

    let yaml = generate_template_yaml(&Config::template());
    std::fs::write(&config_path, yaml)?;

    Ok(())
}

fn generate_template_yaml(config: &Config) -> String {
    let mut yaml = format!(
        r#"defaults:
  timeout: {}
  connect_timeout: {}
  prompt: '{}'

targets:
"#,
        humantime::format_duration(config.defaults.timeout),
        humantime::format_duration(config.defaults.connect_timeout),
        DEFAULT_PROMPT,
    );

    for (name, target) in &config.targets {
        yaml.push_str(&format!(
            r#"  {}:
    host: {}
    port: {}
    user: {}
"#,
            name,
            target.host,
            target.port,
            target.user.as_deref().unwrap_or("admin"),
        ));
        if let Some(Secret::Env { var, .. }) = &target.password {
            yaml.push_str(&format!("    password: {{ env: {} }}\n", var));
        }
        yaml.push_str(
            r#"    # SSH host key verification (default: true, Trust-On-First-Use)
    # Set to false to require the host in ~/.ssh/known_hosts
    # trust_first_connection: false
"#,
        );
    }

    yaml
}
