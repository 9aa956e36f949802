// ABOUTME: Entry point for the sshline CLI application.
// ABOUTME: Parses arguments and dispatches to appropriate command handlers.

mod cli;

use clap::Parser;
use cli::{Cli, Commands};
use sshline::config::{self, Config, Target};
use sshline::error::{Error, Result};
use sshline::output::Output;
use sshline::ssh::{Credential, Prompt, Session, TranscriptConfig};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing subscriber based on verbose flag
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let mode = cli.output;
    if let Err(e) = run(cli, Output::new(mode)).await {
        Output::new(mode).error(&e.to_string());
        std::process::exit(1);
    }
}

async fn run(cli: Cli, mut output: Output) -> Result<()> {
    let cwd = env::current_dir()?;
    match cli.command {
        Commands::Init { force } => {
            config::init_config(&cwd, force)?;
            output.progress(&format!("Created {}", config::CONFIG_FILENAME));
            Ok(())
        }
        Commands::Targets => {
            let config = load_config(cli.config.as_deref(), &cwd)?;
            for (name, target) in &config.targets {
                let user = target.user.as_deref().unwrap_or("-");
                output.target(name, &format!("{user}@{}:{}", target.host, target.port));
            }
            Ok(())
        }
        Commands::Run {
            target,
            prompt,
            timeout,
            key,
            password_env,
            echo,
            transcript,
            commands,
        } => {
            // A missing config file is fine when the target is an address.
            let config = match load_config(cli.config.as_deref(), &cwd) {
                Ok(config) => config,
                Err(Error::ConfigNotFound(_)) if cli.config.is_none() => Config::default(),
                Err(e) => return Err(e),
            };

            let overrides = Overrides {
                prompt,
                timeout,
                key,
                password_env,
                echo,
                transcript,
            };
            let resolved = overrides.apply(config.lookup(&target)?)?;

            output.start_timer();
            run_commands(&target, resolved, &commands, &output).await
        }
    }
}

fn load_config(path: Option<&Path>, cwd: &Path) -> Result<Config> {
    match path {
        Some(path) => Config::load(path),
        None => Config::discover(cwd),
    }
}

/// Command-line settings that take precedence over the config file.
struct Overrides {
    prompt: Option<String>,
    timeout: Option<Duration>,
    key: Option<PathBuf>,
    password_env: Option<String>,
    echo: bool,
    transcript: Option<PathBuf>,
}

impl Overrides {
    fn apply(self, mut target: Target) -> Result<Target> {
        if let Some(pattern) = self.prompt {
            let prompt = Prompt::new(&pattern).map_err(Error::from)?;
            target.session = target.session.prompt(prompt);
        }
        if let Some(timeout) = self.timeout {
            target.session = target.session.timeout(timeout);
        }
        if self.echo {
            target.session = target.session.echo(true);
        }
        if let Some(path) = self.transcript {
            target.session = target.session.transcript(TranscriptConfig::new(path));
        }
        if let Some(var) = self.password_env {
            let password = env::var(&var).map_err(|_| Error::MissingEnvVar(var.clone()))?;
            target.credential = Credential::password(password);
        } else if let Some(key) = self.key {
            target.credential = Credential::key_file(key);
        }
        Ok(target)
    }
}

/// Open one session and run each command in order.
async fn run_commands(name: &str, target: Target, commands: &[String], output: &Output) -> Result<()> {
    output.progress(&format!(
        "Connecting to {}@{}:{}...",
        target.session.user, target.session.host, target.session.port
    ));
    let mut session = Session::connect(target.session, target.credential).await?;

    let mut result = Ok(());
    for command in commands {
        match session.cmd(command).await {
            Ok(text) => output.command(name, command, &text),
            Err(e) => {
                result = Err(Error::from(e));
                break;
            }
        }
    }

    if let Err(e) = session.close().await {
        tracing::warn!("failed to close session to {}: {}", name, e);
    }
    result
}
