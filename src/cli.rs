// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines all subcommands and their arguments.

use clap::{Parser, Subcommand};
use sshline::output::OutputMode;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "sshline")]
#[command(about = "Run commands over an interactive SSH shell")]
#[command(version)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputMode::Normal, global = true)]
    pub output: OutputMode,

    /// Path to the config file (default: discover sshline.yml in the current directory)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run commands on a target, one after another in the same shell
    Run {
        /// Configured target name or [user@]host[:port]
        target: String,

        /// Prompt regular expression (overrides config)
        #[arg(short, long)]
        prompt: Option<String>,

        /// Per-command timeout, e.g. 10s or 2m
        #[arg(short, long, value_parser = humantime::parse_duration)]
        timeout: Option<Duration>,

        /// Private key file
        #[arg(short = 'i', long)]
        key: Option<PathBuf>,

        /// Environment variable holding the password
        #[arg(long)]
        password_env: Option<String>,

        /// Keep the prompt and echoed command in the output
        #[arg(long)]
        echo: bool,

        /// Append everything read from the shell to this file
        #[arg(long)]
        transcript: Option<PathBuf>,

        /// Commands to run
        #[arg(required = true, last = true)]
        commands: Vec<String>,
    },

    /// Initialize a new sshline.yml configuration file
    Init {
        /// Overwrite an existing config file
        #[arg(short, long)]
        force: bool,
    },

    /// List configured targets
    Targets,
}
