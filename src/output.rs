// ABOUTME: Output formatting for CLI feedback.
// ABOUTME: Supports normal, quiet (scripts), and JSON output modes.

use clap::ValueEnum;
use serde::Serialize;
use std::time::Instant;

/// Output mode for CLI feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputMode {
    /// Human-friendly output with progress messages
    #[default]
    Normal,
    /// Command output only
    Quiet,
    /// JSON lines for scripting
    Json,
}

/// Handles CLI output based on the configured mode.
pub struct Output {
    mode: OutputMode,
    start_time: Option<Instant>,
}

impl Output {
    pub fn new(mode: OutputMode) -> Self {
        Self {
            mode,
            start_time: None,
        }
    }

    /// Start timing an operation.
    pub fn start_timer(&mut self) {
        self.start_time = Some(Instant::now());
    }

    /// Get elapsed time since timer started.
    pub fn elapsed_secs(&self) -> f64 {
        self.start_time
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }

    /// Print a progress message (suppressed in quiet/json mode).
    pub fn progress(&self, message: &str) {
        if self.mode == OutputMode::Normal {
            println!("{message}");
        }
    }

    /// Print the output of one remote command.
    pub fn command(&self, target: &str, command: &str, output: &str) {
        match self.mode {
            OutputMode::Normal => {
                println!("{target}> {command}");
                if !output.is_empty() {
                    println!("{output}");
                }
            }
            OutputMode::Quiet => {
                if !output.is_empty() {
                    println!("{output}");
                }
            }
            OutputMode::Json => {
                let event = JsonEvent {
                    event: "command",
                    target: Some(target),
                    command: Some(command),
                    message: output,
                    duration_secs: self.duration(),
                };
                if let Ok(json) = serde_json::to_string(&event) {
                    println!("{json}");
                }
            }
        }
    }

    /// Print one configured target and its address.
    pub fn target(&self, name: &str, address: &str) {
        match self.mode {
            OutputMode::Normal => println!("{name}\t{address}"),
            OutputMode::Quiet => println!("{name}"),
            OutputMode::Json => {
                let event = JsonEvent {
                    event: "target",
                    target: Some(name),
                    command: None,
                    message: address,
                    duration_secs: None,
                };
                if let Ok(json) = serde_json::to_string(&event) {
                    println!("{json}");
                }
            }
        }
    }

    /// Print an error message.
    pub fn error(&self, message: &str) {
        match self.mode {
            OutputMode::Normal | OutputMode::Quiet => {
                eprintln!("Error: {message}");
            }
            OutputMode::Json => {
                let event = JsonEvent {
                    event: "error",
                    target: None,
                    command: None,
                    message,
                    duration_secs: self.duration(),
                };
                if let Ok(json) = serde_json::to_string(&event) {
                    eprintln!("{json}");
                }
            }
        }
    }

    fn duration(&self) -> Option<f64> {
        self.start_time.map(|_| self.elapsed_secs())
    }
}

#[derive(Serialize)]
struct JsonEvent<'a> {
    event: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    target: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    command: Option<&'a str>,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration_secs: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_event_omits_missing_fields() {
        let event = JsonEvent {
            event: "error",
            target: None,
            command: None,
            message: "boom",
            duration_secs: None,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(json, r#"{"event":"error","message":"boom"}"#);
    }

    #[test]
    fn elapsed_is_zero_without_timer() {
        let output = Output::new(OutputMode::Json);
        assert_eq!(output.elapsed_secs(), 0.0);
        assert_eq!(output.duration(), None);
    }
}
