// ABOUTME: Library root for sshline - exposes the session API and configuration.
// ABOUTME: The command-line binary is in main.rs.

pub mod config;
pub mod error;
pub mod output;
pub mod ssh;
