//! CLI entry point for Spectra.

pub mod auth;

use chrono::Local;
use clap::{Parser, Subcommand};

use crate::types::LogEntry;

/// Token store profile used by the CLI.
pub const PROFILE: &str = "default";

/// Spectra CLI
#[derive(Parser, Debug)]
#[command(name = "spectra", version, about = "Spectra CLI for agent-driven browser sessions")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Authentication management
    Auth(AuthArgs),
    /// Start or end the browser session
    Session(SessionArgs),
    /// Send a message to the agent and stream its activity
    Chat(ChatArgs),
}

/// Arguments for the `auth` subcommand group.
#[derive(Parser, Debug)]
pub struct AuthArgs {
    #[command(subcommand)]
    pub command: AuthCommands,
}

/// Auth subcommands for login, status, and logout.
#[derive(Subcommand, Debug)]
pub enum AuthCommands {
    /// Save an ID token for later commands
    Login(LoginArgs),
    /// Show who is signed in
    Status,
    /// Forget the saved token
    Logout,
}

/// Arguments for `spectra auth login`.
#[derive(Parser, Debug)]
pub struct LoginArgs {
    /// ID token issued by the identity provider
    pub token: String,
}

/// Arguments for the `session` subcommand group.
#[derive(Parser, Debug)]
pub struct SessionArgs {
    #[command(subcommand)]
    pub command: SessionCommands,
}

#[derive(Subcommand, Debug)]
pub enum SessionCommands {
    /// Start (or reuse) the browser session and wait until it is usable
    Start(StartArgs),
    /// End the browser session
    End,
}

/// Arguments for `spectra session start`.
#[derive(Parser, Debug)]
pub struct StartArgs {
    /// Record the session
    #[arg(long)]
    pub record: bool,
}

/// Arguments for the `chat` subcommand.
#[derive(Parser, Debug)]
pub struct ChatArgs {
    /// Session id returned by `spectra session start`
    #[arg(short, long)]
    pub session: String,

    /// User prompt (positional)
    pub prompt: String,
}

impl Cli {
    /// Parse CLI arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

/// One transcript line: `[HH:MM:SS] source: message`, in local time.
pub fn render_entry(entry: &LogEntry) -> String {
    format!(
        "[{}] {}: {}",
        entry.timestamp.with_timezone(&Local).format("%H:%M:%S"),
        entry.source,
        entry.message
    )
}
