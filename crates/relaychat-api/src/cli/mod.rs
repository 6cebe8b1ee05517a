//! CLI command definitions and dispatch for the `relaychat` binary.
//!
//! Uses clap derive macros for argument parsing. `serve` runs the relay
//! server; `chat` is the terminal client talking to a running server.

pub mod chat;
pub mod session;
pub mod title;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

/// Streaming chat relay with session persistence.
#[derive(Parser)]
#[command(name = "relaychat", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the relay server.
    Serve {
        /// Address to bind (defaults to `server.host` from config).
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (defaults to `server.port` from config).
        #[arg(long, short)]
        port: Option<u16>,

        /// Export spans to stdout via OpenTelemetry.
        #[arg(long)]
        otel: bool,
    },

    /// Chat in the terminal through a running relay server.
    Chat {
        /// Owner id of the sessions.
        #[arg(long, env = "RELAYCHAT_USER")]
        user: String,

        /// Relay server URL (defaults to `client.server_url` from config).
        #[arg(long)]
        server: Option<String>,

        /// Resume an existing session instead of starting a fresh one.
        #[arg(long)]
        session: Option<String>,
    },

    /// Manage stored sessions.
    Sessions {
        #[command(subcommand)]
        command: SessionsCommand,
    },

    /// Preview the title a first message would produce.
    Title {
        /// Text of the first user message.
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },

    /// Generate shell completions.
    Completions {
        /// Shell to generate for.
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum SessionsCommand {
    /// List a user's sessions, most recent first.
    #[command(alias = "ls")]
    List {
        /// Owner id.
        #[arg(long, env = "RELAYCHAT_USER")]
        user: String,
    },

    /// Delete a session.
    #[command(alias = "rm")]
    Delete {
        /// Session id.
        id: String,

        /// Owner id.
        #[arg(long, env = "RELAYCHAT_USER")]
        user: String,

        /// Skip the confirmation prompt.
        #[arg(long, short)]
        force: bool,
    },
}
