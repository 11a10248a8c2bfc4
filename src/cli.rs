//! CLI definitions for browser-relay.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// browser-relay CLI.
#[derive(Parser)]
#[command(name = "browser-relay")]
#[command(about = "Local relay between AI coding assistants and a live browser session")]
#[command(version)]
pub(crate) struct Cli {
    /// Configuration file path (defaults to ~/.browser-relay/config.toml when present)
    #[arg(short, long, env = "BROWSER_RELAY_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Run the relay server in foreground (default)
    Serve {
        /// Listen address, overriding the configured one
        #[arg(long)]
        host: Option<String>,

        /// First port to try, overriding the configured one
        #[arg(long)]
        port: Option<u16>,
    },

    /// Serve MCP tools on stdin/stdout
    Mcp,
}

impl Cli {
    /// Whether stdout carries protocol traffic and must stay free of logs.
    pub fn uses_stdio(&self) -> bool {
        matches!(self.command, Some(Commands::Mcp))
    }
}
