//! browser-relay: relay server and MCP tool adapter.

mod cli;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use relay_config::{ConfigLoader, ConfigValidator, EnvOverrides, RelayConfig};
use relay_mcp::{McpServer, RelayAdapter, default_registry};
use relay_server::RelayServer;

use cli::{Cli, Commands};

/// Get the ~/.browser-relay directory path.
fn relay_dir() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(".browser-relay"))
        .unwrap_or_else(|| PathBuf::from(".browser-relay"))
}

/// Initialize tracing with console and file output.
///
/// Log files are written to ~/.browser-relay/logs/ with daily rotation. In
/// MCP mode the console layer writes to stderr since stdout is the protocol
/// stream.
fn init_tracing(stdio_mode: bool) -> Result<(), Box<dyn std::error::Error>> {
    let log_dir = relay_dir().join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(if stdio_mode { "mcp" } else { "relay" })
        .filename_suffix("log")
        .max_log_files(30)
        .build(&log_dir)?;
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // Flushes the file writer on exit.
    static GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
        std::sync::OnceLock::new();
    let _ = GUARD.set(guard);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let console = if stdio_mode {
        BoxMakeWriter::new(std::io::stderr)
    } else {
        BoxMakeWriter::new(std::io::stdout)
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(console)
                .with_target(true)
                .with_ansi(!stdio_mode),
        )
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    Ok(())
}

/// Load the config file (if any), apply environment overrides and validate.
fn load_config(path: Option<PathBuf>) -> Result<RelayConfig, Box<dyn std::error::Error>> {
    let path = path.or_else(ConfigLoader::default_path);
    let mut config = ConfigLoader::load_or_default(path.as_deref())?;
    EnvOverrides::apply(&mut config)?;

    let validation = ConfigValidator::validate(&config);
    for warning in &validation.warnings {
        warn!("Config warning at {}: {}", warning.path, warning.message);
    }
    if !validation.is_valid() {
        for err in &validation.errors {
            error!("Config error at {}: {}", err.path, err.message);
        }
        return Err(format!("invalid configuration ({} errors)", validation.errors.len()).into());
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.uses_stdio())?;

    let config = load_config(cli.config)?;

    match cli.command {
        None => run_server(config, None, None).await,
        Some(Commands::Serve { host, port }) => run_server(config, host, port).await,
        Some(Commands::Mcp) => run_mcp(config).await,
    }
}

/// Run the relay server in foreground.
async fn run_server(
    mut config: RelayConfig,
    host: Option<String>,
    port: Option<u16>,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    info!("Starting browser-relay v{}", env!("CARGO_PKG_VERSION"));
    RelayServer::new(config).run().await?;
    Ok(())
}

/// Serve MCP tools over stdio, forwarding browser calls to the relay.
async fn run_mcp(config: RelayConfig) -> Result<(), Box<dyn std::error::Error>> {
    let adapter = Arc::new(RelayAdapter::new(&config));
    if adapter.discover().await {
        let endpoint = adapter.endpoint();
        info!("Browser relay found at {}:{}", endpoint.host, endpoint.port);
    } else {
        warn!("No browser relay found yet; tools will retry discovery on each call");
    }

    let registry = default_registry(adapter, &config.api);
    McpServer::new(registry).serve_stdio().await?;
    Ok(())
}
