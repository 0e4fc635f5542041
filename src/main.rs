//! remote-juggler: MCP server for managing multiple git identities
//!
//! Speaks the Model Context Protocol over stdin/stdout. Logs go to stderr so
//! they never mix with protocol messages.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use tracing::{error, info, warn, Level};
use tracing_subscriber::EnvFilter;

use remote_juggler::config::{self, Config};
use remote_juggler::error::ConfigError;
use remote_juggler::juggler::IdentityTools;
use remote_juggler::mcp::McpServer;

/// How the process talks to its client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// MCP over stdio.
    Mcp,
}

/// MCP server exposing RemoteJuggler git identities to AI assistants.
#[derive(Parser, Debug)]
#[command(name = "remote-juggler")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server mode
    #[arg(long, value_enum, default_value_t = Mode::Mcp)]
    mode: Mode,

    /// Path to configuration file
    #[arg(short, long, value_name = "CONFIG_FILE", env = "REMOTE_JUGGLER_CONFIG")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Decrease logging verbosity (only show errors)
    #[arg(short, long)]
    quiet: bool,
}

/// Determines the log level from CLI arguments.
#[allow(clippy::match_same_arms)] // Explicit "warn" arm for clarity
fn get_log_level(verbose: u8, quiet: bool, config_level: &str) -> Level {
    if quiet {
        return Level::ERROR;
    }

    match verbose {
        0 => match config_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::WARN,
        },
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Initialises the tracing subscriber, writing to stderr.
fn init_tracing(level: Level) {
    let filter = EnvFilter::from_default_env().add_directive(level.into());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Loads the configuration.
///
/// Returns the config and, when the default file was absent, its path.
fn load(explicit: Option<&std::path::Path>) -> Result<(Config, Option<PathBuf>), ConfigError> {
    match config::load_config(explicit) {
        Ok(cfg) => Ok((cfg, None)),
        Err(ConfigError::NotFound { path }) if explicit.is_none() => {
            Ok((Config::default(), Some(path)))
        }
        Err(e) => Err(e),
    }
}

/// Entry point for the remote-juggler server.
fn main() -> ExitCode {
    let args = Args::parse();

    let (cfg, missing_default) = match load(args.config.as_deref()) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let log_level = get_log_level(args.verbose, args.quiet, &cfg.logging.level);
    init_tracing(log_level);

    if let Some(path) = missing_default {
        warn!(
            path = %path.display(),
            "No configuration file found, starting with no identities"
        );
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        mode = ?args.mode,
        identities = cfg.identities.len(),
        "Starting remote-juggler server"
    );

    let mut server = McpServer::new(IdentityTools::new(cfg));

    info!("MCP server ready, waiting for client connection...");

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, "Failed to create Tokio runtime");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(server.run()) {
        Ok(()) => {
            info!("Server shut down gracefully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Server error");
            ExitCode::FAILURE
        }
    }
}
