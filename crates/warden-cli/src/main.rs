//! Warden CLI - gate requests and inspect the audit trail from a terminal
//!
//! This CLI lets operators:
//! - Run a request through the full gating pipeline
//! - Export and verify the hash-chained audit logs
//! - Validate and render configuration files
//! - Generate device keys and sign attestations for testing

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod output;

use commands::{audit, check, config, device};

/// Warden CLI application
#[derive(Parser)]
#[command(name = "warden")]
#[command(about = "Warden - safety and authentication gating pipeline", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path (TOML)
    #[arg(short, long, env = "WARDEN_CONFIG")]
    config: Option<PathBuf>,

    /// Directory holding audit logs and session tokens
    #[arg(short, long, env = "WARDEN_DATA_DIR", default_value = ".warden")]
    data_dir: PathBuf,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one request through authentication, screening and restraint
    Check(check::CheckArgs),

    /// Inspect audit logs
    Audit {
        #[command(subcommand)]
        command: audit::AuditCommands,
    },

    /// Validate or render configuration
    Config {
        #[command(subcommand)]
        command: config::ConfigCommands,
    },

    /// Device key helpers
    Device {
        #[command(subcommand)]
        command: device::DeviceCommands,
    },
}

/// Paths and config shared by every command.
pub struct Workspace {
    pub config_path: Option<PathBuf>,
    pub data_dir: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_json);

    let workspace = Workspace {
        config_path: cli.config,
        data_dir: cli.data_dir,
    };

    match cli.command {
        Commands::Check(args) => check::execute(args, &workspace).await,
        Commands::Audit { command } => audit::execute(command, &workspace).await,
        Commands::Config { command } => config::execute(command, &workspace),
        Commands::Device { command } => device::execute(command),
    }
}

fn init_tracing(verbose: bool, json: bool) {
    let filter = if verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| filter.into());

    // stdout carries command output; logs go to stderr
    let (plain, json) = if json {
        (
            None,
            Some(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            ),
        )
    } else {
        (
            Some(
                tracing_subscriber::fmt::layer()
                    .without_time()
                    .with_writer(std::io::stderr),
            ),
            None,
        )
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(plain)
        .with(json)
        .init();
}
