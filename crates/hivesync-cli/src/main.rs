//! Hivesync CLI - plan and run hive-aware rewrites.

use anyhow::Result;
use clap::{Parser, Subcommand};
use hivesync_core::config::LogFormat;
use hivesync_core::{Config, IcebergError};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Exit codes for CLI operations.
///
/// Following Unix conventions:
/// - 0: Success
/// - 1-127: Application errors
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    /// Successful execution
    Success = 0,
    /// Configuration error (invalid config file, missing required fields)
    ConfigError = 1,
    /// Rewrite conflicted with a concurrent commit
    ConflictError = 2,
    /// Iceberg commit error other than a conflict
    IcebergError = 3,
    /// Rewrite lifecycle misuse
    RewriteError = 4,
    /// Plan or config file could not be read
    IoError = 5,
    /// General runtime error
    RuntimeError = 10,
}

impl ExitCode {
    /// Convert an error to an exit code.
    fn from_error(error: &anyhow::Error) -> Self {
        if let Some(err) = error.downcast_ref::<hivesync_core::Error>() {
            return match err {
                hivesync_core::Error::Config(_) => ExitCode::ConfigError,
                hivesync_core::Error::Iceberg(IcebergError::ValidationConflict(_)) => {
                    ExitCode::ConflictError
                }
                hivesync_core::Error::Iceberg(_) => ExitCode::IcebergError,
                hivesync_core::Error::Rewrite(_) => ExitCode::RewriteError,
                hivesync_core::Error::Io(_) => ExitCode::IoError,
                hivesync_core::Error::Serialization(_) => ExitCode::RuntimeError,
            };
        }

        let error_str = error.to_string().to_lowercase();
        if error_str.contains("config") || error_str.contains("toml") || error_str.contains("parse")
        {
            ExitCode::ConfigError
        } else if error.downcast_ref::<std::io::Error>().is_some() {
            ExitCode::IoError
        } else {
            ExitCode::RuntimeError
        }
    }
}

mod commands;

#[derive(Parser)]
#[command(name = "hivesync")]
#[command(about = "Hive-location-aware rewrite CLI", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging (-v for debug, -vv for trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Show which files of a rewrite plan are staged now and which are deferred
    Plan {
        /// Rewrite plan file
        #[arg(long)]
        plan: PathBuf,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run a rewrite plan against an in-memory table and commit it
    Rewrite {
        /// Rewrite plan file
        #[arg(long)]
        plan: PathBuf,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate configuration file
    Validate,
}

#[tokio::main]
async fn main() {
    let exit_code = run_cli().await;
    std::process::exit(exit_code as i32);
}

/// Main CLI execution logic with proper error handling.
async fn run_cli() -> ExitCode {
    let cli = Cli::parse();

    // Config is optional for log settings; fall back to JSON at info
    let monitoring = cli
        .config
        .as_ref()
        .and_then(|path| std::fs::read_to_string(path).ok())
        .and_then(|content| toml::from_str::<Config>(&content).ok())
        .map(|config| config.monitoring)
        .unwrap_or_default();

    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        match cli.verbose {
            0 => EnvFilter::new(monitoring.log_level.as_str()),
            1 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    match monitoring.log_format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(fmt::layer().json())
                .with(filter)
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(fmt::layer())
                .with(filter)
                .init();
        }
    }

    match execute_command(cli).await {
        Ok(()) => ExitCode::Success,
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            ExitCode::from_error(&e)
        }
    }
}

/// Execute the CLI command.
async fn execute_command(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Plan { plan, json } => {
            let config = load_config(&cli.config)?;
            commands::plan::run(config, &plan, json)?;
        }

        Commands::Rewrite { plan, json } => {
            let config = load_config(&cli.config)?;
            commands::rewrite::run(config, &plan, json).await?;
        }

        Commands::Validate => {
            let config = load_config(&cli.config)?;
            println!("Configuration is valid");
            println!("  Table: {}", config.table.full_name());
            println!("  Hive location: {}", config.table.hive_location);
            println!("  Classifier: {:?}", config.classifier.mode);
        }
    }

    Ok(())
}

fn load_config(path: &Option<PathBuf>) -> Result<Config> {
    let path = path.clone().unwrap_or_else(|| PathBuf::from("hivesync.toml"));
    Ok(Config::from_file(&path)?)
}
