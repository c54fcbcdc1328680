// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # Cleaning Dispatch
//!
//! The `cleaning-dispatch` binary runs the cleaning vehicle dispatch service
//! and manages its configuration.
//!
//! ## Commands
//!
//! - `cleaning-dispatch serve [--host] [--port] [--mode]` - Run the HTTP service
//! - `cleaning-dispatch config show|validate|generate` - Configuration management

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

use cleaning_dispatch::commands::{self, ConfigCommand};
use cleaning_dispatch::daemon::{self, ServeOptions};
use cleaning_dispatch_core::domain::coordinator::CoordinatorMode;
use cleaning_dispatch_core::domain::service_config::ServiceConfigManifest;

/// Cleaning Dispatch - water-cleaning vehicle dispatch for parked aircraft
#[derive(Parser)]
#[command(name = "cleaning-dispatch")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(
        short,
        long,
        global = true,
        env = "CLEANING_DISPATCH_CONFIG",
        value_name = "FILE"
    )]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); defaults to the config file, then info
    #[arg(long, global = true, env = "CLEANING_DISPATCH_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format (text, json); defaults to the config file, then text
    #[arg(long, global = true, env = "CLEANING_DISPATCH_LOG_FORMAT")]
    log_format: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the dispatch HTTP service
    #[command(name = "serve")]
    Serve {
        /// Bind address (overrides spec.network.bind_address)
        #[arg(long)]
        host: Option<String>,

        /// HTTP port (overrides spec.network.port)
        #[arg(long)]
        port: Option<u16>,

        /// Coordinator backend: simulated or live (overrides spec.coordinator.mode)
        #[arg(long)]
        mode: Option<CoordinatorMode>,
    },

    /// Configuration management
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Serve { host, port, mode }) => {
            let manifest = ServiceConfigManifest::load_or_default(cli.config.clone())
                .context("Failed to load configuration")?;

            let logging = manifest
                .spec
                .observability
                .as_ref()
                .and_then(|o| o.logging.as_ref());
            let level = cli
                .log_level
                .or_else(|| logging.map(|l| l.level.clone()))
                .unwrap_or_else(|| "info".to_string());
            let format = cli
                .log_format
                .or_else(|| logging.map(|l| l.format.clone()))
                .unwrap_or_else(|| "text".to_string());
            init_logging(&level, &format)?;

            daemon::start_server(manifest, ServeOptions { host, port, mode }).await
        }
        Some(Commands::Config { command }) => {
            init_logging(
                cli.log_level.as_deref().unwrap_or("warn"),
                cli.log_format.as_deref().unwrap_or("text"),
            )?;
            commands::config::handle_command(command, cli.config).await
        }
        None => {
            eprintln!("{}", "No command specified. Use --help for usage.".yellow());
            std::process::exit(1);
        }
    }
}

/// Initialize tracing subscriber for logging
fn init_logging(level: &str, format: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("Failed to create log filter")?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    match format {
        "json" => builder.json().with_current_span(false).init(),
        "text" => builder.with_target(false).compact().init(),
        other => anyhow::bail!("Unknown log format '{}'. Use 'text' or 'json'", other),
    }

    Ok(())
}
