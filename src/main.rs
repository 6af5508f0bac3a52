// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the thermal-engine-sim project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

// Main entry point for the thermal engine simulator
use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info};
use std::path::PathBuf;
use tokio::signal;

use thermal_engine_sim::config::Config;
use thermal_engine_sim::daemon::Daemon;

/// Simulated thermal engine controlled over HTTP and Modbus TCP
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// HTTP interface to bind (default: 0.0.0.0)
    #[arg(short = 'i', long)]
    interface: Option<String>,

    /// HTTP port (default: 8000)
    #[arg(short = 'p', long)]
    port: Option<u16>,

    /// Temperature change per tick (default: 1)
    #[arg(short = 't', long)]
    temperature_step: Option<f64>,

    /// Tick interval in seconds (default: 1)
    #[arg(short = 's', long)]
    seconds: Option<f64>,

    /// Initial engine temperature (default: 30)
    #[arg(long, visible_alias = "ts")]
    temperature_start: Option<f64>,

    /// Modbus enabled
    #[arg(long)]
    modbus_enabled: Option<bool>,

    /// Modbus server address
    #[arg(long)]
    modbus_address: Option<String>,

    /// Modbus server port
    #[arg(long)]
    modbus_port: Option<u16>,

    /// Path to configuration file (YAML format)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Path to a configuration to validate and exit
    #[arg(long)]
    validate_config: Option<PathBuf>,

    /// Enable verbose logging (debug level)
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,

    /// Disable all logging output
    #[arg(short = 'q', long = "quiet")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.quiet {
        log::LevelFilter::Off
    } else if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    if let Some(validate_path) = args.validate_config {
        if !validate_path.exists() {
            return Err(anyhow::anyhow!(
                "Configuration file does not exist: {}",
                validate_path.display()
            ));
        }
        Config::from_file(&validate_path)
            .map_err(|err| anyhow::anyhow!("Configuration validation failed: {}", err))?;
        println!("Configuration file is valid: {}", validate_path.display());
        return Ok(());
    }

    let mut config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };

    // Apply command line overrides
    config.apply_args(
        args.interface,
        args.port,
        args.temperature_step,
        args.seconds,
        args.temperature_start,
        args.modbus_enabled,
        args.modbus_address,
        args.modbus_port,
    );
    config
        .validate()
        .context("Invalid configuration after command line overrides")?;

    info!("Starting thermal engine simulator");
    let mut daemon = Daemon::new();
    daemon.launch(&config).await?;

    // Wait for termination signal
    match signal::ctrl_c().await {
        Ok(()) => info!("Received shutdown signal, terminating daemon"),
        Err(err) => error!("Error waiting for shutdown signal: {}", err),
    }
    daemon.shutdown();
    daemon.join().await?;

    Ok(())
}
