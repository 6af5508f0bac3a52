// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the thermal-engine-sim project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use std::net::SocketAddr;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use tokio::time::{self, Duration};
use tokio_modbus::client::Context as ModbusContext;
use tokio_modbus::prelude::*;

use thermal_engine_sim::modbus::register_store::{
    RUNNING_DISCRETE_INPUT, RUN_COMMAND_REGISTER, TEMPERATURE_REGISTER,
};

/// Modbus client starting, stopping and inspecting a thermal engine simulator
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Modbus server address
    #[clap(long, default_value = "127.0.0.1")]
    address: String,

    /// Modbus server port
    #[clap(long, default_value = "502")]
    port: u16,

    /// Request timeout in milliseconds
    #[clap(long, default_value = "1000")]
    timeout_ms: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the run command, the mirrored temperature and the run flag
    Status,
    /// Write 1 into the run command register
    Start {
        /// Check the run flag after this many milliseconds
        #[clap(long)]
        wait_ms: Option<u64>,
    },
    /// Write 0 into the run command register
    Stop {
        /// Check the run flag after this many milliseconds
        #[clap(long)]
        wait_ms: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init_from_env(
        env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, "info"),
    );

    let args = Args::parse();

    let socket_addr = format!("{}:{}", args.address, args.port)
        .parse::<SocketAddr>()
        .with_context(|| format!("Invalid Modbus address {}:{}", args.address, args.port))?;
    info!("Connecting to Modbus server at {}", socket_addr);

    let mut ctx = tcp::connect(socket_addr)
        .await
        .with_context(|| format!("Failed to connect to {}", socket_addr))?;
    let timeout = Duration::from_millis(args.timeout_ms);

    match args.command {
        Command::Status => print_status(&mut ctx, timeout).await?,
        Command::Start { wait_ms } => command(&mut ctx, timeout, true, wait_ms).await?,
        Command::Stop { wait_ms } => command(&mut ctx, timeout, false, wait_ms).await?,
    }

    ctx.disconnect().await?;
    Ok(())
}

async fn command(
    ctx: &mut ModbusContext,
    timeout: Duration,
    run: bool,
    wait_ms: Option<u64>,
) -> Result<()> {
    let value = u16::from(run);
    info!(
        "Writing {} into holding register {}",
        value, RUN_COMMAND_REGISTER
    );
    time::timeout(timeout, ctx.write_single_register(RUN_COMMAND_REGISTER, value))
        .await
        .context("Request timed out")??
        .map_err(|e| anyhow!("Modbus exception: {}", e))?;

    if let Some(wait_ms) = wait_ms {
        time::sleep(Duration::from_millis(wait_ms)).await;
        let running = read_running(ctx, timeout).await?;
        if running != run {
            bail!(
                "Engine is still {} after {} ms",
                if running { "running" } else { "stopped" },
                wait_ms
            );
        }
        println!(
            "Engine {}",
            if running { "running" } else { "stopped" }
        );
    }
    Ok(())
}

async fn read_running(ctx: &mut ModbusContext, timeout: Duration) -> Result<bool> {
    let bits = time::timeout(timeout, ctx.read_discrete_inputs(RUNNING_DISCRETE_INPUT, 1))
        .await
        .context("Request timed out")??
        .map_err(|e| anyhow!("Modbus exception: {}", e))?;
    bits.first()
        .copied()
        .ok_or_else(|| anyhow!("Empty discrete input response"))
}

async fn print_status(ctx: &mut ModbusContext, timeout: Duration) -> Result<()> {
    let command = time::timeout(
        timeout,
        ctx.read_holding_registers(RUN_COMMAND_REGISTER, 1),
    )
    .await
    .context("Request timed out")??
    .map_err(|e| anyhow!("Modbus exception: {}", e))?;
    let temperature = time::timeout(
        timeout,
        ctx.read_input_registers(TEMPERATURE_REGISTER, 1),
    )
    .await
    .context("Request timed out")??
    .map_err(|e| anyhow!("Modbus exception: {}", e))?;
    let running = read_running(ctx, timeout).await?;

    println!("Run command (holding register {}): {:?}", RUN_COMMAND_REGISTER, command);
    println!("Temperature (input register {}): {:?}", TEMPERATURE_REGISTER, temperature);
    println!(
        "Running (discrete input {}): {}",
        RUNNING_DISCRETE_INPUT, running
    );
    Ok(())
}
