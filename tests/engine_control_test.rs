// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the thermal-engine-sim project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! End to end tests of a running daemon
//!
//! The engine is started and stopped through holding register 0 with a real
//! Modbus client, and observed through the HTTP API, the way the fan and
//! sensor peers do it.

use std::net::SocketAddr;
use std::time::Duration;

use approx::assert_relative_eq;
use serde_json::{json, Value};
use tokio::time;
use tokio_modbus::prelude::*;

use thermal_engine_sim::config::Config;
use thermal_engine_sim::daemon::Daemon;

type TestResult = Result<(), Box<dyn std::error::Error>>;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Daemon on loopback with OS assigned ports and a slow progression so that
/// temperatures stay put while a test reads them
async fn start_daemon() -> Result<(Daemon, SocketAddr, SocketAddr), Box<dyn std::error::Error>> {
    init_logger();

    let mut config = Config::default();
    config.http.address = "127.0.0.1".to_string();
    config.http.port = 0;
    config.modbus.address = "127.0.0.1".to_string();
    config.modbus.port = 0;
    config.engine.interval_seconds = 60.0;

    let mut daemon = Daemon::new();
    daemon.launch(&config).await?;

    let http_addr = daemon.http_local_addr().ok_or("HTTP server not started")?;
    let mut bound = daemon
        .modbus_bound_address()
        .ok_or("Modbus server not started")?;
    let modbus_addr = time::timeout(Duration::from_secs(5), bound.wait_for(|a| a.is_some()))
        .await??
        .ok_or("Modbus server not bound")?;

    Ok((daemon, http_addr, modbus_addr))
}

async fn get_engine(http_addr: SocketAddr) -> Result<Value, reqwest::Error> {
    reqwest::get(format!("http://{}/engine", http_addr))
        .await?
        .json()
        .await
}

async fn stop_daemon(daemon: Daemon) {
    daemon.shutdown();
    time::timeout(Duration::from_secs(10), daemon.join())
        .await
        .expect("daemon should stop")
        .expect("daemon should join cleanly");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_run_command_register_controls_the_engine() -> TestResult {
    let (daemon, http_addr, modbus_addr) = start_daemon().await?;
    let mut ctx = tcp::connect(modbus_addr).await?;

    let state = get_engine(http_addr).await?;
    assert_eq!(state["status"], "stopped");

    // Run: the bridge picks it up within one 500 ms poll
    ctx.write_single_register(0, 1).await??;
    time::sleep(Duration::from_secs(1)).await;
    let state = get_engine(http_addr).await?;
    assert_eq!(state["status"], "running");
    assert_eq!(ctx.read_discrete_inputs(0, 1).await??, vec![true]);

    // Writing the same command again changes nothing
    ctx.write_single_register(0, 1).await??;
    time::sleep(Duration::from_secs(1)).await;
    assert_eq!(get_engine(http_addr).await?["status"], "running");

    ctx.write_single_register(0, 0).await??;
    time::sleep(Duration::from_secs(1)).await;
    let state = get_engine(http_addr).await?;
    assert_eq!(state["status"], "stopped");
    assert_eq!(ctx.read_discrete_inputs(0, 1).await??, vec![false]);

    ctx.disconnect().await?;
    stop_daemon(daemon).await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_temperature_override_is_mirrored() -> TestResult {
    let (daemon, http_addr, modbus_addr) = start_daemon().await?;
    let mut ctx = tcp::connect(modbus_addr).await?;

    assert_eq!(ctx.read_input_registers(0, 1).await??, vec![30]);

    let response = reqwest::Client::new()
        .post(format!("http://{}/engine/temperature", http_addr))
        .json(&json!({ "temperature": 99 }))
        .send()
        .await?;
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await?;
    assert_relative_eq!(body["temperature"].as_f64().ok_or("no temperature")?, 99.0);

    let state = get_engine(http_addr).await?;
    assert_relative_eq!(state["temperature"].as_f64().ok_or("no temperature")?, 99.0);
    assert_eq!(state["status"], "stopped");

    time::sleep(Duration::from_millis(200)).await;
    assert_eq!(ctx.read_input_registers(0, 1).await??, vec![99]);

    ctx.disconnect().await?;
    stop_daemon(daemon).await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_modbus_restarts_once_its_port_is_free() -> TestResult {
    init_logger();

    let blocker = std::net::TcpListener::bind("127.0.0.1:0")?;
    let modbus_port = blocker.local_addr()?.port();

    let mut config = Config::default();
    config.http.address = "127.0.0.1".to_string();
    config.http.port = 0;
    config.modbus.address = "127.0.0.1".to_string();
    config.modbus.port = modbus_port;
    config.modbus.restart_delay_ms = 100;

    let mut daemon = Daemon::new();
    daemon.launch(&config).await?;

    // HTTP keeps working while Modbus cannot bind
    let http_addr = daemon.http_local_addr().ok_or("HTTP server not started")?;
    assert_eq!(get_engine(http_addr).await?["status"], "stopped");
    let mut bound = daemon
        .modbus_bound_address()
        .ok_or("Modbus server not started")?;
    assert!(bound.borrow().is_none());

    drop(blocker);
    let modbus_addr = time::timeout(Duration::from_secs(5), bound.wait_for(|a| a.is_some()))
        .await??
        .ok_or("Modbus server not bound")?;
    assert_eq!(modbus_addr.port(), modbus_port);

    let mut ctx = tcp::connect(modbus_addr).await?;
    ctx.write_single_register(0, 1).await??;
    time::sleep(Duration::from_secs(1)).await;
    assert_eq!(get_engine(http_addr).await?["status"], "running");

    ctx.disconnect().await?;
    stop_daemon(daemon).await;
    Ok(())
}
