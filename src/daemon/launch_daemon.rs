// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the thermal-engine-sim project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! # Daemon Management Module
//!
//! Starts and coordinates every background task of the simulator:
//!
//! - the engine progression
//! - the temperature mirror, the register bridge and the supervised Modbus
//!   server, when Modbus is enabled
//! - the HTTP control surface, on its own blocking thread
//!
//! All tasks observe one shutdown broadcast, so [`Daemon::shutdown`] followed
//! by [`Daemon::join`] stops them deterministically.
//!
//! ## Usage
//!
//! ```no_run
//! use thermal_engine_sim::{config::Config, daemon::launch_daemon::Daemon};
//!
//! async fn example() -> anyhow::Result<()> {
//!     let config = Config::default();
//!
//!     let mut daemon = Daemon::new();
//!     daemon.launch(&config).await?;
//!
//!     // Later, trigger a graceful shutdown
//!     daemon.shutdown();
//!     daemon.join().await?;
//!
//!     Ok(())
//! }
//! ```

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use log::{debug, error, info, warn};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::{resolve_socket_addr, Config};
use crate::engine::Engine;
use crate::http::{bind_with_retry, ApiState, BindRetryPolicy, HttpServer, Unblocker};
use crate::modbus::{ModbusSupervisor, RegisterBridge, RegisterStore, TemperatureMirror};
use crate::utility::shutdown::{shutdown_channel, ShutdownSignal, ShutdownTrigger};

/// How long `join` waits for each task
const JOIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Task manager owning every service of the simulator
///
/// # Fields
///
/// * `tasks` - Handles of the spawned tasks, awaited by `join`
/// * `shutdown` - Sending half of the shutdown broadcast
/// * `engine` - The engine, once launched
/// * `register_store` - Registers shared by the Modbus tasks, when enabled
pub struct Daemon {
    tasks: Vec<JoinHandle<Result<()>>>,
    shutdown: ShutdownTrigger,
    engine: Option<Engine>,
    register_store: Option<RegisterStore>,
    modbus_bound: Option<watch::Receiver<Option<SocketAddr>>>,
    http_local_addr: Option<SocketAddr>,
    http_unblocker: Option<Unblocker>,
}

impl Default for Daemon {
    fn default() -> Self {
        Self::new()
    }
}

impl Daemon {
    /// Create a daemon with no running task
    pub fn new() -> Self {
        let (shutdown, _) = shutdown_channel();
        Daemon {
            tasks: Vec::new(),
            shutdown,
            engine: None,
            register_store: None,
            modbus_bound: None,
            http_local_addr: None,
            http_unblocker: None,
        }
    }

    /// Launch all configured tasks
    ///
    /// Order matters: the engine exists before anything that drives it, and
    /// the HTTP server only starts once the rest is in place.
    ///
    /// # Errors
    ///
    /// * The configuration does not validate
    /// * An interface address cannot be parsed
    /// * The HTTP listener could not be bound within the retry budget
    ///
    /// Tasks already started are told to stop before the error is returned.
    pub async fn launch(&mut self, config: &Config) -> Result<()> {
        let result = self.start_services(config).await;
        if result.is_err() {
            self.shutdown();
        }
        result
    }

    async fn start_services(&mut self, config: &Config) -> Result<()> {
        config.validate()?;
        let engine = self.start_engine(config)?;

        if config.modbus.enabled {
            self.start_modbus(config, &engine)?;
        } else {
            info!("Modbus disabled, the engine can only be observed over HTTP");
        }

        self.start_http_server(config, &engine).await?;
        Ok(())
    }

    fn start_engine(&mut self, config: &Config) -> Result<Engine> {
        let (engine, progression) = Engine::launch(&config.engine, self.signal())
            .context("Failed to launch the engine")?;

        self.tasks.push(tokio::spawn(async move {
            progression
                .await
                .context("Engine progression task failed")
        }));
        self.engine = Some(engine.clone());
        Ok(engine)
    }

    /// Start the register store, the mirror, the bridge and the supervised
    /// Modbus server
    fn start_modbus(&mut self, config: &Config, engine: &Engine) -> Result<()> {
        let addr = resolve_socket_addr(&config.modbus.address, config.modbus.port)
            .context("Invalid Modbus address")?;
        let store = RegisterStore::new(config.modbus.register_count);
        self.register_store = Some(store.clone());

        if config.modbus.mirror_temperature {
            let mirror = TemperatureMirror::new(engine.clone(), store.clone());
            let signal = self.signal();
            self.tasks.push(tokio::spawn(async move {
                mirror.run(signal).await;
                Ok(())
            }));
        }

        let bridge = RegisterBridge::new(
            engine.clone(),
            store.clone(),
            Duration::from_millis(config.modbus.poll_interval_ms),
        );
        let signal = self.signal();
        self.tasks.push(tokio::spawn(async move {
            bridge.run(signal).await;
            Ok(())
        }));

        info!("Starting Modbus server on {}", addr);
        let supervisor = ModbusSupervisor::new(
            addr,
            store,
            Duration::from_millis(config.modbus.restart_delay_ms),
        );
        self.modbus_bound = Some(supervisor.bound_address());
        self.tasks.push(tokio::spawn(supervisor.run(self.signal())));

        Ok(())
    }

    /// Bind the HTTP listener and serve it on a blocking thread
    async fn start_http_server(&mut self, config: &Config, engine: &Engine) -> Result<()> {
        let addr = resolve_socket_addr(&config.http.address, config.http.port)
            .context("Invalid HTTP address")?;
        info!("Starting HTTP server on {}", addr);

        let listener = bind_with_retry(addr, &BindRetryPolicy::from(&config.http)).await?;
        let server = HttpServer::from_listener(listener, ApiState::new(engine.clone()))?;

        self.http_local_addr = Some(server.local_addr());
        self.http_unblocker = Some(server.unblocker());
        self.tasks.push(tokio::task::spawn_blocking(move || {
            server.serve();
            Ok(())
        }));
        Ok(())
    }

    fn signal(&self) -> ShutdownSignal {
        self.shutdown.subscribe()
    }

    pub fn get_engine(&self) -> Option<Engine> {
        self.engine.clone()
    }

    pub fn get_register_store(&self) -> Option<RegisterStore> {
        self.register_store.clone()
    }

    /// Address the HTTP server actually listens on
    pub fn http_local_addr(&self) -> Option<SocketAddr> {
        self.http_local_addr
    }

    /// Address of the Modbus server while it is up, `None` when Modbus is
    /// disabled
    pub fn modbus_bound_address(&self) -> Option<watch::Receiver<Option<SocketAddr>>> {
        self.modbus_bound.clone()
    }

    /// Signal every task to stop
    ///
    /// Only signals; call [`Daemon::join`] to wait for the tasks.
    pub fn shutdown(&self) {
        info!("Shutting down daemon tasks");
        self.shutdown.send_replace(true);
        if let Some(unblocker) = &self.http_unblocker {
            unblocker.unblock();
        }
    }

    /// Wait for all tasks to complete
    ///
    /// Task failures and panics are logged. A task that does not finish
    /// within the timeout is abandoned with a warning.
    pub async fn join(self) -> Result<()> {
        debug!("Waiting for {} daemon tasks", self.tasks.len());
        for task in self.tasks {
            match tokio::time::timeout(JOIN_TIMEOUT, task).await {
                Ok(Ok(Ok(()))) => {}
                Ok(Ok(Err(e))) => error!("Task failed: {:#}", e),
                Ok(Err(e)) => error!("Task panicked: {}", e),
                Err(_) => warn!("Task did not complete within timeout period, may be hung"),
            }
        }
        info!("All daemon tasks stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local_config() -> Config {
        let mut config = Config::default();
        config.http.address = "127.0.0.1".to_string();
        config.http.port = 0;
        config.modbus.address = "127.0.0.1".to_string();
        config.modbus.port = 0;
        config
    }

    #[tokio::test]
    async fn test_launch_and_shutdown() {
        let mut daemon = Daemon::new();
        daemon.launch(&local_config()).await.unwrap();

        assert!(daemon.get_engine().is_some());
        assert!(daemon.get_register_store().is_some());
        assert_ne!(daemon.http_local_addr().unwrap().port(), 0);

        let mut bound = daemon.modbus_bound_address().unwrap();
        tokio::time::timeout(Duration::from_secs(5), bound.wait_for(|a| a.is_some()))
            .await
            .expect("Modbus server should bind")
            .unwrap();

        daemon.shutdown();
        tokio::time::timeout(Duration::from_secs(10), daemon.join())
            .await
            .expect("daemon should stop")
            .unwrap();
    }

    #[tokio::test]
    async fn test_modbus_disabled() {
        let mut config = local_config();
        config.modbus.enabled = false;

        let mut daemon = Daemon::new();
        daemon.launch(&config).await.unwrap();
        assert!(daemon.get_register_store().is_none());
        assert!(daemon.modbus_bound_address().is_none());

        daemon.shutdown();
        daemon.join().await.unwrap();
    }

    #[tokio::test]
    async fn test_http_bind_failure_is_fatal() {
        let blocker = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let mut config = local_config();
        config.modbus.enabled = false;
        config.http.port = blocker.local_addr().unwrap().port();
        config.http.bind_attempts = 2;
        config.http.bind_retry_delay_ms = 10;

        let mut daemon = Daemon::new();
        let err = daemon.launch(&config).await.unwrap_err();
        assert!(err.downcast_ref::<crate::http::BindError>().is_some());
        assert!(daemon.http_local_addr().is_none());

        daemon.join().await.unwrap();
    }
}
