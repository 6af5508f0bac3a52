// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the thermal-engine-sim project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Modbus service bootstrap
//!
//! Keeps a Modbus TCP server bound and serving. A failed bind, a serve error
//! or a premature return are logged, followed by a fixed pause and a fresh
//! attempt. There is no retry limit: only the shutdown signal stops the loop.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use log::{debug, error, info, warn};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::time;
use tokio_modbus::server::tcp::{accept_tcp_connection, Server};

use super::modbus_server::EngineModbusServer;
use super::register_store::RegisterStore;
use crate::utility::shutdown::{wait_for_shutdown, ShutdownSignal};

/// Supervised Modbus TCP server over a shared register store
pub struct ModbusSupervisor {
    addr: SocketAddr,
    store: RegisterStore,
    restart_delay: Duration,
    bound: watch::Sender<Option<SocketAddr>>,
}

impl ModbusSupervisor {
    pub fn new(addr: SocketAddr, store: RegisterStore, restart_delay: Duration) -> Self {
        let (bound, _) = watch::channel(None);
        Self {
            addr,
            store,
            restart_delay,
            bound,
        }
    }

    /// Address the server is currently listening on, `None` while it is down
    pub fn bound_address(&self) -> watch::Receiver<Option<SocketAddr>> {
        self.bound.subscribe()
    }

    /// Run the supervised server until shutdown
    pub async fn run(self, mut shutdown: ShutdownSignal) -> Result<()> {
        let mut attempt: u64 = 0;

        loop {
            attempt += 1;
            debug!("Starting Modbus server on {} (attempt {})", self.addr, attempt);

            let outcome = tokio::select! {
                biased;
                _ = wait_for_shutdown(&mut shutdown) => break,
                outcome = self.serve_once() => outcome,
            };
            self.bound.send_replace(None);

            match outcome {
                Ok(()) => warn!("Modbus server on {} returned unexpectedly", self.addr),
                Err(e) => error!("Modbus server on {} failed: {:#}", self.addr, e),
            }
            info!("Restarting Modbus server in {:?}", self.restart_delay);

            tokio::select! {
                biased;
                _ = wait_for_shutdown(&mut shutdown) => break,
                _ = time::sleep(self.restart_delay) => {}
            }
        }

        self.bound.send_replace(None);
        info!("Modbus server on {} shut down", self.addr);
        Ok(())
    }

    /// Bind and serve once. Returns when the server stops for any reason.
    async fn serve_once(&self) -> Result<()> {
        let listener = TcpListener::bind(self.addr)
            .await
            .with_context(|| format!("Failed to bind Modbus listener on {}", self.addr))?;
        let local_addr = listener.local_addr()?;
        let server = Server::new(listener);

        info!("Modbus server listening on {}", local_addr);
        self.bound.send_replace(Some(local_addr));

        let store = self.store.clone();
        let on_connected = move |stream, socket_addr| {
            let store = store.clone();
            debug!("Modbus client connected from {}", socket_addr);
            async move {
                accept_tcp_connection(stream, socket_addr, move |_socket_addr| {
                    Ok(Some(EngineModbusServer::new(store.clone())))
                })
            }
        };

        let on_process_error = |err| {
            error!("Modbus server error: {err}");
        };

        server
            .serve(&on_connected, on_process_error)
            .await
            .context("Modbus server stopped with an error")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utility::shutdown::shutdown_channel;

    async fn wait_bound(bound: &mut watch::Receiver<Option<SocketAddr>>) -> SocketAddr {
        let addr = time::timeout(Duration::from_secs(5), bound.wait_for(|a| a.is_some()))
            .await
            .expect("server should bind")
            .expect("supervisor alive");
        addr.expect("bound address")
    }

    #[tokio::test]
    async fn test_restarts_after_port_becomes_free() {
        let blocker = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = blocker.local_addr().unwrap();

        let (trigger, signal) = shutdown_channel();
        let supervisor =
            ModbusSupervisor::new(addr, RegisterStore::new(16), Duration::from_millis(50));
        let mut bound = supervisor.bound_address();
        let task = tokio::spawn(supervisor.run(signal));

        // Port occupied: the supervisor keeps retrying without giving up
        time::sleep(Duration::from_millis(200)).await;
        assert!(bound.borrow().is_none());
        assert!(!task.is_finished());

        drop(blocker);
        assert_eq!(wait_bound(&mut bound).await, addr);

        trigger.send_replace(true);
        time::timeout(Duration::from_secs(5), task)
            .await
            .expect("supervisor should stop")
            .expect("supervisor should not panic")
            .expect("supervisor should exit cleanly");
        assert!(bound.borrow().is_none());
    }

    #[tokio::test]
    async fn test_shutdown_during_restart_delay() {
        let blocker = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = blocker.local_addr().unwrap();

        let (trigger, signal) = shutdown_channel();
        let supervisor =
            ModbusSupervisor::new(addr, RegisterStore::new(16), Duration::from_secs(60));
        let task = tokio::spawn(supervisor.run(signal));

        time::sleep(Duration::from_millis(100)).await;
        trigger.send_replace(true);
        time::timeout(Duration::from_secs(5), task)
            .await
            .expect("supervisor should not wait for the restart delay")
            .expect("supervisor should not panic")
            .expect("supervisor should exit cleanly");
    }
}
