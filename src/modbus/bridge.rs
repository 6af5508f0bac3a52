// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the thermal-engine-sim project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Register bridge
//!
//! Turns the level-triggered run command held in holding register 0 into
//! edge-triggered engine transitions. The engine converges to the commanded
//! state within one polling period.

use std::time::Duration;

use log::{debug, error, info};
use tokio::time::{self, MissedTickBehavior};

use super::register_store::{RegisterError, RegisterGroup, RegisterStore, RUN_COMMAND_REGISTER};
use crate::engine::Engine;
use crate::utility::shutdown::{wait_for_shutdown, ShutdownSignal};

/// What a single poll decided to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeAction {
    Started,
    Stopped,
    Unchanged,
}

/// Polls the run command register and drives the engine to match it
pub struct RegisterBridge {
    engine: Engine,
    store: RegisterStore,
    poll_interval: Duration,
}

impl RegisterBridge {
    pub fn new(engine: Engine, store: RegisterStore, poll_interval: Duration) -> Self {
        Self {
            engine,
            store,
            poll_interval,
        }
    }

    /// Read the run command once and apply it.
    ///
    /// `1` starts a stopped engine, `0` stops a running one. Any other value
    /// is not a command and leaves the engine alone.
    pub fn poll_once(&self) -> Result<BridgeAction, RegisterError> {
        let command = self
            .store
            .read_registers(RegisterGroup::HoldingRegisters, RUN_COMMAND_REGISTER, 1)?;

        let action = match command.first().copied() {
            Some(1) if !self.engine.is_running() => {
                info!("Run command received, starting engine");
                self.engine.start();
                BridgeAction::Started
            }
            Some(0) if self.engine.is_running() => {
                info!("Stop command received, stopping engine");
                self.engine.stop();
                BridgeAction::Stopped
            }
            Some(0) | Some(1) => BridgeAction::Unchanged,
            other => {
                debug!("Ignoring run command register value {:?}", other);
                BridgeAction::Unchanged
            }
        };
        Ok(action)
    }

    /// Poll until shutdown. Read failures are logged and retried on the next tick.
    pub async fn run(self, mut shutdown: ShutdownSignal) {
        info!(
            "Register bridge polling holding register {} every {:?}",
            RUN_COMMAND_REGISTER, self.poll_interval
        );

        let mut ticker = time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = wait_for_shutdown(&mut shutdown) => break,
                _ = ticker.tick() => {
                    if let Err(e) = self.poll_once() {
                        error!("Register bridge failed to read run command: {}", e);
                    }
                }
            }
        }

        info!("Register bridge stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::utility::shutdown::shutdown_channel;

    fn write_command(store: &RegisterStore, value: u16) {
        store
            .write_registers(RegisterGroup::HoldingRegisters, RUN_COMMAND_REGISTER, &[value])
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_once_follows_the_command() {
        let (_trigger, signal) = shutdown_channel();
        let (engine, _handle) = Engine::launch(&EngineConfig::default(), signal).unwrap();
        let store = RegisterStore::new(16);
        let bridge = RegisterBridge::new(engine.clone(), store.clone(), Duration::from_millis(500));

        assert_eq!(bridge.poll_once(), Ok(BridgeAction::Unchanged));

        write_command(&store, 1);
        assert_eq!(bridge.poll_once(), Ok(BridgeAction::Started));
        assert!(engine.is_running());
        assert_eq!(bridge.poll_once(), Ok(BridgeAction::Unchanged));

        // Not a command
        write_command(&store, 7);
        assert_eq!(bridge.poll_once(), Ok(BridgeAction::Unchanged));
        assert!(engine.is_running());

        write_command(&store, 0);
        assert_eq!(bridge.poll_once(), Ok(BridgeAction::Stopped));
        assert!(!engine.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_engine_converges_within_one_period() {
        let (trigger, signal) = shutdown_channel();
        let (engine, _handle) = Engine::launch(&EngineConfig::default(), signal.clone()).unwrap();
        let store = RegisterStore::new(16);
        let bridge = RegisterBridge::new(engine.clone(), store.clone(), Duration::from_millis(500));
        let task = tokio::spawn(bridge.run(signal));

        write_command(&store, 1);
        time::sleep(Duration::from_millis(550)).await;
        assert!(engine.is_running());

        write_command(&store, 0);
        time::sleep(Duration::from_millis(550)).await;
        assert!(!engine.is_running());

        trigger.send_replace(true);
        time::timeout(Duration::from_secs(1), task)
            .await
            .expect("bridge should stop")
            .expect("bridge should not panic");
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_failures_are_not_fatal() {
        let (trigger, signal) = shutdown_channel();
        let (engine, _handle) = Engine::launch(&EngineConfig::default(), signal.clone()).unwrap();
        // An empty store cannot serve register 0
        let bridge = RegisterBridge::new(engine, RegisterStore::new(0), Duration::from_millis(100));
        assert!(bridge.poll_once().is_err());

        let task = tokio::spawn(bridge.run(signal));
        time::sleep(Duration::from_millis(350)).await;
        assert!(!task.is_finished());

        trigger.send_replace(true);
        time::timeout(Duration::from_secs(1), task)
            .await
            .expect("bridge should stop")
            .expect("bridge should not panic");
    }
}
