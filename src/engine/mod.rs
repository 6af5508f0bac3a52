// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the thermal-engine-sim project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Thermal state machine
//!
//! The [`Engine`] owns a temperature and a run status. A single background
//! progression task adjusts the temperature every tick: it heats while the
//! engine is running and cools towards zero while it is stopped.
//!
//! ## Consistency
//!
//! The whole state lives in one `tokio::sync::watch` channel. Every mutation
//! (tick, start, stop, calibration) is a single atomic modification of that
//! channel, so readers always observe a matching `{temperature, status}` pair
//! and concurrent `start`/`stop` calls cannot both win.
//!
//! ## Progression
//!
//! There is exactly one progression task per engine. A run-state transition
//! restarts its tick phase, so the first heating (or cooling) step happens one
//! full interval after the transition and two progressions never race on the
//! same temperature.
//!
//! ## Usage
//!
//! ```no_run
//! use thermal_engine_sim::config::EngineConfig;
//! use thermal_engine_sim::engine::Engine;
//! use thermal_engine_sim::utility::shutdown::shutdown_channel;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let (trigger, signal) = shutdown_channel();
//! let (engine, progression) = Engine::launch(&EngineConfig::default(), signal)?;
//!
//! engine.start();
//! println!("{:?}", engine.get_state());
//!
//! trigger.send_replace(true);
//! progression.await?;
//! # Ok(())
//! # }
//! ```

pub mod state;

use std::sync::Arc;
use std::time::Duration;

use log::{debug, info};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::config::EngineConfig;
use crate::utility::shutdown::{wait_for_shutdown, ShutdownSignal};

pub use state::{EngineState, EngineStatus};

/// Longest accepted tick interval
pub const MAX_TICK_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// Error types for the thermal engine
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("Invalid engine configuration: {0}")]
    InvalidConfig(String),
    #[error("Temperature must be a finite number, got {0}")]
    InvalidTemperature(f64),
}

struct EngineShared {
    state: watch::Sender<EngineState>,
    temperature_step: f64,
    interval: Duration,
}

/// Handle on the simulated engine.
///
/// Cloning is cheap and every clone drives the same engine; the HTTP layer,
/// the register bridge and the temperature mirror each hold one.
#[derive(Clone)]
pub struct Engine {
    shared: Arc<EngineShared>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("state", &self.get_state())
            .field("temperature_step", &self.shared.temperature_step)
            .field("interval", &self.shared.interval)
            .finish()
    }
}

impl Engine {
    /// Construct the engine and spawn its progression task.
    ///
    /// The engine starts `Stopped` at `config.temperature_start`, so it begins
    /// cooling immediately when that value is above zero. The progression task
    /// runs until `shutdown` is triggered.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidConfig`] when the step, interval or start
    /// temperature is not a usable number.
    pub fn launch(
        config: &EngineConfig,
        shutdown: ShutdownSignal,
    ) -> Result<(Self, JoinHandle<()>), EngineError> {
        if !config.temperature_step.is_finite() || config.temperature_step < 0.0 {
            return Err(EngineError::InvalidConfig(format!(
                "temperature step must be finite and non-negative, got {}",
                config.temperature_step
            )));
        }
        if !config.temperature_start.is_finite() || config.temperature_start < 0.0 {
            return Err(EngineError::InvalidConfig(format!(
                "start temperature must be finite and non-negative, got {}",
                config.temperature_start
            )));
        }
        let interval = Duration::try_from_secs_f64(config.interval_seconds)
            .ok()
            .filter(|interval| !interval.is_zero() && *interval <= MAX_TICK_INTERVAL)
            .ok_or_else(|| {
                EngineError::InvalidConfig(format!(
                    "tick interval must be a positive number of seconds up to {}, got {}",
                    MAX_TICK_INTERVAL.as_secs(),
                    config.interval_seconds
                ))
            })?;

        let (state, transitions) = watch::channel(EngineState::new(config.temperature_start));
        let engine = Engine {
            shared: Arc::new(EngineShared {
                state,
                temperature_step: config.temperature_step,
                interval,
            }),
        };

        info!(
            "Starting engine with step={}, interval={:?}, start_temp={}",
            config.temperature_step, interval, config.temperature_start
        );

        let progression = engine.clone();
        let handle = tokio::spawn(async move {
            progression.run_progression(transitions, shutdown).await;
        });

        Ok((engine, handle))
    }

    /// Switch the engine to `Running`.
    ///
    /// Returns `true` when the engine was stopped and is now running, `false`
    /// when it was already running (nothing changes in that case).
    pub fn start(&self) -> bool {
        let started = self.shared.state.send_if_modified(|state| {
            if state.is_running() {
                false
            } else {
                state.status = EngineStatus::Running;
                true
            }
        });
        if started {
            info!("Engine started at {:.2}", self.get_state().temperature);
        } else {
            debug!("Start requested but engine is already running");
        }
        started
    }

    /// Switch the engine to `Stopped`.
    ///
    /// Returns `true` when the engine was running and is now stopped, `false`
    /// when it was already stopped.
    pub fn stop(&self) -> bool {
        let stopped = self.shared.state.send_if_modified(|state| {
            if state.is_running() {
                state.status = EngineStatus::Stopped;
                true
            } else {
                false
            }
        });
        if stopped {
            info!("Engine stopped at {:.2}", self.get_state().temperature);
        } else {
            debug!("Stop requested but engine is already stopped");
        }
        stopped
    }

    /// Overwrite the temperature regardless of the run state.
    ///
    /// Negative values are floored at zero. The progression continues from
    /// the new value on its next tick.
    ///
    /// # Returns
    ///
    /// The engine state right after the write.
    pub fn set_temperature(&self, temperature: f64) -> Result<EngineState, EngineError> {
        if !temperature.is_finite() {
            return Err(EngineError::InvalidTemperature(temperature));
        }
        let mut snapshot = EngineState::new(0.0);
        self.shared.state.send_modify(|state| {
            state.temperature = temperature.max(0.0);
            snapshot = *state;
        });
        debug!("Temperature overridden to {:.2}", snapshot.temperature);
        Ok(snapshot)
    }

    /// Consistent snapshot of temperature and status
    pub fn get_state(&self) -> EngineState {
        *self.shared.state.borrow()
    }

    pub fn is_running(&self) -> bool {
        self.get_state().is_running()
    }

    /// Receiver notified after every change of the engine state
    pub fn subscribe(&self) -> watch::Receiver<EngineState> {
        self.shared.state.subscribe()
    }

    pub fn temperature_step(&self) -> f64 {
        self.shared.temperature_step
    }

    pub fn interval(&self) -> Duration {
        self.shared.interval
    }

    async fn run_progression(
        self,
        mut transitions: watch::Receiver<EngineState>,
        mut shutdown: ShutdownSignal,
    ) {
        let period = self.shared.interval;
        let step = self.shared.temperature_step;
        let mut status = transitions.borrow_and_update().status;

        let mut ticker = time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        debug!("Progression task started in {} mode", status);

        loop {
            tokio::select! {
                biased;
                _ = wait_for_shutdown(&mut shutdown) => {
                    debug!("Progression task received shutdown signal");
                    break;
                }
                changed = transitions.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let current = transitions.borrow_and_update().status;
                    if current != status {
                        debug!("Progression switching from {} to {}", status, current);
                        status = current;
                        // The new progression ticks one full interval after the transition
                        ticker.reset();
                    }
                }
                _ = ticker.tick() => {
                    self.shared.state.send_if_modified(|state| state.advance(step));
                }
            }
        }

        debug!("Progression task stopped");
    }
}
