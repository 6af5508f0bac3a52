// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the thermal-engine-sim project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Temperature mirror
//!
//! Copies every engine state change into the register store: the integer part
//! of the temperature into input register 0 and the run flag into discrete
//! input 0. This is the layout the peer sensor and fan processes read.

use log::{debug, error, info};

use super::register_store::{
    RegisterError, RegisterGroup, RegisterStore, RUNNING_DISCRETE_INPUT, TEMPERATURE_REGISTER,
};
use crate::engine::{Engine, EngineState};
use crate::utility::shutdown::{wait_for_shutdown, ShutdownSignal};

/// Publishes engine state into Modbus registers
pub struct TemperatureMirror {
    engine: Engine,
    store: RegisterStore,
}

/// Register value for a temperature: truncated, saturating at both ends
pub fn temperature_to_register(temperature: f64) -> u16 {
    // `as` saturates and maps NaN to 0
    temperature.trunc() as u16
}

impl TemperatureMirror {
    pub fn new(engine: Engine, store: RegisterStore) -> Self {
        Self { engine, store }
    }

    /// Write one snapshot into the registers
    pub fn publish(&self, state: &EngineState) -> Result<(), RegisterError> {
        self.store.write_registers(
            RegisterGroup::InputRegisters,
            TEMPERATURE_REGISTER,
            &[temperature_to_register(state.temperature)],
        )?;
        self.store.write_bits(
            RegisterGroup::DiscreteInputs,
            RUNNING_DISCRETE_INPUT,
            &[state.is_running()],
        )
    }

    /// Mirror every engine change until shutdown
    pub async fn run(self, mut shutdown: ShutdownSignal) {
        let mut updates = self.engine.subscribe();
        info!(
            "Mirroring engine temperature into input register {}",
            TEMPERATURE_REGISTER
        );

        let initial = *updates.borrow_and_update();
        if let Err(e) = self.publish(&initial) {
            error!("Failed to mirror engine state: {}", e);
        }

        loop {
            tokio::select! {
                biased;
                _ = wait_for_shutdown(&mut shutdown) => break,
                changed = updates.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let state = *updates.borrow_and_update();
                    debug!("Mirroring temperature {:.2} ({})", state.temperature, state.status);
                    if let Err(e) = self.publish(&state) {
                        error!("Failed to mirror engine state: {}", e);
                    }
                }
            }
        }

        info!("Temperature mirror stopped");
    }
}
