// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the thermal-engine-sim project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Thermal engine configuration
//!
//! This module defines the parameters of the simulated engine. They are fixed
//! when the engine is constructed and never change afterwards.

use serde::{Deserialize, Serialize};

/// Configuration for the simulated thermal engine.
///
/// # Fields
///
/// * `temperature_step` - Temperature change applied on every tick (default: 1.0)
/// * `interval_seconds` - Time between two ticks in seconds (default: 1.0)
/// * `temperature_start` - Temperature of the engine at construction (default: 30.0)
///
/// # Example
///
/// ```
/// use thermal_engine_sim::config::EngineConfig;
///
/// let engine_config = EngineConfig {
///     temperature_step: 0.5,
///     interval_seconds: 2.0,
///     temperature_start: 20.0,
/// };
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Temperature added while running, removed while stopped, on every tick.
    ///
    /// Must be finite and non-negative.
    #[serde(default = "default_temperature_step")]
    pub temperature_step: f64,

    /// Tick period in seconds.
    ///
    /// Must be finite and strictly positive.
    #[serde(default = "default_interval_seconds")]
    pub interval_seconds: f64,

    /// Initial temperature. The engine starts stopped and therefore cools
    /// down from this value until it reaches 0.
    #[serde(default = "default_temperature_start")]
    pub temperature_start: f64,
}

fn default_temperature_step() -> f64 {
    1.0
}

fn default_interval_seconds() -> f64 {
    1.0
}

fn default_temperature_start() -> f64 {
    30.0
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            temperature_step: default_temperature_step(),
            interval_seconds: default_interval_seconds(),
            temperature_start: default_temperature_start(),
        }
    }
}
