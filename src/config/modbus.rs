// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the thermal-engine-sim project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Modbus TCP server configuration
//!
//! This module defines the structures for configuring the Modbus TCP server,
//! the register bridge polling it and the temperature mirror.

use serde::{Deserialize, Serialize};

/// Configuration for the Modbus TCP server component.
///
/// # Fields
///
/// * `enabled` - Flag to enable or disable the Modbus surface
/// * `port` - TCP port number for the Modbus server (default: 502)
/// * `address` - Network address for the Modbus server to bind to (default: 0.0.0.0)
/// * `register_count` - Size of every register group (default: 16)
/// * `poll_interval_ms` - Register bridge polling period (default: 500)
/// * `restart_delay_ms` - Delay before restarting a failed server (default: 2000)
/// * `mirror_temperature` - Copy the engine temperature into input register 0
///
/// # Example
///
/// ```
/// use thermal_engine_sim::config::ModbusConfig;
///
/// let modbus_config = ModbusConfig {
///     port: 5020,
///     address: "127.0.0.1".to_string(),
///     ..ModbusConfig::default()
/// };
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModbusConfig {
    /// Flag to enable or disable the Modbus server.
    ///
    /// When disabled the engine can only be observed and calibrated over
    /// HTTP; nothing will ever start it.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// The TCP port the Modbus server will listen on.
    ///
    /// Default value is 502, which is the standard Modbus TCP port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// The network address the Modbus server will bind to.
    ///
    /// Use "0.0.0.0" to bind to all IPv4 interfaces.
    #[serde(default = "default_address")]
    pub address: String,

    /// Number of coils, discrete inputs, holding registers and input
    /// registers. Valid range is 1-100.
    #[serde(default = "default_register_count")]
    pub register_count: u16,

    /// Period of the register bridge polling holding register 0.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Delay before the supervisor restarts a failed Modbus server.
    #[serde(default = "default_restart_delay_ms")]
    pub restart_delay_ms: u64,

    /// Mirror the engine temperature into input register 0 and the run flag
    /// into discrete input 0.
    #[serde(default = "default_mirror_temperature")]
    pub mirror_temperature: bool,
}

fn default_enabled() -> bool {
    true
}

fn default_port() -> u16 {
    502
}

fn default_address() -> String {
    "0.0.0.0".to_string()
}

fn default_register_count() -> u16 {
    16
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_restart_delay_ms() -> u64 {
    2000
}

fn default_mirror_temperature() -> bool {
    true
}

impl Default for ModbusConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            port: default_port(),
            address: default_address(),
            register_count: default_register_count(),
            poll_interval_ms: default_poll_interval_ms(),
            restart_delay_ms: default_restart_delay_ms(),
            mirror_temperature: default_mirror_temperature(),
        }
    }
}
