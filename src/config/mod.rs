// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the thermal-engine-sim project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Configuration management for the engine simulator
//!
//! This module provides functionality for loading, validating, and applying
//! configuration settings. The configuration can be backed by an optional YAML
//! file; command line flags override whatever the file contains.
//!
//! ## Configuration Structure
//!
//! - `engine`: Temperature step, tick interval and start temperature
//! - `http`: Settings for the HTTP control surface and its resilient bind
//! - `modbus`: Settings for the Modbus TCP server, register bridge and mirror
//!
//! ## Usage
//!
//! ```no_run
//! use thermal_engine_sim::config::Config;
//! use std::path::Path;
//!
//! // Load config from file, creates a default if not found
//! let mut config = Config::from_file(Path::new("engine.yaml")).unwrap();
//!
//! // Apply command line overrides if needed
//! config.apply_args(
//!     Some("127.0.0.1".to_string()), // HTTP interface
//!     Some(8001),                    // HTTP port
//!     Some(0.5),                     // Temperature step
//!     None,                          // Tick interval
//!     Some(20.0),                    // Start temperature
//!     None,                          // Enable Modbus
//!     None,                          // Modbus address
//!     Some(5020),                    // Modbus port
//! );
//!
//! println!("HTTP port: {}", config.http.port);
//! ```

pub mod engine;
pub mod http;
pub mod modbus;
pub mod utils;

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use log::{debug, error};
use serde::{Deserialize, Serialize};

pub use engine::EngineConfig;
pub use http::HttpConfig;
pub use modbus::ModbusConfig;
pub use utils::{is_valid_ip_address, resolve_socket_addr};

/// Root configuration structure for the engine simulator.
///
/// Every section falls back to its defaults when it is missing from the YAML
/// file, so an empty file is a valid configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Parameters of the simulated engine.
    #[serde(default)]
    pub engine: EngineConfig,

    /// HTTP control surface settings.
    #[serde(default)]
    pub http: HttpConfig,

    /// Modbus TCP surface settings.
    #[serde(default)]
    pub modbus: ModbusConfig,
}

impl Config {
    /// Helper method to create a sample config file when validation fails
    fn create_sample_config<P: AsRef<Path>>(path: P) -> Result<()> {
        let sample_path = path.as_ref().with_extension("sample.yaml");
        debug!("Creating sample configuration file at {:?}", sample_path);

        Self::default()
            .save_to_file(&sample_path)
            .with_context(|| format!("Failed to save sample config to {:?}", sample_path))?;

        error!(
            "Sample configuration file created at {:?}\nPlease edit and rename it",
            sample_path
        );
        Ok(())
    }

    /// Load configuration from a file
    ///
    /// A missing file is created with the default configuration. A file that
    /// does not parse or does not validate produces an error and a
    /// `*.sample.yaml` file next to it.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!(
                "Configuration file not found at {:?}, creating default",
                path
            );
            let default_config = Self::default();
            default_config.save_to_file(path)?;
            return Ok(default_config);
        }

        debug!("Loading configuration from {:?}", path);
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file at {:?}", path))?;

        let config: Config = match serde_yml::from_str(&contents) {
            Ok(config) => config,
            Err(err) => {
                error!("Configuration deserialization error: {}", err);
                if let Err(e) = Self::create_sample_config(path) {
                    error!("Failed to create sample config: {}", e);
                }
                return Err(anyhow::anyhow!(
                    "Failed to deserialize configuration from {}: {}",
                    path.display(),
                    err
                ));
            }
        };

        if let Err(err) = config.validate() {
            error!("Configuration specific validation error: {}", err);
            Self::create_sample_config(path)?;
            return Err(err);
        }

        Ok(config)
    }

    /// Save the configuration to a file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml =
            serde_yml::to_string(self).context("Failed to serialize configuration to YAML")?;

        let mut file = File::create(path.as_ref())
            .with_context(|| format!("Failed to create config file at {:?}", path.as_ref()))?;

        file.write_all(yaml.as_bytes())
            .with_context(|| format!("Failed to write configuration to {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Check the rules serde cannot express (finite numbers, addresses,
    /// register sizes).
    pub fn validate(&self) -> Result<()> {
        utils::validate_specific_rules(self)
    }

    /// Apply command line arguments to override configuration values.
    ///
    /// Only arguments that were explicitly provided override the existing
    /// configuration.
    ///
    /// # Parameters
    ///
    /// * `http_address` - Interface for the HTTP control surface
    /// * `http_port` - TCP port for the HTTP control surface
    /// * `temperature_step` - Temperature change per tick
    /// * `interval_seconds` - Tick period in seconds
    /// * `temperature_start` - Initial engine temperature
    /// * `modbus_enabled` - Optional flag to enable/disable the Modbus surface
    /// * `modbus_address` - Optional network address for the Modbus server
    /// * `modbus_port` - Optional TCP port for the Modbus server
    #[allow(clippy::too_many_arguments)]
    pub fn apply_args(
        &mut self,
        http_address: Option<String>,
        http_port: Option<u16>,
        temperature_step: Option<f64>,
        interval_seconds: Option<f64>,
        temperature_start: Option<f64>,
        modbus_enabled: Option<bool>,
        modbus_address: Option<String>,
        modbus_port: Option<u16>,
    ) {
        if let Some(address) = http_address {
            debug!("Overriding HTTP interface from command line: {}", address);
            self.http.address = address;
        }
        if let Some(port) = http_port {
            debug!("Overriding HTTP port from command line: {}", port);
            self.http.port = port;
        }

        if let Some(step) = temperature_step {
            debug!("Overriding temperature step from command line: {}", step);
            self.engine.temperature_step = step;
        }
        if let Some(seconds) = interval_seconds {
            debug!("Overriding tick interval from command line: {}s", seconds);
            self.engine.interval_seconds = seconds;
        }
        if let Some(start) = temperature_start {
            debug!("Overriding start temperature from command line: {}", start);
            self.engine.temperature_start = start;
        }

        if let Some(enabled) = modbus_enabled {
            debug!("Overriding Modbus enabled from command line: {}", enabled);
            self.modbus.enabled = enabled;
        }
        if let Some(address) = modbus_address {
            debug!("Overriding Modbus address from command line: {}", address);
            self.modbus.address = address;
        }
        if let Some(port) = modbus_port {
            debug!("Overriding Modbus port from command line: {}", port);
            self.modbus.port = port;
        }
    }
}
