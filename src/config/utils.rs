// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the thermal-engine-sim project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Configuration utilities
//!
//! This module provides utility functions for working with configuration
//! settings: address checks, socket address resolution and the validation
//! rules that serde alone cannot express.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use anyhow::{anyhow, bail, Result};
use log::debug;

use super::Config;
use crate::engine::MAX_TICK_INTERVAL;

/// Largest register group a deployment may declare
pub const MAX_REGISTER_COUNT: u16 = 100;

/// Check if a string is a valid IP address
///
/// Validates that a string represents a valid IPv4 or IPv6 address,
/// or is one of the special values like "localhost" or "0.0.0.0".
///
/// # Arguments
///
/// * `addr` - The address string to validate
///
/// # Returns
///
/// `true` if the address is valid, `false` otherwise
pub fn is_valid_ip_address(addr: &str) -> bool {
    if addr.parse::<IpAddr>().is_ok() {
        return true;
    }

    // Special cases
    matches!(addr, "localhost" | "::" | "::0" | "0.0.0.0")
}

/// Build a socket address from an interface string and a port.
///
/// "localhost" resolves to the IPv4 loopback; every other value must be a
/// literal IPv4 or IPv6 address.
pub fn resolve_socket_addr(address: &str, port: u16) -> Result<SocketAddr> {
    let ip = if address == "localhost" {
        IpAddr::V4(Ipv4Addr::LOCALHOST)
    } else {
        address
            .parse::<IpAddr>()
            .map_err(|e| anyhow!("Invalid interface address '{}': {}", address, e))?
    };
    Ok(SocketAddr::new(ip, port))
}

/// Validates the configuration against rules that aren't covered by serde.
///
/// # Arguments
///
/// * `config` - The configuration object to validate
///
/// # Returns
///
/// * `Ok(())` if all validations pass
/// * `Err(anyhow::Error)` with descriptive message if any validation fails
pub fn validate_specific_rules(config: &Config) -> Result<()> {
    debug!("Validating engine section");
    let engine = &config.engine;
    if !engine.temperature_step.is_finite() || engine.temperature_step < 0.0 {
        bail!(
            "engine.temperature_step must be a finite, non-negative number (got {})",
            engine.temperature_step
        );
    }
    if !engine.interval_seconds.is_finite() || engine.interval_seconds <= 0.0 {
        bail!(
            "engine.interval_seconds must be a finite, strictly positive number (got {})",
            engine.interval_seconds
        );
    }
    if engine.interval_seconds > MAX_TICK_INTERVAL.as_secs_f64() {
        bail!(
            "engine.interval_seconds must not exceed {} (got {})",
            MAX_TICK_INTERVAL.as_secs(),
            engine.interval_seconds
        );
    }
    if !engine.temperature_start.is_finite() || engine.temperature_start < 0.0 {
        bail!(
            "engine.temperature_start must be a finite, non-negative number (got {})",
            engine.temperature_start
        );
    }

    debug!("Validating http section");
    if !is_valid_ip_address(&config.http.address) {
        bail!("http.address is not a valid IP address: {}", config.http.address);
    }
    if config.http.bind_attempts == 0 {
        bail!("http.bind_attempts must be at least 1");
    }

    debug!("Validating modbus section");
    let modbus = &config.modbus;
    if !is_valid_ip_address(&modbus.address) {
        bail!("modbus.address is not a valid IP address: {}", modbus.address);
    }
    if modbus.register_count == 0 || modbus.register_count > MAX_REGISTER_COUNT {
        bail!(
            "modbus.register_count must be between 1 and {} (got {})",
            MAX_REGISTER_COUNT,
            modbus.register_count
        );
    }
    if modbus.poll_interval_ms == 0 {
        bail!("modbus.poll_interval_ms must be greater than 0");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_valid_ip_address() {
        assert!(is_valid_ip_address("0.0.0.0"));
        assert!(is_valid_ip_address("127.0.0.1"));
        assert!(is_valid_ip_address("::1"));
        assert!(is_valid_ip_address("localhost"));
        assert!(!is_valid_ip_address("not-an-address"));
        assert!(!is_valid_ip_address("256.0.0.1"));
    }

    #[test]
    fn test_resolve_socket_addr() {
        let addr = resolve_socket_addr("localhost", 8000).unwrap();
        assert_eq!(addr, "127.0.0.1:8000".parse().unwrap());

        let addr = resolve_socket_addr("::1", 502).unwrap();
        assert_eq!(addr, "[::1]:502".parse().unwrap());

        assert!(resolve_socket_addr("example.invalid", 80).is_err());
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_specific_rules(&Config::default()).is_ok());
    }

    #[test]
    fn test_rejects_invalid_engine_values() {
        let mut config = Config::default();
        config.engine.interval_seconds = 0.0;
        assert!(validate_specific_rules(&config).is_err());

        let mut config = Config::default();
        config.engine.temperature_step = f64::NAN;
        assert!(validate_specific_rules(&config).is_err());

        let mut config = Config::default();
        config.engine.temperature_start = -5.0;
        assert!(validate_specific_rules(&config).is_err());
    }

    #[test]
    fn test_rejects_overlong_interval() {
        let mut config = Config::default();
        config.engine.interval_seconds = 1.0e19;
        assert!(validate_specific_rules(&config).is_err());

        config.engine.interval_seconds = 86_400.0;
        assert!(validate_specific_rules(&config).is_ok());
    }

    #[test]
    fn test_rejects_invalid_register_count() {
        let mut config = Config::default();
        config.modbus.register_count = 0;
        assert!(validate_specific_rules(&config).is_err());

        config.modbus.register_count = MAX_REGISTER_COUNT + 1;
        assert!(validate_specific_rules(&config).is_err());

        config.modbus.register_count = MAX_REGISTER_COUNT;
        assert!(validate_specific_rules(&config).is_ok());
    }

    #[test]
    fn test_rejects_invalid_addresses() {
        let mut config = Config::default();
        config.http.address = "nowhere".to_string();
        assert!(validate_specific_rules(&config).is_err());

        let mut config = Config::default();
        config.modbus.address = "nowhere".to_string();
        assert!(validate_specific_rules(&config).is_err());
    }
}
