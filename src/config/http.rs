// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the thermal-engine-sim project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! HTTP control surface configuration

use serde::{Deserialize, Serialize};

/// Configuration for the HTTP control surface.
///
/// # Fields
///
/// * `address` - Interface the HTTP listener binds to (default: 0.0.0.0)
/// * `port` - TCP port of the HTTP listener (default: 8000)
/// * `bind_attempts` - How many times the listener bind is attempted (default: 5)
/// * `bind_retry_delay_ms` - Pause between two bind attempts (default: 2000)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpConfig {
    /// The network address the HTTP server will bind to.
    ///
    /// Can be an IPv4/IPv6 address or "localhost".
    #[serde(default = "default_address")]
    pub address: String,

    /// The TCP port the HTTP server will listen on. Port 0 lets the
    /// operating system pick a free port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Number of bind attempts before giving up. Exhausting them is fatal.
    #[serde(default = "default_bind_attempts")]
    pub bind_attempts: u32,

    /// Fixed delay between bind attempts, in milliseconds.
    #[serde(default = "default_bind_retry_delay_ms")]
    pub bind_retry_delay_ms: u64,
}

fn default_address() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_bind_attempts() -> u32 {
    5
}

fn default_bind_retry_delay_ms() -> u64 {
    2000
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            port: default_port(),
            bind_attempts: default_bind_attempts(),
            bind_retry_delay_ms: default_bind_retry_delay_ms(),
        }
    }
}
