// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the thermal-engine-sim project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Utility module for common utilities used throughout the project

pub mod shutdown;

// Re-exports for use in other modules
pub use shutdown::{shutdown_channel, wait_for_shutdown, ShutdownSignal, ShutdownTrigger};
