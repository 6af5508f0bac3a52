// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the thermal-engine-sim project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Thermal engine simulator library
//!
//! A simulated engine whose temperature rises while it runs and falls back to
//! zero while it is stopped. It is observed and calibrated over a small JSON
//! HTTP API and started or stopped through a Modbus TCP holding register.
//!
//! ## Modules
//!
//! * [`engine`] - The thermal state machine and its progression task
//! * [`modbus`] - Register store, Modbus TCP service, run command bridge and
//!   temperature mirror
//! * [`http`] - Resilient bind and the JSON control surface
//! * [`daemon`] - Starts and stops every task
//! * [`config`] - YAML configuration and command line overrides

pub mod config;
pub mod daemon;
pub mod engine;
pub mod http;
pub mod modbus;
pub mod utility;
