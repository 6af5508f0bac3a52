// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the thermal-engine-sim project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Modbus communication module
//!
//! This module provides the Modbus TCP control surface of the engine
//! simulator: external systems start and stop the engine by writing holding
//! register 0, and read the mirrored temperature from input register 0.
//!
//! ## Key Components
//!
//! - `RegisterStore`: the shared in-memory device context
//! - `EngineModbusServer`: the Modbus service answering client requests
//! - `ModbusSupervisor`: keeps the TCP server bound, restarting it forever
//! - `RegisterBridge`: polls the run command and drives the engine
//! - `TemperatureMirror`: copies engine state into the input registers
//!
//! ## Register Map
//!
//! ### Holding Registers (Read/Write)
//!
//! - Register 0: Run command (0 = stop, 1 = run)
//!
//! ### Input Registers (Read-Only)
//!
//! - Register 0: Engine temperature (integer part)
//!
//! ### Discrete Inputs (Read-Only)
//!
//! - Input 0: Engine running

pub mod bridge;
pub mod mirror;
pub mod modbus_server;
pub mod register_store;
pub mod supervisor;

pub use bridge::{BridgeAction, RegisterBridge};
pub use mirror::TemperatureMirror;
pub use modbus_server::EngineModbusServer;
pub use register_store::{RegisterError, RegisterGroup, RegisterStore};
pub use supervisor::ModbusSupervisor;
