// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the thermal-engine-sim project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Modbus server implementation for the engine simulator
//!
//! For avoiding confusion with the Modbus master/slave terminology, this module uses
//! the terms "server" and "client" instead. The server is the device that provides data,
//! while the client is the device that requests data.
//!
//! ## Register Map
//!
//! ### Holding Registers (Read/Write)
//!
//! | Register Address | Description | Values |
//! |-----------------|-------------|--------|
//! | 0 | Run command | 0 = stop, 1 = run, anything else is ignored |
//!
//! ### Input Registers (Read Only)
//!
//! | Register Address | Description | Scaling |
//! |-----------------|-------------|---------|
//! | 0 | Engine temperature | integer part, saturating at 65535 |
//!
//! ### Discrete Inputs (Read Only)
//!
//! | Address | Description |
//! |---------|-------------|
//! | 0 | Engine running |
//!
//! Every other address up to the configured block size is free storage.

use std::future;

use log::{debug, error};

use tokio_modbus::prelude::*;

use super::register_store::{RegisterError, RegisterGroup, RegisterStore};

/// A Modbus TCP service exposing the shared [`RegisterStore`].
///
/// One instance is created per client connection; all of them operate on the
/// same store, whose per-group locks serialize concurrent requests.
pub struct EngineModbusServer {
    store: RegisterStore,
}

impl tokio_modbus::server::Service for EngineModbusServer {
    type Request = Request<'static>;
    type Response = Response;
    type Exception = ExceptionCode;
    type Future = future::Ready<Result<Self::Response, Self::Exception>>;

    /// Process a Modbus request and provide a response
    ///
    /// This method handles different Modbus function codes:
    /// - 0x01: Read Coils
    /// - 0x02: Read Discrete Inputs
    /// - 0x03: Read Holding Registers
    /// - 0x04: Read Input Registers
    /// - 0x05: Write Single Coil
    /// - 0x06: Write Single Register
    /// - 0x0F: Write Multiple Coils
    /// - 0x10: Write Multiple Registers
    ///
    /// Any other function code will return an IllegalFunction exception.
    fn call(&self, req: Self::Request) -> Self::Future {
        debug!("Received Modbus request: {:?}", req);

        let res = match req {
            Request::ReadCoils(addr, cnt) => self
                .store
                .read_bits(RegisterGroup::Coils, addr, cnt)
                .map(Response::ReadCoils)
                .map_err(to_exception),
            Request::ReadDiscreteInputs(addr, cnt) => self
                .store
                .read_bits(RegisterGroup::DiscreteInputs, addr, cnt)
                .map(Response::ReadDiscreteInputs)
                .map_err(to_exception),
            Request::ReadHoldingRegisters(addr, cnt) => self
                .store
                .read_registers(RegisterGroup::HoldingRegisters, addr, cnt)
                .map(Response::ReadHoldingRegisters)
                .map_err(to_exception),
            Request::ReadInputRegisters(addr, cnt) => self
                .store
                .read_registers(RegisterGroup::InputRegisters, addr, cnt)
                .map(Response::ReadInputRegisters)
                .map_err(to_exception),
            Request::WriteSingleCoil(addr, value) => self
                .store
                .write_bits(RegisterGroup::Coils, addr, std::slice::from_ref(&value))
                .map(|_| Response::WriteSingleCoil(addr, value))
                .map_err(to_exception),
            Request::WriteMultipleCoils(addr, values) => self
                .store
                .write_bits(RegisterGroup::Coils, addr, &values)
                .map(|_| Response::WriteMultipleCoils(addr, values.len() as u16))
                .map_err(to_exception),
            Request::WriteSingleRegister(addr, value) => {
                debug!("Writing value {} to holding register {}", value, addr);
                self.store
                    .write_registers(
                        RegisterGroup::HoldingRegisters,
                        addr,
                        std::slice::from_ref(&value),
                    )
                    .map(|_| Response::WriteSingleRegister(addr, value))
                    .map_err(to_exception)
            }
            Request::WriteMultipleRegisters(addr, values) => {
                debug!(
                    "Writing {} values to holding registers starting from address {}",
                    values.len(),
                    addr
                );
                self.store
                    .write_registers(RegisterGroup::HoldingRegisters, addr, &values)
                    .map(|_| Response::WriteMultipleRegisters(addr, values.len() as u16))
                    .map_err(to_exception)
            }
            _ => {
                error!(
                    "Exception::IllegalFunction - Unimplemented function code in request: {req:?}"
                );
                Err(ExceptionCode::IllegalFunction)
            }
        };

        if let Err(e) = &res {
            error!("Modbus request error: {:?}", e);
        }

        future::ready(res)
    }
}

impl EngineModbusServer {
    /// Create a service operating on `store`
    pub fn new(store: RegisterStore) -> Self {
        Self { store }
    }
}

fn to_exception(err: RegisterError) -> ExceptionCode {
    error!("Register access rejected: {}", err);
    match err {
        RegisterError::OutOfRange { .. } => ExceptionCode::IllegalDataAddress,
        RegisterError::WrongKind { .. } => ExceptionCode::IllegalFunction,
    }
}
