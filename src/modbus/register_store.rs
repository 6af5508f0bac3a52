// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the thermal-engine-sim project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! In-memory Modbus device context
//!
//! Four fixed-size sequential blocks starting at address 0: coils, discrete
//! inputs, holding registers and input registers. Each block sits behind its
//! own mutex, so a single read or write of one contiguous range is atomic;
//! nothing spans several calls.
//!
//! The same store is shared by the Modbus server (client requests), the
//! register bridge (run command polling) and the temperature mirror.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Holding register carrying the run/stop command (0 = stop, 1 = run)
pub const RUN_COMMAND_REGISTER: u16 = 0;

/// Input register mirroring the integer part of the engine temperature
pub const TEMPERATURE_REGISTER: u16 = 0;

/// Discrete input mirroring the engine run flag
pub const RUNNING_DISCRETE_INPUT: u16 = 0;

/// The four Modbus data tables
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterGroup {
    Coils,
    DiscreteInputs,
    HoldingRegisters,
    InputRegisters,
}

impl fmt::Display for RegisterGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RegisterGroup::Coils => "coils",
            RegisterGroup::DiscreteInputs => "discrete inputs",
            RegisterGroup::HoldingRegisters => "holding registers",
            RegisterGroup::InputRegisters => "input registers",
        };
        f.write_str(name)
    }
}

/// Error types for register store access
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RegisterError {
    #[error("{count} {group} starting at address {address} exceed the block size of {size}")]
    OutOfRange {
        group: RegisterGroup,
        address: u16,
        count: usize,
        size: usize,
    },
    #[error("{group} cannot be accessed with this operation")]
    WrongKind { group: RegisterGroup },
}

/// Shared register store. Cloning returns a handle on the same registers.
#[derive(Debug, Clone)]
pub struct RegisterStore {
    coils: Arc<Mutex<Vec<bool>>>,
    discrete_inputs: Arc<Mutex<Vec<bool>>>,
    holding_registers: Arc<Mutex<Vec<u16>>>,
    input_registers: Arc<Mutex<Vec<u16>>>,
    size: usize,
}

impl RegisterStore {
    /// Create a store with `size` zero-initialized entries in every group
    pub fn new(size: u16) -> Self {
        let size = usize::from(size);
        Self {
            coils: Arc::new(Mutex::new(vec![false; size])),
            discrete_inputs: Arc::new(Mutex::new(vec![false; size])),
            holding_registers: Arc::new(Mutex::new(vec![0; size])),
            input_registers: Arc::new(Mutex::new(vec![0; size])),
            size,
        }
    }

    /// Number of entries in every group
    pub fn size(&self) -> usize {
        self.size
    }

    /// Read `count` 16-bit registers starting at `address`
    pub fn read_registers(
        &self,
        group: RegisterGroup,
        address: u16,
        count: u16,
    ) -> Result<Vec<u16>, RegisterError> {
        let block = lock(self.word_block(group)?);
        let range = self.range(group, address, usize::from(count))?;
        Ok(block[range].to_vec())
    }

    /// Write `values` into consecutive 16-bit registers starting at `address`
    pub fn write_registers(
        &self,
        group: RegisterGroup,
        address: u16,
        values: &[u16],
    ) -> Result<(), RegisterError> {
        let mut block = lock(self.word_block(group)?);
        let range = self.range(group, address, values.len())?;
        block[range].copy_from_slice(values);
        Ok(())
    }

    /// Read `count` bits (coils or discrete inputs) starting at `address`
    pub fn read_bits(
        &self,
        group: RegisterGroup,
        address: u16,
        count: u16,
    ) -> Result<Vec<bool>, RegisterError> {
        let block = lock(self.bit_block(group)?);
        let range = self.range(group, address, usize::from(count))?;
        Ok(block[range].to_vec())
    }

    /// Write `values` into consecutive bits starting at `address`
    pub fn write_bits(
        &self,
        group: RegisterGroup,
        address: u16,
        values: &[bool],
    ) -> Result<(), RegisterError> {
        let mut block = lock(self.bit_block(group)?);
        let range = self.range(group, address, values.len())?;
        block[range].copy_from_slice(values);
        Ok(())
    }

    fn word_block(&self, group: RegisterGroup) -> Result<&Mutex<Vec<u16>>, RegisterError> {
        match group {
            RegisterGroup::HoldingRegisters => Ok(&self.holding_registers),
            RegisterGroup::InputRegisters => Ok(&self.input_registers),
            _ => Err(RegisterError::WrongKind { group }),
        }
    }

    fn bit_block(&self, group: RegisterGroup) -> Result<&Mutex<Vec<bool>>, RegisterError> {
        match group {
            RegisterGroup::Coils => Ok(&self.coils),
            RegisterGroup::DiscreteInputs => Ok(&self.discrete_inputs),
            _ => Err(RegisterError::WrongKind { group }),
        }
    }

    fn range(
        &self,
        group: RegisterGroup,
        address: u16,
        count: usize,
    ) -> Result<std::ops::Range<usize>, RegisterError> {
        let start = usize::from(address);
        match start.checked_add(count) {
            Some(end) if count > 0 && end <= self.size => Ok(start..end),
            _ => Err(RegisterError::OutOfRange {
                group,
                address,
                count,
                size: self.size,
            }),
        }
    }
}

// Blocks only hold plain integers, a panic while holding the lock cannot leave them inconsistent
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
