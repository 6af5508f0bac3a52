// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the thermal-engine-sim project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Engine state snapshot and the per-tick thermal update

use std::fmt;

use serde::{Deserialize, Serialize};

/// Run status of the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineStatus {
    Stopped,
    Running,
}

impl EngineStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EngineStatus::Stopped => "stopped",
            EngineStatus::Running => "running",
        }
    }
}

impl fmt::Display for EngineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Consistent snapshot of the engine, as served by `GET /engine`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EngineState {
    /// Current simulated temperature, never negative
    pub temperature: f64,
    /// Run status; the only source of truth for "running"
    pub status: EngineStatus,
}

impl EngineState {
    pub fn new(temperature: f64) -> Self {
        Self {
            temperature,
            status: EngineStatus::Stopped,
        }
    }

    pub fn is_running(&self) -> bool {
        self.status == EngineStatus::Running
    }

    /// Apply one tick of the active progression.
    ///
    /// Heating adds `step` without upper bound. Cooling removes `step` while
    /// the temperature is above zero and floors at zero.
    ///
    /// Returns `true` when the temperature changed.
    pub(crate) fn advance(&mut self, step: f64) -> bool {
        match self.status {
            EngineStatus::Running => {
                self.temperature += step;
                step != 0.0
            }
            EngineStatus::Stopped => {
                if self.temperature > 0.0 {
                    let before = self.temperature;
                    self.temperature = (self.temperature - step).max(0.0);
                    self.temperature != before
                } else {
                    false
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&EngineStatus::Running).unwrap(),
            "\"running\""
        );
        assert_eq!(
            serde_json::to_string(&EngineStatus::Stopped).unwrap(),
            "\"stopped\""
        );
        assert_eq!(EngineStatus::Running.to_string(), "running");
    }

    #[test]
    fn test_heating_has_no_upper_bound() {
        let mut state = EngineState {
            temperature: 1.0e6,
            status: EngineStatus::Running,
        };
        assert!(state.advance(2.5));
        assert_eq!(state.temperature, 1.0e6 + 2.5);
    }

    #[test]
    fn test_cooling_floors_at_zero() {
        let mut state = EngineState::new(0.5);
        assert!(state.advance(2.0));
        assert_eq!(state.temperature, 0.0);

        // Already at the floor: nothing to do
        assert!(!state.advance(2.0));
        assert_eq!(state.temperature, 0.0);
    }
}
