// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the thermal-engine-sim project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Engine control endpoints
//!
//! | Method | Path                  | Body                      |
//! |--------|-----------------------|---------------------------|
//! | GET    | `/engine`, `/`        | none                      |
//! | POST   | `/engine/temperature` | `{"temperature": <f64>}`  |
//!
//! Both return `{"temperature": <f64>, "status": "running"|"stopped"}`.
//! Starting and stopping the engine is only possible through Modbus.
//!
//! Routing is a plain function over method, path and body so it can be tested
//! without a socket.

use log::{debug, warn};
use serde::Deserialize;
use serde_json::{json, Value};
use tiny_http::Method;

use crate::engine::{Engine, EngineState};

/// Message returned while no engine is attached
pub const NOT_INITIALIZED: &str = "Engine not initialized";

/// State shared by every request handler
#[derive(Debug, Clone, Default)]
pub struct ApiState {
    engine: Option<Engine>,
}

impl ApiState {
    pub fn new(engine: Engine) -> Self {
        Self {
            engine: Some(engine),
        }
    }

    /// State without an engine. Every endpoint answers with an error payload.
    pub fn uninitialized() -> Self {
        Self { engine: None }
    }
}

/// Status code and JSON body of a response
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    fn ok(body: Value) -> Self {
        Self { status: 200, body }
    }

    fn error(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            body: json!({ "error": message.into() }),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TemperatureUpdate {
    temperature: f64,
}

enum Endpoint {
    Engine,
    Temperature,
}

/// Dispatch one request
///
/// # Parameters
///
/// * `state` - Handler state holding the engine
/// * `method` - HTTP method of the request
/// * `path` - Request target; anything after `?` is ignored
/// * `body` - Raw request body
pub fn route(state: &ApiState, method: &Method, path: &str, body: &[u8]) -> ApiResponse {
    let path = path.split('?').next().unwrap_or_default();

    let endpoint = match path {
        "/" | "/engine" => Endpoint::Engine,
        "/engine/temperature" => Endpoint::Temperature,
        _ => return ApiResponse::error(404, format!("No route for {}", path)),
    };

    match (endpoint, method) {
        (Endpoint::Engine, Method::Get) => get_engine(state),
        (Endpoint::Temperature, Method::Post) => set_temperature(state, body),
        _ => ApiResponse::error(405, format!("Method {} not allowed on {}", method, path)),
    }
}

fn get_engine(state: &ApiState) -> ApiResponse {
    match &state.engine {
        Some(engine) => ApiResponse::ok(state_body(&engine.get_state())),
        None => not_initialized(),
    }
}

fn set_temperature(state: &ApiState, body: &[u8]) -> ApiResponse {
    let Some(engine) = &state.engine else {
        return not_initialized();
    };

    let update: TemperatureUpdate = match serde_json::from_slice(body) {
        Ok(update) => update,
        Err(e) => {
            warn!("Rejected temperature update: {}", e);
            return ApiResponse::error(422, format!("Invalid temperature payload: {}", e));
        }
    };

    match engine.set_temperature(update.temperature) {
        Ok(snapshot) => {
            debug!("Temperature set to {} over HTTP", snapshot.temperature);
            ApiResponse::ok(state_body(&snapshot))
        }
        Err(e) => ApiResponse::error(422, e.to_string()),
    }
}

// Not an HTTP failure: callers check for the `error` field
fn not_initialized() -> ApiResponse {
    ApiResponse::ok(json!({ "error": NOT_INITIALIZED }))
}

fn state_body(state: &EngineState) -> Value {
    json!({
        "temperature": state.temperature,
        "status": state.status.as_str(),
    })
}
