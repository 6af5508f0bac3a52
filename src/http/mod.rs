// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the thermal-engine-sim project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! HTTP control surface
//!
//! Reads and calibrates the engine temperature. The listening socket comes
//! from [`bind::bind_with_retry`] and is served by [`server::HttpServer`] on a
//! dedicated blocking thread.

pub mod api;
pub mod bind;
pub mod server;

pub use api::{route, ApiResponse, ApiState};
pub use bind::{bind_with_retry, BindError, BindRetryPolicy};
pub use server::{HttpServer, Unblocker};
