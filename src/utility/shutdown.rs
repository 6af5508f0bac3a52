// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the thermal-engine-sim project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Shutdown broadcast shared by every background task
//!
//! The daemon owns the sending half; each task receives a clone of the
//! [`ShutdownSignal`] and selects on [`wait_for_shutdown`] next to its own work.

use tokio::sync::watch;

/// Receiving half of the shutdown broadcast
pub type ShutdownSignal = watch::Receiver<bool>;

/// Sending half of the shutdown broadcast
pub type ShutdownTrigger = watch::Sender<bool>;

/// Create a new shutdown broadcast, initially not triggered
pub fn shutdown_channel() -> (ShutdownTrigger, ShutdownSignal) {
    watch::channel(false)
}

/// Resolve once shutdown has been requested.
///
/// A dropped trigger counts as a shutdown request so that orphaned tasks
/// never outlive their owner.
pub async fn wait_for_shutdown(signal: &mut ShutdownSignal) {
    let _ = signal.wait_for(|requested| *requested).await;
}
