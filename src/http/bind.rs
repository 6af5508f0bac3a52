// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the thermal-engine-sim project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Resilient bind for the HTTP listener
//!
//! The listening socket is created, marked for address reuse, bound and put in
//! listening state here, then handed to the HTTP server as is. Nothing can take
//! the port between the bind and the first accept. A bounded number of
//! attempts with a fixed pause absorbs a port that is briefly still in use.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use log::{error, info, warn};
use tokio::net::TcpSocket;
use tokio::time;

use crate::config::HttpConfig;

const LISTEN_BACKLOG: u32 = 1024;

/// How often and how patiently the bind is retried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BindRetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl Default for BindRetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 5,
            delay: Duration::from_secs(2),
        }
    }
}

impl From<&HttpConfig> for BindRetryPolicy {
    fn from(config: &HttpConfig) -> Self {
        Self {
            attempts: config.bind_attempts,
            delay: Duration::from_millis(config.bind_retry_delay_ms),
        }
    }
}

/// Error types for the resilient bind
#[derive(thiserror::Error, Debug)]
pub enum BindError {
    #[error("Failed to bind {addr} after {attempts} attempts: {source}")]
    Exhausted {
        addr: SocketAddr,
        attempts: u32,
        #[source]
        source: io::Error,
    },
}

/// Bind a listening socket on `addr`, retrying according to `policy`.
///
/// Must be called from within a Tokio runtime.
///
/// # Returns
///
/// A blocking `std::net::TcpListener` that is already listening.
///
/// # Errors
///
/// [`BindError::Exhausted`] carrying the last bind error once every attempt
/// failed. Callers treat it as fatal.
pub async fn bind_with_retry(
    addr: SocketAddr,
    policy: &BindRetryPolicy,
) -> Result<std::net::TcpListener, BindError> {
    let attempts = policy.attempts.max(1);
    let mut attempt = 1;

    loop {
        match bind_listener(addr) {
            Ok(listener) => {
                info!("HTTP listener bound on {} (attempt {})", addr, attempt);
                return Ok(listener);
            }
            Err(e) if attempt < attempts => {
                warn!(
                    "Bind attempt {}/{} on {} failed: {}. Retrying in {:?}",
                    attempt, attempts, addr, e, policy.delay
                );
                time::sleep(policy.delay).await;
                attempt += 1;
            }
            Err(e) => {
                error!("Giving up binding {} after {} attempts: {}", addr, attempts, e);
                return Err(BindError::Exhausted {
                    addr,
                    attempts,
                    source: e,
                });
            }
        }
    }
}

fn bind_listener(addr: SocketAddr) -> io::Result<std::net::TcpListener> {
    let socket = if addr.is_ipv4() {
        TcpSocket::new_v4()?
    } else {
        TcpSocket::new_v6()?
    };
    socket.set_reuseaddr(true)?;
    socket.bind(addr)?;
    let listener = socket.listen(LISTEN_BACKLOG)?.into_std()?;
    listener.set_nonblocking(false)?;
    Ok(listener)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn policy(attempts: u32, delay_ms: u64) -> BindRetryPolicy {
        BindRetryPolicy {
            attempts,
            delay: Duration::from_millis(delay_ms),
        }
    }

    #[test]
    fn test_policy_from_config() {
        let policy = BindRetryPolicy::from(&HttpConfig::default());
        assert_eq!(policy, BindRetryPolicy::default());
    }

    #[tokio::test]
    async fn test_binds_free_port_first_try() {
        let listener = bind_with_retry("127.0.0.1:0".parse().unwrap(), &policy(1, 10))
            .await
            .unwrap();
        let addr = listener.local_addr().unwrap();
        assert_ne!(addr.port(), 0);

        // Already listening: a client can connect before anyone accepts
        assert!(std::net::TcpStream::connect(addr).is_ok());
    }

    #[tokio::test]
    async fn test_succeeds_once_port_is_released() {
        let blocker = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = blocker.local_addr().unwrap();
        let release = tokio::spawn(async move {
            time::sleep(Duration::from_millis(150)).await;
            drop(blocker);
        });

        let listener = bind_with_retry(addr, &policy(5, 100)).await.unwrap();
        assert_eq!(listener.local_addr().unwrap(), addr);
        release.await.unwrap();
    }

    #[tokio::test]
    async fn test_exhausted_attempts_are_reported() {
        let blocker = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = blocker.local_addr().unwrap();

        let started = Instant::now();
        let err = bind_with_retry(addr, &policy(3, 20)).await.unwrap_err();
        let BindError::Exhausted {
            addr: failed,
            attempts,
            ..
        } = err;
        assert_eq!(failed, addr);
        assert_eq!(attempts, 3);
        // Two pauses between three attempts
        assert!(started.elapsed() >= Duration::from_millis(40));
        drop(blocker);
    }
}
