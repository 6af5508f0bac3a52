// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the thermal-engine-sim project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Blocking HTTP server over a pre-bound listener

use std::io::Read;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use log::{debug, info, warn};
use tiny_http::{Header, Request, Response, Server};

use super::api::{route, ApiResponse, ApiState};

/// Largest request body read from a client
const MAX_BODY_BYTES: u64 = 64 * 1024;

/// HTTP server answering requests one at a time on the calling thread
pub struct HttpServer {
    server: Arc<Server>,
    local_addr: SocketAddr,
    state: ApiState,
    stopping: Arc<AtomicBool>,
}

/// Handle that makes a running [`HttpServer::serve`] return
#[derive(Clone)]
pub struct Unblocker {
    server: Arc<Server>,
    stopping: Arc<AtomicBool>,
}

impl Unblocker {
    pub fn unblock(&self) {
        self.stopping.store(true, Ordering::SeqCst);
        self.server.unblock();
    }
}

impl HttpServer {
    /// Wrap a listener that is already bound and listening
    pub fn from_listener(listener: std::net::TcpListener, state: ApiState) -> Result<Self> {
        let local_addr = listener
            .local_addr()
            .context("Failed to read HTTP listener address")?;
        let server = Server::from_listener(listener, None)
            .map_err(|e| anyhow!("Failed to start HTTP server on {}: {}", local_addr, e))?;

        Ok(Self {
            server: Arc::new(server),
            local_addr,
            state,
            stopping: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn unblocker(&self) -> Unblocker {
        Unblocker {
            server: Arc::clone(&self.server),
            stopping: Arc::clone(&self.stopping),
        }
    }

    /// Serve requests until [`Unblocker::unblock`] is called
    pub fn serve(self) {
        info!("HTTP server listening on http://{}", self.local_addr);

        while !self.stopping.load(Ordering::SeqCst) {
            match self.server.recv() {
                Ok(request) => self.handle(request),
                Err(e) if self.stopping.load(Ordering::SeqCst) => {
                    debug!("HTTP server unblocked: {}", e);
                }
                Err(e) => warn!("Failed to receive HTTP request: {}", e),
            }
        }

        info!("HTTP server on {} stopped", self.local_addr);
    }

    fn handle(&self, mut request: Request) {
        let mut body = Vec::new();
        if let Err(e) = request
            .as_reader()
            .take(MAX_BODY_BYTES)
            .read_to_end(&mut body)
        {
            warn!("Failed to read request body: {}", e);
            body.clear();
        }

        let method = request.method().clone();
        let url = request.url().to_string();
        let response = route(&self.state, &method, &url, &body);
        debug!("{} {} -> {}", method, url, response.status);

        if let Err(e) = request.respond(into_response(response)) {
            warn!("Failed to send HTTP response for {} {}: {}", method, url, e);
        }
    }
}

fn into_response(response: ApiResponse) -> Response<std::io::Cursor<Vec<u8>>> {
    let mut reply =
        Response::from_string(response.body.to_string()).with_status_code(response.status);
    if let Ok(header) = Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..]) {
        reply.add_header(header);
    }
    reply
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::net::{TcpListener, TcpStream};
    use std::time::Duration;

    fn raw_request(addr: SocketAddr, request: &str) -> String {
        let mut stream = TcpStream::connect(addr).unwrap();
        stream
            .set_read_timeout(Some(Duration::from_secs(5)))
            .unwrap();
        stream.write_all(request.as_bytes()).unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).unwrap();
        response
    }

    #[test]
    fn test_serves_json_until_unblocked() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let server = HttpServer::from_listener(listener, ApiState::uninitialized()).unwrap();
        let addr = server.local_addr();
        let unblocker = server.unblocker();
        let thread = std::thread::spawn(move || server.serve());

        let response = raw_request(
            addr,
            "GET /engine HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
        );
        assert!(response.starts_with("HTTP/1.1 200"));
        assert!(response
            .to_ascii_lowercase()
            .contains("content-type: application/json"));
        assert!(response.contains("Engine not initialized"));

        let missing = raw_request(
            addr,
            "GET /nope HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
        );
        assert!(missing.starts_with("HTTP/1.1 404"));

        unblocker.unblock();
        thread.join().unwrap();
    }

    #[test]
    fn test_unblock_before_serve_returns_immediately() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let server = HttpServer::from_listener(listener, ApiState::uninitialized()).unwrap();
        server.unblocker().unblock();
        server.serve();
    }
}
