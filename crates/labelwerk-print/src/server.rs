// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Emulated label printer — the TCP listener that label software prints to.
//
// Clients connect exactly as they would to a Zebra printer on port 9100 and
// write raw ZPL.  Each connection is read line by line until the client
// closes, a fixed deadline measured from the moment the connection was
// accepted passes, or the payload cap is reached.  Whatever was read is then
// handed to the dispatcher in one piece, even after a timeout.
//
// The routing state (mode, selected printer, relay group, render settings)
// lives in a watch channel.  Each connection takes a snapshot at accept time,
// so changing the routing never affects a label that is already in flight.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{Notify, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use labelwerk_core::error::{LabelwerkError, Result};
use labelwerk_core::types::{RoutingState, ServerStatus};

use crate::dispatcher::Dispatcher;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Read deadline measured from connection accept.
pub const READ_DEADLINE: Duration = Duration::from_secs(5);

/// Maximum bytes accepted from one connection.
pub const MAX_PAYLOAD_BYTES: usize = 16 * 1024 * 1024; // 16 MiB

/// How long `stop()` waits for in-flight connections.
pub const STOP_GRACE: Duration = Duration::from_secs(1);

/// Connect timeout used by [`probe_listener`].
const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

// ---------------------------------------------------------------------------
// Payload reading
// ---------------------------------------------------------------------------

/// Why reading a connection stopped.
#[derive(Debug)]
pub enum ReadEnd {
    /// The client closed its side.
    Eof,
    /// The read deadline passed.
    Deadline,
    /// The payload cap was reached.
    Limit,
    /// The socket failed.
    Failed(std::io::Error),
}

/// Read lines until end-of-stream, `deadline`, or `limit` bytes.
///
/// Bytes of an unfinished final line are kept.
pub async fn read_payload<R>(reader: R, deadline: Instant, limit: usize) -> (Vec<u8>, ReadEnd)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader.take(limit as u64));
    let mut buf = Vec::with_capacity(8192);

    let end = loop {
        match tokio::time::timeout_at(deadline, reader.read_until(b'\n', &mut buf)).await {
            Err(_) => break ReadEnd::Deadline,
            Ok(Ok(0)) if buf.len() >= limit => break ReadEnd::Limit,
            Ok(Ok(0)) => break ReadEnd::Eof,
            Ok(Ok(_)) => continue,
            Ok(Err(e)) => break ReadEnd::Failed(e),
        }
    };
    (buf, end)
}

// ---------------------------------------------------------------------------
// Connection tracking
// ---------------------------------------------------------------------------

/// State shared with connection tasks.
struct SharedState {
    dispatcher: Arc<Dispatcher>,
    active_connections: Arc<AtomicU32>,
    /// Signalled whenever the last active connection finishes.
    drained: Arc<Notify>,
}

/// Counts a connection as active for as long as it lives.
struct ConnectionGuard {
    active: Arc<AtomicU32>,
    drained: Arc<Notify>,
}

impl ConnectionGuard {
    fn new(state: &SharedState) -> Self {
        state.active_connections.fetch_add(1, Ordering::SeqCst);
        Self {
            active: Arc::clone(&state.active_connections),
            drained: Arc::clone(&state.drained),
        }
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        if self.active.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.drained.notify_waiters();
        }
    }
}

// ---------------------------------------------------------------------------
// LabelServer
// ---------------------------------------------------------------------------

/// The emulated raw-socket label printer.
pub struct LabelServer {
    /// Interface to bind, e.g. `127.0.0.1` or `0.0.0.0`.
    bind_host: String,
    /// Port to listen on (0 for an ephemeral port).
    port: u16,
    /// Current lifecycle state.
    status: ServerStatus,
    /// Receives every connection payload.
    dispatcher: Arc<Dispatcher>,
    /// Routing for newly accepted connections; each one takes a snapshot.
    routing: watch::Sender<RoutingState>,
    /// Signal used to stop the accept loop.
    shutdown_signal: Arc<Notify>,
    /// Handle to the accept loop task.
    task_handle: Option<JoinHandle<()>>,
    /// Connections still being read or dispatched.
    active_connections: Arc<AtomicU32>,
    /// Notified when `active_connections` drops to zero.
    drained: Arc<Notify>,
    /// Bound address while running.
    local_addr: Option<SocketAddr>,
}

impl LabelServer {
    /// Create a stopped server.  Call [`start`](Self::start) to listen.
    pub fn new(
        bind_host: impl Into<String>,
        port: u16,
        dispatcher: Arc<Dispatcher>,
        routing: RoutingState,
    ) -> Self {
        let (routing, _) = watch::channel(routing);
        Self {
            bind_host: bind_host.into(),
            port,
            status: ServerStatus::Stopped,
            dispatcher,
            routing,
            shutdown_signal: Arc::new(Notify::new()),
            task_handle: None,
            active_connections: Arc::new(AtomicU32::new(0)),
            drained: Arc::new(Notify::new()),
            local_addr: None,
        }
    }

    /// Configured port (0 picks an ephemeral port on start).
    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn status(&self) -> ServerStatus {
        self.status
    }

    /// Number of connections currently being read or dispatched.
    pub fn active_connections(&self) -> u32 {
        self.active_connections.load(Ordering::SeqCst)
    }

    /// Address the listener is bound to while running.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Replace the routing state for connections accepted from now on.
    pub fn set_routing(&self, routing: RoutingState) {
        self.routing.send_replace(routing);
        debug!("routing state updated");
    }

    /// Current routing state.
    pub fn routing(&self) -> RoutingState {
        self.routing.borrow().clone()
    }

    /// Bind the listener and start accepting connections.
    ///
    /// # Errors
    ///
    /// `Bind` when the address is in use or otherwise unavailable; the server
    /// is left in `Error` state and can be started again.
    pub async fn start(&mut self) -> Result<SocketAddr> {
        if let (ServerStatus::Running, Some(addr)) = (self.status, self.local_addr) {
            debug!(%addr, "label server already running");
            return Ok(addr);
        }

        self.status = ServerStatus::Starting;

        let bind_addr = match resolve_bind_addr(&self.bind_host, self.port).await {
            Ok(addr) => addr,
            Err(e) => {
                self.status = ServerStatus::Error;
                return Err(e);
            }
        };

        let listener = match TcpListener::bind(bind_addr).await {
            Ok(listener) => listener,
            Err(source) => {
                self.status = ServerStatus::Error;
                error!(addr = %bind_addr, error = %source, "cannot start label server");
                return Err(LabelwerkError::Bind {
                    addr: bind_addr,
                    source,
                });
            }
        };
        let local_addr = listener.local_addr().unwrap_or(bind_addr);

        info!(addr = %local_addr, "label server listening");

        self.shutdown_signal = Arc::new(Notify::new());
        let shutdown = Arc::clone(&self.shutdown_signal);
        let shared = Arc::new(SharedState {
            dispatcher: Arc::clone(&self.dispatcher),
            active_connections: Arc::clone(&self.active_connections),
            drained: Arc::clone(&self.drained),
        });
        let routing = self.routing.subscribe();

        let handle = tokio::spawn(async move {
            Self::accept_loop(listener, shutdown, routing, shared).await;
        });

        self.task_handle = Some(handle);
        self.local_addr = Some(local_addr);
        self.status = ServerStatus::Running;
        Ok(local_addr)
    }

    /// Stop accepting connections and give in-flight ones a short grace period.
    ///
    /// The listening socket is closed before this returns.  Connections still
    /// running after [`STOP_GRACE`] are left to finish on their own.
    pub async fn stop(&mut self) -> Result<()> {
        let Some(handle) = self.task_handle.take() else {
            self.status = ServerStatus::Stopped;
            return Ok(());
        };

        info!(addr = ?self.local_addr, "stopping label server");
        self.shutdown_signal.notify_one();
        handle
            .await
            .map_err(|e| LabelwerkError::PrintServer(format!("accept loop join: {e}")))?;

        let deadline = Instant::now() + STOP_GRACE;
        loop {
            let drained = self.drained.notified();
            tokio::pin!(drained);
            drained.as_mut().enable();

            let remaining = self.active_connections();
            if remaining == 0 {
                break;
            }
            if tokio::time::timeout_at(deadline, drained).await.is_err() {
                warn!(remaining, "connections still active after grace period");
                break;
            }
        }

        self.local_addr = None;
        self.status = ServerStatus::Stopped;
        info!("label server stopped");
        Ok(())
    }

    /// Stop, switch to `port`, and start again.
    pub async fn restart(&mut self, port: u16) -> Result<SocketAddr> {
        self.stop().await?;
        self.port = port;
        self.start().await
    }

    /// Runs until the shutdown signal; dropping the listener closes the socket.
    async fn accept_loop(
        listener: TcpListener,
        shutdown: Arc<Notify>,
        routing: watch::Receiver<RoutingState>,
        shared: Arc<SharedState>,
    ) {
        loop {
            tokio::select! {
                _ = shutdown.notified() => {
                    debug!("accept loop received shutdown signal");
                    break;
                }

                accept_result = listener.accept() => {
                    match accept_result {
                        Ok((stream, peer)) => {
                            let started = Instant::now();
                            let snapshot = routing.borrow().clone();
                            let guard = ConnectionGuard::new(&shared);
                            let dispatcher = Arc::clone(&shared.dispatcher);
                            debug!(%peer, mode = ?snapshot.mode, "connection accepted");
                            tokio::spawn(async move {
                                let _guard = guard;
                                handle_connection(stream, peer, started, snapshot, dispatcher).await;
                            });
                        }
                        Err(e) => {
                            error!(error = %e, "failed to accept connection");
                        }
                    }
                }
            }
        }
    }
}

/// Read one connection to completion and dispatch what arrived.
async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    started: Instant,
    routing: RoutingState,
    dispatcher: Arc<Dispatcher>,
) {
    let (payload, end) = read_payload(stream, started + READ_DEADLINE, MAX_PAYLOAD_BYTES).await;

    match end {
        ReadEnd::Eof => {}
        ReadEnd::Deadline => {
            let e = LabelwerkError::ReadTimeout {
                peer,
                timeout: READ_DEADLINE,
            };
            warn!(%peer, bytes = payload.len(), error = %e, "dispatching what was read");
        }
        ReadEnd::Limit => {
            warn!(%peer, limit = MAX_PAYLOAD_BYTES, "payload cap reached, ignoring the rest");
        }
        ReadEnd::Failed(e) => {
            warn!(%peer, bytes = payload.len(), error = %e, "read failed, dispatching what was read");
        }
    }

    if payload.is_empty() {
        debug!(%peer, "empty connection");
        return;
    }

    info!(%peer, bytes = payload.len(), "received label data");
    let text = String::from_utf8_lossy(&payload);
    dispatcher.dispatch(&text, &routing).await;
}

async fn resolve_bind_addr(host: &str, port: u16) -> Result<SocketAddr> {
    tokio::net::lookup_host((host, port))
        .await
        .map_err(|e| LabelwerkError::PrintServer(format!("resolve bind host {host}: {e}")))?
        .next()
        .ok_or_else(|| LabelwerkError::PrintServer(format!("bind host {host} has no address")))
}

/// Whether something accepts TCP connections on `host:port`.
pub async fn probe_listener(host: &str, port: u16) -> bool {
    matches!(
        tokio::time::timeout(PROBE_TIMEOUT, TcpStream::connect((host, port))).await,
        Ok(Ok(_))
    )
}
