// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Raw TCP print client (JetDirect, port 9100).
//
// ZPL printers interpret the markup themselves: open a socket, write the
// label, close.  No protocol negotiation and no feedback.

use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::{debug, info, instrument};

use labelwerk_core::error::{LabelwerkError, Result};

/// Connect timeout for raw-socket printers.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Write `markup` to a raw-socket printer `copies` times on one connection.
///
/// `authority` is `host:port`.  Failures are not retried.
#[instrument(skip(markup), fields(bytes = markup.len()))]
pub async fn send_raw(authority: &str, markup: &[u8], copies: u32) -> Result<()> {
    let mut stream = tokio::time::timeout(CONNECT_TIMEOUT, TcpStream::connect(authority))
        .await
        .map_err(|_| {
            LabelwerkError::Transport(format!(
                "connection to {authority} timed out after {}s",
                CONNECT_TIMEOUT.as_secs()
            ))
        })?
        .map_err(|e| LabelwerkError::Transport(format!("connect to {authority}: {e}")))?;

    for copy in 0..copies.max(1) {
        stream
            .write_all(markup)
            .await
            .map_err(|e| LabelwerkError::Transport(format!("send to {authority}: {e}")))?;
        debug!(copy, "label written");
    }

    stream
        .flush()
        .await
        .map_err(|e| LabelwerkError::Transport(format!("flush {authority}: {e}")))?;
    stream
        .shutdown()
        .await
        .map_err(|e| LabelwerkError::Transport(format!("shutdown {authority}: {e}")))?;

    info!(authority, copies, "label sent via raw TCP");
    Ok(())
}
