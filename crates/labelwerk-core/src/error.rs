// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Labelwerk.

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

use crate::types::{PrinterId, RelayGroupId};

/// Top-level error type for all Labelwerk operations.
#[derive(Debug, Error)]
pub enum LabelwerkError {
    // -- Ingestion --
    #[error("cannot listen on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("read from {peer} timed out after {timeout:?}")]
    ReadTimeout { peer: SocketAddr, timeout: Duration },

    #[error("label server error: {0}")]
    PrintServer(String),

    // -- Rendering --
    #[error("rendering service request failed: {0}")]
    RenderService(String),

    #[error("document conversion failed: {0}")]
    DocumentConversion(String),

    // -- Delivery --
    #[error("raw printer transport failed: {0}")]
    Transport(String),

    #[error("IPP request failed: {0}")]
    IppRequest(String),

    #[error("printer returned IPP status 0x{0:04x}")]
    IppStatus(u16),

    #[error("malformed IPP response: {0} bytes (minimum 8)")]
    MalformedResponse(usize),

    #[error("print job {job_name} failed: {source}")]
    Print {
        job_name: String,
        #[source]
        source: Box<LabelwerkError>,
    },

    // -- Routing --
    #[error("no printer selected")]
    NoPrinterSelected,

    #[error("no relay group selected")]
    NoRelayGroupSelected,

    #[error("printer {0} not found")]
    PrinterNotFound(PrinterId),

    #[error("relay group {0} not found")]
    RelayGroupNotFound(RelayGroupId),

    // -- Configuration / persistence --
    #[error("configuration error: {0}")]
    Config(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, LabelwerkError>;
