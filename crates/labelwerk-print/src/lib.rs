// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Labelwerk Print — the ingestion and delivery pipeline.  A TCP listener
// emulates a raw-socket label printer; received ZPL is split into labels and
// either rendered for preview, forwarded to one printer, or relayed to a
// group of printers over raw sockets or IPP.

pub mod dispatcher;
pub mod ipp_client;
pub mod ipp_encoder;
pub mod preview;
pub mod raw_client;
pub mod relay;
pub mod render;
pub mod segmenter;
pub mod server;
pub mod transport;

pub use dispatcher::Dispatcher;
pub use ipp_client::IppClient;
pub use preview::{PreviewImage, PreviewSink};
pub use render::LabelRenderer;
pub use server::{LabelServer, probe_listener};
pub use transport::PrinterRouter;
