// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Labelwerk — Core types, error definitions, configuration, and the printer
// directory shared across all crates.

pub mod config;
pub mod directory;
pub mod error;
pub mod types;

pub use config::AppConfig;
pub use directory::{InMemoryDirectory, PrinterDirectory};
pub use error::LabelwerkError;
pub use types::*;
