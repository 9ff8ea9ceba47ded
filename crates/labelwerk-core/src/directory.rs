// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Printer lookup used at dispatch time.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::{LabelwerkError, Result};
use crate::types::{PrinterDestination, PrinterId};

/// Resolves printer ids to their current records.
///
/// Lookups happen for every label so that edits made while the server runs
/// are picked up by the next delivery.
pub trait PrinterDirectory: Send + Sync {
    /// `Ok(None)` when no printer has this id.
    fn printer(&self, id: PrinterId) -> Result<Option<PrinterDestination>>;
}

/// Thread-safe in-memory printer table.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    printers: RwLock<HashMap<PrinterId, PrinterDestination>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_printers(printers: impl IntoIterator<Item = PrinterDestination>) -> Self {
        let map = printers.into_iter().map(|p| (p.id, p)).collect();
        Self {
            printers: RwLock::new(map),
        }
    }

    /// Add or replace a printer record.
    pub fn insert(&self, printer: PrinterDestination) -> Result<()> {
        let mut map = self
            .printers
            .write()
            .map_err(|e| LabelwerkError::Config(format!("printer table poisoned: {e}")))?;
        map.insert(printer.id, printer);
        Ok(())
    }

    /// Remove a printer record, returning it if it existed.
    pub fn remove(&self, id: PrinterId) -> Result<Option<PrinterDestination>> {
        let mut map = self
            .printers
            .write()
            .map_err(|e| LabelwerkError::Config(format!("printer table poisoned: {e}")))?;
        Ok(map.remove(&id))
    }

    /// All printers, ordered by id.
    pub fn list(&self) -> Result<Vec<PrinterDestination>> {
        let map = self
            .printers
            .read()
            .map_err(|e| LabelwerkError::Config(format!("printer table poisoned: {e}")))?;
        let mut printers: Vec<_> = map.values().cloned().collect();
        printers.sort_by_key(|p| p.id);
        Ok(printers)
    }
}

impl PrinterDirectory for InMemoryDirectory {
    fn printer(&self, id: PrinterId) -> Result<Option<PrinterDestination>> {
        let map = self
            .printers
            .read()
            .map_err(|e| LabelwerkError::Config(format!("printer table poisoned: {e}")))?;
        Ok(map.get(&id).cloned())
    }
}
