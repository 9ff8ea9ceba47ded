// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Relay fan-out: send one label to every printer of a relay group.

use tracing::{info, instrument, warn};

use labelwerk_core::directory::PrinterDirectory;
use labelwerk_core::types::{PrintJob, PrinterId, RenderSettings};

use crate::transport::PrinterRouter;

/// Deliver `job` to each printer in order.
///
/// Each id is resolved when its turn comes, so edits to the printer table
/// take effect mid-group.  Unknown ids, lookup failures, and delivery
/// failures are logged and the remaining printers are still served.
#[instrument(skip_all, fields(job = %job.id, destinations = printer_ids.len()))]
pub async fn relay(
    router: &PrinterRouter,
    directory: &dyn PrinterDirectory,
    printer_ids: &[PrinterId],
    job: &PrintJob,
    settings: &RenderSettings,
) {
    let (mut delivered, mut failed, mut skipped) = (0usize, 0usize, 0usize);

    for &id in printer_ids {
        let printer = match directory.printer(id) {
            Ok(Some(printer)) => printer,
            Ok(None) => {
                warn!(printer = %id, "relay destination not found, skipping");
                skipped += 1;
                continue;
            }
            Err(e) => {
                warn!(printer = %id, error = %e, "relay destination lookup failed, skipping");
                skipped += 1;
                continue;
            }
        };

        match router.send(&printer, job, settings).await {
            Ok(()) => delivered += 1,
            Err(e) => {
                warn!(printer = %printer.label(), error = %e, "relay delivery failed");
                failed += 1;
            }
        }
    }

    info!(delivered, failed, skipped, "relay finished");
}
