// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Label segmentation.
//
// A connection may carry any number of ZPL labels back to back.  Each label
// ends with `^XZ`; anything after the last terminator is an incomplete label
// and is dropped.  The `^PQ` print-quantity command is lifted out of the
// markup into `PrintJob::copies` so that it is applied exactly once.

use labelwerk_core::types::PrintJob;
use tracing::{debug, warn};

/// End-of-label command.
pub const LABEL_TERMINATOR: &str = "^XZ";

/// Print-quantity command prefix.
pub const QUANTITY_COMMAND: &str = "^PQ";

/// Fragments shorter than this are noise between labels (line breaks,
/// stray `^XA`), not labels.
pub const MIN_LABEL_BYTES: usize = 15;

/// Split a connection payload into label jobs, preserving input order.
pub fn segment(blob: &str) -> Vec<PrintJob> {
    let mut fragments: Vec<&str> = blob.split(LABEL_TERMINATOR).collect();
    // `split` always yields at least one item: the text after the last marker.
    let trailing = fragments.pop().unwrap_or_default();
    if !trailing.trim().is_empty() {
        warn!(
            bytes = trailing.len(),
            "discarding data after the last ^XZ (incomplete label)"
        );
    }

    let mut jobs = Vec::with_capacity(fragments.len());
    for fragment in fragments {
        if fragment.len() < MIN_LABEL_BYTES {
            if !fragment.trim().is_empty() {
                debug!(fragment, "skipping short fragment");
            }
            continue;
        }

        let mut label = String::with_capacity(fragment.len() + LABEL_TERMINATOR.len());
        label.push_str(fragment);
        label.push_str(LABEL_TERMINATOR);

        let (markup, copies) = extract_quantity(&label);
        jobs.push(PrintJob::new(jobs.len(), markup, copies));
    }

    debug!(labels = jobs.len(), "segmented payload");
    jobs
}

/// Remove every `^PQ` command from a label and return the requested count.
///
/// The first `^PQ` decides the count.  A command runs until the next `^` or
/// `~` prefix, so its comma-separated parameters go with it.  Missing,
/// unparsable, or zero counts yield 1.
pub fn extract_quantity(label: &str) -> (String, u32) {
    let mut copies: Option<u32> = None;
    let mut markup = String::with_capacity(label.len());
    let mut rest = label;

    while let Some(start) = rest.find(QUANTITY_COMMAND) {
        markup.push_str(&rest[..start]);
        let params = &rest[start + QUANTITY_COMMAND.len()..];

        if copies.is_none() {
            let digits: String = params.chars().take_while(|c| c.is_ascii_digit()).collect();
            copies = Some(digits.parse::<u32>().ok().filter(|n| *n > 0).unwrap_or(1));
        }

        let end = params.find(['^', '~']).unwrap_or(params.len());
        rest = &params[end..];
    }
    markup.push_str(rest);

    (markup, copies.unwrap_or(1))
}
