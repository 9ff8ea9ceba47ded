// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// labelwerk-document — Document conversion for IPP label delivery.
//
// IPP printers that cannot interpret ZPL receive each rendered label either
// as a one-page PDF sized to the physical label or as the raw PNG.

pub mod pdf;

pub use pdf::writer::LabelPdfWriter;
