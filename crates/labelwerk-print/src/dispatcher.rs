// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Route every label of a connection payload according to the print mode.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use labelwerk_core::directory::PrinterDirectory;
use labelwerk_core::error::{LabelwerkError, Result};
use labelwerk_core::types::{PrintJob, PrintMode, RenderSettings, RoutingState};

use crate::preview::{PreviewImage, PreviewSink};
use crate::relay::relay;
use crate::segmenter::segment;
use crate::transport::PrinterRouter;

/// Segments payloads and hands each label to preview, forward, or relay.
pub struct Dispatcher {
    router: PrinterRouter,
    directory: Arc<dyn PrinterDirectory>,
    preview: PreviewSink,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("router", &self.router)
            .field("preview", &self.preview)
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    pub fn new(
        router: PrinterRouter,
        directory: Arc<dyn PrinterDirectory>,
        preview: PreviewSink,
    ) -> Self {
        Self {
            router,
            directory,
            preview,
        }
    }

    pub fn preview(&self) -> &PreviewSink {
        &self.preview
    }

    /// Process one connection payload.
    ///
    /// Labels are handled in order; a failing label is logged and does not
    /// stop the ones after it.
    #[instrument(skip_all, fields(bytes = blob.len(), mode = ?routing.mode))]
    pub async fn dispatch(&self, blob: &str, routing: &RoutingState) {
        let jobs = segment(blob);
        if jobs.is_empty() {
            info!("payload contained no complete label");
            return;
        }

        for job in &jobs {
            if let Err(e) = self.dispatch_job(job, routing).await {
                warn!(job = %job.id, ordinal = job.ordinal, error = %e, "label not processed");
            }
        }
    }

    /// Process one label.
    pub async fn dispatch_job(&self, job: &PrintJob, routing: &RoutingState) -> Result<()> {
        match routing.mode {
            PrintMode::Preview => self.preview_job(job, &routing.render).await,
            PrintMode::Forward => {
                let id = routing
                    .selected_printer
                    .ok_or(LabelwerkError::NoPrinterSelected)?;
                let printer = self
                    .directory
                    .printer(id)?
                    .ok_or(LabelwerkError::PrinterNotFound(id))?;
                self.router.send(&printer, job, &routing.render).await
            }
            PrintMode::Relay => {
                let group = routing
                    .relay_group
                    .as_ref()
                    .ok_or(LabelwerkError::NoRelayGroupSelected)?;
                relay(
                    &self.router,
                    self.directory.as_ref(),
                    &group.printer_ids,
                    job,
                    &routing.render,
                )
                .await;
                Ok(())
            }
        }
    }

    async fn preview_job(&self, job: &PrintJob, settings: &RenderSettings) -> Result<()> {
        let images = self.router.renderer().render(&job.markup, settings).await?;
        if images.is_empty() {
            info!(job = %job.id, "label produced no images");
        }
        for image in images {
            self.preview
                .publish(PreviewImage {
                    job_id: job.id,
                    page: image.page,
                    copies: job.copies,
                    png: image.png,
                })
                .await;
        }
        Ok(())
    }
}
