// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Delivery of one label to one printer.
//
// Raw-socket printers receive the ZPL verbatim.  IPP printers cannot read
// ZPL, so the label is rendered first and every resulting image goes through
// an ordered list of delivery attempts:
//
//   Rendered -> PDF attempt -> success
//                           -> PNG attempt -> success
//                                          -> Print error
//
// Both attempts share one job name, so the printer queue shows a single
// logical job whichever format it accepted.

use std::borrow::Cow;

use tracing::{info, instrument, warn};

use labelwerk_core::error::{LabelwerkError, Result};
use labelwerk_core::types::{
    DocumentType, PrintJob, PrinterDestination, PrinterKind, RenderSettings, RenderedImage,
};
use labelwerk_document::LabelPdfWriter;

use crate::ipp_client::IppClient;
use crate::ipp_encoder::PrintJobRequest;
use crate::raw_client;
use crate::render::LabelRenderer;

/// Formats tried, in order, for every rendered image.
pub const DELIVERY_ATTEMPTS: [DocumentType; 2] = [DocumentType::Pdf, DocumentType::Png];

/// IPP job name for the `index`-th image of a label submitted at `unix_secs`.
pub fn job_name(unix_secs: i64, index: usize) -> String {
    format!("ZPL-Label-{unix_secs}-{index}")
}

/// Sends labels to printers of any kind.
#[derive(Debug)]
pub struct PrinterRouter {
    renderer: LabelRenderer,
    ipp: IppClient,
}

impl PrinterRouter {
    pub fn new(renderer: LabelRenderer, ipp: IppClient) -> Self {
        Self { renderer, ipp }
    }

    pub fn renderer(&self) -> &LabelRenderer {
        &self.renderer
    }

    /// Deliver one label to one printer.
    #[instrument(skip_all, fields(job = %job.id, printer = %printer.label(), kind = printer.kind.display_name()))]
    pub async fn send(
        &self,
        printer: &PrinterDestination,
        job: &PrintJob,
        settings: &RenderSettings,
    ) -> Result<()> {
        match printer.kind {
            PrinterKind::RawSocket => {
                raw_client::send_raw(&printer.authority(), job.markup.as_bytes(), job.copies).await
            }
            PrinterKind::Ipp => self.send_ipp(printer, job, settings).await,
        }
    }

    async fn send_ipp(
        &self,
        printer: &PrinterDestination,
        job: &PrintJob,
        settings: &RenderSettings,
    ) -> Result<()> {
        let settings = settings.with_dpmm(printer.dpmm);
        let images = self.renderer.render(&job.markup, &settings).await?;
        if images.is_empty() {
            info!("label produced no images, nothing to print");
            return Ok(());
        }

        let url = printer.ipp_http_url();
        let printer_uri = printer.ipp_printer_uri();
        let submitted_at = chrono::Utc::now().timestamp();

        for (index, image) in images.iter().enumerate() {
            let name = job_name(submitted_at, index);
            self.deliver_image(&url, &printer_uri, &name, image, job.copies, &settings)
                .await?;
        }
        Ok(())
    }

    /// Run the delivery attempts for one image; the first success wins.
    async fn deliver_image(
        &self,
        url: &str,
        printer_uri: &str,
        job_name: &str,
        image: &RenderedImage,
        copies: u32,
        settings: &RenderSettings,
    ) -> Result<()> {
        let mut last_error = None;

        for format in DELIVERY_ATTEMPTS {
            let document: Cow<'_, [u8]> = match format {
                DocumentType::Pdf => match label_pdf(image, settings) {
                    Ok(pdf) => Cow::Owned(pdf),
                    Err(e) => {
                        warn!(job_name, error = %e, "PDF conversion failed, trying next format");
                        last_error = Some(e);
                        continue;
                    }
                },
                DocumentType::Png => Cow::Borrowed(image.png.as_slice()),
            };

            let request = PrintJobRequest {
                printer_uri,
                job_name,
                document_format: format.mime_type(),
                copies,
            };
            match self.ipp.print_job(url, &request, &document).await {
                Ok(_) => {
                    info!(job_name, format = format.mime_type(), page = image.page, "label printed");
                    return Ok(());
                }
                Err(e) => {
                    warn!(job_name, format = format.mime_type(), error = %e, "delivery attempt failed");
                    last_error = Some(e);
                }
            }
        }

        Err(LabelwerkError::Print {
            job_name: job_name.to_string(),
            source: Box::new(last_error.unwrap_or_else(|| {
                LabelwerkError::IppRequest("no delivery attempt was made".into())
            })),
        })
    }
}

fn label_pdf(image: &RenderedImage, settings: &RenderSettings) -> Result<Vec<u8>> {
    LabelPdfWriter::new(settings.width_in, settings.height_in)?.create_from_png(&image.png)
}
