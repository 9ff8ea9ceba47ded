// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Label PDF writer — wrap one rendered label raster in a one-page PDF whose
// page is exactly the physical label size, using `printpdf` 0.8.
//
// printpdf 0.8 uses a data-oriented API: documents are built by constructing
// `PdfPage` structs containing `Vec<Op>` operation lists, then serialised via
// `PdfDocument::save()`.

use labelwerk_core::error::{LabelwerkError, Result};
use printpdf::{
    Mm, Op, PdfDocument, PdfPage, PdfSaveOptions, PdfWarnMsg, Pt, RawImage, RawImageData,
    RawImageFormat, XObjectTransform,
};
use tracing::{debug, instrument};

const MM_PER_INCH: f32 = 25.4;

/// At 72 dpi one image pixel maps to one PDF point before scaling.
const PLACEMENT_DPI: f32 = 72.0;

/// Produces label-sized PDFs from PNG rasters.
///
/// The image is centred on the page and uniformly scaled (up or down) so that
/// it fits entirely, preserving aspect ratio. There are no margins.
#[derive(Debug, Clone, Copy)]
pub struct LabelPdfWriter {
    width_in: f32,
    height_in: f32,
}

impl LabelPdfWriter {
    /// Writer for a label of the given size in inches.
    pub fn new(width_in: f64, height_in: f64) -> Result<Self> {
        if !(width_in.is_finite() && width_in > 0.0 && height_in.is_finite() && height_in > 0.0)
        {
            return Err(LabelwerkError::DocumentConversion(format!(
                "invalid label size {width_in}x{height_in} in"
            )));
        }
        Ok(Self {
            width_in: width_in as f32,
            height_in: height_in as f32,
        })
    }

    fn page_dimensions(&self) -> (Mm, Mm) {
        (
            Mm(self.width_in * MM_PER_INCH),
            Mm(self.height_in * MM_PER_INCH),
        )
    }

    /// Convert an encoded PNG into PDF bytes.
    #[instrument(skip(self, png), fields(bytes_len = png.len()))]
    pub fn create_from_png(&self, png: &[u8]) -> Result<Vec<u8>> {
        let decoded = ::image::load_from_memory(png).map_err(|e| {
            LabelwerkError::DocumentConversion(format!("failed to decode label image: {e}"))
        })?;

        let img_width = decoded.width() as usize;
        let img_height = decoded.height() as usize;
        if img_width == 0 || img_height == 0 {
            return Err(LabelwerkError::DocumentConversion(
                "label image has no pixels".into(),
            ));
        }

        let raw = RawImage {
            pixels: RawImageData::U8(decoded.to_rgb8().into_raw()),
            width: img_width,
            height: img_height,
            data_format: RawImageFormat::RGB8,
            tag: Vec::new(),
        };

        let (page_w, page_h) = self.page_dimensions();
        let page_w_pt = page_w.into_pt().0;
        let page_h_pt = page_h.into_pt().0;

        let scale = fit_scale(
            img_width as f32,
            img_height as f32,
            page_w_pt,
            page_h_pt,
        );
        let rendered_w_pt = img_width as f32 * scale;
        let rendered_h_pt = img_height as f32 * scale;
        let x_offset = (page_w_pt - rendered_w_pt) / 2.0;
        let y_offset = (page_h_pt - rendered_h_pt) / 2.0;

        let mut doc = PdfDocument::new("ZPL Label");
        let xobject_id = doc.add_image(&raw);

        let ops = vec![Op::UseXobject {
            id: xobject_id,
            transform: XObjectTransform {
                translate_x: Some(Pt(x_offset)),
                translate_y: Some(Pt(y_offset)),
                scale_x: Some(scale),
                scale_y: Some(scale),
                dpi: Some(PLACEMENT_DPI),
                rotate: None,
            },
        }];

        doc.with_pages(vec![PdfPage::new(page_w, page_h, ops)]);

        debug!(
            img_width,
            img_height,
            rendered_w_pt,
            rendered_h_pt,
            scale,
            "label placed on page"
        );

        let mut warnings: Vec<PdfWarnMsg> = Vec::new();
        Ok(doc.save(&PdfSaveOptions::default(), &mut warnings))
    }
}

/// Uniform scale that fits an image inside a page.
fn fit_scale(img_w: f32, img_h: f32, page_w: f32, page_h: f32) -> f32 {
    (page_w / img_w).min(page_h / img_h)
}
