// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Client for the Labelary-compatible rasterization service.
//
// One POST renders one page of a label:
//
//   POST {base}/v1/printers/{dpmm}dpmm/labels/{w}x{h}/{page}/
//
// The first response announces the page count in `x-total-count`; the
// remaining pages are fetched sequentially with a short pause between calls
// so the public service does not throttle us.

use std::time::Duration;

use reqwest::header::{ACCEPT, CONTENT_TYPE};
use tracing::{debug, info, instrument, warn};

use labelwerk_core::error::{LabelwerkError, Result};
use labelwerk_core::types::{RenderSettings, RenderedImage};

/// HTTP timeout for one page.
pub const RENDER_TIMEOUT: Duration = Duration::from_secs(30);

/// Pause before each page after the first.
pub const PAGE_DELAY: Duration = Duration::from_millis(250);

/// Upper bound on pages fetched for one label, whatever the service announces.
pub const MAX_PAGES: u32 = 50;

/// Response header carrying the number of pages a label produced.
pub const TOTAL_COUNT_HEADER: &str = "x-total-count";

/// Header selecting the rotation in degrees.
pub const ROTATION_HEADER: &str = "X-Rotation";

/// Body returned when the markup produced no label at all.
pub const NO_LABELS_SENTINEL: &str = "ERROR: Requested 1st label but ZPL generated no labels";

/// Outcome of rendering a single page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageOutcome {
    Image {
        png: Vec<u8>,
        /// Raw `x-total-count` value, if the service sent one.
        total_count: Option<String>,
    },
    /// The service reported that the markup generated no labels.
    NoLabels,
}

/// Renders ZPL to PNG through the remote service.
#[derive(Debug, Clone)]
pub struct LabelRenderer {
    http: reqwest::Client,
    base_url: String,
}

impl LabelRenderer {
    /// Create a renderer for the given service root, e.g. `http://api.labelary.com`.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(RENDER_TIMEOUT)
            .build()
            .map_err(|e| LabelwerkError::RenderService(format!("HTTP client setup: {e}")))?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// URL of one page for the given settings.
    pub fn page_url(&self, settings: &RenderSettings, page: u32) -> String {
        format!(
            "{}/v1/printers/{}dpmm/labels/{}x{}/{}/",
            self.base_url, settings.dpmm, settings.width_in, settings.height_in, page
        )
    }

    /// Render one page.
    #[instrument(skip(self, markup, settings))]
    pub async fn render_page(
        &self,
        markup: &str,
        settings: &RenderSettings,
        page: u32,
    ) -> Result<PageOutcome> {
        let url = self.page_url(settings, page);
        debug!(url = %url, "requesting render");

        let response = self
            .http
            .post(&url)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header(ACCEPT, "image/png")
            .header(ROTATION_HEADER, settings.rotation.to_string())
            .body(markup.to_owned())
            .send()
            .await
            .map_err(|e| LabelwerkError::RenderService(format!("POST {url}: {e}")))?;

        let status = response.status();
        let total_count = response
            .headers()
            .get(TOTAL_COUNT_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.trim().to_string());

        let body = response
            .bytes()
            .await
            .map_err(|e| LabelwerkError::RenderService(format!("read body from {url}: {e}")))?;

        if contains(&body, NO_LABELS_SENTINEL.as_bytes()) {
            debug!("service reported no labels");
            return Ok(PageOutcome::NoLabels);
        }

        if !status.is_success() {
            let detail = String::from_utf8_lossy(&body[..body.len().min(200)]).into_owned();
            return Err(LabelwerkError::RenderService(format!(
                "HTTP {status}: {}",
                detail.trim()
            )));
        }

        Ok(PageOutcome::Image {
            png: body.to_vec(),
            total_count,
        })
    }

    /// Render every page of a label, in page order.
    ///
    /// A failure on the first page is returned.  A failure or an empty
    /// result on a later page is logged and that page is skipped.  Blank
    /// markup renders nothing without a network call.
    #[instrument(skip(self, markup, settings), fields(bytes = markup.len()))]
    pub async fn render(
        &self,
        markup: &str,
        settings: &RenderSettings,
    ) -> Result<Vec<RenderedImage>> {
        if markup.trim().is_empty() {
            return Ok(Vec::new());
        }

        let (first, total_count) = match self.render_page(markup, settings, 0).await? {
            PageOutcome::NoLabels => return Ok(Vec::new()),
            PageOutcome::Image { png, total_count } => (png, total_count),
        };

        let pages = page_count(total_count.as_deref());
        let mut images = Vec::with_capacity(pages.min(MAX_PAGES) as usize);
        images.push(RenderedImage { page: 0, png: first });

        for page in 1..pages {
            tokio::time::sleep(PAGE_DELAY).await;
            match self.render_page(markup, settings, page).await {
                Ok(PageOutcome::Image { png, .. }) => images.push(RenderedImage { page, png }),
                Ok(PageOutcome::NoLabels) => {
                    warn!(page, pages, "service returned no label for page, skipping");
                }
                Err(e) => {
                    warn!(page, pages, error = %e, "page render failed, skipping");
                }
            }
        }

        info!(pages, rendered = images.len(), "label rendered");
        Ok(images)
    }
}

/// Number of pages announced by `x-total-count`.
///
/// A missing, zero, or unparsable header means only the first page.  Counts
/// above [`MAX_PAGES`] are capped.
pub fn page_count(header: Option<&str>) -> u32 {
    let Some(raw) = header else {
        return 1;
    };
    match raw.parse::<u64>() {
        Ok(n) if n > u64::from(MAX_PAGES) => {
            warn!(announced = n, max = MAX_PAGES, "page count too large, capping");
            MAX_PAGES
        }
        Ok(n) => (n as u32).max(1),
        Err(e) => {
            warn!(value = raw, error = %e, "ignoring unparsable page count");
            1
        }
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack
        .windows(needle.len())
        .any(|window| window == needle)
}
