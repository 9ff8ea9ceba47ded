// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Preview sink — fan rendered labels out to whoever is watching, and
// optionally keep a PNG copy on disk.

use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDateTime};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use labelwerk_core::types::JobId;

/// Events buffered per subscriber before the oldest are dropped.
pub const PREVIEW_CHANNEL_CAPACITY: usize = 64;

/// One rendered page ready for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewImage {
    pub job_id: JobId,
    pub page: u32,
    /// Quantity requested by the label's `^PQ` command.
    pub copies: u32,
    pub png: Vec<u8>,
}

/// Broadcasts preview images and saves them when a directory is configured.
#[derive(Debug, Clone)]
pub struct PreviewSink {
    tx: broadcast::Sender<PreviewImage>,
    save_dir: Option<PathBuf>,
}

impl PreviewSink {
    pub fn new(save_dir: Option<PathBuf>) -> Self {
        let (tx, _) = broadcast::channel(PREVIEW_CHANNEL_CAPACITY);
        Self { tx, save_dir }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PreviewImage> {
        self.tx.subscribe()
    }

    pub fn save_dir(&self) -> Option<&Path> {
        self.save_dir.as_deref()
    }

    /// Publish one image.  A failed save is logged and otherwise ignored.
    pub async fn publish(&self, image: PreviewImage) {
        if let Some(dir) = &self.save_dir {
            let path = dir.join(preview_file_name(&Local::now().naive_local()));
            match tokio::fs::write(&path, &image.png).await {
                Ok(()) => info!(path = %path.display(), "preview saved"),
                Err(e) => warn!(path = %path.display(), error = %e, "failed to save preview"),
            }
        }

        let (job_id, page) = (image.job_id, image.page);
        match self.tx.send(image) {
            Ok(receivers) => debug!(%job_id, page, receivers, "preview published"),
            Err(_) => debug!(%job_id, page, "preview published with no subscribers"),
        }
    }
}

/// File name for a saved preview, e.g. `label-print-03_04_2026-05-06-07-000000008.png`.
pub fn preview_file_name(at: &NaiveDateTime) -> String {
    at.format("label-print-%m_%d_%Y-%H-%M-%S-%f.png").to_string()
}
