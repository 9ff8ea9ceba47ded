// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Central service layer: builds the print pipeline from the configuration
// and owns the label server.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use labelwerk_core::AppConfig;
use labelwerk_core::error::Result;
use labelwerk_core::types::ServerStatus;
use labelwerk_print::{
    Dispatcher, IppClient, LabelRenderer, LabelServer, PreviewSink, PrinterRouter,
};

/// Everything the binary needs at run time.
pub struct AppServices {
    config: AppConfig,
    dispatcher: Arc<Dispatcher>,
    server: LabelServer,
}

impl AppServices {
    /// Build the pipeline.  The server is created stopped.
    pub fn init(config: AppConfig) -> Result<Self> {
        let renderer = LabelRenderer::new(config.render_service_url.as_str())?;
        let router = PrinterRouter::new(renderer, IppClient::new()?);

        if let Some(dir) = &config.preview_dir {
            std::fs::create_dir_all(dir)?;
        }
        let preview = PreviewSink::new(config.preview_dir.clone());

        let dispatcher = Arc::new(Dispatcher::new(
            router,
            Arc::new(config.directory()),
            preview,
        ));
        let server = LabelServer::new(
            config.bind_host.as_str(),
            config.server_port,
            Arc::clone(&dispatcher),
            config.routing_state(),
        );

        info!(
            printers = config.printers.len(),
            relay_groups = config.relay_groups.len(),
            mode = ?config.print_mode,
            "app services initialised"
        );

        Ok(Self {
            config,
            dispatcher,
            server,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn server_status(&self) -> ServerStatus {
        self.server.status()
    }

    pub async fn start_server(&mut self) -> Result<SocketAddr> {
        self.server.start().await
    }

    pub async fn stop_server(&mut self) -> Result<()> {
        self.server.stop().await
    }

    /// Log every preview image as it is published.
    pub fn spawn_preview_logger(&self) -> JoinHandle<()> {
        let mut rx = self.dispatcher.preview().subscribe();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(image) => info!(
                        job = %image.job_id,
                        page = image.page,
                        copies = image.copies,
                        bytes = image.png.len(),
                        "label preview ready"
                    ),
                    Err(RecvError::Lagged(missed)) => {
                        warn!(missed, "preview logger fell behind");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }

    /// Dispatch the contents of a ZPL file as if it had arrived on the listener.
    pub async fn print_file(&self, path: &Path) -> Result<()> {
        let bytes = tokio::fs::read(path).await?;
        let blob = String::from_utf8_lossy(&bytes);
        info!(path = %path.display(), bytes = bytes.len(), "dispatching file");
        self.dispatcher
            .dispatch(&blob, &self.config.routing_state())
            .await;
        Ok(())
    }
}
