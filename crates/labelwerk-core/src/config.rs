// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Application configuration.
//
// The settings UI owns these records; the core only reads them.  They are
// persisted as pretty-printed JSON in the data directory.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::directory::InMemoryDirectory;
use crate::error::{LabelwerkError, Result};
use crate::types::{
    DEFAULT_RAW_PORT, PrintMode, PrinterDestination, PrinterId, RelayGroup, RelayGroupId,
    RenderSettings, RoutingState,
};

/// Default public rasterization service.
pub const DEFAULT_RENDER_SERVICE_URL: &str = "http://api.labelary.com";

/// Persistent application settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Label geometry, density, and rotation sent to the rasterizer.
    pub label: RenderSettings,
    /// Port the emulated printer listens on.
    pub server_port: u16,
    /// Interface the emulated printer binds to.
    pub bind_host: String,
    /// Start the listener as soon as the application launches.
    pub auto_start_server: bool,
    /// What to do with incoming labels.
    pub print_mode: PrintMode,
    /// Printer used in `forward` mode.
    pub default_printer: Option<PrinterId>,
    /// Relay group used in `relay` mode.
    pub relay_group: Option<RelayGroupId>,
    /// Known destination printers.
    pub printers: Vec<PrinterDestination>,
    /// Known relay groups.
    pub relay_groups: Vec<RelayGroup>,
    /// Base URL of the Labelary-compatible rendering service.
    pub render_service_url: String,
    /// Directory where preview PNGs are saved; `None` disables saving.
    pub preview_dir: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            label: RenderSettings::default(),
            server_port: DEFAULT_RAW_PORT,
            bind_host: "127.0.0.1".into(),
            auto_start_server: false,
            print_mode: PrintMode::Preview,
            default_printer: None,
            relay_group: None,
            printers: Vec::new(),
            relay_groups: Vec::new(),
            render_service_url: DEFAULT_RENDER_SERVICE_URL.into(),
            preview_dir: None,
        }
    }
}

impl AppConfig {
    /// Read and validate a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&data)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a configuration file, falling back to defaults when it is missing
    /// or unusable.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            info!(path = %path.display(), "no configuration file, using defaults");
            return Self::default();
        }
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ignoring unusable configuration");
                Self::default()
            }
        }
    }

    /// Write the configuration as pretty JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), json)?;
        Ok(())
    }

    /// Reject settings the pipeline cannot work with.
    pub fn validate(&self) -> Result<()> {
        let label = &self.label;
        if !(label.width_in.is_finite() && label.width_in > 0.0)
            || !(label.height_in.is_finite() && label.height_in > 0.0)
        {
            return Err(LabelwerkError::Config(format!(
                "label size must be positive, got {}x{} in",
                label.width_in, label.height_in
            )));
        }
        if label.dpmm == 0 {
            return Err(LabelwerkError::Config("dpmm must be at least 1".into()));
        }
        if !matches!(label.rotation, 0 | 90 | 180 | 270) {
            return Err(LabelwerkError::Config(format!(
                "rotation must be 0, 90, 180 or 270, got {}",
                label.rotation
            )));
        }

        let mut seen = HashSet::new();
        for printer in &self.printers {
            if !seen.insert(printer.id) {
                return Err(LabelwerkError::Config(format!(
                    "duplicate printer id {}",
                    printer.id
                )));
            }
            if printer.address.trim().is_empty() {
                return Err(LabelwerkError::Config(format!(
                    "printer {} has no address",
                    printer.id
                )));
            }
        }

        let mut groups = HashSet::new();
        for group in &self.relay_groups {
            if !groups.insert(group.id) {
                return Err(LabelwerkError::Config(format!(
                    "duplicate relay group id {}",
                    group.id
                )));
            }
        }
        Ok(())
    }

    /// Look up a relay group by id.
    pub fn relay_group(&self, id: RelayGroupId) -> Option<&RelayGroup> {
        self.relay_groups.iter().find(|g| g.id == id)
    }

    /// The selected relay group, if any.
    ///
    /// # Errors
    ///
    /// `RelayGroupNotFound` when the selection names a group that is not
    /// configured.
    pub fn selected_relay_group(&self) -> Result<Option<&RelayGroup>> {
        match self.relay_group {
            None => Ok(None),
            Some(id) => self
                .relay_group(id)
                .map(Some)
                .ok_or(LabelwerkError::RelayGroupNotFound(id)),
        }
    }

    /// Initial routing state for the server.
    ///
    /// A selected relay group that no longer exists is dropped with a warning;
    /// relay mode then logs the missing group per label.
    pub fn routing_state(&self) -> RoutingState {
        let relay_group = match self.selected_relay_group() {
            Ok(group) => group.cloned(),
            Err(e) => {
                warn!(error = %e, "dropping relay group selection");
                None
            }
        };

        RoutingState {
            mode: self.print_mode,
            selected_printer: self.default_printer,
            relay_group,
            render: self.label,
        }
    }

    /// Printer directory seeded from the configured printers.
    pub fn directory(&self) -> InMemoryDirectory {
        InMemoryDirectory::from_printers(self.printers.iter().cloned())
    }
}
