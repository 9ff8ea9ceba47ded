// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Labelwerk label router.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default port for raw-socket (JetDirect) label printers.
pub const DEFAULT_RAW_PORT: u16 = 9100;

/// Default port for IPP printers.
pub const DEFAULT_IPP_PORT: u16 = 631;

/// Default IPP endpoint path.
pub const DEFAULT_IPP_ENDPOINT: &str = "/ipp/print";

/// Unique identifier for a print job, used to correlate log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a printer record in the configuration store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrinterId(pub u32);

impl std::fmt::Display for PrinterId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identifier of a relay group in the configuration store.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct RelayGroupId(pub u32);

impl std::fmt::Display for RelayGroupId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One label extracted from an incoming connection.
///
/// The markup never contains a `^PQ` quantity directive; the quantity lives in
/// `copies` so that downstream printers and the rasterizer do not apply it a
/// second time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrintJob {
    pub id: JobId,
    /// Zero-based position of this label within its connection payload.
    pub ordinal: usize,
    /// ZPL markup for a single label, terminated by `^XZ`.
    pub markup: String,
    /// Requested number of copies (always >= 1).
    pub copies: u32,
}

impl PrintJob {
    pub fn new(ordinal: usize, markup: String, copies: u32) -> Self {
        Self {
            id: JobId::new(),
            ordinal,
            markup,
            copies: copies.max(1),
        }
    }
}

/// A PNG raster returned by the rendering service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedImage {
    /// Zero-based page index within a multi-image label response.
    pub page: u32,
    /// Encoded PNG bytes.
    pub png: Vec<u8>,
}

/// Document formats Labelwerk submits to IPP printers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentType {
    Pdf,
    Png,
}

impl DocumentType {
    /// MIME type string for the IPP `document-format` attribute.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Png => "image/png",
        }
    }
}

/// Transport family of a destination printer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PrinterKind {
    /// Raw TCP socket; the printer interprets ZPL itself.
    #[serde(alias = "Zebra", alias = "raw")]
    RawSocket,
    /// IPP over HTTP(S); the label is rasterised and sent as PDF or PNG.
    #[serde(alias = "IPP")]
    Ipp,
}

impl PrinterKind {
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::RawSocket => "raw socket",
            Self::Ipp => "IPP",
        }
    }
}

/// A configured destination printer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrinterDestination {
    pub id: PrinterId,
    #[serde(default)]
    pub name: String,
    pub kind: PrinterKind,
    /// Hostname or IP address.
    pub address: String,
    /// Port; `None` selects the default for the printer kind.
    #[serde(default)]
    pub port: Option<u16>,
    /// IPP endpoint path (IPP only).
    #[serde(default)]
    pub ipp_endpoint: Option<String>,
    /// Use HTTPS / `ipps://` (IPP only).
    #[serde(default)]
    pub use_tls: bool,
    /// Rendering resolution override in dots per millimetre (IPP only).
    #[serde(default)]
    pub dpmm: Option<u32>,
}

impl PrinterDestination {
    /// Effective TCP port, falling back to the default for the printer kind.
    pub fn effective_port(&self) -> u16 {
        match (self.port, self.kind) {
            (Some(port), _) if port != 0 => port,
            (_, PrinterKind::RawSocket) => DEFAULT_RAW_PORT,
            (_, PrinterKind::Ipp) => DEFAULT_IPP_PORT,
        }
    }

    /// Effective IPP endpoint path, always starting with `/`.
    pub fn ipp_endpoint(&self) -> String {
        match self.ipp_endpoint.as_deref().map(str::trim) {
            Some(path) if !path.is_empty() => {
                if path.starts_with('/') {
                    path.to_string()
                } else {
                    format!("/{path}")
                }
            }
            _ => DEFAULT_IPP_ENDPOINT.to_string(),
        }
    }

    /// `host:port` suitable for `TcpStream::connect`, bracketing IPv6 literals.
    pub fn authority(&self) -> String {
        let host = self.address.trim();
        if host.contains(':') && !host.starts_with('[') {
            format!("[{host}]:{}", self.effective_port())
        } else {
            format!("{host}:{}", self.effective_port())
        }
    }

    /// HTTP(S) URL the IPP request is POSTed to.
    pub fn ipp_http_url(&self) -> String {
        let scheme = if self.use_tls { "https" } else { "http" };
        format!("{scheme}://{}{}", self.authority(), self.ipp_endpoint())
    }

    /// Value of the `printer-uri` operation attribute.
    pub fn ipp_printer_uri(&self) -> String {
        let scheme = if self.use_tls { "ipps" } else { "ipp" };
        format!("{scheme}://{}{}", self.authority(), self.ipp_endpoint())
    }

    /// Label used in log lines.
    pub fn label(&self) -> String {
        if self.name.is_empty() {
            format!("{} {}", self.kind.display_name(), self.authority())
        } else {
            self.name.clone()
        }
    }
}

/// An ordered list of printers that each receive every job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayGroup {
    pub id: RelayGroupId,
    #[serde(default)]
    pub printer_ids: Vec<PrinterId>,
}

/// Parameters passed to the rasterization service.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    /// Label width in inches.
    pub width_in: f64,
    /// Label height in inches.
    pub height_in: f64,
    /// Print density in dots per millimetre (8 = 203 dpi).
    pub dpmm: u32,
    /// Clockwise rotation in degrees (0, 90, 180, 270).
    pub rotation: u16,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            width_in: 4.0,
            height_in: 6.0,
            dpmm: 8,
            rotation: 0,
        }
    }
}

impl RenderSettings {
    /// Copy of these settings with a per-printer resolution override applied.
    pub fn with_dpmm(self, dpmm: Option<u32>) -> Self {
        match dpmm {
            Some(d) if d > 0 => Self { dpmm: d, ..self },
            _ => self,
        }
    }
}

/// What the server does with each incoming label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrintMode {
    /// Render to PNG for on-screen preview (and optional save to disk).
    #[default]
    Preview,
    /// Send to the selected printer.
    Forward,
    /// Fan out to every printer in the selected relay group.
    Relay,
}

/// Routing decisions captured when a connection is accepted.
///
/// Later updates never affect a connection that is already being processed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoutingState {
    pub mode: PrintMode,
    pub selected_printer: Option<PrinterId>,
    pub relay_group: Option<RelayGroup>,
    pub render: RenderSettings,
}

/// Status of the label ingestion server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServerStatus {
    Stopped,
    Starting,
    Running,
    Error,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ipp_printer() -> PrinterDestination {
        PrinterDestination {
            id: PrinterId(1),
            name: "Front desk".into(),
            kind: PrinterKind::Ipp,
            address: "192.168.1.40".into(),
            port: None,
            ipp_endpoint: None,
            use_tls: false,
            dpmm: None,
        }
    }

    #[test]
    fn ipp_defaults_fill_port_and_endpoint() {
        let printer = ipp_printer();
        assert_eq!(printer.ipp_http_url(), "http://192.168.1.40:631/ipp/print");
        assert_eq!(printer.ipp_printer_uri(), "ipp://192.168.1.40:631/ipp/print");
    }

    #[test]
    fn tls_switches_both_schemes() {
        let printer = PrinterDestination {
            use_tls: true,
            port: Some(443),
            ipp_endpoint: Some("printers/zebra".into()),
            ..ipp_printer()
        };
        assert_eq!(printer.ipp_http_url(), "https://192.168.1.40:443/printers/zebra");
        assert_eq!(printer.ipp_printer_uri(), "ipps://192.168.1.40:443/printers/zebra");
    }

    #[test]
    fn raw_socket_defaults_to_9100() {
        let printer = PrinterDestination {
            kind: PrinterKind::RawSocket,
            port: Some(0),
            ..ipp_printer()
        };
        assert_eq!(printer.authority(), "192.168.1.40:9100");
    }

    #[test]
    fn ipv6_literals_are_bracketed() {
        let printer = PrinterDestination {
            address: "fe80::1".into(),
            ..ipp_printer()
        };
        assert_eq!(printer.authority(), "[fe80::1]:631");
    }

    #[test]
    fn printer_kind_accepts_legacy_names() {
        let kind: PrinterKind = serde_json::from_str("\"Zebra\"").unwrap();
        assert_eq!(kind, PrinterKind::RawSocket);
        let kind: PrinterKind = serde_json::from_str("\"raw-socket\"").unwrap();
        assert_eq!(kind, PrinterKind::RawSocket);
        let kind: PrinterKind = serde_json::from_str("\"IPP\"").unwrap();
        assert_eq!(kind, PrinterKind::Ipp);
    }

    #[test]
    fn zero_copies_is_clamped_to_one() {
        let job = PrintJob::new(0, "^XA^XZ".into(), 0);
        assert_eq!(job.copies, 1);
    }

    #[test]
    fn dpmm_override_ignores_zero() {
        let render = RenderSettings::default();
        assert_eq!(render.with_dpmm(Some(12)).dpmm, 12);
        assert_eq!(render.with_dpmm(Some(0)).dpmm, 8);
        assert_eq!(render.with_dpmm(None).dpmm, 8);
    }
}
