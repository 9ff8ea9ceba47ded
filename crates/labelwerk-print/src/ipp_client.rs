// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// HTTP transport for IPP Print-Job requests.
//
// The request body is produced by `ipp_encoder`; this module only POSTs it
// with `Content-Type: application/ipp` and checks the HTTP and IPP status.
// Label printers commonly ship self-signed certificates, so certificate
// validation is disabled for `https://` endpoints.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use reqwest::StatusCode;
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, error, info, instrument};

use labelwerk_core::error::{LabelwerkError, Result};

use crate::ipp_encoder::{IppResponseHeader, PrintJobRequest, check_response, status_name};

/// HTTP timeout for one IPP submission.
pub const IPP_TIMEOUT: Duration = Duration::from_secs(60);

/// MIME type of an IPP message body.
pub const IPP_CONTENT_TYPE: &str = "application/ipp";

/// Submits Print-Job requests over HTTP(S).
///
/// Request ids increase monotonically per client.
#[derive(Debug)]
pub struct IppClient {
    /// Shared HTTP client (connection pool, timeout, relaxed TLS).
    http: reqwest::Client,
    /// Request id for the next Print-Job.
    next_request_id: AtomicU32,
}

impl IppClient {
    pub fn new() -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(IPP_TIMEOUT)
            .danger_accept_invalid_certs(true)
            .build()
            .map_err(|e| LabelwerkError::IppRequest(format!("HTTP client setup: {e}")))?;
        Ok(Self {
            http,
            next_request_id: AtomicU32::new(1),
        })
    }

    /// POST one Print-Job to `url` and require HTTP 200 plus `successful-ok`.
    #[instrument(
        skip(self, request, document),
        fields(job_name = request.job_name, format = request.document_format, bytes = document.len())
    )]
    pub async fn print_job(
        &self,
        url: &str,
        request: &PrintJobRequest<'_>,
        document: &[u8],
    ) -> Result<IppResponseHeader> {
        let request_id = self.next_request_id.fetch_add(1, Ordering::Relaxed);
        let body = request.encode(request_id, document)?;
        debug!(request_id, body_len = body.len(), "sending Print-Job");

        let response = self
            .http
            .post(url)
            .header(CONTENT_TYPE, IPP_CONTENT_TYPE)
            .body(body)
            .send()
            .await
            .map_err(|e| LabelwerkError::IppRequest(format!("POST {url}: {e}")))?;

        let status = response.status();
        if status != StatusCode::OK {
            error!(%status, "printer rejected HTTP request");
            return Err(LabelwerkError::IppRequest(format!("HTTP {status}")));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| LabelwerkError::IppRequest(format!("read response from {url}: {e}")))?;

        match check_response(&bytes) {
            Ok(header) => {
                info!(request_id = header.request_id, "Print-Job accepted");
                Ok(header)
            }
            Err(e) => {
                if let LabelwerkError::IppStatus(code) = &e {
                    error!(
                        status = %format!("0x{code:04x}"),
                        name = status_name(*code),
                        "Print-Job failed"
                    );
                } else {
                    error!(error = %e, "Print-Job failed");
                }
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_ids_start_at_one() {
        let client = IppClient::new().unwrap();
        assert_eq!(client.next_request_id.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn unreachable_printer_is_a_request_error() {
        let addr = {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap()
        };
        let client = IppClient::new().unwrap();
        let request = PrintJobRequest {
            printer_uri: "ipp://127.0.0.1/ipp/print",
            job_name: "ZPL-Label-0-0",
            document_format: "image/png",
            copies: 1,
        };
        let err = client
            .print_job(&format!("http://{addr}/ipp/print"), &request, b"png")
            .await
            .unwrap_err();
        assert!(matches!(err, LabelwerkError::IppRequest(_)));
    }
}
