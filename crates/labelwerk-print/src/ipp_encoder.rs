// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Hand-built IPP Print-Job encoder and response-header decoder.
//
// Only the attributes needed to submit one document are produced.  The
// binary layout follows RFC 8010 SS3.1:
//
// ```text
// version-number:   2 bytes (major, minor)
// operation-id:     2 bytes (big-endian u16)
// request-id:       4 bytes (big-endian u32)
// attribute-groups: variable
//   delimiter-tag:  1 byte
//   attributes:     variable
//     value-tag:    1 byte
//     name-length:  2 bytes (big-endian u16)
//     name:         name-length bytes
//     value-length: 2 bytes (big-endian u16)
//     value:        value-length bytes
// end-of-attributes-tag: 1 byte (0x03)
// document-data:    remainder, unframed
// ```

use tracing::warn;

use labelwerk_core::error::{LabelwerkError, Result};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// IPP version 2.0.
pub const IPP_VERSION_MAJOR: u8 = 0x02;
pub const IPP_VERSION_MINOR: u8 = 0x00;

/// Print-Job operation (RFC 8011 SS4.2.1).
pub const OP_PRINT_JOB: u16 = 0x0002;

// Delimiter tags.
pub const TAG_OPERATION_ATTRIBUTES: u8 = 0x01;
pub const TAG_JOB_ATTRIBUTES: u8 = 0x02;
pub const TAG_END_OF_ATTRIBUTES: u8 = 0x03;

// Value tags.
pub const VALUE_TAG_INTEGER: u8 = 0x21;
pub const VALUE_TAG_NAME: u8 = 0x42;
pub const VALUE_TAG_URI: u8 = 0x45;
pub const VALUE_TAG_CHARSET: u8 = 0x47;
pub const VALUE_TAG_NATURAL_LANGUAGE: u8 = 0x48;
pub const VALUE_TAG_MIME_MEDIA_TYPE: u8 = 0x49;

/// `successful-ok`.
pub const STATUS_OK: u16 = 0x0000;

/// Size of the fixed response header (version, status, request-id).
pub const RESPONSE_HEADER_LEN: usize = 8;

/// Longest name or value a two-byte length field can describe.
pub const MAX_ATTR_LEN: usize = u16::MAX as usize;

/// Value of `requesting-user-name` on every submitted job.
pub const REQUESTING_USER_NAME: &str = "labelwerk";

// ---------------------------------------------------------------------------
// Message builder
// ---------------------------------------------------------------------------

/// Builder for IPP binary messages.
#[derive(Debug)]
pub struct IppMessageBuilder {
    buf: Vec<u8>,
}

impl IppMessageBuilder {
    /// Start an IPP/2.0 message with the given operation (or status) and request-id.
    pub fn new(operation_id: u16, request_id: u32) -> Self {
        let mut buf = Vec::with_capacity(256);
        buf.push(IPP_VERSION_MAJOR);
        buf.push(IPP_VERSION_MINOR);
        buf.extend_from_slice(&operation_id.to_be_bytes());
        buf.extend_from_slice(&request_id.to_be_bytes());
        Self { buf }
    }

    /// Start a new attribute group.
    pub fn begin_group(&mut self, delimiter: u8) -> &mut Self {
        self.buf.push(delimiter);
        self
    }

    pub fn charset(&mut self, name: &str, value: &str) -> &mut Self {
        self.write_attr(VALUE_TAG_CHARSET, name, value.as_bytes())
    }

    pub fn natural_language(&mut self, name: &str, value: &str) -> &mut Self {
        self.write_attr(VALUE_TAG_NATURAL_LANGUAGE, name, value.as_bytes())
    }

    pub fn uri(&mut self, name: &str, value: &str) -> &mut Self {
        self.write_attr(VALUE_TAG_URI, name, value.as_bytes())
    }

    /// Write a nameWithoutLanguage attribute.
    pub fn name_attr(&mut self, name: &str, value: &str) -> &mut Self {
        self.write_attr(VALUE_TAG_NAME, name, value.as_bytes())
    }

    pub fn mime_media_type(&mut self, name: &str, value: &str) -> &mut Self {
        self.write_attr(VALUE_TAG_MIME_MEDIA_TYPE, name, value.as_bytes())
    }

    /// Write a 4-byte signed integer attribute.
    pub fn integer(&mut self, name: &str, value: i32) -> &mut Self {
        self.write_attr(VALUE_TAG_INTEGER, name, &value.to_be_bytes())
    }

    /// Write a raw attribute (value-tag, name, value bytes).
    ///
    /// Names and values longer than a u16 length field can express are
    /// truncated with a warning; callers that cannot accept that check
    /// [`MAX_ATTR_LEN`] first.
    pub fn write_attr(&mut self, value_tag: u8, name: &str, value: &[u8]) -> &mut Self {
        if name.len() > MAX_ATTR_LEN || value.len() > MAX_ATTR_LEN {
            warn!(
                attribute = name.get(..64).unwrap_or(name),
                name_len = name.len(),
                value_len = value.len(),
                "truncating oversized IPP attribute"
            );
        }
        let name = clamp_len(name.as_bytes());
        let value = clamp_len(value);

        self.buf.push(value_tag);
        self.buf.extend_from_slice(&(name.len() as u16).to_be_bytes());
        self.buf.extend_from_slice(name);
        self.buf.extend_from_slice(&(value.len() as u16).to_be_bytes());
        self.buf.extend_from_slice(value);
        self
    }

    /// Write the end-of-attributes tag and append the document unframed.
    pub fn finish(mut self, document: &[u8]) -> Vec<u8> {
        self.buf.reserve(document.len() + 1);
        self.buf.push(TAG_END_OF_ATTRIBUTES);
        self.buf.extend_from_slice(document);
        self.buf
    }
}

fn clamp_len(bytes: &[u8]) -> &[u8] {
    &bytes[..bytes.len().min(MAX_ATTR_LEN)]
}

// ---------------------------------------------------------------------------
// Print-Job request
// ---------------------------------------------------------------------------

/// The attributes of one Print-Job submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrintJobRequest<'a> {
    /// `ipp://` or `ipps://` URI of the target printer.
    pub printer_uri: &'a str,
    pub job_name: &'a str,
    /// MIME type of the document (`document-format`).
    pub document_format: &'a str,
    /// Number of copies; sent as the `copies` job attribute.
    pub copies: u32,
}

impl PrintJobRequest<'_> {
    /// Encode the request followed by the document bytes.
    ///
    /// Operation attributes are written in the order RFC 8011 requires:
    /// charset and natural language first, then the target.
    ///
    /// # Errors
    ///
    /// `IppRequest` when a string attribute does not fit a two-byte length.
    pub fn encode(&self, request_id: u32, document: &[u8]) -> Result<Vec<u8>> {
        for (name, value) in [
            ("printer-uri", self.printer_uri),
            ("job-name", self.job_name),
            ("document-format", self.document_format),
        ] {
            if value.len() > MAX_ATTR_LEN {
                return Err(LabelwerkError::IppRequest(format!(
                    "{name} is {} bytes, limit is {MAX_ATTR_LEN}",
                    value.len()
                )));
            }
        }

        let copies = i32::try_from(self.copies.max(1)).unwrap_or(i32::MAX);

        let mut builder = IppMessageBuilder::new(OP_PRINT_JOB, request_id);
        builder
            .begin_group(TAG_OPERATION_ATTRIBUTES)
            .charset("attributes-charset", "utf-8")
            .natural_language("attributes-natural-language", "en-us")
            .uri("printer-uri", self.printer_uri)
            .name_attr("requesting-user-name", REQUESTING_USER_NAME)
            .name_attr("job-name", self.job_name)
            .mime_media_type("document-format", self.document_format);
        builder
            .begin_group(TAG_JOB_ATTRIBUTES)
            .integer("copies", copies);
        Ok(builder.finish(document))
    }
}

// ---------------------------------------------------------------------------
// Response decoding
// ---------------------------------------------------------------------------

/// The fixed 8-byte header of an IPP response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IppResponseHeader {
    pub version_major: u8,
    pub version_minor: u8,
    pub status: u16,
    pub request_id: u32,
}

impl IppResponseHeader {
    /// Decode the header; shorter inputs are `MalformedResponse`.
    pub fn parse(body: &[u8]) -> Result<Self> {
        if body.len() < RESPONSE_HEADER_LEN {
            return Err(LabelwerkError::MalformedResponse(body.len()));
        }
        Ok(Self {
            version_major: body[0],
            version_minor: body[1],
            status: u16::from_be_bytes([body[2], body[3]]),
            request_id: u32::from_be_bytes([body[4], body[5], body[6], body[7]]),
        })
    }

    pub fn is_success(&self) -> bool {
        self.status == STATUS_OK
    }

    pub fn status_name(&self) -> &'static str {
        status_name(self.status)
    }
}

/// Decode a response and require `successful-ok`.
pub fn check_response(body: &[u8]) -> Result<IppResponseHeader> {
    let header = IppResponseHeader::parse(body)?;
    if !header.is_success() {
        return Err(LabelwerkError::IppStatus(header.status));
    }
    Ok(header)
}

/// Readable name for well-known IPP status codes (RFC 8011 SS13.1).
pub fn status_name(code: u16) -> &'static str {
    match code {
        0x0000 => "successful-ok",
        0x0001 => "successful-ok-ignored-or-substituted-attributes",
        0x0002 => "successful-ok-conflicting-attributes",
        0x0400 => "client-error-bad-request",
        0x0401 => "client-error-forbidden",
        0x0402 => "client-error-not-authenticated",
        0x0403 => "client-error-not-authorized",
        0x0404 => "client-error-not-possible",
        0x0405 => "client-error-timeout",
        0x0406 => "client-error-not-found",
        0x0407 => "client-error-gone",
        0x0408 => "client-error-request-entity-too-large",
        0x0409 => "client-error-request-value-too-long",
        0x040A => "client-error-document-format-not-supported",
        0x040B => "client-error-attributes-or-values-not-supported",
        0x0500 => "server-error-internal-error",
        0x0501 => "server-error-operation-not-supported",
        0x0502 => "server-error-service-unavailable",
        0x0503 => "server-error-version-not-supported",
        0x0504 => "server-error-device-error",
        0x0505 => "server-error-temporary-error",
        0x0506 => "server-error-not-accepting-jobs",
        0x0507 => "server-error-busy",
        _ => "unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    use ipp::prelude::*;

    fn request<'a>(format: &'a str, copies: u32) -> PrintJobRequest<'a> {
        PrintJobRequest {
            printer_uri: "ipp://10.0.0.9:631/ipp/print",
            job_name: "ZPL-Label-1700000000-0",
            document_format: format,
            copies,
        }
    }

    /// Walk the operation-attribute group and return (tag, name) pairs.
    fn operation_attributes(bytes: &[u8]) -> Vec<(u8, String)> {
        assert_eq!(bytes[8], TAG_OPERATION_ATTRIBUTES);
        let mut pos = 9;
        let mut attrs = Vec::new();
        while bytes[pos] > 0x0F {
            let tag = bytes[pos];
            let name_len = u16::from_be_bytes([bytes[pos + 1], bytes[pos + 2]]) as usize;
            let name = String::from_utf8(bytes[pos + 3..pos + 3 + name_len].to_vec()).unwrap();
            pos += 3 + name_len;
            let value_len = u16::from_be_bytes([bytes[pos], bytes[pos + 1]]) as usize;
            pos += 2 + value_len;
            attrs.push((tag, name));
        }
        attrs
    }

    #[test]
    fn header_is_ipp_2_0_print_job() {
        let bytes = request("application/pdf", 1).encode(0x01020304, b"").unwrap();
        assert_eq!(&bytes[..8], &[0x02, 0x00, 0x00, 0x02, 0x01, 0x02, 0x03, 0x04]);
    }

    #[test]
    fn operation_attributes_are_in_required_order() {
        let bytes = request("application/pdf", 1).encode(1, b"").unwrap();
        let attrs = operation_attributes(&bytes);
        assert_eq!(
            attrs,
            vec![
                (VALUE_TAG_CHARSET, "attributes-charset".to_string()),
                (VALUE_TAG_NATURAL_LANGUAGE, "attributes-natural-language".to_string()),
                (VALUE_TAG_URI, "printer-uri".to_string()),
                (VALUE_TAG_NAME, "requesting-user-name".to_string()),
                (VALUE_TAG_NAME, "job-name".to_string()),
                (VALUE_TAG_MIME_MEDIA_TYPE, "document-format".to_string()),
            ]
        );
    }

    #[test]
    fn copies_job_attribute_then_end_tag_then_document() {
        let document = b"%PDF-1.7 fake";
        let bytes = request("application/pdf", 3).encode(1, document).unwrap();

        let mut tail = Vec::new();
        tail.push(TAG_JOB_ATTRIBUTES);
        tail.push(VALUE_TAG_INTEGER);
        tail.extend_from_slice(&6u16.to_be_bytes());
        tail.extend_from_slice(b"copies");
        tail.extend_from_slice(&4u16.to_be_bytes());
        tail.extend_from_slice(&3i32.to_be_bytes());
        tail.push(TAG_END_OF_ATTRIBUTES);
        tail.extend_from_slice(document);

        assert!(bytes.ends_with(&tail));
    }

    #[test]
    fn independent_parser_reads_the_request() {
        let bytes = request("image/png", 2).encode(7, b"\x89PNG").unwrap();
        let parsed = ipp::parser::IppParser::new(ipp::reader::IppReader::new(Cursor::new(bytes)))
            .parse()
            .unwrap();

        assert_eq!(parsed.header().request_id, 7);

        let ops = parsed
            .attributes()
            .groups_of(DelimiterTag::OperationAttributes)
            .next()
            .unwrap();
        let value = |name: &str| format!("{}", ops.attributes().get(name).unwrap().value());
        assert_eq!(value("attributes-charset"), "utf-8");
        assert_eq!(value("printer-uri"), "ipp://10.0.0.9:631/ipp/print");
        assert_eq!(value("job-name"), "ZPL-Label-1700000000-0");
        assert_eq!(value("document-format"), "image/png");

        let job = parsed
            .attributes()
            .groups_of(DelimiterTag::JobAttributes)
            .next()
            .unwrap();
        assert!(matches!(
            job.attributes().get("copies").unwrap().value(),
            IppValue::Integer(2)
        ));
    }

    #[test]
    fn oversized_job_name_is_rejected() {
        let job_name = "x".repeat(MAX_ATTR_LEN + 1);
        let request = PrintJobRequest {
            job_name: &job_name,
            ..request("image/png", 1)
        };
        let err = request.encode(1, b"").unwrap_err();
        assert!(matches!(err, LabelwerkError::IppRequest(ref msg) if msg.starts_with("job-name")));
    }

    #[test]
    fn longest_representable_value_is_accepted() {
        let job_name = "x".repeat(MAX_ATTR_LEN);
        let request = PrintJobRequest {
            job_name: &job_name,
            ..request("image/png", 1)
        };
        assert!(request.encode(1, b"").is_ok());
    }

    #[test]
    fn builder_truncates_oversized_values() {
        let mut builder = IppMessageBuilder::new(OP_PRINT_JOB, 1);
        builder.write_attr(VALUE_TAG_NAME, "n", &vec![b'a'; MAX_ATTR_LEN + 10]);
        let bytes = builder.finish(b"");
        // header(8) + tag(1) + name len(2) + name(1), then the value length.
        assert_eq!(u16::from_be_bytes([bytes[12], bytes[13]]), u16::MAX);
        assert_eq!(bytes.len(), 8 + 1 + 2 + 1 + 2 + MAX_ATTR_LEN + 1);
    }

    #[test]
    fn all_zero_header_is_success() {
        let header = check_response(&[0u8; 8]).unwrap();
        assert_eq!(header.status, 0);
        assert!(header.is_success());
    }

    #[test]
    fn short_response_is_malformed() {
        for len in 0..RESPONSE_HEADER_LEN {
            let err = check_response(&vec![0u8; len]).unwrap_err();
            assert!(matches!(err, LabelwerkError::MalformedResponse(n) if n == len));
        }
    }

    #[test]
    fn non_zero_status_is_an_error() {
        let body = [0x02, 0x00, 0x04, 0x0A, 0x00, 0x00, 0x00, 0x01, 0x03];
        let err = check_response(&body).unwrap_err();
        assert!(matches!(err, LabelwerkError::IppStatus(0x040A)));

        let header = IppResponseHeader::parse(&body).unwrap();
        assert_eq!(header.request_id, 1);
        assert_eq!(
            header.status_name(),
            "client-error-document-format-not-supported"
        );
    }

    #[test]
    fn ignored_attributes_status_is_still_an_error() {
        let body = [0x02, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01];
        assert!(matches!(
            check_response(&body),
            Err(LabelwerkError::IppStatus(1))
        ));
    }
}
