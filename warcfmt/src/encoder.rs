//! Encoding captures as complete WARC records.

use std::borrow::Cow;
use std::io::Write;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::digest::{self, EMPTY_DIGEST};
use crate::{normalize_target_uri, Capture, EncodingError, FieldKind, Header, RecordKind, Version};

/// `Content-Type` of a `response` record holding an HTTP response.
pub const HTTP_RESPONSE_CONTENT_TYPE: &str = "application/http; msgtype=response";
/// `Content-Type` of a `resource` record whose capture declared no type.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";
/// `Content-Type` of a `warcinfo` record.
pub const WARC_FIELDS_CONTENT_TYPE: &str = "application/warc-fields";

/// `WARC-Date` format: W3C ISO 8601 profile, UTC, second precision.
const WARC_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

const CRLF: &[u8] = b"\r\n";

/// A strategy for turning captures into the bytes of one complete record.
///
/// Implemented by [`WarcRecordFormat`], and by any `Fn(&Capture) -> Result<Vec<u8>, EncodingError>`
/// so that callers can substitute their own encoding.
pub trait RecordFormat: Send + Sync {
    fn format(&self, capture: &Capture) -> Result<Vec<u8>, EncodingError>;
}

impl<F> RecordFormat for F
where
    F: Fn(&Capture) -> Result<Vec<u8>, EncodingError> + Send + Sync,
{
    fn format(&self, capture: &Capture) -> Result<Vec<u8>, EncodingError> {
        self(capture)
    }
}

/// The standard WARC/1.0 encoding of captures as `response` or `resource` records.
///
/// A capture whose metadata retained the HTTP response headers becomes a `response` record whose
/// block is those headers followed by the content. Otherwise it becomes a `resource` record
/// holding the content alone. Header fields are always written in the same order: record ID,
/// length, date, type, IP address (if known), target URI, content type, payload digest and block
/// digest.
#[derive(Debug, Clone, Copy, Default)]
pub struct WarcRecordFormat;

impl WarcRecordFormat {
    pub fn new() -> Self {
        WarcRecordFormat
    }

    /// Encode one capture, failing without output if it cannot form a valid record.
    pub fn encode(&self, capture: &Capture) -> Result<Vec<u8>, EncodingError> {
        let metadata = capture.metadata();
        let http_headers = metadata
            .response_headers()
            .filter(|h| !is_blank(h))
            .map(terminate_http_headers);
        let kind = match http_headers {
            Some(_) => RecordKind::Response,
            None => RecordKind::Resource,
        };
        let http_headers: &[u8] = http_headers.as_deref().unwrap_or(&[]);

        let target_uri = normalize_target_uri(capture.url())?;
        let content_type = match kind {
            RecordKind::Response => HTTP_RESPONSE_CONTENT_TYPE,
            _ => metadata
                .content_type()
                .filter(|ct| !ct.trim().is_empty())
                .unwrap_or(DEFAULT_CONTENT_TYPE),
        };
        crate::check_field_value(FieldKind::ContentType.as_ref(), content_type)?;

        let payload = capture.content();
        let content_length = http_headers.len() + payload.map_or(0, <[u8]>::len);
        let (payload_digest, block_digest) = match payload {
            Some(payload) => (
                digest::digest(payload),
                digest::digest_concat(http_headers, payload),
            ),
            None => (EMPTY_DIGEST.clone(), digest::digest(http_headers)),
        };

        let mut header = Header::new(Version::WARC1_0);
        header.append_field(FieldKind::RecordId, new_record_id());
        header.append_field(FieldKind::ContentLength, content_length.to_string());
        header.append_field(
            FieldKind::Date,
            format_warc_date(capture.fetch_time().unwrap_or_else(Utc::now)),
        );
        header.append_field(FieldKind::Type, kind.as_ref());
        if let Some(address) = metadata.ip_address() {
            header.append_field(FieldKind::IpAddress, address.to_string());
        }
        header.append_field(FieldKind::TargetURI, target_uri);
        header.append_field(FieldKind::ContentType, content_type);
        header.append_field(FieldKind::PayloadDigest, payload_digest);
        header.append_field(FieldKind::BlockDigest, block_digest);

        let record = serialize(&header, &[http_headers, payload.unwrap_or(&[])]);
        trace!(
            "encoded {} record for {} ({} block bytes)",
            kind.as_ref(),
            capture.url(),
            content_length
        );
        Ok(record)
    }
}

impl RecordFormat for WarcRecordFormat {
    fn format(&self, capture: &Capture) -> Result<Vec<u8>, EncodingError> {
        self.encode(capture)
    }
}

/// Build a `warcinfo` record describing the files it is written to.
///
/// The block is an `application/warc-fields` list with one `name: value` line per field, in the
/// order given. Field names must be WARC tokens and values may not contain line breaks.
///
/// ```
/// let record = warcfmt::warcinfo(vec![
///     ("software", "warcsink/0.1"),
///     ("format", "WARC File Format 1.0"),
/// ]).unwrap();
/// let text = String::from_utf8(record).unwrap();
///
/// assert!(text.starts_with("WARC/1.0\r\nWARC-Type: warcinfo\r\n"));
/// assert!(text.ends_with("\r\n\r\nsoftware: warcsink/0.1\r\nformat: WARC File Format 1.0\r\n\r\n\r\n"));
/// ```
pub fn warcinfo<I, K, V>(fields: I) -> Result<Vec<u8>, EncodingError>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut block = Vec::new();
    for (name, value) in fields {
        let (name, value) = (name.as_ref(), value.as_ref());
        if !crate::is_token(name) {
            return Err(EncodingError::InvalidFieldName(name.to_owned()));
        }
        crate::check_field_value(name, value)?;

        block.extend_from_slice(name.as_bytes());
        block.extend_from_slice(b": ");
        block.extend_from_slice(value.as_bytes());
        block.extend_from_slice(CRLF);
    }

    let mut header = Header::new(Version::WARC1_0);
    header.append_field(FieldKind::Type, RecordKind::Info.as_ref());
    header.append_field(FieldKind::Date, format_warc_date(Utc::now()));
    header.append_field(FieldKind::RecordId, new_record_id());
    header.append_field(FieldKind::ContentType, WARC_FIELDS_CONTENT_TYPE);
    header.append_field(FieldKind::ContentLength, block.len().to_string());

    Ok(serialize(&header, &[&block]))
}

/// Format a timestamp as a `WARC-Date` value.
pub fn format_warc_date(date: DateTime<Utc>) -> String {
    date.format(WARC_DATE_FORMAT).to_string()
}

/// A fresh `WARC-Record-ID` value.
fn new_record_id() -> String {
    format!("<urn:uuid:{}>", Uuid::new_v4())
}

fn is_blank(bytes: &[u8]) -> bool {
    bytes.iter().all(u8::is_ascii_whitespace)
}

/// Ensure an HTTP header block ends with exactly one empty line.
fn terminate_http_headers(headers: &[u8]) -> Cow<[u8]> {
    if headers.ends_with(b"\r\n\r\n") && !headers.ends_with(b"\n\r\n\r\n") {
        return Cow::Borrowed(headers);
    }

    let end = headers
        .iter()
        .rposition(|&b| b != b'\r' && b != b'\n')
        .map_or(0, |i| i + 1);
    let mut terminated = Vec::with_capacity(end + 4);
    terminated.extend_from_slice(&headers[..end]);
    terminated.extend_from_slice(b"\r\n\r\n");
    Cow::Owned(terminated)
}

/// Write a header and its block into a new buffer.
fn serialize(header: &Header, block: &[&[u8]]) -> Vec<u8> {
    let block_len: usize = block.iter().map(|part| part.len()).sum();
    let mut out = Vec::with_capacity(512 + block_len);

    let written: std::io::Result<()> = (|| {
        let mut body = header.write_to(&mut out)?;
        for part in block {
            body.write_all(part)?;
        }
        body.finish()
    })();
    // Writes to a Vec are infallible and the header always declares the length of `block`.
    written.expect("serializing a record into memory failed");
    out
}
