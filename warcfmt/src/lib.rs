//! Tools for encoding web captures as WARC (Web ARChive) records.
//!
//! ## Background
//!
//! WARC files are used to store digital resources and related information, generally for archival
//! storage. A crawler requests resources from web servers and stores each response together with
//! enough metadata to identify when and where it was captured. The format is standardized as
//! ISO 28500; see <https://iipc.github.io/warc-specifications/> for freely available versions of
//! the specification.
//!
//! ## WARC structure
//!
//! A WARC file is a simple concatenation of records. Each record has a format similar to an HTTP
//! message, consisting of a version declaration, a number of header fields, and any number of bytes
//! of data. A `resource` record produced by this library looks like this:
//!
//! ```text
//! WARC/1.0
//! WARC-Record-ID: <urn:uuid:e061d11b-fb0a-4314-88c5-54e4870be701>
//! Content-Length: 5
//! WARC-Date: 2021-08-24T23:19:14Z
//! WARC-Type: resource
//! WARC-Target-URI: http://example.org/a%20b
//! Content-Type: text/plain
//! WARC-Payload-Digest: sha1:VL2MMHO4YXUKFWV63YHTWSBM3GXKSQ2N
//! WARC-Block-Digest: sha1:VL2MMHO4YXUKFWV63YHTWSBM3GXKSQ2N
//!
//! hello
//!
//!
//! ```
//!
//! Every line ends in CRLF, and the record block is followed by two more CRLFs.
//!
//! ## Library structure
//!
//! A [`Capture`] describes one fetched resource. A [`RecordFormat`] turns captures into the bytes
//! of a complete record; [`WarcRecordFormat`] is the standard implementation, and
//! [`warcinfo`](encoder::warcinfo) builds the informational record that usually starts a file.
//! Lower-level pieces are also available: [`Header`] holds an ordered set of fields and writes them
//! out through a [`RecordWriter`](record::RecordWriter), the [`digest`] module computes
//! `labelled-digest` values, and [`Compression`] frames finished records for storage.

#[macro_use]
extern crate lazy_static;
#[macro_use]
extern crate log;

use thiserror::Error;

pub mod capture;
pub mod compression;
pub mod digest;
pub mod encoder;
mod header;
pub mod record;
#[cfg(test)]
mod tests;
mod uri;
mod version;

pub use capture::{Capture, Metadata};
pub use compression::Compression;
pub use encoder::{warcinfo, RecordFormat, WarcRecordFormat};
pub use header::{FieldKind, FieldName, Header, RecordKind};
pub use uri::normalize_target_uri;
pub use version::Version;

/// Reasons a capture cannot be encoded as a WARC record.
///
/// A capture that fails to encode is never partially emitted; callers should treat it as
/// rejected and decide upstream whether to retry or drop it.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EncodingError {
    /// The capture URL is not a syntactically valid URI, even after escaping spaces.
    #[error("invalid URI {0:?}")]
    InvalidUri(String),
    /// A field name contains characters not permitted in a WARC `field-name`.
    #[error("field name {0:?} contains illegal characters")]
    InvalidFieldName(String),
    /// A field value would break the record framing (it contains CR or LF).
    #[error("value of field {name} contains a line break: {value:?}")]
    InvalidFieldValue { name: String, value: String },
}

/// WARC EBNF "separators" class
const SEPARATORS: &[u8] = &[
    b'(', b')', b'<', b'>', b'@', b',', b';', b':', b'\\', b'"', b'/', b'[', b']', b'?', b'=', b'{',
    b'}', b' ', b'\t',
];

/// WARC EBNF "CTL" class: ASCII chars 0-31 and DEL (127)
fn is_ctl(b: u8) -> bool {
    b < 0x20 || b == 0x7f
}

/// Returns `true` if `name` is a non-empty WARC `token`.
fn is_token(name: &str) -> bool {
    !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii() && !is_ctl(b) && !SEPARATORS.contains(&b))
}

/// Reject values that would terminate a header line early.
fn check_field_value(name: &str, value: &str) -> Result<(), EncodingError> {
    if value.contains(|c: char| c == '\r' || c == '\n') {
        return Err(EncodingError::InvalidFieldValue {
            name: name.to_owned(),
            value: value.to_owned(),
        });
    }
    Ok(())
}
