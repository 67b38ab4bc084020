use crate::FieldName;

/// Standardized values for [field names](FieldName) written by this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// `WARC-Record-ID`: a globally unique identifier for a record.
    ///
    /// Mandatory. Values are a URI delimited by angle brackets; this crate always writes a
    /// random UUID URN such as `<urn:uuid:f81d4fae-7dec-11d0-a765-00a0c91e6bf6>`.
    RecordId,
    /// `Content-Length`: the number of octets in the record block.
    ///
    /// Mandatory. Values consist of one or more ASCII digits.
    ContentLength,
    /// `WARC-Date`: the instant that capture of the record data began.
    ///
    /// Mandatory. A UTC timestamp in the W3C profile of ISO 8601, `YYYY-MM-DDThh:mm:ssZ`.
    Date,
    /// `WARC-Type`: the type of a record, corresponding to a [`RecordKind`](crate::RecordKind).
    ///
    /// Mandatory.
    Type,
    /// `Content-Type`: the MIME type of the record block.
    ///
    /// Readers treat a record without this field as `application/octet-stream`.
    ContentType,
    /// `WARC-Block-Digest`: a `labelled-digest` of the complete record block.
    ///
    /// See the [`digest`](crate::digest) module for the `sha1:<base32>` form written here.
    BlockDigest,
    /// `WARC-Payload-Digest`: a `labelled-digest` of the record payload.
    ///
    /// For a `response` record the payload is the HTTP entity body, which excludes the HTTP
    /// headers that form the start of the block.
    PayloadDigest,
    /// `WARC-IP-Address`: the IP address that was contacted to retrieve the content.
    ///
    /// IPv4 addresses are written as a dotted quad, IPv6 addresses per RFC 4291 section 2.2.
    IpAddress,
    /// `WARC-Target-URI`: the original URI that provided the record content.
    TargetURI,
}

impl FieldKind {
    pub fn into_name(self) -> FieldName {
        FieldName::Known(self)
    }
}

include!(concat!(env!("OUT_DIR"), "/field_kind_conversions.rs"));

impl PartialEq<FieldName> for FieldKind {
    fn eq(&self, other: &FieldName) -> bool {
        other == self
    }
}
