//! The input to record encoding: one fetched resource and what is known about it.

use std::net::IpAddr;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use uncased::UncasedStr;

/// Legacy metadata key carrying the verbatim HTTP response headers.
pub const RESPONSE_HEADERS_KEY: &str = "_response.headers_";
/// Legacy metadata key carrying the address content was fetched from.
pub const IP_ADDRESS_KEY: &str = "_ip_";
/// Metadata key (matched case-insensitively) carrying the server-declared content type.
pub const CONTENT_TYPE_KEY: &str = "Content-Type";

/// Metadata accompanying a [`Capture`].
///
/// The few values that affect record encoding have named accessors; everything else is kept in
/// an ordered, multi-valued map available through [`get`](Self::get) and [`iter`](Self::iter).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    response_headers: Option<Vec<u8>>,
    content_type: Option<String>,
    ip_address: Option<IpAddr>,
    other: IndexMap<String, Vec<String>>,
}

impl Metadata {
    pub fn new() -> Self {
        Default::default()
    }

    /// Build metadata from a flat list of key/value pairs, as produced by crawlers that keep
    /// metadata in a multi-valued string map.
    ///
    /// The reserved keys [`RESPONSE_HEADERS_KEY`], [`IP_ADDRESS_KEY`] and [`CONTENT_TYPE_KEY`]
    /// populate the typed fields; for those only the first value is used. An IP address that
    /// cannot be parsed is kept as an ordinary entry instead. All other pairs are kept in order.
    ///
    /// ```
    /// # use warcfmt::Metadata;
    /// let metadata = Metadata::from_fields(vec![
    ///     ("content-type", "text/html"),
    ///     ("_ip_", "192.0.2.7"),
    ///     ("depth", "2"),
    /// ]);
    /// assert_eq!(metadata.content_type(), Some("text/html"));
    /// assert_eq!(metadata.ip_address(), Some("192.0.2.7".parse().unwrap()));
    /// assert_eq!(metadata.get("depth"), Some("2"));
    /// ```
    pub fn from_fields<I, K, V>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut metadata = Metadata::new();
        for (key, value) in fields {
            let (key, value) = (key.into(), value.into());

            if key == RESPONSE_HEADERS_KEY {
                if metadata.response_headers.is_none() {
                    metadata.response_headers = Some(value.into_bytes());
                }
                continue;
            }
            if UncasedStr::new(&key).eq(CONTENT_TYPE_KEY) {
                if metadata.content_type.is_none() {
                    metadata.content_type = Some(value);
                }
                continue;
            }
            if key == IP_ADDRESS_KEY && metadata.ip_address.is_none() {
                match value.trim().parse() {
                    Ok(addr) => {
                        metadata.ip_address = Some(addr);
                        continue;
                    }
                    Err(_) => warn!("ignoring unparseable fetch address {:?}", value),
                }
            }
            metadata.add(key, value);
        }
        metadata
    }

    /// Set the verbatim HTTP response header block, as received from the server.
    pub fn with_response_headers<B: Into<Vec<u8>>>(mut self, headers: B) -> Self {
        self.response_headers = Some(headers.into());
        self
    }

    pub fn with_content_type<S: Into<String>>(mut self, content_type: S) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn with_ip_address(mut self, address: IpAddr) -> Self {
        self.ip_address = Some(address);
        self
    }

    /// Append a value for an arbitrary key.
    pub fn add<K: Into<String>, V: Into<String>>(&mut self, key: K, value: V) {
        self.other.entry(key.into()).or_default().push(value.into());
    }

    /// The verbatim HTTP response header block, if it was retained.
    pub fn response_headers(&self) -> Option<&[u8]> {
        self.response_headers.as_deref()
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn ip_address(&self) -> Option<IpAddr> {
        self.ip_address
    }

    /// The first value stored for `key`, excluding the reserved keys.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.get_all(key).first().map(String::as_str)
    }

    pub fn get_all(&self, key: &str) -> &[String] {
        self.other.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Iterate over non-reserved entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.other.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}

/// One fetched resource: its URL, content if any, and metadata.
///
/// A capture is not modified by encoding, so the same capture may be encoded again (for
/// instance on retry); each encoding produces a record with a fresh record ID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capture {
    url: String,
    content: Option<Vec<u8>>,
    metadata: Metadata,
    fetch_time: Option<DateTime<Utc>>,
}

impl Capture {
    pub fn new<S: Into<String>>(url: S) -> Self {
        Capture {
            url: url.into(),
            content: None,
            metadata: Metadata::new(),
            fetch_time: None,
        }
    }

    pub fn with_content<B: Into<Vec<u8>>>(mut self, content: B) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Record when the resource was fetched; used as the record's `WARC-Date`.
    pub fn with_fetch_time(mut self, fetch_time: DateTime<Utc>) -> Self {
        self.fetch_time = Some(fetch_time);
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn content(&self) -> Option<&[u8]> {
        self.content.as_deref()
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn fetch_time(&self) -> Option<DateTime<Utc>> {
        self.fetch_time
    }
}
