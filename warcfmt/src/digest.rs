//! `labelled-digest` computation for `WARC-Block-Digest` and `WARC-Payload-Digest`.
//!
//! Digests are SHA-1 hashes, base32-encoded (RFC 4648) and labelled with the algorithm as
//! suggested by sections 5.8 and 5.9 of the WARC 1.1 specification: `sha1:<base32>`. A SHA-1
//! hash is 160 bits, so the encoded value is always exactly 32 characters with no padding.
//!
//! Every function here hashes with a fresh context, so they may be called concurrently.

use data_encoding::BASE32;
use sha1::{Digest, Sha1};

/// The algorithm label prefixed to every digest.
pub const LABEL: &str = "sha1:";

lazy_static! {
    /// The digest of an empty buffer, reused for captures that have no content.
    pub static ref EMPTY_DIGEST: String = digest(&[]);
}

/// An incremental SHA-1 digester.
///
/// ```
/// # use warcfmt::digest::{self, Sha1Digester};
/// let mut digester = Sha1Digester::new();
/// digester.update(b"hel");
/// digester.update(b"lo");
/// assert_eq!(digester.finalize(), digest::digest(b"hello"));
/// ```
#[derive(Clone, Default)]
pub struct Sha1Digester {
    length: u64,
    hasher: Sha1,
}

impl Sha1Digester {
    pub fn new() -> Self {
        Default::default()
    }

    /// Accumulate data into the digest.
    pub fn update(&mut self, data: &[u8]) {
        self.length += data.len() as u64;
        self.hasher.update(data);
    }

    /// The number of bytes digested so far.
    pub fn len(&self) -> u64 {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Compute the final digest as a `labelled-digest` string.
    pub fn finalize(self) -> String {
        let hash = self.hasher.finalize();
        let digest_len = BASE32.encode_len(hash.len());
        let mut out = String::with_capacity(LABEL.len() + digest_len);
        let initial_capacity = out.capacity();

        out += LABEL;
        BASE32.encode_append(hash.as_slice(), &mut out);
        debug_assert_eq!(initial_capacity, out.len());

        out
    }
}

/// Compute the `labelled-digest` of a buffer.
///
/// ```
/// assert_eq!(
///     warcfmt::digest::digest(b"hello"),
///     "sha1:VL2MMHO4YXUKFWV63YHTWSBM3GXKSQ2N"
/// );
/// ```
pub fn digest(payload: &[u8]) -> String {
    let mut digester = Sha1Digester::new();
    digester.update(payload);
    digester.finalize()
}

/// Compute the digest of `prefix` followed by `payload` without concatenating them.
///
/// The result is identical to `digest(&[prefix, payload].concat())`.
pub fn digest_concat(prefix: &[u8], payload: &[u8]) -> String {
    let mut digester = Sha1Digester::new();
    digester.update(prefix);
    digester.update(payload);
    digester.finalize()
}
