//! Normalization of capture URLs into `WARC-Target-URI` values.

use std::fmt::Write;

use regex::Regex;

use crate::EncodingError;

lazy_static! {
    /// RFC 3986 `scheme`.
    static ref SCHEME: Regex = Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*$").expect("scheme regex invalid");
    /// `[userinfo@]host[:port]`, where only an IP-literal host may use brackets.
    static ref AUTHORITY: Regex = Regex::new(concat!(
        r"^(?:(?:[A-Za-z0-9\-._~!$&'()*+,;=:]|%[0-9A-Fa-f]{2})*@)?",
        r"(?:\[[A-Za-z0-9\-._~!$&'()*+,;=:]+\]|(?:[A-Za-z0-9\-._~!$&'()*+,;=]|%[0-9A-Fa-f]{2})*)",
        r"(?::[0-9]*)?$"
    ))
    .expect("URI authority regex invalid");
    /// Path segments and their separators.
    static ref PATH: Regex = Regex::new(r"^(?:[A-Za-z0-9\-._~!$&'()*+,;=:@/]|%[0-9A-Fa-f]{2})*$")
        .expect("URI path regex invalid");
    /// A query. Brackets are tolerated here, as most parsers do.
    static ref QUERY: Regex = Regex::new(r"^(?:[A-Za-z0-9\-._~!$&'()*+,;=:@/?\[\]]|%[0-9A-Fa-f]{2})*$")
        .expect("URI query regex invalid");
    /// A fragment, which may not itself contain `#` or brackets.
    static ref FRAGMENT: Regex = Regex::new(r"^(?:[A-Za-z0-9\-._~!$&'()*+,;=:@/?]|%[0-9A-Fa-f]{2})*$")
        .expect("URI fragment regex invalid");
}

/// Split `s` at the first `delimiter`, dropping the delimiter.
fn split_at_char(s: &str, delimiter: char) -> (&str, Option<&str>) {
    match s.find(delimiter) {
        Some(i) => (&s[..i], Some(&s[i + 1..])),
        None => (s, None),
    }
}

/// Turn a capture URL into a value suitable for `WARC-Target-URI`.
///
/// Spaces are escaped as `%20` and non-ASCII characters are percent-encoded as UTF-8, then the
/// result must be a syntactically valid RFC 3986 URI reference. Anything else (such as `|`, `<`,
/// unescaped `%`, a second `#`, brackets outside an IP-literal host or query, or an empty
/// authority with nothing after it) fails with [`EncodingError::InvalidUri`].
///
/// ```
/// # use warcfmt::normalize_target_uri;
/// assert_eq!(
///     normalize_target_uri("http://example.org/a b").unwrap(),
///     "http://example.org/a%20b"
/// );
/// assert!(normalize_target_uri("http://example.org/a|b").is_err());
/// ```
pub fn normalize_target_uri(url: &str) -> Result<String, EncodingError> {
    let invalid = || EncodingError::InvalidUri(url.to_owned());
    if url.is_empty() {
        return Err(invalid());
    }

    let mut escaped = String::with_capacity(url.len());
    for c in url.chars() {
        if c == ' ' {
            escaped.push_str("%20");
        } else if c.is_ascii() {
            escaped.push(c);
        } else {
            let mut utf8 = [0u8; 4];
            for b in c.encode_utf8(&mut utf8).bytes() {
                // Writing to a String cannot fail.
                let _ = write!(escaped, "%{:02X}", b);
            }
        }
    }

    // A colon before any of "/?#" terminates a scheme, which must then be well-formed and
    // followed by something.
    if let Some(i) = escaped.find(|c: char| matches!(c, ':' | '/' | '?' | '#')) {
        if escaped.as_bytes()[i] == b':' {
            if !SCHEME.is_match(&escaped[..i]) || i + 1 == escaped.len() {
                return Err(invalid());
            }
        }
    }

    let (before_fragment, fragment) = split_at_char(&escaped, '#');
    let (hier, query) = split_at_char(before_fragment, '?');
    let hier = match hier.find(|c: char| c == ':' || c == '/') {
        Some(i) if hier.as_bytes()[i] == b':' => &hier[i + 1..],
        _ => hier,
    };
    let path = match hier.strip_prefix("//") {
        Some(rest) => {
            let (authority, path) = rest.split_at(rest.find('/').unwrap_or(rest.len()));
            // `file:///path` has an empty authority, but `http://` names nothing at all.
            if !AUTHORITY.is_match(authority) || (authority.is_empty() && path.is_empty()) {
                trace!("rejecting target URI {:?}: bad authority {:?}", url, authority);
                return Err(invalid());
            }
            path
        }
        None => hier,
    };

    if !PATH.is_match(path)
        || !query.map_or(true, |q| QUERY.is_match(q))
        || !fragment.map_or(true, |f| FRAGMENT.is_match(f))
    {
        trace!("rejecting target URI {:?} (escaped as {:?})", url, escaped);
        return Err(invalid());
    }

    Ok(escaped)
}
