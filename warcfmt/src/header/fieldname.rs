use crate::FieldKind;
use std::borrow::Borrow;
use std::cmp::Ordering;
use std::convert::TryFrom;
use std::hash::{Hash, Hasher};
use uncased::{AsUncased, UncasedStr};

impl From<&FieldKind> for FieldName {
    fn from(kind: &FieldKind) -> FieldName {
        kind.into_name()
    }
}

/// The name of a WARC header field.
///
/// Field names are case-insensitive ASCII tokens. Names this crate writes are enumerated by
/// [`FieldKind`]; any other name (such as an extension field) is carried verbatim in
/// [`Other`](FieldName::Other). Comparison, ordering and hashing are always case-insensitive,
/// and known names normalize to the spelling used by the standard.
///
/// ```
/// # use warcfmt::{FieldName, FieldKind};
/// let parsed: FieldName = "warc-record-id".into();
///
/// assert_eq!(FieldKind::RecordId, parsed);
/// assert_eq!("WARC-Record-ID", parsed.as_ref());
///
/// let custom: FieldName = "X-Crawler-Note".into();
/// assert_eq!(custom, FieldName::from("x-crawler-note"));
/// assert_eq!("X-Crawler-Note", custom.as_ref());
/// ```
#[derive(Debug, Clone)]
pub enum FieldName {
    Known(FieldKind),
    /// Any unrecognized field name.
    ///
    /// `Other` should generally not be constructed directly; use the [`From`] impl so that
    /// names matching a [`FieldKind`] become [`Known`](FieldName::Known).
    Other(Box<str>),
}

impl AsRef<str> for FieldName {
    fn as_ref(&self) -> &str {
        match self {
            FieldName::Known(x) => x.as_ref(),
            FieldName::Other(s) => s.as_ref(),
        }
    }
}

impl<S: AsRef<str> + Into<Box<str>>> From<S> for FieldName {
    fn from(s: S) -> Self {
        match FieldKind::try_from(s.as_ref()) {
            Ok(x) => FieldName::Known(x),
            Err(_) => FieldName::Other(s.into()),
        }
    }
}

impl From<FieldKind> for FieldName {
    fn from(k: FieldKind) -> Self {
        FieldName::Known(k)
    }
}

impl PartialEq<FieldKind> for FieldName {
    fn eq(&self, other: &FieldKind) -> bool {
        match self {
            FieldName::Known(k) => k == other,
            FieldName::Other(s) => s.as_ref().as_uncased() == other.as_ref(),
        }
    }
}

impl Borrow<UncasedStr> for FieldName {
    fn borrow(&self) -> &UncasedStr {
        self.as_ref().as_uncased()
    }
}

// Borrow requires the same semantics between the borrowed and original versions,
// so Eq, Ord and Hash are implemented in terms of the case-insensitive field name.
impl PartialEq for FieldName {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (FieldName::Known(l), FieldName::Known(r)) => l == r,
            _ => self.as_ref().as_uncased().eq(other.as_ref()),
        }
    }
}

impl Eq for FieldName {}

impl PartialOrd for FieldName {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FieldName {
    fn cmp(&self, other: &Self) -> Ordering {
        self.as_ref().as_uncased().cmp(other.as_ref().as_uncased())
    }
}

impl Hash for FieldName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_ref().as_uncased().hash(state)
    }
}
