use uncased::AsUncased;

/// The kinds of record this crate produces, as written in the [`WARC-Type`](crate::FieldKind::Type)
/// field.
///
/// A `RecordKind` can be parsed case-insensitively from a string with `TryFrom<&str>` and
/// retrieved in canonical form through `AsRef<str>`.
///
/// ```
/// # use warcfmt::RecordKind;
/// use std::convert::TryFrom;
///
/// assert_eq!(RecordKind::try_from("Response"), Ok(RecordKind::Response));
/// assert_eq!(RecordKind::Info.as_ref(), "warcinfo");
/// assert!(RecordKind::try_from("revisit").is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialOrd, Ord, Hash)]
pub enum RecordKind {
    /// `warcinfo`: describes the records that follow it, usually to the end of the file.
    ///
    /// The block is an `application/warc-fields` list of `name: value` lines describing the
    /// crawl that produced the file.
    Info,
    /// `response`: a complete scheme-specific response, including protocol headers.
    ///
    /// For HTTP this is the status line and headers as received, followed by the entity body.
    Response,
    /// `resource`: a resource without full protocol response information.
    ///
    /// Used when the original protocol headers were not retained.
    Resource,
}

include!(concat!(env!("OUT_DIR"), "/record_kind_conversions.rs"));

impl<S: AsRef<str>> PartialEq<S> for RecordKind {
    fn eq(&self, other: &S) -> bool {
        self.as_uncased().eq(other.as_ref())
    }
}

impl Eq for RecordKind {}
