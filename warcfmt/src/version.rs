use std::fmt;

/// The version of a WARC record.
///
/// Versions 1.0 and 1.1 correspond to ISO 28500:2009 and ISO 28500:2017 and can be
/// conveniently referred to with the associated constants [`WARC1_0`](Self::WARC1_0) and
/// [`WARC1_1`](Self::WARC1_1). Records produced by this crate are WARC 1.0, which remains the
/// version most widely understood by replay tools.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone)]
pub struct Version {
    /// The integer part of the version number.
    ///
    /// In '12.345', this is 12.
    pub major: u32,
    /// The fractional part of the version number.
    ///
    /// In '12.345', this is 345.
    pub minor: u32,
}

impl Version {
    /// WARC 1.0, as specified by ISO 28500:2009.
    pub const WARC1_0: Self = Version { major: 1, minor: 0 };
    /// WARC 1.1, as specified by ISO 28500:2017.
    pub const WARC1_1: Self = Version { major: 1, minor: 1 };
}

/// Format the version as it appears on the first line of a record, without line terminator.
///
/// ```
/// # use warcfmt::Version;
/// assert_eq!(Version::WARC1_0.to_string(), "WARC/1.0");
/// ```
impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "WARC/{}.{}", self.major, self.minor)
    }
}
