//! Deciding when to move on to a new output file.

use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};

use thiserror::Error;

/// Decides whether the current file should be closed and a new one started.
///
/// [`mark`](Self::mark) is called after every record with the logical (uncompressed) offset
/// reached in the current file. [`reset`](Self::reset) is called whenever a new file is opened.
pub trait RotationPolicy: Send {
    fn mark(&mut self, offset: u64) -> bool;
    fn reset(&mut self);
}

/// Size units, in powers of 1024.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Units {
    KB,
    MB,
    GB,
    TB,
}

impl Units {
    pub fn bytes(self) -> u64 {
        match self {
            Units::KB => 1 << 10,
            Units::MB => 1 << 20,
            Units::GB => 1 << 30,
            Units::TB => 1 << 40,
        }
    }
}

impl FromStr for Units {
    type Err = ParseSizeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "KB" | "K" => Ok(Units::KB),
            "MB" | "M" => Ok(Units::MB),
            "GB" | "G" => Ok(Units::GB),
            "TB" | "T" => Ok(Units::TB),
            _ => Err(ParseSizeError::UnknownUnit(s.to_owned())),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseSizeError {
    #[error("no size given")]
    Empty,
    #[error("invalid size {0:?}")]
    InvalidNumber(String),
    #[error("unknown size unit {0:?}; expected one of KB, MB, GB or TB")]
    UnknownUnit(String),
    #[error("size {0:?} is too large")]
    Overflow(String),
}

/// Parse a size such as `"1GB"`, `"512 MB"` or `"1048576"` (bytes) into a byte count.
///
/// ```
/// # use warcsink::rotation::parse_size;
/// assert_eq!(parse_size("1GB"), Ok(1 << 30));
/// assert_eq!(parse_size("512 mb"), Ok(512 << 20));
/// assert_eq!(parse_size("1048576"), Ok(1 << 20));
/// assert!(parse_size("12 parsecs").is_err());
/// ```
pub fn parse_size(s: &str) -> Result<u64, ParseSizeError> {
    let s = s.trim();
    if s.is_empty() {
        return Err(ParseSizeError::Empty);
    }
    let split = s
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or_else(|| s.len());
    let (count, unit) = s.split_at(split);
    let count: u64 = count
        .parse()
        .map_err(|_| ParseSizeError::InvalidNumber(s.to_owned()))?;

    let unit = unit.trim_start();
    let multiplier = if unit.is_empty() {
        1
    } else {
        unit.parse::<Units>()?.bytes()
    };
    count
        .checked_mul(multiplier)
        .ok_or_else(|| ParseSizeError::Overflow(s.to_owned()))
}

/// Rotates once the amount of data written to a file reaches a limit.
///
/// The size is measured in uncompressed record bytes, so compressed files will usually be
/// considerably smaller than the limit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSizeRotationPolicy {
    max_bytes: u64,
    last_offset: u64,
    current_bytes_written: u64,
}

impl FileSizeRotationPolicy {
    pub fn new(count: u64, units: Units) -> Self {
        Self::from_bytes(count.saturating_mul(units.bytes()))
    }

    pub fn from_bytes(max_bytes: u64) -> Self {
        FileSizeRotationPolicy {
            max_bytes,
            last_offset: 0,
            current_bytes_written: 0,
        }
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }
}

/// 1 GiB per file.
impl Default for FileSizeRotationPolicy {
    fn default() -> Self {
        Self::new(1, Units::GB)
    }
}

impl FromStr for FileSizeRotationPolicy {
    type Err = ParseSizeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_size(s).map(Self::from_bytes)
    }
}

impl RotationPolicy for FileSizeRotationPolicy {
    fn mark(&mut self, offset: u64) -> bool {
        self.current_bytes_written += offset.saturating_sub(self.last_offset);
        self.last_offset = offset;
        self.current_bytes_written >= self.max_bytes
    }

    fn reset(&mut self) {
        self.current_bytes_written = 0;
        self.last_offset = 0;
    }
}

/// Rotates once a file has been open for a fixed interval.
///
/// The interval is only checked when a record is written, so an idle writer keeps its file open.
#[derive(Debug, Clone)]
pub struct TimedRotationPolicy {
    interval: Duration,
    opened: Instant,
}

impl TimedRotationPolicy {
    pub fn new(interval: Duration) -> Self {
        TimedRotationPolicy {
            interval,
            opened: Instant::now(),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl RotationPolicy for TimedRotationPolicy {
    fn mark(&mut self, _offset: u64) -> bool {
        self.opened.elapsed() >= self.interval
    }

    fn reset(&mut self) {
        self.opened = Instant::now();
    }
}

/// Never rotates: everything goes to one file until the writer is closed.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRotationPolicy;

impl RotationPolicy for NoRotationPolicy {
    fn mark(&mut self, _offset: u64) -> bool {
        false
    }

    fn reset(&mut self) {}
}

impl fmt::Display for FileSizeRotationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let units = [Units::TB, Units::GB, Units::MB, Units::KB];
        match units
            .iter()
            .find(|u| self.max_bytes >= u.bytes() && self.max_bytes % u.bytes() == 0)
        {
            Some(u) => write!(f, "{}{:?}", self.max_bytes / u.bytes(), u),
            None => write!(f, "{} bytes", self.max_bytes),
        }
    }
}
