//! Naming of output files.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use warcfmt::Compression;

/// Prefix of output file names unless one is configured.
pub const DEFAULT_PREFIX: &str = "crawl";

const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// Generates names of the form `<prefix>-<yyyyMMddHHmmss>-[<worker>-]<serial>.warc.gz`.
///
/// The timestamp is in UTC and the serial is zero-padded to five digits. When the writer is one of
/// several running in parallel (see [`prepare`](Self::prepare)), the two-digit index of the worker
/// is included so that parallel writers never produce the same name.
///
/// ```
/// # use chrono::{TimeZone, Utc};
/// # use warcsink::FileNameFormat;
/// let mut names = FileNameFormat::new().with_prefix("news").with_path("/data/warc");
/// names.prepare(3, 8);
///
/// let ts = Utc.with_ymd_and_hms(2021, 8, 24, 23, 19, 14).unwrap();
/// assert_eq!(names.get_name(12, ts), "news-20210824231914-03-00012.warc.gz");
/// assert_eq!(
///     names.path_for(12, ts).to_str(),
///     Some("/data/warc/news-20210824231914-03-00012.warc.gz")
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileNameFormat {
    prefix: String,
    path: PathBuf,
    extension: &'static str,
    worker: Option<u32>,
}

impl Default for FileNameFormat {
    fn default() -> Self {
        FileNameFormat {
            prefix: DEFAULT_PREFIX.to_owned(),
            path: PathBuf::from("/"),
            extension: Compression::Gzip.extension(),
            worker: None,
        }
    }
}

impl FileNameFormat {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn with_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Set the directory files are created in.
    pub fn with_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.path = path.into();
        self
    }

    /// Use the file extension matching `compression`.
    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.extension = compression.extension();
        self
    }

    /// Record the identity of this writer among `total` parallel writers.
    ///
    /// The worker index only appears in names if there is more than one writer.
    pub fn prepare(&mut self, index: u32, total: u32) {
        self.worker = if total > 1 { Some(index) } else { None };
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get_name(&self, serial: u64, timestamp: DateTime<Utc>) -> String {
        let mut name = format!("{}-{}-", self.prefix, timestamp.format(TIMESTAMP_FORMAT));
        if let Some(worker) = self.worker {
            name.push_str(&format!("{:02}-", worker));
        }
        name.push_str(&format!("{:05}{}", serial, self.extension));
        name
    }

    /// The full path of the file with the given serial and timestamp.
    pub fn path_for(&self, serial: u64, timestamp: DateTime<Utc>) -> PathBuf {
        self.path.join(self.get_name(serial, timestamp))
    }
}
