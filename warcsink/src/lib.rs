//! Writing captures to rotating, per-record compressed WARC files.
//!
//! A [`WarcWriter`] encodes [`Capture`](warcfmt::Capture)s with a
//! [`RecordFormat`](warcfmt::RecordFormat) and appends each record to the current output file as
//! an independent gzip member, so a file can be read from any record boundary and a damaged tail
//! never affects earlier records. Files are named by a [`FileNameFormat`], replaced according to a
//! [`RotationPolicy`] and periodically flushed to stable storage according to a [`SyncPolicy`].
//! Completed files can be handed to [`RotationAction`]s, for instance to move them somewhere
//! they will be picked up for long-term storage.
//!
//! ```no_run
//! use warcfmt::{Capture, Metadata};
//! use warcsink::{FileSizeRotationPolicy, Units, WarcWriterBuilder};
//!
//! let writer = WarcWriterBuilder::new()
//!     .with_prefix("crawl")
//!     .with_path("/var/spool/warc")
//!     .with_rotation_policy(FileSizeRotationPolicy::new(512, Units::MB))
//!     .build();
//!
//! let capture = Capture::new("http://example.org/")
//!     .with_content(&b"hello"[..])
//!     .with_metadata(Metadata::new().with_content_type("text/plain"));
//! writer.write_capture(&capture)?;
//! writer.close()?;
//! # Ok::<(), warcsink::SinkError>(())
//! ```

#[macro_use]
extern crate log;

use std::error::Error as StdError;
use std::path::PathBuf;

use thiserror::Error;

pub mod action;
pub mod fs;
pub mod naming;
pub mod rotation;
pub mod sync;
#[cfg(test)]
mod test;
mod writer;

pub use action::{MoveFileAction, RotationAction};
pub use fs::{FileSystem, LocalFileSystem, OutputFile};
pub use naming::FileNameFormat;
pub use rotation::{
    FileSizeRotationPolicy, NoRotationPolicy, RotationPolicy, TimedRotationPolicy, Units,
};
pub use sync::{CountSyncPolicy, SyncPolicy};
pub use writer::{WarcWriter, WarcWriterBuilder};

/// Reasons a record could not be written.
///
/// A record for which an error is returned was not persisted, except where noted.
#[derive(Debug, Error)]
pub enum SinkError {
    /// The capture could not be encoded; nothing was written.
    #[error("unable to encode capture of {url}")]
    Encoding {
        url: String,
        #[source]
        source: warcfmt::EncodingError,
    },
    /// Creating, writing or syncing an output file failed.
    ///
    /// The file is retired and the next write goes to a new file.
    #[error("I/O error on {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The writer was closed with [`WarcWriter::close`].
    #[error("writer is closed")]
    Closed,
    /// Every candidate file name for a new file already existed.
    #[error("unable to find an unused file name (last tried {})", .path.display())]
    NameExhausted { path: PathBuf },
}

/// An error message followed by the messages of its sources, separated by colons.
pub fn describe(e: &dyn StdError) -> String {
    let mut message = e.to_string();
    let mut source = e.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
