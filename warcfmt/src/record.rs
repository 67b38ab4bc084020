//! Writing complete WARC records.
use std::io::{Result as IoResult, Write};

/// The trailer that follows every record block.
pub const RECORD_TRAILER: &[u8] = b"\r\n\r\n";

/// A write adapter for the block of a single record.
///
/// Obtained from [`Header::write_to`](crate::Header::write_to). Accepts at most as many bytes
/// as the record's `Content-Length`; [`finish`](Self::finish) verifies that exactly that many
/// were written and appends the record trailer.
pub struct RecordWriter<W> {
    limit: u64,
    written: u64,
    writer: W,
    finished: bool,
}

impl<W> RecordWriter<W> {
    pub(crate) fn new(writer: W, content_length: u64) -> Self {
        RecordWriter {
            limit: content_length,
            written: 0,
            writer,
            finished: false,
        }
    }
}

impl<W: Write> RecordWriter<W> {
    /// Terminate the record by writing the trailer.
    ///
    /// Fails with `UnexpectedEof` if fewer than `Content-Length` bytes were written, in which case
    /// no trailer is emitted.
    pub fn finish(mut self) -> IoResult<()> {
        if self.written < self.limit {
            return Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                format!(
                    "record block is {} bytes but Content-Length is {}",
                    self.written, self.limit
                ),
            ));
        }
        self.writer.write_all(RECORD_TRAILER)?;
        self.finished = true;
        Ok(())
    }
}

impl<W: Write> Write for RecordWriter<W> {
    fn write(&mut self, buf: &[u8]) -> IoResult<usize> {
        debug_assert!(self.written <= self.limit);
        let take = std::cmp::min(buf.len() as u64, self.limit - self.written);

        let written = self.writer.write(&buf[..take as usize])?;
        self.written += written as u64;
        Ok(written)
    }

    fn flush(&mut self) -> IoResult<()> {
        self.writer.flush()
    }
}

impl<W> Drop for RecordWriter<W> {
    fn drop(&mut self) {
        if !self.finished {
            error!(
                "record dropped unfinished after {} of {} block bytes",
                self.written, self.limit
            );
        }
    }
}
