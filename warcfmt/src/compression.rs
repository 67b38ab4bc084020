//! Handling of record compression.
//!
//! WARC files can be compressed, but the structure of the compressed data must be managed
//! to ensure a record can be accessed without decompressing every previous one in a file
//! (which may contain many records).
//!
//! Records are therefore compressed individually: a `.warc.gz` file is a concatenation of gzip
//! members, one per record. Provided the file offset of a compressed record is known, a reading
//! tool can read that record alone, and damage to one member (such as a truncated write at the
//! end of a file) leaves every preceding record readable.

use std::io::{Result as IoResult, Write};

use flate2::write::GzEncoder;

/// The supported methods of compressing a single record.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Compression {
    /// Uncompressed data
    None,
    /// `gzip` compression
    ///
    /// gzip uses DEFLATE compression which is relatively simple but doesn't have particularly good
    /// compression. Each record has a gzip header and footer that include some uninteresting
    /// fields but also include a checksum.
    Gzip,
}

impl Default for Compression {
    fn default() -> Self {
        Compression::Gzip
    }
}

impl Compression {
    /// The file name extension for a WARC file using this compression.
    ///
    /// ```
    /// # use warcfmt::Compression;
    /// assert_eq!(Compression::Gzip.extension(), ".warc.gz");
    /// assert_eq!(Compression::None.extension(), ".warc");
    /// ```
    pub fn extension(self) -> &'static str {
        match self {
            Compression::None => ".warc",
            Compression::Gzip => ".warc.gz",
        }
    }

    /// Frame one complete encoded record for appending to a file.
    ///
    /// The result is fully buffered so the caller can append it in one operation: for `Gzip`
    /// it is a single, complete gzip member.
    pub fn frame(self, record: &[u8]) -> IoResult<Vec<u8>> {
        match self {
            Compression::None => Ok(record.to_vec()),
            Compression::Gzip => {
                let mut encoder = GzEncoder::new(
                    Vec::with_capacity(record.len() / 2 + 64),
                    flate2::Compression::default(),
                );
                encoder.write_all(record)?;
                let member = encoder.finish()?;
                trace!(
                    "compressed {} byte record into {} byte gzip member",
                    record.len(),
                    member.len()
                );
                Ok(member)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Compression;
    use std::io::Read;

    #[test]
    fn gzip_frames_are_single_members() {
        let record = b"WARC/1.0\r\n\r\n\r\n\r\n";
        assert_eq!(Compression::None.frame(record).unwrap(), record.to_vec());

        let mut joined = Compression::Gzip.frame(record).unwrap();
        joined.extend(Compression::Gzip.frame(b"second").unwrap());

        let mut decoder = flate2::bufread::GzDecoder::new(&joined[..]);
        let mut first = Vec::new();
        decoder.read_to_end(&mut first).unwrap();
        assert_eq!(first, record.to_vec());

        let mut second = Vec::new();
        flate2::bufread::GzDecoder::new(decoder.into_inner())
            .read_to_end(&mut second)
            .unwrap();
        assert_eq!(second, b"second".to_vec());
    }
}
