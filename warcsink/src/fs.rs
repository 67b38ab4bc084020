//! Access to the filesystem output files are written to.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// A filesystem that output files can be created in.
///
/// Implementations are shared between threads; each file they return is only used by one thread
/// at a time.
pub trait FileSystem: Send + Sync {
    /// Create a new, empty file at `path`, creating missing parent directories.
    ///
    /// Must fail with [`io::ErrorKind::AlreadyExists`] if the file already exists, never
    /// truncating or appending to an existing file.
    fn create(&self, path: &Path) -> io::Result<Box<dyn OutputFile>>;
}

/// A file abstraction for sequential writing. The implementation
/// should provide buffering since callers may append small fragments
/// at a time to the file.
pub trait OutputFile: Send {
    fn append(&mut self, data: &[u8]) -> io::Result<()>;
    /// Pass buffered data on to the operating system.
    fn flush(&mut self) -> io::Result<()>;
    /// Flush, then wait for the data to reach stable storage.
    fn sync(&mut self) -> io::Result<()>;
    /// Flush and release the file. Closing a closed file does nothing.
    fn close(&mut self) -> io::Result<()>;
}

/// The local filesystem, through `std::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFileSystem;

impl FileSystem for LocalFileSystem {
    fn create(&self, path: &Path) -> io::Result<Box<dyn OutputFile>> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)?;
        Ok(Box::new(LocalFile {
            writer: Some(BufWriter::new(file)),
        }))
    }
}

struct LocalFile {
    writer: Option<BufWriter<File>>,
}

impl LocalFile {
    fn writer(&mut self) -> io::Result<&mut BufWriter<File>> {
        self.writer
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "file is closed"))
    }
}

impl OutputFile for LocalFile {
    fn append(&mut self, data: &[u8]) -> io::Result<()> {
        self.writer()?.write_all(data)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer()?.flush()
    }

    fn sync(&mut self) -> io::Result<()> {
        let writer = self.writer()?;
        writer.flush()?;
        writer.get_ref().sync_data()
    }

    fn close(&mut self) -> io::Result<()> {
        match self.writer.take() {
            Some(mut writer) => writer.flush(),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{FileSystem, LocalFileSystem};
    use std::io::ErrorKind;

    #[test]
    fn creates_new_files_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/dir/out.warc");

        let mut file = LocalFileSystem.create(&path).unwrap();
        file.append(b"abc").unwrap();
        file.sync().unwrap();
        file.append(b"def").unwrap();
        file.close().unwrap();
        file.close().unwrap();
        assert!(file.append(b"ghi").is_err());
        assert_eq!(std::fs::read(&path).unwrap(), b"abcdef");

        match LocalFileSystem.create(&path) {
            Err(e) => assert_eq!(e.kind(), ErrorKind::AlreadyExists),
            Ok(_) => panic!("existing file was opened"),
        }
        assert_eq!(std::fs::read(&path).unwrap(), b"abcdef");
    }
}
