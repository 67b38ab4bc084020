use std::collections::BTreeMap;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use pretty_assertions::assert_eq;

use warcfmt::{Capture, Compression, EncodingError, Metadata};

use crate::fs::{FileSystem, OutputFile};
use crate::{
    describe, CountSyncPolicy, FileSizeRotationPolicy, NoRotationPolicy, SinkError, WarcWriter,
    WarcWriterBuilder,
};

/// A FileSystem keeping files in memory, with switches to make operations fail.
#[derive(Clone, Default)]
struct MemoryFileSystem {
    files: Arc<Mutex<BTreeMap<PathBuf, Vec<u8>>>>,
    syncs: Arc<AtomicUsize>,
    flushes: Arc<AtomicUsize>,
    /// While set, closing a file fails.
    failing_close: Arc<AtomicBool>,
    /// While set, creates fail and appends write half their data and then fail.
    failing: Arc<AtomicBool>,
    /// Number of upcoming creates to reject as if the file already existed.
    collisions: Arc<AtomicU32>,
}

impl MemoryFileSystem {
    fn paths(&self) -> Vec<PathBuf> {
        self.files.lock().keys().cloned().collect()
    }

    fn contents(&self, path: &Path) -> Vec<u8> {
        self.files.lock()[path].clone()
    }

    fn syncs(&self) -> usize {
        self.syncs.load(Ordering::SeqCst)
    }

    fn flushes(&self) -> usize {
        self.flushes.load(Ordering::SeqCst)
    }
}

impl FileSystem for MemoryFileSystem {
    fn create(&self, path: &Path) -> io::Result<Box<dyn OutputFile>> {
        if self.collisions.load(Ordering::SeqCst) > 0 {
            self.collisions.fetch_sub(1, Ordering::SeqCst);
            return Err(io::Error::new(io::ErrorKind::AlreadyExists, "file exists"));
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(io::Error::new(io::ErrorKind::Other, "read-only filesystem"));
        }

        let mut files = self.files.lock();
        if files.contains_key(path) {
            return Err(io::Error::new(io::ErrorKind::AlreadyExists, "file exists"));
        }
        files.insert(path.to_owned(), Vec::new());
        Ok(Box::new(MemoryFile {
            path: path.to_owned(),
            fs: self.clone(),
        }))
    }
}

struct MemoryFile {
    path: PathBuf,
    fs: MemoryFileSystem,
}

impl OutputFile for MemoryFile {
    fn append(&mut self, data: &[u8]) -> io::Result<()> {
        let mut files = self.fs.files.lock();
        let contents = files.get_mut(&self.path).expect("file vanished");
        if self.fs.failing.load(Ordering::SeqCst) {
            contents.extend_from_slice(&data[..data.len() / 2]);
            return Err(io::Error::new(io::ErrorKind::Other, "disk full"));
        }
        contents.extend_from_slice(data);
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.fs.flushes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn sync(&mut self) -> io::Result<()> {
        self.fs.syncs.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn close(&mut self) -> io::Result<()> {
        if self.fs.failing_close.load(Ordering::SeqCst) {
            return Err(io::Error::new(io::ErrorKind::Other, "close failed"));
        }
        Ok(())
    }
}

/// Decompress consecutive gzip members, stopping at the first one that is damaged.
fn read_members(mut data: &[u8]) -> (Vec<Vec<u8>>, Option<io::Error>) {
    let mut members = Vec::new();
    while !data.is_empty() {
        let mut decoder = flate2::bufread::GzDecoder::new(data);
        let mut member = Vec::new();
        if let Err(e) = decoder.read_to_end(&mut member) {
            return (members, Some(e));
        }
        members.push(member);
        data = decoder.into_inner();
    }
    (members, None)
}

fn members(data: &[u8]) -> Vec<Vec<u8>> {
    match read_members(data) {
        (members, None) => members,
        (_, Some(e)) => panic!("invalid gzip member: {}", e),
    }
}

/// The value of a header field in a serialized record.
fn field(record: &[u8], name: &str) -> Option<String> {
    let end = record.windows(4).position(|w| w == b"\r\n\r\n")?;
    let header = std::str::from_utf8(&record[..end]).ok()?;
    let prefix = format!("{}: ", name);
    header
        .split("\r\n")
        .find(|line| line.starts_with(&prefix))
        .map(|line| line[prefix.len()..].to_owned())
}

fn file_name(path: &Path) -> &str {
    path.file_name().and_then(|n| n.to_str()).unwrap()
}

fn builder(fs: &MemoryFileSystem) -> WarcWriterBuilder {
    WarcWriterBuilder::new()
        .with_path("/warcs")
        .with_prefix("test")
        .with_file_system(fs.clone())
}

fn capture(url: &str, content: &str) -> Capture {
    Capture::new(url)
        .with_content(content.as_bytes())
        .with_metadata(Metadata::new().with_content_type("text/plain"))
}

#[test]
fn writers_are_shareable() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<WarcWriter>();
}

#[test]
fn writes_header_then_records() {
    let fs = MemoryFileSystem::default();
    let header = warcfmt::warcinfo(vec![("software", "warcsink-test")]).unwrap();
    let writer = builder(&fs).with_header(header.clone()).build();
    assert_eq!(writer.current_path(), None);
    writer.open().unwrap();
    let opened = writer.current_path().expect("open() did not open a file");
    assert_eq!(writer.offset(), 0);

    writer
        .write_capture(&capture("http://example.org/one", "hello"))
        .unwrap();
    writer
        .write_capture(&capture("http://example.org/two", "world!"))
        .unwrap();
    let path = writer.current_path().expect("no file open after writing");
    assert_eq!(path, opened);
    let offset = writer.offset();
    writer.close().unwrap();
    assert_eq!(writer.current_path(), None);

    assert_eq!(fs.paths(), vec![path.clone()]);
    assert_eq!(path.parent(), Some(Path::new("/warcs")));
    let name = file_name(&path);
    assert!(name.starts_with("test-"), "{}", name);
    assert!(name.ends_with("-00000.warc.gz"), "{}", name);
    assert_eq!(name.len(), "test-".len() + 14 + "-00000.warc.gz".len());

    let records = members(&fs.contents(&path));
    assert_eq!(records.len(), 3);
    assert_eq!(records[0], header);
    assert_eq!(field(&records[1], "WARC-Type").as_deref(), Some("resource"));
    assert_eq!(
        field(&records[1], "WARC-Target-URI").as_deref(),
        Some("http://example.org/one")
    );
    assert_eq!(
        field(&records[2], "WARC-Target-URI").as_deref(),
        Some("http://example.org/two")
    );
    // The header record is not part of the logical offset.
    assert_eq!(offset, (records[1].len() + records[2].len()) as u64);
}

#[test]
fn closed_writer_refuses_writes() {
    let fs = MemoryFileSystem::default();
    let writer = builder(&fs).build();
    writer.close().unwrap();
    assert!(writer.is_closed());

    assert!(matches!(writer.write(b"record"), Err(SinkError::Closed)));
    assert!(matches!(writer.rotate(), Err(SinkError::Closed)));
    assert!(matches!(writer.sync(), Err(SinkError::Closed)));
    writer.close().expect("second close failed");
    assert!(fs.paths().is_empty());
}

#[test]
fn rotates_when_size_reached() {
    let fs = MemoryFileSystem::default();
    let writer = builder(&fs)
        .with_rotation_policy(FileSizeRotationPolicy::from_bytes(250))
        .build();
    let record = [b'x'; 100];

    writer.write(&record).unwrap();
    writer.write(&record).unwrap();
    let first = writer.current_path().unwrap();
    assert_eq!(writer.offset(), 200);

    assert_eq!(fs.flushes(), 0);
    writer.write(&record).unwrap();
    assert_eq!(fs.flushes(), 1);
    let second = writer.current_path().expect("no file open after rotation");
    assert_ne!(first, second);
    assert!(file_name(&second).ends_with("-00001.warc.gz"));
    assert_eq!(writer.offset(), 0);

    writer.write(&record).unwrap();
    assert_eq!(writer.current_path(), Some(second.clone()));
    assert_eq!(writer.offset(), 100);
    writer.close().unwrap();
    assert_eq!(fs.flushes(), 2);

    assert_eq!(fs.paths().len(), 2);
    assert_eq!(members(&fs.contents(&first)).len(), 3);
    assert_eq!(members(&fs.contents(&second)), vec![record.to_vec()]);
}

#[test]
fn syncs_every_n_records() {
    let fs = MemoryFileSystem::default();
    let writer = builder(&fs)
        .with_sync_policy(CountSyncPolicy::new(2))
        .with_rotation_policy(FileSizeRotationPolicy::from_bytes(500))
        .build();
    let record = [b'x'; 100];

    for _ in 0..4 {
        writer.write(&record).unwrap();
    }
    assert_eq!(fs.syncs(), 2);

    // The fifth record rotates instead of counting towards a sync.
    writer.write(&record).unwrap();
    writer.write(&record).unwrap();
    assert_eq!(fs.syncs(), 2);
    writer.write(&record).unwrap();
    assert_eq!(fs.syncs(), 3);

    writer.sync().unwrap();
    assert_eq!(fs.syncs(), 4);
}

#[test]
fn failed_write_retires_file() {
    let fs = MemoryFileSystem::default();
    let writer = builder(&fs).with_rotation_policy(NoRotationPolicy).build();

    writer.write(b"first record").unwrap();
    let first = writer.current_path().unwrap();

    fs.failing.store(true, Ordering::SeqCst);
    match writer.write(b"second record") {
        Err(SinkError::Io { path, .. }) => assert_eq!(path, first),
        other => panic!("unexpected result {:?}", other),
    }
    assert_eq!(writer.current_path(), None);
    // Creating the replacement fails too while the filesystem is failing.
    assert!(matches!(
        writer.write(b"third record"),
        Err(SinkError::Io { .. })
    ));

    fs.failing.store(false, Ordering::SeqCst);
    writer.write(b"fourth record").unwrap();
    let second = writer.current_path().unwrap();
    assert_ne!(first, second);
    writer.close().unwrap();

    let (records, error) = read_members(&fs.contents(&first));
    assert_eq!(records, vec![b"first record".to_vec()]);
    assert!(error.is_some(), "partial record was not left at the end");
    assert_eq!(members(&fs.contents(&second)), vec![b"fourth record".to_vec()]);
}

#[test]
fn skips_existing_names() {
    let fs = MemoryFileSystem::default();
    let writer = builder(&fs).build();

    fs.collisions.store(2, Ordering::SeqCst);
    writer.write(b"record").unwrap();
    let path = writer.current_path().unwrap();
    assert!(file_name(&path).ends_with("-00002.warc.gz"), "{:?}", path);

    fs.collisions.store(1000, Ordering::SeqCst);
    match writer.rotate() {
        Err(SinkError::NameExhausted { path }) => {
            assert!(file_name(&path).ends_with("-00102.warc.gz"), "{:?}", path)
        }
        other => panic!("unexpected result {:?}", other),
    }
    assert_eq!(writer.current_path(), None);
    assert_eq!(members(&fs.contents(&path)), vec![b"record".to_vec()]);
}

#[test]
fn runs_actions_on_completed_files() {
    let fs = MemoryFileSystem::default();
    let completed = Arc::new(Mutex::new(Vec::new()));
    let seen = completed.clone();
    let writer = builder(&fs)
        .with_rotation_policy(FileSizeRotationPolicy::from_bytes(1))
        .add_rotation_action(move |path: &Path| -> io::Result<()> {
            seen.lock().push(path.to_owned());
            Ok(())
        })
        .add_rotation_action(|_: &Path| -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::Other, "always fails"))
        })
        .build();

    // Each record fills a file, so every write completes one and opens the next.
    writer.write(b"one").unwrap();
    writer.write(b"two").unwrap();
    assert_eq!(completed.lock().len(), 2);
    writer.rotate().unwrap();
    assert_eq!(completed.lock().len(), 3);

    writer.write(b"three").unwrap();
    writer.close().unwrap();

    let completed = completed.lock();
    assert_eq!(completed.len(), 5);
    assert_eq!(*completed, fs.paths());
}

#[test]
fn rejected_captures_write_nothing() {
    let fs = MemoryFileSystem::default();
    let writer = builder(&fs).build();

    match writer.write_capture(&capture("http://example.org/a|b", "x")) {
        Err(SinkError::Encoding { url, source }) => {
            assert_eq!(url, "http://example.org/a|b");
            assert_eq!(source, EncodingError::InvalidUri(url.clone()));
        }
        other => panic!("unexpected result {:?}", other),
    }
    assert_eq!(writer.current_path(), None);
    assert!(fs.paths().is_empty());
}

#[test]
fn uncompressed_output_with_workers() {
    let fs = MemoryFileSystem::default();
    let writer = builder(&fs)
        .with_compression(Compression::None)
        .with_worker(3, 4)
        .with_record_format(|capture: &Capture| {
            Ok::<_, EncodingError>(capture.url().as_bytes().to_vec())
        })
        .build();

    writer
        .write_capture(&Capture::new("http://example.org/"))
        .unwrap();
    writer.write(b"|raw").unwrap();
    let path = writer.current_path().unwrap();
    writer.close().unwrap();

    assert!(file_name(&path).ends_with("-03-00000.warc"), "{:?}", path);
    assert_eq!(fs.contents(&path), b"http://example.org/|raw");
}

#[test]
fn failed_close_on_rotation_keeps_the_record() {
    let fs = MemoryFileSystem::default();
    let completed = Arc::new(Mutex::new(Vec::new()));
    let seen = completed.clone();
    let writer = builder(&fs)
        .with_rotation_policy(FileSizeRotationPolicy::from_bytes(1))
        .add_rotation_action(move |path: &Path| -> io::Result<()> {
            seen.lock().push(path.to_owned());
            Ok(())
        })
        .build();

    fs.failing_close.store(true, Ordering::SeqCst);
    writer.write(b"only once").unwrap();
    let first = fs.paths()[0].clone();
    let second = writer.current_path().expect("no file open after rotation");
    assert_ne!(first, second);
    assert!(completed.lock().is_empty());
    assert_eq!(members(&fs.contents(&first)), vec![b"only once".to_vec()]);

    fs.failing_close.store(false, Ordering::SeqCst);
    writer.close().unwrap();
    assert_eq!(*completed.lock(), vec![second]);
}

#[test]
fn errors_describe_their_sources() {
    let error = SinkError::Io {
        path: PathBuf::from("/warcs/test.warc.gz"),
        source: io::Error::new(io::ErrorKind::Other, "disk full"),
    };
    assert_eq!(describe(&error), "I/O error on /warcs/test.warc.gz: disk full");
}
