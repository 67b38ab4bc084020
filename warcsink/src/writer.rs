use std::io;
use std::path::{Path, PathBuf};

use chrono::Utc;
use parking_lot::Mutex;
use warcfmt::{Capture, Compression, RecordFormat, WarcRecordFormat};

use crate::action::RotationAction;
use crate::fs::{FileSystem, LocalFileSystem, OutputFile};
use crate::naming::FileNameFormat;
use crate::rotation::{FileSizeRotationPolicy, RotationPolicy};
use crate::sync::{CountSyncPolicy, SyncPolicy};
use crate::{describe, SinkError};

/// How many serials to try when a file name is already taken.
const MAX_NAME_ATTEMPTS: u32 = 100;

/// Writes records to a sequence of WARC files, one file at a time.
///
/// Each record is compressed on its own and appended to the current file in a single operation;
/// the logical offset of a file counts uncompressed record bytes, excluding the header record that
/// starts every file if one is configured. After each record the rotation policy decides whether
/// to complete the file and open a newly named one, and otherwise the sync policy decides whether
/// to flush to stable storage.
///
/// A writer may be shared between threads (for instance in an `Arc`): records are written and
/// files rotated under a lock, so records from different threads are never interleaved.
///
/// If an I/O error occurs, the file it occurred on is retired and the error returned; the next
/// write opens a new file. Failing to complete a file on rotation is only logged, since the
/// record that triggered it has been written. Dropping a writer closes it, logging any error.
pub struct WarcWriter<F = WarcRecordFormat> {
    format: F,
    names: FileNameFormat,
    compression: Compression,
    header: Option<Vec<u8>>,
    fs: Box<dyn FileSystem>,
    actions: Vec<Box<dyn RotationAction>>,
    state: Mutex<State>,
}

struct State {
    rotation: Box<dyn RotationPolicy>,
    sync: Box<dyn SyncPolicy>,
    current: Option<OpenFile>,
    /// Serial of the next file to be opened.
    serial: u64,
    closed: bool,
}

struct OpenFile {
    path: PathBuf,
    file: Box<dyn OutputFile>,
    offset: u64,
}

impl<F: RecordFormat> WarcWriter<F> {
    /// Encode a capture and write the resulting record.
    ///
    /// If the capture cannot be encoded nothing is written.
    pub fn write_capture(&self, capture: &Capture) -> Result<(), SinkError> {
        let record = self
            .format
            .format(capture)
            .map_err(|source| SinkError::Encoding {
                url: capture.url().to_owned(),
                source,
            })?;
        self.write(&record)
    }
}

impl<F> WarcWriter<F> {
    /// Write one complete, encoded record.
    ///
    /// The record is persisted if and only if this returns `Ok`.
    pub fn write(&self, record: &[u8]) -> Result<(), SinkError> {
        let framed = self
            .compression
            .frame(record)
            .map_err(|source| SinkError::Io {
                path: self.names.path().to_owned(),
                source,
            })?;

        let mut guard = self.state.lock();
        let state = &mut *guard;
        if state.closed {
            return Err(SinkError::Closed);
        }

        let file = match state.current {
            Some(ref mut file) => file,
            None => {
                let file = self.create_file(&mut state.serial)?;
                state.rotation.reset();
                state.sync.reset();
                state.current.get_or_insert(file)
            }
        };

        if let Err(source) = file.file.append(&framed) {
            let path = file.path.clone();
            self.retire(state);
            return Err(SinkError::Io { path, source });
        }
        file.offset += record.len() as u64;
        let offset = file.offset;
        trace!(
            "appended {} byte record ({} bytes framed) to {}, offset now {}",
            record.len(),
            framed.len(),
            file.path.display(),
            offset
        );

        if state.rotation.mark(offset) {
            info!("rotating {} at offset {}", file.path.display(), offset);
            // The record is persisted either way; without a file the next write opens one.
            if let Err(e) = self.finish(state) {
                error!("failed to complete file on rotation: {}", describe(&e));
            }
            if let Err(e) = self.open_next(state) {
                warn!("no file open after rotation: {}", describe(&e));
            }
            Ok(())
        } else if state.sync.mark(offset) {
            if let Err(source) = file.file.sync() {
                let path = file.path.clone();
                self.retire(state);
                return Err(SinkError::Io { path, source });
            }
            debug!("synced {} at offset {}", file.path.display(), offset);
            state.sync.reset();
            Ok(())
        } else {
            Ok(())
        }
    }

    /// Open a file to write to, if one is not already open.
    ///
    /// Writing opens a file when needed, so calling this is only required to create the first
    /// file (with its header record) before any record is available.
    pub fn open(&self) -> Result<(), SinkError> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        if state.closed {
            return Err(SinkError::Closed);
        }
        if state.current.is_none() {
            self.open_next(state)?;
        }
        Ok(())
    }

    /// Complete the current file now and open the next one.
    pub fn rotate(&self) -> Result<(), SinkError> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        if state.closed {
            return Err(SinkError::Closed);
        }
        if let Some(ref open) = state.current {
            info!("rotating {} on request", open.path.display());
        }
        self.finish(state)?;
        self.open_next(state)
    }

    /// Flush the current file to stable storage.
    pub fn sync(&self) -> Result<(), SinkError> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        if state.closed {
            return Err(SinkError::Closed);
        }
        if let Some(ref mut open) = state.current {
            if let Err(source) = open.file.sync() {
                let path = open.path.clone();
                self.retire(state);
                return Err(SinkError::Io { path, source });
            }
            debug!("synced {} on request", open.path.display());
        }
        state.sync.reset();
        Ok(())
    }

    /// Complete the current file and refuse further writes.
    ///
    /// Closing a closed writer does nothing.
    pub fn close(&self) -> Result<(), SinkError> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        if state.closed {
            return Ok(());
        }
        state.closed = true;
        self.finish(state)
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// The path of the file records are currently written to, if one is open.
    pub fn current_path(&self) -> Option<PathBuf> {
        self.state.lock().current.as_ref().map(|open| open.path.clone())
    }

    /// Uncompressed bytes of records written to the current file.
    pub fn offset(&self) -> u64 {
        self.state.lock().current.as_ref().map_or(0, |open| open.offset)
    }

    pub fn format(&self) -> &F {
        &self.format
    }

    pub fn file_name_format(&self) -> &FileNameFormat {
        &self.names
    }

    fn open_next(&self, state: &mut State) -> Result<(), SinkError> {
        let file = self.create_file(&mut state.serial)?;
        state.rotation.reset();
        state.sync.reset();
        state.current = Some(file);
        Ok(())
    }

    /// Create the next file and write the header record to it.
    fn create_file(&self, serial: &mut u64) -> Result<OpenFile, SinkError> {
        let timestamp = Utc::now();
        let mut attempts = 0;
        let (path, mut file) = loop {
            let path = self.names.path_for(*serial, timestamp);
            *serial += 1;
            match self.fs.create(&path) {
                Ok(file) => break (path, file),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    attempts += 1;
                    if attempts >= MAX_NAME_ATTEMPTS {
                        return Err(SinkError::NameExhausted { path });
                    }
                    warn!("{} already exists, trying the next serial", path.display());
                }
                Err(source) => return Err(SinkError::Io { path, source }),
            }
        };
        debug!("opened {}", path.display());

        if let Some(ref header) = self.header {
            let written = self
                .compression
                .frame(header)
                .and_then(|framed| file.append(&framed));
            if let Err(source) = written {
                warn!("abandoning {} after failing to write its header", path.display());
                if let Err(e) = file.close() {
                    warn!("failed to close {}: {}", path.display(), e);
                }
                return Err(SinkError::Io { path, source });
            }
        }

        Ok(OpenFile {
            path,
            file,
            offset: 0,
        })
    }

    /// Close the current file, if any, and hand it to the rotation actions.
    fn finish(&self, state: &mut State) -> Result<(), SinkError> {
        let result = match state.current.take() {
            Some(mut open) => match open.file.flush().and_then(|()| open.file.close()) {
                Ok(()) => {
                    debug!("closed {} at offset {}", open.path.display(), open.offset);
                    self.run_actions(&open.path);
                    Ok(())
                }
                Err(source) => Err(SinkError::Io {
                    path: open.path,
                    source,
                }),
            },
            None => Ok(()),
        };
        state.rotation.reset();
        state.sync.reset();
        result
    }

    /// Stop writing to the current file after a failure.
    ///
    /// A failed append can only leave a partial record at the end of the file, so the file
    /// is still usable up to that point and is completed as usual if it can be closed.
    fn retire(&self, state: &mut State) {
        if let Some(ref open) = state.current {
            warn!("retiring {} after a write failure", open.path.display());
        }
        if let Err(e) = self.finish(state) {
            warn!("{}", describe(&e));
        }
    }

    fn run_actions(&self, path: &Path) {
        for action in &self.actions {
            if let Err(e) = action.execute(path) {
                error!("rotation action failed for {}: {}", path.display(), e);
            }
        }
    }
}

impl<F> Drop for WarcWriter<F> {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            error!("failed to close WARC writer: {}", describe(&e));
        }
    }
}

/// Configuration for a [`WarcWriter`].
///
/// By default records are encoded with [`WarcRecordFormat`], gzip compressed and written to the
/// local filesystem in files named by the default [`FileNameFormat`], rotating every 1 GiB
/// and syncing every 1000 records.
pub struct WarcWriterBuilder<F = WarcRecordFormat> {
    format: F,
    names: FileNameFormat,
    worker: (u32, u32),
    compression: Compression,
    header: Option<Vec<u8>>,
    fs: Box<dyn FileSystem>,
    rotation: Box<dyn RotationPolicy>,
    sync: Box<dyn SyncPolicy>,
    actions: Vec<Box<dyn RotationAction>>,
}

impl WarcWriterBuilder {
    pub fn new() -> Self {
        WarcWriterBuilder {
            format: WarcRecordFormat::new(),
            names: FileNameFormat::new(),
            worker: (0, 1),
            compression: Compression::default(),
            header: None,
            fs: Box::new(LocalFileSystem),
            rotation: Box::new(FileSizeRotationPolicy::default()),
            sync: Box::new(CountSyncPolicy::default()),
            actions: Vec::new(),
        }
    }
}

impl Default for WarcWriterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: RecordFormat> WarcWriterBuilder<F> {
    /// Encode captures passed to [`WarcWriter::write_capture`] with a different format.
    pub fn with_record_format<G: RecordFormat>(self, format: G) -> WarcWriterBuilder<G> {
        WarcWriterBuilder {
            format,
            names: self.names,
            worker: self.worker,
            compression: self.compression,
            header: self.header,
            fs: self.fs,
            rotation: self.rotation,
            sync: self.sync,
            actions: self.actions,
        }
    }

    pub fn with_file_name_format(mut self, names: FileNameFormat) -> Self {
        self.names = names;
        self
    }

    pub fn with_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.names = self.names.with_prefix(prefix);
        self
    }

    /// Set the directory output files are written to.
    pub fn with_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.names = self.names.with_path(path);
        self
    }

    /// Identify this writer as number `index` of `count` writing to the same directory.
    pub fn with_worker(mut self, index: u32, count: u32) -> Self {
        self.worker = (index, count);
        self
    }

    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    /// Write `record` at the start of every file, usually a `warcinfo` record.
    pub fn with_header<B: Into<Vec<u8>>>(mut self, record: B) -> Self {
        self.header = Some(record.into());
        self
    }

    pub fn with_file_system<S: FileSystem + 'static>(mut self, fs: S) -> Self {
        self.fs = Box::new(fs);
        self
    }

    pub fn with_rotation_policy<P: RotationPolicy + 'static>(mut self, policy: P) -> Self {
        self.rotation = Box::new(policy);
        self
    }

    pub fn with_sync_policy<P: SyncPolicy + 'static>(mut self, policy: P) -> Self {
        self.sync = Box::new(policy);
        self
    }

    /// Run `action` on every completed file, after any previously added actions.
    pub fn add_rotation_action<A: RotationAction + 'static>(mut self, action: A) -> Self {
        self.actions.push(Box::new(action));
        self
    }

    pub fn build(self) -> WarcWriter<F> {
        let mut names = self.names.with_compression(self.compression);
        names.prepare(self.worker.0, self.worker.1);

        WarcWriter {
            format: self.format,
            names,
            compression: self.compression,
            header: self.header,
            fs: self.fs,
            actions: self.actions,
            state: Mutex::new(State {
                rotation: self.rotation,
                sync: self.sync,
                current: None,
                serial: 0,
                closed: false,
            }),
        }
    }
}
