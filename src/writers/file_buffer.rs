//! Byte buffer stored on the filesystem.

use super::{AbortSignal, AbortWrite};
use parking_lot::Mutex;
use std::fs::File;
use std::io::{self, Write};
use std::mem;
use std::path::PathBuf;

/// Prefix of the temporary files created when no path is given.
pub const STAGING_PREFIX: &str = "atomic-";

/// A byte buffer stored on the filesystem.
///
/// The file is opened lazily by the first write, exactly once: at the given
/// path (created or truncated), or at a fresh temporary path in the system
/// temp directory when no path was given. If that open fails, every write
/// returns the same error and the open is never retried.
///
/// Writes go through `&FileBuffer` as well, so the buffer can be shared
/// between threads; the one-time open is serialised by an internal lock.
#[derive(Debug, Default)]
pub struct FileBuffer {
    opener: Mutex<Opener>,
    signal: AbortSignal,
}

#[derive(Debug, Default)]
struct Opener {
    /// Requested path, or the generated one once resolved.
    path: Option<PathBuf>,
    handle: Handle,
    /// Set once the file was successfully opened.
    opened: bool,
}

#[derive(Debug, Default)]
enum Handle {
    #[default]
    Unopened,
    Open(File),
    /// The open failed; replayed on every write.
    Failed {
        kind: io::ErrorKind,
        message: String,
    },
    Closed,
}

impl FileBuffer {
    /// Create a buffer backed by a temporary file.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a buffer backed by the file at `path`.
    #[must_use]
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            opener: Mutex::new(Opener {
                path: Some(path.into()),
                ..Opener::default()
            }),
            signal: AbortSignal::default(),
        }
    }

    /// Path of the backing file.
    ///
    /// `None` for a temporary buffer that has not been written to yet.
    #[must_use]
    pub fn path(&self) -> Option<PathBuf> {
        self.opener.lock().path.clone()
    }

    /// Whether the backing file was ever opened successfully.
    #[must_use]
    pub fn is_opened(&self) -> bool {
        self.opener.lock().opened
    }

    /// The error captured when opening the backing file failed.
    #[must_use]
    pub fn open_error(&self) -> Option<io::Error> {
        match &self.opener.lock().handle {
            Handle::Failed { kind, message } => Some(io::Error::new(*kind, message.clone())),
            _ => None,
        }
    }

    /// Abort writing. Subsequent writes return an error.
    pub fn abort(&self) {
        self.signal.abort();
    }

    /// Whether the buffer was aborted.
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.signal.is_aborted()
    }

    /// Release the file handle.
    ///
    /// A no-op when the file was never opened or is already closed. The file
    /// itself stays on disk.
    ///
    /// # Errors
    ///
    /// Returns an error if buffered data cannot be flushed.
    pub fn close(&self) -> io::Result<()> {
        let mut opener = self.opener.lock();
        match mem::replace(&mut opener.handle, Handle::Closed) {
            Handle::Open(mut file) => file.flush(),
            other => {
                opener.handle = other;
                Ok(())
            }
        }
    }
}

impl Opener {
    /// Resolve the handle on first use and hand it out.
    fn file(&mut self) -> io::Result<&mut File> {
        if matches!(self.handle, Handle::Unopened) {
            self.handle = match self.open() {
                Ok(file) => {
                    self.opened = true;
                    Handle::Open(file)
                }
                Err(err) => Handle::Failed {
                    kind: err.kind(),
                    message: err.to_string(),
                },
            };
        }

        match &mut self.handle {
            Handle::Open(file) => Ok(file),
            Handle::Failed { kind, message } => Err(io::Error::new(*kind, message.clone())),
            Handle::Unopened | Handle::Closed => Err(io::Error::other("file buffer is closed")),
        }
    }

    fn open(&mut self) -> io::Result<File> {
        if let Some(path) = &self.path {
            return File::create(path);
        }

        let (file, path) = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .tempfile()?
            .keep()
            .map_err(|e| e.error)?;
        self.path = Some(path);
        Ok(file)
    }
}

impl Write for &FileBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.signal.check()?;
        self.opener.lock().file()?.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        match &mut self.opener.lock().handle {
            Handle::Open(file) => file.flush(),
            _ => Ok(()),
        }
    }
}

impl Write for FileBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        (&*self).write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        (&*self).flush()
    }
}

impl AbortWrite for FileBuffer {
    fn abort(&self) {
        FileBuffer::abort(self);
    }

    fn is_aborted(&self) -> bool {
        FileBuffer::is_aborted(self)
    }
}
