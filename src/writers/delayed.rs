//! Files that are first written to a temporary location.

use super::{AbortWrite, FileBuffer, STAGING_PREFIX};
use std::fmt;
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

/// Copies the staged bytes into the destination.
type Copier = fn(&mut dyn Read, &mut dyn Write) -> io::Result<u64>;

fn copy_staged(reader: &mut dyn Read, writer: &mut dyn Write) -> io::Result<u64> {
    io::copy(reader, writer)
}

/// A file that is first written to a temporary location.
///
/// All writes go to a staging file in the system temp directory. Closing the
/// file copies the staged bytes to the destination, unless the file was
/// aborted, and then removes the staging file whatever the outcome. This makes
/// sure all data was received from an unreliable source before the
/// destination is touched.
///
/// Publishing is atomic: the staged bytes are copied into a sibling file in
/// the destination's directory, which is then renamed over the destination.
/// A failed close leaves an existing destination as it was. If the
/// destination already exists, its permissions are carried over to the new
/// contents.
///
/// Dropping a `DelayedFile` without closing it discards the staged bytes.
pub struct DelayedFile {
    path: PathBuf,
    buffer: FileBuffer,
    closed: bool,
    copier: Copier,
}

impl DelayedFile {
    /// Create a delayed file that publishes to `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            buffer: FileBuffer::new(),
            closed: false,
            copier: copy_staged,
        }
    }

    /// The destination path.
    #[must_use]
    pub fn destination(&self) -> &Path {
        &self.path
    }

    /// The staging file, once the first write created it.
    #[must_use]
    pub fn staging_path(&self) -> Option<PathBuf> {
        self.buffer.path()
    }

    /// Stop the staged bytes from reaching the destination.
    ///
    /// Subsequent writes fail and [`DelayedFile::close`] only cleans up.
    pub fn abort(&self) {
        self.buffer.abort();
    }

    /// Whether the file was aborted.
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.buffer.is_aborted()
    }

    /// Close the staging file, publish its contents and delete it.
    ///
    /// The staging file is removed whatever happens. Closing an aborted file
    /// leaves the destination untouched. Closing twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns the first failure among opening the staged bytes, creating the
    /// sibling file, copying, restoring the destination's permissions, and
    /// renaming the sibling over the destination.
    pub fn close(&mut self) -> io::Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        let result = self.publish();
        if let Some(staging) = self.buffer.path() {
            let _ = fs::remove_file(staging);
        }
        result
    }

    fn publish(&self) -> io::Result<()> {
        self.buffer.close()?;
        if self.buffer.is_aborted() {
            return Ok(());
        }
        if let Some(err) = self.buffer.open_error() {
            return Err(err);
        }

        let permissions = fs::metadata(&self.path).ok().map(|m| m.permissions());

        // Nothing written means nothing staged: publish an empty file.
        let mut staged: Box<dyn Read> = match self.buffer.path() {
            Some(staging) if self.buffer.is_opened() => Box::new(File::open(staging)?),
            _ => Box::new(io::empty()),
        };

        // Copy next to the destination so the final step is a rename within
        // one directory. The sibling is deleted if any step fails.
        let mut sibling = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .tempfile_in(self.parent_dir())?;
        (self.copier)(&mut staged, sibling.as_file_mut())?;
        sibling.as_file_mut().flush()?;
        sibling.as_file().sync_all()?;

        if let Some(permissions) = permissions {
            sibling.as_file().set_permissions(permissions)?;
        }
        sibling.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }

    fn parent_dir(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }
}

impl fmt::Debug for DelayedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DelayedFile")
            .field("path", &self.path)
            .field("buffer", &self.buffer)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

impl Write for DelayedFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.buffer.flush()
    }
}

impl AbortWrite for DelayedFile {
    fn abort(&self) {
        DelayedFile::abort(self);
    }

    fn is_aborted(&self) -> bool {
        DelayedFile::is_aborted(self)
    }
}

impl Drop for DelayedFile {
    fn drop(&mut self) {
        if !self.closed {
            self.abort();
            let _ = self.close();
        }
    }
}
