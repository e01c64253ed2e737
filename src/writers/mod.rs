//! Abortable write targets.
//!
//! Every destination the updater streams an asset into implements
//! [`AbortWrite`]: an [`std::io::Write`] sink that can be told to give up.
//! Once aborted, a target rejects further writes and skips any commit-time
//! side effect.
//!
//! - [`FileBuffer`] - a file written at a given path or at a fresh temporary path
//! - [`DelayedFile`] - stages bytes in a [`FileBuffer`] and publishes them on close
//! - [`AbortBuffer`] - an in-memory buffer with the same abort contract
//!
//! This layer does not log; failures are reported only through the returned
//! `io::Error` values.

mod abort_buffer;
mod delayed;
mod file_buffer;

pub use abort_buffer::AbortBuffer;
pub use delayed::DelayedFile;
pub use file_buffer::{FileBuffer, STAGING_PREFIX};

use parking_lot::Mutex;
use std::io::{self, Write};

/// A writer that can be aborted.
pub trait AbortWrite: Write + Send {
    /// Abort writing. Subsequent writes fail and nothing is committed.
    fn abort(&self);

    /// Whether [`AbortWrite::abort`] has been called.
    fn is_aborted(&self) -> bool;
}

/// Error carried inside the `io::Error` returned by writes after an abort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("write operations aborted")]
pub struct WriteAborted;

/// Build the error returned by a write on an aborted target.
#[must_use]
pub fn aborted_error() -> io::Error {
    io::Error::other(WriteAborted)
}

/// Whether `err` was produced by writing to an aborted target.
#[must_use]
pub fn is_aborted_error(err: &io::Error) -> bool {
    err.get_ref().is_some_and(|inner| inner.is::<WriteAborted>())
}

/// Abort state of a write target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum WriteState {
    #[default]
    Active,
    Aborted,
}

/// One-way abort switch shared by the write targets.
#[derive(Debug, Default)]
pub(crate) struct AbortSignal {
    state: Mutex<WriteState>,
}

impl AbortSignal {
    pub(crate) fn abort(&self) {
        *self.state.lock() = WriteState::Aborted;
    }

    pub(crate) fn is_aborted(&self) -> bool {
        *self.state.lock() == WriteState::Aborted
    }

    /// Fail with the aborted error once the switch has been flipped.
    pub(crate) fn check(&self) -> io::Result<()> {
        if self.is_aborted() {
            Err(aborted_error())
        } else {
            Ok(())
        }
    }
}

/// Destination chosen for one asset.
#[derive(Debug)]
pub enum WriteTarget {
    /// Bytes are staged on disk and published on [`WriteTarget::finish`].
    Staged(DelayedFile),
    /// Bytes accumulate in memory.
    Memory(AbortBuffer),
}

impl WriteTarget {
    /// Commit the target.
    ///
    /// Closes a staged file, which publishes it unless aborted. A memory
    /// buffer needs no commit.
    ///
    /// # Errors
    ///
    /// Returns the staged file's close error.
    pub fn finish(self) -> io::Result<()> {
        match self {
            Self::Staged(mut file) => file.close(),
            Self::Memory(_) => Ok(()),
        }
    }
}

impl Write for WriteTarget {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Staged(file) => file.write(buf),
            Self::Memory(buffer) => buffer.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Staged(file) => file.flush(),
            Self::Memory(buffer) => buffer.flush(),
        }
    }
}

impl AbortWrite for WriteTarget {
    fn abort(&self) {
        match self {
            Self::Staged(file) => file.abort(),
            Self::Memory(buffer) => buffer.abort(),
        }
    }

    fn is_aborted(&self) -> bool {
        match self {
            Self::Staged(file) => file.is_aborted(),
            Self::Memory(buffer) => buffer.is_aborted(),
        }
    }
}

impl From<DelayedFile> for WriteTarget {
    fn from(file: DelayedFile) -> Self {
        Self::Staged(file)
    }
}

impl From<AbortBuffer> for WriteTarget {
    fn from(buffer: AbortBuffer) -> Self {
        Self::Memory(buffer)
    }
}
