//! In-memory buffer that can be aborted.

use super::{AbortSignal, AbortWrite};
use bytes::Bytes;
use parking_lot::Mutex;
use std::io::{self, Write};
use std::sync::Arc;

/// An in-memory buffer that can be aborted.
///
/// Clones share the same bytes and abort state, so a caller can keep one
/// handle to read the downloaded asset while the updater writes through
/// another.
#[derive(Debug, Clone, Default)]
pub struct AbortBuffer {
    inner: Arc<Shared>,
}

#[derive(Debug, Default)]
struct Shared {
    bytes: Mutex<Vec<u8>>,
    signal: AbortSignal,
}

impl AbortBuffer {
    /// Create a buffer seeded with `initial`.
    #[must_use]
    pub fn new(initial: impl Into<Vec<u8>>) -> Self {
        Self {
            inner: Arc::new(Shared {
                bytes: Mutex::new(initial.into()),
                signal: AbortSignal::default(),
            }),
        }
    }

    /// Block all subsequent writes.
    pub fn abort(&self) {
        self.inner.signal.abort();
    }

    /// Whether the buffer was aborted.
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.inner.signal.is_aborted()
    }

    /// A copy of the bytes written so far.
    #[must_use]
    pub fn contents(&self) -> Vec<u8> {
        self.inner.bytes.lock().clone()
    }

    /// The bytes written so far as [`Bytes`].
    #[must_use]
    pub fn to_bytes(&self) -> Bytes {
        Bytes::from(self.contents())
    }

    /// Number of bytes in the buffer.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.bytes.lock().len()
    }

    /// Whether the buffer holds no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.bytes.lock().is_empty()
    }
}

impl Write for AbortBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut bytes = self.inner.bytes.lock();
        self.inner.signal.check()?;
        bytes.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl AbortWrite for AbortBuffer {
    fn abort(&self) {
        AbortBuffer::abort(self);
    }

    fn is_aborted(&self) -> bool {
        AbortBuffer::is_aborted(self)
    }
}
