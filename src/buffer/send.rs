/*!
 * Send Envelope
 *
 * One-shot ownership-transfer carrier. Producing an envelope makes the
 * origin buffer inaccessible; receiving it materializes a fresh buffer
 * carrying the origin's snapshot. Consumption is by value, so a second
 * receive is unrepresentable.
 */

use super::Buffer;
use crate::core::BufferKind;
use std::sync::atomic::{fence, Ordering};

/// Exclusive-ownership carrier for one buffer
///
/// The envelope is `Send`; moving it to another thread and receiving there
/// transfers all writes made before `send` (both ends emit full fences).
/// Dropping a pending envelope discards the buffer and releases its memory.
pub struct Envelope {
    kind: BufferKind,
    buf: Option<Buffer>,
}

impl Envelope {
    pub(crate) fn new(kind: BufferKind, buf: Buffer) -> Self {
        fence(Ordering::SeqCst);
        Self {
            kind,
            buf: Some(buf),
        }
    }

    /// The logical kind of the carried buffer
    #[inline]
    pub fn kind(&self) -> BufferKind {
        self.kind
    }

    /// Take ownership of the carried buffer
    ///
    /// The returned buffer has a single owner and the exact state the origin
    /// had when it was sent: capacity, cursors, byte order, read-only and
    /// const-view flags.
    pub fn receive(mut self) -> Buffer {
        fence(Ordering::SeqCst);
        self.buf.take().expect("pending envelope carries a buffer")
    }

    /// Discard the envelope, releasing the carried buffer
    pub fn discard(self) {
        // Drop does the work.
    }
}

impl Drop for Envelope {
    fn drop(&mut self) {
        // Closing the carried buffer releases its region reference.
        self.buf.take();
    }
}

impl std::fmt::Debug for Envelope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Envelope")
            .field("kind", &self.kind)
            .field("pending", &self.buf.is_some())
            .finish()
    }
}
