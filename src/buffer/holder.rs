/*!
 * Buffer Holder
 * A mutable reference cell mediating access to one buffer
 */

use super::send::Envelope;
use super::Buffer;
use std::sync::atomic::{fence, Ordering};

/// A mutable reference to a buffer
///
/// User types that wrap and mediate access to one buffer build on this:
/// the holder owns the buffer, replacement closes the previous one, and
/// construction from an envelope takes exclusive ownership of a sent buffer.
pub struct BufferRef {
    buf: Buffer,
}

impl BufferRef {
    /// Hold the given buffer
    pub fn new(buf: Buffer) -> Self {
        let holder = Self { buf };
        fence(Ordering::SeqCst);
        holder
    }

    /// Take exclusive ownership of a sent buffer
    pub fn from_envelope(envelope: Envelope) -> Self {
        Self::new(envelope.receive())
    }

    /// Replace the held buffer; the previous buffer is closed
    pub fn replace(&mut self, buf: Buffer) {
        self.buf = buf;
        fence(Ordering::SeqCst);
    }

    /// Replace the held buffer with a sent one
    pub fn replace_with(&mut self, envelope: Envelope) {
        self.replace(envelope.receive());
    }

    /// Access the held buffer
    #[inline]
    pub fn contents(&self) -> &Buffer {
        &self.buf
    }

    /// Mutable access to the held buffer
    #[inline]
    pub fn contents_mut(&mut self) -> &mut Buffer {
        &mut self.buf
    }

    /// Give up the held buffer
    pub fn into_inner(self) -> Buffer {
        self.buf
    }
}
