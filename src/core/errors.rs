/*!
 * Error Types
 * Centralized error handling for buffer operations
 */

use thiserror::Error;

/// Buffer operation result
pub type BufferResult<T> = Result<T, BufferError>;

/// Buffer errors
///
/// Every failure a buffer operation can surface maps onto exactly one of
/// these variants. Operations fail without side effects on cursors, bytes,
/// or reference counts; `close` is the sole idempotent exception.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BufferError {
    #[error("Offset {offset} with length {length} is out of bounds: [read 0 to {read_end}, write 0 to {write_end}]")]
    OutOfBounds {
        offset: usize,
        length: usize,
        read_end: usize,
        write_end: usize,
    },

    #[error("This buffer is closed and can no longer be accessed")]
    Closed,

    #[error("This buffer is read-only")]
    ReadOnly,

    #[error("Exclusive ownership required: {0}")]
    NotOwned(String),

    #[error("Cannot send() this buffer: {0}")]
    SendState(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl BufferError {
    /// Bounds failure for a read-side access
    #[inline]
    pub(crate) fn read_bounds(offset: usize, length: usize, read_end: usize, capacity: usize) -> Self {
        BufferError::OutOfBounds {
            offset,
            length,
            read_end,
            write_end: capacity,
        }
    }

    /// Bounds failure for a write-side access
    #[inline]
    pub(crate) fn write_bounds(offset: usize, length: usize, capacity: usize) -> Self {
        BufferError::OutOfBounds {
            offset,
            length,
            read_end: capacity,
            write_end: capacity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_state_message_contains_marker() {
        let err = BufferError::SendState("buffer is not accessible".to_string());
        assert!(err.to_string().contains("Cannot send()"));
    }

    #[test]
    fn test_closed_message_identifies_state() {
        assert!(BufferError::Closed.to_string().contains("closed"));
        assert!(BufferError::ReadOnly.to_string().contains("read-only"));
    }
}
