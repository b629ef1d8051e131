/*!
 * Core Types
 * Common types shared across the buffer engine
 */

use serde::{Deserialize, Serialize};

/// Maximum capacity of a single buffer (2GB)
///
/// Keeps offset arithmetic safely inside `usize` on every supported target
/// and matches the wire-level framing limits of the surrounding framework.
pub const MAX_CAPACITY: usize = 2 * 1024 * 1024 * 1024 - 1;

/// Page alignment used by the memory-segment backend
pub const SEGMENT_ALIGNMENT: usize = 4096;

/// Byte order for multi-byte primitive accessors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Endianness {
    Big,
    Little,
}

impl Endianness {
    /// The native byte order of the current target
    #[inline]
    pub const fn native() -> Self {
        if cfg!(target_endian = "big") {
            Endianness::Big
        } else {
            Endianness::Little
        }
    }
}

impl std::fmt::Display for Endianness {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Endianness::Big => write!(f, "BIG_ENDIAN"),
            Endianness::Little => write!(f, "LITTLE_ENDIAN"),
        }
    }
}

/// Backing-memory kind of a leaf buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Backend {
    /// On-heap byte array
    Heap,
    /// Off-heap memory from the global allocator
    Direct,
    /// Page-aligned off-heap memory segment
    Segment,
}

/// Logical shape of a buffer, used to tag send envelopes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BufferKind {
    Heap,
    Direct,
    Segment,
    Composite,
}

impl From<Backend> for BufferKind {
    fn from(backend: Backend) -> Self {
        match backend {
            Backend::Heap => BufferKind::Heap,
            Backend::Direct => BufferKind::Direct,
            Backend::Segment => BufferKind::Segment,
        }
    }
}
