/**
 * Bufkit Library
 * Reference-counted byte-buffer engine with explicit ownership transfer
 *
 * The buffer lifecycle: an allocator produces an owned, writable buffer over
 * one of three backing-memory kinds (heap array, direct off-heap, page-aligned
 * segment) or a composite of components. Handles can be borrowed (acquire,
 * slice), partitioned (split), frozen (make_read_only), handed to another
 * thread (send/receive), and closed exactly once each; the backing region is
 * reclaimed deterministically when its last owner closes.
 */

pub mod alloc;
pub mod buffer;
pub mod core;
pub mod mem;
pub mod rc;

pub use alloc::{BufferAllocator, ConstBufferSupplier, PoolStats, PooledAllocator, UnpooledAllocator};
pub use buffer::{
    Buffer, BufferRef, ByteCursor, Envelope, ReadableComponent, ReverseByteCursor,
    WritableComponent,
};
pub use self::core::{Backend, BufferError, BufferKind, BufferResult, Endianness};
pub use mem::{AllocatorControl, DirectMemory, HeapMemory, MemoryManager, RawRegion, SegmentMemory};
pub use rc::{DropReclaimer, Reclaimer, SharedArc};
