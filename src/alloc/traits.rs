/*!
 * Allocator Traits
 * The buffer-producing interface consumed by the rest of the framework
 */

use super::supplier::ConstBufferSupplier;
use crate::buffer::Buffer;
use crate::core::BufferResult;

/// Source of buffers
pub trait BufferAllocator: Send + Sync {
    /// Allocate a writable, owned buffer with the exact capacity
    fn allocate(&self, size: usize) -> BufferResult<Buffer>;

    /// Factory of read-only buffers over one shared copy of `data`
    ///
    /// Every buffer obtained from the supplier is an independent read-only
    /// handle backed by the same memory.
    fn const_supplier(&self, data: &[u8]) -> BufferResult<ConstBufferSupplier>;

    /// Release pooled resources
    ///
    /// Outstanding buffers remain valid; allocation fails afterwards.
    fn close(&self);
}
