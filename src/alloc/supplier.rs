/*!
 * Const-Buffer Supplier
 *
 * Shared immutable snapshot handing out read-only handles. Every call to
 * `get` acquires the shared count and returns a fresh buffer; the backing
 * memory is reclaimed when the supplier and all handles have closed.
 */

use crate::buffer::leaf::LeafBuffer;
use crate::buffer::Buffer;
use crate::core::{Backend, BufferResult, Endianness};
use crate::mem::traits::AllocatorControl;
use crate::mem::RawRegion;
use crate::rc::{Reclaimer, SharedArc};
use std::sync::Arc;

/// Factory of read-only const-view buffers over one shared region
pub struct ConstBufferSupplier {
    ptr: *mut u8,
    len: usize,
    backend: Backend,
    arc: Arc<SharedArc<RawRegion>>,
    control: Arc<dyn AllocatorControl>,
    reclaim: Arc<dyn Reclaimer<RawRegion>>,
}

// Handles are read-only and carry their own confinement; the supplier only
// ever reads its fields and bumps the atomic count.
unsafe impl Send for ConstBufferSupplier {}
unsafe impl Sync for ConstBufferSupplier {}

impl ConstBufferSupplier {
    pub(crate) fn new(
        mut region: RawRegion,
        data: &[u8],
        control: Arc<dyn AllocatorControl>,
        reclaim: Arc<dyn Reclaimer<RawRegion>>,
    ) -> Self {
        debug_assert!(region.len() >= data.len());
        let ptr = region.base_ptr();
        let backend = region.backend();
        if !data.is_empty() {
            unsafe {
                std::ptr::copy_nonoverlapping(data.as_ptr(), ptr, data.len());
            }
        }
        let arc = SharedArc::root(region, Arc::clone(&reclaim));
        Self {
            ptr,
            len: data.len(),
            backend,
            arc,
            control,
            reclaim,
        }
    }

    /// A fresh read-only handle over the shared bytes
    ///
    /// The handle covers the full content (`reader_offset` 0, readable bytes
    /// equal to the content length). Each handle carries its own arc nested
    /// over the shared region, so handles split and close independently.
    pub fn get(&self) -> BufferResult<Buffer> {
        let handle_arc = SharedArc::nested(&self.arc)?;
        let mut leaf = LeafBuffer::with_arc(
            self.ptr,
            self.len,
            self.backend,
            handle_arc,
            Arc::clone(&self.control),
            Arc::clone(&self.reclaim),
        );
        leaf.woff = self.len;
        leaf.read_only = true;
        leaf.const_view = true;
        Ok(Buffer::from_leaf(leaf, Endianness::native()))
    }

    /// Content length of the supplied buffers
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Drop for ConstBufferSupplier {
    fn drop(&mut self) {
        self.arc.release();
    }
}
