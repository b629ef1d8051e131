/*!
 * Unpooled Allocators
 * Fresh region per allocation; reclamation frees the region
 */

use super::supplier::ConstBufferSupplier;
use super::traits::BufferAllocator;
use crate::buffer::Buffer;
use crate::core::{Backend, BufferError, BufferResult};
use crate::mem::traits::{AllocatorControl, MemoryManager};
use crate::mem::{DirectMemory, HeapMemory, RawRegion, SegmentMemory};
use crate::rc::DropReclaimer;
use log::info;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Allocator handing out one fresh region per buffer
#[derive(Clone)]
pub struct UnpooledAllocator {
    inner: Arc<UnpooledInner>,
}

struct UnpooledInner {
    manager: Box<dyn MemoryManager>,
    closed: AtomicBool,
}

impl AllocatorControl for UnpooledInner {
    fn allocate_untethered(&self, backend: Backend, size: usize) -> BufferResult<RawRegion> {
        debug_assert_eq!(backend, self.manager.backend());
        self.manager.allocate(size)
    }
}

impl UnpooledAllocator {
    pub fn new(manager: Box<dyn MemoryManager>) -> Self {
        info!(
            "unpooled {:?} buffer allocator initialized",
            manager.backend()
        );
        Self {
            inner: Arc::new(UnpooledInner {
                manager,
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// On-heap allocator
    pub fn heap() -> Self {
        Self::new(Box::new(HeapMemory::new()))
    }

    /// Off-heap allocator
    pub fn direct() -> Self {
        Self::new(Box::new(DirectMemory::new()))
    }

    /// Page-aligned segment allocator
    pub fn segment() -> Self {
        Self::new(Box::new(SegmentMemory::new()))
    }

    fn check_open(&self) -> BufferResult<()> {
        if self.inner.closed.load(Ordering::SeqCst) {
            return Err(BufferError::Closed);
        }
        Ok(())
    }
}

impl BufferAllocator for UnpooledAllocator {
    fn allocate(&self, size: usize) -> BufferResult<Buffer> {
        self.check_open()?;
        let region = self.inner.manager.allocate(size)?;
        let control: Arc<dyn AllocatorControl> = self.inner.clone();
        Ok(Buffer::from_region(
            region,
            control,
            Arc::new(DropReclaimer),
        ))
    }

    fn const_supplier(&self, data: &[u8]) -> BufferResult<ConstBufferSupplier> {
        self.check_open()?;
        let region = self.inner.manager.allocate(data.len())?;
        let control: Arc<dyn AllocatorControl> = self.inner.clone();
        Ok(ConstBufferSupplier::new(
            region,
            data,
            control,
            Arc::new(DropReclaimer),
        ))
    }

    fn close(&self) {
        self.inner.closed.store(true, Ordering::SeqCst);
    }
}
