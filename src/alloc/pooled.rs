/*!
 * Pooled Allocator
 *
 * Size-classed region recycling. Reclaimed regions land in lock-free queues
 * and are zeroed and re-enrolled on the next allocation of their class;
 * oversize regions bypass the pool entirely.
 */

use super::supplier::ConstBufferSupplier;
use super::traits::BufferAllocator;
use crate::buffer::Buffer;
use crate::core::{Backend, BufferError, BufferResult};
use crate::mem::traits::{AllocatorControl, MemoryManager};
use crate::mem::{DirectMemory, HeapMemory, RawRegion, SegmentMemory};
use crate::rc::Reclaimer;
use crossbeam_queue::ArrayQueue;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Region size classes
const SMALL_REGION: usize = 1024; // 1KB
const MEDIUM_REGION: usize = 16384; // 16KB
const LARGE_REGION: usize = 65536; // 64KB

/// Queue depths per class; small regions churn the most
const SMALL_QUEUE: usize = 64;
const MEDIUM_QUEUE: usize = 32;
const LARGE_QUEUE: usize = 16;

/// Allocator recycling regions through size-classed queues
#[derive(Clone)]
pub struct PooledAllocator {
    inner: Arc<PoolInner>,
}

struct PoolInner {
    manager: Box<dyn MemoryManager>,
    small: ArrayQueue<RawRegion>,
    medium: ArrayQueue<RawRegion>,
    large: ArrayQueue<RawRegion>,
    closed: AtomicBool,
    hits: AtomicU64,
    misses: AtomicU64,
    recycled: AtomicU64,
}

impl PoolInner {
    /// Queue and region size for a requested capacity, if poolable
    fn class_for(size: usize) -> Option<(usize, usize)> {
        if size <= SMALL_REGION {
            Some((0, SMALL_REGION))
        } else if size <= MEDIUM_REGION {
            Some((1, MEDIUM_REGION))
        } else if size <= LARGE_REGION {
            Some((2, LARGE_REGION))
        } else {
            None
        }
    }

    fn queue(&self, class: usize) -> &ArrayQueue<RawRegion> {
        match class {
            0 => &self.small,
            1 => &self.medium,
            _ => &self.large,
        }
    }

    /// Pop a recycled region of the right class, or allocate a fresh one
    fn acquire_region(&self, size: usize) -> BufferResult<RawRegion> {
        match Self::class_for(size) {
            Some((class, region_size)) => {
                if let Some(mut region) = self.queue(class).pop() {
                    region.zero();
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    Ok(region)
                } else {
                    self.misses.fetch_add(1, Ordering::Relaxed);
                    self.manager.allocate(region_size)
                }
            }
            // Very large: don't pool
            None => self.manager.allocate(size),
        }
    }
}

impl Reclaimer<RawRegion> for PoolInner {
    fn reclaim(&self, region: RawRegion) {
        if self.closed.load(Ordering::SeqCst) {
            return;
        }
        let len = region.len();
        let class = match Self::class_for(len) {
            // Only exact class-sized regions go back; anything else drops.
            Some((class, region_size)) if region_size == len => class,
            _ => return,
        };
        // Ignore the region if the queue is full; dropping frees it.
        if self.queue(class).push(region).is_ok() {
            self.recycled.fetch_add(1, Ordering::Relaxed);
            debug!("recycled {}-byte region into the pool", len);
        }
    }
}

impl AllocatorControl for PoolInner {
    fn allocate_untethered(&self, backend: Backend, size: usize) -> BufferResult<RawRegion> {
        debug_assert_eq!(backend, self.manager.backend());
        self.acquire_region(size)
    }
}

impl PooledAllocator {
    pub fn new(manager: Box<dyn MemoryManager>) -> Self {
        info!(
            "pooled {:?} buffer allocator initialized ({}B/{}B/{}B classes)",
            manager.backend(),
            SMALL_REGION,
            MEDIUM_REGION,
            LARGE_REGION
        );
        Self {
            inner: Arc::new(PoolInner {
                manager,
                small: ArrayQueue::new(SMALL_QUEUE),
                medium: ArrayQueue::new(MEDIUM_QUEUE),
                large: ArrayQueue::new(LARGE_QUEUE),
                closed: AtomicBool::new(false),
                hits: AtomicU64::new(0),
                misses: AtomicU64::new(0),
                recycled: AtomicU64::new(0),
            }),
        }
    }

    /// Pooled on-heap allocator
    pub fn heap() -> Self {
        Self::new(Box::new(HeapMemory::new()))
    }

    /// Pooled off-heap allocator
    pub fn direct() -> Self {
        Self::new(Box::new(DirectMemory::new()))
    }

    /// Pooled segment allocator
    pub fn segment() -> Self {
        Self::new(Box::new(SegmentMemory::new()))
    }

    /// Current pool statistics
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            small_pooled: self.inner.small.len(),
            medium_pooled: self.inner.medium.len(),
            large_pooled: self.inner.large.len(),
            hits: self.inner.hits.load(Ordering::Relaxed),
            misses: self.inner.misses.load(Ordering::Relaxed),
            recycled: self.inner.recycled.load(Ordering::Relaxed),
        }
    }

    fn check_open(&self) -> BufferResult<()> {
        if self.inner.closed.load(Ordering::SeqCst) {
            return Err(BufferError::Closed);
        }
        Ok(())
    }
}

impl BufferAllocator for PooledAllocator {
    fn allocate(&self, size: usize) -> BufferResult<Buffer> {
        self.check_open()?;
        let region = self.inner.acquire_region(size)?;
        let control: Arc<dyn AllocatorControl> = self.inner.clone();
        let reclaim: Arc<dyn Reclaimer<RawRegion>> = self.inner.clone();
        Ok(Buffer::from_view(region, size, control, reclaim))
    }

    fn const_supplier(&self, data: &[u8]) -> BufferResult<ConstBufferSupplier> {
        self.check_open()?;
        let region = self.inner.acquire_region(data.len())?;
        let control: Arc<dyn AllocatorControl> = self.inner.clone();
        let reclaim: Arc<dyn Reclaimer<RawRegion>> = self.inner.clone();
        Ok(ConstBufferSupplier::new(region, data, control, reclaim))
    }

    fn close(&self) {
        self.inner.closed.store(true, Ordering::SeqCst);
        while self.inner.small.pop().is_some() {}
        while self.inner.medium.pop().is_some() {}
        while self.inner.large.pop().is_some() {}
    }
}

/// Pool statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolStats {
    pub small_pooled: usize,
    pub medium_pooled: usize,
    pub large_pooled: usize,
    pub hits: u64,
    pub misses: u64,
    pub recycled: u64,
}
