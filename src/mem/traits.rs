/*!
 * Memory Traits
 * Backend abstraction and the allocator bridge used for in-place growth
 */

use super::region::RawRegion;
use crate::buffer::Buffer;
use crate::core::{Backend, BufferResult};
use crate::rc::Reclaimer;
use std::sync::Arc;

/// Backend-specific producer of raw backing regions
pub trait MemoryManager: Send + Sync {
    /// The backend this manager produces regions for
    fn backend(&self) -> Backend;

    /// Allocate a fresh, zeroed region
    fn allocate(&self, size: usize) -> BufferResult<RawRegion>;

    /// Wrap a recovered region into a fresh buffer
    ///
    /// Pooled allocators receive regions back through their [`Reclaimer`]
    /// and re-enroll the same memory under a new reclamation here.
    fn recover(
        &self,
        region: RawRegion,
        control: Arc<dyn AllocatorControl>,
        reclaimer: Arc<dyn Reclaimer<RawRegion>>,
    ) -> BufferResult<Buffer> {
        Ok(Buffer::from_region(region, control, reclaimer))
    }
}

/// Bridge from a buffer back to its originating allocator
///
/// Lets `ensure_writable` ask for additional memory without knowing the
/// allocator's identity. The returned region is not yet enrolled with any
/// reclamation; the buffer tethers it to its own reclaimer when installing it.
pub trait AllocatorControl: Send + Sync {
    /// Allocate a raw region for the given backend, unattached to any reclamation
    fn allocate_untethered(&self, backend: Backend, size: usize) -> BufferResult<RawRegion>;
}
