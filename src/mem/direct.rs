/*!
 * Direct Backend
 * Off-heap regions from the global allocator
 */

use super::heap::check_size;
use super::region::{DirectRegion, RawRegion};
use super::traits::MemoryManager;
use crate::core::{Backend, BufferResult};

const DIRECT_ALIGNMENT: usize = std::mem::align_of::<u64>();

/// Memory manager producing off-heap regions
#[derive(Debug, Default, Clone)]
pub struct DirectMemory;

impl DirectMemory {
    pub fn new() -> Self {
        Self
    }
}

impl MemoryManager for DirectMemory {
    fn backend(&self) -> Backend {
        Backend::Direct
    }

    fn allocate(&self, size: usize) -> BufferResult<RawRegion> {
        check_size(size)?;
        Ok(RawRegion::Direct(DirectRegion::allocate_zeroed(
            size,
            DIRECT_ALIGNMENT,
        )))
    }
}
