/*!
 * Heap Backend
 * On-heap byte-array regions
 */

use super::region::RawRegion;
use super::traits::MemoryManager;
use crate::core::{Backend, BufferError, BufferResult, MAX_CAPACITY};

/// Memory manager producing on-heap byte arrays
#[derive(Debug, Default, Clone)]
pub struct HeapMemory;

impl HeapMemory {
    pub fn new() -> Self {
        Self
    }
}

impl MemoryManager for HeapMemory {
    fn backend(&self) -> Backend {
        Backend::Heap
    }

    fn allocate(&self, size: usize) -> BufferResult<RawRegion> {
        check_size(size)?;
        Ok(RawRegion::Heap(vec![0u8; size].into_boxed_slice()))
    }
}

/// Validate a requested allocation size against the capacity limit
pub(crate) fn check_size(size: usize) -> BufferResult<()> {
    if size > MAX_CAPACITY {
        return Err(BufferError::InvalidArgument(format!(
            "requested capacity {} exceeds the maximum of {}",
            size, MAX_CAPACITY
        )));
    }
    Ok(())
}
