/*!
 * Segment Backend
 * Page-aligned off-heap memory segments
 */

use super::heap::check_size;
use super::region::{DirectRegion, RawRegion};
use super::traits::MemoryManager;
use crate::core::{Backend, BufferResult, SEGMENT_ALIGNMENT};

/// Memory manager producing page-aligned segments
///
/// Segments behave like direct regions with stronger alignment, suitable for
/// handing whole pages to vectored I/O or DMA-style consumers.
#[derive(Debug, Default, Clone)]
pub struct SegmentMemory;

impl SegmentMemory {
    pub fn new() -> Self {
        Self
    }
}

impl MemoryManager for SegmentMemory {
    fn backend(&self) -> Backend {
        Backend::Segment
    }

    fn allocate(&self, size: usize) -> BufferResult<RawRegion> {
        check_size(size)?;
        Ok(RawRegion::Segment(DirectRegion::allocate_zeroed(
            size,
            SEGMENT_ALIGNMENT,
        )))
    }
}
