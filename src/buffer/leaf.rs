/*!
 * Leaf Buffer
 *
 * One buffer view over a contiguous backing region. All three leaf backends
 * share this implementation; they differ only in how regions are produced
 * and what the component introspection exposes.
 */

use crate::core::{Backend, BufferError, BufferResult};
use crate::mem::traits::AllocatorControl;
use crate::mem::RawRegion;
use crate::rc::{Reclaimer, SharedArc};
use std::sync::Arc;

/// A contiguous buffer view with its own cursors and shared-count reference
///
/// The view covers `[ptr, ptr + cap)` inside some backing region owned by
/// the shared count. Split produces sibling views over disjoint ranges of
/// the same region; slices share the arc itself.
pub(crate) struct LeafBuffer {
    pub(crate) ptr: *mut u8,
    pub(crate) cap: usize,
    pub(crate) roff: usize,
    pub(crate) woff: usize,
    pub(crate) read_only: bool,
    pub(crate) const_view: bool,
    pub(crate) backend: Backend,
    pub(crate) arc: Option<Arc<SharedArc<RawRegion>>>,
    pub(crate) control: Arc<dyn AllocatorControl>,
    pub(crate) reclaim: Arc<dyn Reclaimer<RawRegion>>,
}

// A leaf confines its view to one thread at a time; writable views are
// unique (count 1) and split siblings cover disjoint ranges.
unsafe impl Send for LeafBuffer {}

impl LeafBuffer {
    /// Enroll a fresh region under a new root arc
    pub(crate) fn from_region(
        mut region: RawRegion,
        view_cap: usize,
        control: Arc<dyn AllocatorControl>,
        reclaim: Arc<dyn Reclaimer<RawRegion>>,
    ) -> Self {
        debug_assert!(view_cap <= region.len());
        let ptr = region.base_ptr();
        let backend = region.backend();
        let arc = SharedArc::root(region, reclaim.clone());
        Self {
            ptr,
            cap: view_cap,
            roff: 0,
            woff: 0,
            read_only: false,
            const_view: false,
            backend,
            arc: Some(arc),
            control,
            reclaim,
        }
    }

    /// Build a view over an arc the caller already holds a count on
    pub(crate) fn with_arc(
        ptr: *mut u8,
        cap: usize,
        backend: Backend,
        arc: Arc<SharedArc<RawRegion>>,
        control: Arc<dyn AllocatorControl>,
        reclaim: Arc<dyn Reclaimer<RawRegion>>,
    ) -> Self {
        Self {
            ptr,
            cap,
            roff: 0,
            woff: 0,
            read_only: false,
            const_view: false,
            backend,
            arc: Some(arc),
            control,
            reclaim,
        }
    }

    #[inline]
    pub(crate) fn is_accessible(&self) -> bool {
        self.arc.is_some()
    }

    #[inline]
    pub(crate) fn is_owned(&self) -> bool {
        match &self.arc {
            Some(arc) => arc.is_owned(),
            None => false,
        }
    }

    #[inline]
    pub(crate) fn borrows(&self) -> usize {
        match &self.arc {
            Some(arc) => arc.borrows(),
            None => 0,
        }
    }

    #[inline]
    pub(crate) fn readable_bytes(&self) -> usize {
        self.woff - self.roff
    }

    #[inline]
    pub(crate) fn writable_bytes(&self) -> usize {
        self.cap - self.woff
    }

    /// Native address of the view base, for off-heap backends
    #[inline]
    pub(crate) fn native_address(&self) -> Option<usize> {
        match self.backend {
            Backend::Heap => None,
            Backend::Direct | Backend::Segment => Some(self.ptr as usize),
        }
    }

    // ---- access checks ----------------------------------------------------

    pub(crate) fn check_read(&self, offset: usize, size: usize) -> BufferResult<()> {
        if !self.is_accessible() {
            return Err(BufferError::Closed);
        }
        let end = offset.checked_add(size);
        match end {
            Some(end) if end <= self.woff => Ok(()),
            _ => Err(BufferError::read_bounds(offset, size, self.woff, self.cap)),
        }
    }

    pub(crate) fn check_get(&self, offset: usize, size: usize) -> BufferResult<()> {
        if !self.is_accessible() {
            return Err(BufferError::Closed);
        }
        let end = offset.checked_add(size);
        match end {
            Some(end) if end <= self.cap => Ok(()),
            _ => Err(BufferError::read_bounds(offset, size, self.woff, self.cap)),
        }
    }

    pub(crate) fn check_write(&self, offset: usize, size: usize) -> BufferResult<()> {
        if !self.is_accessible() {
            return Err(BufferError::Closed);
        }
        if self.read_only || !self.is_owned() {
            return Err(BufferError::ReadOnly);
        }
        let end = offset.checked_add(size);
        match end {
            Some(end) if offset >= self.roff && end <= self.cap => Ok(()),
            _ => Err(BufferError::write_bounds(offset, size, self.cap)),
        }
    }

    pub(crate) fn check_set(&self, offset: usize, size: usize) -> BufferResult<()> {
        if !self.is_accessible() {
            return Err(BufferError::Closed);
        }
        if self.read_only || !self.is_owned() {
            return Err(BufferError::ReadOnly);
        }
        let end = offset.checked_add(size);
        match end {
            Some(end) if end <= self.cap => Ok(()),
            _ => Err(BufferError::write_bounds(offset, size, self.cap)),
        }
    }

    // ---- raw access (callers have validated) ------------------------------

    #[inline]
    pub(crate) fn get_bytes(&self, offset: usize, dst: &mut [u8]) {
        debug_assert!(offset + dst.len() <= self.cap);
        unsafe {
            std::ptr::copy_nonoverlapping(self.ptr.add(offset), dst.as_mut_ptr(), dst.len());
        }
    }

    #[inline]
    pub(crate) fn set_bytes(&mut self, offset: usize, src: &[u8]) {
        debug_assert!(offset + src.len() <= self.cap);
        unsafe {
            std::ptr::copy_nonoverlapping(src.as_ptr(), self.ptr.add(offset), src.len());
        }
    }

    /// Full view as a slice; callers must hold the borrow for the duration
    #[inline]
    pub(crate) fn as_slice(&self) -> &[u8] {
        if self.cap == 0 {
            return &[];
        }
        unsafe { std::slice::from_raw_parts(self.ptr, self.cap) }
    }

    /// Readable view `[roff, woff)` as a slice
    #[inline]
    pub(crate) fn readable_slice(&self) -> &[u8] {
        &self.as_slice()[self.roff..self.woff]
    }

    /// Writable view `[woff, cap)` as a mutable slice
    #[inline]
    pub(crate) fn writable_slice(&mut self) -> &mut [u8] {
        if self.woff == self.cap {
            return &mut [];
        }
        unsafe { std::slice::from_raw_parts_mut(self.ptr.add(self.woff), self.cap - self.woff) }
    }

    /// Overlap-safe copy inside this view
    #[inline]
    pub(crate) fn copy_within(&mut self, from: usize, to: usize, len: usize) {
        debug_assert!(from + len <= self.cap && to + len <= self.cap);
        unsafe {
            std::ptr::copy(self.ptr.add(from), self.ptr.add(to), len);
        }
    }

    pub(crate) fn fill(&mut self, value: u8) -> BufferResult<()> {
        if !self.is_accessible() {
            return Err(BufferError::Closed);
        }
        if self.read_only || !self.is_owned() {
            return Err(BufferError::ReadOnly);
        }
        if self.cap > 0 {
            unsafe { std::ptr::write_bytes(self.ptr, value, self.cap) };
        }
        Ok(())
    }

    // ---- lifecycle --------------------------------------------------------

    /// Drop this handle's reference and force the closed state
    pub(crate) fn close(&mut self) {
        if let Some(arc) = self.arc.take() {
            arc.release();
        }
        self.ptr = std::ptr::NonNull::dangling().as_ptr();
        self.cap = 0;
        self.roff = 0;
        self.woff = 0;
        self.read_only = false;
        self.const_view = false;
    }

    /// Additional borrowed handle over the same view
    pub(crate) fn acquire(&self) -> BufferResult<Self> {
        let arc = self.arc.as_ref().ok_or(BufferError::Closed)?;
        arc.acquire()?;
        Ok(Self {
            ptr: self.ptr,
            cap: self.cap,
            roff: self.roff,
            woff: self.woff,
            read_only: self.read_only,
            const_view: self.const_view,
            backend: self.backend,
            arc: Some(Arc::clone(arc)),
            control: Arc::clone(&self.control),
            reclaim: Arc::clone(&self.reclaim),
        })
    }

    /// Read-only view over `[offset, offset + len)`, sharing the arc
    pub(crate) fn slice_at(&self, offset: usize, len: usize) -> BufferResult<Self> {
        let arc = self.arc.as_ref().ok_or(BufferError::Closed)?;
        let end = offset.checked_add(len);
        if !matches!(end, Some(end) if end <= self.cap) {
            return Err(BufferError::read_bounds(offset, len, self.woff, self.cap));
        }
        arc.acquire()?;
        Ok(Self {
            ptr: unsafe { self.ptr.add(offset) },
            cap: len,
            roff: 0,
            woff: len,
            read_only: true,
            const_view: self.const_view,
            backend: self.backend,
            arc: Some(Arc::clone(arc)),
            control: Arc::clone(&self.control),
            reclaim: Arc::clone(&self.reclaim),
        })
    }

    /// Split the view at `offset`; returns the front half, reshapes `self`
    /// into the back half
    ///
    /// Both halves end up with independent arcs nested over the old one, so
    /// either can close without invalidating the other.
    pub(crate) fn split_at(&mut self, offset: usize) -> BufferResult<Self> {
        if !self.is_accessible() {
            return Err(BufferError::Closed);
        }
        if offset > self.cap {
            return Err(BufferError::InvalidArgument(format!(
                "split offset {} is greater than the buffer capacity {}",
                offset, self.cap
            )));
        }
        if !self.is_owned() {
            return Err(BufferError::NotOwned(
                "cannot split a buffer that is borrowed".to_string(),
            ));
        }

        let parent = self.arc.take().expect("accessible buffer has an arc");
        let front_arc = SharedArc::nested(&parent)?;
        let back_arc = SharedArc::nested(&parent)?;
        // The handle's own count transfers to the two children.
        parent.release();

        let front = Self {
            ptr: self.ptr,
            cap: offset,
            roff: self.roff.min(offset),
            woff: self.woff.min(offset),
            read_only: self.read_only,
            const_view: self.const_view,
            backend: self.backend,
            arc: Some(front_arc),
            control: Arc::clone(&self.control),
            reclaim: Arc::clone(&self.reclaim),
        };

        self.ptr = unsafe { self.ptr.add(offset) };
        self.cap -= offset;
        self.roff = self.roff.max(offset) - offset;
        self.woff = self.woff.max(offset) - offset;
        self.arc = Some(back_arc);
        Ok(front)
    }

    pub(crate) fn compact(&mut self) -> BufferResult<()> {
        if !self.is_accessible() {
            return Err(BufferError::Closed);
        }
        if self.read_only {
            return Err(BufferError::ReadOnly);
        }
        if !self.is_owned() {
            return Err(BufferError::NotOwned(
                "buffer must be owned in order to compact".to_string(),
            ));
        }
        if self.roff == 0 {
            return Ok(());
        }
        let readable = self.readable_bytes();
        self.copy_within(self.roff, 0, readable);
        self.roff = 0;
        self.woff = readable;
        Ok(())
    }

    pub(crate) fn ensure_writable(
        &mut self,
        size: usize,
        minimum_growth: usize,
        allow_compaction: bool,
    ) -> BufferResult<()> {
        if !self.is_accessible() {
            return Err(BufferError::Closed);
        }
        if self.read_only {
            return Err(BufferError::ReadOnly);
        }
        if !self.is_owned() {
            return Err(BufferError::NotOwned(
                "only owned buffers can grow".to_string(),
            ));
        }
        if self.writable_bytes() >= size {
            return Ok(());
        }
        if allow_compaction && self.writable_bytes() + self.roff >= size {
            return self.compact();
        }

        let growth = (size - self.writable_bytes()).max(minimum_growth);
        let new_cap = self.cap.checked_add(growth).ok_or_else(|| {
            BufferError::InvalidArgument(format!(
                "growth by {} bytes overflows the buffer capacity",
                growth
            ))
        })?;
        let mut region = self.control.allocate_untethered(self.backend, new_cap)?;
        debug_assert!(region.len() >= new_cap);
        let new_ptr = region.base_ptr();
        unsafe {
            std::ptr::copy_nonoverlapping(self.ptr, new_ptr, self.cap);
        }
        log::debug!("grew buffer from {} to {} bytes", self.cap, new_cap);

        // Detach the old region: our reference goes away, but siblings from
        // earlier splits keep theirs until their own close.
        let old_arc = self.arc.take().expect("accessible buffer has an arc");
        old_arc.release();

        self.arc = Some(SharedArc::root(region, Arc::clone(&self.reclaim)));
        self.ptr = new_ptr;
        self.cap = new_cap;
        self.const_view = false;
        Ok(())
    }

    /// Detach the live state into a new leaf, leaving `self` closed
    ///
    /// The shared count is untouched; this is the ownership hand-off used by
    /// the send envelope.
    pub(crate) fn detach(&mut self) -> Self {
        let detached = Self {
            ptr: self.ptr,
            cap: self.cap,
            roff: self.roff,
            woff: self.woff,
            read_only: self.read_only,
            const_view: self.const_view,
            backend: self.backend,
            arc: self.arc.take(),
            control: Arc::clone(&self.control),
            reclaim: Arc::clone(&self.reclaim),
        };
        self.ptr = std::ptr::NonNull::dangling().as_ptr();
        self.cap = 0;
        self.roff = 0;
        self.woff = 0;
        self.read_only = false;
        self.const_view = false;
        detached
    }
}

impl Drop for LeafBuffer {
    fn drop(&mut self) {
        if let Some(arc) = self.arc.take() {
            arc.release();
        }
    }
}
