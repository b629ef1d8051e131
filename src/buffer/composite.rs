/*!
 * Composite Buffer
 *
 * An ordered sequence of leaf components presented behind the buffer
 * contract. Absolute offsets are translated to component-local offsets via
 * a running prefix sum; the composite's cursors are kept consistent with
 * per-component cursors at all times.
 */

use super::Buffer;
use crate::alloc::BufferAllocator;
use crate::core::{BufferError, BufferResult, Endianness};
use std::sync::Arc;

pub(crate) struct CompositeBuffer {
    pub(crate) parts: Vec<Buffer>,
    pub(crate) starts: Vec<usize>,
    pub(crate) cap: usize,
    pub(crate) roff: usize,
    pub(crate) woff: usize,
    pub(crate) read_only: bool,
    pub(crate) const_view: bool,
    pub(crate) accessible: bool,
    pub(crate) allocator: Arc<dyn BufferAllocator>,
}

impl CompositeBuffer {
    /// Validate and assemble a composite from flattened leaf parts
    ///
    /// Returns the composite and its byte order (the parts' uniform order,
    /// or native for an empty composite).
    pub(crate) fn assemble(
        allocator: Arc<dyn BufferAllocator>,
        parts: Vec<Buffer>,
    ) -> BufferResult<(Self, Endianness)> {
        for part in &parts {
            debug_assert!(!part.is_composite(), "parts must be flattened");
            if !part.is_accessible() {
                return Err(BufferError::Closed);
            }
        }

        let order = match parts.first() {
            Some(first) => first.order(),
            None => Endianness::native(),
        };
        if parts.iter().any(|p| p.order() != order) {
            return Err(BufferError::InvalidArgument(
                "composite components must all share one byte order".to_string(),
            ));
        }

        // Readable bytes must form a prefix and writable capacity a suffix;
        // interior holes would make the cursors ambiguous.
        let mut woff = 0;
        let mut saw_unfilled = false;
        for part in &parts {
            if saw_unfilled && part.writer_offset() > 0 {
                return Err(BufferError::InvalidArgument(
                    "composite components leave a gap in the written region".to_string(),
                ));
            }
            if part.writer_offset() < part.capacity() {
                saw_unfilled = true;
            }
            woff += part.writer_offset();
        }
        let mut roff = 0;
        let mut saw_unread = false;
        for part in &parts {
            if saw_unread && part.reader_offset() > 0 {
                return Err(BufferError::InvalidArgument(
                    "composite components leave a gap in the read region".to_string(),
                ));
            }
            if part.reader_offset() < part.capacity() {
                saw_unread = true;
            }
            roff += part.reader_offset();
        }

        let const_view = !parts.is_empty() && parts.iter().all(|p| p.is_const());
        let mut composite = Self {
            parts,
            starts: Vec::new(),
            cap: 0,
            roff,
            woff,
            read_only: false,
            const_view,
            accessible: true,
            allocator,
        };
        composite.rebuild_layout();
        composite.distribute_cursors();
        Ok((composite, order))
    }

    pub(crate) fn rebuild_layout(&mut self) {
        self.starts.clear();
        let mut total = 0;
        for part in &self.parts {
            self.starts.push(total);
            total += part.capacity();
        }
        self.cap = total;
    }

    /// Push the composite cursors down into each component
    pub(crate) fn distribute_cursors(&mut self) {
        for (index, part) in self.parts.iter_mut().enumerate() {
            let start = self.starts[index];
            let part_cap = part.capacity();
            let local_r = self.roff.saturating_sub(start).min(part_cap);
            let local_w = self.woff.saturating_sub(start).min(part_cap);
            part.set_cursors_unchecked(local_r, local_w);
        }
    }

    #[inline]
    pub(crate) fn is_accessible(&self) -> bool {
        self.accessible
    }

    /// Read-only is the disjunction over components plus the composite's own flag
    #[inline]
    pub(crate) fn read_only(&self) -> bool {
        self.read_only || self.parts.iter().any(|p| p.read_only())
    }

    #[inline]
    pub(crate) fn is_owned(&self) -> bool {
        self.accessible && self.parts.iter().all(|p| p.is_owned())
    }

    #[inline]
    pub(crate) fn borrows(&self) -> usize {
        self.parts.iter().map(|p| p.borrows()).max().unwrap_or(0)
    }

    #[inline]
    pub(crate) fn readable_bytes(&self) -> usize {
        self.woff - self.roff
    }

    #[inline]
    pub(crate) fn writable_bytes(&self) -> usize {
        self.cap - self.woff
    }

    // ---- access checks ----------------------------------------------------

    pub(crate) fn check_read(&self, offset: usize, size: usize) -> BufferResult<()> {
        if !self.accessible {
            return Err(BufferError::Closed);
        }
        match offset.checked_add(size) {
            Some(end) if end <= self.woff => Ok(()),
            _ => Err(BufferError::read_bounds(offset, size, self.woff, self.cap)),
        }
    }

    pub(crate) fn check_get(&self, offset: usize, size: usize) -> BufferResult<()> {
        if !self.accessible {
            return Err(BufferError::Closed);
        }
        match offset.checked_add(size) {
            Some(end) if end <= self.cap => Ok(()),
            _ => Err(BufferError::read_bounds(offset, size, self.woff, self.cap)),
        }
    }

    pub(crate) fn check_write(&self, offset: usize, size: usize) -> BufferResult<()> {
        if !self.accessible {
            return Err(BufferError::Closed);
        }
        if self.read_only() || !self.is_owned() {
            return Err(BufferError::ReadOnly);
        }
        match offset.checked_add(size) {
            Some(end) if offset >= self.roff && end <= self.cap => Ok(()),
            _ => Err(BufferError::write_bounds(offset, size, self.cap)),
        }
    }

    pub(crate) fn check_set(&self, offset: usize, size: usize) -> BufferResult<()> {
        if !self.accessible {
            return Err(BufferError::Closed);
        }
        if self.read_only() || !self.is_owned() {
            return Err(BufferError::ReadOnly);
        }
        match offset.checked_add(size) {
            Some(end) if end <= self.cap => Ok(()),
            _ => Err(BufferError::write_bounds(offset, size, self.cap)),
        }
    }

    // ---- raw access (callers have validated) ------------------------------

    /// Index of the part containing the absolute offset
    fn part_index(&self, offset: usize) -> usize {
        debug_assert!(offset < self.cap);
        // partition_point returns the first start beyond the offset
        self.starts.partition_point(|&start| start <= offset) - 1
    }

    pub(crate) fn get_bytes(&self, offset: usize, dst: &mut [u8]) {
        if dst.is_empty() {
            return;
        }
        let mut index = self.part_index(offset);
        let mut absolute = offset;
        let mut copied = 0;
        while copied < dst.len() {
            let part = &self.parts[index];
            let local = absolute - self.starts[index];
            let chunk = (part.capacity() - local).min(dst.len() - copied);
            part.raw_get(local, &mut dst[copied..copied + chunk]);
            copied += chunk;
            absolute += chunk;
            index += 1;
        }
    }

    pub(crate) fn set_bytes(&mut self, offset: usize, src: &[u8]) {
        if src.is_empty() {
            return;
        }
        let mut index = self.part_index(offset);
        let mut absolute = offset;
        let mut copied = 0;
        while copied < src.len() {
            let start = self.starts[index];
            let part = &mut self.parts[index];
            let local = absolute - start;
            let chunk = (part.capacity() - local).min(src.len() - copied);
            part.raw_set(local, &src[copied..copied + chunk]);
            copied += chunk;
            absolute += chunk;
            index += 1;
        }
    }

    pub(crate) fn fill(&mut self, value: u8) -> BufferResult<()> {
        if !self.accessible {
            return Err(BufferError::Closed);
        }
        if self.read_only() || !self.is_owned() {
            return Err(BufferError::ReadOnly);
        }
        for part in &mut self.parts {
            part.fill(value)?;
        }
        Ok(())
    }

    // ---- lifecycle --------------------------------------------------------

    pub(crate) fn close(&mut self) {
        // Dropping each part releases its shared count.
        self.parts.clear();
        self.starts.clear();
        self.cap = 0;
        self.roff = 0;
        self.woff = 0;
        self.read_only = false;
        self.const_view = false;
        self.accessible = false;
    }

    pub(crate) fn acquire(&self) -> BufferResult<Self> {
        if !self.accessible {
            return Err(BufferError::Closed);
        }
        let mut acquired = Vec::with_capacity(self.parts.len());
        for part in &self.parts {
            acquired.push(part.acquire()?);
        }
        Ok(Self {
            parts: acquired,
            starts: self.starts.clone(),
            cap: self.cap,
            roff: self.roff,
            woff: self.woff,
            read_only: self.read_only,
            const_view: self.const_view,
            accessible: true,
            allocator: Arc::clone(&self.allocator),
        })
    }

    pub(crate) fn slice_at(&self, offset: usize, len: usize) -> BufferResult<Self> {
        if !self.accessible {
            return Err(BufferError::Closed);
        }
        match offset.checked_add(len) {
            Some(end) if end <= self.cap => {}
            _ => return Err(BufferError::read_bounds(offset, len, self.woff, self.cap)),
        }

        let mut slices = Vec::new();
        let mut remaining = len;
        let mut absolute = offset;
        while remaining > 0 {
            let index = self.part_index(absolute);
            let local = absolute - self.starts[index];
            let part = &self.parts[index];
            let chunk = (part.capacity() - local).min(remaining);
            slices.push(part.slice_at(local, chunk)?);
            remaining -= chunk;
            absolute += chunk;
        }

        let mut composite = Self {
            parts: slices,
            starts: Vec::new(),
            cap: 0,
            roff: 0,
            woff: len,
            read_only: true,
            const_view: self.const_view,
            accessible: true,
            allocator: Arc::clone(&self.allocator),
        };
        composite.rebuild_layout();
        composite.distribute_cursors();
        Ok(composite)
    }

    pub(crate) fn split_at(&mut self, offset: usize) -> BufferResult<Self> {
        if !self.accessible {
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

        // Whole parts in front of the offset move; a part straddling the
        // offset is itself split.
        let mut boundary = 0;
        while boundary < self.parts.len() && self.starts[boundary] + self.parts[boundary].capacity() <= offset
        {
            boundary += 1;
        }
        let mut front_parts: Vec<Buffer> = self.parts.drain(0..boundary).collect();
        let local = offset - front_parts.iter().map(|p| p.capacity()).sum::<usize>();
        if local > 0 {
            let piece = self.parts[0].split_at(local)?;
            front_parts.push(piece);
        }

        let mut front = Self {
            parts: front_parts,
            starts: Vec::new(),
            cap: 0,
            roff: self.roff.min(offset),
            woff: self.woff.min(offset),
            read_only: self.read_only,
            const_view: self.const_view,
            accessible: true,
            allocator: Arc::clone(&self.allocator),
        };
        front.rebuild_layout();
        front.distribute_cursors();

        self.roff = self.roff.max(offset) - offset;
        self.woff = self.woff.max(offset) - offset;
        self.rebuild_layout();
        self.distribute_cursors();
        Ok(front)
    }

    pub(crate) fn compact(&mut self) -> BufferResult<()> {
        if !self.accessible {
            return Err(BufferError::Closed);
        }
        if self.read_only() {
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
        let mut moved = 0;
        let mut chunk = [0u8; 256];
        while moved < readable {
            let len = (readable - moved).min(chunk.len());
            self.get_bytes(self.roff + moved, &mut chunk[..len]);
            self.set_bytes(moved, &chunk[..len]);
            moved += len;
        }
        self.roff = 0;
        self.woff = readable;
        self.distribute_cursors();
        Ok(())
    }

    /// Growth appends a component instead of re-allocating contiguous memory
    pub(crate) fn ensure_writable(
        &mut self,
        order: Endianness,
        size: usize,
        minimum_growth: usize,
        allow_compaction: bool,
    ) -> BufferResult<()> {
        if !self.accessible {
            return Err(BufferError::Closed);
        }
        if self.read_only() {
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
        let mut part = self.allocator.allocate(growth)?;
        part.set_order(order)?;
        self.parts.push(part);
        self.rebuild_layout();
        self.distribute_cursors();
        Ok(())
    }

    pub(crate) fn make_read_only(&mut self) -> BufferResult<()> {
        if !self.accessible {
            return Err(BufferError::Closed);
        }
        for part in &mut self.parts {
            part.make_read_only()?;
        }
        self.read_only = true;
        Ok(())
    }

    pub(crate) fn set_order(&mut self, order: Endianness) -> BufferResult<()> {
        if !self.accessible {
            return Err(BufferError::Closed);
        }
        for part in &mut self.parts {
            part.set_order(order)?;
        }
        Ok(())
    }

    /// Detach the live state into a new composite, leaving `self` closed
    pub(crate) fn detach(&mut self) -> Self {
        let detached = Self {
            parts: std::mem::take(&mut self.parts),
            starts: std::mem::take(&mut self.starts),
            cap: self.cap,
            roff: self.roff,
            woff: self.woff,
            read_only: self.read_only,
            const_view: self.const_view,
            accessible: true,
            allocator: Arc::clone(&self.allocator),
        };
        self.cap = 0;
        self.roff = 0;
        self.woff = 0;
        self.read_only = false;
        self.const_view = false;
        self.accessible = false;
        detached
    }
}
