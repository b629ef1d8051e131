/*!
 * Buffer Module
 *
 * The buffer lifecycle and ownership engine.
 *
 * A [`Buffer`] is a bounded byte region with independent read and write
 * cursors, a byte order for multi-byte accessors, and a shared-count
 * reference to its backing memory. The same contract is served by two
 * shapes selected at construction: a leaf over one contiguous region
 * (heap, direct, or segment backend) and a composite concatenating leaf
 * components end-to-end.
 *
 * ## Ownership discipline
 *
 * Writable state is never shared. Acquiring or slicing a buffer adds a
 * borrower and demotes every handle to read-only behavior until the extra
 * references close; shape-changing operations (split, send, grow, compact)
 * demand exclusive ownership outright. Cross-thread hand-off goes through
 * the one-shot [`Envelope`].
 */

pub(crate) mod composite;
pub(crate) mod leaf;

mod component;
mod cursor;
mod holder;
mod send;

pub use component::{ReadableComponent, WritableComponent};
pub use cursor::{ByteCursor, ReverseByteCursor};
pub use holder::BufferRef;
pub use send::Envelope;

use crate::alloc::BufferAllocator;
use crate::core::{BufferError, BufferKind, BufferResult, Endianness};
use crate::mem::traits::AllocatorControl;
use crate::mem::RawRegion;
use crate::rc::Reclaimer;
use byteorder::{BigEndian, ByteOrder, LittleEndian};
use composite::CompositeBuffer;
use cursor::Segment;
use leaf::LeafBuffer;
use std::sync::Arc;

pub(crate) enum Rep {
    Leaf(LeafBuffer),
    Composite(CompositeBuffer),
}

/// A bounded byte region with read and write cursors
///
/// See the [module documentation](self) for the ownership discipline.
pub struct Buffer {
    pub(crate) order: Endianness,
    pub(crate) rep: Rep,
}

impl Buffer {
    /// Enroll a raw region under a fresh reclamation and wrap it
    ///
    /// The buffer starts writable, owned, and accessible, with both cursors
    /// at zero and native byte order.
    pub fn from_region(
        region: RawRegion,
        control: Arc<dyn AllocatorControl>,
        reclaim: Arc<dyn Reclaimer<RawRegion>>,
    ) -> Buffer {
        let cap = region.len();
        Self::from_view(region, cap, control, reclaim)
    }

    /// Like [`from_region`](Buffer::from_region), with a view capacity
    /// smaller than the region (pooled regions are size-classed)
    pub(crate) fn from_view(
        region: RawRegion,
        view_cap: usize,
        control: Arc<dyn AllocatorControl>,
        reclaim: Arc<dyn Reclaimer<RawRegion>>,
    ) -> Buffer {
        Buffer {
            order: Endianness::native(),
            rep: Rep::Leaf(LeafBuffer::from_region(region, view_cap, control, reclaim)),
        }
    }

    pub(crate) fn from_leaf(leaf: LeafBuffer, order: Endianness) -> Buffer {
        Buffer {
            order,
            rep: Rep::Leaf(leaf),
        }
    }

    /// Concatenate buffers into a composite presenting the same contract
    ///
    /// Takes ownership of the parts. Nested composites are flattened; all
    /// components must share one byte order and be accessible, and their
    /// readable bytes must form a prefix of the concatenation. An empty
    /// parts list produces a legal zero-capacity composite.
    pub fn compose(
        allocator: Arc<dyn BufferAllocator>,
        parts: Vec<Buffer>,
    ) -> BufferResult<Buffer> {
        let mut flattened = Vec::with_capacity(parts.len());
        for mut part in parts {
            if part.is_composite() {
                flattened.extend(part.take_parts()?);
            } else {
                flattened.push(part);
            }
        }
        let (composite, order) = CompositeBuffer::assemble(allocator, flattened)?;
        Ok(Buffer {
            order,
            rep: Rep::Composite(composite),
        })
    }

    // ---- offsets & capacity -----------------------------------------------

    /// Total capacity in bytes; fixed except through explicit growth
    #[inline]
    pub fn capacity(&self) -> usize {
        match &self.rep {
            Rep::Leaf(leaf) => leaf.cap,
            Rep::Composite(composite) => composite.cap,
        }
    }

    #[inline]
    pub fn reader_offset(&self) -> usize {
        match &self.rep {
            Rep::Leaf(leaf) => leaf.roff,
            Rep::Composite(composite) => composite.roff,
        }
    }

    #[inline]
    pub fn writer_offset(&self) -> usize {
        match &self.rep {
            Rep::Leaf(leaf) => leaf.woff,
            Rep::Composite(composite) => composite.woff,
        }
    }

    /// Move the reader offset; must stay within `[0, writer_offset]`
    pub fn set_reader_offset(&mut self, offset: usize) -> BufferResult<()> {
        self.check_read(offset, 0)?;
        match &mut self.rep {
            Rep::Leaf(leaf) => leaf.roff = offset,
            Rep::Composite(composite) => {
                composite.roff = offset;
                composite.distribute_cursors();
            }
        }
        Ok(())
    }

    /// Move the writer offset; must stay within `[reader_offset, capacity]`
    pub fn set_writer_offset(&mut self, offset: usize) -> BufferResult<()> {
        self.check_write(offset, 0)?;
        match &mut self.rep {
            Rep::Leaf(leaf) => leaf.woff = offset,
            Rep::Composite(composite) => {
                composite.woff = offset;
                composite.distribute_cursors();
            }
        }
        Ok(())
    }

    /// Bytes available for reading: `writer_offset - reader_offset`
    #[inline]
    pub fn readable_bytes(&self) -> usize {
        self.writer_offset() - self.reader_offset()
    }

    /// Bytes available for writing: `capacity - writer_offset`
    #[inline]
    pub fn writable_bytes(&self) -> usize {
        self.capacity() - self.writer_offset()
    }

    /// The byte order used by multi-byte accessors
    #[inline]
    pub fn order(&self) -> Endianness {
        self.order
    }

    /// Change the byte order; affects multi-byte accessors only
    pub fn set_order(&mut self, order: Endianness) -> BufferResult<()> {
        match &mut self.rep {
            Rep::Leaf(leaf) => {
                if !leaf.is_accessible() {
                    return Err(BufferError::Closed);
                }
            }
            Rep::Composite(composite) => composite.set_order(order)?,
        }
        self.order = order;
        Ok(())
    }

    // ---- state queries ----------------------------------------------------

    /// Whether any data-bearing operation may run on this handle
    #[inline]
    pub fn is_accessible(&self) -> bool {
        match &self.rep {
            Rep::Leaf(leaf) => leaf.is_accessible(),
            Rep::Composite(composite) => composite.is_accessible(),
        }
    }

    /// Whether this handle holds the only reference to its memory
    #[inline]
    pub fn is_owned(&self) -> bool {
        match &self.rep {
            Rep::Leaf(leaf) => leaf.is_owned(),
            Rep::Composite(composite) => composite.is_owned(),
        }
    }

    /// Number of additional references beyond this handle
    #[inline]
    pub fn borrows(&self) -> usize {
        match &self.rep {
            Rep::Leaf(leaf) => leaf.borrows(),
            Rep::Composite(composite) => composite.borrows(),
        }
    }

    /// Whether mutation is rejected on this handle
    #[inline]
    pub fn read_only(&self) -> bool {
        match &self.rep {
            Rep::Leaf(leaf) => leaf.read_only,
            Rep::Composite(composite) => composite.read_only(),
        }
    }

    /// Whether this handle came from a const-buffer supplier
    #[inline]
    pub fn is_const(&self) -> bool {
        match &self.rep {
            Rep::Leaf(leaf) => leaf.const_view,
            Rep::Composite(composite) => composite.const_view,
        }
    }

    /// The logical kind of this buffer
    #[inline]
    pub fn kind(&self) -> BufferKind {
        match &self.rep {
            Rep::Leaf(leaf) => leaf.backend.into(),
            Rep::Composite(_) => BufferKind::Composite,
        }
    }

    // ---- access checks and raw movement -----------------------------------

    fn check_read(&self, offset: usize, size: usize) -> BufferResult<()> {
        match &self.rep {
            Rep::Leaf(leaf) => leaf.check_read(offset, size),
            Rep::Composite(composite) => composite.check_read(offset, size),
        }
    }

    fn check_get(&self, offset: usize, size: usize) -> BufferResult<()> {
        match &self.rep {
            Rep::Leaf(leaf) => leaf.check_get(offset, size),
            Rep::Composite(composite) => composite.check_get(offset, size),
        }
    }

    fn check_write(&self, offset: usize, size: usize) -> BufferResult<()> {
        match &self.rep {
            Rep::Leaf(leaf) => leaf.check_write(offset, size),
            Rep::Composite(composite) => composite.check_write(offset, size),
        }
    }

    fn check_set(&self, offset: usize, size: usize) -> BufferResult<()> {
        match &self.rep {
            Rep::Leaf(leaf) => leaf.check_set(offset, size),
            Rep::Composite(composite) => composite.check_set(offset, size),
        }
    }

    fn load(&self, offset: usize, dst: &mut [u8]) {
        match &self.rep {
            Rep::Leaf(leaf) => leaf.get_bytes(offset, dst),
            Rep::Composite(composite) => composite.get_bytes(offset, dst),
        }
    }

    fn store(&mut self, offset: usize, src: &[u8]) {
        match &mut self.rep {
            Rep::Leaf(leaf) => leaf.set_bytes(offset, src),
            Rep::Composite(composite) => composite.set_bytes(offset, src),
        }
    }

    fn advance_reader(&mut self, n: usize) {
        match &mut self.rep {
            Rep::Leaf(leaf) => leaf.roff += n,
            Rep::Composite(composite) => {
                composite.roff += n;
                composite.distribute_cursors();
            }
        }
    }

    fn advance_writer(&mut self, n: usize) {
        match &mut self.rep {
            Rep::Leaf(leaf) => leaf.woff += n,
            Rep::Composite(composite) => {
                composite.woff += n;
                composite.distribute_cursors();
            }
        }
    }

    fn decode_u24(&self, offset: usize) -> u32 {
        let mut bytes = [0u8; 3];
        self.load(offset, &mut bytes);
        match self.order {
            Endianness::Big => {
                (bytes[0] as u32) << 16 | (bytes[1] as u32) << 8 | bytes[2] as u32
            }
            Endianness::Little => {
                bytes[0] as u32 | (bytes[1] as u32) << 8 | (bytes[2] as u32) << 16
            }
        }
    }

    fn encode_u24(&self, value: u32) -> [u8; 3] {
        let value = value & 0x00FF_FFFF;
        match self.order {
            Endianness::Big => [(value >> 16) as u8, (value >> 8) as u8, value as u8],
            Endianness::Little => [value as u8, (value >> 8) as u8, (value >> 16) as u8],
        }
    }

    fn decode_u32(&self, offset: usize) -> u32 {
        let mut bytes = [0u8; 4];
        self.load(offset, &mut bytes);
        match self.order {
            Endianness::Big => BigEndian::read_u32(&bytes),
            Endianness::Little => LittleEndian::read_u32(&bytes),
        }
    }
}

macro_rules! primitive_accessors {
    ($ty:ty, $width:expr, $read:ident, $get:ident, $write:ident, $set:ident, $bo_read:ident, $bo_write:ident) => {
        impl Buffer {
            #[doc = concat!("Read a `", stringify!($ty), "` at the reader offset, advancing it")]
            pub fn $read(&mut self) -> BufferResult<$ty> {
                let offset = self.reader_offset();
                self.check_read(offset, $width)?;
                let mut bytes = [0u8; $width];
                self.load(offset, &mut bytes);
                let value = match self.order {
                    Endianness::Big => BigEndian::$bo_read(&bytes),
                    Endianness::Little => LittleEndian::$bo_read(&bytes),
                };
                self.advance_reader($width);
                Ok(value)
            }

            #[doc = concat!("Get a `", stringify!($ty), "` at an absolute offset without moving cursors")]
            pub fn $get(&self, offset: usize) -> BufferResult<$ty> {
                self.check_get(offset, $width)?;
                let mut bytes = [0u8; $width];
                self.load(offset, &mut bytes);
                Ok(match self.order {
                    Endianness::Big => BigEndian::$bo_read(&bytes),
                    Endianness::Little => LittleEndian::$bo_read(&bytes),
                })
            }

            #[doc = concat!("Write a `", stringify!($ty), "` at the writer offset, advancing it")]
            pub fn $write(&mut self, value: $ty) -> BufferResult<()> {
                let offset = self.writer_offset();
                self.check_write(offset, $width)?;
                let mut bytes = [0u8; $width];
                match self.order {
                    Endianness::Big => BigEndian::$bo_write(&mut bytes, value),
                    Endianness::Little => LittleEndian::$bo_write(&mut bytes, value),
                }
                self.store(offset, &bytes);
                self.advance_writer($width);
                Ok(())
            }

            #[doc = concat!("Set a `", stringify!($ty), "` at an absolute offset without moving cursors")]
            pub fn $set(&mut self, offset: usize, value: $ty) -> BufferResult<()> {
                self.check_set(offset, $width)?;
                let mut bytes = [0u8; $width];
                match self.order {
                    Endianness::Big => BigEndian::$bo_write(&mut bytes, value),
                    Endianness::Little => LittleEndian::$bo_write(&mut bytes, value),
                }
                self.store(offset, &bytes);
                Ok(())
            }
        }
    };
}

primitive_accessors!(i16, 2, read_i16, get_i16, write_i16, set_i16, read_i16, write_i16);
primitive_accessors!(u16, 2, read_u16, get_u16, write_u16, set_u16, read_u16, write_u16);
primitive_accessors!(i32, 4, read_i32, get_i32, write_i32, set_i32, read_i32, write_i32);
primitive_accessors!(u32, 4, read_u32, get_u32, write_u32, set_u32, read_u32, write_u32);
primitive_accessors!(i64, 8, read_i64, get_i64, write_i64, set_i64, read_i64, write_i64);
primitive_accessors!(u64, 8, read_u64, get_u64, write_u64, set_u64, read_u64, write_u64);
primitive_accessors!(f32, 4, read_f32, get_f32, write_f32, set_f32, read_f32, write_f32);
primitive_accessors!(f64, 8, read_f64, get_f64, write_f64, set_f64, read_f64, write_f64);

impl Buffer {
    // ---- single bytes -----------------------------------------------------

    /// Read the byte at the reader offset, advancing it
    pub fn read_u8(&mut self) -> BufferResult<u8> {
        let offset = self.reader_offset();
        self.check_read(offset, 1)?;
        let mut byte = [0u8; 1];
        self.load(offset, &mut byte);
        self.advance_reader(1);
        Ok(byte[0])
    }

    pub fn read_i8(&mut self) -> BufferResult<i8> {
        self.read_u8().map(|b| b as i8)
    }

    /// Get the byte at an absolute offset without moving cursors
    pub fn get_u8(&self, offset: usize) -> BufferResult<u8> {
        self.check_get(offset, 1)?;
        let mut byte = [0u8; 1];
        self.load(offset, &mut byte);
        Ok(byte[0])
    }

    pub fn get_i8(&self, offset: usize) -> BufferResult<i8> {
        self.get_u8(offset).map(|b| b as i8)
    }

    /// Write a byte at the writer offset, advancing it
    pub fn write_u8(&mut self, value: u8) -> BufferResult<()> {
        let offset = self.writer_offset();
        self.check_write(offset, 1)?;
        self.store(offset, &[value]);
        self.advance_writer(1);
        Ok(())
    }

    pub fn write_i8(&mut self, value: i8) -> BufferResult<()> {
        self.write_u8(value as u8)
    }

    /// Set a byte at an absolute offset without moving cursors
    pub fn set_u8(&mut self, offset: usize, value: u8) -> BufferResult<()> {
        self.check_set(offset, 1)?;
        self.store(offset, &[value]);
        Ok(())
    }

    pub fn set_i8(&mut self, offset: usize, value: i8) -> BufferResult<()> {
        self.set_u8(offset, value as u8)
    }

    // ---- 24-bit medium ----------------------------------------------------

    /// Read an unsigned 24-bit medium, advancing the reader offset
    pub fn read_u24(&mut self) -> BufferResult<u32> {
        let offset = self.reader_offset();
        self.check_read(offset, 3)?;
        let value = self.decode_u24(offset);
        self.advance_reader(3);
        Ok(value)
    }

    /// Read a signed 24-bit medium, sign-extending from bit 23
    pub fn read_i24(&mut self) -> BufferResult<i32> {
        self.read_u24().map(sign_extend_24)
    }

    pub fn get_u24(&self, offset: usize) -> BufferResult<u32> {
        self.check_get(offset, 3)?;
        Ok(self.decode_u24(offset))
    }

    pub fn get_i24(&self, offset: usize) -> BufferResult<i32> {
        self.get_u24(offset).map(sign_extend_24)
    }

    /// Write the low 24 bits of the value, advancing the writer offset
    pub fn write_u24(&mut self, value: u32) -> BufferResult<()> {
        let offset = self.writer_offset();
        self.check_write(offset, 3)?;
        let bytes = self.encode_u24(value);
        self.store(offset, &bytes);
        self.advance_writer(3);
        Ok(())
    }

    pub fn write_i24(&mut self, value: i32) -> BufferResult<()> {
        self.write_u24(value as u32)
    }

    pub fn set_u24(&mut self, offset: usize, value: u32) -> BufferResult<()> {
        self.check_set(offset, 3)?;
        let bytes = self.encode_u24(value);
        self.store(offset, &bytes);
        Ok(())
    }

    pub fn set_i24(&mut self, offset: usize, value: i32) -> BufferResult<()> {
        self.set_u24(offset, value as u32)
    }

    // ---- char -------------------------------------------------------------

    /// Read a 4-byte Unicode scalar, advancing the reader offset
    ///
    /// Fails with `InvalidArgument` if the bytes do not form a scalar value;
    /// the cursor does not move on failure.
    pub fn read_char(&mut self) -> BufferResult<char> {
        let offset = self.reader_offset();
        self.check_read(offset, 4)?;
        let code = self.decode_u32(offset);
        let ch = decode_char(code)?;
        self.advance_reader(4);
        Ok(ch)
    }

    pub fn get_char(&self, offset: usize) -> BufferResult<char> {
        self.check_get(offset, 4)?;
        decode_char(self.decode_u32(offset))
    }

    pub fn write_char(&mut self, value: char) -> BufferResult<()> {
        self.write_u32(value as u32)
    }

    pub fn set_char(&mut self, offset: usize, value: char) -> BufferResult<()> {
        self.set_u32(offset, value as u32)
    }

    // ---- bulk -------------------------------------------------------------

    /// Read `dst.len()` bytes into the slice, advancing the reader offset
    pub fn read_slice(&mut self, dst: &mut [u8]) -> BufferResult<()> {
        let offset = self.reader_offset();
        self.check_read(offset, dst.len())?;
        self.load(offset, dst);
        self.advance_reader(dst.len());
        Ok(())
    }

    /// Write the slice, advancing the writer offset
    pub fn write_slice(&mut self, src: &[u8]) -> BufferResult<()> {
        let offset = self.writer_offset();
        self.check_write(offset, src.len())?;
        self.store(offset, src);
        self.advance_writer(src.len());
        Ok(())
    }

    /// Write the byte over the whole capacity without moving cursors
    pub fn fill(&mut self, value: u8) -> BufferResult<()> {
        match &mut self.rep {
            Rep::Leaf(leaf) => leaf.fill(value),
            Rep::Composite(composite) => composite.fill(value),
        }
    }

    /// Copy out of the buffer without moving cursors
    pub fn copy_into_slice(&self, src_pos: usize, dst: &mut [u8]) -> BufferResult<()> {
        self.check_get(src_pos, dst.len())?;
        self.load(src_pos, dst);
        Ok(())
    }

    /// Copy between buffers without moving cursors
    ///
    /// Works across backends and shapes; the leaf-to-leaf fast path is a raw
    /// move, everything else falls back to a reverse-cursor byte walk.
    pub fn copy_into_buffer(
        &self,
        src_pos: usize,
        dest: &mut Buffer,
        dest_pos: usize,
        length: usize,
    ) -> BufferResult<()> {
        self.check_get(src_pos, length)?;
        dest.check_set(dest_pos, length)?;
        if length == 0 {
            return Ok(());
        }
        if let (Rep::Leaf(src), Rep::Leaf(dst)) = (&self.rep, &mut dest.rep) {
            unsafe {
                std::ptr::copy(src.ptr.add(src_pos), dst.ptr.add(dest_pos), length);
            }
            return Ok(());
        }
        self.copy_via_reverse_cursor(src_pos, dest, dest_pos, length)
    }

    /// Slow-path copy walking the source backward
    ///
    /// Walking from the end keeps overlapping forward copies intact.
    fn copy_via_reverse_cursor(
        &self,
        src_pos: usize,
        dest: &mut Buffer,
        dest_pos: usize,
        length: usize,
    ) -> BufferResult<()> {
        let mut cursor = self.open_reverse_cursor_at(src_pos + length - 1, length)?;
        let mut remaining = length;
        while cursor.read_u8() {
            remaining -= 1;
            dest.store(dest_pos + remaining, &[cursor.last_u8()]);
        }
        debug_assert_eq!(remaining, 0);
        Ok(())
    }

    /// Drain the source's readable bytes into this buffer
    ///
    /// Advances both writer and source reader offsets. Byte orders play no
    /// part in the copy.
    pub fn write_bytes(&mut self, source: &mut Buffer) -> BufferResult<()> {
        let length = source.readable_bytes();
        let offset = self.writer_offset();
        self.check_write(offset, length)?;
        let src_pos = source.reader_offset();
        source.check_read(src_pos, length)?;
        source.copy_into_buffer(src_pos, self, offset, length)?;
        source.advance_reader(length);
        self.advance_writer(length);
        Ok(())
    }

    // ---- cursors ----------------------------------------------------------

    /// Forward cursor over the readable region
    pub fn open_cursor(&self) -> BufferResult<ByteCursor<'_>> {
        self.open_cursor_at(self.reader_offset(), self.readable_bytes())
    }

    /// Forward cursor over an absolute range
    pub fn open_cursor_at(&self, from: usize, len: usize) -> BufferResult<ByteCursor<'_>> {
        if !self.is_accessible() {
            return Err(BufferError::Closed);
        }
        match from.checked_add(len) {
            Some(end) if end <= self.capacity() => {}
            _ => {
                return Err(BufferError::read_bounds(
                    from,
                    len,
                    self.writer_offset(),
                    self.capacity(),
                ))
            }
        }
        Ok(ByteCursor::new(self.cursor_segments(), from, len))
    }

    /// Reverse cursor over the readable region, walking downward
    pub fn open_reverse_cursor(&self) -> BufferResult<ReverseByteCursor<'_>> {
        let readable = self.readable_bytes();
        if readable == 0 {
            if !self.is_accessible() {
                return Err(BufferError::Closed);
            }
            return Ok(ReverseByteCursor::empty(self.reader_offset()));
        }
        self.open_reverse_cursor_at(self.writer_offset() - 1, readable)
    }

    /// Reverse cursor from an absolute offset, walking downward
    pub fn open_reverse_cursor_at(
        &self,
        from: usize,
        len: usize,
    ) -> BufferResult<ReverseByteCursor<'_>> {
        if !self.is_accessible() {
            return Err(BufferError::Closed);
        }
        if from >= self.capacity() || len > from + 1 {
            return Err(BufferError::read_bounds(
                from,
                len,
                self.writer_offset(),
                self.capacity(),
            ));
        }
        Ok(ReverseByteCursor::new(self.cursor_segments(), from, len))
    }

    fn cursor_segments(&self) -> Vec<Segment<'_>> {
        match &self.rep {
            Rep::Leaf(leaf) => vec![Segment {
                start: 0,
                data: leaf.as_slice(),
            }],
            Rep::Composite(composite) => composite
                .parts
                .iter()
                .enumerate()
                .map(|(index, part)| Segment {
                    start: composite.starts[index],
                    data: part.raw_slice(),
                })
                .collect(),
        }
    }

    // ---- growth and shape -------------------------------------------------

    /// Make room for `size` writable bytes, growing by at least the current
    /// capacity when new memory is needed
    pub fn ensure_writable(&mut self, size: usize) -> BufferResult<()> {
        let minimum_growth = self.capacity();
        self.ensure_writable_with(size, minimum_growth, true)
    }

    /// Make room for `size` writable bytes
    ///
    /// Prefers doing nothing, then compaction (if allowed), then requests
    /// `max(size - writable_bytes, minimum_growth)` additional bytes from
    /// the originating allocator. A leaf installs a fresh contiguous region;
    /// a composite appends a new component. Requires an owned, writable
    /// buffer.
    pub fn ensure_writable_with(
        &mut self,
        size: usize,
        minimum_growth: usize,
        allow_compaction: bool,
    ) -> BufferResult<()> {
        let order = self.order;
        match &mut self.rep {
            Rep::Leaf(leaf) => leaf.ensure_writable(size, minimum_growth, allow_compaction),
            Rep::Composite(composite) => {
                composite.ensure_writable(order, size, minimum_growth, allow_compaction)
            }
        }
    }

    /// Move the readable bytes to the front of the buffer
    pub fn compact(&mut self) -> BufferResult<()> {
        match &mut self.rep {
            Rep::Leaf(leaf) => leaf.compact(),
            Rep::Composite(composite) => composite.compact(),
        }
    }

    /// Split at the writer offset
    pub fn split(&mut self) -> BufferResult<Buffer> {
        self.split_at(self.writer_offset())
    }

    /// Split into two independently owned buffers over disjoint regions
    ///
    /// Returns the front half covering `[0, offset)`; `self` is reshaped to
    /// cover `[offset, capacity)`. Cursors are clamped into each half;
    /// read-only and const-view carry over to both.
    pub fn split_at(&mut self, offset: usize) -> BufferResult<Buffer> {
        let order = self.order;
        match &mut self.rep {
            Rep::Leaf(leaf) => Ok(Buffer {
                order,
                rep: Rep::Leaf(leaf.split_at(offset)?),
            }),
            Rep::Composite(composite) => Ok(Buffer {
                order,
                rep: Rep::Composite(composite.split_at(offset)?),
            }),
        }
    }

    /// Read-only view of the readable region
    pub fn slice(&self) -> BufferResult<Buffer> {
        self.slice_at(self.reader_offset(), self.readable_bytes())
    }

    /// Read-only view over `[offset, offset + len)`, sharing memory
    ///
    /// The slice has its own cursors covering the whole range and adds one
    /// borrower to this buffer; it is read-only regardless of the parent.
    pub fn slice_at(&self, offset: usize, len: usize) -> BufferResult<Buffer> {
        let order = self.order;
        match &self.rep {
            Rep::Leaf(leaf) => Ok(Buffer {
                order,
                rep: Rep::Leaf(leaf.slice_at(offset, len)?),
            }),
            Rep::Composite(composite) => Ok(Buffer {
                order,
                rep: Rep::Composite(composite.slice_at(offset, len)?),
            }),
        }
    }

    /// Permanently reject mutation through this handle
    ///
    /// Idempotent; there is no way back on the same buffer instance.
    pub fn make_read_only(&mut self) -> BufferResult<()> {
        match &mut self.rep {
            Rep::Leaf(leaf) => {
                if !leaf.is_accessible() {
                    return Err(BufferError::Closed);
                }
                leaf.read_only = true;
                Ok(())
            }
            Rep::Composite(composite) => composite.make_read_only(),
        }
    }

    // ---- lifecycle --------------------------------------------------------

    /// Additional reference to the same memory
    ///
    /// Both handles become borrowed: mutation is rejected on either until
    /// the extra reference closes. The new handle starts from this handle's
    /// current state.
    pub fn acquire(&self) -> BufferResult<Buffer> {
        let order = self.order;
        match &self.rep {
            Rep::Leaf(leaf) => Ok(Buffer {
                order,
                rep: Rep::Leaf(leaf.acquire()?),
            }),
            Rep::Composite(composite) => Ok(Buffer {
                order,
                rep: Rep::Composite(composite.acquire()?),
            }),
        }
    }

    /// Release this handle's reference
    ///
    /// When the last reference goes, the backing region is reclaimed. The
    /// handle becomes permanently inaccessible; closing again is a no-op.
    /// Dropping a buffer closes it.
    pub fn close(&mut self) {
        match &mut self.rep {
            Rep::Leaf(leaf) => leaf.close(),
            Rep::Composite(composite) => composite.close(),
        }
    }

    /// Produce a one-shot ownership-transfer envelope
    ///
    /// Requires an owned, accessible buffer. The origin becomes inaccessible;
    /// receiving the envelope yields a buffer with the origin's exact state.
    pub fn send(&mut self) -> BufferResult<Envelope> {
        if !self.is_accessible() {
            return Err(BufferError::SendState(
                "the buffer is not accessible; it may already have been sent or closed"
                    .to_string(),
            ));
        }
        if !self.is_owned() {
            return Err(BufferError::NotOwned(
                "cannot send a borrowed buffer".to_string(),
            ));
        }
        let kind = self.kind();
        let order = self.order;
        let rep = match &mut self.rep {
            Rep::Leaf(leaf) => Rep::Leaf(leaf.detach()),
            Rep::Composite(composite) => Rep::Composite(composite.detach()),
        };
        Ok(Envelope::new(kind, Buffer { order, rep }))
    }

    // ---- components -------------------------------------------------------

    /// Number of contiguous components (1 for a leaf)
    pub fn count_components(&self) -> usize {
        match &self.rep {
            Rep::Leaf(_) => 1,
            Rep::Composite(composite) => composite.parts.len(),
        }
    }

    /// Number of components with readable bytes
    pub fn count_readable_components(&self) -> usize {
        match &self.rep {
            Rep::Leaf(leaf) => usize::from(leaf.readable_bytes() > 0),
            Rep::Composite(composite) => composite
                .parts
                .iter()
                .filter(|p| p.readable_bytes() > 0)
                .count(),
        }
    }

    /// Number of components with writable bytes
    pub fn count_writable_components(&self) -> usize {
        match &self.rep {
            Rep::Leaf(leaf) => usize::from(leaf.writable_bytes() > 0),
            Rep::Composite(composite) => composite
                .parts
                .iter()
                .filter(|p| p.writable_bytes() > 0)
                .count(),
        }
    }

    /// Invoke the processor once per non-empty readable component
    ///
    /// The processor receives a running index starting at `start_index` and
    /// returns whether to continue. Returns the number of components
    /// processed, negated if the processor short-circuited.
    pub fn for_each_readable<F>(&self, start_index: usize, mut processor: F) -> BufferResult<isize>
    where
        F: FnMut(usize, &ReadableComponent<'_>) -> bool,
    {
        if !self.is_accessible() {
            return Err(BufferError::Closed);
        }
        let mut index = start_index;
        let mut processed = 0isize;
        match &self.rep {
            Rep::Leaf(leaf) => {
                if leaf.readable_bytes() > 0 {
                    processed += 1;
                    if !processor(index, &readable_component(leaf)) {
                        return Ok(-processed);
                    }
                }
            }
            Rep::Composite(composite) => {
                for part in &composite.parts {
                    let leaf = part.as_leaf();
                    if leaf.readable_bytes() == 0 {
                        continue;
                    }
                    processed += 1;
                    if !processor(index, &readable_component(leaf)) {
                        return Ok(-processed);
                    }
                    index += 1;
                }
            }
        }
        Ok(processed)
    }

    /// Invoke the processor once per non-empty writable component
    ///
    /// Requires a writable, owned buffer. Writing through a component does
    /// not move the writer offset; callers advance it themselves.
    pub fn for_each_writable<F>(
        &mut self,
        start_index: usize,
        mut processor: F,
    ) -> BufferResult<isize>
    where
        F: FnMut(usize, &mut WritableComponent<'_>) -> bool,
    {
        if !self.is_accessible() {
            return Err(BufferError::Closed);
        }
        if self.read_only() || !self.is_owned() {
            return Err(BufferError::ReadOnly);
        }
        let mut index = start_index;
        let mut processed = 0isize;
        match &mut self.rep {
            Rep::Leaf(leaf) => {
                if leaf.writable_bytes() > 0 {
                    processed += 1;
                    if !processor(index, &mut writable_component(leaf)) {
                        return Ok(-processed);
                    }
                }
            }
            Rep::Composite(composite) => {
                for part in &mut composite.parts {
                    let leaf = part.as_leaf_mut();
                    if leaf.writable_bytes() == 0 {
                        continue;
                    }
                    processed += 1;
                    if !processor(index, &mut writable_component(leaf)) {
                        return Ok(-processed);
                    }
                    index += 1;
                }
            }
        }
        Ok(processed)
    }

    // ---- crate-internal plumbing ------------------------------------------

    pub(crate) fn is_composite(&self) -> bool {
        matches!(self.rep, Rep::Composite(_))
    }

    fn as_leaf(&self) -> &LeafBuffer {
        match &self.rep {
            Rep::Leaf(leaf) => leaf,
            Rep::Composite(_) => unreachable!("composite parts are always leaves"),
        }
    }

    fn as_leaf_mut(&mut self) -> &mut LeafBuffer {
        match &mut self.rep {
            Rep::Leaf(leaf) => leaf,
            Rep::Composite(_) => unreachable!("composite parts are always leaves"),
        }
    }

    pub(crate) fn set_cursors_unchecked(&mut self, roff: usize, woff: usize) {
        let leaf = self.as_leaf_mut();
        leaf.roff = roff;
        leaf.woff = woff;
    }

    pub(crate) fn raw_get(&self, offset: usize, dst: &mut [u8]) {
        self.as_leaf().get_bytes(offset, dst);
    }

    pub(crate) fn raw_set(&mut self, offset: usize, src: &[u8]) {
        self.as_leaf_mut().set_bytes(offset, src);
    }

    pub(crate) fn raw_slice(&self) -> &[u8] {
        self.as_leaf().as_slice()
    }

    fn take_parts(&mut self) -> BufferResult<Vec<Buffer>> {
        match &mut self.rep {
            Rep::Composite(composite) => {
                if !composite.accessible {
                    return Err(BufferError::Closed);
                }
                let parts = std::mem::take(&mut composite.parts);
                composite.close();
                Ok(parts)
            }
            Rep::Leaf(_) => unreachable!("take_parts is only called on composites"),
        }
    }
}

fn readable_component(leaf: &LeafBuffer) -> ReadableComponent<'_> {
    ReadableComponent::new(
        leaf.readable_slice(),
        leaf.native_address().map(|address| address + leaf.roff),
        leaf.backend,
    )
}

fn writable_component(leaf: &mut LeafBuffer) -> WritableComponent<'_> {
    let backend = leaf.backend;
    let address = leaf.native_address().map(|address| address + leaf.woff);
    WritableComponent::new(leaf.writable_slice(), address, backend)
}

fn sign_extend_24(value: u32) -> i32 {
    ((value << 8) as i32) >> 8
}

fn decode_char(code: u32) -> BufferResult<char> {
    char::from_u32(code).ok_or_else(|| {
        BufferError::InvalidArgument(format!("{:#x} is not a Unicode scalar value", code))
    })
}

impl PartialEq for Buffer {
    /// Buffers are equal when their readable bytes are equal
    fn eq(&self, other: &Self) -> bool {
        let length = self.readable_bytes();
        if length != other.readable_bytes() {
            return false;
        }
        let mut ours = [0u8; 256];
        let mut theirs = [0u8; 256];
        let mut position = 0;
        while position < length {
            let chunk = (length - position).min(ours.len());
            self.load(self.reader_offset() + position, &mut ours[..chunk]);
            other.load(other.reader_offset() + position, &mut theirs[..chunk]);
            if ours[..chunk] != theirs[..chunk] {
                return false;
            }
            position += chunk;
        }
        true
    }
}

impl std::fmt::Debug for Buffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Buffer[roff:{}, woff:{}, cap:{}]",
            self.reader_offset(),
            self.writer_offset(),
            self.capacity()
        )
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        self.close();
    }
}
