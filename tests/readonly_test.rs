/*!
 * Read-Only Tests
 * Read-only conversion, slices, and const-buffer suppliers
 */

use bufkit::{BufferAllocator, BufferError, UnpooledAllocator};
use pretty_assertions::assert_eq;

#[test]
fn test_make_read_only_rejects_all_mutation() {
    let mut buf = UnpooledAllocator::heap().allocate(8).unwrap();
    buf.write_u16(5).unwrap();
    buf.make_read_only().unwrap();
    assert!(buf.read_only());

    assert_eq!(buf.write_u8(1).unwrap_err(), BufferError::ReadOnly);
    assert_eq!(buf.set_u8(0, 1).unwrap_err(), BufferError::ReadOnly);
    assert_eq!(buf.compact().unwrap_err(), BufferError::ReadOnly);
    assert_eq!(buf.ensure_writable(1).unwrap_err(), BufferError::ReadOnly);
    assert_eq!(buf.set_writer_offset(4).unwrap_err(), BufferError::ReadOnly);
    assert_eq!(buf.fill(0).unwrap_err(), BufferError::ReadOnly);

    let mut dest = UnpooledAllocator::heap().allocate(8).unwrap();
    dest.make_read_only().unwrap();
    let err = buf.copy_into_buffer(0, &mut dest, 0, 2).unwrap_err();
    assert_eq!(err, BufferError::ReadOnly);

    // Reads are unaffected
    assert_eq!(buf.read_u16().unwrap(), 5);
}

#[test]
fn test_make_read_only_is_idempotent_and_terminal() {
    let mut buf = UnpooledAllocator::heap().allocate(8).unwrap();
    buf.make_read_only().unwrap();
    buf.make_read_only().unwrap();
    assert!(buf.read_only());
}

#[test]
fn test_slice_is_read_only_and_reference_counted() {
    // Write 1..=8, slice, verify aliasing-XOR-mutation.
    let mut buf = UnpooledAllocator::heap().allocate(8).unwrap();
    buf.write_slice(&[1, 2, 3, 4, 5, 6, 7, 8]).unwrap();

    let mut slice = buf.slice().unwrap();
    assert!(slice.read_only());
    assert!(!slice.is_owned());
    assert_eq!(slice.capacity(), 8);
    assert_eq!(slice.readable_bytes(), 8);
    assert_eq!(buf.borrows(), 1);
    assert_eq!(slice.write_u8(0).unwrap_err(), BufferError::ReadOnly);

    // The parent rejects writes while the slice is open
    assert_eq!(buf.set_u8(0, 9).unwrap_err(), BufferError::ReadOnly);

    for i in 0..8u8 {
        assert_eq!(slice.read_u8().unwrap(), i + 1);
    }

    slice.close();
    assert!(buf.is_owned());
    buf.set_u8(0, 9).unwrap();
}

#[test]
fn test_slice_covers_requested_range() {
    let mut buf = UnpooledAllocator::direct().allocate(8).unwrap();
    buf.write_slice(&[1, 2, 3, 4, 5, 6, 7, 8]).unwrap();

    let mut slice = buf.slice_at(2, 4).unwrap();
    assert_eq!(slice.capacity(), 4);
    assert_eq!(slice.reader_offset(), 0);
    assert_eq!(slice.writer_offset(), 4);
    assert_eq!(slice.read_u8().unwrap(), 3);
    assert_eq!(slice.read_u8().unwrap(), 4);
}

#[test]
fn test_slice_of_read_only_buffer() {
    let mut buf = UnpooledAllocator::heap().allocate(4).unwrap();
    buf.write_u32(77).unwrap();
    buf.make_read_only().unwrap();
    let slice = buf.slice().unwrap();
    assert!(slice.read_only());
}

#[test]
fn test_slice_bounds_are_validated() {
    let buf = UnpooledAllocator::heap().allocate(8).unwrap();
    assert!(buf.slice_at(6, 4).is_err());
    assert!(buf.slice_at(8, 1).is_err());
    assert!(buf.slice_at(8, 0).is_ok());
}

#[test]
fn test_const_supplier_hands_out_isolated_read_only_handles() {
    // Two independently obtained buffers each read the content and each
    // reject mutation, without affecting a third sibling.
    let allocator = UnpooledAllocator::heap();
    let supplier = allocator.const_supplier(&[1, 2, 3, 4]).unwrap();

    let mut first = supplier.get().unwrap();
    let mut second = supplier.get().unwrap();
    let third = supplier.get().unwrap();

    assert!(first.is_const());
    assert!(first.read_only());
    assert_eq!(first.capacity(), 4);
    assert_eq!(first.readable_bytes(), 4);

    for handle in [&mut first, &mut second] {
        for expected in 1..=4u8 {
            assert_eq!(handle.read_u8().unwrap(), expected);
        }
        assert_eq!(handle.compact().unwrap_err(), BufferError::ReadOnly);
    }

    // The sibling still sees the full content
    assert_eq!(third.readable_bytes(), 4);
    assert_eq!(third.get_u8(0).unwrap(), 1);
}

#[test]
fn test_const_handles_outlive_the_supplier() {
    let allocator = UnpooledAllocator::direct();
    let supplier = allocator.const_supplier(&[9, 9, 9]).unwrap();
    let handle = supplier.get().unwrap();
    drop(supplier);
    assert_eq!(handle.get_u8(2).unwrap(), 9);
}

#[test]
fn test_const_handle_split_produces_read_only_halves() {
    let allocator = UnpooledAllocator::heap();
    let supplier = allocator.const_supplier(&[1, 2, 3, 4]).unwrap();
    let mut handle = supplier.get().unwrap();

    let front = handle.split_at(2).unwrap();
    assert!(front.read_only());
    assert!(front.is_const());
    assert!(handle.read_only());
    assert_eq!(front.get_u8(0).unwrap(), 1);
    assert_eq!(handle.get_u8(0).unwrap(), 3);
}

#[test]
fn test_close_resets_read_only_flag() {
    let mut buf = UnpooledAllocator::heap().allocate(4).unwrap();
    buf.make_read_only().unwrap();
    buf.close();
    assert!(!buf.read_only());
    assert!(!buf.is_accessible());
}
