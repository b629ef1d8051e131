/*!
 * Split Tests
 * Partitioning buffers into independently owned halves
 */

use bufkit::{BufferAllocator, BufferError, UnpooledAllocator};
use pretty_assertions::assert_eq;

#[test]
fn test_split_partitions_capacity_and_cursors() {
    let mut buf = UnpooledAllocator::heap().allocate(16).unwrap();
    buf.write_slice(&[1, 2, 3, 4, 5, 6]).unwrap();
    buf.set_reader_offset(2).unwrap();

    let front = buf.split_at(4).unwrap();
    assert_eq!(front.capacity(), 4);
    assert_eq!(front.reader_offset(), 2);
    assert_eq!(front.writer_offset(), 4);

    assert_eq!(buf.capacity(), 12);
    assert_eq!(buf.reader_offset(), 0);
    assert_eq!(buf.writer_offset(), 2);

    // Capacities sum to the original
    assert_eq!(front.capacity() + buf.capacity(), 16);
    // Both halves are independently owned
    assert!(front.is_owned());
    assert!(buf.is_owned());
}

#[test]
fn test_split_halves_keep_their_bytes() {
    let mut buf = UnpooledAllocator::direct().allocate(8).unwrap();
    buf.write_slice(&[10, 20, 30, 40, 50, 60, 70, 80]).unwrap();

    let front = buf.split_at(4).unwrap();
    assert_eq!(front.get_u8(0).unwrap(), 10);
    assert_eq!(front.get_u8(3).unwrap(), 40);
    assert_eq!(buf.get_u8(0).unwrap(), 50);
    assert_eq!(buf.get_u8(3).unwrap(), 80);
}

#[test]
fn test_split_halves_close_independently() {
    let mut buf = UnpooledAllocator::heap().allocate(8).unwrap();
    buf.write_slice(&[1, 2, 3, 4, 5, 6, 7, 8]).unwrap();

    let mut front = buf.split_at(4).unwrap();
    front.close();
    assert!(!front.is_accessible());

    // The back half still reads its bytes
    assert!(buf.is_accessible());
    assert_eq!(buf.get_u8(0).unwrap(), 5);
    assert_eq!(buf.get_u8(3).unwrap(), 8);
    buf.close();
}

#[test]
fn test_split_requires_ownership() {
    let mut buf = UnpooledAllocator::heap().allocate(8).unwrap();
    let slice = buf.slice_at(0, 4).unwrap();
    let err = buf.split().unwrap_err();
    assert!(matches!(err, BufferError::NotOwned(_)));
    drop(slice);
    assert!(buf.split().is_ok());
}

#[test]
fn test_split_offset_validation() {
    let mut buf = UnpooledAllocator::heap().allocate(8).unwrap();
    let err = buf.split_at(9).unwrap_err();
    assert!(matches!(err, BufferError::InvalidArgument(_)));
}

#[test]
fn test_split_inherits_read_only() {
    let mut buf = UnpooledAllocator::heap().allocate(8).unwrap();
    buf.write_u32(5).unwrap();
    buf.make_read_only().unwrap();

    let front = buf.split_at(4).unwrap();
    assert!(front.read_only());
    assert!(buf.read_only());
}

#[test]
fn test_split_send_chain_across_threads() {
    // Split off a written chunk, send it to another thread, keep writing.
    let mut buf = UnpooledAllocator::heap().allocate(16).unwrap();

    buf.write_i32(64).unwrap();
    let mut a = buf.split().unwrap();

    buf.write_i32(42).unwrap();
    let mut sent_piece = buf.split().unwrap();
    let envelope = sent_piece.send().unwrap();

    buf.write_i32(72).unwrap();
    let mut b = buf.split().unwrap();

    let handle = std::thread::spawn(move || {
        let mut received = envelope.receive();
        received.read_i32().unwrap()
    });
    assert_eq!(handle.join().unwrap(), 42);

    buf.write_i32(32).unwrap();
    assert_eq!(buf.read_i32().unwrap(), 32);
    assert_eq!(a.read_i32().unwrap(), 64);
    assert_eq!(b.read_i32().unwrap(), 72);
}

#[test]
fn test_split_at_zero_yields_empty_front() {
    let mut buf = UnpooledAllocator::heap().allocate(8).unwrap();
    buf.write_u16(1).unwrap();

    let front = buf.split_at(0).unwrap();
    assert_eq!(front.capacity(), 0);
    assert_eq!(buf.capacity(), 8);
    assert_eq!(buf.writer_offset(), 2);
}
