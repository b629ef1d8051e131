/*!
 * Composite Buffer Tests
 * Concatenated components behind the buffer contract
 */

use bufkit::{
    Buffer, BufferAllocator, BufferError, BufferKind, Endianness, UnpooledAllocator,
};
use pretty_assertions::assert_eq;
use std::sync::Arc;

fn heap() -> Arc<UnpooledAllocator> {
    Arc::new(UnpooledAllocator::heap())
}

fn filled(allocator: &Arc<UnpooledAllocator>, bytes: &[u8]) -> Buffer {
    let mut buf = allocator.allocate(bytes.len()).unwrap();
    buf.write_slice(bytes).unwrap();
    buf
}

#[test]
fn test_compose_concatenates_capacity_and_cursors() {
    let allocator = heap();
    let first = filled(&allocator, &[1, 2, 3, 4]);
    let second = filled(&allocator, &[5, 6]);
    let third = allocator.allocate(4).unwrap();

    let buf = Buffer::compose(allocator.clone(), vec![first, second, third]).unwrap();
    assert_eq!(buf.kind(), BufferKind::Composite);
    assert_eq!(buf.capacity(), 10);
    assert_eq!(buf.reader_offset(), 0);
    assert_eq!(buf.writer_offset(), 6);
    assert_eq!(buf.count_components(), 3);
    assert_eq!(buf.count_readable_components(), 2);
    assert_eq!(buf.count_writable_components(), 1);
}

#[test]
fn test_composite_reads_span_components() {
    let allocator = heap();
    let first = filled(&allocator, &[0x01, 0x02, 0x03]);
    let second = filled(&allocator, &[0x04, 0x05, 0x06, 0x07, 0x08]);

    let mut buf = Buffer::compose(allocator, vec![first, second]).unwrap();
    buf.set_order(Endianness::Big).unwrap();
    // The long straddles the component boundary
    assert_eq!(buf.read_u64().unwrap(), 0x0102030405060708);
    assert_eq!(buf.readable_bytes(), 0);
}

#[test]
fn test_composite_writes_span_components() {
    let allocator = heap();
    let first = allocator.allocate(3).unwrap();
    let second = allocator.allocate(5).unwrap();

    let mut buf = Buffer::compose(allocator, vec![first, second]).unwrap();
    buf.set_order(Endianness::Big).unwrap();
    buf.write_u64(0x1112131415161718).unwrap();
    assert_eq!(buf.writer_offset(), 8);
    assert_eq!(buf.get_u8(2).unwrap(), 0x13);
    assert_eq!(buf.get_u8(3).unwrap(), 0x14);
}

#[test]
fn test_empty_composite_is_legal() {
    let allocator = heap();
    let mut buf = Buffer::compose(allocator.clone(), vec![]).unwrap();
    assert_eq!(buf.capacity(), 0);
    assert_eq!(buf.count_components(), 0);
    assert!(buf.is_owned());

    buf.make_read_only().unwrap();
    assert!(buf.read_only());

    let received = buf.send().unwrap().receive();
    assert_eq!(received.capacity(), 0);
    assert!(received.read_only());
}

#[test]
fn test_compose_flattens_nested_composites() {
    let allocator = heap();
    let inner = Buffer::compose(
        allocator.clone(),
        vec![filled(&allocator, &[1]), filled(&allocator, &[2])],
    )
    .unwrap();
    let outer = Buffer::compose(allocator, vec![inner, filled_once(&[3])]).unwrap();

    assert_eq!(outer.count_components(), 3);
    assert_eq!(outer.capacity(), 3);
    assert_eq!(outer.get_u8(1).unwrap(), 2);
}

fn filled_once(bytes: &[u8]) -> Buffer {
    let allocator = UnpooledAllocator::heap();
    let mut buf = allocator.allocate(bytes.len()).unwrap();
    buf.write_slice(bytes).unwrap();
    buf
}

#[test]
fn test_compose_rejects_mixed_byte_orders() {
    let allocator = heap();
    let mut first = allocator.allocate(2).unwrap();
    first.set_order(Endianness::Big).unwrap();
    let mut second = allocator.allocate(2).unwrap();
    second.set_order(Endianness::Little).unwrap();

    let err = Buffer::compose(allocator, vec![first, second]).unwrap_err();
    assert!(matches!(err, BufferError::InvalidArgument(_)));
}

#[test]
fn test_compose_rejects_interior_holes() {
    let allocator = heap();
    let partially_written = filled(&allocator, &[1, 2]);
    let mut with_space = allocator.allocate(4).unwrap();
    with_space.write_u8(9).unwrap();

    // A written component after one with writable space leaves a gap.
    let err = Buffer::compose(allocator, vec![with_space, partially_written]).unwrap_err();
    assert!(matches!(err, BufferError::InvalidArgument(_)));
}

#[test]
fn test_compose_rejects_closed_components() {
    let allocator = heap();
    let mut dead = allocator.allocate(2).unwrap();
    dead.close();
    let err = Buffer::compose(allocator, vec![dead]).unwrap_err();
    assert_eq!(err, BufferError::Closed);
}

#[test]
fn test_composite_split_partitions_component_list() {
    let allocator = heap();
    let buf_parts = vec![
        filled(&allocator, &[1, 2, 3, 4]),
        filled(&allocator, &[5, 6, 7, 8]),
    ];
    let mut buf = Buffer::compose(allocator, buf_parts).unwrap();

    // Split inside the second component
    let front = buf.split_at(6).unwrap();
    assert_eq!(front.capacity(), 6);
    assert_eq!(front.count_components(), 2);
    assert_eq!(front.get_u8(5).unwrap(), 6);

    assert_eq!(buf.capacity(), 2);
    assert_eq!(buf.get_u8(0).unwrap(), 7);
    assert_eq!(buf.get_u8(1).unwrap(), 8);
}

#[test]
fn test_composite_split_at_component_boundary() {
    let allocator = heap();
    let buf_parts = vec![filled(&allocator, &[1, 2]), filled(&allocator, &[3, 4])];
    let mut buf = Buffer::compose(allocator, buf_parts).unwrap();

    let front = buf.split_at(2).unwrap();
    assert_eq!(front.count_components(), 1);
    assert_eq!(buf.count_components(), 1);
    assert_eq!(front.get_u8(1).unwrap(), 2);
    assert_eq!(buf.get_u8(0).unwrap(), 3);
}

#[test]
fn test_composite_ensure_writable_appends_component() {
    let allocator = heap();
    let first = filled(&allocator, &[1, 2, 3, 4]);
    let mut buf = Buffer::compose(allocator, vec![first]).unwrap();
    assert_eq!(buf.writable_bytes(), 0);

    buf.ensure_writable_with(8, 0, false).unwrap();
    assert!(buf.writable_bytes() >= 8);
    assert_eq!(buf.count_components(), 2);

    buf.write_u64(7).unwrap();
    assert_eq!(buf.get_u8(0).unwrap(), 1);
}

#[test]
fn test_composite_compact_shifts_across_components() {
    let allocator = heap();
    let buf_parts = vec![
        filled(&allocator, &[1, 2, 3, 4]),
        filled(&allocator, &[5, 6, 7, 8]),
    ];
    let mut buf = Buffer::compose(allocator, buf_parts).unwrap();
    buf.set_reader_offset(3).unwrap();

    buf.compact().unwrap();
    assert_eq!(buf.reader_offset(), 0);
    assert_eq!(buf.writer_offset(), 5);
    for (offset, expected) in [4u8, 5, 6, 7, 8].iter().enumerate() {
        assert_eq!(buf.get_u8(offset).unwrap(), *expected);
    }
}

#[test]
fn test_composite_read_only_is_disjunction() {
    let allocator = heap();
    let mut read_only_part = filled(&allocator, &[1, 2]);
    read_only_part.make_read_only().unwrap();
    let writable_part = filled(&allocator, &[3, 4]);

    let mut buf = Buffer::compose(allocator, vec![read_only_part, writable_part]).unwrap();
    assert!(buf.read_only());
    assert_eq!(buf.set_u8(2, 9).unwrap_err(), BufferError::ReadOnly);
}

#[test]
fn test_composite_send_and_receive() {
    let allocator = heap();
    let buf_parts = vec![filled(&allocator, &[1, 2, 3]), filled(&allocator, &[4, 5, 6])];
    let mut buf = Buffer::compose(allocator, buf_parts).unwrap();
    buf.set_reader_offset(1).unwrap();

    let envelope = buf.send().unwrap();
    assert_eq!(envelope.kind(), BufferKind::Composite);
    assert!(!buf.is_accessible());

    let mut received = std::thread::spawn(move || envelope.receive())
        .join()
        .unwrap();
    assert_eq!(received.capacity(), 6);
    assert_eq!(received.reader_offset(), 1);
    assert_eq!(received.writer_offset(), 6);
    assert_eq!(received.count_components(), 2);
    assert_eq!(received.read_u8().unwrap(), 2);
}

#[test]
fn test_composite_slice_spans_components() {
    let allocator = heap();
    let buf_parts = vec![
        filled(&allocator, &[1, 2, 3, 4]),
        filled(&allocator, &[5, 6, 7, 8]),
    ];
    let buf = Buffer::compose(allocator, buf_parts).unwrap();

    let mut slice = buf.slice_at(2, 4).unwrap();
    assert!(slice.read_only());
    assert_eq!(slice.capacity(), 4);
    assert_eq!(slice.read_u8().unwrap(), 3);
    assert_eq!(slice.read_u8().unwrap(), 4);
    assert_eq!(slice.read_u8().unwrap(), 5);
    assert_eq!(slice.read_u8().unwrap(), 6);

    // The composite is borrowed while slices are open
    assert!(!buf.is_owned());
}

#[test]
fn test_composite_for_each_readable_visits_nonempty_components() {
    let allocator = heap();
    let buf_parts = vec![
        filled(&allocator, &[1, 2]),
        allocator.allocate(4).unwrap(),
    ];
    let buf = Buffer::compose(allocator, buf_parts).unwrap();

    let mut visited = Vec::new();
    let processed = buf
        .for_each_readable(7, |index, component| {
            visited.push((index, component.as_slice().to_vec()));
            true
        })
        .unwrap();
    assert_eq!(processed, 1);
    assert_eq!(visited, vec![(7, vec![1, 2])]);
}

#[test]
fn test_composite_write_bytes_from_leaf_source() {
    let allocator = heap();
    let buf_parts = vec![allocator.allocate(3).unwrap(), allocator.allocate(5).unwrap()];
    let mut target = Buffer::compose(allocator.clone(), buf_parts).unwrap();

    let mut source = UnpooledAllocator::direct().allocate(6).unwrap();
    source.write_slice(&[9, 8, 7, 6, 5, 4]).unwrap();

    target.write_bytes(&mut source).unwrap();
    assert_eq!(target.writer_offset(), 6);
    assert_eq!(source.readable_bytes(), 0);
    assert_eq!(target.get_u8(0).unwrap(), 9);
    assert_eq!(target.get_u8(5).unwrap(), 4);
}

#[test]
fn test_composite_cursor_crosses_boundaries() {
    let allocator = heap();
    let buf_parts = vec![
        filled(&allocator, &[0x0A, 0x0B]),
        filled(&allocator, &[0x0C, 0x0D, 0x0E, 0x0F, 0x10, 0x11]),
    ];
    let buf = Buffer::compose(allocator, buf_parts).unwrap();

    let mut cursor = buf.open_cursor().unwrap();
    assert!(cursor.read_i64());
    assert_eq!(cursor.last_i64(), 0x0A0B0C0D0E0F1011);
}
