/*!
 * Allocation Tests
 * First-fit placement, splitting, and write/read semantics
 */

use pretty_assertions::assert_eq;
use remote_memory::memory::{MemoryError, MemoryManager};

#[test]
fn test_allocations_are_laid_out_in_order() {
    let manager = MemoryManager::new(1024);

    let a = manager.allocate(100, "int").expect("allocate a");
    let b = manager.allocate(200, "string").expect("allocate b");
    let c = manager.allocate(300, "node").expect("allocate c");

    let a_block = manager.block(a).unwrap();
    let b_block = manager.block(b).unwrap();
    let c_block = manager.block(c).unwrap();

    assert_eq!(a_block.offset, 0);
    assert_eq!(b_block.offset, 100);
    assert_eq!(c_block.offset, 300);
    assert_eq!(b_block.type_tag, "string");
    assert_eq!(c_block.ref_count, 1);

    let stats = manager.stats();
    assert_eq!(stats.used, 600);
    assert_eq!(stats.free, 424);
    assert_eq!(stats.live_blocks, 3);
    assert_eq!(stats.usage_percentage(), 58.59375);
    manager.check_partition().unwrap();
}

#[test]
fn test_exact_fit_leaves_no_remainder() {
    let manager = MemoryManager::new(64);
    let id = manager.allocate(64, "bytes").unwrap();

    let blocks = manager.blocks();
    assert_eq!(blocks.len(), 1);
    assert_eq!(blocks[0].id, id);
    assert!(!blocks[0].free);

    assert!(matches!(
        manager.allocate(1, "int"),
        Err(MemoryError::OutOfMemory { requested: 1, largest_free: 0 })
    ));
}

#[test]
fn test_zero_size_is_rejected() {
    let manager = MemoryManager::new(64);
    assert_eq!(manager.allocate(0, "int"), Err(MemoryError::ZeroSize));
    assert_eq!(manager.blocks().len(), 1);
}

#[test]
fn test_fragmented_free_space_is_not_aggregated() {
    let manager = MemoryManager::new(300);
    let a = manager.allocate(100, "int").unwrap();
    let _b = manager.allocate(100, "int").unwrap();
    let c = manager.allocate(100, "int").unwrap();

    manager.dec_ref(a).unwrap();
    manager.dec_ref(c).unwrap();
    manager.sweep();

    // 200 bytes free, but in two non-adjacent runs of 100
    let stats = manager.stats();
    assert_eq!(stats.free, 200);
    assert_eq!(stats.largest_free, 100);
    assert!(stats.is_fragmented());

    let before = manager.blocks();
    assert_eq!(
        manager.allocate(150, "int"),
        Err(MemoryError::OutOfMemory {
            requested: 150,
            largest_free: 100
        })
    );
    assert_eq!(manager.blocks(), before);
}

#[test]
fn test_write_keeps_unwritten_tail() {
    let manager = MemoryManager::new(64);
    let id = manager.allocate(8, "bytes").unwrap();

    manager.write(id, b"abcdefgh").unwrap();
    manager.write(id, b"XY").unwrap();
    assert_eq!(manager.read(id).unwrap(), b"XYcdefgh".to_vec());

    manager.write(id, b"").unwrap();
    assert_eq!(manager.read(id).unwrap().len(), 8);
}

#[test]
fn test_write_over_capacity_changes_nothing() {
    let manager = MemoryManager::new(64);
    let id = manager.allocate(4, "bytes").unwrap();
    manager.write(id, b"1234").unwrap();

    assert_eq!(
        manager.write(id, b"12345"),
        Err(MemoryError::CapacityExceeded {
            id,
            len: 5,
            capacity: 4
        })
    );
    assert_eq!(manager.read(id).unwrap(), b"1234".to_vec());
}

#[test]
fn test_unknown_and_free_ids_are_invalid() {
    let manager = MemoryManager::new(64);
    let id = manager.allocate(16, "int").unwrap();
    let free_id = manager
        .blocks()
        .into_iter()
        .find(|b| b.free)
        .map(|b| b.id)
        .unwrap();

    for bad in [free_id, 999] {
        assert_eq!(manager.read(bad), Err(MemoryError::InvalidId(bad)));
        assert_eq!(manager.write(bad, b"x"), Err(MemoryError::InvalidId(bad)));
        assert_eq!(manager.inc_ref(bad), Err(MemoryError::InvalidId(bad)));
        assert_eq!(manager.dec_ref(bad), Err(MemoryError::InvalidId(bad)));
    }
    assert_eq!(manager.block(id).unwrap().ref_count, 1);
}

#[test]
fn test_first_fit_scans_in_id_order() {
    let manager = MemoryManager::new(1000);
    let a = manager.allocate(100, "int").unwrap(); // id 0 at 0, remainder id 1
    let b = manager.allocate(100, "int").unwrap(); // id 1 at 100, remainder id 2
    let _c = manager.allocate(500, "int").unwrap(); // id 2 at 200, remainder id 3 at 700

    manager.dec_ref(b).unwrap();
    manager.sweep();

    // The freed 100-byte block at offset 100 has a lower id than the tail
    let d = manager.allocate(50, "int").unwrap();
    assert_eq!(d, b);
    assert_eq!(manager.block(d).unwrap().offset, 100);
    assert_eq!(manager.block(a).unwrap().offset, 0);
    manager.check_partition().unwrap();
}
