/*!
 * Partition Property Tests
 * Random operation sequences never break the block partition
 */

use proptest::prelude::*;
use remote_memory::memory::MemoryManager;

const ARENA: usize = 4096;

#[derive(Debug, Clone)]
enum Op {
    Allocate(usize),
    Write(usize, usize),
    IncRef(usize),
    DecRef(usize),
    Sweep,
}

/// Any id seen so far, reclaimed ones included
fn pick(ids: &[u64], i: usize) -> u64 {
    if ids.is_empty() {
        0
    } else {
        ids[i % ids.len()]
    }
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (1usize..600).prop_map(Op::Allocate),
        2 => (any::<usize>(), 0usize..700).prop_map(|(i, len)| Op::Write(i, len)),
        1 => any::<usize>().prop_map(Op::IncRef),
        3 => any::<usize>().prop_map(Op::DecRef),
        1 => Just(Op::Sweep),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn prop_blocks_always_partition_the_arena(ops in prop::collection::vec(op_strategy(), 1..80)) {
        let manager = MemoryManager::new(ARENA);
        let mut ids = Vec::new();

        for op in ops {
            match op {
                Op::Allocate(size) => {
                    if let Ok(id) = manager.allocate(size, "int") {
                        ids.push(id);
                    }
                }
                Op::Write(i, len) => {
                    let _ = manager.write(pick(&ids, i), &vec![7u8; len]);
                }
                Op::IncRef(i) => {
                    let _ = manager.inc_ref(pick(&ids, i));
                }
                Op::DecRef(i) => {
                    let _ = manager.dec_ref(pick(&ids, i));
                }
                Op::Sweep => {
                    manager.sweep();
                }
            }

            prop_assert!(manager.check_partition().is_ok());
            let stats = manager.stats();
            prop_assert_eq!(stats.used + stats.free, ARENA);
        }

        // After a sweep no two free blocks are adjacent
        manager.sweep();
        let blocks = manager.blocks();
        for pair in blocks.windows(2) {
            prop_assert!(!(pair[0].free && pair[1].free));
        }
    }

    #[test]
    fn prop_live_ids_are_unique(sizes in prop::collection::vec(1usize..200, 1..40)) {
        let manager = MemoryManager::new(ARENA);
        let mut seen = std::collections::HashSet::new();
        for size in sizes {
            if let Ok(id) = manager.allocate(size, "int") {
                prop_assert!(seen.insert(id));
            }
        }
    }
}
