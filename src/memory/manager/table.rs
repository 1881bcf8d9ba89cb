/*!
 * Block Table
 * Directory of blocks over one fixed-size byte arena
 *
 * Pure data structure: no locking, no I/O. The manager wraps it in the
 * single process-wide lock.
 */

use super::super::types::{Block, MemoryError, MemoryResult, MemoryStats};
use crate::core::types::{BlockId, Size};
use std::collections::BTreeMap;

/// Blocks partitioning one arena
///
/// Invariants:
/// - blocks sorted by offset cover `[0, total_size)` with no gaps or overlaps
/// - a free block has `ref_count == 0`
/// - ids are never reused
#[derive(Debug)]
pub struct BlockTable {
    pub(super) arena: Vec<u8>,
    /// Keyed by id; iteration order is the first-fit scan order
    pub(super) blocks: BTreeMap<BlockId, Block>,
    next_id: BlockId,
}

impl BlockTable {
    /// Table with a single free block spanning the whole arena
    ///
    /// Aborts like any `Vec` if the arena cannot be allocated; servers use
    /// [`BlockTable::try_new`].
    pub fn new(total_size: Size) -> Self {
        Self::with_arena(vec![0; total_size])
    }

    /// Like [`BlockTable::new`], but reports an arena that cannot be allocated
    pub fn try_new(total_size: Size) -> MemoryResult<Self> {
        let mut arena = Vec::new();
        arena
            .try_reserve_exact(total_size)
            .map_err(|_| MemoryError::ArenaUnavailable(total_size))?;
        arena.resize(total_size, 0);
        Ok(Self::with_arena(arena))
    }

    fn with_arena(arena: Vec<u8>) -> Self {
        let total_size = arena.len();
        let mut table = Self {
            arena,
            blocks: BTreeMap::new(),
            next_id: 0,
        };
        if total_size > 0 {
            let id = table.fresh_id();
            table.blocks.insert(id, Block::free(id, 0, total_size));
        }
        table
    }

    #[inline]
    pub fn total_size(&self) -> Size {
        self.arena.len()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn get(&self, id: BlockId) -> Option<&Block> {
        self.blocks.get(&id)
    }

    /// All blocks ordered by offset
    pub fn blocks(&self) -> Vec<Block> {
        let mut blocks: Vec<Block> = self.blocks.values().cloned().collect();
        blocks.sort_by_key(|b| b.offset);
        blocks
    }

    pub fn stats(&self) -> MemoryStats {
        let mut stats = MemoryStats {
            total: self.total_size(),
            used: 0,
            free: 0,
            live_blocks: 0,
            free_blocks: 0,
            largest_free: 0,
        };
        for block in self.blocks.values() {
            if block.free {
                stats.free += block.size;
                stats.free_blocks += 1;
                stats.largest_free = stats.largest_free.max(block.size);
            } else {
                stats.used += block.size;
                stats.live_blocks += 1;
            }
        }
        stats
    }

    /// Verify the partition and free-block invariants
    pub fn check_partition(&self) -> MemoryResult<()> {
        let mut expected = 0;
        for block in self.blocks() {
            if block.offset != expected {
                return Err(MemoryError::CorruptionDetected(expected));
            }
            if block.free && block.ref_count != 0 {
                return Err(MemoryError::CorruptionDetected(block.offset));
            }
            expected = block.end();
        }
        if expected != self.total_size() {
            return Err(MemoryError::CorruptionDetected(expected));
        }
        Ok(())
    }

    pub(super) fn fresh_id(&mut self) -> BlockId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Look up an allocated block
    pub(super) fn live(&self, id: BlockId) -> MemoryResult<&Block> {
        match self.blocks.get(&id) {
            Some(block) if block.is_live() => Ok(block),
            _ => Err(MemoryError::InvalidId(id)),
        }
    }

    pub(super) fn live_mut(&mut self, id: BlockId) -> MemoryResult<&mut Block> {
        match self.blocks.get_mut(&id) {
            Some(block) if block.is_live() => Ok(block),
            _ => Err(MemoryError::InvalidId(id)),
        }
    }

    pub(super) fn largest_free(&self) -> Size {
        self.blocks
            .values()
            .filter(|b| b.free)
            .map(|b| b.size)
            .max()
            .unwrap_or(0)
    }
}
