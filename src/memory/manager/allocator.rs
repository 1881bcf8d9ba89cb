/*!
 * Block Allocator
 * First-fit allocation, splitting, and free-block coalescing
 */

use super::super::types::{Block, MemoryError, MemoryResult};
use super::table::BlockTable;
use crate::core::types::{BlockId, Size};

impl BlockTable {
    /// Allocate `size` bytes from the first free block (in id order) that fits
    ///
    /// The found block keeps its id and shrinks to exactly `size`; any
    /// remainder becomes a new free block with a fresh id right after it.
    /// Aggregate free space split across blocks does not count.
    pub fn allocate(&mut self, size: Size, type_tag: &str) -> MemoryResult<BlockId> {
        if size == 0 {
            return Err(MemoryError::ZeroSize);
        }

        let Some(id) = self
            .blocks
            .values()
            .find(|b| b.free && b.size >= size)
            .map(|b| b.id)
        else {
            return Err(MemoryError::OutOfMemory {
                requested: size,
                largest_free: self.largest_free(),
            });
        };

        let block = self
            .blocks
            .get_mut(&id)
            .ok_or(MemoryError::InvalidId(id))?;
        let remaining = block.size - size;
        let remainder_offset = block.offset + size;
        block.size = size;
        block.type_tag = type_tag.to_string();
        block.ref_count = 1;
        block.free = false;

        if remaining > 0 {
            let remainder_id = self.fresh_id();
            self.blocks.insert(
                remainder_id,
                Block::free(remainder_id, remainder_offset, remaining),
            );
        }

        Ok(id)
    }

    /// Copy `bytes` to the start of a live block
    ///
    /// Bytes past `bytes.len()` keep whatever they held before.
    pub fn write(&mut self, id: BlockId, bytes: &[u8]) -> MemoryResult<()> {
        let block = self.live(id)?;
        if bytes.len() > block.size {
            return Err(MemoryError::CapacityExceeded {
                id,
                len: bytes.len(),
                capacity: block.size,
            });
        }
        let start = block.offset;
        self.arena[start..start + bytes.len()].copy_from_slice(bytes);
        Ok(())
    }

    /// Copy out exactly `size` bytes of a live block
    pub fn read(&self, id: BlockId) -> MemoryResult<Vec<u8>> {
        let block = self.live(id)?;
        Ok(self.arena[block.offset..block.end()].to_vec())
    }

    /// Merge runs of adjacent free blocks into their lowest-offset member
    ///
    /// Upper ids are retired. Returns the number of blocks merged away;
    /// a second call with nothing newly freed returns 0.
    pub fn coalesce(&mut self) -> usize {
        let mut order: Vec<(usize, BlockId)> =
            self.blocks.values().map(|b| (b.offset, b.id)).collect();
        order.sort_unstable();

        let mut merged = 0;
        let mut run_head: Option<BlockId> = None;
        for (_, id) in order {
            let is_free = self.blocks.get(&id).map_or(false, |b| b.free);
            match (run_head, is_free) {
                (Some(head), true) => {
                    if let Some(upper) = self.blocks.remove(&id) {
                        if let Some(lower) = self.blocks.get_mut(&head) {
                            debug_assert_eq!(lower.end(), upper.offset);
                            lower.size += upper.size;
                            merged += 1;
                        }
                    }
                }
                (None, true) => run_head = Some(id),
                (_, false) => run_head = None,
            }
        }
        merged
    }
}
