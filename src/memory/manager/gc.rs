/*!
 * Block Table Sweep
 * Turns unreferenced blocks into free blocks, then coalesces
 */

use super::super::types::SweepStats;
use super::table::BlockTable;
use crate::core::types::FREE_TYPE_TAG;

impl BlockTable {
    /// One sweep: mark every live zero-count block free, then coalesce once
    ///
    /// Never touches block contents. O(number of blocks).
    pub fn sweep(&mut self) -> SweepStats {
        let mut stats = SweepStats::default();

        for block in self.blocks.values_mut().filter(|b| b.is_garbage()) {
            block.free = true;
            block.type_tag = FREE_TYPE_TAG.to_string();
            stats.reclaimed_blocks += 1;
            stats.reclaimed_bytes += block.size;
        }

        stats.merged_blocks = self.coalesce();
        stats
    }
}
