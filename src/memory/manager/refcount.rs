/*!
 * Reference Counter
 * Increment/decrement on live blocks
 */

use super::super::types::{MemoryError, MemoryResult};
use super::table::BlockTable;
use crate::core::types::BlockId;
use log::warn;

impl BlockTable {
    /// Increment a live block's count
    ///
    /// A count at `u32::MAX` cannot take another reference; the increment
    /// is refused and the table is left untouched.
    pub fn inc_ref(&mut self, id: BlockId) -> MemoryResult<u32> {
        let block = self.live_mut(id)?;
        let Some(count) = block.ref_count.checked_add(1) else {
            warn!(
                "Refused INC_REF on block {} ({} bytes, type {}): count saturated",
                id, block.size, block.type_tag
            );
            return Err(MemoryError::RefCountOverflow(id));
        };
        block.ref_count = count;
        Ok(count)
    }

    /// Decrement a live block's count
    ///
    /// A block already at zero is waiting for the sweep; decrementing it
    /// again is refused and the table is left untouched.
    pub fn dec_ref(&mut self, id: BlockId) -> MemoryResult<u32> {
        let block = self.live_mut(id)?;
        if block.ref_count == 0 {
            warn!(
                "Refused DEC_REF on block {} ({} bytes, type {}): count already 0",
                id, block.size, block.type_tag
            );
            return Err(MemoryError::RefCountUnderflow(id));
        }
        block.ref_count -= 1;
        Ok(block.ref_count)
    }
}
