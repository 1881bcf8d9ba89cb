/*!
 * Memory Traits
 * Block management abstractions
 */

use super::types::*;
use crate::core::types::{BlockId, Size};

/// Block allocator interface
pub trait Allocator: Send + Sync {
    /// Allocate a block of exactly `size` bytes tagged with `type_tag`
    fn allocate(&self, size: Size, type_tag: &str) -> MemoryResult<BlockId>;

    /// Copy `bytes` to the start of a live block
    fn write(&self, id: BlockId, bytes: &[u8]) -> MemoryResult<()>;

    /// Copy out the full contents of a live block
    fn read(&self, id: BlockId) -> MemoryResult<Vec<u8>>;
}

/// Reference counting interface
pub trait ReferenceCounter: Send + Sync {
    /// Increment the count of a live block, returning the new count
    fn inc_ref(&self, id: BlockId) -> MemoryResult<u32>;

    /// Decrement the count of a live block, returning the new count
    ///
    /// Reaching zero does not free the block; the next sweep does.
    fn dec_ref(&self, id: BlockId) -> MemoryResult<u32>;
}

/// Garbage collection interface
pub trait GarbageCollector: Send + Sync {
    /// Reclaim every unreferenced block, then coalesce
    fn sweep(&self) -> SweepStats;
}
