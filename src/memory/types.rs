/*!
 * Memory Types
 * Common types for block management
 */

use crate::core::types::{BlockId, Offset, Size, FREE_TYPE_TAG};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Memory operation result
pub type MemoryResult<T> = Result<T, MemoryError>;

/// Memory errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MemoryError {
    #[error("Out of memory: requested {requested} bytes, largest free block {largest_free} bytes")]
    OutOfMemory { requested: Size, largest_free: Size },

    #[error("Zero-sized allocation requested")]
    ZeroSize,

    #[error("Invalid block id: {0}")]
    InvalidId(BlockId),

    #[error("Write of {len} bytes exceeds capacity {capacity} of block {id}")]
    CapacityExceeded { id: BlockId, len: Size, capacity: Size },

    #[error("Reference count underflow on block {0}")]
    RefCountUnderflow(BlockId),

    #[error("Reference count overflow on block {0}")]
    RefCountOverflow(BlockId),

    #[error("Cannot allocate a {0}-byte arena")]
    ArenaUnavailable(Size),

    #[error("Block table corruption detected at offset {0}")]
    CorruptionDetected(Offset),
}

/// Block metadata
///
/// The bytes themselves live in the arena at `offset..offset + size`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub id: BlockId,
    pub offset: Offset,
    pub size: Size,
    pub type_tag: String,
    pub ref_count: u32,
    pub free: bool,
}

impl Block {
    /// A free block: no references, `free` type tag
    pub fn free(id: BlockId, offset: Offset, size: Size) -> Self {
        Self {
            id,
            offset,
            size,
            type_tag: FREE_TYPE_TAG.to_string(),
            ref_count: 0,
            free: true,
        }
    }

    /// First byte past the end of this block
    #[inline]
    pub fn end(&self) -> Offset {
        self.offset + self.size
    }

    /// Allocated and not yet reclaimed
    #[inline]
    pub fn is_live(&self) -> bool {
        !self.free
    }

    /// Live but no longer referenced; the next sweep reclaims it
    #[inline]
    pub fn is_garbage(&self) -> bool {
        !self.free && self.ref_count == 0
    }
}

/// Memory statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryStats {
    pub total: Size,
    pub used: Size,
    pub free: Size,
    pub live_blocks: usize,
    pub free_blocks: usize,
    pub largest_free: Size,
}

impl MemoryStats {
    pub fn usage_percentage(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.used as f64 / self.total as f64 * 100.0
        }
    }

    /// Free space exists but is split across more than one block
    pub fn is_fragmented(&self) -> bool {
        self.free_blocks > 1
    }
}

/// Outcome of one sweep tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepStats {
    pub reclaimed_blocks: usize,
    pub reclaimed_bytes: Size,
    pub merged_blocks: usize,
}

impl SweepStats {
    /// Check if the sweep changed the table
    pub fn changed_any(&self) -> bool {
        self.reclaimed_blocks > 0 || self.merged_blocks > 0
    }
}
