/*!
 * Memory Management
 *
 * One contiguous arena carved into reference-counted blocks.
 *
 * ## Allocation
 *
 * - **First-fit**: the first free block (in id order) large enough wins
 * - **Block splitting**: the remainder becomes a new free block
 * - **No relocation**: live blocks never move, so fragmentation can refuse
 *   a request that aggregate free space would satisfy
 *
 * ## Reclamation
 *
 * Blocks are never freed by a decrement. A sweep turns every live block
 * with a zero count into a free block and then coalesces adjacent free
 * blocks (see `GcTask` for the periodic driver).
 *
 * ## Concurrency
 *
 * Every operation, sweeps included, holds the single table lock for its
 * whole duration. Snapshots are copied and queued under the lock and written
 * by the snapshot thread outside it.
 */

mod allocator;
mod gc;
mod refcount;
mod table;

pub use table::BlockTable;

use super::traits::{Allocator, GarbageCollector, ReferenceCounter};
use super::types::{Block, MemoryResult, MemoryStats, SweepStats};
use crate::core::types::{BlockId, Size};
use crate::monitoring::{Snapshot, SnapshotWriter};
use log::{debug, info, warn};
use parking_lot::Mutex;
use std::sync::Arc;

/// Shared handle to the block table
///
/// Cloning is cheap; clones operate on the same table.
#[derive(Clone)]
pub struct MemoryManager {
    table: Arc<Mutex<BlockTable>>,
    snapshots: Option<SnapshotWriter>,
}

impl MemoryManager {
    pub fn new(total_size: Size) -> Self {
        Self::from_table(BlockTable::new(total_size))
    }

    /// Like [`MemoryManager::new`], but an arena that cannot be allocated
    /// is an error instead of an abort
    pub fn try_new(total_size: Size) -> MemoryResult<Self> {
        BlockTable::try_new(total_size).map(Self::from_table)
    }

    fn from_table(table: BlockTable) -> Self {
        info!(
            "Memory manager initialized with {} bytes (first-fit, sweep-based reclamation)",
            table.total_size()
        );
        Self {
            table: Arc::new(Mutex::new(table)),
            snapshots: None,
        }
    }

    /// Publish a snapshot after every state change
    pub fn with_snapshots(mut self, writer: SnapshotWriter) -> Self {
        self.snapshots = Some(writer);
        self
    }

    pub fn total_size(&self) -> Size {
        self.table.lock().total_size()
    }

    pub fn allocate(&self, size: Size, type_tag: &str) -> MemoryResult<BlockId> {
        let result = self.mutate(|table| table.allocate(size, type_tag));
        match &result {
            Ok(id) => info!("Allocated block {} ({} bytes, type {})", id, size, type_tag),
            Err(e) => warn!("Allocation of {} bytes (type {}) failed: {}", size, type_tag, e),
        }
        result
    }

    pub fn write(&self, id: BlockId, bytes: &[u8]) -> MemoryResult<()> {
        let result = self.mutate(|table| table.write(id, bytes));
        if let Err(ref e) = result {
            debug!("Write to block {} rejected: {}", id, e);
        }
        result
    }

    pub fn read(&self, id: BlockId) -> MemoryResult<Vec<u8>> {
        self.table.lock().read(id)
    }

    pub fn inc_ref(&self, id: BlockId) -> MemoryResult<u32> {
        let result = self.mutate(|table| table.inc_ref(id));
        if let Ok(count) = result {
            debug!("Block {} ref count -> {}", id, count);
        }
        result
    }

    pub fn dec_ref(&self, id: BlockId) -> MemoryResult<u32> {
        let result = self.mutate(|table| table.dec_ref(id));
        match result {
            Ok(0) => debug!("Block {} unreferenced, awaiting sweep", id),
            Ok(count) => debug!("Block {} ref count -> {}", id, count),
            Err(_) => {}
        }
        result
    }

    /// Reclaim unreferenced blocks and coalesce, as one atomic step
    pub fn sweep(&self) -> SweepStats {
        let (stats, usage) = {
            let mut table = self.table.lock();
            let stats = table.sweep();
            self.publish(self.capture(&table));
            (stats, table.stats())
        };

        if stats.changed_any() {
            info!(
                "Sweep reclaimed {} blocks ({} bytes), merged {} free blocks; arena {:.1}% used",
                stats.reclaimed_blocks,
                stats.reclaimed_bytes,
                stats.merged_blocks,
                usage.usage_percentage()
            );
        }
        stats
    }

    pub fn stats(&self) -> MemoryStats {
        self.table.lock().stats()
    }

    /// Copy of the block table ordered by offset
    pub fn blocks(&self) -> Vec<Block> {
        self.table.lock().blocks()
    }

    pub fn block(&self, id: BlockId) -> Option<Block> {
        self.table.lock().get(id).cloned()
    }

    pub fn check_partition(&self) -> MemoryResult<()> {
        self.table.lock().check_partition()
    }

    /// Run `op` under the lock; queue a snapshot if it succeeded
    fn mutate<R>(
        &self,
        op: impl FnOnce(&mut BlockTable) -> MemoryResult<R>,
    ) -> MemoryResult<R> {
        let mut table = self.table.lock();
        let result = op(&mut table);
        if result.is_ok() {
            // Queued under the lock so snapshots reach the sink in table order
            self.publish(self.capture(&table));
        }
        result
    }

    fn capture(&self, table: &BlockTable) -> Option<Snapshot> {
        self.snapshots
            .as_ref()
            .map(|_| Snapshot::new(table.total_size(), table.blocks()))
    }

    fn publish(&self, snapshot: Option<Snapshot>) {
        if let (Some(writer), Some(snapshot)) = (&self.snapshots, snapshot) {
            writer.publish(snapshot);
        }
    }
}

impl std::fmt::Debug for MemoryManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryManager")
            .field("stats", &self.stats())
            .field("snapshots", &self.snapshots.is_some())
            .finish()
    }
}

// Implement trait interfaces
impl Allocator for MemoryManager {
    fn allocate(&self, size: Size, type_tag: &str) -> MemoryResult<BlockId> {
        MemoryManager::allocate(self, size, type_tag)
    }

    fn write(&self, id: BlockId, bytes: &[u8]) -> MemoryResult<()> {
        MemoryManager::write(self, id, bytes)
    }

    fn read(&self, id: BlockId) -> MemoryResult<Vec<u8>> {
        MemoryManager::read(self, id)
    }
}

impl ReferenceCounter for MemoryManager {
    fn inc_ref(&self, id: BlockId) -> MemoryResult<u32> {
        MemoryManager::inc_ref(self, id)
    }

    fn dec_ref(&self, id: BlockId) -> MemoryResult<u32> {
        MemoryManager::dec_ref(self, id)
    }
}

impl GarbageCollector for MemoryManager {
    fn sweep(&self) -> SweepStats {
        MemoryManager::sweep(self)
    }
}

