/*!
 * Block Table Snapshots
 *
 * Diagnostic listing of every block, written after each mutating command
 * and each sweep. Nothing reads snapshots back; a failing sink only logs.
 *
 * Snapshots are captured under the table lock and handed to a dedicated
 * writer thread over an unbounded channel, so sessions never wait on disk.
 */

use crate::core::limits::DEFAULT_MEMORY_SINK_CAPACITY;
use crate::core::types::Size;
use crate::memory::Block;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::VecDeque;
use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::OffsetDateTime;
use tracing::{debug, warn};

/// Point-in-time copy of the block table
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    #[serde(with = "time::serde::rfc3339")]
    pub taken_at: OffsetDateTime,
    pub total_size: Size,
    /// Ordered by offset
    pub blocks: Vec<Block>,
}

impl Snapshot {
    pub fn new(total_size: Size, blocks: Vec<Block>) -> Self {
        Self {
            taken_at: OffsetDateTime::now_utc(),
            total_size,
            blocks,
        }
    }

    /// Human-readable listing
    pub fn render(&self) -> String {
        let taken_at = self
            .taken_at
            .format(&Rfc3339)
            .unwrap_or_else(|_| self.taken_at.to_string());

        let mut out = String::with_capacity(64 * (self.blocks.len() + 2));
        let _ = writeln!(out, "Memory State: {} ({} bytes)", taken_at, self.total_size);
        for block in &self.blocks {
            let _ = writeln!(
                out,
                "ID: {}, Offset: {}, Size: {}, Type: {}, RefCount: {}, Free: {}",
                block.id,
                block.offset,
                block.size,
                block.type_tag,
                block.ref_count,
                if block.free { "Yes" } else { "No" }
            );
        }
        out
    }

    /// `YYYYMMDD_HHMMSS_mmm`, the stem of a snapshot file
    pub fn file_stem(&self) -> String {
        let format = format_description!(
            "[year][month][day]_[hour][minute][second]_[subsecond digits:3]"
        );
        self.taken_at
            .format(&format)
            .unwrap_or_else(|_| self.taken_at.unix_timestamp().to_string())
    }
}

/// Destination for snapshots
pub trait SnapshotSink: Send + 'static {
    fn record(&mut self, snapshot: &Snapshot) -> io::Result<()>;
}

/// On-disk snapshot format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SnapshotFormat {
    #[default]
    Text,
    Json,
}

impl SnapshotFormat {
    fn extension(self) -> &'static str {
        match self {
            SnapshotFormat::Text => "txt",
            SnapshotFormat::Json => "json",
        }
    }
}

/// One file per snapshot inside a directory
#[derive(Debug)]
pub struct DirectorySink {
    dir: PathBuf,
    format: SnapshotFormat,
    seq: u64,
}

impl DirectorySink {
    /// Create the directory if needed
    pub fn new(dir: impl AsRef<Path>, format: SnapshotFormat) -> io::Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            format,
            seq: 0,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl SnapshotSink for DirectorySink {
    fn record(&mut self, snapshot: &Snapshot) -> io::Result<()> {
        // Sequence suffix keeps two snapshots in the same millisecond apart
        let name = format!(
            "{}_{:06}.{}",
            snapshot.file_stem(),
            self.seq,
            self.format.extension()
        );
        self.seq += 1;

        let body = match self.format {
            SnapshotFormat::Text => snapshot.render(),
            SnapshotFormat::Json => serde_json::to_string_pretty(snapshot)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?,
        };
        fs::write(self.dir.join(name), body)
    }
}

/// Keeps the most recent snapshots in memory
///
/// Clones share the same buffer, so a test can keep one clone and hand the
/// other to the writer.
#[derive(Debug, Clone)]
pub struct MemorySink {
    snapshots: Arc<Mutex<VecDeque<Snapshot>>>,
    capacity: usize,
}

impl MemorySink {
    pub fn new(capacity: usize) -> Self {
        Self {
            snapshots: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            capacity: capacity.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.snapshots.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.lock().is_empty()
    }

    pub fn latest(&self) -> Option<Snapshot> {
        self.snapshots.lock().back().cloned()
    }

    pub fn all(&self) -> Vec<Snapshot> {
        self.snapshots.lock().iter().cloned().collect()
    }
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new(DEFAULT_MEMORY_SINK_CAPACITY)
    }
}

impl SnapshotSink for MemorySink {
    fn record(&mut self, snapshot: &Snapshot) -> io::Result<()> {
        let mut snapshots = self.snapshots.lock();
        if snapshots.len() == self.capacity {
            snapshots.pop_front();
        }
        snapshots.push_back(snapshot.clone());
        Ok(())
    }
}

/// Fire-and-forget snapshot publisher
///
/// Clones share one writer thread. The thread drains remaining snapshots
/// and exits when the last clone is dropped.
#[derive(Clone)]
pub struct SnapshotWriter {
    inner: Arc<WriterInner>,
}

struct WriterInner {
    tx: Option<flume::Sender<Snapshot>>,
    worker: Option<thread::JoinHandle<()>>,
}

impl SnapshotWriter {
    /// Start a writer thread feeding `sink`
    pub fn spawn<S: SnapshotSink>(mut sink: S) -> io::Result<Self> {
        let (tx, rx) = flume::unbounded::<Snapshot>();
        let worker = thread::Builder::new()
            .name("snapshot-writer".to_string())
            .spawn(move || {
                for snapshot in rx.iter() {
                    if let Err(e) = sink.record(&snapshot) {
                        warn!(error = %e, blocks = snapshot.blocks.len(), "Snapshot write failed");
                    }
                }
                debug!("Snapshot writer drained and stopped");
            })?;

        Ok(Self {
            inner: Arc::new(WriterInner {
                tx: Some(tx),
                worker: Some(worker),
            }),
        })
    }

    /// Queue a snapshot; never blocks
    pub fn publish(&self, snapshot: Snapshot) {
        if let Some(tx) = &self.inner.tx {
            if tx.send(snapshot).is_err() {
                warn!("Snapshot writer stopped; snapshot dropped");
            }
        }
    }

    /// Snapshots queued but not yet written
    pub fn pending(&self) -> usize {
        self.inner.tx.as_ref().map_or(0, |tx| tx.len())
    }
}

impl std::fmt::Debug for SnapshotWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotWriter")
            .field("pending", &self.pending())
            .finish()
    }
}

impl Drop for WriterInner {
    fn drop(&mut self) {
        // Closing the channel ends the worker's loop
        self.tx.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("Snapshot writer thread panicked");
            }
        }
    }
}
