/*!
 * Monitoring
 * Structured tracing and block table snapshots
 */

mod snapshot;
mod tracer;

pub use snapshot::{
    DirectorySink, MemorySink, Snapshot, SnapshotFormat, SnapshotSink, SnapshotWriter,
};
pub use tracer::init_tracing;
