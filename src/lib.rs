/*!
 * Remote Memory Library
 * A networked block store with reference counting and typed client handles
 *
 * - `memory`: the arena, block table, allocator and sweeper
 * - `protocol`: framed text commands and status-prefixed responses
 * - `server`: TCP sessions over a shared manager plus the GC task
 * - `client`: blocking connection and typed `RemoteHandle`s
 * - `monitoring`: tracing setup and block table snapshots
 */

pub mod client;
pub mod core;
pub mod memory;
pub mod monitoring;
pub mod protocol;
pub mod server;

// Re-exports
pub use client::{Client, ClientConfig, ClientError, ListNode, RemoteHandle};
pub use memory::{Block, GcTask, MemoryError, MemoryManager, MemoryStats, SweepStats};
pub use monitoring::{init_tracing, Snapshot, SnapshotFormat, SnapshotWriter};
pub use protocol::{Command, ErrorReply, Response};
pub use server::{Server, ServerConfig, ServerError};
