/*!
 * System Limits and Constants
 *
 * Centralized location for defaults, thresholds, and magic numbers.
 * Organized by domain for maintainability and discoverability.
 */

use std::time::Duration;

// =============================================================================
// ARENA
// =============================================================================

/// Default arena size in MiB (the server's `--memsize` unit)
pub const DEFAULT_ARENA_MB: usize = 10;

/// Default arena size in bytes
pub const DEFAULT_ARENA_SIZE: usize = DEFAULT_ARENA_MB * 1024 * 1024;

// =============================================================================
// GARBAGE COLLECTION
// =============================================================================

/// Period between two sweep ticks
pub const DEFAULT_GC_INTERVAL: Duration = Duration::from_secs(5);

// =============================================================================
// NETWORK
// =============================================================================

/// Default listening port
pub const DEFAULT_PORT: u16 = 50051;

/// Largest accepted frame payload (16MB)
/// [SECURITY] Bounds per-session buffering against a hostile length prefix
pub const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

/// Concurrent sessions served before the accept loop waits for a free slot
pub const DEFAULT_MAX_CONNECTIONS: usize = 1024;

/// Sessions idle longer than this are closed
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(300);

/// Client connect timeout
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Client per-request read/write timeout
pub const DEFAULT_IO_TIMEOUT: Duration = Duration::from_secs(10);

// =============================================================================
// SNAPSHOTS
// =============================================================================

/// Snapshots kept by the in-memory sink
pub const DEFAULT_MEMORY_SINK_CAPACITY: usize = 64;
