/*!
 * Core Types
 * Common types used across the server and the client library
 */

/// Block identifier, unique for the lifetime of a server
pub type BlockId = u64;

/// Size type for arena operations
pub type Size = usize;

/// Offset of a block inside the arena
pub type Offset = usize;

/// Type tag carried by every free block
pub const FREE_TYPE_TAG: &str = "free";

/// Wire sentinel for "no block" (unbound handle, null list link)
pub const UNBOUND_ID: i64 = -1;
