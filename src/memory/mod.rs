/*!
 * Memory Module
 * Block table, allocation, reference counting, and garbage collection
 */

pub mod gc;
pub mod manager;
pub mod traits;
pub mod types;

// Re-export for convenience
pub use gc::{GcCommand, GcTask};
pub use manager::{BlockTable, MemoryManager};
pub use traits::*;
pub use types::*;
