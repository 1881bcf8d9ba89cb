/*!
 * Garbage Collection
 * Periodic background sweeping of unreferenced blocks
 */

mod task;

pub use task::{GcCommand, GcTask};
