//! Performance utilities: CPU pinning and memory locking.

pub mod cpu;
pub mod memory;

pub use cpu::{num_cores, pin_to_core};
pub use memory::lock_memory;
