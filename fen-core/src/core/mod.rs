//! Core primitives shared by every subsystem: clocks, wire enums, fixed
//! strings, and the process-wide run flag.

pub mod clock;
pub mod fixed_str;
pub mod run_flag;
pub mod types;

pub use run_flag::RunFlag;
