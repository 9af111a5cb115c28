//! Gateway configuration: compile-time constants and the runtime `Config`.

pub mod constants;
mod types;

pub use types::Config;
