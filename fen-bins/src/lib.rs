//! Shared CLI and setup code for the gateway binaries.

pub mod common;
