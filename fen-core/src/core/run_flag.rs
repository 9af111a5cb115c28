//! Process-wide run flag.
//!
//! SIGINT/SIGTERM handlers and internal fatal paths all converge here; the
//! event loop checks it once per iteration and exits at the boundary.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::warn;

/// Shared stop flag. Cloning shares the underlying flag.
#[derive(Clone, Default)]
pub struct RunFlag {
    stop: Arc<AtomicBool>,
}

impl RunFlag {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        !self.stop.load(Ordering::Acquire)
    }

    /// Request shutdown, recording why. Idempotent.
    pub fn stop(&self, reason: &str) {
        if !self.stop.swap(true, Ordering::AcqRel) {
            warn!("shutdown requested: {}", reason);
        }
    }

    /// The raw flag, for `signal_hook::flag::register`.
    pub fn raw(&self) -> Arc<AtomicBool> {
        self.stop.clone()
    }
}
