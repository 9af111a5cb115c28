//! CPU affinity for the event-loop thread.
//!
//! Pinning prevents the OS from migrating the loop between cores, which
//! shows up as cache evictions and latency jitter on the market-data path.

use anyhow::Result;
use core_affinity::CoreId;

/// Pin the current thread to a specific CPU core.
pub fn pin_to_core(core: usize) -> Result<()> {
    let core_id = CoreId { id: core };
    if core_affinity::set_for_current(core_id) {
        tracing::info!("pinned thread to CPU core {}", core);
        Ok(())
    } else {
        anyhow::bail!("failed to pin thread to core {}", core)
    }
}

/// Number of available CPU cores.
pub fn num_cores() -> usize {
    core_affinity::get_core_ids()
        .map(|ids| ids.len())
        .unwrap_or(1)
}
