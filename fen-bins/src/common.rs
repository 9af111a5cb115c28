//! Common utilities for all binaries: CLI arguments and process setup.

use anyhow::Result;
use clap::Parser;
use fen_core::RunFlag;

/// Common CLI arguments for the gateway binaries.
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct CommonArgs {
    /// Trading symbol (exchange spelling)
    #[arg(short, long, default_value = "BNBUSDT")]
    pub symbol: String,

    /// Leverage forced at startup (best-effort)
    #[arg(long, default_value = "20")]
    pub leverage: u32,

    /// CPU core to pin the event loop to
    #[arg(short = 'c', long)]
    pub cpu_core: Option<usize>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    pub log_level: String,

    /// Emit JSON logs
    #[arg(long)]
    pub json_logs: bool,
}

/// Install SIGINT/SIGTERM handlers that flip the run flag.
pub fn install_signal_handlers(run: &RunFlag) -> Result<()> {
    signal_hook::flag::register(signal_hook::consts::SIGINT, run.raw())?;
    signal_hook::flag::register(signal_hook::consts::SIGTERM, run.raw())?;
    Ok(())
}

/// Best-effort performance setup: memory locking plus optional pinning.
pub fn setup_performance(cpu_core: Option<usize>) {
    if let Err(e) = fen_core::perf::lock_memory() {
        tracing::warn!("mlockall failed ({}); pages may swap", e);
    }
    if let Some(core) = cpu_core {
        if let Err(e) = fen_core::perf::pin_to_core(core) {
            tracing::warn!("CPU pinning failed: {}", e);
        }
    }
}
