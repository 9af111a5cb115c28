//! The live gateway process.
//!
//! Reads API credentials from the environment, maps the shared-memory bus,
//! connects market and user streams, and runs the event loop until
//! SIGINT/SIGTERM. Exit code 0 on a clean shutdown; startup failures exit
//! non-zero with the error on stderr.

use anyhow::Result;
use clap::Parser;
use fen_bins::common::{install_signal_handlers, setup_performance, CommonArgs};
use fen_core::engine::Gateway;
use fen_core::utils::logger::init_logger;
use fen_core::{Config, RunFlag};

fn main() -> Result<()> {
    let args = CommonArgs::parse();
    init_logger(&args.log_level, args.json_logs);

    let run = RunFlag::new();
    install_signal_handlers(&run)?;
    setup_performance(args.cpu_core);

    let cfg = Config::from_env(&args.symbol, args.leverage)?;
    tracing::info!(
        "starting gateway: symbol={} leverage={}x",
        cfg.symbol,
        cfg.leverage
    );

    let gateway = Gateway::start(cfg, run)?;
    gateway.run()
}
