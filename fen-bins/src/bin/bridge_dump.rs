//! Inspect a live bus: ring indices, account snapshot, recent market
//! frames. Attaches without resetting anything, so it is safe to run next
//! to a live gateway.

use anyhow::Result;
use clap::Parser;
use fen_core::core::types::MarketKind;
use fen_core::Bus;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// How many recent market frames to print
    #[arg(short, long, default_value = "8")]
    frames: usize,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let bus = Bus::attach()?;
    let layout = bus.layout();

    println!("bus: {}", bus.path().display());
    println!(
        "market ring:  write_index={}",
        layout.market.write_index()
    );
    println!(
        "command ring: write_idx={} read_idx={} depth={}",
        layout.commands.write_idx(),
        layout.commands.read_idx(),
        layout.commands.len()
    );
    println!(
        "event ring:   write_idx={} read_idx={} depth={}",
        layout.events.write_idx(),
        layout.events.read_idx(),
        layout.events.len()
    );

    let account = &layout.account;
    println!(
        "account: usdt={:.4} position={:.6} avg_price={:.4}",
        account.usdt_balance(),
        account.position_amt(),
        account.avg_price()
    );
    println!(
        "precision: price={} quantity={}",
        account
            .price_precision
            .load(std::sync::atomic::Ordering::Acquire),
        account
            .quantity_precision
            .load(std::sync::atomic::Ordering::Acquire)
    );
    println!(
        "liveness: gateway={} strategy={} health_ns={} status={}",
        account
            .gateway_alive
            .load(std::sync::atomic::Ordering::Acquire),
        account
            .strategy_alive
            .load(std::sync::atomic::Ordering::Acquire),
        account
            .system_health_ns
            .load(std::sync::atomic::Ordering::Acquire),
        account
            .strategy_status
            .load(std::sync::atomic::Ordering::Acquire),
    );

    let recent = layout.market.recent(args.frames);
    if recent.is_empty() {
        println!("no market frames yet");
        return Ok(());
    }
    println!("last {} market frames:", recent.len());
    for f in recent {
        let kind = match f.kind {
            k if k == MarketKind::Trade as i32 => "trade",
            k if k == MarketKind::BookTicker as i32 => "book ",
            k if k == MarketKind::Liquidation as i32 => "liq  ",
            _ => "?    ",
        };
        println!(
            "  [{}] t_exch={} px={:.4} qty={:.6} bid={:.4}x{:.4} ask={:.4}x{:.4} side={}",
            kind, f.t_exch_ns, f.price, f.quantity, f.bid_p, f.bid_q, f.ask_p, f.ask_q, f.side
        );
    }

    Ok(())
}
