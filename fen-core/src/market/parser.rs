//! Stateless, allocation-free extraction of the three public stream shapes.
//!
//! The stream delivers exactly three event kinds after subscription:
//! aggTrade, bookTicker and forceOrder. Shape detection:
//!
//! - an `"e"` field names aggTrade / forceOrder events;
//! - bookTicker has no `"e"` field but always carries `"u"` (book update id).
//!
//! Anything else (subscribe acks, unknown events) parses to `None` and is
//! dropped silently.

use crate::bus::MarketFrame;
use crate::core::clock;
use crate::core::types::{side, MarketKind};
use crate::scan;

const MS_TO_NS: u64 = 1_000_000;

/// Parse one stream message into a frame. `t_local_ns` is stamped here, at
/// parse time. Returns `None` for unknown shapes or missing required fields.
pub fn parse(msg: &[u8]) -> Option<MarketFrame> {
    let mut frame = MarketFrame::zeroed();
    frame.t_local_ns = clock::now_ns();

    if let Some(event) = scan::str_after(msg, b"\"e\":\"") {
        match event {
            b"aggTrade" => parse_agg_trade(msg, &mut frame)?,
            b"forceOrder" => parse_force_order(msg, &mut frame)?,
            // The futures stream tags book ticks with an event name; the
            // combined-stream shape omits it and is handled below.
            b"bookTicker" => parse_book_ticker(msg, &mut frame)?,
            _ => return None,
        }
    } else if scan::find(msg, b"\"u\":").is_some() {
        parse_book_ticker(msg, &mut frame)?;
    } else {
        return None;
    }

    Some(frame)
}

fn parse_agg_trade(msg: &[u8], frame: &mut MarketFrame) -> Option<()> {
    frame.kind = MarketKind::Trade as i32;
    frame.price = scan::f64_after(msg, b"\"p\":\"")?;
    frame.quantity = scan::f64_after(msg, b"\"q\":\"")?;

    // m=true: the maker was the buyer, so the aggressor sold. Flipping this
    // silently corrupts every downstream direction signal.
    match scan::bool_after(msg, b"\"m\":") {
        Some(true) => frame.side = side::SELL,
        Some(false) => frame.side = side::BUY,
        None => frame.side = side::NONE,
    }

    if let Some(t_ms) = scan::u64_after(msg, b"\"T\":") {
        frame.t_exch_ns = t_ms * MS_TO_NS;
    }
    Some(())
}

fn parse_book_ticker(msg: &[u8], frame: &mut MarketFrame) -> Option<()> {
    frame.kind = MarketKind::BookTicker as i32;
    frame.bid_p = scan::f64_after(msg, b"\"b\":\"")?;
    frame.ask_p = scan::f64_after(msg, b"\"a\":\"")?;
    frame.bid_q = scan::f64_after(msg, b"\"B\":\"").unwrap_or(0.0);
    frame.ask_q = scan::f64_after(msg, b"\"A\":\"").unwrap_or(0.0);
    if let Some(t_ms) = scan::u64_after(msg, b"\"T\":") {
        frame.t_exch_ns = t_ms * MS_TO_NS;
    }
    Some(())
}

fn parse_force_order(msg: &[u8], frame: &mut MarketFrame) -> Option<()> {
    frame.kind = MarketKind::Liquidation as i32;
    // Order details live in the nested "o" object.
    let o_start = scan::find(msg, b"\"o\":")?;
    let order = &msg[o_start..];
    frame.price = scan::f64_after(order, b"\"p\":\"")?;
    frame.quantity = scan::f64_after(order, b"\"q\":\"")?;
    match scan::str_after(order, b"\"S\":\"") {
        Some(b"BUY") => frame.side = side::BUY,
        Some(b"SELL") => frame.side = side::SELL,
        _ => frame.side = side::NONE,
    }
    if let Some(t_ms) = scan::u64_after(order, b"\"T\":") {
        frame.t_exch_ns = t_ms * MS_TO_NS;
    }
    Some(())
}
