//! User data stream: ORDER_TRADE_UPDATE → order event frames.
//!
//! Only `ORDER_TRADE_UPDATE` events are processed; everything else on the
//! user stream (account updates, margin calls, listen-key expiry notices)
//! is skipped. De-duplication against REST-sourced events is the strategy's
//! job, keyed on `last_update_id`.

use crate::bus::OrderEventFrame;
use crate::core::fixed_str;
use crate::core::types::{side, EventKind};
use crate::scan;

const MS_TO_NS: u64 = 1_000_000;

/// Parse one user-stream message. Returns `None` for non-order events,
/// unknown statuses, or frames missing the client order id.
pub fn parse_order_update(msg: &[u8]) -> Option<OrderEventFrame> {
    if scan::find(msg, b"\"e\":\"ORDER_TRADE_UPDATE\"").is_none() {
        return None;
    }
    let o_start = scan::find(msg, b"\"o\":")?;
    let order = &msg[o_start..];

    let status = scan::str_after(order, b"\"X\":\"")?;
    let kind = EventKind::from_exchange_status(std::str::from_utf8(status).ok()?)?;

    let client_order_id = scan::str_after(order, b"\"c\":\"")?;

    let mut event = OrderEventFrame::zeroed();
    event.event_type = kind as i32;
    event.client_order_id = fixed_str::pack(std::str::from_utf8(client_order_id).ok()?);

    event.fill_price = scan::f64_after(order, b"\"L\":\"").unwrap_or(0.0);
    event.fill_qty = scan::f64_after(order, b"\"l\":\"").unwrap_or(0.0);

    let original_qty = scan::f64_after(order, b"\"q\":\"").unwrap_or(0.0);
    let cumulative_qty = scan::f64_after(order, b"\"z\":\"").unwrap_or(0.0);
    event.remaining_qty = (original_qty - cumulative_qty).max(0.0);

    if let Some(t_ms) = scan::u64_after(order, b"\"T\":") {
        event.timestamp_ns = t_ms * MS_TO_NS;
    }
    event.last_update_id = scan::u64_after(order, b"\"u\":").unwrap_or(0);
    event.is_maker = u8::from(scan::bool_after(order, b"\"m\":") == Some(true));

    event.side = match scan::str_after(order, b"\"S\":\"") {
        Some(b"BUY") => side::BUY,
        Some(b"SELL") => side::SELL,
        _ => side::NONE,
    };

    Some(event)
}
