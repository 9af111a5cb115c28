//! Layout and bit-compatibility checks for the mapped bus: both processes
//! must read identical bytes, so sizes, alignment, and round-trips through
//! the mapping are protocol tests, not implementation details.

use std::mem::{align_of, size_of};

use fen_core::bus::{Bus, BusLayout, CommandFrame, MarketCursor, MarketFrame, OrderEventFrame};
use fen_core::core::fixed_str;
use fen_core::core::types::{side, CommandAction, EventKind, MarketKind, OrderKind, Tif};

fn bus_pair() -> (Bus, Bus, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fen_layout_bus");
    let creator = Bus::create_at(&path).unwrap();
    creator.layout().reset();
    let peer = Bus::attach_at(&path).unwrap();
    (creator, peer, dir)
}

#[test]
fn layout_geometry_is_stable() {
    assert_eq!(align_of::<BusLayout>(), 64);
    assert_eq!(size_of::<MarketFrame>(), 128);
    assert_eq!(size_of::<CommandFrame>(), 192);
    assert_eq!(size_of::<OrderEventFrame>(), 192);
    assert_eq!(size_of::<BusLayout>() % 64, 0);
    // The market ring dominates; sanity-check the overall footprint is in
    // the expected couple-of-MiB range, not accidentally huge.
    assert!(size_of::<BusLayout>() < 4 * 1024 * 1024);
}

#[test]
fn market_frame_round_trips_bit_exact_across_mappings() {
    let (gateway, strategy, _dir) = bus_pair();

    let mut frame = MarketFrame::zeroed();
    frame.t_exch_ns = 1_700_000_000_000_000_000;
    frame.t_local_ns = 1_700_000_000_000_123_456;
    frame.price = 250.10;
    frame.quantity = 0.50;
    frame.bid_p = 249.99;
    frame.ask_p = 250.01;
    frame.bid_q = 3.0;
    frame.ask_q = 2.5;
    frame.kind = MarketKind::BookTicker as i32;
    frame.side = side::SELL;

    gateway.layout().market.publish(frame);

    let mut cursor = MarketCursor::new();
    let seen = cursor.poll(&strategy.layout().market).unwrap();
    assert_eq!(seen, frame);
}

#[test]
fn command_frame_round_trips_through_the_command_ring() {
    let (gateway, strategy, _dir) = bus_pair();

    // The strategy side produces commands; the gateway side consumes.
    let mut cmd = CommandFrame::zeroed();
    cmd.request_id = 7;
    cmd.trigger_ms = 1_700_000_000_123;
    cmd.client_order_id = fixed_str::pack("cid-1");
    cmd.parent_order_id = fixed_str::pack("parent-1");
    cmd.symbol = fixed_str::pack("BNBUSDT");
    cmd.action = CommandAction::New as i32;
    cmd.kind = OrderKind::Limit as i32;
    cmd.side = side::BUY;
    cmd.tif = Tif::Gtc as i32;
    cmd.price = 250.00;
    cmd.quantity = 0.10;

    strategy.layout().commands.try_push(cmd).unwrap();

    let seen = gateway.layout().commands.try_pop().unwrap();
    assert_eq!(seen.request_id, 7);
    assert_eq!(seen.trigger_ms, 1_700_000_000_123);
    assert_eq!(fixed_str::unpack(&seen.client_order_id), "cid-1");
    assert_eq!(fixed_str::unpack(&seen.parent_order_id), "parent-1");
    assert_eq!(fixed_str::unpack(&seen.symbol), "BNBUSDT");
    assert_eq!(seen.action, CommandAction::New as i32);
    assert_eq!(seen.kind, OrderKind::Limit as i32);
    assert_eq!(seen.side, side::BUY);
    assert_eq!(seen.tif, Tif::Gtc as i32);
    assert_eq!(seen.price, 250.00);
    assert_eq!(seen.quantity, 0.10);
}

#[test]
fn event_frame_round_trips_through_the_event_ring() {
    let (gateway, strategy, _dir) = bus_pair();

    let mut event = OrderEventFrame::zeroed();
    event.timestamp_ns = 1_700_000_001_000_000_000;
    event.trigger_ms = 1_700_000_000_123;
    event.last_update_id = 42;
    event.fill_price = 250.00;
    event.fill_qty = 0.10;
    event.remaining_qty = 0.0;
    event.client_order_id = fixed_str::pack("cid-1");
    event.error_msg = fixed_str::pack("Margin is insufficient.");
    event.event_type = EventKind::FullFill as i32;
    event.side = side::BUY;
    event.error_code = -2019;
    event.is_maker = 1;

    gateway.layout().events.try_push(event).unwrap();

    let seen = strategy.layout().events.try_pop().unwrap();
    assert_eq!(seen.timestamp_ns, event.timestamp_ns);
    assert_eq!(seen.last_update_id, 42);
    assert_eq!(seen.fill_price, 250.00);
    assert_eq!(fixed_str::unpack(&seen.error_msg), "Margin is insufficient.");
    assert_eq!(seen.event_type, EventKind::FullFill as i32);
    assert_eq!(seen.error_code, -2019);
    assert_eq!(seen.is_maker, 1);
}

#[test]
fn reset_zeroes_every_observable_field() {
    let (gateway, strategy, _dir) = bus_pair();

    // Dirty the bus from both sides.
    gateway.layout().market.publish(MarketFrame::zeroed());
    strategy
        .layout()
        .commands
        .try_push(CommandFrame::zeroed())
        .unwrap();
    gateway
        .layout()
        .events
        .try_push(OrderEventFrame::zeroed())
        .unwrap();
    gateway.layout().account.set_usdt_balance(1000.0);
    gateway.layout().account.set_precisions(2, 3);

    gateway.layout().reset();

    let layout = strategy.layout();
    assert_eq!(layout.market.write_index(), 0);
    assert_eq!(layout.commands.write_idx(), 0);
    assert_eq!(layout.commands.read_idx(), 0);
    assert_eq!(layout.events.write_idx(), 0);
    assert_eq!(layout.events.read_idx(), 0);
    assert_eq!(layout.account.usdt_balance(), 0.0);
    assert_eq!(
        layout
            .account
            .price_precision
            .load(std::sync::atomic::Ordering::Acquire),
        0
    );
}
