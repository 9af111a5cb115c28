//! Shared-memory bus layout.
//!
//! The whole bus is one `#[repr(C, align(64))]` struct mapped at a fixed
//! shm path. Both sides of the bridge (this gateway and the strategy
//! process) must agree on these bytes exactly: field order, sizes and the
//! ring capacities are the protocol.
//!
//! All frames are plain `Copy` values (no pointers, no owning references)
//! and every struct is valid when zero-initialized, which is what the
//! startup reset relies on.

use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU64, Ordering};

use crate::bus::rings::{MarketRing, SpscRing};
use crate::config::constants::{COMMAND_RING_CAPACITY, EVENT_RING_CAPACITY};
use crate::core::clock;

/// One market-data observation: a trade, a best-bid/ask tick, or a
/// liquidation. Trade events fill `price`/`quantity`/`side`; book ticks
/// fill the four BBO fields. Two cache lines.
#[repr(C, align(64))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarketFrame {
    /// Exchange event time, nanoseconds since epoch (0 if unknown).
    pub t_exch_ns: u64,
    /// Local receive/parse time, realtime nanoseconds.
    pub t_local_ns: u64,
    pub price: f64,
    pub quantity: f64,
    pub bid_p: f64,
    pub ask_p: f64,
    pub bid_q: f64,
    pub ask_q: f64,
    /// 1 = trade, 2 = bookTicker, 3 = liquidation.
    pub kind: i32,
    /// +1 taker buy, -1 taker sell, 0 n/a.
    pub side: i32,
}

impl MarketFrame {
    #[inline]
    pub fn zeroed() -> Self {
        // SAFETY: all fields are numeric; all-zero is a valid value.
        unsafe { std::mem::zeroed() }
    }
}

/// One trading command from the strategy. 192 bytes.
#[repr(C, align(64))]
#[derive(Debug, Clone, Copy)]
pub struct CommandFrame {
    /// Strategy-assigned, globally increasing; for de-dup and ordering.
    pub request_id: u64,
    /// Exchange timestamp (ms) of the market frame that triggered this
    /// command; propagated end-to-end for latency attribution.
    pub trigger_ms: u64,
    pub client_order_id: [u8; 32],
    pub parent_order_id: [u8; 32],
    pub symbol: [u8; 16],
    /// 1 = NEW, 2 = CANCEL, 3 = AMEND, 4 = CANCEL_ALL.
    pub action: i32,
    /// 1 = LIMIT, 2 = MARKET.
    pub kind: i32,
    /// +1 buy, -1 sell.
    pub side: i32,
    /// 1 = GTC, 2 = IOC, 3 = FOK.
    pub tif: i32,
    pub price: f64,
    /// Base-asset quantity.
    pub quantity: f64,
    pub new_price: f64,
    pub new_quantity: f64,
}

impl CommandFrame {
    #[inline]
    pub fn zeroed() -> Self {
        // SAFETY: numeric fields and byte arrays; all-zero is valid.
        unsafe { std::mem::zeroed() }
    }
}

/// One order lifecycle event for the strategy. 192 bytes.
#[repr(C, align(64))]
#[derive(Debug, Clone, Copy)]
pub struct OrderEventFrame {
    /// Exchange transact time (ns) when available, else local time.
    pub timestamp_ns: u64,
    /// Propagated from the originating command (0 for stream-only events).
    pub trigger_ms: u64,
    /// Exchange update id; the strategy de-dups REST vs WS on this.
    pub last_update_id: u64,
    pub fill_price: f64,
    pub fill_qty: f64,
    pub remaining_qty: f64,
    pub client_order_id: [u8; 32],
    pub parent_order_id: [u8; 32],
    /// NUL-terminated, truncated exchange error message.
    pub error_msg: [u8; 64],
    /// 1=SUBMITTED 2=PARTIAL_FILL 3=FULL_FILL 4=CANCELED 5=REJECTED 6=AMENDED.
    pub event_type: i32,
    pub side: i32,
    pub error_code: i32,
    /// 1 if the order rested as maker.
    pub is_maker: u8,
}

impl OrderEventFrame {
    #[inline]
    pub fn zeroed() -> Self {
        // SAFETY: numeric fields and byte arrays; all-zero is valid.
        unsafe { std::mem::zeroed() }
    }
}

pub type CommandRing = SpscRing<CommandFrame, COMMAND_RING_CAPACITY>;
pub type EventRing = SpscRing<OrderEventFrame, EVENT_RING_CAPACITY>;

/// Account state and liveness, updated out-of-band from the rings.
///
/// f64 fields are stored as bit patterns in `AtomicU64` so cross-process
/// readers get tear-free values with plain acquire loads.
#[repr(C, align(64))]
pub struct AccountSnapshot {
    usdt_balance_bits: AtomicU64,
    position_amt_bits: AtomicU64,
    avg_price_bits: AtomicU64,
    pub price_precision: AtomicI32,
    pub quantity_precision: AtomicI32,
    /// Strategy-owned; opaque to the gateway except the reserved
    /// emergency-flush value checked once at startup.
    pub strategy_status: AtomicI32,
    pub gateway_alive: AtomicBool,
    pub strategy_alive: AtomicBool,
    pub system_health_ns: AtomicU64,
}

impl AccountSnapshot {
    #[inline]
    pub fn set_usdt_balance(&self, v: f64) {
        self.usdt_balance_bits.store(v.to_bits(), Ordering::Release);
    }

    #[inline]
    pub fn usdt_balance(&self) -> f64 {
        f64::from_bits(self.usdt_balance_bits.load(Ordering::Acquire))
    }

    #[inline]
    pub fn set_position_amt(&self, v: f64) {
        self.position_amt_bits.store(v.to_bits(), Ordering::Release);
    }

    #[inline]
    pub fn position_amt(&self) -> f64 {
        f64::from_bits(self.position_amt_bits.load(Ordering::Acquire))
    }

    #[inline]
    pub fn set_avg_price(&self, v: f64) {
        self.avg_price_bits.store(v.to_bits(), Ordering::Release);
    }

    #[inline]
    pub fn avg_price(&self) -> f64 {
        f64::from_bits(self.avg_price_bits.load(Ordering::Acquire))
    }

    #[inline]
    pub fn set_precisions(&self, price: i32, quantity: i32) {
        self.price_precision.store(price, Ordering::Release);
        self.quantity_precision.store(quantity, Ordering::Release);
    }

    /// Heartbeat; monotonic-ish, relaxed is enough.
    #[inline]
    pub fn beat(&self) {
        self.system_health_ns
            .store(clock::now_ns(), Ordering::Relaxed);
    }
}

/// The whole bus. Mapped as one region; the gateway is the sole
/// initializer, the strategy attaches to the same bytes.
#[repr(C, align(64))]
pub struct BusLayout {
    pub market: MarketRing,
    pub commands: CommandRing,
    pub events: EventRing,
    pub account: AccountSnapshot,
}

impl BusLayout {
    /// Unconditionally reset ring indices and the account snapshot to a
    /// known-safe state. Returns the `strategy_status` observed *before*
    /// zeroing so a pending emergency flush survives a gateway restart.
    ///
    /// Frame payloads are deliberately not wiped: with all indices at zero
    /// no slot is addressable, and 1+ MiB of writes at startup buys nothing.
    pub fn reset(&self) -> i32 {
        let prior_status = self.account.strategy_status.load(Ordering::Acquire);

        self.market.reset_index();
        self.commands.reset_indices();
        self.events.reset_indices();

        self.account.set_usdt_balance(0.0);
        self.account.set_position_amt(0.0);
        self.account.set_avg_price(0.0);
        self.account.set_precisions(0, 0);
        self.account.strategy_status.store(0, Ordering::Release);
        self.account.gateway_alive.store(true, Ordering::Release);
        self.account.strategy_alive.store(false, Ordering::Release);
        self.account
            .system_health_ns
            .store(clock::now_ns(), Ordering::Release);

        prior_status
    }

    pub fn new_boxed() -> Box<Self> {
        // SAFETY: every member is valid when zero-initialized.
        unsafe {
            let layout = std::alloc::Layout::new::<Self>();
            let ptr = std::alloc::alloc_zeroed(layout) as *mut Self;
            if ptr.is_null() {
                std::alloc::handle_alloc_error(layout);
            }
            Box::from_raw(ptr)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::{align_of, size_of};

    #[test]
    fn frames_are_cache_line_aligned() {
        assert_eq!(align_of::<MarketFrame>(), 64);
        assert_eq!(align_of::<CommandFrame>(), 64);
        assert_eq!(align_of::<OrderEventFrame>(), 64);
        assert_eq!(align_of::<AccountSnapshot>(), 64);
        assert_eq!(align_of::<BusLayout>(), 64);
    }

    #[test]
    fn frame_sizes_are_fixed() {
        // These sizes are cross-process protocol; a change here breaks the
        // strategy side.
        assert_eq!(size_of::<MarketFrame>(), 128);
        assert_eq!(size_of::<CommandFrame>(), 192);
        assert_eq!(size_of::<OrderEventFrame>(), 192);
    }

    #[test]
    fn bus_size_is_a_multiple_of_a_cache_line() {
        assert_eq!(size_of::<BusLayout>() % 64, 0);
    }

    #[test]
    fn reset_returns_prior_strategy_status_and_zeroes() {
        let bus = BusLayout::new_boxed();
        bus.account.strategy_status.store(99, Ordering::Release);
        bus.account.set_usdt_balance(42.0);
        bus.market.publish(MarketFrame::zeroed());

        let prior = bus.reset();
        assert_eq!(prior, 99);
        assert_eq!(bus.account.strategy_status.load(Ordering::Acquire), 0);
        assert_eq!(bus.account.usdt_balance(), 0.0);
        assert_eq!(bus.market.write_index(), 0);
        assert!(bus.account.gateway_alive.load(Ordering::Acquire));
        assert!(!bus.account.strategy_alive.load(Ordering::Acquire));
        assert!(bus.account.system_health_ns.load(Ordering::Acquire) > 0);
    }

    #[test]
    fn snapshot_f64_round_trips_through_bits() {
        let bus = BusLayout::new_boxed();
        bus.account.set_position_amt(-0.125);
        assert_eq!(bus.account.position_amt(), -0.125);
        bus.account.set_avg_price(250.10);
        assert_eq!(bus.account.avg_price(), 250.10);
    }
}
