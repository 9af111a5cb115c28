//! Centralized configuration for the gateway.
//!
//! Capacities and wire-level constants are compile-time; anything the
//! strategy side also maps (ring sizes, the shm name) lives here so there is
//! exactly one place that defines the bus geometry.

// ===== SHARED-MEMORY BUS =====

/// POSIX shared-memory object name (maps to `/dev/shm/nowcore_bridge`).
pub const SHM_NAME: &str = "nowcore_bridge";

/// Market ring capacity. 2^13 frames holds a few seconds of a busy
/// USDⓈ-M stream and is small enough to stay hot in L2.
pub const MARKET_RING_CAPACITY: usize = 8192;

/// Command ring capacity (strategy → gateway). 2^7 absorbs command bursts.
pub const COMMAND_RING_CAPACITY: usize = 128;

/// Event ring capacity (gateway → strategy). 2^10 absorbs fill storms.
pub const EVENT_RING_CAPACITY: usize = 1024;

// ===== WEBSOCKET =====

/// Fixed per-connection receive buffer. A single frame larger than this is
/// a fatal condition for the connection.
pub const WS_BUFFER_SIZE: usize = 4 * 1024 * 1024;

/// Interval between unsolicited client PINGs.
pub const PING_INTERVAL_NS: u64 = 10 * 1_000_000_000;

// ===== EVENT LOOP =====

/// Readiness wait timeout per loop iteration.
pub const POLL_TIMEOUT_MS: i32 = 100;

/// listenKey must be refreshed before the exchange expires it (60 min);
/// refresh at half that.
pub const LISTEN_KEY_REFRESH_NS: u64 = 30 * 60 * 1_000_000_000;

// ===== REST =====

/// REST API base for USDⓈ-M futures.
pub const REST_BASE_URL: &str = "https://fapi.binance.com";

/// Market / user stream host.
pub const WS_HOST: &str = "fstream.binance.com";
pub const WS_PORT: u16 = 443;

/// Request validity window sent with every signed request.
pub const RECV_WINDOW_MS: u64 = 10_000;

pub const REST_CONNECT_TIMEOUT_MS: u64 = 5_000;
pub const REST_TOTAL_TIMEOUT_MS: u64 = 10_000;

// ===== EXECUTION =====

/// REST worker pool size. Each in-flight order operation occupies one
/// worker; the pool bounds concurrent exchange requests.
pub const REST_WORKER_THREADS: usize = 4;

/// Event-ring full: the writer retries this many times (1 ms apart) before
/// declaring the strategy reader dead and stopping the gateway.
pub const EVENT_RING_RETRY_LIMIT: u32 = 64;

/// Internal submission queue depth between producers and the event writer.
pub const EVENT_QUEUE_DEPTH: usize = 1024;

/// `strategy_status` value that requests a cancel-all at gateway startup.
pub const STRATEGY_STATUS_EMERGENCY_FLUSH: i32 = 99;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ring_capacities_are_powers_of_two() {
        assert!(MARKET_RING_CAPACITY.is_power_of_two());
        assert!(COMMAND_RING_CAPACITY.is_power_of_two());
        assert!(EVENT_RING_CAPACITY.is_power_of_two());
    }

    #[test]
    fn intervals_are_sane() {
        // Refresh twice per exchange-side listenKey lifetime.
        assert!(LISTEN_KEY_REFRESH_NS <= 30 * 60 * 1_000_000_000);
        assert!(PING_INTERVAL_NS >= 1_000_000_000);
        assert!(POLL_TIMEOUT_MS > 0);
    }
}
