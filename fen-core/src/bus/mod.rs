//! The shared-memory bus: layout, ring protocols, and the mapping itself.

pub mod layout;
pub mod rings;
pub mod shm;

pub use layout::{AccountSnapshot, BusLayout, CommandFrame, CommandRing, EventRing, MarketFrame, OrderEventFrame};
pub use rings::{MarketCursor, MarketRing, RingError, SpscRing};
pub use shm::Bus;
