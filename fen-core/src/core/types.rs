//! Wire-level enums shared across the bus.
//!
//! Every enum here is `#[repr(i32)]` because the strategy process reads the
//! same shared-memory frames; the discriminants are the protocol, not an
//! implementation detail.

use std::fmt;

/// Command ring `action` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum CommandAction {
    New = 1,
    Cancel = 2,
    Amend = 3,
    CancelAll = 4,
}

impl CommandAction {
    pub fn from_i32(v: i32) -> Option<Self> {
        match v {
            1 => Some(Self::New),
            2 => Some(Self::Cancel),
            3 => Some(Self::Amend),
            4 => Some(Self::CancelAll),
            _ => None,
        }
    }
}

/// Command ring `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum OrderKind {
    Limit = 1,
    Market = 2,
}

impl OrderKind {
    pub fn from_i32(v: i32) -> Option<Self> {
        match v {
            1 => Some(Self::Limit),
            2 => Some(Self::Market),
            _ => None,
        }
    }

    pub fn as_api(self) -> &'static str {
        match self {
            Self::Limit => "LIMIT",
            Self::Market => "MARKET",
        }
    }
}

/// Time-in-force for limit orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum Tif {
    Gtc = 1,
    Ioc = 2,
    Fok = 3,
}

impl Tif {
    pub fn from_i32(v: i32) -> Option<Self> {
        match v {
            1 => Some(Self::Gtc),
            2 => Some(Self::Ioc),
            3 => Some(Self::Fok),
            _ => None,
        }
    }

    pub fn as_api(self) -> &'static str {
        match self {
            Self::Gtc => "GTC",
            Self::Ioc => "IOC",
            Self::Fok => "FOK",
        }
    }
}

/// Event ring `event_type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum EventKind {
    Submitted = 1,
    PartialFill = 2,
    FullFill = 3,
    Canceled = 4,
    Rejected = 5,
    Amended = 6,
}

impl EventKind {
    pub fn from_i32(v: i32) -> Option<Self> {
        match v {
            1 => Some(Self::Submitted),
            2 => Some(Self::PartialFill),
            3 => Some(Self::FullFill),
            4 => Some(Self::Canceled),
            5 => Some(Self::Rejected),
            6 => Some(Self::Amended),
            _ => None,
        }
    }

    /// Map an exchange order status string onto an event kind.
    /// Statuses outside the lifecycle we report map to `None`.
    pub fn from_exchange_status(status: &str) -> Option<Self> {
        match status {
            "NEW" => Some(Self::Submitted),
            "PARTIALLY_FILLED" => Some(Self::PartialFill),
            "FILLED" => Some(Self::FullFill),
            "CANCELED" => Some(Self::Canceled),
            "REJECTED" => Some(Self::Rejected),
            _ => None,
        }
    }
}

/// Market ring `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum MarketKind {
    Trade = 1,
    BookTicker = 2,
    Liquidation = 3,
}

/// Side is carried as a bare i32 on the bus: +1 buy / taker-buy, -1 sell /
/// taker-sell, 0 not applicable.
pub mod side {
    pub const BUY: i32 = 1;
    pub const SELL: i32 = -1;
    pub const NONE: i32 = 0;

    pub fn as_api(side: i32) -> Option<&'static str> {
        match side {
            BUY => Some("BUY"),
            SELL => Some("SELL"),
            _ => None,
        }
    }

    pub fn from_api(s: &str) -> i32 {
        match s {
            "BUY" => BUY,
            "SELL" => SELL,
            _ => NONE,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Submitted => "SUBMITTED",
            Self::PartialFill => "PARTIAL_FILL",
            Self::FullFill => "FULL_FILL",
            Self::Canceled => "CANCELED",
            Self::Rejected => "REJECTED",
            Self::Amended => "AMENDED",
        };
        write!(f, "{}", s)
    }
}
