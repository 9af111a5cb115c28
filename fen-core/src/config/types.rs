//! Runtime configuration assembled from environment variables and CLI flags.

use anyhow::{Context, Result};

/// Everything the gateway needs beyond the compile-time constants.
///
/// API credentials come exclusively from the environment; missing
/// credentials are a fatal startup error.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    pub api_secret: String,
    /// Trading symbol, exchange spelling (e.g. "BNBUSDT").
    pub symbol: String,
    /// Leverage forced at startup (best-effort).
    pub leverage: u32,
}

impl Config {
    /// Read credentials from `BINANCE_API_KEY` / `BINANCE_API_SECRET`.
    pub fn from_env(symbol: &str, leverage: u32) -> Result<Self> {
        let api_key = std::env::var("BINANCE_API_KEY")
            .context("BINANCE_API_KEY environment variable not set")?;
        let api_secret = std::env::var("BINANCE_API_SECRET")
            .context("BINANCE_API_SECRET environment variable not set")?;

        Ok(Self {
            api_key,
            api_secret,
            symbol: symbol.to_uppercase(),
            leverage,
        })
    }

    /// Symbol spelled the way stream names want it.
    pub fn symbol_lower(&self) -> String {
        self.symbol.to_lowercase()
    }

    /// Path of the public market stream with the three subscriptions issued
    /// after connect.
    pub fn public_ws_path(&self) -> String {
        format!("/ws/{}@aggTrade?timeUnit=MICROSECOND", self.symbol_lower())
    }

    /// The SUBSCRIBE payload sent once the public stream is up.
    pub fn subscribe_payload(&self) -> String {
        let s = self.symbol_lower();
        format!(
            "{{\"method\":\"SUBSCRIBE\",\"params\":[\"{s}@aggTrade\",\"{s}@bookTicker\",\"{s}@forceOrder\"],\"id\":1}}"
        )
    }
}
