//! Fen Core - Low-Latency Gateway for Binance USDⓈ-M Futures
//!
//! A single-process gateway that sits between a strategy process and the
//! exchange. Market data arrives over a TLS WebSocket, trading commands
//! arrive from the strategy, and order events flow back, all through a
//! fixed-size shared-memory bus built from lock-free SPSC ring buffers.
//!
//! ## System Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                      FEN GATEWAY PROCESS                      │
//! │                                                               │
//! │  exchange WS ─▶ net::ws ─▶ market::parse ─▶ market ring ────▶ │ strategy
//! │                                                               │
//! │  command ring ─▶ engine (drain) ─▶ execution::Executor        │
//! │                                        │                      │
//! │                            REST workers (signed requests)     │
//! │                                        │                      │
//! │  user WS ─▶ user_stream ─┬─▶ event sink ─▶ event ring ──────▶ │ strategy
//! │                          └ (REST outcomes join here too)      │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Shared-Memory Bus
//!
//! One contiguous region at `/dev/shm/nowcore_bridge`, zeroed by the
//! gateway at startup:
//!
//! - **Market ring** (8192 frames): best-effort broadcast, single monotonic
//!   write index, the consumer resynchronizes after overruns.
//! - **Command ring** (128 frames): reliable SPSC, strategy → gateway.
//! - **Event ring** (1024 frames): reliable SPSC, gateway → strategy.
//! - **Account snapshot**: atomics for balance, position, precisions and
//!   liveness heartbeats.
//!
//! All frames are `#[repr(C)]`, cache-line aligned, plain `Copy` data;
//! the strategy process maps the same region and reads the same bytes.
//!
//! ## Threading Model
//!
//! The event loop is single-threaded: readiness wait (100 ms), WebSocket
//! intake, command drain, heartbeats. REST calls are offloaded to a small
//! fixed worker pool so HTTP latency never stalls market-data intake. All
//! order events funnel through one dedicated writer thread, which is the
//! sole producer of the event ring.

pub mod bus;
pub mod config;
pub mod core;
pub mod engine;
pub mod execution;
pub mod market;
pub mod net;
pub mod perf;
pub mod rest;
pub mod utils;

pub(crate) mod scan;

// Re-export the types the gateway binary and the strategy-side tooling need.
pub use crate::bus::{Bus, BusLayout, CommandFrame, MarketFrame, OrderEventFrame, RingError};
pub use crate::config::Config;
pub use crate::core::clock;
pub use crate::core::types::{CommandAction, EventKind, MarketKind, OrderKind, Tif};
pub use crate::core::RunFlag;

pub use anyhow::{Error, Result};
