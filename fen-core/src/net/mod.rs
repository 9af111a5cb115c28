//! Network plumbing: TLS transport, WebSocket framing, readiness wait.

pub mod codec;
pub mod poll;
pub mod tls;
pub mod ws;

pub use tls::TlsStream;
pub use ws::{PumpOutcome, WsClient};
