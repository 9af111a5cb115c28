//! RFC 6455 client over the TLS transport.
//!
//! One fixed 4 MiB receive buffer per connection. Incoming bytes land at a
//! moving offset, complete frames are parsed in place, and whatever trails
//! as a partial frame is moved to the buffer start for the next readiness
//! event. A single frame larger than the buffer kills the connection.

use anyhow::{bail, Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use rand::RngCore;
use tracing::{debug, trace, warn};

use crate::config::constants::WS_BUFFER_SIZE;
use crate::net::codec::{self, opcode};
use crate::net::tls::TlsStream;
use crate::scan;

/// Outcome of one [`WsClient::pump`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpOutcome {
    /// Socket drained; connection healthy.
    Idle,
    /// Orderly close (CLOSE frame or clean TLS EOF).
    Closed,
}

pub struct WsClient {
    tls: TlsStream,
    buf: Box<[u8]>,
    offset: usize,
    frag: Vec<u8>,
    label: &'static str,
}

impl WsClient {
    /// Connect, upgrade, and leave the socket blocking so setup traffic
    /// (subscriptions) can go out synchronously. Call
    /// [`set_nonblocking`](Self::set_nonblocking) before entering the loop.
    pub fn connect(host: &str, port: u16, path: &str, label: &'static str) -> Result<Self> {
        let tls = TlsStream::connect(host, port)
            .with_context(|| format!("ws[{}]: transport to {} failed", label, host))?;

        let mut client = Self {
            tls,
            buf: vec![0u8; WS_BUFFER_SIZE].into_boxed_slice(),
            offset: 0,
            frag: Vec::new(),
            label,
        };
        client
            .handshake(host, path)
            .with_context(|| format!("ws[{}]: handshake failed", label))?;
        debug!("ws[{}]: connected to {}{}", label, host, path);
        Ok(client)
    }

    fn handshake(&mut self, host: &str, path: &str) -> Result<()> {
        let mut key_bytes = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut key_bytes);
        let key = BASE64.encode(key_bytes);

        let request = format!(
            "GET {path} HTTP/1.1\r\n\
             Host: {host}\r\n\
             Upgrade: websocket\r\n\
             Connection: Upgrade\r\n\
             Sec-WebSocket-Key: {key}\r\n\
             Sec-WebSocket-Version: 13\r\n\r\n"
        );
        self.tls.write_all(request.as_bytes())?;

        // Blocking reads until the response header terminator shows up.
        loop {
            if self.offset >= self.buf.len() {
                bail!("handshake response exceeds buffer");
            }
            let n = self.tls.read(&mut self.buf[self.offset..])?;
            if n == 0 {
                bail!("connection closed during handshake");
            }
            self.offset += n;

            if let Some(end) = scan::find(&self.buf[..self.offset], b"\r\n\r\n") {
                let header = &self.buf[..end];
                if scan::find(header, b"101 Switching Protocols").is_none() {
                    bail!(
                        "unexpected handshake response: {}",
                        String::from_utf8_lossy(&header[..header.len().min(256)])
                    );
                }
                // Any bytes past the header are already WebSocket frames.
                let body_start = end + 4;
                self.buf.copy_within(body_start..self.offset, 0);
                self.offset -= body_start;
                return Ok(());
            }
        }
    }

    pub fn set_nonblocking(&self) -> std::io::Result<()> {
        self.tls.set_nonblocking(true)
    }

    pub fn raw_fd(&self) -> std::os::fd::RawFd {
        self.tls.raw_fd()
    }

    /// Send one masked frame.
    pub fn send(&mut self, op: u8, payload: &[u8]) -> std::io::Result<()> {
        let mut mask = [0u8; 4];
        rand::thread_rng().fill_bytes(&mut mask);
        let frame = codec::encode_frame(op, payload, mask);
        self.tls.write_all(&frame)
    }

    pub fn send_text(&mut self, payload: &str) -> std::io::Result<()> {
        self.send(opcode::TEXT, payload.as_bytes())
    }

    pub fn send_ping(&mut self, payload: &[u8]) -> std::io::Result<()> {
        self.send(opcode::PING, payload)
    }

    /// Drain the socket: read until `WouldBlock`, parsing every complete
    /// frame. Data payloads (defragmented if needed) go to `on_message`;
    /// PINGs are answered inline; CLOSE ends the connection.
    pub fn pump<F: FnMut(&[u8])>(&mut self, mut on_message: F) -> Result<PumpOutcome> {
        loop {
            if self.offset == self.buf.len() {
                bail!("ws[{}]: frame larger than receive buffer", self.label);
            }
            match self.tls.read(&mut self.buf[self.offset..]) {
                Ok(0) => {
                    debug!("ws[{}]: peer closed", self.label);
                    return Ok(PumpOutcome::Closed);
                }
                Ok(n) => {
                    self.offset += n;
                    if self.parse_frames(&mut on_message)? == PumpOutcome::Closed {
                        return Ok(PumpOutcome::Closed);
                    }
                }
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    return Ok(PumpOutcome::Idle);
                }
                Err(e) => {
                    return Err(e).with_context(|| format!("ws[{}]: read failed", self.label));
                }
            }
        }
    }

    fn parse_frames<F: FnMut(&[u8])>(&mut self, on_message: &mut F) -> Result<PumpOutcome> {
        let mut pos = 0usize;
        let total = self.offset;

        while let Some(header) = codec::parse_header(&self.buf[pos..total]) {
            if header.frame_len() > self.buf.len() {
                bail!(
                    "ws[{}]: {}-byte frame exceeds {}-byte buffer",
                    self.label,
                    header.frame_len(),
                    self.buf.len()
                );
            }
            if total - pos < header.frame_len() {
                break;
            }

            let body_start = pos + header.header_len;
            let body_end = pos + header.frame_len();
            if header.masked {
                // Servers must not mask, but unmasking costs nothing.
                let mut key = [0u8; 4];
                key.copy_from_slice(&self.buf[body_start - 4..body_start]);
                codec::apply_mask(&mut self.buf[body_start..body_end], key);
            }

            match header.opcode {
                opcode::PING => {
                    let mut echo = [0u8; 125];
                    let n = (body_end - body_start).min(echo.len());
                    echo[..n].copy_from_slice(&self.buf[body_start..body_start + n]);
                    trace!("ws[{}]: ping, echoing pong", self.label);
                    self.send(opcode::PONG, &echo[..n])?;
                }
                opcode::PONG => {}
                opcode::CLOSE => {
                    debug!("ws[{}]: close frame", self.label);
                    return Ok(PumpOutcome::Closed);
                }
                opcode::TEXT | opcode::BINARY => {
                    if header.fin {
                        on_message(&self.buf[body_start..body_end]);
                    } else {
                        self.frag.clear();
                        self.frag.extend_from_slice(&self.buf[body_start..body_end]);
                    }
                }
                opcode::CONTINUATION => {
                    self.frag.extend_from_slice(&self.buf[body_start..body_end]);
                    if header.fin {
                        on_message(&self.frag);
                        self.frag.clear();
                    }
                }
                other => {
                    warn!("ws[{}]: ignoring opcode {:#x}", self.label, other);
                }
            }

            pos = body_end;
        }

        // Move the trailing partial frame (if any) to the buffer start and
        // remember where the next read should land.
        if pos > 0 {
            self.buf.copy_within(pos..total, 0);
        }
        self.offset = total - pos;
        Ok(PumpOutcome::Idle)
    }

    /// Best-effort orderly close.
    pub fn close(&mut self) {
        let _ = self.send(opcode::CLOSE, &[]);
    }
}
