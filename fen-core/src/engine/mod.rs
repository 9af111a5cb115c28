//! The gateway engine: startup sequence and the single-threaded event loop.
//!
//! Loop shape, per iteration:
//!
//! 1. heartbeat store into the account snapshot
//! 2. unsolicited PING on both sockets every 10 s
//! 3. listenKey keep-alive every 30 min (off-loop)
//! 4. drain the command ring into the executor
//! 5. readiness wait (100 ms), then pump every readable socket
//!
//! The public stream dying stops the process (it runs supervised; there is
//! no in-process reconnect). The user stream dying only degrades fill
//! reporting; market processing continues.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::bus::Bus;
use crate::config::constants::{
    LISTEN_KEY_REFRESH_NS, PING_INTERVAL_NS, POLL_TIMEOUT_MS, STRATEGY_STATUS_EMERGENCY_FLUSH,
    WS_HOST, WS_PORT,
};
use crate::config::Config;
use crate::core::types::CommandAction;
use crate::core::{clock, fixed_str, RunFlag};
use crate::execution::{parse_order_update, spawn_event_writer, EventSink, EventWriter, Executor};
use crate::market;
use crate::net::{poll, PumpOutcome, WsClient};
use crate::rest::RestClient;

pub struct Gateway {
    cfg: Config,
    run: RunFlag,
    bus: Arc<Bus>,
    executor: Executor,
    sink: EventSink,
    event_writer: EventWriter,
    public_ws: WsClient,
    user_ws: Option<WsClient>,
    last_ping_ns: u64,
    last_key_refresh_ns: u64,
}

impl Gateway {
    /// Bring the whole gateway up: bus, REST session state, listen key,
    /// account snapshot, and both WebSocket streams. Fatal errors here
    /// abort the process with a non-zero exit; the loop has not started.
    pub fn start(cfg: Config, run: RunFlag) -> Result<Self> {
        let bus = Arc::new(Bus::create().context("bus setup failed")?);
        let prior_status = bus.layout().reset();
        info!("bus mapped and zeroed at {}", bus.path().display());

        let rest = Arc::new(RestClient::new(&cfg.api_key, &cfg.api_secret)?);
        let (sink, event_writer) = spawn_event_writer(bus.clone(), run.clone());
        let executor = Executor::new(rest, bus.clone(), sink.clone());

        // Best-effort session state; the exchange rejects no-op changes.
        executor.set_one_way_mode();
        executor.set_leverage(&cfg.symbol, cfg.leverage);

        let listen_key = executor
            .create_listen_key()
            .context("listenKey is required for the user stream")?;
        info!("listenKey obtained ({} chars)", listen_key.len());

        executor
            .fetch_account_info(&cfg.symbol)
            .context("account snapshot fetch failed")?;
        executor
            .fetch_and_set_precision(&cfg.symbol)
            .context("exchangeInfo precision fetch failed")?;

        if prior_status == STRATEGY_STATUS_EMERGENCY_FLUSH {
            warn!("strategy requested emergency flush; cancelling all open orders");
            executor.cancel_all(&cfg.symbol);
        }

        let mut public_ws = WsClient::connect(WS_HOST, WS_PORT, &cfg.public_ws_path(), "public")
            .context("public market stream is required")?;
        public_ws
            .send_text(&cfg.subscribe_payload())
            .context("stream subscription failed")?;

        let user_path = format!("/ws/{}", listen_key);
        let user_ws = match WsClient::connect(WS_HOST, WS_PORT, &user_path, "user") {
            Ok(ws) => Some(ws),
            Err(e) => {
                warn!("user stream unavailable, continuing without fills: {:#}", e);
                None
            }
        };

        // Setup traffic is done; steady state is non-blocking.
        public_ws.set_nonblocking()?;
        if let Some(ws) = &user_ws {
            ws.set_nonblocking()?;
        }

        let now = clock::mono_ns();
        Ok(Self {
            cfg,
            run,
            bus,
            executor,
            sink,
            event_writer,
            public_ws,
            user_ws,
            last_ping_ns: now,
            last_key_refresh_ns: now,
        })
    }

    /// The event loop. Returns after a clean shutdown request; the bus is
    /// unmapped and unlinked on the way out.
    pub fn run(mut self) -> Result<()> {
        info!("gateway up, entering event loop ({})", self.cfg.symbol);

        while self.run.is_running() {
            self.bus.layout().account.beat();
            // Intervals run on the monotonic clock; wall time is only for
            // exchange-facing payloads.
            let mono = clock::mono_ns();

            if mono.saturating_sub(self.last_ping_ns) >= PING_INTERVAL_NS {
                self.send_pings();
                self.last_ping_ns = mono;
            }

            if mono.saturating_sub(self.last_key_refresh_ns) >= LISTEN_KEY_REFRESH_NS {
                self.executor.refresh_listen_key();
                self.last_key_refresh_ns = mono;
            }

            self.drain_commands();

            let mut fds = vec![self.public_ws.raw_fd()];
            if let Some(ws) = &self.user_ws {
                fds.push(ws.raw_fd());
            }
            let mask = match poll::wait_readable(&fds, POLL_TIMEOUT_MS) {
                Ok(mask) => mask,
                Err(e) => {
                    self.run.stop(&format!("poll failed: {}", e));
                    break;
                }
            };

            if mask & 0b01 != 0 {
                self.pump_public();
            }
            if mask & 0b10 != 0 {
                self.pump_user();
            }
        }

        self.teardown();
        Ok(())
    }

    fn send_pings(&mut self) {
        // Payload is the realtime stamp so a capture shows one-way delay.
        let payload = clock::now_ns().to_string();
        if let Err(e) = self.public_ws.send_ping(payload.as_bytes()) {
            self.run.stop(&format!("public ping failed: {}", e));
            return;
        }
        if let Some(ws) = self.user_ws.as_mut() {
            if let Err(e) = ws.send_ping(payload.as_bytes()) {
                warn!("user ping failed, dropping user stream: {}", e);
                self.user_ws = None;
            }
        }
    }

    /// Pop every pending command and hand it to the executor. The network
    /// call is asynchronous, so the ring slot is released immediately.
    fn drain_commands(&mut self) {
        while let Some(cmd) = self.bus.layout().commands.try_pop() {
            match CommandAction::from_i32(cmd.action) {
                Some(CommandAction::New) => self.executor.place_order(&cmd),
                Some(CommandAction::Cancel) => self.executor.cancel_order(&cmd),
                Some(CommandAction::Amend) => self.executor.amend_order(&cmd),
                Some(CommandAction::CancelAll) => {
                    self.executor.cancel_all(fixed_str::unpack(&cmd.symbol));
                }
                None => warn!(
                    "dropping command {} with unknown action {}",
                    cmd.request_id, cmd.action
                ),
            }
        }
    }

    fn pump_public(&mut self) {
        let bus = self.bus.clone();
        let result = self.public_ws.pump(|msg| {
            if let Some(frame) = market::parse(msg) {
                bus.layout().market.publish(frame);
            }
        });
        match result {
            Ok(PumpOutcome::Idle) => {}
            Ok(PumpOutcome::Closed) => self.run.stop("public websocket closed"),
            Err(e) => self.run.stop(&format!("public websocket error: {:#}", e)),
        }
    }

    fn pump_user(&mut self) {
        let Some(ws) = self.user_ws.as_mut() else {
            return;
        };
        let sink = self.sink.clone();
        let result = ws.pump(|msg| {
            if let Some(event) = parse_order_update(msg) {
                sink.publish(event);
            }
        });
        match result {
            Ok(PumpOutcome::Idle) => {}
            Ok(PumpOutcome::Closed) => {
                warn!("user stream closed; continuing without fill events");
                self.user_ws = None;
            }
            Err(e) => {
                warn!("user stream error ({:#}); continuing without fill events", e);
                self.user_ws = None;
            }
        }
    }

    /// Orderly teardown: close sockets, let outstanding REST workers finish
    /// (their events still reach the ring), then unmap and unlink the bus.
    fn teardown(self) {
        info!("gateway shutting down");
        let Gateway {
            mut public_ws,
            user_ws,
            mut executor,
            sink,
            event_writer,
            bus,
            ..
        } = self;

        public_ws.close();
        if let Some(mut ws) = user_ws {
            ws.close();
        }

        executor.shutdown();
        drop(executor);
        drop(sink);
        event_writer.join();

        drop(bus);
        info!("gateway exited cleanly");
    }
}
