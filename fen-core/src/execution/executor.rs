//! Order execution against the futures REST API.
//!
//! The event loop hands commands over and returns to WebSocket intake
//! immediately: every order operation runs on a small fixed worker pool,
//! and its outcome comes back to the strategy as an event-ring frame, never
//! as a return value. Exchange rejections are events; only startup
//! failures (listen key, exchange info) abort the process.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde_json::Value;
use std::sync::atomic::Ordering;
use tracing::{debug, info, warn};

use crate::bus::{Bus, CommandFrame, OrderEventFrame};
use crate::config::constants::REST_WORKER_THREADS;
use crate::core::types::{side, EventKind, OrderKind, Tif};
use crate::core::{clock, fixed_str};
use crate::execution::events::EventSink;
use crate::rest::{Method, Params, RestClient, RestResponse};

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Fixed pool of REST workers. Dropping the pool closes the queue; workers
/// finish in-flight jobs and exit.
struct WorkerPool {
    tx: Option<Sender<Job>>,
    handles: Mutex<Vec<std::thread::JoinHandle<()>>>,
}

impl WorkerPool {
    fn new(threads: usize) -> Self {
        let (tx, rx) = unbounded::<Job>();
        let mut handles = Vec::with_capacity(threads);
        for i in 0..threads {
            let rx: Receiver<Job> = rx.clone();
            let handle = std::thread::Builder::new()
                .name(format!("fen-rest-{}", i))
                .spawn(move || {
                    while let Ok(job) = rx.recv() {
                        job();
                    }
                })
                .expect("spawn rest worker");
            handles.push(handle);
        }
        Self {
            tx: Some(tx),
            handles: Mutex::new(handles),
        }
    }

    fn submit(&self, job: Job) {
        if let Some(tx) = &self.tx {
            if tx.send(job).is_err() {
                warn!("executor: worker pool closed, job dropped");
            }
        }
    }

    fn shutdown(&mut self) {
        self.tx = None;
        for handle in self.handles.lock().drain(..) {
            let _ = handle.join();
        }
    }
}

/// Decimal places implied by a tick/step string: the position of the first
/// non-zero digit after the decimal point, 0 when there is none.
///
/// `"0.0010"` → 3, `"1"` → 0, `"0.00100"` → 3.
pub fn decimals_from_step(step: &str) -> i32 {
    let Some(dot) = step.find('.') else {
        return 0;
    };
    match step[dot + 1..].find(|c: char| c != '0') {
        Some(i) => (i + 1) as i32,
        None => 0,
    }
}

/// Round a price/quantity to the exchange precision for transmission.
pub fn format_with_precision(value: f64, decimals: i32) -> String {
    match Decimal::from_f64(value) {
        Some(d) if decimals >= 0 => d.round_dp(decimals as u32).to_string(),
        _ => value.to_string(),
    }
}

/// `{"code":-2019,"msg":"..."}` → (code, msg). Anything unparseable keeps
/// the body as the message with code -1.
fn parse_error_body(body: &str) -> (i32, String) {
    if let Ok(v) = serde_json::from_str::<Value>(body) {
        let code = v["code"].as_i64().unwrap_or(-1) as i32;
        let msg = v["msg"].as_str().unwrap_or(body).to_string();
        return (code, msg);
    }
    (-1, body.to_string())
}

fn str_field_f64(v: &Value, key: &str) -> f64 {
    v[key].as_str().and_then(|s| s.parse().ok()).unwrap_or(0.0)
}

pub struct Executor {
    rest: Arc<RestClient>,
    bus: Arc<Bus>,
    sink: EventSink,
    pool: WorkerPool,
}

impl Executor {
    pub fn new(rest: Arc<RestClient>, bus: Arc<Bus>, sink: EventSink) -> Self {
        Self {
            rest,
            bus,
            sink,
            pool: WorkerPool::new(REST_WORKER_THREADS),
        }
    }

    /// Drain the worker pool. Outstanding requests finish and publish
    /// their events before this returns.
    pub fn shutdown(&mut self) {
        self.pool.shutdown();
    }

    // ------------------------------------------------------------------
    // Order operations (off-loop, worker pool)
    // ------------------------------------------------------------------

    /// POST /fapi/v1/order. Emits SUBMITTED (or the fill state the
    /// exchange already reports) on 200, REJECTED otherwise.
    pub fn place_order(&self, cmd: &CommandFrame) {
        let mut event = event_from_command(cmd);
        let symbol = fixed_str::unpack(&cmd.symbol).to_string();
        let cid = fixed_str::unpack(&cmd.client_order_id).to_string();

        let Some(side_str) = side::as_api(cmd.side) else {
            self.reject_invalid(event, -1, "invalid side");
            return;
        };
        let Some(kind) = OrderKind::from_i32(cmd.kind) else {
            self.reject_invalid(event, -1, "invalid order type");
            return;
        };

        let price_prec = self.bus.layout().account.price_precision.load(Ordering::Acquire);
        let qty_prec = self
            .bus
            .layout()
            .account
            .quantity_precision
            .load(Ordering::Acquire);

        let mut params = Params::new()
            .push("symbol", &symbol)
            .push("side", side_str)
            .push("type", kind.as_api())
            .push("quantity", format_with_precision(cmd.quantity, qty_prec));
        if kind == OrderKind::Limit {
            params.add("price", format_with_precision(cmd.price, price_prec));
            let tif = Tif::from_i32(cmd.tif).unwrap_or(Tif::Gtc);
            params.add("timeInForce", tif.as_api());
        }
        params.add("newClientOrderId", &cid);

        let quantity = cmd.quantity;
        let rest = self.rest.clone();
        let sink = self.sink.clone();
        self.pool.submit(Box::new(move || {
            let resp = rest.request(Method::Post, "/fapi/v1/order", &params, true);
            event.timestamp_ns = clock::now_ns();
            if resp.is_ok() {
                fill_from_order_response(&mut event, &resp, quantity);
                info!(
                    "order {} accepted ({})",
                    cid,
                    EventKind::from_i32(event.event_type)
                        .map(|k| k.to_string())
                        .unwrap_or_default()
                );
            } else {
                reject_from_response(&mut event, &resp);
                warn!("order {} rejected: HTTP {} {}", cid, resp.status, resp.body);
            }
            sink.publish(event);
        }));
    }

    /// DELETE /fapi/v1/order by client order id.
    pub fn cancel_order(&self, cmd: &CommandFrame) {
        let mut event = event_from_command(cmd);
        let symbol = fixed_str::unpack(&cmd.symbol).to_string();
        let cid = fixed_str::unpack(&cmd.client_order_id).to_string();

        let params = Params::new()
            .push("symbol", &symbol)
            .push("origClientOrderId", &cid);

        let rest = self.rest.clone();
        let sink = self.sink.clone();
        self.pool.submit(Box::new(move || {
            let resp = rest.request(Method::Delete, "/fapi/v1/order", &params, true);
            event.timestamp_ns = clock::now_ns();
            if resp.is_ok() {
                event.event_type = EventKind::Canceled as i32;
                info!("order {} canceled", cid);
            } else {
                reject_from_response(&mut event, &resp);
                warn!("cancel {} failed: HTTP {} {}", cid, resp.status, resp.body);
            }
            sink.publish(event);
        }));
    }

    /// PUT /fapi/v1/order: price/quantity modification.
    pub fn amend_order(&self, cmd: &CommandFrame) {
        let mut event = event_from_command(cmd);
        let symbol = fixed_str::unpack(&cmd.symbol).to_string();
        let cid = fixed_str::unpack(&cmd.client_order_id).to_string();

        let Some(side_str) = side::as_api(cmd.side) else {
            self.reject_invalid(event, -1, "invalid side");
            return;
        };

        let price_prec = self.bus.layout().account.price_precision.load(Ordering::Acquire);
        let qty_prec = self
            .bus
            .layout()
            .account
            .quantity_precision
            .load(Ordering::Acquire);

        let params = Params::new()
            .push("symbol", &symbol)
            .push("origClientOrderId", &cid)
            .push("side", side_str)
            .push("quantity", format_with_precision(cmd.new_quantity, qty_prec))
            .push("price", format_with_precision(cmd.new_price, price_prec));

        let new_price = cmd.new_price;
        let new_quantity = cmd.new_quantity;
        let rest = self.rest.clone();
        let sink = self.sink.clone();
        self.pool.submit(Box::new(move || {
            let resp = rest.request(Method::Put, "/fapi/v1/order", &params, true);
            event.timestamp_ns = clock::now_ns();
            if resp.is_ok() {
                event.event_type = EventKind::Amended as i32;
                event.fill_price = new_price;
                event.remaining_qty = new_quantity;
                info!("order {} amended to {}@{}", cid, new_quantity, new_price);
            } else {
                reject_from_response(&mut event, &resp);
                warn!("amend {} failed: HTTP {} {}", cid, resp.status, resp.body);
            }
            sink.publish(event);
        }));
    }

    /// DELETE /fapi/v1/allOpenOrders. Fire-and-forget: emits no events;
    /// per-order cancellations arrive on the user stream.
    pub fn cancel_all(&self, symbol: &str) {
        let params = Params::new().push("symbol", symbol);
        let symbol = symbol.to_string();
        let rest = self.rest.clone();
        self.pool.submit(Box::new(move || {
            let resp = rest.request(Method::Delete, "/fapi/v1/allOpenOrders", &params, true);
            if resp.is_ok() {
                info!("cancel-all done for {}", symbol);
            } else {
                warn!(
                    "cancel-all for {} failed: HTTP {} {}",
                    symbol, resp.status, resp.body
                );
            }
        }));
    }

    fn reject_invalid(&self, mut event: OrderEventFrame, code: i32, msg: &str) {
        event.timestamp_ns = clock::now_ns();
        event.event_type = EventKind::Rejected as i32;
        event.error_code = code;
        event.error_msg = fixed_str::pack(msg);
        warn!(
            "command for {} dropped: {}",
            fixed_str::unpack(&event.client_order_id),
            msg
        );
        self.sink.publish(event);
    }

    // ------------------------------------------------------------------
    // Startup-path operations (inline, caller's thread)
    // ------------------------------------------------------------------

    /// Force one-way position mode. Best-effort: the exchange answers with
    /// an error when the mode is already set.
    pub fn set_one_way_mode(&self) {
        let params = Params::new().push("dualSidePosition", "false");
        let resp = self
            .rest
            .request(Method::Post, "/fapi/v1/positionSide/dual", &params, true);
        if resp.is_ok() {
            info!("one-way position mode set");
        } else {
            warn!(
                "could not set one-way position mode: HTTP {} {}",
                resp.status, resp.body
            );
        }
    }

    /// Force leverage for the trading symbol. Best-effort.
    pub fn set_leverage(&self, symbol: &str, leverage: u32) {
        let params = Params::new()
            .push("symbol", symbol)
            .push("leverage", leverage);
        let resp = self.rest.request(Method::Post, "/fapi/v1/leverage", &params, true);
        if resp.is_ok() {
            info!("leverage {}x set for {}", leverage, symbol);
        } else {
            warn!(
                "could not set leverage for {}: HTTP {} {}",
                symbol, resp.status, resp.body
            );
        }
    }

    /// POST /fapi/v1/listenKey. Required for the user stream; failure here
    /// is a fatal startup error.
    pub fn create_listen_key(&self) -> Result<String> {
        let resp = self
            .rest
            .request(Method::Post, "/fapi/v1/listenKey", &Params::new(), false);
        if !resp.is_ok() {
            bail!("listenKey request failed: HTTP {} {}", resp.status, resp.body);
        }
        let v: Value = serde_json::from_str(&resp.body)
            .with_context(|| format!("listenKey response unparseable: {}", resp.body))?;
        let key = v["listenKey"]
            .as_str()
            .with_context(|| format!("listenKey missing in response: {}", resp.body))?;
        Ok(key.to_string())
    }

    /// PUT /fapi/v1/listenKey, off-loop. A failed renewal degrades the user
    /// stream but must not take down market processing.
    pub fn refresh_listen_key(&self) {
        let rest = self.rest.clone();
        self.pool.submit(Box::new(move || {
            let resp = rest.request(Method::Put, "/fapi/v1/listenKey", &Params::new(), false);
            if resp.is_ok() {
                debug!("listenKey refreshed");
            } else {
                warn!(
                    "listenKey refresh failed: HTTP {} {} (user stream may go stale)",
                    resp.status, resp.body
                );
            }
        }));
    }

    /// GET /fapi/v2/account: USDT free balance plus the position line for
    /// the trading symbol, stored into the snapshot with release ordering.
    pub fn fetch_account_info(&self, symbol: &str) -> Result<()> {
        let resp = self
            .rest
            .request(Method::Get, "/fapi/v2/account", &Params::new(), true);
        if !resp.is_ok() {
            bail!("account fetch failed: HTTP {} {}", resp.status, resp.body);
        }
        let v: Value =
            serde_json::from_str(&resp.body).context("account response unparseable")?;

        let account = &self.bus.layout().account;

        if let Some(assets) = v["assets"].as_array() {
            for asset in assets {
                if asset["asset"].as_str() == Some("USDT") {
                    // Spot-style payloads call it "free"; the futures
                    // account calls it "availableBalance".
                    let free = asset
                        .get("free")
                        .and_then(|x| x.as_str())
                        .or_else(|| asset.get("availableBalance").and_then(|x| x.as_str()))
                        .and_then(|s| s.parse().ok())
                        .unwrap_or(0.0);
                    account.set_usdt_balance(free);
                }
            }
        }

        if let Some(positions) = v["positions"].as_array() {
            for position in positions {
                if position["symbol"].as_str() == Some(symbol) {
                    account.set_position_amt(str_field_f64(position, "positionAmt"));
                    account.set_avg_price(str_field_f64(position, "entryPrice"));
                }
            }
        }

        info!(
            "account: usdt={} position={} avg_price={}",
            account.usdt_balance(),
            account.position_amt(),
            account.avg_price()
        );
        Ok(())
    }

    /// GET /fapi/v1/exchangeInfo for the symbol; derive price/quantity
    /// precisions from PRICE_FILTER.tickSize and LOT_SIZE.stepSize.
    pub fn fetch_and_set_precision(&self, symbol: &str) -> Result<()> {
        let params = Params::new().push("symbol", symbol);
        let resp = self
            .rest
            .request(Method::Get, "/fapi/v1/exchangeInfo", &params, false);
        if !resp.is_ok() {
            bail!(
                "exchangeInfo fetch failed: HTTP {} {}",
                resp.status,
                resp.body
            );
        }
        let v: Value =
            serde_json::from_str(&resp.body).context("exchangeInfo response unparseable")?;

        let (price_prec, qty_prec) = precisions_from_exchange_info(&v, symbol)
            .with_context(|| format!("no usable filters for {}", symbol))?;

        self.bus.layout().account.set_precisions(price_prec, qty_prec);
        info!(
            "{}: price_precision={} quantity_precision={}",
            symbol, price_prec, qty_prec
        );
        Ok(())
    }
}

/// Locate the symbol entry and its PRICE_FILTER / LOT_SIZE filters.
fn precisions_from_exchange_info(v: &Value, symbol: &str) -> Option<(i32, i32)> {
    let symbols = v["symbols"].as_array()?;
    let entry = symbols
        .iter()
        .find(|s| s["symbol"].as_str() == Some(symbol))?;
    let filters = entry["filters"].as_array()?;

    let mut price_prec = None;
    let mut qty_prec = None;
    for filter in filters {
        match filter["filterType"].as_str() {
            Some("PRICE_FILTER") => {
                price_prec = filter["tickSize"].as_str().map(decimals_from_step);
            }
            Some("LOT_SIZE") => {
                qty_prec = filter["stepSize"].as_str().map(decimals_from_step);
            }
            _ => {}
        }
    }
    Some((price_prec?, qty_prec?))
}

/// Seed an event frame with the identifiers every outcome shares.
fn event_from_command(cmd: &CommandFrame) -> OrderEventFrame {
    let mut event = OrderEventFrame::zeroed();
    event.client_order_id = cmd.client_order_id;
    event.parent_order_id = cmd.parent_order_id;
    event.side = cmd.side;
    event.trigger_ms = cmd.trigger_ms;
    event
}

/// 200-path of an order placement: map the acknowledged state.
fn fill_from_order_response(event: &mut OrderEventFrame, resp: &RestResponse, quantity: f64) {
    let v: Value = match serde_json::from_str(&resp.body) {
        Ok(v) => v,
        Err(_) => {
            event.event_type = EventKind::Submitted as i32;
            event.remaining_qty = quantity;
            return;
        }
    };

    let status = v["status"].as_str().unwrap_or("NEW");
    event.event_type = EventKind::from_exchange_status(status)
        .unwrap_or(EventKind::Submitted) as i32;
    event.fill_qty = str_field_f64(&v, "executedQty");
    event.fill_price = str_field_f64(&v, "avgPrice");
    event.remaining_qty = (quantity - event.fill_qty).max(0.0);
    // last_update_id stays 0: the REST ack has no stream update id, and the
    // strategy de-dups REST-vs-WS on that field.
}

/// Non-200 path: code/msg into a REJECTED frame, message truncated to the
/// 63 bytes the frame can carry.
fn reject_from_response(event: &mut OrderEventFrame, resp: &RestResponse) {
    let (code, msg) = parse_error_body(&resp.body);
    event.event_type = EventKind::Rejected as i32;
    event.error_code = code;
    event.error_msg = fixed_str::pack(&msg);
}
