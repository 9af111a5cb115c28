//! Order event funnel.
//!
//! The event ring is SPSC: exactly one producer. REST workers and the user
//! stream both generate events, so everything goes through a bounded
//! channel consumed by a single writer thread, and that thread is the
//! ring's one producer. A full ring is retried on a bounded budget; exhausting it
//! means the strategy reader is dead, which stops the gateway.

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use tracing::{error, warn};

use crate::bus::{Bus, OrderEventFrame, RingError};
use crate::config::constants::{EVENT_QUEUE_DEPTH, EVENT_RING_RETRY_LIMIT};
use crate::core::RunFlag;

/// Cloneable handle used by anything that produces order events.
#[derive(Clone)]
pub struct EventSink {
    tx: Sender<OrderEventFrame>,
}

impl EventSink {
    /// Hand an event to the writer thread. Blocks briefly if the internal
    /// queue is full; drops (with a log) only when the writer is gone,
    /// which can only happen during shutdown.
    pub fn publish(&self, event: OrderEventFrame) {
        if self.tx.send(event).is_err() {
            warn!("event sink: writer gone, event dropped");
        }
    }
}

/// Join handle for the writer thread.
pub struct EventWriter {
    handle: Option<JoinHandle<()>>,
}

impl EventWriter {
    /// Drain and stop. Call after every `EventSink` clone is dropped.
    pub fn join(mut self) {
        if let Some(h) = self.handle.take() {
            let _ = h.join();
        }
    }
}

/// Spawn the writer thread. The returned sink is the only way to reach the
/// event ring.
pub fn spawn(bus: Arc<Bus>, run: RunFlag) -> (EventSink, EventWriter) {
    let (tx, rx) = bounded::<OrderEventFrame>(EVENT_QUEUE_DEPTH);
    let handle = std::thread::Builder::new()
        .name("fen-event-writer".to_string())
        .spawn(move || writer_loop(bus, run, rx))
        .expect("spawn event writer");

    (
        EventSink { tx },
        EventWriter {
            handle: Some(handle),
        },
    )
}

fn writer_loop(bus: Arc<Bus>, run: RunFlag, rx: Receiver<OrderEventFrame>) {
    loop {
        match rx.recv_timeout(Duration::from_millis(50)) {
            Ok(event) => {
                if !push_with_retry(&bus, event) {
                    error!("event ring: {}", RingError::Overflow);
                    run.stop("event ring overflow");
                    return;
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            // All sinks dropped and the queue is drained.
            Err(RecvTimeoutError::Disconnected) => return,
        }
    }
}

fn push_with_retry(bus: &Bus, event: OrderEventFrame) -> bool {
    for _ in 0..EVENT_RING_RETRY_LIMIT {
        match bus.layout().events.try_push(event) {
            Ok(()) => return true,
            Err(RingError::Backpressure) => std::thread::sleep(Duration::from_millis(1)),
            Err(e) => {
                error!("event ring: unexpected {}", e);
                return false;
            }
        }
    }
    false
}
