//! Cross-thread exercises of the ring protocols: the reliable SPSC rings
//! must never drop or reorder, the market ring must survive overruns, and
//! index invariants must hold under concurrency.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use fen_core::bus::{CommandRing, EventRing, MarketCursor, MarketRing};
use fen_core::bus::{CommandFrame, MarketFrame, OrderEventFrame, RingError};

#[test]
fn command_ring_cross_thread_no_loss_no_reorder() {
    const TOTAL: u64 = 50_000;
    let ring: Arc<CommandRing> = Arc::from(CommandRing::new_boxed());

    let producer = {
        let ring = ring.clone();
        thread::spawn(move || {
            for i in 0..TOTAL {
                let mut cmd = CommandFrame::zeroed();
                cmd.request_id = i;
                cmd.price = i as f64 * 0.5;
                loop {
                    match ring.try_push(cmd) {
                        Ok(()) => break,
                        Err(RingError::Backpressure) => thread::yield_now(),
                        Err(e) => panic!("unexpected ring error: {}", e),
                    }
                }
            }
        })
    };

    let consumer = {
        let ring = ring.clone();
        thread::spawn(move || {
            let mut expected = 0u64;
            while expected < TOTAL {
                if let Some(cmd) = ring.try_pop() {
                    assert_eq!(cmd.request_id, expected, "frame loss or reorder");
                    assert_eq!(cmd.price, expected as f64 * 0.5, "payload torn");
                    expected += 1;
                } else {
                    thread::yield_now();
                }
            }
        })
    };

    producer.join().unwrap();
    consumer.join().unwrap();
    assert!(ring.is_empty());
    assert_eq!(ring.write_idx(), TOTAL);
    assert_eq!(ring.read_idx(), TOTAL);
}

#[test]
fn ring_index_spread_stays_within_capacity_under_load() {
    const TOTAL: u64 = 20_000;
    let ring: Arc<EventRing> = Arc::from(EventRing::new_boxed());
    let done = Arc::new(AtomicBool::new(false));

    let producer = {
        let ring = ring.clone();
        thread::spawn(move || {
            for i in 0..TOTAL {
                let mut ev = OrderEventFrame::zeroed();
                ev.last_update_id = i;
                while ring.try_push(ev).is_err() {
                    thread::yield_now();
                }
            }
        })
    };

    let consumer = {
        let ring = ring.clone();
        thread::spawn(move || {
            let mut seen = 0u64;
            while seen < TOTAL {
                if let Some(ev) = ring.try_pop() {
                    assert_eq!(ev.last_update_id, seen);
                    seen += 1;
                } else {
                    thread::yield_now();
                }
            }
        })
    };

    // Observer: the invariant 0 <= write - read <= capacity must hold at
    // every sampled instant, from a third thread.
    let observer = {
        let ring = ring.clone();
        let done = done.clone();
        thread::spawn(move || {
            while !done.load(Ordering::Acquire) {
                let write = ring.write_idx();
                let read = ring.read_idx();
                assert!(write >= read, "write < read");
                assert!(
                    write - read <= EventRing::CAPACITY as u64,
                    "spread exceeded capacity"
                );
                thread::sleep(Duration::from_micros(50));
            }
        })
    };

    producer.join().unwrap();
    consumer.join().unwrap();
    done.store(true, Ordering::Release);
    observer.join().unwrap();
}

#[test]
fn market_ring_consumer_survives_sustained_overrun() {
    const TOTAL: u64 = 100_000;
    let ring: Arc<MarketRing> = Arc::from(MarketRing::new_boxed());

    let producer = {
        let ring = ring.clone();
        thread::spawn(move || {
            for i in 0..TOTAL {
                let mut frame = MarketFrame::zeroed();
                frame.t_exch_ns = i;
                ring.publish(frame);
            }
        })
    };

    // Deliberately slow consumer: it will be lapped many times and must
    // only ever observe a non-decreasing sequence.
    let consumer = {
        let ring = ring.clone();
        thread::spawn(move || {
            let mut cursor = MarketCursor::new();
            let mut last_seen: Option<u64> = None;
            let mut seen = 0u64;
            while cursor.position() < TOTAL {
                match cursor.poll(&ring) {
                    Some(frame) => {
                        if let Some(prev) = last_seen {
                            assert!(
                                frame.t_exch_ns > prev,
                                "sequence went backwards: {} after {}",
                                frame.t_exch_ns,
                                prev
                            );
                        }
                        last_seen = Some(frame.t_exch_ns);
                        seen += 1;
                        if seen % 64 == 0 {
                            thread::sleep(Duration::from_micros(20));
                        }
                    }
                    None => {
                        if ring.write_index() >= TOTAL {
                            break;
                        }
                        thread::yield_now();
                    }
                }
            }
            (seen, cursor.overruns())
        })
    };

    producer.join().unwrap();
    let (seen, _overruns) = consumer.join().unwrap();
    assert!(seen > 0);
    assert_eq!(ring.write_index(), TOTAL);
}

#[test]
fn market_ring_single_thread_overrun_resyncs_to_recent_window() {
    let ring = MarketRing::new_boxed();
    let mut cursor = MarketCursor::new();

    // capacity + 1 frames faster than any read.
    let total = MarketRing::CAPACITY as u64 + 1;
    for i in 0..total {
        let mut frame = MarketFrame::zeroed();
        frame.t_exch_ns = i;
        ring.publish(frame);
    }

    let first = cursor.poll(&ring).unwrap();
    // Resynchronized into the most recent capacity window.
    assert!(first.t_exch_ns >= total - MarketRing::CAPACITY as u64);
    assert_eq!(cursor.overruns(), 1);

    let mut count = 1u64;
    while cursor.poll(&ring).is_some() {
        count += 1;
    }
    assert!(count <= MarketRing::CAPACITY as u64);
}
