//! Throughput of the bus rings: market broadcast publish, SPSC push/pop.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use fen_core::bus::{CommandFrame, CommandRing, MarketCursor, MarketFrame, MarketRing};

fn bench_market_publish(c: &mut Criterion) {
    let ring = MarketRing::new_boxed();
    let mut frame = MarketFrame::zeroed();
    frame.price = 250.10;
    frame.quantity = 0.5;

    c.bench_function("market_ring_publish", |b| {
        b.iter(|| {
            ring.publish(black_box(frame));
        })
    });
}

fn bench_market_publish_consume(c: &mut Criterion) {
    let ring = MarketRing::new_boxed();
    let mut cursor = MarketCursor::new();
    let mut frame = MarketFrame::zeroed();
    frame.price = 250.10;

    c.bench_function("market_ring_publish_then_poll", |b| {
        b.iter(|| {
            ring.publish(black_box(frame));
            black_box(cursor.poll(&ring));
        })
    });
}

fn bench_spsc_round_trip(c: &mut Criterion) {
    let ring: Box<CommandRing> = CommandRing::new_boxed();
    let cmd = CommandFrame::zeroed();

    c.bench_function("command_ring_push_pop", |b| {
        b.iter(|| {
            ring.try_push(black_box(cmd)).unwrap();
            black_box(ring.try_pop());
        })
    });
}

criterion_group!(
    benches,
    bench_market_publish,
    bench_market_publish_consume,
    bench_spsc_round_trip
);
criterion_main!(benches);
