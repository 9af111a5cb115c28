//! Market parser throughput on the three stream shapes.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use fen_core::market;

const AGG_TRADE: &[u8] = br#"{"e":"aggTrade","E":1700000000100,"s":"BNBUSDT","a":26129,"p":"250.10","q":"0.50","f":100,"l":105,"T":1700000000000,"m":false}"#;
const BOOK_TICKER: &[u8] = br#"{"u":400900217,"s":"BNBUSDT","b":"249.99","B":"3.0","a":"250.01","A":"2.5"}"#;
const FORCE_ORDER: &[u8] = br#"{"e":"forceOrder","E":1700000000200,"o":{"s":"BNBUSDT","S":"SELL","o":"LIMIT","f":"IOC","q":"1.25","p":"248.00","ap":"248.10","X":"FILLED","T":1700000000150}}"#;

fn bench_parse(c: &mut Criterion) {
    c.bench_function("parse_agg_trade", |b| {
        b.iter(|| black_box(market::parse(black_box(AGG_TRADE))))
    });
    c.bench_function("parse_book_ticker", |b| {
        b.iter(|| black_box(market::parse(black_box(BOOK_TICKER))))
    });
    c.bench_function("parse_force_order", |b| {
        b.iter(|| black_box(market::parse(black_box(FORCE_ORDER))))
    });
    c.bench_function("parse_unknown_shape", |b| {
        b.iter(|| black_box(market::parse(black_box(br#"{"result":null,"id":1}"#))))
    });
}

criterion_group!(benches, bench_parse);
criterion_main!(benches);
