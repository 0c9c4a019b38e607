use basalt_wire::{Body, Level, MarketData, Message};
use criterion::{Criterion, Throughput, black_box, criterion_group, criterion_main};
use std::io::Cursor;

fn make_market_data() -> Message {
    Message {
        ts: 1_700_000_000.123456,
        body: Body::MarketData(MarketData {
            symbol: "AAPL".into(),
            bids: (0..5)
                .map(|i| Level { price: 150.25 - 0.05 * i as f64, size: 100.0 + i as f64 })
                .collect(),
            asks: (0..5)
                .map(|i| Level { price: 150.30 + 0.05 * i as f64, size: 100.0 + i as f64 })
                .collect(),
            last_price: 150.27,
            volume: 48_211,
        }),
    }
}

fn bench_encode(c: &mut Criterion) {
    let msg = make_market_data();

    let mut group = c.benchmark_group("codec");
    group.throughput(Throughput::Elements(1));
    group.bench_function("encode", |b| {
        b.iter(|| black_box(&msg).encode().expect("encode"));
    });
    group.finish();
}

fn bench_decode_frame(c: &mut Criterion) {
    let bytes = make_market_data().encode().expect("encode");

    let mut group = c.benchmark_group("codec");
    group.throughput(Throughput::Elements(1));
    group.bench_function("decode_frame", |b| {
        b.iter(|| {
            let mut cursor = Cursor::new(black_box(&bytes));
            Message::read_from(&mut cursor).expect("decode").expect("frame")
        });
    });
    group.finish();
}

fn bench_round_trip(c: &mut Criterion) {
    let msg = make_market_data();

    let mut group = c.benchmark_group("codec");
    group.throughput(Throughput::Elements(1));
    group.bench_function("round_trip", |b| {
        b.iter(|| {
            let bytes = black_box(&msg).encode().expect("encode");
            let mut cursor = Cursor::new(bytes);
            Message::read_from(&mut cursor).expect("decode").expect("frame")
        });
    });
    group.finish();
}

criterion_group!(benches, bench_encode, bench_decode_frame, bench_round_trip);
criterion_main!(benches);
