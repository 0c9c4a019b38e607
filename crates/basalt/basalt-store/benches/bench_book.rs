use basalt_store::{BookReader, BookWriter, DEPTH, Symbol, unlink};
use criterion::{Criterion, Throughput, black_box, criterion_group, criterion_main};

fn temp_region(tag: &str) -> String {
    std::env::temp_dir()
        .join(format!("basalt_bench_{tag}_{}", std::process::id()))
        .display()
        .to_string()
}

fn sym() -> Symbol {
    Symbol::new("AAPL").unwrap()
}

fn full_book() -> (Vec<(f64, f64)>, Vec<(f64, f64)>) {
    let bids = (0..DEPTH).map(|i| (150.25 - i as f64 * 0.05, 100.0)).collect();
    let asks = (0..DEPTH).map(|i| (150.30 + i as f64 * 0.05, 100.0)).collect();
    (bids, asks)
}

fn bench_write(c: &mut Criterion) {
    let path = temp_region("write");
    let _ = unlink(&path);
    let mut writer = BookWriter::create(&path, &[sym()]).expect("create");
    let (bids, asks) = full_book();

    let mut group = c.benchmark_group("book");
    group.throughput(Throughput::Elements(1));
    group.bench_function("write", |b| {
        b.iter(|| writer.write(sym(), black_box(&bids), black_box(&asks)).expect("write"));
    });
    group.finish();

    drop(writer);
    let _ = unlink(&path);
}

fn bench_read(c: &mut Criterion) {
    let path = temp_region("read");
    let _ = unlink(&path);
    let mut writer = BookWriter::create(&path, &[sym()]).expect("create");
    let (bids, asks) = full_book();
    writer.write(sym(), &bids, &asks).expect("write");
    let reader = BookReader::open(&path).expect("open");

    let mut group = c.benchmark_group("book");
    group.throughput(Throughput::Elements(1));
    group.bench_function("read", |b| {
        b.iter(|| reader.read(black_box(sym())).expect("read"));
    });
    group.bench_function("best_bid", |b| {
        b.iter(|| reader.best_bid(black_box(sym())).expect("read"));
    });
    group.finish();

    drop(writer);
    drop(reader);
    let _ = unlink(&path);
}

fn bench_write_read_round_trip(c: &mut Criterion) {
    let path = temp_region("rt");
    let _ = unlink(&path);
    let mut writer = BookWriter::create(&path, &[sym()]).expect("create");
    let reader = BookReader::open(&path).expect("open");
    let (bids, asks) = full_book();

    let mut group = c.benchmark_group("book");
    group.throughput(Throughput::Elements(1));
    group.bench_function("write_then_read", |b| {
        b.iter(|| {
            writer.write(sym(), black_box(&bids), black_box(&asks)).expect("write");
            black_box(reader.read(sym()).expect("read"))
        });
    });
    group.finish();

    drop(writer);
    drop(reader);
    let _ = unlink(&path);
}

criterion_group!(benches, bench_write, bench_read, bench_write_read_round_trip);
criterion_main!(benches);
