//! Benchmarks for the per-line acquisition path
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use utm_rs::backend::converter::convert_reading;
use utm_rs::backend::protocol::parse_line;
use utm_rs::types::RawReading;
use utm_rs::{Sample, SampleGeometry, Session};

const DATA_LINE: &str = ";1234.567;12.345;3.291;1004.80";
const NOISE_LINE: &str = "HX711 calibration factor: 420.0983";

fn bench_parse_line(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_line");
    group.throughput(Throughput::Elements(1));

    group.bench_function("data", |b| b.iter(|| parse_line(black_box(DATA_LINE))));
    group.bench_function("noise", |b| b.iter(|| parse_line(black_box(NOISE_LINE))));
    group.bench_function("malformed", |b| {
        b.iter(|| parse_line(black_box(";12a;3;4;5")))
    });

    group.finish();
}

fn bench_line_to_sample(c: &mut Criterion) {
    let geometry = SampleGeometry::default();
    c.bench_function("line_to_sample", |b| {
        b.iter(|| {
            let reading = parse_line(black_box(DATA_LINE)).ok().flatten();
            reading.map(|r| convert_reading(&r, &geometry, black_box(1_700_000_000.0)))
        })
    });
}

fn build_session(size: usize) -> Session {
    let geometry = SampleGeometry::default();
    let mut session = Session::with_geometry(geometry);
    for i in 0..size {
        let line = format!(";{};{};3.3;1000", i as f64 * 1.5, i as f64 * 0.01);
        if let Ok(Some(reading)) = parse_line(&line) {
            session.append(convert_reading(&reading, &geometry, i as f64 * 0.05));
        }
    }
    session
}

fn bench_rescale(c: &mut Criterion) {
    let mut group = c.benchmark_group("session_rescale");

    for size in [1_000, 10_000, 100_000].iter() {
        let session = build_session(*size);
        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::new("rescale", size), &session, |b, session| {
            b.iter_batched(
                || session.clone(),
                |mut s| {
                    let _ = s.rescale(SampleGeometry::new(50.0, 25.0));
                    s
                },
                criterion::BatchSize::LargeInput,
            )
        });
    }

    group.finish();
}

fn bench_append(c: &mut Criterion) {
    let reading = RawReading {
        mass_g: 1234.567,
        displacement_mm: 12.345,
        voltage_v: 3.291,
        resistance_ohm: 1004.8,
    };
    let sample: Sample = convert_reading(&reading, &SampleGeometry::default(), 0.0);
    c.bench_function("session_append_10k", |b| {
        b.iter(|| {
            let mut session = Session::new();
            for _ in 0..10_000 {
                session.append(black_box(sample));
            }
            session
        })
    });
}

criterion_group!(
    benches,
    bench_parse_line,
    bench_line_to_sample,
    bench_rescale,
    bench_append
);
criterion_main!(benches);
