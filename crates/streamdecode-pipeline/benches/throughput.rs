//! Decode throughput benchmarks.
//!
//! Compares the sequential decoder against the concurrent one at several
//! parallelism levels, using a CPU-bound decode of CSV count records.
//!
//! # Running
//! ```bash
//! cargo bench --package streamdecode-pipeline
//! ```

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use streamdecode_core::{DecodeError, Generator, RecordReader, SequentialDecoder};
use streamdecode_pipeline::ConcurrentDecoder;

const RECORDS: u64 = 10_000;

// ─── Record factory ───────────────────────────────────────────────────────────

fn make_record(i: u64) -> String {
    format!("{i},{},{}", i.wrapping_mul(31), i % 7)
}

/// Parses the record and folds its fields a few thousand times so each
/// decode costs a measurable amount of CPU.
fn decode_record(raw: String) -> Result<u64, DecodeError> {
    let mut fields = [0u64; 3];
    for (slot, part) in fields.iter_mut().zip(raw.split(',')) {
        *slot = part
            .parse()
            .map_err(|_| DecodeError::invalid(format!("bad field in {raw:?}")))?;
    }
    let mut acc = fields[0];
    for round in 0..2_000u64 {
        acc = acc
            .rotate_left(5)
            .wrapping_add(fields[1] ^ round)
            .wrapping_mul(fields[2] | 1);
    }
    Ok(acc)
}

// ─── Benchmarks ───────────────────────────────────────────────────────────────

fn bench_sequential_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("sequential_decode");
    group.throughput(Throughput::Elements(RECORDS));
    group.bench_function(BenchmarkId::from_parameter(RECORDS), |b| {
        b.iter(|| {
            let mut decoder =
                SequentialDecoder::new(Generator::new(make_record, RECORDS), decode_record);
            let n = decoder.values().filter(Result::is_ok).count();
            assert_eq!(n as u64, RECORDS);
        });
    });
    group.finish();
}

fn bench_concurrent_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("concurrent_decode");
    group.throughput(Throughput::Elements(RECORDS));
    for parallelism in [1usize, 2, 4, 8, 16] {
        group.bench_with_input(
            BenchmarkId::from_parameter(parallelism),
            &parallelism,
            |b, &parallelism| {
                b.iter(|| {
                    let decoder = ConcurrentDecoder::new(
                        Generator::new(make_record, RECORDS),
                        decode_record,
                        parallelism,
                    )
                    .expect("valid parallelism");
                    let mut n = 0u64;
                    while let Ok(Some(_)) = decoder.read() {
                        n += 1;
                    }
                    decoder.close().expect("close decoder");
                    assert_eq!(n, RECORDS);
                });
            },
        );
    }
    group.finish();
}

fn bench_first_value_latency(c: &mut Criterion) {
    // Lazy start: the first read pays for thread spawn plus one decode.
    c.bench_function("first_value_latency", |b| {
        b.iter(|| {
            let decoder =
                ConcurrentDecoder::new(Generator::new(make_record, RECORDS), decode_record, 8)
                    .expect("valid parallelism");
            let first = decoder.read().expect("first read");
            decoder.close().expect("close decoder");
            first
        });
    });
}

criterion_group!(
    benches,
    bench_sequential_decode,
    bench_concurrent_decode,
    bench_first_value_latency,
);
criterion_main!(benches);
