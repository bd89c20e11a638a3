//! # count_csv
//!
//! Decodes 2 000 single-column CSV records with an artificially slow parser,
//! first sequentially and then through `ConcurrentDecoder` at increasing
//! parallelism, and prints the wall-clock time of each run.
//!
//! Run with:
//! ```sh
//! cargo run --bin count_csv
//! ```

use anyhow::{ensure, Result};
use std::time::{Duration, Instant};
use streamdecode_core::{DecodeError, Generator, RecordReader, SequentialDecoder};
use streamdecode_observability::{init_tracing, LogConfig};
use streamdecode_pipeline::ConcurrentDecoder;
use tracing::info;

const RECORDS: u64 = 2_000;

#[derive(Debug, Clone, Copy)]
struct CountData {
    count: u32,
}

fn from_csv(raw: String) -> Result<CountData, DecodeError> {
    // Stand-in for an expensive parse.
    std::thread::sleep(Duration::from_micros(500));
    raw.trim()
        .parse()
        .map(|count| CountData { count })
        .map_err(|_| DecodeError::invalid(format!("not a count: {raw:?}")))
}

fn make_line(i: u64) -> String {
    i.to_string()
}

fn check_order(counts: &[u32]) -> Result<()> {
    ensure!(counts.len() as u64 == RECORDS, "expected {RECORDS} values, got {}", counts.len());
    for (expected, &got) in counts.iter().enumerate() {
        ensure!(got as usize == expected, "out of order at {expected}: got {got}");
    }
    Ok(())
}

fn run_sequential() -> Result<Duration> {
    let started = Instant::now();
    let mut decoder = SequentialDecoder::new(Generator::new(make_line, RECORDS), from_csv);
    let counts = decoder
        .values()
        .map(|v| v.map(|d| d.count))
        .collect::<Result<Vec<_>, _>>()?;
    decoder.close()?;
    check_order(&counts)?;
    Ok(started.elapsed())
}

fn run_concurrent(parallelism: usize) -> Result<Duration> {
    let started = Instant::now();
    let decoder = ConcurrentDecoder::new(Generator::new(make_line, RECORDS), from_csv, parallelism)?;
    let mut counts = Vec::with_capacity(RECORDS as usize);
    while let Some(data) = decoder.read()? {
        counts.push(data.count);
    }
    let metrics = decoder.metrics();
    decoder.close()?;
    check_order(&counts)?;
    info!(
        parallelism,
        backpressure_waits = metrics.backpressure_waits,
        "concurrent run complete"
    );
    Ok(started.elapsed())
}

fn main() -> Result<()> {
    init_tracing(&LogConfig::default());

    println!("streamdecode: ordered decode of {RECORDS} records");
    println!("═══════════════════════════════════════════════════════");

    let baseline = run_sequential()?;
    println!("  {:<22} {:>8.1} ms", "sequential", baseline.as_secs_f64() * 1e3);

    let cores = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4);
    for parallelism in [1, 4, cores, 100] {
        let elapsed = run_concurrent(parallelism)?;
        println!(
            "  {:<22} {:>8.1} ms   ({:.1}x)",
            format!("concurrent (n = {parallelism})"),
            elapsed.as_secs_f64() * 1e3,
            baseline.as_secs_f64() / elapsed.as_secs_f64()
        );
    }

    println!("\n  every run yielded counts 0..{RECORDS} in order");
    Ok(())
}
