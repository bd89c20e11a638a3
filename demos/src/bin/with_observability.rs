//! # with_observability
//!
//! Demonstrates streamdecode metrics and structured logging via
//! `streamdecode-observability`.
//!
//! - Per-record counters and decode latency through OpenTelemetry instruments
//! - Structured JSON logging compatible with ELK, Grafana Loki, CloudWatch
//! - Per-component log levels (e.g. raise the pipeline to debug)
//!
//! Run with:
//! ```sh
//! cargo run --bin with_observability
//!
//! # With JSON logging:
//! LOG_JSON=1 cargo run --bin with_observability
//! ```

use anyhow::Result;
use opentelemetry::global;
use std::sync::Arc;
use std::time::Duration;
use streamdecode_core::{DecodeError, IterSource, PipelineError};
use streamdecode_observability::{init_tracing, LogConfig, PipelineMetrics};
use streamdecode_pipeline::ConcurrentDecoder;
use tracing::{info, warn};

/// Price ticks as `"<symbol>,<price>"`. Two are deliberately malformed.
const TICKS: &[&str] = &[
    "BTC,67012.50",
    "ETH,3120.25",
    "SOL,not-a-price",
    "BTC,67020.00",
    "ETH",
    "ETH,3121.75",
    "SOL,151.40",
];

#[derive(Debug)]
struct Tick {
    symbol: String,
    price: f64,
}

fn parse_tick(raw: &'static str) -> Result<Tick, DecodeError> {
    std::thread::sleep(Duration::from_millis(2));
    let (symbol, price) = raw
        .split_once(',')
        .ok_or_else(|| DecodeError::invalid(format!("missing price in {raw:?}")))?;
    let price = price
        .parse()
        .map_err(|_| DecodeError::invalid(format!("bad price in {raw:?}")))?;
    Ok(Tick {
        symbol: symbol.to_string(),
        price,
    })
}

fn main() -> Result<()> {
    // ── 1. Initialise structured logging ──────────────────────────────────────
    let log_config = LogConfig {
        level: "info".into(),
        components: [("streamdecode_pipeline".into(), "debug".into())].into(),
        // Set LOG_JSON=1 to emit JSON-structured logs (ELK/Loki/CloudWatch)
        json: std::env::var("LOG_JSON").is_ok(),
    };
    init_tracing(&log_config);

    info!(
        component = "with_observability",
        log_json = log_config.json,
        level = %log_config.level,
        "streamdecode observability demo starting"
    );

    println!("streamdecode: Observability Demo");
    println!("═══════════════════════════════════════════════════════");

    // ── 2. Create OpenTelemetry meter + PipelineMetrics ───────────────────────
    //
    // The global meter is a no-op until a MeterProvider is installed, so the
    // demo runs without an exporter.
    let meter = global::meter("streamdecode-demo");
    let metrics = Arc::new(PipelineMetrics::new(&meter, "ticks"));

    println!("\n  Metrics registered:");
    println!("    streamdecode.records_read       (counter, pipeline tag)");
    println!("    streamdecode.values_decoded     (counter, pipeline tag)");
    println!("    streamdecode.decode_errors      (counter, pipeline + error_type tags)");
    println!("    streamdecode.backpressure_waits (counter, pipeline tag)");
    println!("    streamdecode.producer_errors    (counter, pipeline + error_type tags)");
    println!("    streamdecode.decode_latency_ms  (histogram, pipeline tag)");

    // ── 3. Decode with the metrics attached as observer ───────────────────────
    let decoder = ConcurrentDecoder::builder(IterSource::new(TICKS.iter().copied()), parse_tick)
        .max_parallelism(3)
        .thread_name("ticks")
        .observer(metrics)
        .build()?;

    println!("\n─── Decode Loop ─────────────────────────────────────");
    loop {
        match decoder.read() {
            Ok(Some(tick)) => println!("  [OK]   {:<4} {:>10.2}", tick.symbol, tick.price),
            Ok(None) => break,
            Err(PipelineError::Decode { sequence, source }) => {
                warn!(sequence, error = %source, "tick rejected");
                println!("  [ERR]  record {sequence}: {source}");
            }
            Err(e) => return Err(e.into()),
        }
    }

    // ── 4. Summary ────────────────────────────────────────────────────────────
    let snapshot = decoder.metrics();
    decoder.close()?;

    println!("\n─── Summary ─────────────────────────────────────────");
    println!("  records read     : {}", snapshot.records_read);
    println!("  values delivered : {}", snapshot.values_delivered);
    println!("  decode errors    : {}", snapshot.decode_errors);
    println!("  backpressure     : {}", snapshot.backpressure_waits);
    Ok(())
}
