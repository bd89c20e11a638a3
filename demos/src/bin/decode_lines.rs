//! # decode_lines
//!
//! Decodes newline-delimited JSON from a file (or stdin) on a worker pool and
//! prints one compact value per line, in input order. Lines that fail to
//! parse are reported on stderr and skipped.
//!
//! Run with:
//! ```sh
//! cargo run --bin decode_lines -- events.jsonl
//! cat events.jsonl | cargo run --bin decode_lines
//!
//! # Tune the decoder with a JSON config:
//! STREAMDECODE_CONFIG='{"max_parallelism": 16, "on_producer_error": "surface"}' \
//!     cargo run --bin decode_lines -- events.jsonl
//! ```

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use streamdecode_core::{DecodeError, LineSource, PipelineError, RecordReader};
use streamdecode_observability::{init_tracing, LogConfig};
use streamdecode_pipeline::{ConcurrentDecoder, DecoderConfig};
use tracing::info;

fn parse_json(line: String) -> Result<serde_json::Value, DecodeError> {
    serde_json::from_str(&line).map_err(|e| DecodeError::invalid(e.to_string()))
}

fn open_input() -> Result<Box<dyn BufRead + Send>> {
    match std::env::args().nth(1) {
        Some(path) => {
            let file = File::open(&path).with_context(|| format!("opening {path}"))?;
            Ok(Box::new(BufReader::new(file)))
        }
        None => Ok(Box::new(BufReader::new(io::stdin()))),
    }
}

fn main() -> Result<()> {
    init_tracing(&LogConfig {
        json: std::env::var("LOG_JSON").is_ok(),
        ..LogConfig::default()
    });

    let config = match std::env::var("STREAMDECODE_CONFIG") {
        Ok(json) => DecoderConfig::from_json(&json)?,
        Err(_) => DecoderConfig::default(),
    };
    info!(
        max_parallelism = config.max_parallelism,
        policy = ?config.on_producer_error,
        "decoding lines"
    );

    let source = LineSource::new(open_input()?);
    let mut decoder = ConcurrentDecoder::builder(source, parse_json)
        .config(config)
        .build()?;

    let mut skipped = 0u64;
    for value in decoder.values() {
        match value {
            Ok(value) => println!("{value}"),
            Err(PipelineError::Decode { sequence, source }) => {
                skipped += 1;
                eprintln!("record {sequence}: {source}");
            }
            Err(e) => return Err(e.into()),
        }
    }

    let metrics = decoder.metrics();
    decoder.close()?;
    info!(decoded = metrics.values_delivered, skipped, "done");
    Ok(())
}
