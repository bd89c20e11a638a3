//! streamdecode metrics definitions.
//!
//! All metrics use OpenTelemetry conventions and are tagged with the
//! `pipeline` name given at construction.

use opentelemetry::{
    metrics::{Counter, Histogram, Meter},
    KeyValue,
};
use std::time::Duration;
use streamdecode_core::{DecodeError, DecodeObserver, SourceError};

/// OpenTelemetry instruments for one decoder, usable as its observer.
#[derive(Clone)]
pub struct PipelineMetrics {
    pub records_read: Counter<u64>,
    pub values_decoded: Counter<u64>,
    pub decode_errors: Counter<u64>,
    pub backpressure_waits: Counter<u64>,
    pub producer_errors: Counter<u64>,
    pub decode_latency_ms: Histogram<f64>,
    attrs: Vec<KeyValue>,
}

impl PipelineMetrics {
    pub fn new(meter: &Meter, pipeline: impl Into<String>) -> Self {
        Self {
            records_read: meter
                .u64_counter("streamdecode.records_read")
                .with_description("Raw records pulled from the source")
                .build(),
            values_decoded: meter
                .u64_counter("streamdecode.values_decoded")
                .with_description("Records decoded successfully")
                .build(),
            decode_errors: meter
                .u64_counter("streamdecode.decode_errors")
                .with_description("Records that failed to decode")
                .build(),
            backpressure_waits: meter
                .u64_counter("streamdecode.backpressure_waits")
                .with_description("Times the producer blocked on a full hand-off queue")
                .build(),
            producer_errors: meter
                .u64_counter("streamdecode.producer_errors")
                .with_description("Source failures that stopped the producer mid-stream")
                .build(),
            decode_latency_ms: meter
                .f64_histogram("streamdecode.decode_latency_ms")
                .with_description("Time to decode a single record in milliseconds")
                .build(),
            attrs: vec![KeyValue::new("pipeline", pipeline.into())],
        }
    }

    fn with_kind(&self, kind: &'static str) -> Vec<KeyValue> {
        let mut attrs = self.attrs.clone();
        attrs.push(KeyValue::new("error_type", kind));
        attrs
    }
}

fn decode_error_kind(err: &DecodeError) -> &'static str {
    match err {
        DecodeError::InvalidRecord { .. } => "invalid_record",
        DecodeError::WorkerLost => "worker_lost",
    }
}

fn source_error_kind(err: &SourceError) -> &'static str {
    match err {
        SourceError::Io(_) => "io",
        SourceError::Malformed { .. } => "malformed",
        SourceError::Closed => "closed",
        SourceError::Other(_) => "other",
    }
}

impl DecodeObserver for PipelineMetrics {
    fn on_record_read(&self) {
        self.records_read.add(1, &self.attrs);
    }

    fn on_backpressure(&self) {
        self.backpressure_waits.add(1, &self.attrs);
    }

    fn on_decoded(&self, latency: Duration) {
        self.values_decoded.add(1, &self.attrs);
        self.decode_latency_ms
            .record(latency.as_secs_f64() * 1_000.0, &self.attrs);
    }

    fn on_decode_error(&self, err: &DecodeError) {
        self.decode_errors.add(1, &self.with_kind(decode_error_kind(err)));
    }

    fn on_producer_error(&self, err: &SourceError) {
        self.producer_errors
            .add(1, &self.with_kind(source_error_kind(err)));
    }
}
