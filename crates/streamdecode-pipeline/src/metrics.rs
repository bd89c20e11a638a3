//! Counters kept by a running decoder.

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics snapshot for a concurrent decoder.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecoderMetrics {
    pub records_read: u64,
    pub tasks_submitted: u64,
    pub values_delivered: u64,
    pub decode_errors: u64,
    /// Times the producer found the hand-off queue full.
    pub backpressure_waits: u64,
}

#[derive(Debug, Default)]
pub(crate) struct DecoderStats {
    records_read: AtomicU64,
    tasks_submitted: AtomicU64,
    values_delivered: AtomicU64,
    decode_errors: AtomicU64,
    backpressure_waits: AtomicU64,
}

impl DecoderStats {
    pub(crate) fn record_read(&self) {
        self.records_read.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn task_submitted(&self) {
        self.tasks_submitted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn value_delivered(&self) {
        self.values_delivered.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn decode_failed(&self) {
        self.decode_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn backpressure(&self) {
        self.backpressure_waits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> DecoderMetrics {
        DecoderMetrics {
            records_read: self.records_read.load(Ordering::Relaxed),
            tasks_submitted: self.tasks_submitted.load(Ordering::Relaxed),
            values_delivered: self.values_delivered.load(Ordering::Relaxed),
            decode_errors: self.decode_errors.load(Ordering::Relaxed),
            backpressure_waits: self.backpressure_waits.load(Ordering::Relaxed),
        }
    }
}
