//! Shared fixtures for the pipeline integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use streamdecode_core::{DecodeError, RecordSource, SourceError};

/// Decoded form of a `"<count>"` CSV record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountData {
    pub count: u32,
}

impl CountData {
    /// Parse a record, sleeping briefly to emulate real decode work.
    pub fn from_csv(raw: String) -> Result<Self, DecodeError> {
        std::thread::sleep(Duration::from_micros(200));
        raw.trim()
            .parse()
            .map(|count| CountData { count })
            .map_err(|_| DecodeError::invalid(format!("not a count: {raw:?}")))
    }
}

/// Counters shared between a test and its `TrackingSource`.
#[derive(Debug, Default)]
pub struct SourceProbe {
    pub reads: AtomicUsize,
    pub closes: AtomicUsize,
}

impl SourceProbe {
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

/// Emits `"0"`, `"1"`, ... up to `count` records, optionally failing when
/// asked for record `fail_at`.
pub struct TrackingSource {
    next: usize,
    count: usize,
    fail_at: Option<usize>,
    probe: Arc<SourceProbe>,
}

impl TrackingSource {
    pub fn new(count: usize) -> (Self, Arc<SourceProbe>) {
        let probe = Arc::new(SourceProbe::default());
        let source = Self {
            next: 0,
            count,
            fail_at: None,
            probe: Arc::clone(&probe),
        };
        (source, probe)
    }

    pub fn failing_at(count: usize, fail_at: usize) -> (Self, Arc<SourceProbe>) {
        let (mut source, probe) = Self::new(count);
        source.fail_at = Some(fail_at);
        (source, probe)
    }
}

impl RecordSource for TrackingSource {
    type Record = String;

    fn read_next(&mut self) -> Result<Option<String>, SourceError> {
        self.probe.reads.fetch_add(1, Ordering::SeqCst);
        if self.fail_at == Some(self.next) {
            return Err(SourceError::Other(format!("boom at {}", self.next)));
        }
        if self.next >= self.count {
            return Ok(None);
        }
        let record = self.next.to_string();
        self.next += 1;
        Ok(Some(record))
    }

    fn close(&mut self) -> Result<(), SourceError> {
        self.probe.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Upper bound used for every "returns promptly" assertion.
pub const PROMPT: Duration = Duration::from_secs(5);
