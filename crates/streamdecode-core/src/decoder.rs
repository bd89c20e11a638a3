//! The `DecodeFn` trait and the `DecodeObserver` instrumentation hook.
//!
//! Both are object-safe and `Send + Sync` so they can be shared across the
//! producer thread and the decode workers behind an `Arc`.

use crate::error::{DecodeError, SourceError};
use std::time::Duration;

/// A transform from one raw record to one decoded value.
///
/// Implementations may be slow and may fail; they are never handed the end
/// of stream.
pub trait DecodeFn<R, V>: Send + Sync {
    fn decode(&self, raw: R) -> Result<V, DecodeError>;
}

/// Blanket impl so closures can be used as decode functions.
impl<R, V, F> DecodeFn<R, V> for F
where
    F: Fn(R) -> Result<V, DecodeError> + Send + Sync,
{
    fn decode(&self, raw: R) -> Result<V, DecodeError> {
        self(raw)
    }
}

/// Callbacks invoked by the decoders as records move through them.
///
/// Every method defaults to a no-op. Calls come from the producer thread
/// and from decode workers concurrently.
pub trait DecodeObserver: Send + Sync {
    /// A raw record was pulled from the source.
    fn on_record_read(&self) {}

    /// The producer found the hand-off queue full and is about to block.
    fn on_backpressure(&self) {}

    /// A record decoded successfully; `latency` covers the decode call only.
    fn on_decoded(&self, latency: Duration) {
        let _ = latency;
    }

    fn on_decode_error(&self, err: &DecodeError) {
        let _ = err;
    }

    /// The producer stopped on a source failure after the first record.
    fn on_producer_error(&self, err: &SourceError) {
        let _ = err;
    }
}

/// Observer that ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl DecodeObserver for NoopObserver {}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: String) -> Result<u32, DecodeError> {
        raw.trim()
            .parse()
            .map_err(|e: std::num::ParseIntError| DecodeError::invalid(e.to_string()))
    }

    #[test]
    fn closures_and_fns_are_decode_fns() {
        let by_fn: &dyn DecodeFn<String, u32> = &parse;
        assert_eq!(by_fn.decode(" 42 ".into()).unwrap(), 42);
        assert!(by_fn.decode("x".into()).is_err());

        let offset = 10;
        let by_closure = move |raw: u32| -> Result<u32, DecodeError> { Ok(raw + offset) };
        assert_eq!(DecodeFn::decode(&by_closure, 5).unwrap(), 15);
    }
}
