//! `SequentialDecoder`: reads and decodes on the caller's thread.

use crate::base::RecordDecoder;
use crate::decoder::{DecodeFn, DecodeObserver, NoopObserver};
use crate::error::PipelineError;
use crate::reader::RecordReader;
use crate::source::RecordSource;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Single-threaded decoder: one record is pulled and decoded per `read`.
pub struct SequentialDecoder<S, V, F> {
    base: RecordDecoder<S, V, F>,
    observer: Arc<dyn DecodeObserver>,
    sequence: u64,
    closed: bool,
}

impl<S, V, F> SequentialDecoder<S, V, F>
where
    S: RecordSource,
    F: DecodeFn<S::Record, V>,
{
    pub fn new(source: S, decode: F) -> Self {
        Self {
            base: RecordDecoder::new(source, decode),
            observer: Arc::new(NoopObserver),
            sequence: 0,
            closed: false,
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn DecodeObserver>) -> Self {
        self.observer = observer;
        self
    }
}

impl<S, V, F> RecordReader for SequentialDecoder<S, V, F>
where
    S: RecordSource,
    F: DecodeFn<S::Record, V>,
{
    type Value = V;

    fn read(&mut self) -> Result<Option<V>, PipelineError> {
        if self.closed {
            return Err(PipelineError::Closed);
        }
        let Some(record) = self.base.read_record()? else {
            return Ok(None);
        };
        self.observer.on_record_read();

        let sequence = self.sequence;
        self.sequence += 1;

        let started = Instant::now();
        match self.base.decode_record(Some(record)) {
            Ok(value) => {
                self.observer.on_decoded(started.elapsed());
                Ok(value)
            }
            Err(source) => {
                self.observer.on_decode_error(&source);
                Err(PipelineError::Decode { sequence, source })
            }
        }
    }

    fn close(&mut self) -> Result<(), PipelineError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.base.close()?;
        debug!(records = self.sequence, "streamdecode: sequential decoder closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DecodeError;
    use crate::source::{Generator, IterSource};

    fn parse(raw: String) -> Result<u64, DecodeError> {
        raw.parse().map_err(|_| DecodeError::invalid(raw))
    }

    #[test]
    fn reads_in_order_until_end() {
        let mut decoder = SequentialDecoder::new(Generator::new(|i| i.to_string(), 50), parse);
        let values: Vec<u64> = decoder.values().map(Result::unwrap).collect();
        assert_eq!(values, (0..50).collect::<Vec<_>>());
        assert!(decoder.read().unwrap().is_none());
        decoder.close().unwrap();
    }

    #[test]
    fn decode_failure_is_reported_with_its_position() {
        let source = IterSource::new(vec!["1".to_string(), "x".to_string(), "3".to_string()]);
        let mut decoder = SequentialDecoder::new(source, parse);

        let items: Vec<_> = decoder.values().collect();
        assert_eq!(items.len(), 3);
        assert_eq!(items[0].as_ref().unwrap(), &1);
        assert!(matches!(items[1], Err(PipelineError::Decode { sequence: 1, .. })));
        assert_eq!(items[2].as_ref().unwrap(), &3);
    }

    #[test]
    fn read_after_close_fails() {
        let mut decoder = SequentialDecoder::new(Generator::new(|i| i.to_string(), 5), parse);
        decoder.close().unwrap();
        decoder.close().unwrap();
        assert!(matches!(decoder.read(), Err(PipelineError::Closed)));
    }
}
