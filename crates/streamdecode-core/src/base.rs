//! `RecordDecoder`: the source + decode-function pair shared by both
//! decoder variants.

use crate::decoder::DecodeFn;
use crate::error::{DecodeError, SourceError};
use crate::source::RecordSource;
use std::marker::PhantomData;
use std::sync::Arc;

/// Holds a source and a decode function. Purely structural, no threads.
pub struct RecordDecoder<S, V, F> {
    source: S,
    decode: DecodeHandle<F, V>,
}

impl<S, V, F> RecordDecoder<S, V, F>
where
    S: RecordSource,
    F: DecodeFn<S::Record, V>,
{
    pub fn new(source: S, decode: F) -> Self {
        Self {
            source,
            decode: DecodeHandle::new(decode),
        }
    }

    /// Pull one raw record, or `None` at end of stream.
    pub fn read_record(&mut self) -> Result<Option<S::Record>, SourceError> {
        self.source.read_next()
    }

    /// Decode `record`; the end of stream passes through untouched.
    pub fn decode_record(&self, record: Option<S::Record>) -> Result<Option<V>, DecodeError> {
        self.decode.apply(record)
    }

    /// A cloneable handle to the decode function for use on other threads.
    pub fn decode_handle(&self) -> DecodeHandle<F, V> {
        self.decode.clone()
    }

    /// Release the source.
    pub fn close(&mut self) -> Result<(), SourceError> {
        self.source.close()
    }
}

/// Shared, thread-safe reference to a decode function.
pub struct DecodeHandle<F, V> {
    func: Arc<F>,
    _out: PhantomData<fn() -> V>,
}

impl<F, V> DecodeHandle<F, V> {
    pub fn new(func: F) -> Self {
        Self {
            func: Arc::new(func),
            _out: PhantomData,
        }
    }

    /// Apply the function to `record`; `None` is returned as-is and the
    /// function is not invoked.
    pub fn apply<R>(&self, record: Option<R>) -> Result<Option<V>, DecodeError>
    where
        F: DecodeFn<R, V>,
    {
        record.map(|raw| self.decode(raw)).transpose()
    }

    /// Decode a record known not to be the end of stream.
    pub fn decode<R>(&self, raw: R) -> Result<V, DecodeError>
    where
        F: DecodeFn<R, V>,
    {
        self.func.decode(raw)
    }
}

impl<F, V> Clone for DecodeHandle<F, V> {
    fn clone(&self) -> Self {
        Self {
            func: Arc::clone(&self.func),
            _out: PhantomData,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::IterSource;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn end_of_stream_skips_the_decode_function() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let mut base = RecordDecoder::new(IterSource::new(vec!["7"]), move |raw: &str| {
            seen.fetch_add(1, Ordering::SeqCst);
            raw.parse::<u32>().map_err(|e| DecodeError::invalid(e.to_string()))
        });

        let first = base.read_record().unwrap();
        assert_eq!(base.decode_record(first).unwrap(), Some(7));
        let end = base.read_record().unwrap();
        assert_eq!(base.decode_record(end).unwrap(), None);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn handles_share_one_function() {
        let base = RecordDecoder::new(IterSource::new(Vec::<u8>::new()), |raw: u8| {
            Ok::<_, DecodeError>(u16::from(raw) * 2)
        });
        let handle = base.decode_handle();
        let other = handle.clone();
        assert_eq!(handle.apply(Some(4)).unwrap(), Some(8));
        assert_eq!(other.apply(Some(5)).unwrap(), Some(10));
        assert_eq!(other.apply::<u8>(None).unwrap(), None);
    }
}
