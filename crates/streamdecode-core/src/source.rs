//! `RecordSource`: the sequential raw-record producer consumed by decoders.
//!
//! A source yields `Ok(Some(record))` until it is exhausted, then `Ok(None)`
//! for every later call.

use crate::error::SourceError;
use std::io::BufRead;

/// A sequential, possibly slow producer of raw records.
pub trait RecordSource: Send {
    type Record: Send + 'static;

    /// Pull the next record, or `None` at end of stream.
    fn read_next(&mut self) -> Result<Option<Self::Record>, SourceError>;

    /// Release the underlying resource. Must be idempotent.
    fn close(&mut self) -> Result<(), SourceError> {
        Ok(())
    }
}

impl<S: RecordSource + ?Sized> RecordSource for Box<S> {
    type Record = S::Record;

    fn read_next(&mut self) -> Result<Option<Self::Record>, SourceError> {
        (**self).read_next()
    }

    fn close(&mut self) -> Result<(), SourceError> {
        (**self).close()
    }
}

// ─── Generator ────────────────────────────────────────────────────────────────

/// Produces `count` records by calling `make(index)` for `index` in `0..count`.
pub struct Generator<F> {
    make: F,
    next: u64,
    count: u64,
}

impl<F> Generator<F> {
    pub fn new<R>(make: F, count: u64) -> Self
    where
        F: FnMut(u64) -> R,
    {
        Self {
            make,
            next: 0,
            count,
        }
    }

    /// Number of records still to be produced.
    pub fn remaining(&self) -> u64 {
        self.count - self.next
    }
}

impl<R, F> RecordSource for Generator<F>
where
    R: Send + 'static,
    F: FnMut(u64) -> R + Send,
{
    type Record = R;

    fn read_next(&mut self) -> Result<Option<R>, SourceError> {
        if self.remaining() == 0 {
            return Ok(None);
        }
        let record = (self.make)(self.next);
        self.next += 1;
        Ok(Some(record))
    }
}

// ─── IterSource ───────────────────────────────────────────────────────────────

/// Adapts any iterator into a source. Closing drops the remaining items.
pub struct IterSource<I> {
    iter: Option<I>,
}

impl<I> IterSource<I> {
    pub fn new(iter: impl IntoIterator<IntoIter = I>) -> Self {
        Self {
            iter: Some(iter.into_iter()),
        }
    }
}

impl<I> RecordSource for IterSource<I>
where
    I: Iterator + Send,
    I::Item: Send + 'static,
{
    type Record = I::Item;

    fn read_next(&mut self) -> Result<Option<I::Item>, SourceError> {
        match self.iter.as_mut() {
            Some(iter) => Ok(iter.next()),
            None => Err(SourceError::Closed),
        }
    }

    fn close(&mut self) -> Result<(), SourceError> {
        self.iter = None;
        Ok(())
    }
}

// ─── LineSource ───────────────────────────────────────────────────────────────

/// Reads newline-delimited records from a buffered reader.
///
/// Trailing `\n` / `\r\n` are stripped. Blank lines are skipped when
/// `skip_blank` is set (the default). A line that is not valid UTF-8 is
/// reported as [`SourceError::Malformed`] with its line number.
pub struct LineSource<B> {
    reader: Option<B>,
    line: u64,
    skip_blank: bool,
}

impl<B: BufRead> LineSource<B> {
    pub fn new(reader: B) -> Self {
        Self {
            reader: Some(reader),
            line: 0,
            skip_blank: true,
        }
    }

    pub fn skip_blank(mut self, skip: bool) -> Self {
        self.skip_blank = skip;
        self
    }

    /// 1-based number of the last line read.
    pub fn line(&self) -> u64 {
        self.line
    }
}

impl<B: BufRead + Send> RecordSource for LineSource<B> {
    type Record = String;

    fn read_next(&mut self) -> Result<Option<String>, SourceError> {
        let reader = self.reader.as_mut().ok_or(SourceError::Closed)?;
        loop {
            let mut bytes = Vec::new();
            if reader.read_until(b'\n', &mut bytes)? == 0 {
                return Ok(None);
            }
            self.line += 1;
            // The bad line is consumed, so the next read moves past it.
            let mut buf = String::from_utf8(bytes).map_err(|e| SourceError::Malformed {
                line: self.line,
                reason: e.utf8_error().to_string(),
            })?;
            let trimmed_len = buf.trim_end_matches(['\n', '\r']).len();
            buf.truncate(trimmed_len);
            if self.skip_blank && buf.trim().is_empty() {
                continue;
            }
            return Ok(Some(buf));
        }
    }

    fn close(&mut self) -> Result<(), SourceError> {
        self.reader = None;
        Ok(())
    }
}
