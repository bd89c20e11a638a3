//! `RecordReader`: the pull interface every decoder exposes to callers.

use crate::error::PipelineError;

/// A pull-based stream of decoded values.
pub trait RecordReader {
    type Value;

    /// Next value in source order, or `None` once the stream is exhausted.
    fn read(&mut self) -> Result<Option<Self::Value>, PipelineError>;

    /// Release every resource held by the reader.
    fn close(&mut self) -> Result<(), PipelineError>;

    /// Iterate over the remaining values.
    fn values(&mut self) -> Values<'_, Self>
    where
        Self: Sized,
    {
        Values {
            reader: self,
            done: false,
        }
    }
}

/// Iterator returned by [`RecordReader::values`].
///
/// Record-level decode failures are yielded and iteration continues; any
/// other error is yielded once and ends the iteration.
pub struct Values<'a, R> {
    reader: &'a mut R,
    done: bool,
}

impl<R: RecordReader> Iterator for Values<'_, R> {
    type Item = Result<R::Value, PipelineError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.reader.read() {
            Ok(Some(value)) => Some(Ok(value)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = !err.is_record_level();
                Some(Err(err))
            }
        }
    }
}
