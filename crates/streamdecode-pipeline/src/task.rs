//! `PendingTask`: one decode operation in flight.

use crossbeam_channel::Receiver;
use streamdecode_core::{DecodeError, PipelineError};

/// Handle to the eventual result of one decode, tagged with its position in
/// submission order. The worker sends exactly one result, or drops the
/// sender if it never finishes.
#[derive(Debug)]
pub struct PendingTask<V> {
    sequence: u64,
    result: Receiver<Result<V, DecodeError>>,
}

impl<V> PendingTask<V> {
    pub(crate) fn new(sequence: u64, result: Receiver<Result<V, DecodeError>>) -> Self {
        Self { sequence, result }
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Block until the decode finishes.
    pub fn resolve(self) -> Result<V, PipelineError> {
        let outcome = self.result.recv().unwrap_or(Err(DecodeError::WorkerLost));
        outcome.map_err(|source| PipelineError::Decode {
            sequence: self.sequence,
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_the_sent_value() {
        let (tx, rx) = crossbeam_channel::bounded(1);
        tx.send(Ok(11u32)).unwrap();
        let task = PendingTask::new(3, rx);
        assert_eq!(task.sequence(), 3);
        assert_eq!(task.resolve().unwrap(), 11);
    }

    #[test]
    fn dropped_worker_is_reported() {
        let (tx, rx) = crossbeam_channel::bounded::<Result<u32, DecodeError>>(1);
        drop(tx);
        let err = PendingTask::new(9, rx).resolve().unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Decode {
                sequence: 9,
                source: DecodeError::WorkerLost
            }
        ));
    }
}
