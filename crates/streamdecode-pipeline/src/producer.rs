//! The background producer loop.
//!
//! One producer thread per decoder pulls raw records from the source,
//! submits each decode to the worker pool and pushes the resulting
//! `PendingTask` into the bounded hand-off queue. A full queue blocks the
//! producer until a reader dequeues or the decoder shuts down.

use crate::config::ProducerErrorPolicy;
use crate::metrics::DecoderStats;
use crate::state::{DecoderState, StateCell};
use crate::task::PendingTask;
use crossbeam_channel::{select_biased, Receiver, Sender};
use rayon::ThreadPool;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;
use streamdecode_core::{
    DecodeFn, DecodeHandle, DecodeObserver, PipelineError, RecordDecoder, RecordSource,
};
use tracing::{debug, error, info};

/// State shared by the reader side, the producer thread and the workers.
pub(crate) struct Shared {
    pub(crate) closed: AtomicBool,
    pub(crate) state: StateCell,
    pub(crate) stats: DecoderStats,
    pub(crate) observer: Arc<dyn DecodeObserver>,
    pub(crate) policy: ProducerErrorPolicy,
    terminal: Mutex<Option<PipelineError>>,
}

impl Shared {
    pub(crate) fn new(observer: Arc<dyn DecodeObserver>, policy: ProducerErrorPolicy) -> Self {
        Self {
            closed: AtomicBool::new(false),
            state: StateCell::new(),
            stats: DecoderStats::default(),
            observer,
            policy,
            terminal: Mutex::new(None),
        }
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Failure readers should see once the queue has drained, if any.
    pub(crate) fn terminal_error(&self) -> Option<PipelineError> {
        lock(&self.terminal).clone()
    }

    fn set_terminal_error(&self, err: PipelineError) {
        lock(&self.terminal).get_or_insert(err);
    }
}

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

enum Step {
    Enqueued,
    EndOfStream,
    Shutdown,
}

pub(crate) struct Producer<S, V, F> {
    pub(crate) base: Arc<Mutex<RecordDecoder<S, V, F>>>,
    pub(crate) decode: DecodeHandle<F, V>,
    pub(crate) pool: Arc<ThreadPool>,
    pub(crate) queue: Sender<PendingTask<V>>,
    pub(crate) shutdown: Receiver<()>,
    pub(crate) shared: Arc<Shared>,
    pub(crate) next_sequence: u64,
}

impl<S, V, F> Producer<S, V, F>
where
    S: RecordSource + 'static,
    V: Send + 'static,
    F: DecodeFn<S::Record, V> + 'static,
{
    /// Run until end of stream, failure or shutdown.
    ///
    /// `first` fires exactly once: after the first enqueue, on immediate end
    /// of stream or shutdown, or with the failure of the first iteration.
    pub(crate) fn run(mut self, first: Sender<Result<(), PipelineError>>) {
        let mut first = Some(first);

        let stop = loop {
            if self.shared.is_closed() {
                break Step::Shutdown;
            }
            match self.step() {
                Ok(Step::Enqueued) => {
                    if let Some(barrier) = first.take() {
                        let _ = barrier.send(Ok(()));
                    }
                }
                Ok(stop) => break stop,
                Err(err) => {
                    self.shared.state.advance(DecoderState::Errored);
                    match first.take() {
                        Some(barrier) => {
                            let _ = barrier.send(Err(err));
                        }
                        None => self.report(err),
                    }
                    return;
                }
            }
        };

        if let Some(barrier) = first.take() {
            let _ = barrier.send(Ok(()));
        }
        match stop {
            Step::EndOfStream => {
                self.shared.state.advance(DecoderState::Drained);
                info!(
                    records = self.next_sequence,
                    "streamdecode: source exhausted, producer finished"
                );
            }
            _ => debug!(
                records = self.next_sequence,
                "streamdecode: producer stopped on shutdown"
            ),
        }
    }

    fn step(&mut self) -> Result<Step, PipelineError> {
        let record = lock(&self.base).read_record()?;
        let Some(record) = record else {
            return Ok(Step::EndOfStream);
        };
        self.shared.stats.record_read();
        self.shared.observer.on_record_read();

        let task = self.submit(record);

        if self.queue.is_full() {
            self.shared.stats.backpressure();
            self.shared.observer.on_backpressure();
            debug!(
                capacity = ?self.queue.capacity(),
                "streamdecode: hand-off queue full, producer waiting"
            );
        }

        // Shutdown wins over a queue that happens to have room.
        select_biased! {
            recv(self.shutdown) -> _ => Ok(Step::Shutdown),
            send(self.queue, task) -> sent => {
                sent.map_err(|_| PipelineError::lifecycle("hand-off queue disconnected"))?;
                Ok(Step::Enqueued)
            }
        }
    }

    /// Hand one record to the worker pool.
    fn submit(&mut self, record: S::Record) -> PendingTask<V> {
        let sequence = self.next_sequence;
        self.next_sequence += 1;

        let (tx, rx) = crossbeam_channel::bounded(1);
        let decode = self.decode.clone();
        let shared = Arc::clone(&self.shared);
        self.pool.spawn(move || {
            let started = Instant::now();
            let outcome = decode.decode(record);
            match &outcome {
                Ok(_) => shared.observer.on_decoded(started.elapsed()),
                Err(err) => {
                    shared.stats.decode_failed();
                    shared.observer.on_decode_error(err);
                }
            }
            // The reader may have gone away; the result is simply dropped.
            let _ = tx.send(outcome);
        });
        self.shared.stats.task_submitted();

        PendingTask::new(sequence, rx)
    }

    /// Out-of-band report of a failure after the first record.
    fn report(&self, err: PipelineError) {
        error!(
            error = %err,
            after_records = self.next_sequence,
            "streamdecode: producer stopped on failure"
        );
        if let PipelineError::Source(source) = &err {
            self.shared.observer.on_producer_error(source);
        }
        if self.shared.policy == ProducerErrorPolicy::Surface {
            self.shared.set_terminal_error(err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use streamdecode_core::{DecodeError, Generator, NoopObserver};

    #[test]
    fn shutdown_wins_over_a_queue_with_room() {
        let pool = rayon::ThreadPoolBuilder::new().num_threads(1).build().unwrap();
        let identity = |i: u64| -> Result<u64, DecodeError> { Ok(i) };
        let base = RecordDecoder::new(Generator::new(|i| i, 1_000), identity);
        let (queue_tx, queue_rx) = crossbeam_channel::bounded(4);
        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded::<()>(0);
        drop(shutdown_tx);

        let mut producer = Producer {
            decode: base.decode_handle(),
            base: Arc::new(Mutex::new(base)),
            pool: Arc::new(pool),
            queue: queue_tx,
            shutdown: shutdown_rx,
            shared: Arc::new(Shared::new(Arc::new(NoopObserver), ProducerErrorPolicy::Log)),
            next_sequence: 0,
        };

        // Both arms are ready on every step; only shutdown may be taken.
        for _ in 0..64 {
            assert!(matches!(producer.step(), Ok(Step::Shutdown)));
            assert!(queue_rx.is_empty());
        }
    }
}
