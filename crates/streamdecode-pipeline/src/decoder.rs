//! `ConcurrentDecoder`: order-preserving multi-thread decoding.

use crate::config::DecoderConfig;
use crate::metrics::DecoderMetrics;
use crate::producer::{lock, Producer, Shared};
use crate::state::DecoderState;
use crate::task::PendingTask;
use crossbeam_channel::{Receiver, Sender};
use rayon::ThreadPool;
use std::any::Any;
use std::marker::PhantomData;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex, OnceLock};
use std::thread::JoinHandle;
use streamdecode_core::{
    DecodeFn, DecodeHandle, DecodeObserver, NoopObserver, PipelineError, RecordDecoder,
    RecordReader, RecordSource,
};
use tracing::{error, info, warn};

/// Reads raw records on a background thread, decodes them on a fixed pool
/// of `max_parallelism` workers, and hands the results back in source order.
///
/// Nothing runs until the first [`read`](Self::read). At most
/// `max_parallelism` decoded-or-decoding records wait in the hand-off queue;
/// the producer blocks while the queue is full.
///
/// # Usage
/// ```no_run
/// use streamdecode_core::{DecodeError, Generator};
/// use streamdecode_pipeline::ConcurrentDecoder;
///
/// # fn main() -> Result<(), streamdecode_core::PipelineError> {
/// let source = Generator::new(|i| i.to_string(), 1_000);
/// let decoder = ConcurrentDecoder::new(
///     source,
///     |raw: String| raw.parse::<u64>().map_err(|e| DecodeError::invalid(e.to_string())),
///     8,
/// )?;
/// while let Some(value) = decoder.read()? {
///     println!("{value}");
/// }
/// decoder.close()?;
/// # Ok(())
/// # }
/// ```
pub struct ConcurrentDecoder<S, V, F>
where
    S: RecordSource + 'static,
    V: Send + 'static,
    F: DecodeFn<S::Record, V> + 'static,
{
    config: DecoderConfig,
    base: Arc<Mutex<RecordDecoder<S, V, F>>>,
    decode: DecodeHandle<F, V>,
    shared: Arc<Shared>,
    pool: Mutex<Option<Arc<ThreadPool>>>,
    queue_rx: Receiver<PendingTask<V>>,
    /// Moved into the producer on start; the producer owns the only sender.
    queue_tx: Mutex<Option<Sender<PendingTask<V>>>>,
    /// Never sent on; dropping it wakes a producer blocked on a full queue.
    shutdown_tx: Mutex<Option<Sender<()>>>,
    shutdown_rx: Receiver<()>,
    producer: Mutex<Option<JoinHandle<()>>>,
    /// Worker threads spawned for the pool, joined by `close`.
    workers: Mutex<Vec<JoinHandle<()>>>,
    started: OnceLock<Result<(), PipelineError>>,
}

impl<S, V, F> ConcurrentDecoder<S, V, F>
where
    S: RecordSource + 'static,
    V: Send + 'static,
    F: DecodeFn<S::Record, V> + 'static,
{
    /// Create a decoder with the default config and the given parallelism.
    pub fn new(source: S, decode: F, max_parallelism: usize) -> Result<Self, PipelineError> {
        Self::builder(source, decode)
            .max_parallelism(max_parallelism)
            .build()
    }

    pub fn builder(source: S, decode: F) -> DecoderBuilder<S, V, F> {
        DecoderBuilder {
            source,
            decode,
            config: DecoderConfig::default(),
            observer: Arc::new(NoopObserver),
            _out: PhantomData,
        }
    }

    /// Next decoded value in source order, or `None` at end of stream.
    ///
    /// The first call starts the producer and waits until it has queued its
    /// first record, found the source empty, or failed; a failure there is
    /// returned now and by every later call. A decode failure is returned by
    /// the call that reaches that record; the following call moves on.
    pub fn read(&self) -> Result<Option<V>, PipelineError> {
        if self.shared.is_closed() {
            return Err(PipelineError::Closed);
        }
        self.ensure_started()?;

        match self.queue_rx.recv() {
            Ok(task) => {
                let value = task.resolve()?;
                self.shared.stats.value_delivered();
                Ok(Some(value))
            }
            // Producer gone and queue drained.
            Err(_) => {
                if self.shared.is_closed() {
                    return Err(PipelineError::Closed);
                }
                match self.shared.terminal_error() {
                    Some(err) => Err(err),
                    None => Ok(None),
                }
            }
        }
    }

    /// Stop the producer, shut down the worker pool and close the source.
    ///
    /// Returns once the producer and every worker thread have exited;
    /// decodes already submitted run to completion first. Safe to call at any point and more than once; the source is closed
    /// only by the first call. Every step runs even if an earlier one
    /// fails, and the first failure is returned.
    pub fn close(&self) -> Result<(), PipelineError> {
        let first_close = !self.shared.closed.swap(true, Ordering::AcqRel);
        self.shared.state.close();

        drop(lock(&self.shutdown_tx).take());

        let mut outcome = Ok(());
        {
            // Same lock order as `start`: a producer spawned concurrently is
            // either seen here or never spawned.
            let mut slot = lock(&self.producer);
            drop(lock(&self.queue_tx).take());
            if let Some(handle) = slot.take() {
                if handle.join().is_err() {
                    outcome = Err(PipelineError::lifecycle("producer thread panicked"));
                }
            }
        }

        // Dropping the last pool handle lets the workers drain what was
        // already submitted and exit; join them so none outlive `close`.
        drop(lock(&self.pool).take());
        {
            let mut workers = lock(&self.workers);
            for worker in workers.drain(..) {
                if worker.join().is_err() {
                    let err = PipelineError::lifecycle("decode worker thread panicked");
                    outcome = outcome.and(Err(err));
                }
            }
        }
        while self.queue_rx.try_recv().is_ok() {}

        if first_close {
            if let Err(err) = lock(&self.base).close() {
                outcome = outcome.and(Err(err.into()));
            }
            info!(
                metrics = ?self.shared.stats.snapshot(),
                "streamdecode: decoder closed"
            );
        }
        outcome
    }

    pub fn state(&self) -> DecoderState {
        self.shared.state.get()
    }

    pub fn metrics(&self) -> DecoderMetrics {
        self.shared.stats.snapshot()
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    fn ensure_started(&self) -> Result<(), PipelineError> {
        self.started.get_or_init(|| self.start()).clone()
    }

    fn start(&self) -> Result<(), PipelineError> {
        let (first_tx, first_rx) = crossbeam_channel::bounded(1);
        {
            // Holding the slot keeps `close` from missing a producer spawned
            // concurrently with it.
            let mut slot = lock(&self.producer);
            if self.shared.is_closed() {
                return Err(PipelineError::Closed);
            }
            let pool = lock(&self.pool).clone().ok_or(PipelineError::Closed)?;
            let queue = lock(&self.queue_tx).take().ok_or_else(|| {
                if self.shared.is_closed() {
                    PipelineError::Closed
                } else {
                    PipelineError::lifecycle("producer already started")
                }
            })?;

            let producer = Producer {
                base: Arc::clone(&self.base),
                decode: self.decode.clone(),
                pool,
                queue,
                shutdown: self.shutdown_rx.clone(),
                shared: Arc::clone(&self.shared),
                next_sequence: 0,
            };
            self.shared.state.advance(DecoderState::Running);
            let spawned = std::thread::Builder::new()
                .name(format!("{}-producer", self.config.thread_name))
                .spawn(move || producer.run(first_tx));
            match spawned {
                Ok(handle) => *slot = Some(handle),
                Err(e) => {
                    self.shared.state.advance(DecoderState::Errored);
                    return Err(PipelineError::lifecycle(format!(
                        "failed to spawn producer thread: {e}"
                    )));
                }
            }
        }
        info!(
            max_parallelism = self.config.max_parallelism,
            thread = %self.config.thread_name,
            "streamdecode: producer started"
        );

        match first_rx.recv() {
            Ok(first) => first,
            Err(_) if self.shared.is_closed() => Err(PipelineError::Closed),
            Err(_) => Err(PipelineError::lifecycle(
                "producer exited before reporting its first result",
            )),
        }
    }
}

impl<S, V, F> Drop for ConcurrentDecoder<S, V, F>
where
    S: RecordSource + 'static,
    V: Send + 'static,
    F: DecodeFn<S::Record, V> + 'static,
{
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            warn!(error = %err, "streamdecode: close on drop failed");
        }
    }
}

impl<S, V, F> RecordReader for ConcurrentDecoder<S, V, F>
where
    S: RecordSource + 'static,
    V: Send + 'static,
    F: DecodeFn<S::Record, V> + 'static,
{
    type Value = V;

    fn read(&mut self) -> Result<Option<V>, PipelineError> {
        ConcurrentDecoder::read(self)
    }

    fn close(&mut self) -> Result<(), PipelineError> {
        ConcurrentDecoder::close(self)
    }
}

// ─── Builder ──────────────────────────────────────────────────────────────────

/// Configures and builds a [`ConcurrentDecoder`].
pub struct DecoderBuilder<S, V, F> {
    source: S,
    decode: F,
    config: DecoderConfig,
    observer: Arc<dyn DecodeObserver>,
    _out: PhantomData<fn() -> V>,
}

impl<S, V, F> DecoderBuilder<S, V, F>
where
    S: RecordSource + 'static,
    V: Send + 'static,
    F: DecodeFn<S::Record, V> + 'static,
{
    /// Replace the whole config.
    pub fn config(mut self, config: DecoderConfig) -> Self {
        self.config = config;
        self
    }

    pub fn max_parallelism(mut self, n: usize) -> Self {
        self.config.max_parallelism = n;
        self
    }

    pub fn thread_name(mut self, name: impl Into<String>) -> Self {
        self.config.thread_name = name.into();
        self
    }

    pub fn observer(mut self, observer: Arc<dyn DecodeObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Validate the config and build the hand-off queue and worker pool.
    /// No thread reads from the source until the first `read`.
    pub fn build(self) -> Result<ConcurrentDecoder<S, V, F>, PipelineError> {
        self.config.validate()?;

        let worker_prefix = self.config.thread_name.clone();
        let spawned: Arc<Mutex<Vec<JoinHandle<()>>>> = Arc::default();
        let handles = Arc::clone(&spawned);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.max_parallelism)
            .thread_name(move |i| format!("{worker_prefix}-worker-{i}"))
            .spawn_handler(move |thread| {
                let mut builder = std::thread::Builder::new();
                if let Some(name) = thread.name() {
                    builder = builder.name(name.to_owned());
                }
                if let Some(size) = thread.stack_size() {
                    builder = builder.stack_size(size);
                }
                let handle = builder.spawn(move || thread.run())?;
                lock(&handles).push(handle);
                Ok(())
            })
            .panic_handler(|payload| {
                error!(
                    panic = panic_message(payload.as_ref()),
                    "streamdecode: decode worker panicked"
                );
            })
            .build()
            .map_err(|e| PipelineError::lifecycle(format!("failed to build worker pool: {e}")))?;

        let workers = std::mem::take(&mut *lock(&spawned));

        let (queue_tx, queue_rx) = crossbeam_channel::bounded(self.config.max_parallelism);
        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded(0);

        let base = RecordDecoder::new(self.source, self.decode);
        let decode = base.decode_handle();

        Ok(ConcurrentDecoder {
            shared: Arc::new(Shared::new(self.observer, self.config.on_producer_error)),
            config: self.config,
            base: Arc::new(Mutex::new(base)),
            decode,
            pool: Mutex::new(Some(Arc::new(pool))),
            queue_rx,
            queue_tx: Mutex::new(Some(queue_tx)),
            shutdown_tx: Mutex::new(Some(shutdown_tx)),
            shutdown_rx,
            producer: Mutex::new(None),
            workers: Mutex::new(workers),
            started: OnceLock::new(),
        })
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}
