//! # streamdecode-pipeline
//!
//! Order-preserving, multi-thread decoding of a sequential record stream.
//!
//! ## Features
//! - Lazy start: no thread touches the source before the first `read`
//! - Bounded hand-off queue (`max_parallelism` slots) with blocking backpressure
//! - Fixed Rayon worker pool of `max_parallelism` threads
//! - Values delivered in source order regardless of decode completion order
//! - Cooperative, bounded shutdown via `close` (also run on drop)
//!
//! ## Architecture
//! ```text
//! RecordSource ──► producer thread ──► rayon pool (decode)
//!                        │                    │
//!                        ▼                    ▼
//!            bounded queue of PendingTask ◄── result slot
//!                        │
//!                        ▼
//!              ConcurrentDecoder::read (FIFO)
//! ```

pub mod config;
pub mod decoder;
pub mod metrics;
mod producer;
pub mod state;
pub mod task;

pub use config::{DecoderConfig, ProducerErrorPolicy};
pub use decoder::{ConcurrentDecoder, DecoderBuilder};
pub use metrics::DecoderMetrics;
pub use state::DecoderState;
pub use task::PendingTask;
