//! # streamdecode-core
//!
//! Contracts and primitives shared across all streamdecode crates: the
//! sequential `RecordSource`, the `DecodeFn` transform, the `RecordReader`
//! pull interface, the error taxonomy, and a single-threaded decoder that
//! serves as the ordering reference for the concurrent one.

pub mod base;
pub mod decoder;
pub mod error;
pub mod reader;
pub mod sequential;
pub mod source;

pub use base::{DecodeHandle, RecordDecoder};
pub use decoder::{DecodeFn, DecodeObserver, NoopObserver};
pub use error::{DecodeError, PipelineError, SourceError};
pub use reader::{RecordReader, Values};
pub use sequential::SequentialDecoder;
pub use source::{Generator, IterSource, LineSource, RecordSource};
