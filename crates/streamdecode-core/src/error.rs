//! Error types for the streamdecode pipeline.
//!
//! All errors are `Clone`: a failure captured by the background producer can
//! be handed to every subsequent reader.

use std::sync::Arc;
use thiserror::Error;

/// Errors raised while pulling a raw record from a source.
#[derive(Debug, Clone, Error)]
pub enum SourceError {
    #[error("IO error: {0}")]
    Io(Arc<std::io::Error>),

    #[error("Malformed record at line {line}: {reason}")]
    Malformed { line: u64, reason: String },

    #[error("Source already closed")]
    Closed,

    #[error("{0}")]
    Other(String),
}

impl From<std::io::Error> for SourceError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(Arc::new(err))
    }
}

/// Errors raised while applying the decode function to a single record.
#[derive(Debug, Clone, Error)]
pub enum DecodeError {
    #[error("Invalid record: {reason}")]
    InvalidRecord { reason: String },

    /// The worker running the decode went away without producing a result
    /// (it panicked, or the pool was torn down first).
    #[error("Decode worker exited without a result")]
    WorkerLost,
}

impl DecodeError {
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidRecord {
            reason: reason.into(),
        }
    }
}

/// Errors surfaced to callers of a decoder.
#[derive(Debug, Clone, Error)]
pub enum PipelineError {
    #[error("Source read failed: {0}")]
    Source(#[from] SourceError),

    #[error("Decode failed for record #{sequence}: {source}")]
    Decode {
        sequence: u64,
        #[source]
        source: DecodeError,
    },

    /// Starting, joining or stopping a background thread failed.
    #[error("Lifecycle error: {reason}")]
    Lifecycle { reason: String },

    #[error("Invalid decoder configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error("Decoder is closed")]
    Closed,
}

impl PipelineError {
    pub fn lifecycle(reason: impl Into<String>) -> Self {
        Self::Lifecycle {
            reason: reason.into(),
        }
    }

    /// Returns `true` if the failure belongs to a single record and the
    /// stream can still be read past it.
    pub fn is_record_level(&self) -> bool {
        matches!(self, Self::Decode { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_errors_convert_into_source_errors() {
        let err: SourceError = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "eof").into();
        assert!(matches!(err, SourceError::Io(_)));
        assert_eq!(err.to_string(), "IO error: eof");
    }

    #[test]
    fn decode_failures_are_record_level() {
        let err = PipelineError::Decode {
            sequence: 7,
            source: DecodeError::invalid("not a number"),
        };
        assert!(err.is_record_level());
        assert_eq!(
            err.to_string(),
            "Decode failed for record #7: Invalid record: not a number"
        );

        let err: PipelineError = SourceError::Closed.into();
        assert!(!err.is_record_level());
    }
}
