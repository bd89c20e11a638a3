//! Decoder lifecycle state.
//!
//! Transitions:
//! - `NotStarted` → `Running`: first `read`
//! - `Running` → `Drained`:    the source reported end of stream
//! - `Running` → `Errored`:    the producer stopped on a failure
//! - any → `Closed`:           `close` (terminal)

use std::sync::atomic::{AtomicU8, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderState {
    NotStarted,
    Running,
    Drained,
    Errored,
    Closed,
}

impl std::fmt::Display for DecoderState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotStarted => write!(f, "not-started"),
            Self::Running => write!(f, "running"),
            Self::Drained => write!(f, "drained"),
            Self::Errored => write!(f, "errored"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

impl DecoderState {
    fn as_u8(self) -> u8 {
        match self {
            Self::NotStarted => 0,
            Self::Running => 1,
            Self::Drained => 2,
            Self::Errored => 3,
            Self::Closed => 4,
        }
    }

    fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::NotStarted,
            1 => Self::Running,
            2 => Self::Drained,
            3 => Self::Errored,
            _ => Self::Closed,
        }
    }
}

/// Atomic cell shared by the reader side and the producer thread.
#[derive(Debug)]
pub(crate) struct StateCell(AtomicU8);

impl StateCell {
    pub(crate) fn new() -> Self {
        Self(AtomicU8::new(DecoderState::NotStarted.as_u8()))
    }

    pub(crate) fn get(&self) -> DecoderState {
        DecoderState::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Move to `next` unless the decoder is already closed.
    pub(crate) fn advance(&self, next: DecoderState) {
        let _ = self
            .0
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |cur| {
                (cur != DecoderState::Closed.as_u8()).then_some(next.as_u8())
            });
    }

    pub(crate) fn close(&self) {
        self.0.store(DecoderState::Closed.as_u8(), Ordering::Release);
    }
}
