//! The record buffer protocol.
//!
//! A record buffer is a double-ended, thread-safe container of
//! [`RecordHandle`]s. Producers push at either end; consumers pop from either
//! end, or take a [`RecordSequence`] to run several operations without other
//! threads interleaving. Concrete buffers decide how they make room.

use thiserror::Error;

use crate::record::{Record, RecordHandle};

/// One of the two ends of a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum End {
    Front,
    Back,
}

impl End {
    pub fn opposite(self) -> End {
        match self {
            End::Front => End::Back,
            End::Back => End::Front,
        }
    }
}

/// Result of a push. Discarding is an expected outcome, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum PushOutcome {
    /// The handle was stored; `evicted` handles were removed to make room.
    Accepted { evicted: usize },
    /// The handle could never fit and was dropped. Buffer state is unchanged.
    Discarded,
}

impl PushOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, PushOutcome::Accepted { .. })
    }

    pub fn evicted(&self) -> usize {
        match self {
            PushOutcome::Accepted { evicted } => *evicted,
            PushOutcome::Discarded => 0,
        }
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum RecordBufferError {
    #[error("record buffer capacity must be greater than zero")]
    ZeroCapacity,
    #[error("record buffer is empty")]
    Empty,
}

/// Operations on a buffer while its sequence lock is held.
///
/// Dropping the sequence releases the lock. Sequences nest on the same thread.
pub trait RecordSequence<R: Record> {
    /// The handle at the front end.
    fn front(&self) -> Result<RecordHandle<R>, RecordBufferError>;
    /// The handle at the back end.
    fn back(&self) -> Result<RecordHandle<R>, RecordBufferError>;
    fn push_back(&self, handle: RecordHandle<R>) -> PushOutcome;
    fn push_front(&self, handle: RecordHandle<R>) -> PushOutcome;
    fn pop_back(&self) -> Result<RecordHandle<R>, RecordBufferError>;
    fn pop_front(&self) -> Result<RecordHandle<R>, RecordBufferError>;
    fn remove_all(&self);
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A thread-safe double-ended buffer of record handles.
///
/// Every method takes the buffer's lock for the length of the call. Reading
/// the handle at either end needs the lock held across calls, so `front` and
/// `back` only exist on the [`RecordSequence`] returned by `begin_sequence`.
pub trait RecordBuffer<R: Record>: Send + Sync {
    /// Lock the buffer until the returned sequence is dropped.
    fn begin_sequence(&self) -> Box<dyn RecordSequence<R> + '_>;
    fn push_back(&self, handle: RecordHandle<R>) -> PushOutcome;
    fn push_front(&self, handle: RecordHandle<R>) -> PushOutcome;
    fn pop_back(&self) -> Result<RecordHandle<R>, RecordBufferError>;
    fn pop_front(&self) -> Result<RecordHandle<R>, RecordBufferError>;
    fn remove_all(&self);
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
