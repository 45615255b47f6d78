use parking_lot::{ReentrantMutex, ReentrantMutexGuard};
use rand::{Rng, thread_rng};
use serde::Serialize;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::mem;
use std::sync::Arc;
use tracing::{debug, info, trace};

use crate::budget::{ByteBudget, ElementCost};
use crate::config::{BufferConfig, EvictionKind};
use crate::record::{Record, RecordHandle};
use crate::recordbuffer::{End, PushOutcome, RecordBuffer, RecordBufferError, RecordSequence};

/// Picks the end to evict from, given the end being pushed to.
pub type EvictorFn = fn(End) -> End;

/// Evict from the end opposite the push: a push at the back drops the oldest
/// records at the front, and vice versa.
pub fn opposite_end_evictor(pushed: End) -> End {
    pushed.opposite()
}

pub fn front_evictor(_: End) -> End {
    End::Front
}

pub fn random_end_evictor(_: End) -> End {
    if thread_rng().gen_bool(0.5) {
        End::Front
    } else {
        End::Back
    }
}

pub fn evictor_for(kind: EvictionKind) -> EvictorFn {
    match kind {
        EvictionKind::OppositeEnd => opposite_end_evictor,
        EvictionKind::Front => front_evictor,
        EvictionKind::RandomEnd => random_end_evictor,
    }
}

/// Counters kept alongside the buffer contents.
#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct BufferStats {
    pub accepted: u64,
    pub discarded: u64,
    pub evicted: u64,
    pub popped: u64,
    pub high_water_bytes: usize,
}

// A stored handle and the cost charged for it when it went in.
struct Slot<R> {
    handle: RecordHandle<R>,
    cost: usize,
}

struct Inner<R> {
    slots: VecDeque<Slot<R>>,
    budget: ByteBudget,
    stats: BufferStats,
}

impl<R: Record> Inner<R> {
    fn take(&mut self, end: End) -> Option<Slot<R>> {
        let slot = match end {
            End::Front => self.slots.pop_front(),
            End::Back => self.slots.pop_back(),
        }?;
        self.budget.release(slot.cost);
        Some(slot)
    }

    // Handles leaving the buffer come back to the caller, which drops them
    // once the `RefCell` borrow is released: a record's `Drop` may call back
    // into the buffer on this thread.
    fn push(
        &mut self,
        end: End,
        handle: RecordHandle<R>,
        cost: usize,
        evictor: EvictorFn,
    ) -> (PushOutcome, Vec<RecordHandle<R>>) {
        if !self.budget.admits(cost) {
            self.stats.discarded += 1;
            debug!(
                cost,
                capacity = self.budget.capacity(),
                "discarding record larger than buffer capacity"
            );
            return (PushOutcome::Discarded, vec![handle]);
        }

        let mut released = Vec::new();
        while !self.budget.fits(cost) {
            let victim = evictor(end);
            let Some(slot) = self.take(victim) else { break };
            trace!(?victim, cost = slot.cost, "evicted record");
            released.push(slot.handle);
        }

        self.budget.charge(cost);
        let slot = Slot { handle, cost };
        match end {
            End::Front => self.slots.push_front(slot),
            End::Back => self.slots.push_back(slot),
        }

        let evicted = released.len();
        self.stats.accepted += 1;
        self.stats.evicted += evicted as u64;
        self.stats.high_water_bytes = self.stats.high_water_bytes.max(self.budget.used());
        (PushOutcome::Accepted { evicted }, released)
    }

    fn pop(&mut self, end: End) -> Result<RecordHandle<R>, RecordBufferError> {
        let slot = self.take(end).ok_or(RecordBufferError::Empty)?;
        self.stats.popped += 1;
        Ok(slot.handle)
    }

    fn peek(&self, end: End) -> Result<RecordHandle<R>, RecordBufferError> {
        let slot = match end {
            End::Front => self.slots.front(),
            End::Back => self.slots.back(),
        };
        slot.map(|s| Arc::clone(&s.handle)).ok_or(RecordBufferError::Empty)
    }

    fn clear(&mut self) -> VecDeque<Slot<R>> {
        self.budget.reset();
        mem::take(&mut self.slots)
    }
}

/// A thread-safe, double-ended buffer of record handles with a byte budget.
///
/// The sum of the costs of all stored handles never exceeds the capacity
/// given at creation. A handle's cost is its record's footprint plus a fixed
/// per-element overhead (see [`ElementCost`]). To make room for a push the
/// buffer evicts records, by default from the opposite end; a record whose
/// cost alone exceeds the capacity is discarded and the buffer left as is.
///
/// A single re-entrant lock guards all state. [`begin_sequence`] holds it
/// until the returned [`Sequence`] is dropped, and the same thread may keep
/// calling any method on the buffer meanwhile.
///
/// [`begin_sequence`]: FixedSizeRecordBuffer::begin_sequence
pub struct FixedSizeRecordBuffer<R: Record> {
    lock: ReentrantMutex<RefCell<Inner<R>>>,
    cost: ElementCost<R>,
    evictor: EvictorFn,
}

impl<R: Record> FixedSizeRecordBuffer<R> {
    pub fn new(capacity_bytes: usize) -> Result<Self, RecordBufferError> {
        Self::with_options(capacity_bytes, ElementCost::default(), opposite_end_evictor, 0)
    }

    pub fn with_options(
        capacity_bytes: usize,
        cost: ElementCost<R>,
        evictor: EvictorFn,
        reserve: usize,
    ) -> Result<Self, RecordBufferError> {
        if capacity_bytes == 0 {
            return Err(RecordBufferError::ZeroCapacity);
        }
        info!(
            capacity_bytes,
            element_overhead = cost.overhead(),
            "created fixed size record buffer"
        );
        Ok(FixedSizeRecordBuffer {
            lock: ReentrantMutex::new(RefCell::new(Inner {
                slots: VecDeque::with_capacity(reserve),
                budget: ByteBudget::new(capacity_bytes),
                stats: BufferStats::default(),
            })),
            cost,
            evictor,
        })
    }

    pub fn from_config(config: &BufferConfig) -> Result<Self, RecordBufferError> {
        let cost = match config.element_overhead {
            Some(overhead) => ElementCost::new(overhead),
            None => ElementCost::default(),
        };
        Self::with_options(
            config.capacity_bytes,
            cost,
            evictor_for(config.eviction),
            config.reserve,
        )
    }

    /// Lock the buffer for a run of operations. The lock is released when the
    /// returned sequence is dropped or ended.
    pub fn begin_sequence(&self) -> Sequence<'_, R> {
        Sequence {
            buffer: self,
            _guard: self.lock.lock(),
        }
    }

    pub fn push_back(&self, handle: RecordHandle<R>) -> PushOutcome {
        self.push(End::Back, handle)
    }

    pub fn push_front(&self, handle: RecordHandle<R>) -> PushOutcome {
        self.push(End::Front, handle)
    }

    pub fn push(&self, end: End, handle: RecordHandle<R>) -> PushOutcome {
        let cost = self.cost.of(&handle);
        let guard = self.lock.lock();
        let (outcome, released) = guard.borrow_mut().push(end, handle, cost, self.evictor);
        drop(released);
        outcome
    }

    pub fn pop_back(&self) -> Result<RecordHandle<R>, RecordBufferError> {
        self.pop(End::Back)
    }

    pub fn pop_front(&self) -> Result<RecordHandle<R>, RecordBufferError> {
        self.pop(End::Front)
    }

    pub fn pop(&self, end: End) -> Result<RecordHandle<R>, RecordBufferError> {
        let guard = self.lock.lock();
        let mut inner = guard.borrow_mut();
        inner.pop(end)
    }

    pub fn remove_all(&self) {
        let guard = self.lock.lock();
        let released = guard.borrow_mut().clear();
        debug!(released = released.len(), "removed all records");
        drop(released);
    }

    pub fn len(&self) -> usize {
        self.lock.lock().borrow().slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity_bytes(&self) -> usize {
        self.lock.lock().borrow().budget.capacity()
    }

    pub fn used_bytes(&self) -> usize {
        self.lock.lock().borrow().budget.used()
    }

    pub fn stats(&self) -> BufferStats {
        self.lock.lock().borrow().stats.clone()
    }

    pub fn element_cost(&self) -> ElementCost<R> {
        self.cost
    }

    /// Copies of every stored handle, front to back.
    pub fn handles(&self) -> Vec<RecordHandle<R>> {
        let guard = self.lock.lock();
        let inner = guard.borrow();
        inner.slots.iter().map(|s| Arc::clone(&s.handle)).collect()
    }

    fn peek(&self, end: End) -> Result<RecordHandle<R>, RecordBufferError> {
        self.lock.lock().borrow().peek(end)
    }
}

/// The buffer's lock, held for a run of operations.
///
/// Only a sequence gives access to the handles at either end, since without
/// the lock another thread could pop them between the read and its use.
pub struct Sequence<'a, R: Record> {
    buffer: &'a FixedSizeRecordBuffer<R>,
    _guard: ReentrantMutexGuard<'a, RefCell<Inner<R>>>,
}

impl<'a, R: Record> Sequence<'a, R> {
    pub fn front(&self) -> Result<RecordHandle<R>, RecordBufferError> {
        self.buffer.peek(End::Front)
    }

    pub fn back(&self) -> Result<RecordHandle<R>, RecordBufferError> {
        self.buffer.peek(End::Back)
    }

    pub fn push_back(&self, handle: RecordHandle<R>) -> PushOutcome {
        self.buffer.push_back(handle)
    }

    pub fn push_front(&self, handle: RecordHandle<R>) -> PushOutcome {
        self.buffer.push_front(handle)
    }

    pub fn pop_back(&self) -> Result<RecordHandle<R>, RecordBufferError> {
        self.buffer.pop_back()
    }

    pub fn pop_front(&self) -> Result<RecordHandle<R>, RecordBufferError> {
        self.buffer.pop_front()
    }

    pub fn remove_all(&self) {
        self.buffer.remove_all()
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Release the lock. Same as dropping the sequence.
    pub fn end(self) {}
}

impl<'a, R: Record> RecordSequence<R> for Sequence<'a, R> {
    fn front(&self) -> Result<RecordHandle<R>, RecordBufferError> {
        Sequence::front(self)
    }

    fn back(&self) -> Result<RecordHandle<R>, RecordBufferError> {
        Sequence::back(self)
    }

    fn push_back(&self, handle: RecordHandle<R>) -> PushOutcome {
        Sequence::push_back(self, handle)
    }

    fn push_front(&self, handle: RecordHandle<R>) -> PushOutcome {
        Sequence::push_front(self, handle)
    }

    fn pop_back(&self) -> Result<RecordHandle<R>, RecordBufferError> {
        Sequence::pop_back(self)
    }

    fn pop_front(&self) -> Result<RecordHandle<R>, RecordBufferError> {
        Sequence::pop_front(self)
    }

    fn remove_all(&self) {
        Sequence::remove_all(self)
    }

    fn len(&self) -> usize {
        Sequence::len(self)
    }
}

impl<R: Record> RecordBuffer<R> for FixedSizeRecordBuffer<R> {
    fn begin_sequence(&self) -> Box<dyn RecordSequence<R> + '_> {
        Box::new(FixedSizeRecordBuffer::begin_sequence(self))
    }

    fn push_back(&self, handle: RecordHandle<R>) -> PushOutcome {
        FixedSizeRecordBuffer::push_back(self, handle)
    }

    fn push_front(&self, handle: RecordHandle<R>) -> PushOutcome {
        FixedSizeRecordBuffer::push_front(self, handle)
    }

    fn pop_back(&self) -> Result<RecordHandle<R>, RecordBufferError> {
        FixedSizeRecordBuffer::pop_back(self)
    }

    fn pop_front(&self) -> Result<RecordHandle<R>, RecordBufferError> {
        FixedSizeRecordBuffer::pop_front(self)
    }

    fn remove_all(&self) {
        FixedSizeRecordBuffer::remove_all(self)
    }

    fn len(&self) -> usize {
        FixedSizeRecordBuffer::len(self)
    }
}
