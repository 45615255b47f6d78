use serde::Serialize;
use std::marker::PhantomData;
use std::mem;

use crate::record::{Record, RecordHandle};

/// A byte budget: an upper bound plus the amount charged against it so far.
/// `used <= capacity` holds whenever a charge goes through `charge`.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteBudget {
    capacity: usize,
    used: usize,
}

impl ByteBudget {
    pub fn new(capacity: usize) -> Self {
        ByteBudget { capacity, used: 0 }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn used(&self) -> usize {
        self.used
    }

    pub fn available(&self) -> usize {
        self.capacity - self.used
    }

    // Whether `cost` could ever fit, even with nothing else charged.
    pub fn admits(&self, cost: usize) -> bool {
        cost <= self.capacity
    }

    // Whether `cost` fits alongside what is already charged.
    pub fn fits(&self, cost: usize) -> bool {
        cost <= self.available()
    }

    pub fn charge(&mut self, cost: usize) {
        debug_assert!(self.fits(cost), "charge of {cost} overruns budget");
        self.used += cost;
    }

    pub fn release(&mut self, cost: usize) {
        debug_assert!(cost <= self.used, "release of {cost} exceeds used bytes");
        self.used -= cost;
    }

    pub fn reset(&mut self) {
        self.used = 0;
    }
}

/// Computes what one stored handle costs against a [`ByteBudget`].
///
/// The cost is the record's own footprint plus a fixed per-element overhead
/// that stands in for the container's bookkeeping. The default overhead is
/// one handle plus one cost word, the size of a stored slot.
#[derive(Debug)]
pub struct ElementCost<R> {
    overhead: usize,
    _record: PhantomData<fn(&R)>,
}

impl<R> Clone for ElementCost<R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<R> Copy for ElementCost<R> {}

impl<R: Record> ElementCost<R> {
    pub fn new(overhead: usize) -> Self {
        ElementCost {
            overhead,
            _record: PhantomData,
        }
    }

    pub fn default_overhead() -> usize {
        mem::size_of::<RecordHandle<R>>() + mem::size_of::<usize>()
    }

    pub fn overhead(&self) -> usize {
        self.overhead
    }

    pub fn of(&self, handle: &RecordHandle<R>) -> usize {
        handle.footprint().saturating_add(self.overhead)
    }
}

impl<R: Record> Default for ElementCost<R> {
    fn default() -> Self {
        Self::new(Self::default_overhead())
    }
}
