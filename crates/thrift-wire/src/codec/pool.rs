//! Recycling pools for lazy collection view storage.
//!
//! Each lazy view owns a boxed [`ViewSlot`] taken from a process-wide pool
//! for its shape (list-like or map-like). Releasing a view resets its slot,
//! dropping the decoder back-reference, and returns it to the free list.
//!
//! A slot is owned by exactly one live view at a time: acquiring pops it off
//! the free list under the lock, so two acquires can never observe the same
//! slot before it is released again.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use lazy_static::lazy_static;
use tracing::trace;

use crate::codec::offset::Decoder;
use crate::limits::MAX_IDLE_VIEWS;

/// Mutable state of one lazy view.
#[derive(Debug, Default)]
pub(crate) struct ViewSlot {
    pub(crate) count: usize,
    pub(crate) start: u64,
    /// Offset of the next element to materialize.
    pub(crate) next: u64,
    pub(crate) consumed: usize,
    pub(crate) depth: usize,
    pub(crate) decoder: Option<Decoder>,
}

impl ViewSlot {
    fn reset(&mut self) {
        *self = ViewSlot::default();
    }
}

/// Counters describing pool activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PoolStats {
    /// Slots allocated because the free list was empty.
    pub created: u64,
    /// Acquires served from the free list.
    pub reused: u64,
    /// Slots currently waiting on the free list.
    pub idle: usize,
}

/// A free list of view slots.
#[derive(Debug)]
pub struct ViewPool {
    shape: &'static str,
    free: Mutex<Vec<Box<ViewSlot>>>,
    max_idle: usize,
    created: AtomicU64,
    reused: AtomicU64,
}

impl ViewPool {
    pub(crate) fn new(shape: &'static str, max_idle: usize) -> Self {
        Self {
            shape,
            free: Mutex::new(Vec::new()),
            max_idle,
            created: AtomicU64::new(0),
            reused: AtomicU64::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Box<ViewSlot>>> {
        // Slots are reset before they are pushed, so a poisoned list is still consistent.
        self.free.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Takes a reset slot, allocating one if none is idle.
    pub(crate) fn acquire(&self) -> Box<ViewSlot> {
        let recycled = self.lock().pop();
        match recycled {
            Some(slot) => {
                self.reused.fetch_add(1, Ordering::Relaxed);
                slot
            }
            None => {
                self.created.fetch_add(1, Ordering::Relaxed);
                trace!(shape = self.shape, "allocating lazy view slot");
                Box::default()
            }
        }
    }

    /// Resets a slot and returns it to the free list.
    pub(crate) fn release(&self, mut slot: Box<ViewSlot>) {
        slot.reset();
        let mut free = self.lock();
        if free.len() < self.max_idle {
            free.push(slot);
        } else {
            trace!(shape = self.shape, idle = free.len(), "dropping surplus lazy view slot");
        }
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            created: self.created.load(Ordering::Relaxed),
            reused: self.reused.load(Ordering::Relaxed),
            idle: self.lock().len(),
        }
    }
}

lazy_static! {
    /// Storage for lazy list and set views.
    pub(crate) static ref LIST_VIEWS: ViewPool = ViewPool::new("list", MAX_IDLE_VIEWS);
    /// Storage for lazy map views.
    pub(crate) static ref MAP_VIEWS: ViewPool = ViewPool::new("map", MAX_IDLE_VIEWS);
}

/// Returns activity counters for the list/set view pool.
pub fn list_pool_stats() -> PoolStats {
    LIST_VIEWS.stats()
}

/// Returns activity counters for the map view pool.
pub fn map_pool_stats() -> PoolStats {
    MAP_VIEWS.stats()
}
