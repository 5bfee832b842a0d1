//! Bounded event queue shared between the sampling and application contexts.
//!
//! Fixed capacity, no allocation after construction. Pushing onto a full
//! queue evicts the oldest unread event; there is no backpressure and no
//! sequence numbering, so consumers must tolerate gaps.

use std::sync::{Mutex, MutexGuard};

use heapless::Deque;

use crate::event::ChangeEvent;

/// Number of events retained.
pub const EVENT_QUEUE_CAPACITY: usize = 64;

#[derive(Debug, Default)]
pub struct EventQueue {
    inner: Mutex<Deque<ChangeEvent, EVENT_QUEUE_CAPACITY>>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Deque::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Deque<ChangeEvent, EVENT_QUEUE_CAPACITY>> {
        crate::util::lock(&self.inner)
    }

    /// Append an event. Returns the evicted event when the queue was full.
    pub fn push(&self, event: ChangeEvent) -> Option<ChangeEvent> {
        let mut q = self.lock();
        let evicted = if q.is_full() { q.pop_front() } else { None };
        if q.push_back(event).is_err() {
            // Unreachable after the eviction above.
            return Some(event);
        }
        drop(q);
        if let Some(old) = &evicted {
            tracing::warn!(
                channel = %old.channel,
                kind = old.kind.name(),
                ts = old.timestamp_ms,
                "event queue full; dropped oldest event"
            );
        }
        evicted
    }

    /// Oldest pending event, FIFO.
    pub fn pop(&self) -> Option<ChangeEvent> {
        self.lock().pop_front()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub const fn capacity(&self) -> usize {
        EVENT_QUEUE_CAPACITY
    }
}
