//! Priority queue used for all inter-stage handoff.
//!
//! Ordering key is `(urgency descending, insertion order ascending)`: higher
//! urgency is served first, ties break FIFO via a monotone sequence number.
//! The queue is unbounded, so `push` never blocks and never fails; `try_pop`
//! never blocks either. Internal state is serialized behind a mutex: callers
//! see atomic push/pop with no visible locking.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Mutex;

/// Heap entry. Greater entries pop first out of `BinaryHeap`.
#[derive(Debug)]
struct Entry<T> {
    urgency: u8,
    sequence: u64,
    value: T,
}

impl<T> PartialEq for Entry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.urgency == other.urgency && self.sequence == other.sequence
    }
}

impl<T> Eq for Entry<T> {}

impl<T> PartialOrd for Entry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Entry<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        // Higher urgency first; among equal urgencies, lower sequence first.
        self.urgency
            .cmp(&other.urgency)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

#[derive(Debug, Default)]
struct Inner<T> {
    heap: BinaryHeap<Entry<T>>,
    next_sequence: u64,
}

/// Named, unbounded, thread-safe priority queue.
///
/// The name attributes log lines and metrics to a stage; it plays no part in
/// ordering or routing.
#[derive(Debug)]
pub struct PriorityQueue<T> {
    name: String,
    inner: Mutex<Inner<T>>,
    total_enqueued: AtomicU64,
    total_dequeued: AtomicU64,
}

impl<T> PriorityQueue<T> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inner: Mutex::new(Inner {
                heap: BinaryHeap::new(),
                next_sequence: 0,
            }),
            total_enqueued: AtomicU64::new(0),
            total_dequeued: AtomicU64::new(0),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add `value` with the given urgency. Never blocks.
    pub fn push(&self, urgency: u8, value: T) {
        let mut inner = self.inner.lock().expect("queue mutex poisoned");
        let sequence = inner.next_sequence;
        inner.next_sequence += 1;
        inner.heap.push(Entry {
            urgency,
            sequence,
            value,
        });
        self.total_enqueued.fetch_add(1, AtomicOrdering::Relaxed);
    }

    /// Remove the highest-urgency (FIFO among equals) value, if any.
    pub fn try_pop(&self) -> Option<T> {
        let entry = {
            let mut inner = self.inner.lock().expect("queue mutex poisoned");
            inner.heap.pop()
        };
        entry.map(|e| {
            self.total_dequeued.fetch_add(1, AtomicOrdering::Relaxed);
            e.value
        })
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().expect("queue mutex poisoned").heap.is_empty()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("queue mutex poisoned").heap.len()
    }

    /// Items ever enqueued, for metrics attribution.
    pub fn total_enqueued(&self) -> u64 {
        self.total_enqueued.load(AtomicOrdering::Relaxed)
    }

    /// Items ever dequeued, for metrics attribution.
    pub fn total_dequeued(&self) -> u64 {
        self.total_dequeued.load(AtomicOrdering::Relaxed)
    }

    /// Drain every remaining value in pop order.
    pub fn drain(&self) -> Vec<T> {
        let mut out = Vec::new();
        while let Some(v) = self.try_pop() {
            out.push(v);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn fifo_within_equal_urgency() {
        let queue = PriorityQueue::new("test");
        for id in 0..10u32 {
            queue.push(1, id);
        }
        for expected in 0..10u32 {
            assert_eq!(queue.try_pop(), Some(expected));
        }
        assert!(queue.is_empty());
    }

    #[test]
    fn higher_urgency_pops_first() {
        // Scenario: urgency 0 pushed first, urgency 2 second; 2 pops first.
        let queue = PriorityQueue::new("test");
        queue.push(0, "low");
        queue.push(2, "high");
        assert_eq!(queue.try_pop(), Some("high"));
        assert_eq!(queue.try_pop(), Some("low"));
        assert_eq!(queue.try_pop(), None);
    }

    #[test]
    fn mixed_urgencies_interleave_correctly() {
        let queue = PriorityQueue::new("test");
        queue.push(1, "a");
        queue.push(2, "b");
        queue.push(1, "c");
        queue.push(0, "d");
        queue.push(2, "e");

        let order: Vec<_> = std::iter::from_fn(|| queue.try_pop()).collect();
        assert_eq!(order, vec!["b", "e", "a", "c", "d"]);
    }

    #[test]
    fn counters_track_flow() {
        let queue = PriorityQueue::new("test");
        queue.push(0, 1);
        queue.push(0, 2);
        assert_eq!(queue.total_enqueued(), 2);
        assert_eq!(queue.total_dequeued(), 0);
        queue.try_pop();
        assert_eq!(queue.total_dequeued(), 1);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn concurrent_push_pop_loses_nothing() {
        let queue = Arc::new(PriorityQueue::new("concurrent"));
        let producers: Vec<_> = (0..4)
            .map(|p| {
                let queue = Arc::clone(&queue);
                std::thread::spawn(move || {
                    for i in 0..500u64 {
                        queue.push((i % 3) as u8, p * 1000 + i);
                    }
                })
            })
            .collect();
        for handle in producers {
            handle.join().unwrap();
        }

        let mut seen = std::collections::HashSet::new();
        let consumers: Vec<_> = (0..2)
            .map(|_| {
                let queue = Arc::clone(&queue);
                std::thread::spawn(move || {
                    let mut popped = Vec::new();
                    while let Some(v) = queue.try_pop() {
                        popped.push(v);
                    }
                    popped
                })
            })
            .collect();
        for handle in consumers {
            for v in handle.join().unwrap() {
                assert!(seen.insert(v), "item {v} popped twice");
            }
        }
        assert_eq!(seen.len(), 2000);
        assert!(queue.is_empty());
    }
}
