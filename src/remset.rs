//! # A lock-free remembered set
//!
//! [`RememberedSet`] is a [`WriteBarrier`] that logs every reported edge so a
//! collector can pick them up at its next safepoint.  Mutators push onto an
//! intrusive singly linked list with one compare-and-swap on the head; the
//! collector takes the whole list with [`RememberedSet::drain`].
//!
//! Only push and take-everything are offered.  A pop of a single node would
//! have to read `head.next` before its CAS, and that read can go stale in
//! race (the node popped, freed and a new one allocated at the same address)
//! without the CAS noticing.  Swapping the head for null reads nothing but
//! the CAS word itself, so it cannot suffer from that problem.
use std::ptr::null_mut;

use crossbeam_utils::atomic::AtomicCell;

use crate::{atomic_try_update, barrier::WriteBarrier, object::ManagedObject, value::Value, Atom};

/// One reference store reported to the barrier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    container: Value,
    index: usize,
    referent: Value,
}

impl Edge {
    pub fn new(container: &ManagedObject, index: usize, referent: Value) -> Self {
        Self {
            container: container.as_value(),
            index,
            referent,
        }
    }
    /// The object that was written to.
    pub fn container(&self) -> Value {
        self.container
    }
    pub fn index(&self) -> usize {
        self.index
    }
    pub fn referent(&self) -> Value {
        self.referent
    }
}

struct Node {
    edge: Edge,
    next: *mut Node,
}

struct LogHead {
    head: *mut Node,
}

pub struct RememberedSet {
    log: Atom<LogHead, usize>,
    /// Bumped before the push lands and lowered by the drain that removes it,
    /// so it may briefly run ahead of the list but never behind it.
    recorded: AtomicCell<usize>,
}

impl Default for RememberedSet {
    fn default() -> Self {
        Self {
            log: Default::default(),
            recorded: AtomicCell::new(0),
        }
    }
}

impl RememberedSet {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn record(&self, edge: Edge) {
        let node = Box::into_raw(Box::new(Node {
            edge,
            next: null_mut(),
        }));
        self.recorded.fetch_add(1);

        unsafe {
            atomic_try_update(&self.log, |log: &mut LogHead| {
                (*node).next = log.head;
                log.head = node;
                (true, ())
            });
        }
    }

    /// Removes every logged edge, oldest first.
    ///
    /// Edges recorded after the drain starts stay in the set for the next one.
    pub fn drain(&self) -> Drain {
        let newest = unsafe {
            atomic_try_update(&self.log, |log: &mut LogHead| {
                let taken = log.head;
                log.head = null_mut();
                (true, taken)
            })
        };

        // The list is newest first; flip it in place while counting.
        let mut reversed = null_mut();
        let mut cursor = newest;
        let mut taken = 0;
        while !cursor.is_null() {
            unsafe {
                let next = (*cursor).next;
                (*cursor).next = reversed;
                reversed = cursor;
                cursor = next;
            }
            taken += 1;
        }
        self.recorded.fetch_sub(taken);
        Drain { node: reversed }
    }

    pub fn len(&self) -> usize {
        self.recorded.load()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl WriteBarrier for RememberedSet {
    fn notify_field_write(&self, container: &ManagedObject, index: usize, referent: Value) {
        self.record(Edge::new(container, index, referent));
    }
}

impl Drop for RememberedSet {
    fn drop(&mut self) {
        self.drain();
    }
}

/// Edges taken from a [`RememberedSet`].  Dropping it frees whatever was not
/// iterated.
pub struct Drain {
    node: *mut Node,
}

impl Iterator for Drain {
    type Item = Edge;

    fn next(&mut self) -> Option<Edge> {
        if self.node.is_null() {
            return None;
        }
        let node = unsafe { Box::from_raw(self.node) };
        self.node = node.next;
        Some(node.edge)
    }
}

impl Drop for Drain {
    fn drop(&mut self) {
        for _ in self.by_ref() {}
    }
}

// The taken list is owned by the iterator alone.
unsafe impl Send for Drain {}
