//! The two work queues of the refinement engine.
//!
//! Encroached subsegments wait in strict FIFO order; flawed triangles
//! wait in a priority queue keyed by the square of their shortest edge,
//! smallest first, with ties broken by insertion order. Both queues hold
//! snapshots of the entity's vertices so stale entries (the entity died
//! or changed under a later operation) can be discarded on dequeue.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, VecDeque};

use mesh_cdt::{Osub, Otri, VertexId};

/// An encroached subsegment awaiting a split.
#[derive(Debug, Clone)]
pub(crate) struct BadSubseg {
    pub handle: Osub,
    /// Endpoint snapshot for staleness detection.
    pub org: VertexId,
    pub dest: VertexId,
}

/// FIFO of encroached subsegments.
#[derive(Debug, Default)]
pub(crate) struct BadSubsegQueue {
    queue: VecDeque<BadSubseg>,
}

impl BadSubsegQueue {
    pub fn push(&mut self, bad: BadSubseg) {
        self.queue.push_back(bad);
    }

    pub fn pop(&mut self) -> Option<BadSubseg> {
        self.queue.pop_front()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn clear(&mut self) {
        self.queue.clear();
    }
}

/// A skinny or oversized triangle awaiting a split.
#[derive(Debug, Clone)]
pub(crate) struct BadTriangle {
    /// Handle aligned on the shortest edge.
    pub handle: Otri,
    /// Square of the shortest edge length; the queue key.
    pub key: f64,
    /// Vertex snapshot (org/dest span the shortest edge) for staleness
    /// detection.
    pub org: VertexId,
    pub dest: VertexId,
    pub apex: VertexId,
}

#[derive(Debug, Clone)]
struct Entry {
    key: f64,
    seq: u64,
    bad: BadTriangle,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key && self.seq == other.seq
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for min-heap behavior (smallest key = worst
        // triangle = highest priority), FIFO among equal keys.
        other
            .key
            .partial_cmp(&self.key)
            .unwrap_or(Ordering::Equal)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Priority queue of flawed triangles, shortest edge first.
#[derive(Debug, Default)]
pub(crate) struct BadTriangleQueue {
    heap: BinaryHeap<Entry>,
    seq: u64,
}

impl BadTriangleQueue {
    /// Enqueue a flawed triangle. Re-enqueuing a previously dequeued
    /// entry is allowed (it joins the back of its key class).
    pub fn push(&mut self, bad: BadTriangle) {
        let seq = self.seq;
        self.seq += 1;
        self.heap.push(Entry {
            key: bad.key,
            seq,
            bad,
        });
    }

    pub fn pop(&mut self) -> Option<BadTriangle> {
        self.heap.pop().map(|e| e.bad)
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn clear(&mut self) {
        self.heap.clear();
    }
}
