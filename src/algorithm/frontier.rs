use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

#[derive(Debug, Clone, Copy)]
pub struct Key {
    pub k1: f64,
    pub k2: f64,
}

impl Key {
    pub fn new(k1: f64, k2: f64) -> Self {
        Key { k1, k2 }
    }
}

impl Ord for Key {
    fn cmp(&self, other: &Self) -> Ordering {
        self.k1
            .total_cmp(&other.k1)
            .then_with(|| self.k2.total_cmp(&other.k2))
    }
}

impl PartialOrd for Key {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Key {}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct Entry {
    key: Key,
    index: usize,
}

/// Min-priority queue over linearized cells with lazy deletion.
///
/// Reprioritizing pushes a fresh entry and leaves the old one in the heap; an
/// entry is current only while its key equals the latest key recorded for its
/// cell. Stale entries are drained when they surface at the top.
#[derive(Debug, Clone, Default)]
pub struct PriorityFrontier {
    heap: BinaryHeap<Reverse<Entry>>,
    current: Vec<Option<Key>>,
}

impl PriorityFrontier {
    pub fn new(capacity: usize) -> Self {
        PriorityFrontier {
            heap: BinaryHeap::new(),
            current: vec![None; capacity],
        }
    }

    pub fn insert(&mut self, index: usize, key: Key) {
        self.current[index] = Some(key);
        self.heap.push(Reverse(Entry { key, index }));
    }

    pub fn remove(&mut self, index: usize) {
        self.current[index] = None;
    }

    pub fn contains(&self, index: usize) -> bool {
        self.current[index].is_some()
    }

    pub fn key_of(&self, index: usize) -> Option<Key> {
        self.current[index]
    }

    pub fn peek_valid(&mut self) -> Option<(Key, usize)> {
        while let Some(Reverse(entry)) = self.heap.peek() {
            if self.current[entry.index] == Some(entry.key) {
                return Some((entry.key, entry.index));
            }
            self.heap.pop();
        }
        None
    }

    pub fn pop_valid(&mut self) -> Option<(Key, usize)> {
        while let Some(Reverse(entry)) = self.heap.pop() {
            if self.current[entry.index] == Some(entry.key) {
                self.current[entry.index] = None;
                return Some((entry.key, entry.index));
            }
        }
        None
    }

    pub fn clear(&mut self) {
        self.heap.clear();
        self.current.iter_mut().for_each(|key| *key = None);
    }

    // Stale entries included.
    pub fn entries(&self) -> usize {
        self.heap.len()
    }
}
