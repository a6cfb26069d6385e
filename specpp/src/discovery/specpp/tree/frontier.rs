use std::cmp::Ordering;
use std::collections::HashMap;
use std::hash::Hash;

use crate::discovery::specpp::heuristics::{ScoreOrdering, TreeNodeScore};

#[derive(Debug, Clone)]
struct FrontierEntry<K> {
    key: K,
    score: TreeNodeScore,
    sequence: u64,
}

/// Addressable priority queue of tree leaves
///
/// A binary heap stored in a vector, together with the heap slot of every key, so that entries can
/// be removed or re-scored in `O(log n)`. Entries with equal scores are ranked by insertion order;
/// re-scoring keeps the insertion position.
#[derive(Debug, Clone)]
pub struct ExpansionFrontier<K> {
    ordering: ScoreOrdering,
    heap: Vec<FrontierEntry<K>>,
    slots: HashMap<K, usize>,
    next_sequence: u64,
}

impl<K: Clone + Eq + Hash> ExpansionFrontier<K> {
    /// Empty frontier ranking scores by `ordering`
    pub fn new(ordering: ScoreOrdering) -> Self {
        Self {
            ordering,
            heap: Vec::new(),
            slots: HashMap::new(),
            next_sequence: 0,
        }
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Returns `true` if there are no entries
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Returns `true` if `key` is in the frontier
    pub fn contains(&self, key: &K) -> bool {
        self.slots.contains_key(key)
    }

    /// Current score of `key`
    pub fn score_of(&self, key: &K) -> Option<TreeNodeScore> {
        self.slots.get(key).map(|slot| self.heap[*slot].score)
    }

    /// Add `key` with `score`
    ///
    /// If `key` is already present, its score is updated instead.
    pub fn insert(&mut self, key: K, score: TreeNodeScore) {
        if self.contains(&key) {
            self.update(&key, score);
            return;
        }
        let slot = self.heap.len();
        self.slots.insert(key.clone(), slot);
        self.heap.push(FrontierEntry {
            key,
            score,
            sequence: self.next_sequence,
        });
        self.next_sequence += 1;
        self.sift_up(slot);
    }

    /// Change the score of `key`. Returns `false` if `key` is not in the frontier.
    pub fn update(&mut self, key: &K, score: TreeNodeScore) -> bool {
        let Some(slot) = self.slots.get(key).copied() else {
            return false;
        };
        self.heap[slot].score = score;
        let slot = self.sift_up(slot);
        self.sift_down(slot);
        true
    }

    /// Remove `key`, returning its score
    pub fn remove(&mut self, key: &K) -> Option<TreeNodeScore> {
        let slot = *self.slots.get(key)?;
        let last = self.heap.len() - 1;
        self.swap(slot, last);
        let entry = self.heap.pop()?;
        self.slots.remove(&entry.key);
        if slot < self.heap.len() {
            let slot = self.sift_up(slot);
            self.sift_down(slot);
        }
        Some(entry.score)
    }

    /// Best ranked entry
    pub fn peek(&self) -> Option<(&K, TreeNodeScore)> {
        self.heap.first().map(|e| (&e.key, e.score))
    }

    /// Remove and return the best ranked entry
    pub fn pop(&mut self) -> Option<(K, TreeNodeScore)> {
        let key = self.heap.first()?.key.clone();
        let score = self.remove(&key)?;
        Some((key, score))
    }

    fn ranks_before(&self, a: usize, b: usize) -> bool {
        let (a, b) = (&self.heap[a], &self.heap[b]);
        match self.ordering.compare(a.score, b.score) {
            Ordering::Greater => true,
            Ordering::Less => false,
            Ordering::Equal => a.sequence < b.sequence,
        }
    }

    fn swap(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        self.heap.swap(a, b);
        self.slots.insert(self.heap[a].key.clone(), a);
        self.slots.insert(self.heap[b].key.clone(), b);
    }

    fn sift_up(&mut self, mut slot: usize) -> usize {
        while slot > 0 {
            let parent = (slot - 1) / 2;
            if !self.ranks_before(slot, parent) {
                break;
            }
            self.swap(slot, parent);
            slot = parent;
        }
        slot
    }

    fn sift_down(&mut self, mut slot: usize) {
        loop {
            let mut best = slot;
            for child in [2 * slot + 1, 2 * slot + 2] {
                if child < self.heap.len() && self.ranks_before(child, best) {
                    best = child;
                }
            }
            if best == slot {
                return;
            }
            self.swap(slot, best);
            slot = best;
        }
    }
}
