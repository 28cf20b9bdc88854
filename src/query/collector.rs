//! Top-k collection in ranking order.

use crate::index::types::DocAddress;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// A matching document with its score
#[derive(Debug, Clone)]
pub struct ScoredDoc {
    pub score: f32,
    /// Stored id, the tie-breaker between equal scores
    pub id: String,
    pub address: DocAddress,
}

impl ScoredDoc {
    /// Ranking order: higher score first, then id ascending (numerically
    /// when both ids are numbers), then index address. `Less` ranks earlier.
    pub fn rank_cmp(&self, other: &Self) -> Ordering {
        other
            .score
            .total_cmp(&self.score)
            .then_with(|| compare_ids(&self.id, &other.id))
            .then_with(|| self.address.cmp(&other.address))
    }
}

fn compare_ids(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(a), Ok(b)) => a.cmp(&b),
        _ => a.cmp(b),
    }
}

impl PartialEq for ScoredDoc {
    fn eq(&self, other: &Self) -> bool {
        self.rank_cmp(other) == Ordering::Equal
    }
}

impl Eq for ScoredDoc {}

impl PartialOrd for ScoredDoc {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScoredDoc {
    /// Worse-ranked documents compare greater, so the heap top is the
    /// current worst of the top k
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank_cmp(other)
    }
}

/// Keeps the best `k` documents, optionally only those ranked strictly
/// after a boundary document (search-after).
pub struct TopDocsCollector {
    heap: BinaryHeap<ScoredDoc>,
    capacity: usize,
    after: Option<ScoredDoc>,
}

impl TopDocsCollector {
    pub fn new(k: usize) -> Self {
        Self {
            heap: BinaryHeap::with_capacity(k.min(1024) + 1),
            capacity: k,
            after: None,
        }
    }

    /// Collect only documents ranked strictly after `boundary`
    pub fn after(k: usize, boundary: ScoredDoc) -> Self {
        let mut collector = Self::new(k);
        collector.after = Some(boundary);
        collector
    }

    /// Cheap pre-check on the score alone. False means a document with this
    /// score cannot be collected whatever its id.
    pub fn might_accept(&self, score: f32) -> bool {
        if self.capacity == 0 {
            return false;
        }
        if self.after.as_ref().is_some_and(|b| score > b.score) {
            return false;
        }
        self.heap.len() < self.capacity || self.heap.peek().is_some_and(|worst| score >= worst.score)
    }

    /// Offer a document. Returns true if it is currently in the top k.
    pub fn collect(&mut self, doc: ScoredDoc) -> bool {
        if self.capacity == 0 {
            return false;
        }
        if let Some(boundary) = &self.after {
            if doc.rank_cmp(boundary) != Ordering::Greater {
                return false;
            }
        }

        if self.heap.len() < self.capacity {
            self.heap.push(doc);
            true
        } else if self.heap.peek().is_some_and(|worst| doc < *worst) {
            self.heap.pop();
            self.heap.push(doc);
            true
        } else {
            false
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Best first
    pub fn into_sorted_vec(self) -> Vec<ScoredDoc> {
        self.heap.into_sorted_vec()
    }
}
