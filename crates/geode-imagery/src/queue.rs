//! Fetch requests ordered by distance from the view's reference point.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use geode_tiles::TileKey;
use rustc_hash::FxHashMap;

#[derive(Clone, Debug)]
struct RequestEntry {
    key: TileKey,
    distance: f64,
    generation: u64,
}

impl PartialEq for RequestEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for RequestEntry {}

impl PartialOrd for RequestEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RequestEntry {
    // Reversed so the max-heap yields the nearest request, ties by key.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .distance
            .total_cmp(&self.distance)
            .then_with(|| other.key.cmp(&self.key))
    }
}

/// Min-distance queue of tile requests, at most one live entry per tile.
///
/// Pushing a tile already queued replaces its distance; the superseded heap
/// entry is recognized by its generation and skipped.
#[derive(Debug, Default)]
pub struct RequestQueue {
    heap: BinaryHeap<RequestEntry>,
    generations: FxHashMap<TileKey, u64>,
    next_generation: u64,
}

impl RequestQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, key: TileKey, distance: f64) {
        let generation = self.next_generation;
        self.next_generation += 1;
        self.generations.insert(key, generation);
        self.heap.push(RequestEntry {
            key,
            distance,
            generation,
        });
    }

    /// Remove the nearest request.
    pub fn pop(&mut self) -> Option<(TileKey, f64)> {
        while let Some(entry) = self.heap.pop() {
            if self.generations.get(&entry.key) == Some(&entry.generation) {
                self.generations.remove(&entry.key);
                return Some((entry.key, entry.distance));
            }
        }
        None
    }

    /// Remove every request, nearest first.
    pub fn drain(&mut self) -> Vec<(TileKey, f64)> {
        let mut requests = Vec::with_capacity(self.len());
        while let Some(request) = self.pop() {
            requests.push(request);
        }
        self.heap.clear();
        requests
    }

    pub fn contains(&self, key: &TileKey) -> bool {
        self.generations.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.generations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.generations.is_empty()
    }

    pub fn clear(&mut self) {
        self.heap.clear();
        self.generations.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(row: u32) -> TileKey {
        TileKey {
            level: 1,
            row,
            column: 0,
        }
    }

    /// Requests come out nearest first.
    #[test]
    fn test_pop_nearest_first() {
        let mut q = RequestQueue::new();
        q.push(key(0), 30.0);
        q.push(key(1), 10.0);
        q.push(key(2), 20.0);
        let order: Vec<u32> = q.drain().into_iter().map(|(k, _)| k.row).collect();
        assert_eq!(order, vec![1, 2, 0]);
        assert!(q.is_empty());
    }

    /// Re-pushing a tile replaces its earlier entry.
    #[test]
    fn test_push_replaces() {
        let mut q = RequestQueue::new();
        q.push(key(0), 5.0);
        q.push(key(1), 10.0);
        q.push(key(0), 50.0);
        assert_eq!(q.len(), 2);
        assert_eq!(q.pop(), Some((key(1), 10.0)));
        assert_eq!(q.pop(), Some((key(0), 50.0)));
        assert_eq!(q.pop(), None);
    }

    /// Drained distances are non-decreasing.
    #[test]
    fn test_drain_non_decreasing() {
        let mut q = RequestQueue::new();
        for (i, d) in [7.0, 3.0, 9.0, 3.0, 1.0, 8.0].into_iter().enumerate() {
            q.push(key(i as u32), d);
        }
        let distances: Vec<f64> = q.drain().into_iter().map(|(_, d)| d).collect();
        assert!(distances.windows(2).all(|w| w[0] <= w[1]), "{distances:?}");
        assert_eq!(distances.len(), 6);
    }

    /// Equal distances resolve deterministically by key.
    #[test]
    fn test_tie_break_by_key() {
        let mut q = RequestQueue::new();
        q.push(key(3), 1.0);
        q.push(key(2), 1.0);
        assert_eq!(q.pop().map(|(k, _)| k.row), Some(2));
        assert!(q.contains(&key(3)));
    }
}
