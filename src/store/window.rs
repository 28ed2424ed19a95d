//! Fixed-capacity sliding window with push-and-evict semantics.

use std::collections::VecDeque;

use serde::{Serialize, Serializer};

/// Ordered buffer that holds at most `capacity` items.
///
/// Once full, every [`SlidingWindow::push`] evicts the oldest item before
/// appending, so the length stays constant and insertion order is kept.
#[derive(Debug, Clone, PartialEq)]
pub struct SlidingWindow<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T> SlidingWindow<T> {
    /// Create an empty window.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Create a window pre-filled with `seed`, sized to hold exactly the seed.
    pub fn from_seed(seed: impl IntoIterator<Item = T>) -> Self {
        let items: VecDeque<T> = seed.into_iter().collect();
        let capacity = items.len();
        Self { items, capacity }
    }

    /// Append `item`, returning the evicted oldest item if the window was full.
    pub fn push(&mut self, item: T) -> Option<T> {
        if self.capacity == 0 {
            return Some(item);
        }
        let evicted = if self.items.len() >= self.capacity {
            self.items.pop_front()
        } else {
            None
        };
        self.items.push_back(item);
        evicted
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Oldest-first iterator.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    /// Most recently pushed item.
    pub fn latest(&self) -> Option<&T> {
        self.items.back()
    }

    pub fn to_vec(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.items.iter().cloned().collect()
    }
}

impl<T: Serialize> Serialize for SlidingWindow<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.items.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fills_then_evicts_oldest() {
        let mut window = SlidingWindow::with_capacity(3);
        assert_eq!(window.push(1), None);
        assert_eq!(window.push(2), None);
        assert_eq!(window.push(3), None);
        assert_eq!(window.push(4), Some(1));
        assert_eq!(window.push(5), Some(2));
        assert_eq!(window.to_vec(), vec![3, 4, 5]);
        assert_eq!(window.len(), 3);
    }

    #[test]
    fn test_seeded_window_keeps_seed_length() {
        let mut window = SlidingWindow::from_seed(vec!["a", "b", "c", "d", "e"]);
        assert_eq!(window.capacity(), 5);

        for label in ["f", "g", "h", "i", "j", "k", "l"] {
            window.push(label);
            assert_eq!(window.len(), 5);
        }
        assert_eq!(window.to_vec(), vec!["h", "i", "j", "k", "l"]);
        assert_eq!(window.latest(), Some(&"l"));
    }

    #[test]
    fn test_zero_capacity_rejects_everything() {
        let mut window = SlidingWindow::with_capacity(0);
        assert_eq!(window.push(7), Some(7));
        assert!(window.is_empty());
    }

    #[test]
    fn test_serializes_as_sequence() {
        let window = SlidingWindow::from_seed(vec![1, 2, 3]);
        let json = serde_json::to_string(&window).unwrap();
        assert_eq!(json, "[1,2,3]");
    }
}
