//! Recency Order Module
//!
//! Tracks which retained ids were recorded or read most recently.

use std::collections::VecDeque;

// == Recency Order ==
/// Access order of retained ids, front = most recent, back = next to evict.
#[derive(Debug, Default)]
pub struct RecencyOrder {
    ids: VecDeque<String>,
}

impl RecencyOrder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves `id` to the front, adding it if unseen.
    pub fn touch(&mut self, id: &str) {
        self.forget(id);
        self.ids.push_front(id.to_string());
    }

    /// Drops `id` from the order.
    pub fn forget(&mut self, id: &str) {
        self.ids.retain(|known| known != id);
    }

    /// Removes and returns the least recently used id.
    pub fn pop_oldest(&mut self) -> Option<String> {
        self.ids.pop_back()
    }

    /// Removes ids from the back until at most `max` remain, returning them
    /// oldest first.
    pub fn shrink_to(&mut self, max: usize) -> Vec<String> {
        let mut dropped = Vec::new();
        while self.ids.len() > max {
            if let Some(id) = self.ids.pop_back() {
                dropped.push(id);
            }
        }
        dropped
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
