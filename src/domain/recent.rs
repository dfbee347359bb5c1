use std::collections::{HashSet, VecDeque};

use super::StatusId;

/// Bounded, insertion-ordered set of recently delivered status IDs.
///
/// Once `capacity` is reached the oldest ID is evicted on every insert, so
/// the window never grows past its capacity.
#[derive(Debug, Clone)]
pub struct RecentIds {
    capacity: usize,
    order: VecDeque<StatusId>,
    seen: HashSet<StatusId>,
}

impl RecentIds {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            order: VecDeque::with_capacity(capacity),
            seen: HashSet::with_capacity(capacity),
        }
    }

    pub fn contains(&self, id: &StatusId) -> bool {
        self.seen.contains(id)
    }

    /// Returns `false` if the ID was already present.
    pub fn insert(&mut self, id: StatusId) -> bool {
        if self.seen.contains(&id) {
            return false;
        }

        while self.order.len() >= self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.seen.remove(&oldest);
            }
        }

        self.seen.insert(id.clone());
        self.order.push_back(id);
        true
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
