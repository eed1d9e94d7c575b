//! Pending intake queue.

use std::collections::{HashSet, VecDeque};

use crate::intake::Candidate;

/// FIFO of candidates with identity deduplication.
///
/// The identity being drained stays "queued" until [`finish`] is called,
/// so a batch arriving mid-drain cannot queue it a second time.
///
/// [`finish`]: PendingQueue::finish
#[derive(Debug, Default)]
pub(crate) struct PendingQueue {
    items: VecDeque<Candidate>,
    identities: HashSet<String>,
    in_flight: Option<String>,
}

impl PendingQueue {
    pub fn contains(&self, identity: &str) -> bool {
        self.identities.contains(identity) || self.in_flight.as_deref() == Some(identity)
    }

    /// Append to the tail unless the identity is already queued or in
    /// flight. Returns whether the item was added.
    pub fn push(&mut self, item: Candidate) -> bool {
        if self.contains(&item.identity) {
            return false;
        }
        self.identities.insert(item.identity.clone());
        self.items.push_back(item);
        true
    }

    /// Take the head item and mark it in flight.
    pub fn pop_front(&mut self) -> Option<Candidate> {
        let item = self.items.pop_front()?;
        self.identities.remove(&item.identity);
        self.in_flight = Some(item.identity.clone());
        Some(item)
    }

    pub fn finish(&mut self) {
        self.in_flight = None;
    }

    /// Drop every pending item. The in-flight item is unaffected.
    pub fn clear(&mut self) -> usize {
        let discarded = self.items.len();
        self.items.clear();
        self.identities.clear();
        discarded
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_with_dedup() {
        let mut queue = PendingQueue::default();
        assert!(queue.push(Candidate::new("a", "la")));
        assert!(queue.push(Candidate::new("b", "lb")));
        assert!(!queue.push(Candidate::new("a", "other")));
        assert_eq!(queue.len(), 2);

        assert_eq!(queue.pop_front().unwrap().identity, "a");
        assert_eq!(queue.pop_front().unwrap().identity, "b");
        assert!(queue.pop_front().is_none());
    }

    #[test]
    fn test_in_flight_counts_as_queued() {
        let mut queue = PendingQueue::default();
        queue.push(Candidate::new("a", "la"));
        queue.pop_front();

        assert!(queue.contains("a"));
        assert!(!queue.push(Candidate::new("a", "la")));

        queue.finish();
        assert!(queue.push(Candidate::new("a", "la")));
    }

    #[test]
    fn test_clear_keeps_in_flight() {
        let mut queue = PendingQueue::default();
        queue.push(Candidate::new("a", "la"));
        queue.push(Candidate::new("b", "lb"));
        queue.push(Candidate::new("c", "lc"));
        queue.pop_front();

        assert_eq!(queue.clear(), 2);
        assert_eq!(queue.len(), 0);
        assert!(queue.contains("a"));
        assert!(queue.push(Candidate::new("b", "lb")));
    }
}
