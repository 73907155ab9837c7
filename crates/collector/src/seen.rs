//! Bounded duplicate-delivery guard.

use std::collections::{HashSet, VecDeque};

/// Identity of an already-processed envelope. Messages and reactions live
/// in separate key spaces so a reaction can never shadow the message it
/// targets.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SeenKey {
    Message {
        origin_timestamp: i64,
        sender_id: String,
        group_id: String,
    },
    Reaction {
        /// Timestamp of the reaction envelope itself, not of its target;
        /// add, remove, and re-add are distinct envelopes.
        origin_timestamp: i64,
        reactor_id: String,
        group_id: String,
    },
}

/// Insertion-ordered set with a hard capacity. When full, the oldest half
/// is evicted in one sweep; re-delivery of an evicted key falls through to
/// the database's unique index, which stays correct either way.
#[derive(Debug)]
pub struct BoundedSeenSet {
    capacity: usize,
    set: HashSet<SeenKey>,
    order: VecDeque<SeenKey>,
}

impl BoundedSeenSet {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(2),
            set: HashSet::new(),
            order: VecDeque::new(),
        }
    }

    /// Record a key. Returns false if it was already present.
    pub fn insert(&mut self, key: SeenKey) -> bool {
        if self.set.contains(&key) {
            return false;
        }
        if self.order.len() >= self.capacity {
            for _ in 0..self.capacity / 2 {
                if let Some(old) = self.order.pop_front() {
                    self.set.remove(&old);
                }
            }
        }
        self.order.push_back(key.clone());
        self.set.insert(key);
        true
    }

    pub fn contains(&self, key: &SeenKey) -> bool {
        self.set.contains(key)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message_key(ts: i64) -> SeenKey {
        SeenKey::Message {
            origin_timestamp: ts,
            sender_id: "alice".to_string(),
            group_id: "g1".to_string(),
        }
    }

    #[test]
    fn duplicate_insert_reports_seen() {
        let mut set = BoundedSeenSet::new(10);
        assert!(set.insert(message_key(1)));
        assert!(!set.insert(message_key(1)));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn message_and_reaction_keys_are_distinct() {
        let mut set = BoundedSeenSet::new(10);
        assert!(set.insert(message_key(1)));
        assert!(set.insert(SeenKey::Reaction {
            origin_timestamp: 1,
            reactor_id: "alice".to_string(),
            group_id: "g1".to_string(),
        }));
    }

    #[test]
    fn eviction_drops_oldest_half() {
        let mut set = BoundedSeenSet::new(4);
        for ts in 0..4 {
            set.insert(message_key(ts));
        }
        assert_eq!(set.len(), 4);

        set.insert(message_key(4));
        assert_eq!(set.len(), 3);
        assert!(!set.contains(&message_key(0)));
        assert!(!set.contains(&message_key(1)));
        assert!(set.contains(&message_key(2)));
        assert!(set.contains(&message_key(4)));

        // An evicted key can be inserted again.
        assert!(set.insert(message_key(0)));
    }
}
