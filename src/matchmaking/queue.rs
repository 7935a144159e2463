//! Matchmaking queue implementation

use std::collections::VecDeque;

use crate::game::{MatchSize, UserId};

/// Player waiting for a match of a given size
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueEntry {
    pub user_id: UserId,
    pub requested_size: MatchSize,
}

/// The shared waiting queue across all match sizes
///
/// One entry per player; re-joining updates the requested size in place
/// and keeps the player's position.
#[derive(Debug, Default)]
pub struct WaitingQueue {
    entries: VecDeque<QueueEntry>,
}

impl WaitingQueue {
    pub fn new() -> Self {
        Self {
            entries: VecDeque::new(),
        }
    }

    /// Add a player, or update their requested size if already queued
    pub fn enqueue(&mut self, user_id: UserId, requested_size: MatchSize) {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.user_id == user_id) {
            entry.requested_size = requested_size;
            return;
        }
        self.entries.push_back(QueueEntry {
            user_id,
            requested_size,
        });
    }

    /// Remove a player from the queue; no-op if absent
    pub fn remove(&mut self, user_id: UserId) -> Option<QueueEntry> {
        let pos = self.entries.iter().position(|e| e.user_id == user_id)?;
        self.entries.remove(pos)
    }

    pub fn contains(&self, user_id: UserId) -> bool {
        self.entries.iter().any(|e| e.user_id == user_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &QueueEntry> {
        self.entries.iter()
    }

    /// Take the first full group of players requesting exactly `size`
    ///
    /// Sizes are matched independently; surplus players requesting one
    /// size never feed a match of another. Returns the drafted ids in
    /// queue order, or `None` while too few players are waiting.
    pub fn take_group(&mut self, size: MatchSize) -> Option<Vec<UserId>> {
        let wanted = size.player_count();
        let drafted: Vec<UserId> = self
            .entries
            .iter()
            .filter(|e| e.requested_size == size)
            .take(wanted)
            .map(|e| e.user_id)
            .collect();

        if drafted.len() < wanted {
            return None;
        }

        self.entries.retain(|e| !drafted.contains(&e.user_id));
        Some(drafted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_preserves_queue_order() {
        let mut queue = WaitingQueue::new();
        queue.enqueue(1, MatchSize::Two);
        queue.enqueue(2, MatchSize::Two);
        queue.enqueue(3, MatchSize::Two);

        let drafted = queue.take_group(MatchSize::Two).unwrap();
        assert_eq!(drafted, vec![1, 2]);
        assert_eq!(queue.len(), 1);
        assert!(queue.contains(3));
    }

    #[test]
    fn rejoin_updates_size_in_place() {
        let mut queue = WaitingQueue::new();
        queue.enqueue(1, MatchSize::Two);
        queue.enqueue(2, MatchSize::Two);
        queue.enqueue(1, MatchSize::Four);

        assert_eq!(queue.len(), 2);
        let entries: Vec<_> = queue.iter().cloned().collect();
        assert_eq!(entries[0].user_id, 1);
        assert_eq!(entries[0].requested_size, MatchSize::Four);
        assert_eq!(entries[1].user_id, 2);
    }

    #[test]
    fn sizes_are_matched_independently() {
        let mut queue = WaitingQueue::new();
        queue.enqueue(1, MatchSize::Four);
        queue.enqueue(2, MatchSize::Four);
        queue.enqueue(3, MatchSize::Four);

        // Three players wanting a 4-player match never make a 2-player one
        assert!(queue.take_group(MatchSize::Two).is_none());
        assert!(queue.take_group(MatchSize::Four).is_none());
        assert_eq!(queue.len(), 3);

        queue.enqueue(4, MatchSize::Four);
        let drafted = queue.take_group(MatchSize::Four).unwrap();
        assert_eq!(drafted, vec![1, 2, 3, 4]);
        assert!(queue.is_empty());
    }

    #[test]
    fn mixed_sizes_draft_only_their_own() {
        let mut queue = WaitingQueue::new();
        queue.enqueue(1, MatchSize::Two);
        queue.enqueue(2, MatchSize::Four);
        queue.enqueue(3, MatchSize::Two);

        let drafted = queue.take_group(MatchSize::Two).unwrap();
        assert_eq!(drafted, vec![1, 3]);
        assert_eq!(queue.len(), 1);
        assert!(queue.contains(2));
    }

    #[test]
    fn remove_is_a_no_op_for_unknown_players() {
        let mut queue = WaitingQueue::new();
        queue.enqueue(1, MatchSize::Two);

        assert!(queue.remove(99).is_none());
        assert_eq!(queue.remove(1).map(|e| e.user_id), Some(1));
        assert!(queue.is_empty());
    }
}
