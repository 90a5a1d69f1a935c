//! # Visibility-ordered pending queue.
//!
//! [`DelayQueue`] holds messages until their `visible_after` instant. It is
//! a plain min-heap keyed on `(visible_after, arrival_seq)` — the arrival
//! sequence breaks ties so two messages due at the same instant come out in
//! submission order. The queue itself is not synchronized; the broker keeps
//! it behind its own lock.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use chrono::{DateTime, Utc};

use crate::broker::Message;

/// Heap entry. Ordering is inverted so the `BinaryHeap` (a max-heap) pops
/// the earliest-visible entry first.
#[derive(Debug)]
struct Scheduled {
    visible_after: DateTime<Utc>,
    seq: u64,
    message: Message,
}

impl PartialEq for Scheduled {
    fn eq(&self, other: &Self) -> bool {
        self.visible_after == other.visible_after && self.seq == other.seq
    }
}

impl Eq for Scheduled {}

impl PartialOrd for Scheduled {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Scheduled {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .visible_after
            .cmp(&self.visible_after)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Min-heap of messages keyed by visibility time.
#[derive(Debug, Default)]
pub struct DelayQueue {
    heap: BinaryHeap<Scheduled>,
    next_seq: u64,
}

impl DelayQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueues a message that becomes visible at `visible_after`.
    pub fn push(&mut self, message: Message, visible_after: DateTime<Utc>) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Scheduled {
            visible_after,
            seq,
            message,
        });
    }

    /// Pops the earliest message whose visibility time has passed, if any.
    ///
    /// A message is never handed out before its `visible_after`.
    pub fn pop_due(&mut self, now: DateTime<Utc>) -> Option<Message> {
        if self.heap.peek()?.visible_after > now {
            return None;
        }
        self.heap.pop().map(|s| s.message)
    }

    /// Visibility time of the earliest entry, due or not.
    pub fn next_visible_at(&self) -> Option<DateTime<Utc>> {
        self.heap.peek().map(|s| s.visible_after)
    }

    /// True if a message with this id is queued.
    pub fn contains(&self, id: &str) -> bool {
        self.heap.iter().any(|s| s.message.id == id)
    }

    /// Number of queued messages.
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// True if nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn pops_in_visibility_order() {
        let mut q = DelayQueue::new();
        q.push(Message::new("late", ""), t0() + Duration::minutes(30));
        q.push(Message::new("early", ""), t0() + Duration::minutes(10));

        let now = t0() + Duration::minutes(31);
        assert_eq!(q.pop_due(now).unwrap().id, "early");
        assert_eq!(q.pop_due(now).unwrap().id, "late");
        assert!(q.pop_due(now).is_none());
    }

    #[test]
    fn never_pops_before_visible_after() {
        let mut q = DelayQueue::new();
        q.push(Message::new("m-1", ""), t0() + Duration::minutes(30));

        assert!(q.pop_due(t0()).is_none());
        assert!(q.pop_due(t0() + Duration::minutes(29)).is_none());
        // The boundary instant itself is due.
        assert!(q.pop_due(t0() + Duration::minutes(30)).is_some());
    }

    #[test]
    fn ties_break_by_arrival_order() {
        let mut q = DelayQueue::new();
        q.push(Message::new("first", ""), t0());
        q.push(Message::new("second", ""), t0());

        assert_eq!(q.pop_due(t0()).unwrap().id, "first");
        assert_eq!(q.pop_due(t0()).unwrap().id, "second");
    }

    #[test]
    fn contains_and_len_track_entries() {
        let mut q = DelayQueue::new();
        assert!(q.is_empty());
        q.push(Message::new("m-1", ""), t0());
        assert!(q.contains("m-1"));
        assert!(!q.contains("m-2"));
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn next_visible_at_reports_earliest() {
        let mut q = DelayQueue::new();
        assert!(q.next_visible_at().is_none());
        q.push(Message::new("late", ""), t0() + Duration::minutes(30));
        q.push(Message::new("early", ""), t0() + Duration::minutes(5));
        assert_eq!(q.next_visible_at(), Some(t0() + Duration::minutes(5)));
    }
}
