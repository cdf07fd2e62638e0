//! Bounded, chronologically ordered history of outgoing reliable packets.
//!
//! Records are kept in the order they were sent.  When the history is full
//! the oldest record is evicted, regardless of its packet id.  Replay walks
//! the same order, so packets are always resent oldest first even after the
//! 16-bit id has wrapped.

use std::collections::VecDeque;

use crate::protocol::sequence::is_at_or_after;

/// One stored outgoing packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingPacketRecord {
    pub packet_id: u16,
    pub bytes: Vec<u8>,
    pub sent_at_ms: u64,
}

/// Fixed-capacity send history.
///
/// # Examples
///
/// ```rust
/// use atem_core::reliability::history::OutgoingHistory;
///
/// let mut history = OutgoingHistory::with_capacity(2);
/// history.push(1, vec![0xA], 0);
/// history.push(2, vec![0xB], 10);
/// history.push(3, vec![0xC], 20); // evicts id 1
///
/// let ids: Vec<u16> = history.records_from(1).map(|r| r.packet_id).collect();
/// assert_eq!(ids, vec![2, 3]);
/// assert!(!history.contains(1));
/// ```
#[derive(Debug, Clone)]
pub struct OutgoingHistory {
    records: VecDeque<OutgoingPacketRecord>,
    capacity: usize,
}

impl OutgoingHistory {
    /// Creates an empty history.  A capacity of zero is raised to one.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            records: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends a record, evicting the oldest one if the history is full.
    pub fn push(&mut self, packet_id: u16, bytes: Vec<u8>, sent_at_ms: u64) {
        if self.records.len() == self.capacity {
            self.records.pop_front();
        }
        self.records.push_back(OutgoingPacketRecord {
            packet_id,
            bytes,
            sent_at_ms,
        });
    }

    /// Records whose id is `from` or later, oldest first.
    pub fn records_from(&self, from: u16) -> impl Iterator<Item = &OutgoingPacketRecord> + '_ {
        self.records
            .iter()
            .filter(move |record| is_at_or_after(record.packet_id, from))
    }

    /// Returns `true` if a record with exactly `packet_id` is retained.
    pub fn contains(&self, packet_id: u16) -> bool {
        self.records.iter().any(|r| r.packet_id == packet_id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}
