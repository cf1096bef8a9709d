//! Append-only event log
//!
//! Consumers poll with the last sequence they saw. Sequence numbers start at
//! 1 and increase by one per event.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::event::{NetworkEvent, SequencedEvent};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventLog {
    events: Vec<SequencedEvent>,
    sequence: u64,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event, returning its sequence number
    pub fn append(&mut self, at: DateTime<Utc>, event: NetworkEvent) -> u64 {
        self.sequence += 1;
        debug!(sequence = self.sequence, event = event.name(), "Event appended to log");
        self.events.push(SequencedEvent {
            sequence: self.sequence,
            at,
            event,
        });
        self.sequence
    }

    /// Events with sequence >= `from`
    pub fn since(&self, from: u64) -> &[SequencedEvent] {
        let start = self.events.partition_point(|e| e.sequence < from);
        &self.events[start..]
    }

    /// Last assigned sequence number (0 when empty)
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SequencedEvent> {
        self.events.iter()
    }
}
