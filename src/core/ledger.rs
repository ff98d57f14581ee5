// File: src/core/ledger.rs
use crate::core::types::{ChainEvent, Entry};

/// Append-only record of everything that happened in one session.
///
/// Always starts with the seed `Accepted` event for the start entry.
#[derive(Debug, Clone)]
pub struct Ledger {
    events: Vec<ChainEvent>,
}

impl Ledger {
    pub fn seed(start: Entry) -> Self {
        Self {
            events: vec![ChainEvent::Accepted { entry: start, points: 0 }],
        }
    }

    /// O(1) amortized.
    pub fn append(&mut self, event: ChainEvent) {
        self.events.push(event);
    }

    pub fn last_accepted_entry(&self) -> Option<&Entry> {
        self.events.iter().rev().find_map(|event| match event {
            ChainEvent::Accepted { entry, .. } => Some(entry),
            _ => None,
        })
    }

    /// Chain length shown to the player, seed included.
    pub fn count_accepted(&self) -> usize {
        self.events
            .iter()
            .filter(|event| matches!(event, ChainEvent::Accepted { .. }))
            .count()
    }

    pub fn events(&self) -> &[ChainEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
