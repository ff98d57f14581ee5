// src/core/types.rs
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable catalog identifier, as written in the source feed (e.g. "0025").
pub type EntryId = String;

/// A catalog item. Categories are kept in display priority order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub id: EntryId,
    pub name: String,
    pub categories: Vec<String>,
}

impl Entry {
    pub fn new(id: impl Into<String>, name: impl Into<String>, categories: &[&str]) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            categories: categories.iter().map(|c| c.to_string()).collect(),
        }
    }

    /// First category of `self` (in display order) that `other` also has.
    pub fn shared_category(&self, other: &Entry) -> Option<&str> {
        self.categories
            .iter()
            .find(|c| other.categories.contains(c))
            .map(String::as_str)
    }

    /// Numeric catalog order; ids that are not numbers sort last.
    pub fn catalog_order(&self) -> u32 {
        self.id.trim().parse().unwrap_or(u32::MAX)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Mode {
    #[default]
    Untimed,
    Timed,
}

impl Mode {
    /// Name used in analytics payloads and storage keys.
    pub fn key(self) -> &'static str {
        match self {
            Mode::Untimed => "single",
            Mode::Timed => "timeattack",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Playing,
    Cleared,
    Finished,
}

/// One step in the chain of play.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainEvent {
    Accepted { entry: Entry, points: i32 },
    Rerolled { from: char, to: char, points: i32 },
    Rejected { entry: Entry, points: i32 },
    Hinted { entry: Entry, points: i32 },
}

impl ChainEvent {
    pub fn points(&self) -> i32 {
        match self {
            ChainEvent::Accepted { points, .. }
            | ChainEvent::Rerolled { points, .. }
            | ChainEvent::Rejected { points, .. }
            | ChainEvent::Hinted { points, .. } => *points,
        }
    }
}
