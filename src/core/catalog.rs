// File: src/core/catalog.rs
use crate::core::kana;
use crate::core::types::Entry;
use log::{debug, warn};
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

const MIN_COLUMNS: usize = 3;
const HIDDEN_COLUMN: usize = 4;

/// Read-only lookup over every playable entry, keyed by canonical name.
///
/// Entries are kept in feed order so that seeded random picks are reproducible.
#[derive(Debug, Clone, Default)]
pub struct CatalogIndex {
    entries: Vec<Entry>,
    by_name: HashMap<String, usize>,
}

impl CatalogIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an index from already parsed entries. A repeated name replaces
    /// the earlier entry.
    pub fn from_entries(entries: impl IntoIterator<Item = Entry>) -> Self {
        let mut index = Self::new();
        for entry in entries {
            index.insert(entry);
        }
        index
    }

    fn insert(&mut self, entry: Entry) {
        match self.by_name.get(&entry.name) {
            Some(&pos) => self.entries[pos] = entry,
            None => {
                self.by_name.insert(entry.name.clone(), self.entries.len());
                self.entries.push(entry);
            }
        }
    }

    /// Parses the comma separated feed: `id,name,category1[,category2[,hidden]]`.
    ///
    /// The first line is a header. Blank lines, rows with fewer than three
    /// columns and rows carrying a hidden marker are skipped.
    pub fn parse(text: &str) -> Self {
        let mut index = Self::new();
        let mut skipped = 0usize;

        for line in text.lines().skip(1) {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let columns: Vec<&str> = line.split(',').map(str::trim).collect();
            if columns.len() < MIN_COLUMNS || columns[1].is_empty() {
                skipped += 1;
                continue;
            }
            if columns.get(HIDDEN_COLUMN).is_some_and(|flag| is_truthy(flag)) {
                continue;
            }

            let mut categories = vec![columns[2].to_string()];
            if let Some(second) = columns.get(3).filter(|c| !c.is_empty()) {
                categories.push(second.to_string());
            }

            index.insert(Entry {
                id: columns[0].to_string(),
                name: columns[1].to_string(),
                categories,
            });
        }

        if skipped > 0 {
            debug!("catalog: skipped {} malformed rows", skipped);
        }
        index
    }

    /// Reads and parses a feed from disk. Any I/O failure yields an empty
    /// index so the caller can report "unavailable" instead of crashing.
    pub fn load(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(text) => {
                let index = Self::parse(&text);
                debug!("catalog: loaded {} entries from {}", index.len(), path.display());
                index
            }
            Err(e) => {
                warn!("catalog: failed to read {}: {}", path.display(), e);
                Self::new()
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Entry> {
        self.by_name.get(name).map(|&pos| &self.entries[pos])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn by_id(&self, id: &str) -> Option<&Entry> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    pub fn id_of(&self, name: &str) -> Option<&str> {
        self.get(name).map(|entry| entry.id.as_str())
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Uniform pick among entries accepted by `predicate`.
    pub fn random_entry<R, F>(&self, rng: &mut R, predicate: F) -> Option<&Entry>
    where
        R: Rng + ?Sized,
        F: Fn(&Entry) -> bool,
    {
        let filtered: Vec<&Entry> = self.entries.iter().filter(|e| predicate(e)).collect();
        filtered.choose(rng).copied()
    }

    /// Unused entries whose first sound is interchangeable with `required`.
    pub fn candidates_for<'a>(
        &'a self,
        required: char,
        used: &'a HashSet<String>,
    ) -> impl Iterator<Item = &'a Entry> + 'a {
        self.entries.iter().filter(move |entry| {
            !used.contains(&entry.name)
                && kana::first_sound(&entry.name).is_some_and(|first| kana::matches(required, first))
        })
    }

    /// Uniform pick among [`candidates_for`](Self::candidates_for). `None`
    /// means the chain cannot be continued from `required`.
    pub fn entry_by_initial_class<'a, R: Rng + ?Sized>(
        &'a self,
        rng: &mut R,
        required: char,
        used: &'a HashSet<String>,
    ) -> Option<&'a Entry> {
        let candidates: Vec<&Entry> = self.candidates_for(required, used).collect();
        candidates.choose(rng).copied()
    }

    /// All entries in ascending catalog number. Stable for equal numbers.
    pub fn sorted_listing(&self) -> Vec<&Entry> {
        let mut listing: Vec<&Entry> = self.entries.iter().collect();
        listing.sort_by_key(|entry| entry.catalog_order());
        listing
    }
}

fn is_truthy(flag: &str) -> bool {
    !(flag.is_empty()
        || flag == "0"
        || flag.eq_ignore_ascii_case("false")
        || flag.eq_ignore_ascii_case("no"))
}
