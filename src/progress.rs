// File: src/progress.rs
//! Cross-session bookkeeping: which entries were ever played, completion
//! milestones and the player's personal statistics.
use crate::core::catalog::CatalogIndex;
use crate::core::kana;
use crate::core::types::{Entry, Mode};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Completion thresholds in percent, ascending.
pub const MILESTONES: [u32; 21] = [
    1, 5, 10, 15, 20, 25, 30, 35, 40, 45, 50, 55, 60, 65, 70, 75, 80, 85, 90, 95, 100,
];

/// Play count per canonical name, accumulated across sessions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryHistory {
    counts: HashMap<String, u32>,
}

impl DiscoveryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bumps the count for `name` and returns the new count.
    pub fn record(&mut self, name: &str) -> u32 {
        let count = self.counts.entry(name.to_string()).or_insert(0);
        *count += 1;
        *count
    }

    pub fn count(&self, name: &str) -> u32 {
        self.counts.get(name).copied().unwrap_or(0)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.counts.contains_key(name)
    }

    /// Number of distinct names discovered.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.counts.iter().map(|(name, &count)| (name.as_str(), count))
    }
}

impl FromIterator<(String, u32)> for DiscoveryHistory {
    fn from_iter<I: IntoIterator<Item = (String, u32)>>(iter: I) -> Self {
        Self { counts: iter.into_iter().filter(|(_, count)| *count > 0).collect() }
    }
}

/// Share of the catalog discovered, in percent. Restricted names always count.
pub fn completion_percent(history_size: usize, restricted_count: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (history_size + restricted_count) as f64 / total as f64 * 100.0
}

/// The smallest milestone above `watermark` that `percent` has reached.
///
/// Only one milestone is returned per call; callers advance the watermark and
/// ask again, so a jump over several thresholds surfaces them one by one.
pub fn next_milestone(percent: f64, watermark: u32) -> Option<u32> {
    MILESTONES
        .iter()
        .copied()
        .find(|&m| m > watermark && percent >= f64::from(m))
}

pub fn progress_message(percent: f64) -> &'static str {
    const BANDS: [&str; 20] = [
        "The legend begins!",
        "The first step is taken",
        "The adventure is truly underway",
        "Bonds with your companions deepen",
        "Walking the road of a true trainer",
        "Knowledge and experience pile up",
        "The door to legend opens",
        "Stepping into the world of myth",
        "Ancient power awakens",
        "Legends reveal themselves",
        "An adventure beyond time and space",
        "A door to another dimension opens",
        "Approaching the realm of the gods",
        "Passing through the gates of heaven",
        "Touching the truth of the cosmos",
        "Reading the memories of the stars",
        "Facing the ultimate being",
        "Unravelling the secret of creation",
        "The creator's seat is within reach",
        "Arriving at the divine realm",
    ];

    if percent >= 100.0 {
        return "🎉 Complete! Every entry discovered 🎉";
    }
    if percent < 1.0 {
        return "Congratulations!";
    }
    let band = (percent / 5.0) as usize;
    BANDS[band.min(BANDS.len() - 1)]
}

/// One row of the discovery listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DexRow<'a> {
    pub entry: &'a Entry,
    pub discovered: bool,
    pub plays: u32,
}

impl DexRow<'_> {
    /// The name if discovered, otherwise one `○` per character.
    pub fn display_name(&self) -> String {
        if self.discovered {
            self.entry.name.clone()
        } else {
            kana::mask_name(&self.entry.name)
        }
    }
}

/// Every catalog entry in catalog order. Restricted names always count as
/// discovered.
pub fn dex<'a>(
    catalog: &'a CatalogIndex,
    history: &DiscoveryHistory,
    restricted: &[String],
) -> Vec<DexRow<'a>> {
    catalog
        .sorted_listing()
        .into_iter()
        .map(|entry| {
            let plays = history.count(&entry.name);
            DexRow {
                entry,
                discovered: plays > 0 || restricted.iter().any(|r| *r == entry.name),
                plays,
            }
        })
        .collect()
}

/// Lifetime statistics for one player.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersonalStats {
    pub total_games_played: u32,
    pub total_game_clears: u32,
    pub total_game_overs: u32,
    pub total_answers: u32,
    /// Percentage of finished games that were cleared.
    pub clear_rate: f64,
    pub average_answers_per_game: f64,
    pub untimed_games: u32,
    pub timed_games: u32,
    pub best_untimed_score: u32,
    pub best_timed_score: u32,
    pub longest_untimed_chain: u32,
    pub longest_timed_chain: u32,
    pub max_untimed_combo: u32,
    pub max_timed_combo: u32,
    pub first_play: Option<DateTime<Utc>>,
    pub last_play: Option<DateTime<Utc>>,
}

/// Summary of a session that has just ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameSummary {
    pub mode: Mode,
    pub cleared: bool,
    pub score: u32,
    pub chain_length: u32,
    pub answers: u32,
    pub max_combo: u32,
}

impl PersonalStats {
    pub fn record_start(&mut self, mode: Mode, now: DateTime<Utc>) {
        self.total_games_played += 1;
        match mode {
            Mode::Untimed => self.untimed_games += 1,
            Mode::Timed => self.timed_games += 1,
        }
        if self.first_play.is_none() {
            self.first_play = Some(now);
        }
        self.last_play = Some(now);
    }

    pub fn record_end(&mut self, game: &GameSummary, now: DateTime<Utc>) {
        self.total_answers += game.answers;
        if game.cleared {
            self.total_game_clears += 1;
        } else {
            self.total_game_overs += 1;
        }

        let (best, longest, combo) = match game.mode {
            Mode::Untimed => (
                &mut self.best_untimed_score,
                &mut self.longest_untimed_chain,
                &mut self.max_untimed_combo,
            ),
            Mode::Timed => (
                &mut self.best_timed_score,
                &mut self.longest_timed_chain,
                &mut self.max_timed_combo,
            ),
        };
        *best = (*best).max(game.score);
        *longest = (*longest).max(game.chain_length);
        *combo = (*combo).max(game.max_combo);

        let finished = self.total_game_clears + self.total_game_overs;
        if finished > 0 {
            self.clear_rate = f64::from(self.total_game_clears) / f64::from(finished) * 100.0;
            self.average_answers_per_game = f64::from(self.total_answers) / f64::from(finished);
        }
        self.last_play = Some(now);
    }
}
