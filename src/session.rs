// File: src/session.rs
//! One player's game: picks start and goal, drives the rules engine and
//! forwards results to the store and the analytics sink.
use crate::analytics::{Analytics, AnalyticsEvent};
use crate::config::GameConfig;
use crate::core::catalog::CatalogIndex;
use crate::core::engine::{Ending, Outcome, Report, RulesEngine, SessionState};
use crate::core::kana::{self, NASAL};
use crate::core::types::{Entry, Mode, Phase};
use crate::error::Result;
use crate::persistence::Store;
use crate::progress::{self, DexRow, DiscoveryHistory, GameSummary, PersonalStats};
use chrono::Utc;
use log::{info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;

/// Start and goal requested by id, e.g. from a shared link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeepLink {
    pub start_id: String,
    pub goal_id: String,
}

/// What the player should be told after an action.
#[derive(Debug, Clone, PartialEq)]
pub struct Turn {
    pub report: Report,
    /// Completion milestone reached by this action, if any.
    pub milestone: Option<u32>,
    pub new_high_score: bool,
}

impl Turn {
    fn from_report(report: Report) -> Self {
        Self { report, milestone: None, new_high_score: false }
    }
}

pub struct Session {
    catalog: Arc<CatalogIndex>,
    config: GameConfig,
    store: Box<dyn Store>,
    analytics: Option<Box<dyn Analytics>>,
    rng: StdRng,
    mode: Mode,
    pending_mode: Option<Mode>,
    engine: Option<RulesEngine>,
    high_score: u32,
    history: DiscoveryHistory,
    watermark: u32,
    stats: PersonalStats,
}

impl Session {
    pub fn new(catalog: CatalogIndex, config: GameConfig, store: Box<dyn Store>, rng: StdRng) -> Self {
        let mode = Mode::default();
        Self {
            high_score: store.high_score(mode),
            history: store.history(),
            watermark: store.milestone_watermark(),
            stats: store.personal_stats(),
            catalog: Arc::new(catalog),
            config,
            store,
            analytics: None,
            rng,
            mode,
            pending_mode: None,
            engine: None,
        }
    }

    pub fn with_analytics(mut self, analytics: Box<dyn Analytics>) -> Self {
        self.analytics = Some(analytics);
        self
    }

    /// Mode for the first game. Later switches go through [`request_mode`](Self::request_mode).
    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self.high_score = self.store.high_score(mode);
        self
    }

    /// Starts a fresh game in the current mode. The link is honoured only if
    /// both ids resolve. Returns `None` when the catalog is empty.
    pub fn start(&mut self, link: Option<&DeepLink>) -> Option<Turn> {
        let (start, goal) = self.pick_pair(link)?;
        let seed = self.rng.gen();
        info!("session: {} game {} -> {}", self.mode, start.name, goal.name);

        self.engine = Some(RulesEngine::new(
            Arc::clone(&self.catalog),
            self.config.clone(),
            self.mode,
            start,
            goal,
            StdRng::seed_from_u64(seed),
        ));

        self.stats.record_start(self.mode, Utc::now());
        let result = self.store.set_personal_stats(&self.stats);
        persist("personal stats", result);

        let ending = self.engine.as_mut().and_then(RulesEngine::ensure_continuation);
        let mut turn = Turn::from_report(Report { outcome: Outcome::Ignored, ending });
        if let Some(ending) = ending {
            turn.new_high_score = self.conclude(ending);
        }
        Some(turn)
    }

    /// New start and goal, zeroed score. Same mode.
    pub fn reset(&mut self) -> Option<Turn> {
        self.start(None)
    }

    fn pick_pair(&mut self, link: Option<&DeepLink>) -> Option<(Entry, Entry)> {
        if let Some(link) = link {
            match (self.catalog.by_id(&link.start_id), self.catalog.by_id(&link.goal_id)) {
                (Some(start), Some(goal)) => return Some((start.clone(), goal.clone())),
                _ => warn!(
                    "session: link {} -> {} does not resolve, picking at random",
                    link.start_id, link.goal_id
                ),
            }
        }

        let start = self
            .catalog
            .random_entry(&mut self.rng, |e| kana::terminal_sound(&e.name) != Some(NASAL))?
            .clone();
        let goal = self.catalog.random_entry(&mut self.rng, |_| true)?.clone();
        Some((start, goal))
    }

    pub fn submit(&mut self, raw: &str) -> Turn {
        let report = match self.engine.as_mut() {
            Some(engine) => engine.submit(raw),
            None => return Turn::from_report(Report::ignored()),
        };
        let mut turn = Turn::from_report(report);

        match &turn.report.outcome {
            Outcome::Accepted { entry, .. } => {
                self.discover(&entry.name);
                self.emit(AnalyticsEvent::EntryAnswered { name: entry.name.clone() });
                turn.milestone = self.take_milestone();
            }
            Outcome::Cleared { entry, .. } => {
                self.discover(&entry.name);
                turn.milestone = self.take_milestone();
            }
            _ => {}
        }

        if let Some(ending) = turn.report.ending {
            turn.new_high_score = self.conclude(ending);
        }
        turn
    }

    pub fn reroll(&mut self) -> Turn {
        self.drive(RulesEngine::reroll)
    }

    pub fn hint(&mut self) -> Turn {
        self.drive(RulesEngine::hint)
    }

    pub fn finish(&mut self) -> Turn {
        self.drive(RulesEngine::finish)
    }

    /// One second of wall-clock time. Only timed games react.
    pub fn tick(&mut self) -> Option<Turn> {
        let report = self.engine.as_mut()?.tick()?;
        let mut turn = Turn::from_report(report);
        if let Some(ending) = turn.report.ending {
            turn.new_high_score = self.conclude(ending);
        }
        Some(turn)
    }

    fn drive(&mut self, action: fn(&mut RulesEngine) -> Report) -> Turn {
        let report = match self.engine.as_mut() {
            Some(engine) => action(engine),
            None => Report::ignored(),
        };
        let mut turn = Turn::from_report(report);
        if let Some(ending) = turn.report.ending {
            turn.new_high_score = self.conclude(ending);
        }
        turn
    }

    /// Asks to switch modes. Returns true if a confirmation is now pending;
    /// asking for the current mode does nothing.
    pub fn request_mode(&mut self, mode: Mode) -> bool {
        if mode == self.mode {
            self.pending_mode = None;
            return false;
        }
        self.pending_mode = Some(mode);
        true
    }

    pub fn pending_mode(&self) -> Option<Mode> {
        self.pending_mode
    }

    /// Applies the pending mode, discarding the game in progress.
    pub fn confirm_mode_change(&mut self) -> Option<Turn> {
        let mode = self.pending_mode.take()?;
        self.mode = mode;
        self.high_score = self.store.high_score(mode);
        self.start(None)
    }

    pub fn cancel_mode_change(&mut self) {
        self.pending_mode = None;
    }

    /// Records the end of the game. Returns true if the high score improved.
    fn conclude(&mut self, ending: Ending) -> bool {
        let Some(engine) = self.engine.as_ref() else {
            return false;
        };
        let state = engine.state();
        let score = state.score;
        let chain_length = engine.chain_length();
        let summary = GameSummary {
            mode: self.mode,
            cleared: ending.is_clear(),
            score,
            chain_length: chain_length as u32,
            answers: engine.answers() as u32,
            max_combo: state.max_combo,
        };
        info!("session: {:?} with score {} after {} entries", ending, score, chain_length);

        let improved = score > self.high_score;
        if improved {
            self.high_score = score;
            let result = self.store.set_high_score(self.mode, score);
            persist("high score", result);
        }

        self.stats.record_end(&summary, Utc::now());
        let result = self.store.set_personal_stats(&self.stats);
        persist("personal stats", result);

        let mode = self.mode;
        self.emit(if ending.is_clear() {
            AnalyticsEvent::GameCleared { score, chain_length, mode }
        } else {
            AnalyticsEvent::GameOver { score, chain_length, mode }
        });
        improved
    }

    fn discover(&mut self, name: &str) {
        self.history.record(name);
        let result = self.store.record_play(name);
        persist("history", result);
    }

    /// Advances the milestone watermark by at most one threshold.
    pub fn take_milestone(&mut self) -> Option<u32> {
        let milestone = progress::next_milestone(self.progress_percent(), self.watermark)?;
        self.watermark = milestone;
        let result = self.store.set_milestone_watermark(milestone);
        persist("milestone", result);
        Some(milestone)
    }

    fn emit(&self, event: AnalyticsEvent) {
        if let Some(analytics) = &self.analytics {
            if let Err(e) = analytics.emit(&event) {
                warn!("session: dropped analytics event {}: {}", event.name(), e);
            }
        }
    }

    pub fn progress_percent(&self) -> f64 {
        progress::completion_percent(
            self.history.len(),
            self.config.restricted_names.len(),
            self.catalog.len(),
        )
    }

    /// Every catalog entry in catalog order, masked until discovered.
    pub fn dex(&self) -> Vec<DexRow<'_>> {
        progress::dex(&self.catalog, &self.history, &self.config.restricted_names)
    }

    /// Result summary for sharing, available once the game is over. The link
    /// replays the same start and goal when both ids are known.
    pub fn share_text(&self) -> Option<String> {
        let engine = self.engine.as_ref()?;
        let state = engine.state();
        let headline = match state.phase {
            Phase::Playing => return None,
            Phase::Cleared => "🎉 Cleared!",
            Phase::Finished => "Game over",
        };

        let ids = (
            self.catalog.id_of(&state.start_entry.name),
            self.catalog.id_of(&state.goal_entry.name),
        );
        let url = match ids {
            (Some(start), Some(goal)) => format!("{}?start={}&goal={}", self.config.share_url, start, goal),
            _ => self.config.share_url.clone(),
        };
        let rerolls_used = self.config.reroll_budget.saturating_sub(state.rerolls_remaining);
        let hint = if state.used_hint { "Hint used" } else { "No hints" };

        Some(format!(
            "🎮 Shiritori Chain ({mode})\n{headline}\n\n{start} → {goal}\n\n\
             Score: {score}pt\nChain: {chain}\nMax combo: {combo}\nChanges used: {rerolls}\n{hint}\n\n\
             Try the same puzzle!\n{url}",
            mode = self.mode,
            start = state.start_entry.name,
            goal = state.goal_entry.name,
            score = state.score,
            chain = engine.chain_length(),
            combo = state.max_combo,
            rerolls = rerolls_used,
        ))
    }

    pub fn is_available(&self) -> bool {
        self.engine.is_some()
    }

    pub fn engine(&self) -> Option<&RulesEngine> {
        self.engine.as_ref()
    }

    pub fn state(&self) -> Option<&SessionState> {
        self.engine.as_ref().map(RulesEngine::state)
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn high_score(&self) -> u32 {
        self.high_score
    }

    pub fn history(&self) -> &DiscoveryHistory {
        &self.history
    }

    pub fn watermark(&self) -> u32 {
        self.watermark
    }

    pub fn stats(&self) -> &PersonalStats {
        &self.stats
    }

    pub fn catalog(&self) -> &CatalogIndex {
        &self.catalog
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }
}

fn persist(what: &str, result: Result<()>) {
    if let Err(e) = result {
        warn!("session: {} not saved: {}", what, e);
    }
}
