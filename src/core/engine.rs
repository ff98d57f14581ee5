// File: src/core/engine.rs
//! The rules of one chain session: what a submission is worth, when the
//! chain ends, and how the timed-mode clock winds down.
use crate::config::GameConfig;
use crate::core::catalog::CatalogIndex;
use crate::core::kana::{self, NASAL, REROLL_ALPHABET};
use crate::core::ledger::Ledger;
use crate::core::types::{ChainEvent, Entry, Mode, Phase};
use log::debug;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Mutable state of a session, owned by [`RulesEngine`].
#[derive(Debug, Clone)]
pub struct SessionState {
    pub mode: Mode,
    pub required_char: char,
    /// Never negative: penalties saturate at zero.
    pub score: u32,
    pub combo: u32,
    pub max_combo: u32,
    /// Category that carried the current combo, if any.
    pub combo_category: Option<String>,
    pub rerolls_remaining: u32,
    pub used_hint: bool,
    pub phase: Phase,
    pub start_entry: Entry,
    pub goal_entry: Entry,
}

/// One-second countdown for timed sessions. Cancelling is idempotent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Countdown {
    remaining: u32,
    running: bool,
}

impl Countdown {
    pub fn start(secs: u32) -> Self {
        Self { remaining: secs, running: secs > 0 }
    }

    pub fn disabled() -> Self {
        Self { remaining: 0, running: false }
    }

    /// Advances one second. Returns true on the tick that reaches zero.
    pub fn tick(&mut self) -> bool {
        if !self.running {
            return false;
        }
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.running = false;
            return true;
        }
        false
    }

    pub fn cancel(&mut self) {
        self.running = false;
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn is_running(&self) -> bool {
        self.running
    }
}

/// Wall-clock schedule for [`Countdown`] ticks. Deadlines sit on a fixed
/// grid, so however often the caller wakes up, one tick is due per elapsed
/// period.
#[derive(Debug, Clone, Copy)]
pub struct TickSchedule {
    next: Instant,
    period: Duration,
}

impl TickSchedule {
    pub fn starting_at(now: Instant, period: Duration) -> Self {
        Self { next: now + period, period }
    }

    /// How long to wait before the next tick is due.
    pub fn wait(&self, now: Instant) -> Duration {
        self.next.saturating_duration_since(now)
    }

    /// Number of ticks due at `now`. Advances past each of them.
    pub fn due(&mut self, now: Instant) -> u32 {
        let mut ticks = 0;
        while now >= self.next {
            self.next += self.period;
            ticks += 1;
        }
        ticks
    }
}

/// Why a session left `Playing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ending {
    Cleared,
    NoCandidates,
    HintExhausted,
    TimeUp,
    Stopped,
}

impl Ending {
    pub fn is_clear(self) -> bool {
        self == Ending::Cleared
    }
}

impl fmt::Display for Ending {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ending::Cleared => write!(f, "🎉 Goal reached!"),
            Ending::NoCandidates => write!(f, "💥 No entry can continue the chain. Game over"),
            Ending::HintExhausted => write!(f, "💥 Nothing left to hint. Game over"),
            Ending::TimeUp => write!(f, "⏰ Time's up!"),
            Ending::Stopped => write!(f, "Game finished"),
        }
    }
}

/// What a single player action did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Not applicable right now; nothing changed.
    Ignored,
    Restricted { name: String },
    NotFound { name: String },
    Mismatch { required: char },
    Duplicate { entry: Entry, penalty: u32 },
    Accepted {
        entry: Entry,
        points: u32,
        combo: u32,
        /// Set when the entry ended on the nasal and a new initial was drawn.
        auto_reroll: Option<char>,
    },
    Cleared { entry: Entry, points: u32, goal_bonus: u32, time_bonus: u32 },
    Rerolled { from: char, to: char, penalty: u32 },
    Hinted { entry: Entry, cost: u32 },
    NoHint,
    Stopped,
    TimeUp,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Ignored => Ok(()),
            Outcome::Restricted { name } => write!(f, "❌ {} cannot be used (alternate form)", name),
            Outcome::NotFound { name } => write!(f, "❌ {} not found", name),
            Outcome::Mismatch { required } => {
                write!(f, "❌ The next name must start with {}", kana::describe_variants(*required))
            }
            Outcome::Duplicate { entry, penalty } => {
                write!(f, "❌ {} was already used! -{}pt", entry.name, penalty)
            }
            Outcome::Accepted { points, combo, auto_reroll, .. } => {
                if *combo > 0 {
                    write!(f, "✨ Category combo! +{}pt (combo ×{})", points, combo)?;
                } else {
                    write!(f, "Correct! +{}pt", points)?;
                }
                if let Some(c) = auto_reroll {
                    write!(f, " ⚡ Auto change: next starts with 「{}」", c)?;
                }
                Ok(())
            }
            Outcome::Cleared { points, goal_bonus, time_bonus, .. } => {
                write!(f, "🎉 Goal reached! +{}pt + bonus +{}pt", points, goal_bonus)?;
                if *time_bonus > 0 {
                    write!(f, " + time bonus +{}pt", time_bonus)?;
                }
                Ok(())
            }
            Outcome::Rerolled { to, penalty, .. } => {
                write!(f, "⏭️ Change used -{}pt, next starts with 「{}」", penalty, to)
            }
            Outcome::Hinted { entry, cost } => write!(f, "💡 Hint: {} -{}pt", entry.name, cost),
            Outcome::NoHint => write!(f, "💡 Hint: no entry fits"),
            Outcome::Stopped => write!(f, "Game finished"),
            Outcome::TimeUp => write!(f, "⏰ Time's up!"),
        }
    }
}

/// Result of an engine call: the outcome, plus the ending if the session
/// left `Playing` because of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub outcome: Outcome,
    pub ending: Option<Ending>,
}

impl Report {
    pub fn new(outcome: Outcome) -> Self {
        Self { outcome, ending: None }
    }

    pub fn ended(outcome: Outcome, ending: Ending) -> Self {
        Self { outcome, ending: Some(ending) }
    }

    pub fn ignored() -> Self {
        Self::new(Outcome::Ignored)
    }
}

/// State machine for a single session. Every call runs to completion and
/// leaves the state consistent; nothing here performs I/O.
pub struct RulesEngine {
    catalog: Arc<CatalogIndex>,
    config: GameConfig,
    state: SessionState,
    ledger: Ledger,
    used_names: HashSet<String>,
    countdown: Countdown,
    rng: StdRng,
}

impl RulesEngine {
    /// Seeds the ledger with `start`. Call [`ensure_continuation`](Self::ensure_continuation)
    /// afterwards: the start may already be a dead end.
    pub fn new(
        catalog: Arc<CatalogIndex>,
        config: GameConfig,
        mode: Mode,
        start: Entry,
        goal: Entry,
        mut rng: StdRng,
    ) -> Self {
        let required_char = match kana::terminal_sound(&start.name) {
            Some(c) if c != NASAL => c,
            _ => random_initial(&mut rng),
        };
        let countdown = match mode {
            Mode::Timed => Countdown::start(config.time_limit_secs),
            Mode::Untimed => Countdown::disabled(),
        };

        let mut used_names = HashSet::new();
        used_names.insert(start.name.clone());

        let state = SessionState {
            mode,
            required_char,
            score: 0,
            combo: 0,
            max_combo: 0,
            combo_category: None,
            rerolls_remaining: config.reroll_budget,
            used_hint: false,
            phase: Phase::Playing,
            start_entry: start.clone(),
            goal_entry: goal,
        };

        debug!(
            "engine: new {} session {} -> {}, next 「{}」",
            mode, state.start_entry.name, state.goal_entry.name, required_char
        );

        Self {
            catalog,
            config,
            state,
            ledger: Ledger::seed(start),
            used_names,
            countdown,
            rng,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn used_names(&self) -> &HashSet<String> {
        &self.used_names
    }

    pub fn is_playing(&self) -> bool {
        self.state.phase == Phase::Playing
    }

    /// Remaining seconds; `None` in untimed sessions.
    pub fn time_left(&self) -> Option<u32> {
        match self.state.mode {
            Mode::Timed => Some(self.countdown.remaining()),
            Mode::Untimed => None,
        }
    }

    pub fn countdown(&self) -> &Countdown {
        &self.countdown
    }

    pub fn chain_length(&self) -> usize {
        self.ledger.count_accepted()
    }

    /// Entries the player got accepted, not counting the start entry.
    pub fn answers(&self) -> usize {
        self.chain_length().saturating_sub(1)
    }

    pub fn submit(&mut self, raw: &str) -> Report {
        let trimmed = raw.trim();
        if trimmed.is_empty() || !self.is_playing() {
            return Report::ignored();
        }

        let name = kana::to_canonical_script(trimmed);
        if self.config.is_restricted(&name) {
            return Report::new(Outcome::Restricted { name });
        }

        let entry = match self.catalog.get(&name) {
            Some(entry) => entry.clone(),
            None => return Report::new(Outcome::NotFound { name }),
        };
        let last = match self.ledger.last_accepted_entry() {
            Some(last) => last.clone(),
            None => return Report::ignored(),
        };

        // Reaching the goal wins even if the name was used or does not chain.
        if entry.name == self.state.goal_entry.name {
            return self.clear(last, entry);
        }

        if self.used_names.contains(&entry.name) {
            let penalty = self.config.duplicate_penalty;
            self.ledger.append(ChainEvent::Rejected { entry: entry.clone(), points: -(penalty as i32) });
            self.state.score = self.state.score.saturating_sub(penalty);
            self.break_combo();
            debug!("engine: duplicate {}, score {}", entry.name, self.state.score);
            return Report::new(Outcome::Duplicate { entry, penalty });
        }

        let chains = kana::first_sound(&entry.name)
            .is_some_and(|first| kana::matches(self.state.required_char, first));
        if !chains {
            return Report::new(Outcome::Mismatch { required: self.state.required_char });
        }

        let points = self.award(&last, &entry);
        self.ledger.append(ChainEvent::Accepted { entry: entry.clone(), points: points as i32 });
        self.used_names.insert(entry.name.clone());
        self.state.score += points;

        let auto_reroll = match kana::terminal_sound(&entry.name) {
            Some(c) if c != NASAL => {
                self.state.required_char = c;
                None
            }
            _ => {
                let c = random_initial(&mut self.rng);
                self.state.required_char = c;
                Some(c)
            }
        };
        debug!(
            "engine: accepted {} +{} (combo {}), next 「{}」",
            entry.name, points, self.state.combo, self.state.required_char
        );

        let outcome = Outcome::Accepted { entry, points, combo: self.state.combo, auto_reroll };
        Report { outcome, ending: self.ensure_continuation() }
    }

    /// Player-elected change of the required initial.
    pub fn reroll(&mut self) -> Report {
        if !self.is_playing() || self.state.rerolls_remaining == 0 {
            return Report::ignored();
        }

        let from = self.state.required_char;
        let to = random_initial(&mut self.rng);
        let penalty = self.config.reroll_penalty;

        self.ledger.append(ChainEvent::Rerolled { from, to, points: -(penalty as i32) });
        self.state.required_char = to;
        self.state.rerolls_remaining -= 1;
        self.state.score = self.state.score.saturating_sub(penalty);
        self.break_combo();
        debug!("engine: reroll 「{}」 -> 「{}」, {} left", from, to, self.state.rerolls_remaining);

        Report { outcome: Outcome::Rerolled { from, to, penalty }, ending: self.ensure_continuation() }
    }

    /// Reveals one playable entry for a point. The entry is not consumed.
    pub fn hint(&mut self) -> Report {
        let cost = self.config.hint_cost;
        if !self.is_playing() || self.state.score < cost.max(1) {
            return Report::ignored();
        }

        let found = self
            .catalog
            .entry_by_initial_class(&mut self.rng, self.state.required_char, &self.used_names)
            .cloned();

        match found {
            Some(entry) => {
                self.state.score -= cost;
                self.state.used_hint = true;
                self.ledger.append(ChainEvent::Hinted { entry: entry.clone(), points: -(cost as i32) });
                Report::new(Outcome::Hinted { entry, cost })
            }
            None => {
                self.end(Ending::HintExhausted);
                Report::ended(Outcome::NoHint, Ending::HintExhausted)
            }
        }
    }

    /// Player-initiated stop.
    pub fn finish(&mut self) -> Report {
        if !self.is_playing() {
            return Report::ignored();
        }
        self.end(Ending::Stopped);
        Report::ended(Outcome::Stopped, Ending::Stopped)
    }

    /// Advances the timed-mode clock by one second. Returns a report only on
    /// the tick that runs out the clock.
    pub fn tick(&mut self) -> Option<Report> {
        if !self.is_playing() {
            self.countdown.cancel();
            return None;
        }
        if !self.countdown.tick() {
            return None;
        }
        self.end(Ending::TimeUp);
        Some(Report::ended(Outcome::TimeUp, Ending::TimeUp))
    }

    /// Ends the session if no unused entry can follow the required initial.
    pub fn ensure_continuation(&mut self) -> Option<Ending> {
        if !self.is_playing() {
            return None;
        }
        let stuck = self
            .catalog
            .candidates_for(self.state.required_char, &self.used_names)
            .next()
            .is_none();
        if stuck {
            self.end(Ending::NoCandidates);
            return Some(Ending::NoCandidates);
        }
        None
    }

    fn clear(&mut self, last: Entry, entry: Entry) -> Report {
        let points = self.award(&last, &entry);
        let goal_bonus = self.config.goal_bonus;
        let time_bonus = match self.state.mode {
            Mode::Timed => self.countdown.remaining(),
            Mode::Untimed => 0,
        };

        self.ledger.append(ChainEvent::Accepted { entry: entry.clone(), points: points as i32 });
        self.used_names.insert(entry.name.clone());
        self.state.score += points + goal_bonus + time_bonus;
        self.end(Ending::Cleared);

        Report::ended(Outcome::Cleared { entry, points, goal_bonus, time_bonus }, Ending::Cleared)
    }

    /// 1 point, plus the streak length when `entry` shares a category with `last`.
    fn award(&mut self, last: &Entry, entry: &Entry) -> u32 {
        match last.shared_category(entry) {
            Some(category) => {
                self.state.combo += 1;
                self.state.max_combo = self.state.max_combo.max(self.state.combo);
                self.state.combo_category = Some(category.to_string());
                1 + self.state.combo
            }
            None => {
                self.break_combo();
                1
            }
        }
    }

    fn break_combo(&mut self) {
        self.state.combo = 0;
        self.state.combo_category = None;
    }

    fn end(&mut self, ending: Ending) {
        self.state.phase = if ending.is_clear() { Phase::Cleared } else { Phase::Finished };
        self.countdown.cancel();
        debug!("engine: session ended ({:?}) with score {}", ending, self.state.score);
    }
}

fn random_initial(rng: &mut StdRng) -> char {
    *REROLL_ALPHABET.choose(rng).unwrap_or(&REROLL_ALPHABET[0])
}
