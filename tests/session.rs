use rand::rngs::StdRng;
use rand::SeedableRng;
use shiritori_core::analytics::{Analytics, AnalyticsEvent};
use shiritori_core::core::kana;
use shiritori_core::persistence::{MemoryStore, Records, Store};
use shiritori_core::progress::{DiscoveryHistory, PersonalStats};
use shiritori_core::{
    CatalogIndex, DeepLink, Ending, Error, GameConfig, Mode, Outcome, Phase, Result, Session,
};
use std::cell::RefCell;
use std::rc::Rc;

const FEED: &str = "\
id,name,type1,type2,hidden
4,ヒトカゲ,Fire,
128,ケンタロス,Fire,Normal
7,ゼニガメ,Water,
131,ラプラス,Water,Ice
121,スターミー,Water,Psychic
151,ミュウ,Psychic,
194,ウパー,Water,Ground
46,パラス,Bug,Grass
96,スリープ,Psychic,
103,ナッシー,Grass,Psychic
124,ルージュラ,Ice,Psychic
87,ジュゴン,Water,Ice
130,ギャラドス,Water,Flying
10001,メガリザードン,Fire,Dragon,1
150,ミュウツー,Psychic,
";

/// Store whose records stay visible to the test after the session takes it.
#[derive(Clone, Default)]
struct SharedStore(Rc<RefCell<MemoryStore>>);

impl SharedStore {
    fn records(&self) -> Records {
        self.0.borrow().records().clone()
    }
}

impl Store for SharedStore {
    fn high_score(&self, mode: Mode) -> u32 {
        self.0.borrow().high_score(mode)
    }

    fn set_high_score(&mut self, mode: Mode, value: u32) -> Result<()> {
        self.0.borrow_mut().set_high_score(mode, value)
    }

    fn history(&self) -> DiscoveryHistory {
        self.0.borrow().history()
    }

    fn record_play(&mut self, name: &str) -> Result<()> {
        self.0.borrow_mut().record_play(name)
    }

    fn milestone_watermark(&self) -> u32 {
        self.0.borrow().milestone_watermark()
    }

    fn set_milestone_watermark(&mut self, value: u32) -> Result<()> {
        self.0.borrow_mut().set_milestone_watermark(value)
    }

    fn personal_stats(&self) -> PersonalStats {
        self.0.borrow().personal_stats()
    }

    fn set_personal_stats(&mut self, stats: &PersonalStats) -> Result<()> {
        self.0.borrow_mut().set_personal_stats(stats)
    }
}

#[derive(Clone, Default)]
struct Recorder(Rc<RefCell<Vec<AnalyticsEvent>>>);

impl Recorder {
    fn names(&self) -> Vec<&'static str> {
        self.0.borrow().iter().map(AnalyticsEvent::name).collect()
    }
}

impl Analytics for Recorder {
    fn emit(&self, event: &AnalyticsEvent) -> Result<()> {
        self.0.borrow_mut().push(event.clone());
        Ok(())
    }
}

struct Offline;

impl Analytics for Offline {
    fn emit(&self, _event: &AnalyticsEvent) -> Result<()> {
        Err(Error::Analytics("no network".to_string()))
    }
}

fn link(start: &str, goal: &str) -> DeepLink {
    DeepLink { start_id: start.to_string(), goal_id: goal.to_string() }
}

fn session_with(config: GameConfig) -> (Session, SharedStore, Recorder) {
    let store = SharedStore::default();
    let recorder = Recorder::default();
    let session = Session::new(
        CatalogIndex::parse(FEED),
        config,
        Box::new(store.clone()),
        StdRng::seed_from_u64(7),
    )
    .with_analytics(Box::new(recorder.clone()));
    (session, store, recorder)
}

fn session() -> (Session, SharedStore, Recorder) {
    session_with(GameConfig::default())
}

#[test]
fn hidden_rows_are_not_playable() {
    let catalog = CatalogIndex::parse(FEED);
    assert_eq!(catalog.len(), 14);
    assert!(!catalog.contains("メガリザードン"));
}

#[test]
fn deep_link_is_honoured() {
    let (mut session, _, _) = session();
    let turn = session.start(Some(&link("4", "130"))).expect("catalog is loaded");
    assert_eq!(turn.report.outcome, Outcome::Ignored);
    assert_eq!(turn.report.ending, None);

    let state = session.state().unwrap();
    assert_eq!(state.start_entry.name, "ヒトカゲ");
    assert_eq!(state.goal_entry.name, "ギャラドス");
    assert_eq!(state.required_char, 'ゲ');
    assert_eq!(state.score, 0);
}

#[test]
fn unresolved_link_falls_back_to_a_random_pair() {
    let (mut session, _, _) = session();
    session.start(Some(&link("4", "9999"))).expect("catalog is loaded");

    let state = session.state().unwrap();
    assert!(session.catalog().contains(&state.start_entry.name));
    assert!(session.catalog().contains(&state.goal_entry.name));
    assert_ne!(kana::terminal_sound(&state.start_entry.name), Some(kana::NASAL));
}

#[test]
fn empty_catalog_is_unavailable() {
    let mut session = Session::new(
        CatalogIndex::parse("id,name,type1\n"),
        GameConfig::default(),
        Box::new(MemoryStore::new()),
        StdRng::seed_from_u64(1),
    );
    assert!(session.start(None).is_none());
    assert!(!session.is_available());
    assert_eq!(session.submit("ミュウ").report.outcome, Outcome::Ignored);
    assert_eq!(session.hint().report.outcome, Outcome::Ignored);
    assert!(session.tick().is_none());
}

#[test]
fn clearing_saves_the_high_score_and_reports_the_clear() {
    let (mut session, store, recorder) = session();
    session.start(Some(&link("4", "130")));

    let turn = session.submit("けんたろす");
    assert!(matches!(turn.report.outcome, Outcome::Accepted { points: 2, .. }));
    assert!(!turn.new_high_score);

    let turn = session.submit("ギャラドス");
    assert_eq!(turn.report.ending, Some(Ending::Cleared));
    assert!(turn.new_high_score);
    assert_eq!(session.state().unwrap().phase, Phase::Cleared);
    // 2 for the combo, 1 for the goal entry, 10 bonus.
    assert_eq!(session.high_score(), 13);

    let records = store.records();
    assert_eq!(records.untimed_high_score, 13);
    assert_eq!(records.timed_high_score, 0);
    assert_eq!(records.history.count("ケンタロス"), 1);
    assert_eq!(records.history.count("ギャラドス"), 1);
    assert!(!records.history.contains("ヒトカゲ"));
    assert_eq!(records.stats.total_game_clears, 1);
    assert_eq!(records.stats.total_answers, 2);

    assert_eq!(recorder.names(), vec!["pokemon_answer", "game_clear"]);
    let events = recorder.0.borrow();
    assert_eq!(
        events.last(),
        Some(&AnalyticsEvent::GameCleared { score: 13, chain_length: 3, mode: Mode::Untimed })
    );
}

#[test]
fn lower_score_keeps_the_old_record() {
    let (mut session, store, _) = session();
    session.start(Some(&link("4", "130")));
    session.submit("ギャラドス");
    assert_eq!(session.high_score(), 11);

    session.start(Some(&link("4", "130")));
    let turn = session.finish();
    assert_eq!(turn.report.ending, Some(Ending::Stopped));
    assert!(!turn.new_high_score);
    assert_eq!(store.records().untimed_high_score, 11);
    assert_eq!(store.records().stats.total_games_played, 2);
    assert_eq!(store.records().stats.total_game_overs, 1);
}

#[test]
fn finish_reports_game_over() {
    let (mut session, store, recorder) = session();
    session.start(Some(&link("4", "130")));
    session.submit("ケンタロス");

    let turn = session.finish();
    assert_eq!(turn.report.outcome, Outcome::Stopped);
    assert!(turn.new_high_score);
    assert_eq!(store.records().untimed_high_score, 2);
    assert_eq!(recorder.names().last(), Some(&"game_over"));

    // Nothing else is recorded once the game is over.
    assert_eq!(session.finish().report.outcome, Outcome::Ignored);
    assert_eq!(recorder.names().len(), 2);
}

#[test]
fn milestones_surface_one_per_turn() {
    let config = GameConfig { restricted_names: Vec::new(), ..GameConfig::default() };
    let (mut session, store, _) = session_with(config);
    session.start(Some(&link("131", "130")));

    // 14 entries: each answer adds about 7%.
    let expected = [("スターミー", Some(1)), ("ミュウ", Some(5)), ("ウパー", Some(10))];
    for (name, milestone) in expected {
        let turn = session.submit(name);
        assert!(matches!(turn.report.outcome, Outcome::Accepted { .. }), "{}", name);
        assert_eq!(turn.milestone, milestone, "{}", name);
    }
    assert_eq!(session.watermark(), 10);
    assert_eq!(store.records().milestone_watermark, 10);

    // A rejected answer never moves the watermark.
    let turn = session.submit("スターミー");
    assert!(matches!(turn.report.outcome, Outcome::Duplicate { .. }));
    assert_eq!(turn.milestone, None);
}

#[test]
fn history_survives_into_the_next_session() {
    let store = SharedStore::default();
    let mut first = Session::new(
        CatalogIndex::parse(FEED),
        GameConfig::default(),
        Box::new(store.clone()),
        StdRng::seed_from_u64(2),
    );
    first.start(Some(&link("4", "130")));
    first.submit("ケンタロス");

    let second = Session::new(
        CatalogIndex::parse(FEED),
        GameConfig::default(),
        Box::new(store.clone()),
        StdRng::seed_from_u64(3),
    );
    assert_eq!(second.history().count("ケンタロス"), 1);
    // One discovered entry plus the two restricted names, out of 14.
    let percent = second.progress_percent();
    assert!((percent - 3.0 / 14.0 * 100.0).abs() < 1e-9);
}

#[test]
fn timed_game_runs_out_and_saves_its_own_record() {
    let config = GameConfig { time_limit_secs: 3, ..GameConfig::default() };
    let (session, store, recorder) = session_with(config);
    let mut session = session.with_mode(Mode::Timed);
    session.start(Some(&link("4", "130")));
    assert_eq!(session.engine().unwrap().time_left(), Some(3));

    session.submit("ケンタロス");
    assert!(session.tick().is_none());
    assert!(session.tick().is_none());
    let turn = session.tick().expect("clock should run out");
    assert_eq!(turn.report.ending, Some(Ending::TimeUp));
    assert!(turn.new_high_score);
    assert!(session.tick().is_none());

    let records = store.records();
    assert_eq!(records.timed_high_score, 2);
    assert_eq!(records.untimed_high_score, 0);
    assert_eq!(records.stats.timed_games, 1);
    assert_eq!(records.stats.best_timed_score, 2);

    let events = recorder.0.borrow();
    assert_eq!(
        events.last(),
        Some(&AnalyticsEvent::GameOver { score: 2, chain_length: 2, mode: Mode::Timed })
    );
}

#[test]
fn untimed_game_ignores_ticks() {
    let (mut session, _, _) = session();
    session.start(Some(&link("4", "130")));
    for _ in 0..120 {
        assert!(session.tick().is_none());
    }
    assert!(session.engine().unwrap().is_playing());
}

#[test]
fn mode_change_waits_for_confirmation() {
    let (mut session, store, _) = session();
    store.0.borrow_mut().set_high_score(Mode::Timed, 40).unwrap();
    session.start(Some(&link("4", "130")));
    session.submit("ケンタロス");

    assert!(!session.request_mode(Mode::Untimed));
    assert!(session.request_mode(Mode::Timed));
    assert_eq!(session.pending_mode(), Some(Mode::Timed));
    session.cancel_mode_change();
    assert_eq!(session.pending_mode(), None);
    assert_eq!(session.mode(), Mode::Untimed);
    assert_eq!(session.state().unwrap().score, 2);

    session.request_mode(Mode::Timed);
    session.confirm_mode_change().expect("catalog is loaded");
    assert_eq!(session.mode(), Mode::Timed);
    assert_eq!(session.high_score(), 40);
    assert_eq!(session.state().unwrap().score, 0);
    assert_eq!(session.engine().unwrap().time_left(), Some(60));
    assert!(session.confirm_mode_change().is_none());
}

#[test]
fn analytics_failure_does_not_affect_play() {
    let mut session = Session::new(
        CatalogIndex::parse(FEED),
        GameConfig::default(),
        Box::new(MemoryStore::new()),
        StdRng::seed_from_u64(5),
    )
    .with_analytics(Box::new(Offline));
    session.start(Some(&link("4", "130")));

    let turn = session.submit("ケンタロス");
    assert!(matches!(turn.report.outcome, Outcome::Accepted { .. }));
    let turn = session.submit("ギャラドス");
    assert_eq!(turn.report.ending, Some(Ending::Cleared));
    assert_eq!(session.high_score(), 13);
}

#[test]
fn reset_starts_over_in_the_same_mode() {
    let (mut session, _, _) = session();
    session.start(Some(&link("4", "130")));
    session.submit("ケンタロス");

    let turn = session.reset().expect("catalog is loaded");
    assert_eq!(turn.report.outcome, Outcome::Ignored);
    let state = session.state().unwrap();
    assert_eq!(state.score, 0);
    assert_eq!(state.rerolls_remaining, 3);
    assert_eq!(session.engine().unwrap().chain_length(), 1);
    assert_eq!(session.mode(), Mode::Untimed);
}

#[test]
fn reroll_into_a_dead_end_reports_game_over() {
    let feed = "id,name,type1\n131,ラプラス,Water\n121,スターミー,Water\n194,ウパー,Water\n";
    let mut dead = 0;
    for seed in 0..20 {
        let store = SharedStore::default();
        let recorder = Recorder::default();
        let mut session = Session::new(
            CatalogIndex::parse(feed),
            GameConfig::default(),
            Box::new(store.clone()),
            StdRng::seed_from_u64(seed),
        )
        .with_analytics(Box::new(recorder.clone()));
        session.start(Some(&link("131", "194")));

        let turn = session.reroll();
        assert!(matches!(turn.report.outcome, Outcome::Rerolled { .. }));
        if turn.report.ending == Some(Ending::NoCandidates) {
            dead += 1;
            assert_eq!(session.state().unwrap().phase, Phase::Finished);
            assert_eq!(recorder.names(), vec!["game_over"]);
            assert_eq!(store.records().stats.total_game_overs, 1);
        } else {
            assert!(recorder.names().is_empty());
        }
    }
    assert!(dead > 0);
}

#[test]
fn dex_lists_discoveries_in_catalog_order() {
    let (mut session, _, _) = session();
    session.start(Some(&link("4", "130")));
    session.submit("ケンタロス");
    session.submit("スターミー");
    session.submit("スターミー");

    let rows = session.dex();
    assert_eq!(rows.len(), 14);
    let numbers: Vec<u32> = rows.iter().map(|r| r.entry.catalog_order()).collect();
    let mut sorted = numbers.clone();
    sorted.sort();
    assert_eq!(numbers, sorted);

    let row = |name: &str| rows.iter().find(|r| r.entry.name == name).unwrap().clone();
    assert_eq!(row("ケンタロス").display_name(), "ケンタロス");
    assert_eq!(row("ケンタロス").plays, 1);
    assert_eq!(row("スターミー").plays, 1);
    // The start entry is not a discovery.
    assert_eq!(row("ヒトカゲ").display_name(), "○○○○");
    assert!(!row("ミュウ").discovered);
}

#[test]
fn share_text_summarises_a_finished_game() {
    let (mut session, _, _) = session();
    session.start(Some(&link("4", "130")));
    assert!(session.share_text().is_none());

    session.submit("ケンタロス");
    let turn = session.submit("ギャラドス");
    assert_eq!(turn.report.ending, Some(Ending::Cleared));

    let text = session.share_text().expect("game is over");
    assert!(text.contains("Cleared"));
    assert!(text.contains("ヒトカゲ → ギャラドス"));
    assert!(text.contains("Chain: 3"));
    assert!(text.contains("Max combo: 1"));
    assert!(text.contains("Changes used: 0"));
    assert!(text.contains("No hints"));
    assert!(text.ends_with("https://ny-an.github.io/pokeshiri-game/?start=4&goal=130"));
}

#[test]
fn share_text_after_stopping_counts_hints_and_changes() {
    let (mut session, _, _) = session();
    session.start(Some(&link("4", "130")));
    session.submit("ケンタロス");
    assert!(matches!(session.hint().report.outcome, Outcome::Hinted { .. }));
    // The change may already end the game; stopping is then a no-op.
    session.reroll();
    session.finish();

    let text = session.share_text().expect("game is over");
    assert!(text.contains("Game over"));
    assert!(text.contains("Hint used"));
    assert!(text.contains("Changes used: 1"));
}
