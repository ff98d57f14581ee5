use crossterm::cursor::MoveTo;
use crossterm::execute;
use crossterm::style::Stylize;
use crossterm::terminal::{Clear, ClearType};
use rand::rngs::StdRng;
use rand::SeedableRng;
use shiritori_core::analytics::LogAnalytics;
use shiritori_core::core::engine::TickSchedule;
use shiritori_core::core::kana;
use shiritori_core::persistence::{FileStore, MemoryStore, Store};
use shiritori_core::progress::progress_message;
use shiritori_core::{CatalogIndex, ChainEvent, DeepLink, GameConfig, Mode, Phase, Session, Turn};
use std::io::{self, stdin, stdout, BufRead, Write};
use std::path::PathBuf;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

const DEFAULT_CATALOG_PATH: &str = "catalog.csv";
const RECENT_EVENTS: usize = 8;
const TICK: Duration = Duration::from_secs(1);

struct CliConfig {
    catalog: PathBuf,
    config: Option<PathBuf>,
    store: Option<PathBuf>,
    mode: Mode,
    link: Option<DeepLink>,
    seed: Option<u64>,
}

fn main() {
    env_logger::init();

    let cli = match parse_args() {
        Ok(cli) => cli,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(2);
        }
    };

    let config = match &cli.config {
        Some(path) => match GameConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("[ERROR] {}", e);
                std::process::exit(2);
            }
        },
        None => GameConfig::default(),
    };

    let catalog = CatalogIndex::load(&cli.catalog);
    let store: Box<dyn Store> = match &cli.store {
        Some(path) => Box::new(FileStore::open(path)),
        None => Box::new(MemoryStore::new()),
    };
    let rng = match cli.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let mut session = Session::new(catalog, config, store, rng)
        .with_analytics(Box::new(LogAnalytics))
        .with_mode(cli.mode);
    let mut message = match session.start(cli.link.as_ref()) {
        Some(turn) => describe(&turn),
        None => {
            eprintln!(
                "[ERROR] No entries could be loaded from '{}'. The game is unavailable.",
                cli.catalog.display()
            );
            std::process::exit(1);
        }
    };

    let lines = spawn_stdin_reader();
    if let Err(e) = print_ui(&session, &message) {
        eprintln!("[ERROR] {}", e);
    }

    let mut schedule = TickSchedule::starting_at(Instant::now(), TICK);
    loop {
        let received = lines.recv_timeout(schedule.wait(Instant::now()));

        let mut redraw = false;
        for _ in 0..schedule.due(Instant::now()) {
            redraw |= session.engine().is_some_and(|e| e.countdown().is_running());
            if let Some(turn) = session.tick() {
                message = describe(&turn);
            }
        }

        match received {
            Ok(line) => {
                match handle_command(line.trim(), &mut session) {
                    Some(reply) => message = reply,
                    None => break,
                }
                redraw = true;
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }

        if redraw {
            if let Err(e) = print_ui(&session, &message) {
                eprintln!("[ERROR] {}", e);
            }
        }
    }

    println!("\nBest score ({}): {}", session.mode(), session.high_score());
}

/// Returns the message to show, or `None` to quit.
fn handle_command(cmd: &str, session: &mut Session) -> Option<String> {
    let reply = match cmd {
        ":quit" | "exit" => return None,
        ":change" => describe(&session.reroll()),
        ":hint" => describe(&session.hint()),
        ":finish" => describe(&session.finish()),
        ":reset" => session.reset().map(|t| describe(&t)).unwrap_or_default(),
        ":yes" => match session.confirm_mode_change() {
            Some(turn) => format!("Switched to {} mode. {}", session.mode(), describe(&turn)),
            None => String::new(),
        },
        ":no" => {
            session.cancel_mode_change();
            "Mode unchanged".to_string()
        }
        ":progress" => {
            let percent = session.progress_percent();
            format!(
                "Discovered {} of {} ({:.1}%) - {}",
                session.history().len() + session.config().restricted_names.len(),
                session.catalog().len(),
                percent,
                progress_message(percent)
            )
        }
        ":dex" => session
            .dex()
            .iter()
            .map(|row| {
                let plays = if row.plays > 0 { format!(" x{}", row.plays) } else { String::new() };
                format!("No.{} {}{}", row.entry.id, row.display_name(), plays)
            })
            .collect::<Vec<_>>()
            .join("\n"),
        ":share" => session
            .share_text()
            .unwrap_or_else(|| "Finish the game to share your result".to_string()),
        ":stats" => {
            let stats = session.stats();
            format!(
                "Games {} | clears {} | clear rate {:.1}% | avg answers {:.1} | best {} / {} (timed)",
                stats.total_games_played,
                stats.total_game_clears,
                stats.clear_rate,
                stats.average_answers_per_game,
                stats.best_untimed_score,
                stats.best_timed_score
            )
        }
        s if s.starts_with(":mode") => match parse_mode(s.trim_start_matches(":mode").trim()) {
            Some(mode) if session.request_mode(mode) => {
                format!("Switching to {} mode discards this game. Type :yes or :no", mode)
            }
            Some(mode) => format!("Already playing {} mode", mode),
            None => "Usage: :mode single|timed".to_string(),
        },
        s => describe(&session.submit(s)),
    };
    Some(reply)
}

fn describe(turn: &Turn) -> String {
    let mut parts = Vec::new();
    let outcome = turn.report.outcome.to_string();
    if !outcome.is_empty() {
        parts.push(outcome);
    }
    if let Some(ending) = turn.report.ending {
        parts.push(ending.to_string());
    }
    if turn.new_high_score {
        parts.push("🏆 New high score!".to_string());
    }
    if let Some(milestone) = turn.milestone {
        parts.push(format!("📖 {}% discovered: {}", milestone, progress_message(f64::from(milestone))));
    }
    parts.join("\n")
}

fn print_ui(session: &Session, message: &str) -> io::Result<()> {
    let mut out = stdout();
    execute!(out, Clear(ClearType::All), MoveTo(0, 0))?;

    writeln!(out, "{}", "Shiritori Chain".bold())?;
    writeln!(out, "---------------------------------------------------------------")?;
    writeln!(out, "Type a name to play. :change :hint :finish :reset :mode single|timed")?;
    writeln!(out, ":progress :dex :stats :share :quit\n")?;

    let (Some(engine), Some(state)) = (session.engine(), session.state()) else {
        writeln!(out, "Catalog unavailable.")?;
        return out.flush();
    };

    write!(
        out,
        "Mode: {}  Score: {}  Best: {}  Combo: {}  Changes left: {}",
        session.mode(),
        state.score.to_string().bold(),
        session.high_score(),
        state.combo,
        state.rerolls_remaining
    )?;
    if let Some(left) = engine.time_left() {
        write!(out, "  Time: {}s", left.to_string().yellow())?;
    }
    writeln!(out)?;
    writeln!(out, "Start: {}  Goal: {}", state.start_entry.name, state.goal_entry.name.as_str().green())?;

    writeln!(out, "\nChain:")?;
    let events = engine.ledger().events();
    for event in &events[events.len().saturating_sub(RECENT_EVENTS)..] {
        let line = match event {
            ChainEvent::Accepted { entry, points } => {
                format!("  {} [{}] +{}", entry.name, entry.categories.join("/"), points)
            }
            ChainEvent::Rerolled { from, to, points } => format!("  「{}」 -> 「{}」 {}", from, to, points),
            ChainEvent::Rejected { entry, points } => format!("  {} (duplicate) {}", entry.name, points),
            ChainEvent::Hinted { entry, points } => format!("  💡 {} {}", entry.name, points),
        };
        writeln!(out, "{}", line)?;
    }

    match state.phase {
        Phase::Playing => {
            writeln!(out, "\nNext: {}", kana::describe_variants(state.required_char).cyan())?
        }
        Phase::Cleared => writeln!(out, "\n{}", "Cleared! :reset to play again".green())?,
        Phase::Finished => writeln!(out, "\n{}", "Game over. :reset to play again".red())?,
    }

    if !message.is_empty() {
        writeln!(out, "\n{}", message)?;
    }
    write!(out, "\n> ")?;
    out.flush()
}

fn spawn_stdin_reader() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        for line in stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

fn parse_mode(value: &str) -> Option<Mode> {
    match value {
        "single" | "untimed" => Some(Mode::Untimed),
        "timed" | "timeattack" => Some(Mode::Timed),
        _ => None,
    }
}

fn parse_args() -> Result<CliConfig, String> {
    let mut cli = CliConfig {
        catalog: PathBuf::from(DEFAULT_CATALOG_PATH),
        config: None,
        store: None,
        mode: Mode::Untimed,
        link: None,
        seed: None,
    };
    let mut start_id: Option<String> = None;
    let mut goal_id: Option<String> = None;
    let mut args = std::env::args().skip(1);

    while let Some(arg) = args.next() {
        let mut value = |flag: &str| args.next().ok_or_else(|| format!("error: {} expects a value", flag));
        match arg.as_str() {
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            "--catalog" => cli.catalog = PathBuf::from(value("--catalog")?),
            "--config" => cli.config = Some(PathBuf::from(value("--config")?)),
            "--store" => cli.store = Some(PathBuf::from(value("--store")?)),
            "--mode" => {
                let raw = value("--mode")?;
                cli.mode = parse_mode(&raw).ok_or_else(|| format!("error: unknown mode '{}'", raw))?;
            }
            "--start" => start_id = Some(value("--start")?),
            "--goal" => goal_id = Some(value("--goal")?),
            "--seed" => {
                let raw = value("--seed")?;
                cli.seed = Some(raw.parse().map_err(|_| format!("error: invalid seed '{}'", raw))?);
            }
            other => return Err(format!("error: unexpected argument '{}'", other)),
        }
    }

    if let (Some(start_id), Some(goal_id)) = (start_id, goal_id) {
        cli.link = Some(DeepLink { start_id, goal_id });
    }
    Ok(cli)
}

fn print_help() {
    println!("Usage: shiritori [--catalog FILE] [--config FILE] [--store FILE]");
    println!("                 [--mode single|timed] [--start ID --goal ID] [--seed N]");
    println!();
    println!("The catalog is a CSV feed: id,name,category1[,category2[,hidden]] with a header row.");
}
