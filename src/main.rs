use std::{
    error::Error,
    fs::File,
    io::{self, stdin, Write},
    path::PathBuf,
    sync::Arc,
    time::Duration,
};

use clap::{error::ErrorKind, CommandFactory, Parser, Subcommand};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use log::info;
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};

use wordflip::{
    app::App,
    app_dirs::AppDirs,
    category::CategoryId,
    clock::{Clock, SystemClock},
    config::{Config, ConfigStore, FileConfigStore},
    deck,
    logging::{self, LogTarget},
    runtime::{AppEvent, CrosstermEventSource, FixedTicker, Runner},
    session::SessionKind,
    stats::{self, StatisticsSnapshot, MAX_WINDOW_DAYS},
    store::{SqliteStore, WordStore},
    ui::ui,
    word::WordStatus,
    workers::ReviewPoller,
};

const TICK_RATE_MS: u64 = 100;
const REVIEW_POLL_SECS: u64 = 60;

/// terminal flashcards for vocabulary: learn, review, and track your streaks
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Terminal flashcards for vocabulary. Mark words you already know, learn new ones by typing their translation, review what you memorized and watch your daily progress and streaks."
)]
pub struct Cli {
    /// path to the word database (default: ~/.local/state/wordflip/words.db)
    #[clap(long, global = true)]
    db: Option<PathBuf>,

    /// path to the config file
    #[clap(long, global = true)]
    config: Option<PathBuf>,

    /// only study words from this category
    #[clap(short = 'c', long, global = true)]
    category: Option<String>,

    /// typed-answer attempts before the answer is revealed
    #[clap(long)]
    max_attempts: Option<u32>,

    /// successful reviews a memorized word needs before it is mastered
    #[clap(long)]
    mastery_threshold: Option<u32>,

    /// compare answers exactly instead of ignoring case and alternatives
    #[clap(long)]
    strict: bool,

    #[clap(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// learn new words (default)
    Learn,
    /// review memorized and mastered words that are due
    Review,
    /// print daily progress and streaks
    Stats {
        /// number of days to show, ending today
        #[clap(short = 'd', long, value_parser = clap::value_parser!(u32).range(1..=i64::from(MAX_WINDOW_DAYS)))]
        days: Option<u32>,
        /// print the snapshot as JSON
        #[clap(long)]
        json: bool,
    },
    /// import words from a CSV file with value,translation,category columns
    Import {
        file: PathBuf,
        /// category for rows that have none
        #[clap(long = "into")]
        into: Option<String>,
    },
    /// export all words to a CSV file
    Export { file: PathBuf },
    /// list categories, or delete one
    Categories {
        /// delete the category with this name (its words are kept)
        #[clap(long)]
        delete: Option<String>,
    },
    /// add a bundled starter deck, or list them when no name is given
    Seed { deck: Option<String> },
}

impl Cli {
    /// Config file values with command line overrides applied
    fn load_config(&self) -> Config {
        let store = match &self.config {
            Some(path) => FileConfigStore::with_path(path),
            None => FileConfigStore::new(),
        };
        let mut config = store.load();
        if let Some(n) = self.max_attempts {
            config.max_attempts = n;
        }
        if let Some(n) = self.mastery_threshold {
            config.mastery_threshold = n;
        }
        if self.strict {
            config.strict_answers = true;
        }
        config
    }

    fn is_interactive(&self) -> bool {
        matches!(self.command, None | Some(Command::Learn) | Some(Command::Review))
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    if cli.is_interactive() {
        let log_path = AppDirs::log_path().unwrap_or_else(|| PathBuf::from("wordflip.log"));
        logging::init(LogTarget::File(log_path))?;
    } else {
        logging::init(LogTarget::Stderr)?;
    }

    let config = cli.load_config();
    let store = Arc::new(match &cli.db {
        Some(path) => SqliteStore::open(path)?,
        None => SqliteStore::open_default()?,
    });
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let category = resolve_category(store.as_ref(), cli.category.as_deref())?;

    match cli.command.clone().unwrap_or(Command::Learn) {
        Command::Learn => run_tui(store, clock, config, SessionKind::Learn, category),
        Command::Review => run_tui(store, clock, config, SessionKind::Review, category),
        Command::Stats { days, json } => {
            let days = days.unwrap_or(config.stats_window_days);
            let snapshot = stats::compute_snapshot(store.as_ref(), clock.as_ref(), days)?;
            let mut out = io::stdout().lock();
            if json {
                serde_json::to_writer_pretty(&mut out, &snapshot)?;
                writeln!(out)?;
            } else {
                print_stats(&mut out, &snapshot)?;
            }
            Ok(())
        }
        Command::Import { file, into } => {
            let report = deck::import_csv(store.as_ref(), File::open(&file)?, into.as_deref(), clock.now())?;
            println!("imported {} words, skipped {}", report.inserted, report.skipped);
            Ok(())
        }
        Command::Export { file } => {
            let written = deck::export_csv(store.as_ref(), File::create(&file)?)?;
            println!("exported {written} words to {}", file.display());
            Ok(())
        }
        Command::Categories { delete } => {
            if let Some(name) = delete {
                match store.category_by_name(&name)? {
                    Some(category) => {
                        store.delete_category(category.id)?;
                        println!("deleted category {name}");
                    }
                    None => return Err(format!("unknown category {name}").into()),
                }
            }
            for category in store.categories()? {
                println!(
                    "{} {} ({} words)",
                    category.glyph(),
                    category.name,
                    store.category_links_count(category.id)?
                );
            }
            Ok(())
        }
        Command::Seed { deck: None } => {
            for name in deck::bundled_names() {
                println!("{name}");
            }
            Ok(())
        }
        Command::Seed { deck: Some(name) } => {
            let bundled = deck::bundled(&name)?;
            let report = deck::seed(store.as_ref(), &bundled, clock.now())?;
            println!(
                "added {} words from {}, skipped {}",
                report.inserted, bundled.name, report.skipped
            );
            Ok(())
        }
    }
}

fn resolve_category(
    store: &dyn WordStore,
    name: Option<&str>,
) -> Result<Option<CategoryId>, Box<dyn Error>> {
    match name {
        None => Ok(None),
        Some(name) => match store.category_by_name(name)? {
            Some(category) => Ok(Some(category.id)),
            None => Err(format!("unknown category {name}").into()),
        },
    }
}

fn print_stats<W: Write>(out: &mut W, snapshot: &StatisticsSnapshot) -> io::Result<()> {
    write!(out, "{:<12}", "date")?;
    for status in WordStatus::TRACKED {
        write!(out, "{:>15}", status.label())?;
    }
    writeln!(out)?;

    for day in &snapshot.daily {
        write!(out, "{:<12}", day.date.format("%Y-%m-%d").to_string())?;
        for status in WordStatus::TRACKED {
            write!(out, "{:>15}", day.get(status))?;
        }
        writeln!(out)?;
    }

    writeln!(out)?;
    writeln!(
        out,
        "current streak: {}   best streak: {}   average per day: {:.2}",
        snapshot.current_streak, snapshot.best_streak, snapshot.average_per_day
    )?;
    let summary: Vec<String> = snapshot
        .summary
        .iter()
        .map(|(status, n)| format!("{} {n}", status.label().to_lowercase()))
        .collect();
    writeln!(out, "words: {}", summary.join(", "))
}

fn run_tui(
    store: Arc<SqliteStore>,
    clock: Arc<dyn Clock>,
    config: Config,
    kind: SessionKind,
    category: Option<CategoryId>,
) -> Result<(), Box<dyn Error>> {
    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let poller = ReviewPoller::spawn(
        store.clone(),
        clock.clone(),
        config.review_interval(),
        FixedTicker::new(Duration::from_secs(REVIEW_POLL_SECS)),
    );
    let mut app = App::new(store, clock, config, kind, category);
    app.attach_review_poller(poller);
    app.start();

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = start_tui(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    info!("session finished: {:?}", app.session.summary());
    result
}

fn start_tui<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<(), Box<dyn Error>> {
    let runner = Runner::new(
        CrosstermEventSource::new(),
        FixedTicker::new(Duration::from_millis(TICK_RATE_MS)),
    );

    terminal.draw(|f| ui(app, f))?;
    loop {
        match runner.step() {
            AppEvent::Tick => app.on_tick(),
            AppEvent::Resize => {}
            AppEvent::Key(key) => {
                if !app.on_key(key) {
                    break;
                }
            }
        }
        terminal.draw(|f| ui(app, f))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Local, NaiveDate, TimeZone};
    use wordflip::stats::DateWindow;
    use wordflip::word::Word;

    #[test]
    fn test_cli_default_values() {
        let cli = Cli::parse_from(["wordflip"]);

        assert_eq!(cli.db, None);
        assert_eq!(cli.command, None);
        assert!(!cli.strict);
        assert!(cli.is_interactive());
    }

    #[test]
    fn test_cli_stats_subcommand() {
        let cli = Cli::parse_from(["wordflip", "--db", "/tmp/w.db", "stats", "--days", "14", "--json"]);

        assert_eq!(cli.db, Some(PathBuf::from("/tmp/w.db")));
        assert_eq!(
            cli.command,
            Some(Command::Stats {
                days: Some(14),
                json: true
            })
        );
        assert!(!cli.is_interactive());
    }

    #[test]
    fn test_cli_stats_days_out_of_range() {
        for days in ["0", "3651", "4000000000"] {
            let err = Cli::try_parse_from(["wordflip", "stats", "--days", days]).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::ValueValidation, "--days {days}");
        }
        let cli = Cli::try_parse_from(["wordflip", "stats", "-d", "3650"]).unwrap();
        assert_eq!(
            cli.command,
            Some(Command::Stats {
                days: Some(3650),
                json: false
            })
        );
    }

    #[test]
    fn test_cli_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["wordflip", "review", "--category", "Food"]);
        assert_eq!(cli.command, Some(Command::Review));
        assert_eq!(cli.category.as_deref(), Some("Food"));
    }

    #[test]
    fn test_cli_import_subcommand() {
        let cli = Cli::parse_from(["wordflip", "import", "words.csv", "--into", "Misc"]);
        assert_eq!(
            cli.command,
            Some(Command::Import {
                file: PathBuf::from("words.csv"),
                into: Some("Misc".to_string())
            })
        );
    }

    #[test]
    fn test_cli_overrides_config() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config.json");
        let path = config_path.to_str().unwrap();
        let cli = Cli::parse_from([
            "wordflip",
            "--config",
            path,
            "--mastery-threshold",
            "2",
            "--strict",
        ]);

        let config = cli.load_config();
        assert_eq!(config.mastery_threshold, 2);
        assert!(config.strict_answers);
        assert_eq!(config.max_attempts, 3);
    }

    #[test]
    fn test_resolve_category() {
        let store = SqliteStore::in_memory().unwrap();
        store.ensure_category("Food", Some("food")).unwrap();

        assert!(resolve_category(&store, Some("Food")).unwrap().is_some());
        assert!(resolve_category(&store, None).unwrap().is_none());
        assert!(resolve_category(&store, Some("Space")).is_err());
    }

    #[test]
    fn test_print_stats() {
        let today = NaiveDate::from_ymd_opt(2024, 4, 3).unwrap();
        let mut word = Word::new("uno", "one", Local.with_ymd_and_hms(2024, 4, 1, 9, 0, 0).unwrap());
        word.status = WordStatus::AlreadyKnown;
        word.status_changed_at = Some(Local.with_ymd_and_hms(2024, 4, 2, 9, 0, 0).unwrap());
        let snapshot = StatisticsSnapshot::build(
            &[word],
            &Default::default(),
            DateWindow::trailing(3, today),
            today,
        );

        let mut out = Vec::new();
        print_stats(&mut out, &snapshot).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert_eq!(text.lines().count(), 1 + 3 + 1 + 2);
        assert!(text.contains("2024-04-02"));
        assert!(text.contains("current streak: 0"));
        assert!(text.contains("already known 1"));
    }
}
