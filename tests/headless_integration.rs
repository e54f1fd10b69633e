use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, TimeZone};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{backend::TestBackend, buffer::Buffer, Terminal};

use wordflip::app::{App, AppState, Feedback};
use wordflip::clock::{Clock, FixedClock};
use wordflip::config::Config;
use wordflip::runtime::{AppEvent, FixedTicker, Runner, TestEventSource};
use wordflip::session::{SessionKind, SessionState};
use wordflip::store::{SqliteStore, WordStore};
use wordflip::ui::ui;
use wordflip::word::{Word, WordStatus};

fn key(code: KeyCode) -> AppEvent {
    AppEvent::Key(KeyEvent::new(code, KeyModifiers::NONE))
}

fn text_keys(text: &str) -> Vec<AppEvent> {
    text.chars().map(|c| key(KeyCode::Char(c))).collect()
}

fn screen_text(buffer: &Buffer) -> String {
    buffer.content.iter().map(|cell| cell.symbol()).collect()
}

fn test_app(words: &[(&str, &str)]) -> (Arc<SqliteStore>, App) {
    let now = Local.with_ymd_and_hms(2024, 5, 20, 18, 0, 0).unwrap();
    let store = Arc::new(SqliteStore::in_memory().unwrap());
    for (value, translation) in words {
        store.insert_word(&Word::new(*value, *translation, now)).unwrap();
    }
    let clock: Arc<dyn Clock> = Arc::new(FixedClock::new(now));
    let config = Config {
        shuffle_new_words: false,
        ..Config::default()
    };
    let mut app = App::new(store.clone(), clock, config, SessionKind::Learn, None);
    app.start();
    (store, app)
}

// Headless flow using the internal runtime without a TTY
#[test]
fn headless_learning_flow() {
    let (store, mut app) = test_app(&[("el sol", "the sun"), ("la luna", "the moon")]);

    let (tx, rx) = mpsc::channel();
    let runner = Runner::new(
        TestEventSource::new(rx),
        FixedTicker::new(Duration::from_millis(5)),
    );

    // first word: already known; second word: learn and type it
    tx.send(key(KeyCode::Char('k'))).unwrap();
    tx.send(key(KeyCode::Char('l'))).unwrap();
    for event in text_keys("the mon") {
        tx.send(event).unwrap();
    }
    tx.send(key(KeyCode::Enter)).unwrap();
    for event in text_keys("The Moon") {
        tx.send(event).unwrap();
    }
    tx.send(key(KeyCode::Enter)).unwrap();
    tx.send(key(KeyCode::Esc)).unwrap();

    let mut saw_incorrect = false;
    let mut quit = false;
    for _ in 0..200u32 {
        match runner.step() {
            AppEvent::Tick => app.on_tick(),
            AppEvent::Resize => {}
            AppEvent::Key(key) => {
                if !app.on_key(key) {
                    quit = true;
                    break;
                }
                saw_incorrect |= app.feedback == Some(Feedback::Incorrect);
            }
        }
    }

    assert!(quit, "escape should end the loop");
    assert!(saw_incorrect, "the misspelled answer should be rejected");
    assert_eq!(app.feedback, Some(Feedback::Correct("the moon".to_string())));
    assert_eq!(app.session.state(), &SessionState::Empty);

    let statuses: Vec<WordStatus> = store
        .all_words()
        .unwrap()
        .into_iter()
        .map(|w| w.status)
        .collect();
    assert_eq!(statuses, vec![WordStatus::AlreadyKnown, WordStatus::Memorized]);
}

#[test]
fn headless_render_study_and_progress() {
    let (_store, mut app) = test_app(&[("el perro", "the dog")]);
    let mut terminal = Terminal::new(TestBackend::new(90, 30)).unwrap();

    terminal.draw(|f| ui(&mut app, f)).unwrap();
    let text = screen_text(terminal.backend().buffer());
    assert!(text.contains("el perro"));
    assert!(text.contains("(k)now it"));

    app.on_key(KeyEvent::new(KeyCode::Char('l'), KeyModifiers::NONE));
    terminal.draw(|f| ui(&mut app, f)).unwrap();
    let text = screen_text(terminal.backend().buffer());
    assert!(text.contains("3 attempts left"));

    app.on_key(KeyEvent::new(KeyCode::Tab, KeyModifiers::NONE));
    assert_eq!(app.state, AppState::Progress);
    for _ in 0..200 {
        app.on_tick();
        if app.stats.is_some() {
            break;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    assert!(app.stats.is_some(), "statistics worker should publish");

    terminal.draw(|f| ui(&mut app, f)).unwrap();
    let text = screen_text(terminal.backend().buffer());
    assert!(text.contains("words per day"));
    assert!(text.contains("streak 0 days"));
}

#[test]
fn headless_empty_session_switches_to_review() {
    let (_store, mut app) = test_app(&[]);
    assert_eq!(app.session.state(), &SessionState::Empty);

    let mut terminal = Terminal::new(TestBackend::new(90, 20)).unwrap();
    terminal.draw(|f| ui(&mut app, f)).unwrap();
    assert!(screen_text(terminal.backend().buffer()).contains("nothing left to study"));

    assert!(app.on_key(KeyEvent::new(KeyCode::Char('v'), KeyModifiers::NONE)));
    assert_eq!(app.session.kind(), SessionKind::Review);
    assert_eq!(app.session.state(), &SessionState::Empty);
}
