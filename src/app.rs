use std::sync::Arc;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use log::{error, info};

use crate::category::CategoryId;
use crate::clock::Clock;
use crate::config::Config;
use crate::session::{SessionKind, SessionState, StudySession, Substate};
use crate::stats::StatisticsSnapshot;
use crate::store::WordStore;
use crate::workers::{ReviewPoller, StatisticsWorker};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Study,
    Progress,
}

/// Result of the last typed answer, shown under the card
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Feedback {
    Correct(String),
    Incorrect,
    Error(String),
}

pub struct App {
    pub store: Arc<dyn WordStore>,
    pub clock: Arc<dyn Clock>,
    pub config: Config,
    pub session: StudySession<dyn WordStore>,
    pub state: AppState,
    /// Typed answer being edited
    pub input: String,
    /// Translation shown on a review card
    pub show_translation: bool,
    pub feedback: Option<Feedback>,
    pub stats: Option<StatisticsSnapshot>,
    pub due_for_review: Option<usize>,
    category: Option<CategoryId>,
    stats_worker: Option<StatisticsWorker>,
    review_poller: Option<ReviewPoller>,
}

impl App {
    pub fn new(
        store: Arc<dyn WordStore>,
        clock: Arc<dyn Clock>,
        config: Config,
        kind: SessionKind,
        category: Option<CategoryId>,
    ) -> Self {
        let mut settings = config.session_settings(kind);
        settings.category = category;
        let session = StudySession::new(store.clone(), clock.clone(), settings);
        Self {
            store,
            clock,
            config,
            session,
            state: AppState::Study,
            input: String::new(),
            show_translation: false,
            feedback: None,
            stats: None,
            due_for_review: None,
            category,
            stats_worker: None,
            review_poller: None,
        }
    }

    /// Load the session queue. Failures are shown in the session state.
    pub fn start(&mut self) {
        if let Err(err) = self.session.load() {
            error!("failed to load session: {err}");
        }
    }

    pub fn attach_review_poller(&mut self, poller: ReviewPoller) {
        self.review_poller = Some(poller);
    }

    /// Replace the session with a fresh one of `kind`
    pub fn switch_session(&mut self, kind: SessionKind) {
        info!("switching to {kind} session");
        let mut settings = self.config.session_settings(kind);
        settings.category = self.category;
        self.session = StudySession::new(self.store.clone(), self.clock.clone(), settings);
        self.reset_card();
        self.start();
    }

    /// Kick off a statistics computation in the background, cancelling any
    /// run still in flight
    pub fn refresh_stats(&mut self) {
        if let Some(worker) = self.stats_worker.take() {
            worker.cancel();
        }
        self.stats_worker = Some(StatisticsWorker::spawn(
            self.store.clone(),
            self.clock.clone(),
            self.config.stats_window_days,
        ));
    }

    pub fn stats_pending(&self) -> bool {
        self.stats_worker.is_some()
    }

    pub fn on_tick(&mut self) {
        if let Some(snapshot) = self.stats_worker.as_ref().and_then(StatisticsWorker::try_recv) {
            self.stats = Some(snapshot);
            self.stats_worker = None;
        }
        if let Some(due) = self.review_poller.as_ref().and_then(ReviewPoller::latest) {
            self.due_for_review = Some(due);
        }
    }

    /// Handle a key press. Returns false when the app should quit.
    pub fn on_key(&mut self, key: KeyEvent) -> bool {
        if key.code == KeyCode::Esc
            || (key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c'))
        {
            return false;
        }

        if key.code == KeyCode::Tab {
            self.state = match self.state {
                AppState::Study => {
                    self.refresh_stats();
                    AppState::Progress
                }
                AppState::Progress => AppState::Study,
            };
            return true;
        }

        match self.state {
            AppState::Study => self.on_study_key(key),
            AppState::Progress => {
                if key.code == KeyCode::Char('r') {
                    self.refresh_stats();
                }
            }
        }
        true
    }

    fn on_study_key(&mut self, key: KeyEvent) {
        let state = self.session.state().clone();
        let result = match state {
            SessionState::Loading => Ok(()),
            SessionState::Empty => {
                match key.code {
                    KeyCode::Char('r') => self.start(),
                    KeyCode::Char('l') => self.switch_session(SessionKind::Learn),
                    KeyCode::Char('v') => self.switch_session(SessionKind::Review),
                    _ => {}
                }
                Ok(())
            }
            SessionState::Error(_) => match key.code {
                KeyCode::Char('r') => self.session.refresh(),
                _ => Ok(()),
            },
            SessionState::Active {
                current, substate, ..
            } => match substate {
                Substate::Presenting => match key.code {
                    KeyCode::Right | KeyCode::Char('s') => self.advance(|s| s.skip()),
                    KeyCode::Char('k') if !current.status.is_settled() => {
                        self.advance(|s| s.mark_known())
                    }
                    KeyCode::Char('l') | KeyCode::Enter if !current.status.is_settled() => {
                        self.advance(|s| s.start_learning())
                    }
                    KeyCode::Char(' ') if current.status.is_reviewable() => {
                        self.show_translation = !self.show_translation;
                        Ok(())
                    }
                    KeyCode::Char('y') if current.status.is_reviewable() => {
                        self.advance(|s| s.review(true))
                    }
                    KeyCode::Char('n') if current.status.is_reviewable() => {
                        self.advance(|s| s.review(false))
                    }
                    _ => Ok(()),
                },
                Substate::Answering { .. } => match key.code {
                    KeyCode::Enter => {
                        let answer = std::mem::take(&mut self.input);
                        let translation = current.translation.clone();
                        match self.session.submit_answer(&answer) {
                            Ok(true) => {
                                self.feedback = Some(Feedback::Correct(translation));
                                Ok(())
                            }
                            Ok(false) => {
                                self.feedback = Some(Feedback::Incorrect);
                                Ok(())
                            }
                            Err(err) => Err(err),
                        }
                    }
                    KeyCode::Backspace => {
                        self.input.pop();
                        Ok(())
                    }
                    KeyCode::Right => self.advance(|s| s.skip()),
                    KeyCode::Char(c) => {
                        self.input.push(c);
                        Ok(())
                    }
                    _ => Ok(()),
                },
                Substate::RevealedAnswer => match key.code {
                    KeyCode::Enter => self.advance(|s| s.confirm_revealed()),
                    _ => Ok(()),
                },
            },
        };

        if let Err(err) = result {
            error!("{err}");
            self.feedback = Some(Feedback::Error(err.to_string()));
        }
    }

    /// Run a session operation that moves to another card
    fn advance<F>(&mut self, op: F) -> Result<(), crate::session::SessionError>
    where
        F: FnOnce(&mut StudySession<dyn WordStore>) -> Result<(), crate::session::SessionError>,
    {
        self.reset_card();
        op(&mut self.session)
    }

    fn reset_card(&mut self) {
        self.input.clear();
        self.show_translation = false;
        self.feedback = None;
    }
}
