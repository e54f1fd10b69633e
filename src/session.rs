//! Study session controller.
//!
//! A [`StudySession`] walks a queue of word ids, routes every gesture through
//! [`progression::apply`] and commits the result through the store before
//! moving on. The current word is always re-read from the store after a
//! commit. Every state change is published to subscribers.

use std::collections::VecDeque;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;

use chrono::Duration;
use log::{debug, info, warn};
use rand::seq::SliceRandom;
use thiserror::Error;

use crate::answer_policy::AnswerPolicy;
use crate::category::CategoryId;
use crate::clock::Clock;
use crate::progression::{self, Action, InvalidTransition, ProgressionRules, Transition};
use crate::store::{StorageError, WordStore};
use crate::word::{Word, WordId, WordStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum SessionKind {
    Learn,
    Review,
}

impl SessionKind {
    fn accepts(self, status: WordStatus) -> bool {
        match self {
            SessionKind::Learn => matches!(status, WordStatus::New | WordStatus::InProgress),
            // failed reviews stay in the session as in-progress words
            SessionKind::Review => matches!(
                status,
                WordStatus::InProgress | WordStatus::Memorized | WordStatus::Mastered
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Substate {
    /// Card shown, waiting for a decision or a self-graded review
    Presenting,
    /// Typing the translation of an in-progress word
    Answering {
        attempts_remaining: u32,
        hint: Option<String>,
    },
    /// Attempts exhausted, the translation is shown
    RevealedAnswer,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Loading,
    Active {
        current: Word,
        queue_len: usize,
        substate: Substate,
    },
    Empty,
    Error(String),
}

impl SessionState {
    pub fn is_active(&self) -> bool {
        matches!(self, SessionState::Active { .. })
    }
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("no word is being studied")]
    NoCurrentWord,

    #[error("{0} is not available right now")]
    NotAvailable(&'static str),
}

#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub kind: SessionKind,
    pub rules: ProgressionRules,
    pub policy: AnswerPolicy,
    /// New words pulled into a learn session, words pulled into a review
    pub batch_size: usize,
    pub review_interval: Duration,
    pub category: Option<CategoryId>,
    /// Pick new words in random order instead of insertion order
    pub shuffle_new_words: bool,
}

impl SessionSettings {
    pub fn new(kind: SessionKind) -> Self {
        Self {
            kind,
            rules: ProgressionRules::default(),
            policy: AnswerPolicy::default(),
            batch_size: 10,
            review_interval: Duration::hours(24),
            category: None,
            shuffle_new_words: false,
        }
    }
}

/// What happened during the session, shown when it ends
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionSummary {
    pub marked_known: usize,
    pub started: usize,
    pub memorized: usize,
    pub reviewed: usize,
    pub mastered: usize,
    pub regressed: usize,
    pub wrong_answers: usize,
}

impl SessionSummary {
    fn record(&mut self, action: Action, before: WordStatus, after: WordStatus) {
        match action {
            Action::MarkKnown => self.marked_known += 1,
            Action::StartLearning => self.started += 1,
            Action::TypedAnswerCorrect => self.memorized += 1,
            Action::TypedAnswerIncorrect => self.wrong_answers += 1,
            Action::ReviewCorrect => {
                self.reviewed += 1;
                if before != WordStatus::Mastered && after == WordStatus::Mastered {
                    self.mastered += 1;
                }
            }
            Action::ReviewIncorrect => self.regressed += 1,
        }
    }
}

pub struct StudySession<S: WordStore + ?Sized> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    settings: SessionSettings,
    queue: VecDeque<WordId>,
    current: Option<Word>,
    attempts_remaining: u32,
    substate: Substate,
    state: SessionState,
    summary: SessionSummary,
    subscribers: Vec<Sender<SessionState>>,
}

impl<S: WordStore + ?Sized> StudySession<S> {
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>, settings: SessionSettings) -> Self {
        let attempts_remaining = settings.rules.max_attempts;
        Self {
            store,
            clock,
            settings,
            queue: VecDeque::new(),
            current: None,
            attempts_remaining,
            substate: Substate::Presenting,
            state: SessionState::Loading,
            summary: SessionSummary::default(),
            subscribers: Vec::new(),
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn current(&self) -> Option<&Word> {
        self.current.as_ref()
    }

    pub fn kind(&self) -> SessionKind {
        self.settings.kind
    }

    pub fn summary(&self) -> SessionSummary {
        self.summary
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Receive every subsequent state change. The current state is sent first.
    pub fn subscribe(&mut self) -> Receiver<SessionState> {
        let (tx, rx) = mpsc::channel();
        let _ = tx.send(self.state.clone());
        self.subscribers.push(tx);
        rx
    }

    /// Build the queue from the store and present the first word
    pub fn load(&mut self) -> Result<(), SessionError> {
        self.set_state(SessionState::Loading);
        self.current = None;

        let ids = match self.fetch_queue() {
            Ok(ids) => ids,
            Err(err) => return Err(self.fail(err)),
        };
        info!("{} session loaded with {} words", self.settings.kind, ids.len());
        self.queue = ids.into();

        self.present_front().map_err(|err| self.fail(err))
    }

    fn fetch_queue(&self) -> Result<Vec<WordId>, SessionError> {
        let batch = self.settings.batch_size;
        let words = match self.settings.kind {
            SessionKind::Learn => {
                let (mut words, mut new_words) = match self.settings.category {
                    Some(category) => (
                        self.store
                            .words_in_category(category, Some(WordStatus::InProgress))?,
                        self.store.words_in_category(category, Some(WordStatus::New))?,
                    ),
                    None => (
                        self.store.find_words_by_status(WordStatus::InProgress)?,
                        self.store.find_words_by_status(WordStatus::New)?,
                    ),
                };
                if self.settings.shuffle_new_words {
                    new_words.shuffle(&mut rand::thread_rng());
                }
                words.extend(new_words.into_iter().take(batch));
                words
            }
            SessionKind::Review => {
                let due = self.store.find_words_due_for_review(
                    self.clock.now(),
                    self.settings.review_interval,
                    usize::MAX,
                )?;
                let in_category: Option<Vec<WordId>> = match self.settings.category {
                    Some(category) => Some(
                        self.store
                            .words_in_category(category, None)?
                            .iter()
                            .map(|w| w.id)
                            .collect(),
                    ),
                    None => None,
                };
                due.into_iter()
                    .filter(|w| in_category.as_ref().map_or(true, |ids| ids.contains(&w.id)))
                    .take(batch)
                    .collect()
            }
        };
        Ok(words.iter().map(|w| w.id).collect())
    }

    pub fn mark_known(&mut self) -> Result<(), SessionError> {
        self.ensure_presenting("mark known")?;
        self.decide(Action::MarkKnown)?;
        self.queue.pop_front();
        self.present_front().map_err(|err| self.fail(err))
    }

    pub fn start_learning(&mut self) -> Result<(), SessionError> {
        self.ensure_presenting("start learning")?;
        self.decide(Action::StartLearning)?;
        self.present_front().map_err(|err| self.fail(err))
    }

    /// Check a typed translation. Returns whether it was accepted.
    pub fn submit_answer(&mut self, text: &str) -> Result<bool, SessionError> {
        let word = self.current_word()?;
        if self.substate == Substate::RevealedAnswer || matches!(self.state, SessionState::Error(_)) {
            return Err(SessionError::NotAvailable("answering"));
        }

        let correct = self.settings.policy.is_correct(text, &word.translation);
        let action = if correct {
            Action::TypedAnswerCorrect
        } else {
            Action::TypedAnswerIncorrect
        };

        let transition = self.decide(action)?;
        if correct {
            self.queue.pop_front();
            self.present_front().map_err(|err| self.fail(err))?;
            return Ok(true);
        }

        self.attempts_remaining = transition.attempts_remaining;
        self.substate = if transition.answer_revealed {
            Substate::RevealedAnswer
        } else {
            Substate::Answering {
                attempts_remaining: self.attempts_remaining,
                hint: self.hint_for(&word),
            }
        };
        self.publish_active();
        Ok(false)
    }

    /// Acknowledge a revealed answer. The word goes to the back of the queue.
    pub fn confirm_revealed(&mut self) -> Result<(), SessionError> {
        self.current_word()?;
        if self.substate != Substate::RevealedAnswer {
            return Err(SessionError::NotAvailable("confirming the answer"));
        }
        self.requeue_front();
        self.present_front().map_err(|err| self.fail(err))
    }

    /// Self-graded review of a memorized or mastered word
    pub fn review(&mut self, correct: bool) -> Result<(), SessionError> {
        self.ensure_presenting("review")?;
        let action = if correct {
            Action::ReviewCorrect
        } else {
            Action::ReviewIncorrect
        };

        let transition = self.decide(action)?;
        if transition.status() == WordStatus::InProgress {
            self.requeue_front();
        } else {
            self.queue.pop_front();
        }
        self.present_front().map_err(|err| self.fail(err))
    }

    /// Move the current word to the back of the queue
    pub fn skip(&mut self) -> Result<(), SessionError> {
        self.current_word()?;
        if matches!(self.state, SessionState::Error(_)) {
            return Err(SessionError::NotAvailable("skip"));
        }
        self.requeue_front();
        self.present_front().map_err(|err| self.fail(err))
    }

    /// Re-read the current word from the store, leaving the error state.
    /// Reloads the whole queue when nothing was being studied.
    pub fn refresh(&mut self) -> Result<(), SessionError> {
        if self.queue.is_empty() {
            return self.load();
        }
        self.present_front().map_err(|err| self.fail(err))
    }

    fn current_word(&self) -> Result<Word, SessionError> {
        self.current.clone().ok_or(SessionError::NoCurrentWord)
    }

    fn ensure_presenting(&self, what: &'static str) -> Result<(), SessionError> {
        self.current_word()?;
        if self.substate != Substate::Presenting || matches!(self.state, SessionState::Error(_)) {
            return Err(SessionError::NotAvailable(what));
        }
        Ok(())
    }

    /// Validate `action` against the current word and commit the outcome
    fn decide(&mut self, action: Action) -> Result<Transition, SessionError> {
        let word = self.current_word()?;
        let now = self.clock.now();

        let transition = match progression::apply(
            &word,
            action,
            self.attempts_remaining,
            &self.settings.rules,
            now,
        ) {
            Ok(transition) => transition,
            Err(err) => {
                warn!("rejected {action} for word {}: {err}", word.id);
                return Err(self.fail(err.into()));
            }
        };

        if let Some(event) = &transition.event {
            if let Err(err) = self.store.commit_transition(&transition.word, event) {
                return Err(self.fail(err.into()));
            }
            debug!(
                "word {} {:?}: {} -> {}",
                word.id, word.value, event.old_status, event.new_status
            );
        }

        self.summary
            .record(action, word.status, transition.status());
        Ok(transition)
    }

    fn hint_for(&self, word: &Word) -> Option<String> {
        let used = self
            .settings
            .rules
            .max_attempts
            .saturating_sub(self.attempts_remaining);
        self.settings
            .policy
            .hint(&word.translation, AnswerPolicy::hint_letters(used))
    }

    fn requeue_front(&mut self) {
        if let Some(id) = self.queue.pop_front() {
            self.queue.push_back(id);
        }
    }

    /// Load the word at the front of the queue from the store and show it
    fn present_front(&mut self) -> Result<(), SessionError> {
        while let Some(&id) = self.queue.front() {
            match self.store.word(id)? {
                Some(word) if self.settings.kind.accepts(word.status) => {
                    self.enter(word);
                    return Ok(());
                }
                Some(word) => {
                    debug!("dropping word {} ({}) from the session", word.id, word.status);
                }
                None => warn!("word {id} is no longer in the store"),
            }
            self.queue.pop_front();
        }

        self.current = None;
        self.set_state(SessionState::Empty);
        Ok(())
    }

    fn enter(&mut self, word: Word) {
        self.attempts_remaining = self.settings.rules.max_attempts;
        self.substate = match word.status {
            WordStatus::InProgress => Substate::Answering {
                attempts_remaining: self.attempts_remaining,
                hint: self.hint_for(&word),
            },
            _ => Substate::Presenting,
        };
        self.current = Some(word);
        self.publish_active();
    }

    fn publish_active(&mut self) {
        if let Some(current) = &self.current {
            let state = SessionState::Active {
                current: current.clone(),
                queue_len: self.queue.len(),
                substate: self.substate.clone(),
            };
            self.set_state(state);
        }
    }

    fn fail(&mut self, err: SessionError) -> SessionError {
        self.set_state(SessionState::Error(err.to_string()));
        err
    }

    fn set_state(&mut self, state: SessionState) {
        self.subscribers
            .retain(|tx| tx.send(state.clone()).is_ok());
        self.state = state;
    }
}
