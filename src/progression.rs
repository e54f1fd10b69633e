//! Word progression rules.
//!
//! [`apply`] maps a word's current status and a user action to the next
//! state of the word. It performs no I/O: the returned [`Transition`] is a
//! description that the session controller commits through the store.

use chrono::{DateTime, Local};
use thiserror::Error;

use crate::history::StatusChangeEvent;
use crate::word::{Word, WordStatus};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_MASTERY_THRESHOLD: u32 = 5;

/// User-facing gesture or typed-answer result
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum Action {
    MarkKnown,
    StartLearning,
    TypedAnswerCorrect,
    TypedAnswerIncorrect,
    ReviewCorrect,
    ReviewIncorrect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cannot apply {action} to a word in status {status}")]
pub struct InvalidTransition {
    pub status: WordStatus,
    pub action: Action,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressionRules {
    /// Typed-answer attempts per word before the answer is revealed
    pub max_attempts: u32,
    /// Repetition count a memorized word must have reached before a
    /// successful review promotes it to `Mastered`
    pub mastery_threshold: u32,
}

impl Default for ProgressionRules {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            mastery_threshold: DEFAULT_MASTERY_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    /// The word as it should be stored after the action
    pub word: Word,
    /// Event to append to the history, present whenever the word changed
    pub event: Option<StatusChangeEvent>,
    pub attempts_remaining: u32,
    /// Attempts are exhausted and the answer must be shown
    pub answer_revealed: bool,
}

impl Transition {
    pub fn needs_commit(&self) -> bool {
        self.event.is_some()
    }

    pub fn status(&self) -> WordStatus {
        self.word.status
    }

    fn unchanged(word: &Word, attempts_remaining: u32) -> Self {
        Self {
            word: word.clone(),
            event: None,
            attempts_remaining,
            answer_revealed: false,
        }
    }

    fn committed(before: &Word, after: Word, attempts_remaining: u32, now: DateTime<Local>) -> Self {
        let event = StatusChangeEvent::new(before.id, before.status, after.status, now);
        Self {
            word: after,
            event: Some(event),
            attempts_remaining,
            answer_revealed: false,
        }
    }
}

pub fn apply(
    word: &Word,
    action: Action,
    attempts_remaining: u32,
    rules: &ProgressionRules,
    now: DateTime<Local>,
) -> Result<Transition, InvalidTransition> {
    use Action::*;
    use WordStatus::*;

    let mut next = word.clone();

    match (word.status, action) {
        (New, MarkKnown) => {
            next.status = AlreadyKnown;
            next.status_changed_at = Some(now);
        }
        (New, StartLearning) => {
            next.status = InProgress;
            next.repetition_count = 0;
            next.status_changed_at = Some(now);
            return Ok(Transition::committed(word, next, rules.max_attempts, now));
        }
        (InProgress, TypedAnswerCorrect) => {
            next.status = Memorized;
            next.repetition_count += 1;
            next.status_changed_at = Some(now);
        }
        (InProgress, TypedAnswerIncorrect) => {
            let remaining = attempts_remaining.saturating_sub(1);
            let mut transition = Transition::unchanged(word, remaining);
            transition.answer_revealed = remaining == 0;
            return Ok(transition);
        }
        (Memorized, ReviewCorrect) => {
            let promote = word.repetition_count >= rules.mastery_threshold;
            next.repetition_count += 1;
            next.repeated_at = Some(now);
            if promote {
                next.status = Mastered;
                next.status_changed_at = Some(now);
            }
        }
        (Mastered, ReviewCorrect) => {
            next.repetition_count += 1;
            next.repeated_at = Some(now);
        }
        (Memorized, ReviewIncorrect) | (Mastered, ReviewIncorrect) => {
            next.status = InProgress;
            next.repetition_count = 0;
            next.repeated_at = None;
            next.status_changed_at = Some(now);
            return Ok(Transition::committed(word, next, rules.max_attempts, now));
        }
        (AlreadyKnown, ReviewCorrect) | (AlreadyKnown, ReviewIncorrect) => {
            return Ok(Transition::unchanged(word, attempts_remaining));
        }
        (status, action) => return Err(InvalidTransition { status, action }),
    }

    Ok(Transition::committed(word, next, attempts_remaining, now))
}
