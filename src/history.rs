use std::collections::BTreeSet;

use chrono::{DateTime, Local, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::word::{WordId, WordStatus};

/// One committed transition of a word, appended to the status event log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusChangeEvent {
    pub word_id: WordId,
    pub old_status: WordStatus,
    pub new_status: WordStatus,
    pub at: DateTime<Local>,
}

impl StatusChangeEvent {
    pub fn new(
        word_id: WordId,
        old_status: WordStatus,
        new_status: WordStatus,
        at: DateTime<Local>,
    ) -> Self {
        Self {
            word_id,
            old_status,
            new_status,
            at,
        }
    }

    /// Whether the event counts as learning activity for streaks: marking a
    /// word already known, memorizing it, or a successful review.
    pub fn is_learning_activity(&self) -> bool {
        match (self.old_status, self.new_status) {
            (WordStatus::New, WordStatus::AlreadyKnown) => true,
            (WordStatus::InProgress, WordStatus::Memorized) => true,
            (WordStatus::Memorized, WordStatus::Memorized)
            | (WordStatus::Memorized, WordStatus::Mastered)
            | (WordStatus::Mastered, WordStatus::Mastered) => true,
            _ => false,
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.at.date_naive()
    }
}

/// Local dates with at least one qualifying event
pub fn activity_days<'a>(events: impl IntoIterator<Item = &'a StatusChangeEvent>) -> BTreeSet<NaiveDate> {
    events
        .into_iter()
        .filter(|e| e.is_learning_activity())
        .map(StatusChangeEvent::date)
        .collect()
}
