use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Row id of a word in the store
pub type WordId = i64;

/// Learning status of a word.
///
/// `New` and `AlreadyKnown` are entry points, `InProgress -> Memorized` is the
/// learning path and `Memorized` cycles toward `Mastered` through reviews.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    strum_macros::Display,
    strum_macros::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum WordStatus {
    New,
    InProgress,
    Memorized,
    AlreadyKnown,
    Mastered,
}

impl WordStatus {
    pub const ALL: [WordStatus; 5] = [
        WordStatus::New,
        WordStatus::InProgress,
        WordStatus::Memorized,
        WordStatus::AlreadyKnown,
        WordStatus::Mastered,
    ];

    /// Statuses that appear in daily statistics buckets
    pub const TRACKED: [WordStatus; 4] = [
        WordStatus::AlreadyKnown,
        WordStatus::InProgress,
        WordStatus::Memorized,
        WordStatus::Mastered,
    ];

    /// Parse the snake_case form used in the database
    pub fn from_db(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.as_ref() == s)
    }

    /// Any status other than `New`
    pub fn is_settled(self) -> bool {
        self != WordStatus::New
    }

    /// Statuses eligible for review cycling
    pub fn is_reviewable(self) -> bool {
        matches!(self, WordStatus::Memorized | WordStatus::Mastered)
    }

    pub fn label(self) -> &'static str {
        match self {
            WordStatus::New => "New",
            WordStatus::InProgress => "In progress",
            WordStatus::Memorized => "Memorized",
            WordStatus::AlreadyKnown => "Already known",
            WordStatus::Mastered => "Mastered",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Word {
    pub id: WordId,
    pub value: String,
    pub translation: String,
    pub status: WordStatus,
    pub repetition_count: u32,
    pub status_changed_at: Option<DateTime<Local>>,
    pub repeated_at: Option<DateTime<Local>>,
    pub created_at: DateTime<Local>,
}

impl Word {
    /// A fresh, not yet stored word. The id is assigned on insert.
    pub fn new(value: impl Into<String>, translation: impl Into<String>, now: DateTime<Local>) -> Self {
        Self {
            id: 0,
            value: value.into(),
            translation: translation.into(),
            status: WordStatus::New,
            repetition_count: 0,
            status_changed_at: None,
            repeated_at: None,
            created_at: now,
        }
    }

    /// Timestamp of the latest status change or review, whichever is later
    pub fn last_activity(&self) -> Option<DateTime<Local>> {
        match (self.status_changed_at, self.repeated_at) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        }
    }
}
