//! Word storage.
//!
//! [`WordStore`] is the only collaborator the progression core depends on.
//! [`SqliteStore`] implements it on a single SQLite connection guarded by a
//! mutex, so one store can be shared between the interactive session and
//! background workers.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Duration, Local, NaiveDate};
use log::debug;
use rusqlite::{params, Connection, OptionalExtension, Row};
use thiserror::Error;

use crate::app_dirs::AppDirs;
use crate::category::{Category, CategoryId};
use crate::history::StatusChangeEvent;
use crate::stats::{daily_status_counts, DailyCounts, DateWindow};
use crate::word::{Word, WordId, WordStatus};

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("failed to acquire database lock: {0}")]
    Lock(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Read/write access to words, categories, and the status event log
pub trait WordStore: Send + Sync {
    fn word(&self, id: WordId) -> StorageResult<Option<Word>>;

    fn all_words(&self) -> StorageResult<Vec<Word>>;

    fn find_words_by_status(&self, status: WordStatus) -> StorageResult<Vec<Word>>;

    /// Memorized or mastered words whose last activity is at least `interval`
    /// before `now`, least recently seen first
    fn find_words_due_for_review(
        &self,
        now: DateTime<Local>,
        interval: Duration,
        limit: usize,
    ) -> StorageResult<Vec<Word>>;

    fn find_word_to_review(
        &self,
        now: DateTime<Local>,
        interval: Duration,
    ) -> StorageResult<Option<Word>> {
        Ok(self
            .find_words_due_for_review(now, interval, 1)?
            .into_iter()
            .next())
    }

    fn insert_word(&self, word: &Word) -> StorageResult<WordId>;

    fn update_word(&self, word: &Word) -> StorageResult<()>;

    fn delete_word(&self, id: WordId) -> StorageResult<()>;

    /// Store the new word state and append its event as one unit
    fn commit_transition(&self, word: &Word, event: &StatusChangeEvent) -> StorageResult<()>;

    fn all_events(&self) -> StorageResult<Vec<StatusChangeEvent>>;

    fn events_between(&self, start: NaiveDate, end: NaiveDate) -> StorageResult<Vec<StatusChangeEvent>> {
        let window = DateWindow::range(start, end);
        Ok(self
            .all_events()?
            .into_iter()
            .filter(|e| window.contains(e.date()))
            .collect())
    }

    /// Per-day per-status counts between `start` and `end` inclusive
    fn count_words_by_status_in_window(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> StorageResult<Vec<DailyCounts>> {
        let words = self.all_words()?;
        Ok(daily_status_counts(&words, &DateWindow::range(start, end)))
    }

    fn insert_category(&self, category: &Category) -> StorageResult<CategoryId>;

    fn categories(&self) -> StorageResult<Vec<Category>>;

    fn category_by_name(&self, name: &str) -> StorageResult<Option<Category>>;

    /// Removes the category and its word links. Words are kept.
    fn delete_category(&self, id: CategoryId) -> StorageResult<()>;

    fn link_word(&self, word: WordId, category: CategoryId) -> StorageResult<()>;

    fn unlink_word(&self, word: WordId, category: CategoryId) -> StorageResult<()>;

    fn words_in_category(
        &self,
        category: CategoryId,
        status: Option<WordStatus>,
    ) -> StorageResult<Vec<Word>>;

    fn categories_of_word(&self, word: WordId) -> StorageResult<Vec<Category>>;

    /// Number of word links still pointing at `category`
    fn category_links_count(&self, category: CategoryId) -> StorageResult<usize>;

    fn ensure_category(&self, name: &str, icon: Option<&str>) -> StorageResult<CategoryId> {
        match self.category_by_name(name)? {
            Some(existing) => Ok(existing.id),
            None => self.insert_category(&Category::new(name, icon)),
        }
    }
}

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS words (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        value TEXT NOT NULL,
        translation TEXT NOT NULL,
        status TEXT NOT NULL DEFAULT 'new',
        repetition_count INTEGER NOT NULL DEFAULT 0 CHECK (repetition_count >= 0),
        status_changed_at TEXT,
        repeated_at TEXT,
        created_at TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_words_status ON words(status);

    CREATE TABLE IF NOT EXISTS categories (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE,
        icon TEXT
    );

    CREATE TABLE IF NOT EXISTS word_categories (
        word_id INTEGER NOT NULL REFERENCES words(id) ON DELETE CASCADE,
        category_id INTEGER NOT NULL REFERENCES categories(id) ON DELETE CASCADE,
        PRIMARY KEY (word_id, category_id)
    );

    CREATE INDEX IF NOT EXISTS idx_word_categories_category ON word_categories(category_id);

    CREATE TABLE IF NOT EXISTS status_events (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        word_id INTEGER NOT NULL,
        old_status TEXT NOT NULL,
        new_status TEXT NOT NULL,
        at TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_status_events_word ON status_events(word_id);
"#;

const WORD_COLUMNS: &str =
    "w.id, w.value, w.translation, w.status, w.repetition_count, w.status_changed_at, w.repeated_at, w.created_at";

/// SQLite-backed word store
#[derive(Debug)]
pub struct SqliteStore {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl SqliteStore {
    /// Open (or create) the database at `path` and apply the schema
    pub fn open<P: AsRef<Path>>(path: P) -> StorageResult<Self> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path.as_ref())?;
        conn.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA foreign_keys=ON;",
        )?;
        Self::init(conn, Some(path.as_ref().to_path_buf()))
    }

    /// Open the database under the user's state directory
    pub fn open_default() -> StorageResult<Self> {
        let path = AppDirs::db_path().unwrap_or_else(|| PathBuf::from("wordflip.db"));
        Self::open(path)
    }

    pub fn in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Self::init(conn, None)
    }

    fn init(conn: Connection, path: Option<PathBuf>) -> StorageResult<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
            path,
        })
    }

    /// Database file backing this store, `None` for in-memory stores
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn conn(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| StorageError::Lock(e.to_string()))
    }

    fn query_words(&self, sql: &str, params: impl rusqlite::Params) -> StorageResult<Vec<Word>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(sql)?;
        let words = stmt
            .query_map(params, word_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(words)
    }
}

fn parse_timestamp(idx: usize, value: Option<String>) -> rusqlite::Result<Option<DateTime<Local>>> {
    value
        .map(|s| {
            DateTime::parse_from_rfc3339(&s)
                .map(|dt| dt.with_timezone(&Local))
                .map_err(|_| {
                    rusqlite::Error::InvalidColumnType(idx, "timestamp".to_string(), rusqlite::types::Type::Text)
                })
        })
        .transpose()
}

fn parse_status(idx: usize, value: String) -> rusqlite::Result<WordStatus> {
    WordStatus::from_db(&value).ok_or_else(|| {
        rusqlite::Error::InvalidColumnType(idx, "status".to_string(), rusqlite::types::Type::Text)
    })
}

fn word_from_row(row: &Row) -> rusqlite::Result<Word> {
    let created_at = parse_timestamp(7, Some(row.get(7)?))?.unwrap_or_else(Local::now);
    Ok(Word {
        id: row.get(0)?,
        value: row.get(1)?,
        translation: row.get(2)?,
        status: parse_status(3, row.get(3)?)?,
        repetition_count: row.get(4)?,
        status_changed_at: parse_timestamp(5, row.get(5)?)?,
        repeated_at: parse_timestamp(6, row.get(6)?)?,
        created_at,
    })
}

fn category_from_row(row: &Row) -> rusqlite::Result<Category> {
    Ok(Category {
        id: row.get(0)?,
        name: row.get(1)?,
        icon: row.get(2)?,
    })
}

fn event_from_row(row: &Row) -> rusqlite::Result<StatusChangeEvent> {
    let at = parse_timestamp(3, Some(row.get(3)?))?.unwrap_or_else(Local::now);
    Ok(StatusChangeEvent {
        word_id: row.get(0)?,
        old_status: parse_status(1, row.get(1)?)?,
        new_status: parse_status(2, row.get(2)?)?,
        at,
    })
}

fn update_word_on(conn: &Connection, word: &Word) -> StorageResult<()> {
    let updated = conn.execute(
        r#"
        UPDATE words SET
            value = ?2,
            translation = ?3,
            status = ?4,
            repetition_count = ?5,
            status_changed_at = ?6,
            repeated_at = ?7
        WHERE id = ?1
        "#,
        params![
            word.id,
            word.value,
            word.translation,
            word.status.as_ref(),
            word.repetition_count,
            word.status_changed_at.map(|t| t.to_rfc3339()),
            word.repeated_at.map(|t| t.to_rfc3339()),
        ],
    )?;

    if updated == 0 {
        return Err(StorageError::NotFound(format!("word {}", word.id)));
    }
    Ok(())
}

impl WordStore for SqliteStore {
    fn word(&self, id: WordId) -> StorageResult<Option<Word>> {
        let conn = self.conn()?;
        let word = conn
            .query_row(
                &format!("SELECT {WORD_COLUMNS} FROM words w WHERE w.id = ?1"),
                [id],
                word_from_row,
            )
            .optional()?;
        Ok(word)
    }

    fn all_words(&self) -> StorageResult<Vec<Word>> {
        self.query_words(&format!("SELECT {WORD_COLUMNS} FROM words w ORDER BY w.id"), [])
    }

    fn find_words_by_status(&self, status: WordStatus) -> StorageResult<Vec<Word>> {
        self.query_words(
            &format!("SELECT {WORD_COLUMNS} FROM words w WHERE w.status = ?1 ORDER BY w.id"),
            [status.as_ref()],
        )
    }

    fn find_words_due_for_review(
        &self,
        now: DateTime<Local>,
        interval: Duration,
        limit: usize,
    ) -> StorageResult<Vec<Word>> {
        // Timestamps carry their UTC offset, so due-ness is decided here
        // rather than by comparing text in SQL.
        let Some(cutoff) = now.checked_sub_signed(interval) else {
            debug!("review interval {interval} reaches past the calendar, nothing is due");
            return Ok(Vec::new());
        };
        let mut due: Vec<Word> = self
            .query_words(
                &format!(
                    "SELECT {WORD_COLUMNS} FROM words w WHERE w.status IN (?1, ?2) ORDER BY w.id"
                ),
                [WordStatus::Memorized.as_ref(), WordStatus::Mastered.as_ref()],
            )?
            .into_iter()
            .filter(|w| w.last_activity().map_or(true, |t| t <= cutoff))
            .collect();

        due.sort_by_key(|w| w.last_activity());
        due.truncate(limit);
        Ok(due)
    }

    fn insert_word(&self, word: &Word) -> StorageResult<WordId> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO words
            (value, translation, status, repetition_count, status_changed_at, repeated_at, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                word.value,
                word.translation,
                word.status.as_ref(),
                word.repetition_count,
                word.status_changed_at.map(|t| t.to_rfc3339()),
                word.repeated_at.map(|t| t.to_rfc3339()),
                word.created_at.to_rfc3339(),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn update_word(&self, word: &Word) -> StorageResult<()> {
        let conn = self.conn()?;
        update_word_on(&conn, word)
    }

    fn delete_word(&self, id: WordId) -> StorageResult<()> {
        let conn = self.conn()?;
        conn.execute("DELETE FROM words WHERE id = ?1", [id])?;
        Ok(())
    }

    fn commit_transition(&self, word: &Word, event: &StatusChangeEvent) -> StorageResult<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        update_word_on(&tx, word)?;
        tx.execute(
            "INSERT INTO status_events (word_id, old_status, new_status, at) VALUES (?1, ?2, ?3, ?4)",
            params![
                event.word_id,
                event.old_status.as_ref(),
                event.new_status.as_ref(),
                event.at.to_rfc3339(),
            ],
        )?;

        tx.commit()?;
        debug!(
            "committed word {} {} -> {} (repetitions {})",
            word.id, event.old_status, event.new_status, word.repetition_count
        );
        Ok(())
    }

    fn all_events(&self) -> StorageResult<Vec<StatusChangeEvent>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT word_id, old_status, new_status, at FROM status_events ORDER BY id",
        )?;
        let events = stmt
            .query_map([], event_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(events)
    }

    fn insert_category(&self, category: &Category) -> StorageResult<CategoryId> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO categories (name, icon) VALUES (?1, ?2)",
            params![category.name, category.icon],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn categories(&self) -> StorageResult<Vec<Category>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT id, name, icon FROM categories ORDER BY name")?;
        let categories = stmt
            .query_map([], category_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(categories)
    }

    fn category_by_name(&self, name: &str) -> StorageResult<Option<Category>> {
        let conn = self.conn()?;
        let category = conn
            .query_row(
                "SELECT id, name, icon FROM categories WHERE name = ?1",
                [name],
                category_from_row,
            )
            .optional()?;
        Ok(category)
    }

    fn delete_category(&self, id: CategoryId) -> StorageResult<()> {
        let conn = self.conn()?;
        let deleted = conn.execute("DELETE FROM categories WHERE id = ?1", [id])?;
        if deleted == 0 {
            return Err(StorageError::NotFound(format!("category {id}")));
        }
        Ok(())
    }

    fn link_word(&self, word: WordId, category: CategoryId) -> StorageResult<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR IGNORE INTO word_categories (word_id, category_id) VALUES (?1, ?2)",
            [word, category],
        )?;
        Ok(())
    }

    fn unlink_word(&self, word: WordId, category: CategoryId) -> StorageResult<()> {
        let conn = self.conn()?;
        conn.execute(
            "DELETE FROM word_categories WHERE word_id = ?1 AND category_id = ?2",
            [word, category],
        )?;
        Ok(())
    }

    fn words_in_category(
        &self,
        category: CategoryId,
        status: Option<WordStatus>,
    ) -> StorageResult<Vec<Word>> {
        let base = format!(
            "SELECT {WORD_COLUMNS} FROM words w
             JOIN word_categories wc ON wc.word_id = w.id
             WHERE wc.category_id = ?1"
        );
        match status {
            Some(status) => self.query_words(
                &format!("{base} AND w.status = ?2 ORDER BY w.id"),
                params![category, status.as_ref()],
            ),
            None => self.query_words(&format!("{base} ORDER BY w.id"), [category]),
        }
    }

    fn categories_of_word(&self, word: WordId) -> StorageResult<Vec<Category>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT c.id, c.name, c.icon FROM categories c
             JOIN word_categories wc ON wc.category_id = c.id
             WHERE wc.word_id = ?1
             ORDER BY c.name",
        )?;
        let categories = stmt
            .query_map([word], category_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(categories)
    }

    fn category_links_count(&self, category: CategoryId) -> StorageResult<usize> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM word_categories WHERE category_id = ?1",
            [category],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}
