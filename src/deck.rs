//! Starter decks bundled into the binary, and CSV import/export.

use std::collections::HashSet;
use std::io::{Read, Write};

use chrono::{DateTime, Local};
use include_dir::{include_dir, Dir};
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::store::{StorageError, StorageResult, WordStore};
use crate::word::Word;

static DECK_DIR: Dir = include_dir!("$CARGO_MANIFEST_DIR/src/decks");

/// Separator between category names in the CSV `category` column
const CATEGORY_SEPARATOR: &str = "|";

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct Deck {
    pub name: String,
    #[serde(default)]
    pub icon: Option<String>,
    pub words: Vec<DeckWord>,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct DeckWord {
    pub value: String,
    pub translation: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub inserted: usize,
    pub skipped: usize,
}

#[derive(Deserialize, Serialize, Debug)]
struct CsvRow {
    value: String,
    translation: String,
    #[serde(default)]
    category: Option<String>,
}

/// Names of the bundled decks, sorted
pub fn bundled_names() -> Vec<String> {
    let mut names: Vec<String> = DECK_DIR
        .files()
        .filter_map(|f| f.path().file_stem())
        .filter_map(|stem| stem.to_str())
        .map(str::to_string)
        .collect();
    names.sort();
    names
}

pub fn bundled(name: &str) -> StorageResult<Deck> {
    let file = DECK_DIR
        .get_file(format!("{name}.json"))
        .ok_or_else(|| StorageError::NotFound(format!("deck {name}")))?;
    let deck = serde_json::from_slice(file.contents())?;
    Ok(deck)
}

/// Tracks (value, translation) pairs already in the store
struct Dedup(HashSet<(String, String)>);

impl Dedup {
    fn load<S: WordStore + ?Sized>(store: &S) -> StorageResult<Self> {
        Ok(Self(
            store
                .all_words()?
                .into_iter()
                .map(|w| (w.value, w.translation))
                .collect(),
        ))
    }

    /// True when the pair was not seen before
    fn insert(&mut self, value: &str, translation: &str) -> bool {
        self.0.insert((value.to_string(), translation.to_string()))
    }
}

/// Add a deck's words under a category named after the deck. Pairs already
/// in the store are skipped.
pub fn seed<S: WordStore + ?Sized>(
    store: &S,
    deck: &Deck,
    now: DateTime<Local>,
) -> StorageResult<ImportReport> {
    let category = store.ensure_category(&deck.name, deck.icon.as_deref())?;
    let mut seen = Dedup::load(store)?;
    let mut report = ImportReport::default();

    for entry in &deck.words {
        if !seen.insert(&entry.value, &entry.translation) {
            report.skipped += 1;
            continue;
        }
        let id = store.insert_word(&Word::new(&entry.value, &entry.translation, now))?;
        store.link_word(id, category)?;
        report.inserted += 1;
    }

    info!(
        "seeded deck {:?}: {} inserted, {} skipped",
        deck.name, report.inserted, report.skipped
    );
    Ok(report)
}

/// Import `value,translation,category` rows. `default_category` applies to
/// rows without a category of their own.
pub fn import_csv<S: WordStore + ?Sized, R: Read>(
    store: &S,
    reader: R,
    default_category: Option<&str>,
    now: DateTime<Local>,
) -> StorageResult<ImportReport> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let mut seen = Dedup::load(store)?;
    let mut report = ImportReport::default();

    for (line, row) in rdr.deserialize::<CsvRow>().enumerate() {
        let row = row?;
        if row.value.is_empty() || row.translation.is_empty() {
            warn!("import: skipping row {} with an empty field", line + 2);
            report.skipped += 1;
            continue;
        }
        if !seen.insert(&row.value, &row.translation) {
            report.skipped += 1;
            continue;
        }

        let id = store.insert_word(&Word::new(&row.value, &row.translation, now))?;
        let categories = row
            .category
            .as_deref()
            .filter(|c| !c.is_empty())
            .or(default_category);
        if let Some(categories) = categories {
            for name in categories.split(CATEGORY_SEPARATOR).map(str::trim) {
                if name.is_empty() {
                    continue;
                }
                let category = store.ensure_category(name, None)?;
                store.link_word(id, category)?;
            }
        }
        report.inserted += 1;
    }

    info!(
        "imported {} words, skipped {}",
        report.inserted, report.skipped
    );
    Ok(report)
}

/// Write every word as a CSV row. Returns the number of rows written.
pub fn export_csv<S: WordStore + ?Sized, W: Write>(store: &S, writer: W) -> StorageResult<usize> {
    let mut wtr = csv::Writer::from_writer(writer);
    let words = store.all_words()?;

    for word in &words {
        let categories = store.categories_of_word(word.id)?;
        let category = (!categories.is_empty()).then(|| {
            categories
                .iter()
                .map(|c| c.name.as_str())
                .collect::<Vec<_>>()
                .join(CATEGORY_SEPARATOR)
        });
        wtr.serialize(CsvRow {
            value: word.value.clone(),
            translation: word.translation.clone(),
            category,
        })?;
    }

    wtr.flush()?;
    Ok(words.len())
}
