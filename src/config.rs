use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::answer_policy::AnswerPolicy;
use crate::progression::{ProgressionRules, DEFAULT_MASTERY_THRESHOLD, DEFAULT_MAX_ATTEMPTS};
use crate::session::{SessionKind, SessionSettings};

/// Ten years. Longer intervals are treated as this.
pub const MAX_REVIEW_INTERVAL_HOURS: u32 = 24 * 3650;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub max_attempts: u32,
    pub mastery_threshold: u32,
    pub batch_size: usize,
    pub review_interval_hours: u32,
    pub stats_window_days: u32,
    pub reveal_hints: bool,
    pub strict_answers: bool,
    pub shuffle_new_words: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            mastery_threshold: DEFAULT_MASTERY_THRESHOLD,
            batch_size: 10,
            review_interval_hours: 24,
            stats_window_days: 7,
            reveal_hints: true,
            strict_answers: false,
            shuffle_new_words: true,
        }
    }
}

impl Config {
    pub fn rules(&self) -> ProgressionRules {
        ProgressionRules {
            max_attempts: self.max_attempts.max(1),
            mastery_threshold: self.mastery_threshold,
        }
    }

    pub fn answer_policy(&self) -> AnswerPolicy {
        AnswerPolicy::new(self.strict_answers, self.reveal_hints)
    }

    pub fn review_interval(&self) -> chrono::Duration {
        chrono::Duration::hours(i64::from(
            self.review_interval_hours.min(MAX_REVIEW_INTERVAL_HOURS),
        ))
    }

    pub fn session_settings(&self, kind: SessionKind) -> SessionSettings {
        SessionSettings {
            kind,
            rules: self.rules(),
            policy: self.answer_policy(),
            batch_size: self.batch_size.max(1),
            review_interval: self.review_interval(),
            category: None,
            shuffle_new_words: self.shuffle_new_words,
        }
    }
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> std::io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let path = if let Some(pd) = ProjectDirs::from("", "", "wordflip") {
            pd.config_dir().join("config.json")
        } else {
            PathBuf::from("wordflip_config.json")
        };
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Config {
        match fs::read(&self.path) {
            Ok(bytes) => match serde_json::from_slice::<Config>(&bytes) {
                Ok(cfg) => cfg,
                Err(err) => {
                    log::warn!(
                        "ignoring unreadable config {}: {err}",
                        self.path.display()
                    );
                    Config::default()
                }
            },
            Err(_) => Config::default(),
        }
    }

    fn save(&self, cfg: &Config) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg)?;
        fs::write(&self.path, data)
    }
}
