use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::engine::progress::RewardThresholds;
use crate::prompt::source::EMBEDDED_PREFIX;
use crate::session::controller::SessionTimings;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_auto_advance_ms")]
    pub auto_advance_ms: u64,
    #[serde(default = "default_reveal_delay_ms")]
    pub reveal_delay_ms: u64,
    #[serde(default = "default_reward_min_total")]
    pub reward_min_total: u32,
    #[serde(default = "default_reward_min_accuracy")]
    pub reward_min_accuracy: f64,
    #[serde(default = "default_reward_min_sentences")]
    pub reward_min_sentences: u32,
    #[serde(default = "default_coins_per_game")]
    pub coins_per_game: u64,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_words_path")]
    pub words_path: String,
    #[serde(default = "default_verbs_path")]
    pub verbs_path: String,
    #[serde(default = "default_cloze_path")]
    pub cloze_path: String,
    #[serde(default = "default_shuffle")]
    pub shuffle: bool,
}

fn default_auto_advance_ms() -> u64 {
    1500
}
fn default_reveal_delay_ms() -> u64 {
    1200
}
fn default_reward_min_total() -> u32 {
    10
}
fn default_reward_min_accuracy() -> f64 {
    0.70
}
fn default_reward_min_sentences() -> u32 {
    20
}
fn default_coins_per_game() -> u64 {
    10
}
fn default_data_dir() -> String {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tapvocab")
        .to_string_lossy()
        .to_string()
}
fn default_words_path() -> String {
    format!("{EMBEDDED_PREFIX}words.tsv")
}
fn default_verbs_path() -> String {
    format!("{EMBEDDED_PREFIX}verbs.tsv")
}
fn default_cloze_path() -> String {
    format!("{EMBEDDED_PREFIX}fill-in-blank.tsv")
}
fn default_shuffle() -> bool {
    true
}

const MAX_DELAY_MS: u64 = 60_000;

impl Default for Config {
    fn default() -> Self {
        Self {
            auto_advance_ms: default_auto_advance_ms(),
            reveal_delay_ms: default_reveal_delay_ms(),
            reward_min_total: default_reward_min_total(),
            reward_min_accuracy: default_reward_min_accuracy(),
            reward_min_sentences: default_reward_min_sentences(),
            coins_per_game: default_coins_per_game(),
            data_dir: default_data_dir(),
            words_path: default_words_path(),
            verbs_path: default_verbs_path(),
            cloze_path: default_cloze_path(),
            shuffle: default_shuffle(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = fs::read_to_string(path)?;
            let mut config: Config = toml::from_str(&content)?;
            config.validate();
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tapvocab")
            .join("config.toml")
    }

    /// Pull hand-edited values back into range.
    pub fn validate(&mut self) {
        self.auto_advance_ms = self.auto_advance_ms.min(MAX_DELAY_MS);
        self.reveal_delay_ms = self.reveal_delay_ms.min(MAX_DELAY_MS);
        if !self.reward_min_accuracy.is_finite() {
            self.reward_min_accuracy = default_reward_min_accuracy();
        }
        self.reward_min_accuracy = self.reward_min_accuracy.clamp(0.0, 1.0);
        if self.data_dir.trim().is_empty() {
            self.data_dir = default_data_dir();
        }
        for (path, default) in [
            (&mut self.words_path, default_words_path as fn() -> String),
            (&mut self.verbs_path, default_verbs_path),
            (&mut self.cloze_path, default_cloze_path),
        ] {
            if path.trim().is_empty() {
                *path = default();
            }
        }
    }

    pub fn thresholds(&self) -> RewardThresholds {
        RewardThresholds {
            min_total: self.reward_min_total,
            min_accuracy: self.reward_min_accuracy,
            min_discrete: self.reward_min_sentences,
        }
    }

    pub fn timings(&self) -> SessionTimings {
        SessionTimings {
            auto_advance: Duration::from_millis(self.auto_advance_ms),
            reveal_delay: Duration::from_millis(self.reveal_delay_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_serde_defaults_from_empty() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.auto_advance_ms, 1500);
        assert_eq!(config.reveal_delay_ms, 1200);
        assert_eq!(config.coins_per_game, 10);
        assert!(config.shuffle);
        assert_eq!(config.words_path, "embedded:words.tsv");
        assert!(config.data_dir.contains("tapvocab"));
    }

    #[test]
    fn test_config_partial_file_keeps_other_defaults() {
        let toml_str = r#"
auto_advance_ms = 800
words_path = "/tmp/my-words.tsv"
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.auto_advance_ms, 800);
        assert_eq!(config.words_path, "/tmp/my-words.tsv");
        assert_eq!(config.reward_min_total, 10);
        assert_eq!(config.verbs_path, "embedded:verbs.tsv");
    }

    #[test]
    fn test_validate_clamps_out_of_range() {
        let mut config = Config {
            auto_advance_ms: 10_000_000,
            reward_min_accuracy: 7.5,
            words_path: "  ".to_string(),
            ..Config::default()
        };
        config.validate();
        assert_eq!(config.auto_advance_ms, MAX_DELAY_MS);
        assert_eq!(config.reward_min_accuracy, 1.0);
        assert_eq!(config.words_path, default_words_path());
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let config = Config {
            reveal_delay_ms: 300,
            shuffle: false,
            ..Config::default()
        };
        config.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_from(&dir.path().join("none.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_thresholds_and_timings_follow_fields() {
        let config = Config {
            reward_min_total: 4,
            auto_advance_ms: 250,
            ..Config::default()
        };
        assert_eq!(config.thresholds().min_total, 4);
        assert_eq!(config.timings().auto_advance, Duration::from_millis(250));
    }
}
