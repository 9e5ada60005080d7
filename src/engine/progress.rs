use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::store::kv::KeyValueStore;
use crate::store::schema::{
    REWARD_CORRECT_KEY, REWARD_KEYS, REWARD_SENTENCES_KEY, REWARD_TOTAL_KEY, REWARD_UNLOCKED_KEY,
};

/// Which counter a graded answer feeds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RewardKind {
    /// Quiz-style answers; feed the correct/total ratio.
    Continuous,
    /// Whole sentences built; feed a counter misses never touch.
    Discrete,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RewardThresholds {
    pub min_total: u32,
    pub min_accuracy: f64,
    pub min_discrete: u32,
}

impl Default for RewardThresholds {
    fn default() -> Self {
        Self {
            min_total: 10,
            min_accuracy: 0.70,
            min_discrete: 20,
        }
    }
}

impl RewardThresholds {
    pub fn is_met(&self, correct: u32, total: u32, discrete: u32) -> bool {
        let ratio_met = total >= self.min_total
            && total > 0
            && correct as f64 / total as f64 >= self.min_accuracy;
        ratio_met || discrete >= self.min_discrete
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RewardStats {
    pub correct: u32,
    pub total: u32,
    pub discrete: u32,
    pub unlocked: bool,
}

/// Tab-scoped answer counters and the one-way reward gate they open.
///
/// Backed by the session store so a reload within the same tab keeps them;
/// the in-memory copy wins if a write fails.
pub struct ProgressTracker {
    store: Rc<dyn KeyValueStore>,
    thresholds: RewardThresholds,
    stats: RewardStats,
}

impl ProgressTracker {
    pub fn open(store: Rc<dyn KeyValueStore>, thresholds: RewardThresholds) -> Self {
        let read = |key: &str| -> u32 {
            store
                .get(key)
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(0)
        };
        let stats = RewardStats {
            correct: read(REWARD_CORRECT_KEY),
            total: read(REWARD_TOTAL_KEY),
            discrete: read(REWARD_SENTENCES_KEY),
            unlocked: store.get(REWARD_UNLOCKED_KEY).as_deref() == Some("1"),
        };
        Self {
            store,
            thresholds,
            stats,
        }
    }

    pub fn record_correct(&mut self, kind: RewardKind) {
        match kind {
            RewardKind::Discrete => {
                self.stats.discrete += 1;
                self.write(REWARD_SENTENCES_KEY, self.stats.discrete);
            }
            RewardKind::Continuous => {
                self.stats.correct += 1;
                self.stats.total += 1;
                self.write(REWARD_CORRECT_KEY, self.stats.correct);
                self.write(REWARD_TOTAL_KEY, self.stats.total);
            }
        }
        self.check_unlock();
    }

    pub fn record_wrong(&mut self, kind: RewardKind) {
        if kind == RewardKind::Continuous {
            self.stats.total += 1;
            self.write(REWARD_TOTAL_KEY, self.stats.total);
        }
    }

    pub fn is_unlocked(&mut self) -> bool {
        self.check_unlock();
        self.stats.unlocked
    }

    pub fn stats(&mut self) -> RewardStats {
        self.check_unlock();
        self.stats
    }

    /// Forget every counter, as closing the tab would.
    pub fn reset(&mut self) {
        self.stats = RewardStats::default();
        for key in REWARD_KEYS {
            if let Err(e) = self.store.remove(key) {
                tracing::warn!(key, error = %e, "could not clear reward counter");
            }
        }
    }

    fn check_unlock(&mut self) {
        if self.stats.unlocked {
            return;
        }
        let RewardStats {
            correct,
            total,
            discrete,
            ..
        } = self.stats;
        if self.thresholds.is_met(correct, total, discrete) {
            self.stats.unlocked = true;
            tracing::info!(correct, total, discrete, "reward unlocked");
            if let Err(e) = self.store.set(REWARD_UNLOCKED_KEY, "1") {
                tracing::warn!(error = %e, "could not persist reward unlock");
            }
        }
    }

    fn write(&self, key: &str, value: u32) {
        if let Err(e) = self.store.set(key, &value.to_string()) {
            tracing::warn!(key, error = %e, "could not persist reward counter");
        }
    }
}
