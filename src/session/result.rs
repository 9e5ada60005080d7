use serde::{Deserialize, Serialize};

/// Per-run counters. Unlike the reward counters these start over with every
/// queue rebuild.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunCounters {
    pub correct: usize,
    pub wrong: usize,
    pub skipped: usize,
}

/// Snapshot of a run for display.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub exercise: String,
    pub correct: usize,
    pub wrong: usize,
    pub skipped: usize,
    pub position: usize,
    pub total: usize,
    pub accuracy: f64,
    pub completion_percent: f64,
    pub completed: bool,
}

impl RunSummary {
    pub fn new(exercise: &str, counters: RunCounters, position: usize, total: usize) -> Self {
        let graded = counters.correct + counters.wrong;
        let accuracy = if graded > 0 {
            (counters.correct as f64 / graded as f64 * 100.0).clamp(0.0, 100.0)
        } else {
            100.0
        };
        let completion_percent = if total > 0 {
            (position as f64 / total as f64 * 100.0).clamp(0.0, 100.0)
        } else {
            100.0
        };
        Self {
            exercise: exercise.to_string(),
            correct: counters.correct,
            wrong: counters.wrong,
            skipped: counters.skipped,
            position,
            total,
            accuracy,
            completion_percent,
            completed: position >= total,
        }
    }

    /// "3 / 12" style progress badge; one-based while in progress.
    pub fn badge(&self) -> String {
        if self.completed {
            format!("{} / {}", self.total, self.total)
        } else {
            format!("{} / {}", self.position + 1, self.total)
        }
    }
}
