use std::collections::HashSet;
use std::rc::Rc;

use crate::prompt::Prompt;
use crate::session::Outcome;
use crate::store::kv::{KeyValueStore, load_json, save_json};
use crate::store::schema::PRACTICE_LIST_KEY;

/// What reconciling one graded outcome did to the practice list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Reconciled {
    Added,
    /// Mastered while practicing the list itself; the caller must also drop
    /// the prompt from its running queue.
    Mastered,
    Unchanged,
}

/// Cross-session set of missed prompts, keyed by natural key.
///
/// The in-memory list is authoritative: a failed write is logged and the
/// session carries on.
pub struct PracticeListStore {
    store: Rc<dyn KeyValueStore>,
    entries: Vec<Prompt>,
}

impl PracticeListStore {
    pub fn open(store: Rc<dyn KeyValueStore>) -> Self {
        let stored: Vec<Prompt> = load_json(store.as_ref(), PRACTICE_LIST_KEY).unwrap_or_default();
        let mut seen = HashSet::new();
        let entries = stored
            .into_iter()
            .filter(|p| seen.insert(p.key()))
            .collect();
        Self { store, entries }
    }

    pub fn contains(&self, prompt: &Prompt) -> bool {
        self.entries.iter().any(|p| p.same_key(prompt))
    }

    /// Returns true if the prompt was not already present.
    pub fn add(&mut self, prompt: &Prompt) -> bool {
        if self.contains(prompt) {
            return false;
        }
        self.entries.push(prompt.clone());
        self.persist();
        true
    }

    /// Returns true if the prompt was present.
    pub fn remove(&mut self, prompt: &Prompt) -> bool {
        let before = self.entries.len();
        self.entries.retain(|p| !p.same_key(prompt));
        if self.entries.len() == before {
            return false;
        }
        self.persist();
        true
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        if let Err(e) = self.store.remove(PRACTICE_LIST_KEY) {
            tracing::warn!(error = %e, "could not clear practice list");
        }
    }

    pub fn entries(&self) -> &[Prompt] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Apply the practice-list policy to a graded prompt. Misses are always
    /// remembered; a correct answer only clears the prompt when the session is
    /// drilling the practice list.
    pub fn reconcile(&mut self, prompt: &Prompt, outcome: Outcome, from_practice: bool) -> Reconciled {
        match outcome {
            Outcome::Wrong if self.add(prompt) => Reconciled::Added,
            Outcome::Correct if from_practice => {
                self.remove(prompt);
                Reconciled::Mastered
            }
            _ => Reconciled::Unchanged,
        }
    }

    fn persist(&self) {
        if let Err(e) = save_json(self.store.as_ref(), PRACTICE_LIST_KEY, &self.entries) {
            tracing::warn!(error = %e, entries = self.entries.len(), "could not save practice list");
        }
    }
}
