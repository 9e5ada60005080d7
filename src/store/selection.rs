use std::collections::BTreeMap;
use std::rc::Rc;

use crate::prompt::Prompt;
use crate::store::kv::{KeyValueStore, load_json, save_json};
use crate::store::schema::ENABLED_SENTENCES_KEY;

/// Learner's choice of which sentences to drill, keyed by source text.
/// Anything without an entry is enabled.
pub struct EnabledSelection {
    store: Rc<dyn KeyValueStore>,
    enabled: BTreeMap<String, bool>,
}

impl EnabledSelection {
    pub fn open(store: Rc<dyn KeyValueStore>) -> Self {
        let enabled = load_json(store.as_ref(), ENABLED_SENTENCES_KEY).unwrap_or_default();
        Self { store, enabled }
    }

    pub fn is_enabled(&self, prompt: &Prompt) -> bool {
        self.enabled.get(&prompt.source).copied().unwrap_or(true)
    }

    pub fn set(&mut self, prompt: &Prompt, on: bool) {
        self.enabled.insert(prompt.source.clone(), on);
    }

    pub fn set_all(&mut self, prompts: &[Prompt], on: bool) {
        for p in prompts {
            self.set(p, on);
        }
    }

    pub fn enabled_count(&self, prompts: &[Prompt]) -> usize {
        prompts.iter().filter(|p| self.is_enabled(p)).count()
    }

    pub fn save(&self) {
        if let Err(e) = save_json(self.store.as_ref(), ENABLED_SENTENCES_KEY, &self.enabled) {
            tracing::warn!(error = %e, "could not save enabled sentences");
        }
    }
}
