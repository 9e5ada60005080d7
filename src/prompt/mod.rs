pub mod filter;
pub mod source;

use icu_normalizer::ComposingNormalizerBorrowed;
use serde::{Deserialize, Serialize};

/// Marker for the gap in a cloze sentence.
pub const BLANK: &str = "___";

/// One learning item. Immutable once loaded; identity is its [`PromptKey`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prompt {
    #[serde(default)]
    pub category: String,
    /// Text shown to the learner (their own language).
    #[serde(alias = "de")]
    pub source: String,
    /// Text the learner reconstructs.
    #[serde(alias = "es")]
    pub target: String,
    /// Ordered verb forms for conjugation tables.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub forms: Vec<String>,
    /// Target sentence with the answer replaced by [`BLANK`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloze: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub distractors: Vec<String>,
}

/// Natural key of a prompt. Persisted practice lists are matched on this, so
/// it must stay derived from the prompt's own text.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PromptKey {
    pub source: String,
    pub target: String,
}

impl Prompt {
    pub fn word(category: &str, source: &str, target: &str) -> Self {
        Self {
            category: category.to_string(),
            source: source.to_string(),
            target: target.to_string(),
            forms: Vec::new(),
            cloze: None,
            distractors: Vec::new(),
        }
    }

    pub fn verb(source: &str, infinitive: &str, forms: Vec<String>) -> Self {
        Self {
            category: "verbs".to_string(),
            forms,
            ..Self::word("", source, infinitive)
        }
    }

    pub fn cloze(
        category: &str,
        source: &str,
        with_blank: &str,
        answer: &str,
        wrong: Vec<String>,
    ) -> Self {
        Self {
            cloze: Some(with_blank.to_string()),
            distractors: wrong,
            ..Self::word(category, source, answer)
        }
    }

    pub fn key(&self) -> PromptKey {
        PromptKey {
            source: self.source.clone(),
            target: self.target.clone(),
        }
    }

    pub fn same_key(&self, other: &Prompt) -> bool {
        self.source == other.source && self.target == other.target
    }

    /// Cloze text split around the blank, or the whole target if there is none.
    pub fn cloze_parts(&self) -> Vec<&str> {
        match &self.cloze {
            Some(text) => text.split(BLANK).collect(),
            None => vec![self.target.as_str()],
        }
    }
}

/// Trim and NFC-normalize, so composed and decomposed accents compare equal.
pub fn normalize(text: &str) -> String {
    let nfc = ComposingNormalizerBorrowed::new_nfc();
    nfc.normalize(text.trim()).into_owned()
}
