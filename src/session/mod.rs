pub mod controller;
pub mod deferred;
pub mod presenter;
pub mod queue;
pub mod result;
pub mod validator;

use std::fmt;
use std::str::FromStr;

use crate::engine::progress::RewardKind;
use crate::prompt::Prompt;
use crate::prompt::filter::is_sentence;

/// Graded result of one attempt at a prompt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Correct,
    Wrong,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ExerciseKind {
    /// Assemble a sentence from scrambled words.
    Sentences,
    /// Fill a conjugation table in pronoun order.
    Conjugation,
    /// Spell a word letter by letter.
    Spelling,
    /// Pick the word that completes a sentence.
    FillBlank,
    /// Pick the translation of a word.
    MultipleChoice,
    /// Reveal the answer and grade yourself.
    Flashcards,
}

impl ExerciseKind {
    pub const ALL: &[ExerciseKind] = &[
        ExerciseKind::Sentences,
        ExerciseKind::Conjugation,
        ExerciseKind::Spelling,
        ExerciseKind::FillBlank,
        ExerciseKind::MultipleChoice,
        ExerciseKind::Flashcards,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ExerciseKind::Sentences => "sentences",
            ExerciseKind::Conjugation => "conjugation",
            ExerciseKind::Spelling => "spelling",
            ExerciseKind::FillBlank => "fill-blank",
            ExerciseKind::MultipleChoice => "choice",
            ExerciseKind::Flashcards => "flashcards",
        }
    }

    pub fn reward_kind(self) -> RewardKind {
        match self {
            ExerciseKind::Sentences => RewardKind::Discrete,
            _ => RewardKind::Continuous,
        }
    }

    /// Whether a prompt has the shape this exercise needs. Matters when
    /// drilling the practice list, which mixes prompts from every exercise.
    pub fn accepts(self, prompt: &Prompt) -> bool {
        match self {
            ExerciseKind::Sentences => {
                prompt.forms.is_empty() && prompt.cloze.is_none() && is_sentence(prompt)
            }
            ExerciseKind::Conjugation => !prompt.forms.is_empty(),
            ExerciseKind::FillBlank => prompt.cloze.is_some(),
            ExerciseKind::Spelling | ExerciseKind::MultipleChoice => {
                prompt.forms.is_empty() && prompt.cloze.is_none() && !is_sentence(prompt)
            }
            ExerciseKind::Flashcards => prompt.forms.is_empty() && prompt.cloze.is_none(),
        }
    }
}

impl fmt::Display for ExerciseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExerciseKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ExerciseKind::ALL
            .iter()
            .copied()
            .find(|k| k.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                let names: Vec<&str> = ExerciseKind::ALL.iter().map(|k| k.as_str()).collect();
                format!("unknown exercise '{s}' (expected one of: {})", names.join(", "))
            })
    }
}
