use std::time::{Duration, Instant};

use rand::Rng;
use rand::seq::SliceRandom;

use crate::error::SessionError;
use crate::prompt::Prompt;
use crate::session::ExerciseKind;

/// Result of one discrete input event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    /// Accepted, more input needed.
    Partial,
    /// Accepted, the prompt is solved.
    Final,
    Rejected,
}

/// How a target is cut into tokens for tap-to-build exercises.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Segmentation {
    Words,
    Letters,
    /// The prompt's verb forms, one per pronoun.
    Forms,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tile {
    pub text: String,
    pub used: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Slot {
    /// Separator that is part of the answer but never takes input.
    Fixed(String),
    Open {
        expected: String,
        /// Index of the tile placed here.
        tile: Option<usize>,
    },
}

/// Tap tiles from a scrambled bank to rebuild the target left to right.
///
/// Each tap is checked against the token expected at the next open slot,
/// never searched for elsewhere in the target.
#[derive(Clone, Debug)]
pub struct OrderedToken {
    segmentation: Segmentation,
    slots: Vec<Slot>,
    tiles: Vec<Tile>,
    target: String,
}

impl OrderedToken {
    pub fn new<R: Rng + ?Sized>(prompt: &Prompt, segmentation: Segmentation, rng: &mut R) -> Self {
        let (slots, target) = match segmentation {
            Segmentation::Words => {
                let tokens: Vec<&str> = prompt.target.split_whitespace().collect();
                (open_slots(tokens.iter().copied()), tokens.join(" "))
            }
            Segmentation::Forms => (
                open_slots(prompt.forms.iter().map(String::as_str)),
                prompt.forms.join(" "),
            ),
            Segmentation::Letters => {
                let slots = prompt
                    .target
                    .chars()
                    .map(|ch| {
                        if ch.is_whitespace() {
                            Slot::Fixed(ch.to_string())
                        } else {
                            Slot::Open {
                                expected: ch.to_string(),
                                tile: None,
                            }
                        }
                    })
                    .collect();
                (slots, prompt.target.clone())
            }
        };

        let mut tiles: Vec<Tile> = slots
            .iter()
            .filter_map(|s| match s {
                Slot::Open { expected, .. } => Some(Tile {
                    text: expected.clone(),
                    used: false,
                }),
                Slot::Fixed(_) => None,
            })
            .collect();
        tiles.shuffle(rng);

        Self {
            segmentation,
            slots,
            tiles,
            target,
        }
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    fn next_open(&self) -> Option<usize> {
        self.slots
            .iter()
            .position(|s| matches!(s, Slot::Open { tile: None, .. }))
    }

    pub fn expected_next(&self) -> Option<&str> {
        self.next_open().and_then(|i| match &self.slots[i] {
            Slot::Open { expected, .. } => Some(expected.as_str()),
            Slot::Fixed(_) => None,
        })
    }

    pub fn filled_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|s| matches!(s, Slot::Open { tile: Some(_), .. }))
            .count()
    }

    pub fn is_complete(&self) -> bool {
        self.next_open().is_none()
    }

    /// Text built so far, separators included.
    pub fn reconstruction(&self) -> String {
        let parts = self.slots.iter().filter_map(|s| match s {
            Slot::Fixed(text) => Some(text.as_str()),
            Slot::Open { tile: Some(t), .. } => Some(self.tiles[*t].text.as_str()),
            Slot::Open { tile: None, .. } => None,
        });
        match self.segmentation {
            Segmentation::Letters => parts.collect(),
            Segmentation::Words | Segmentation::Forms => parts.collect::<Vec<_>>().join(" "),
        }
    }

    pub fn tap(&mut self, tile: usize) -> Result<Verdict, SessionError> {
        let tapped = self.tiles.get(tile).ok_or(SessionError::OutOfRange(tile))?;
        if tapped.used {
            return Err(SessionError::TileUsed(tile));
        }
        let slot = self.next_open().ok_or(SessionError::SlotsFull)?;
        let Slot::Open { expected, tile: placed } = &mut self.slots[slot] else {
            return Err(SessionError::SlotsFull);
        };
        if tapped.text != *expected {
            return Ok(Verdict::Rejected);
        }
        *placed = Some(tile);
        self.tiles[tile].used = true;

        if !self.is_complete() {
            return Ok(Verdict::Partial);
        }
        let built = self.reconstruction();
        if built == self.target {
            Ok(Verdict::Final)
        } else {
            tracing::warn!(built = %built, target = %self.target, "validation mismatch");
            Ok(Verdict::Rejected)
        }
    }

    /// Tap by tile text. With duplicate tiles the first free one is used.
    pub fn tap_text(&mut self, text: &str) -> Result<Verdict, SessionError> {
        let tile = self
            .tiles
            .iter()
            .position(|t| !t.used && t.text == text)
            .ok_or_else(|| SessionError::UnknownTile(text.to_string()))?;
        self.tap(tile)
    }

    /// Take back the token in `slot` and every token placed after it.
    /// Returns how many tokens went back to the bank.
    pub fn remove_from(&mut self, slot: usize) -> Result<usize, SessionError> {
        match self.slots.get(slot) {
            Some(Slot::Open { tile: Some(_), .. }) => {}
            _ => return Err(SessionError::OutOfRange(slot)),
        }
        let mut removed = 0;
        for s in &mut self.slots[slot..] {
            if let Slot::Open { tile, .. } = s
                && let Some(t) = tile.take()
            {
                self.tiles[t].used = false;
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Like [`remove_from`](Self::remove_from), but `open` counts only the
    /// slots that take input, the way the learner sees them numbered.
    pub fn remove_open(&mut self, open: usize) -> Result<usize, SessionError> {
        let slot = self
            .slots
            .iter()
            .enumerate()
            .filter(|(_, s)| matches!(s, Slot::Open { .. }))
            .nth(open)
            .map(|(i, _)| i)
            .ok_or(SessionError::OutOfRange(open))?;
        self.remove_from(slot).map_err(|_| SessionError::OutOfRange(open))
    }
}

fn open_slots<'a>(tokens: impl Iterator<Item = &'a str>) -> Vec<Slot> {
    tokens
        .map(|t| Slot::Open {
            expected: t.to_string(),
            tile: None,
        })
        .collect()
}

/// Pick one answer out of several candidates.
#[derive(Clone, Debug)]
pub struct AtomicChoice {
    answer: String,
    choices: Vec<String>,
    ruled_out: Vec<bool>,
    solved: bool,
}

impl AtomicChoice {
    pub fn new<R: Rng + ?Sized>(answer: &str, distractors: &[String], rng: &mut R) -> Self {
        let mut choices = vec![answer.to_string()];
        for d in distractors {
            if !choices.contains(d) {
                choices.push(d.clone());
            }
        }
        choices.shuffle(rng);
        let ruled_out = vec![false; choices.len()];
        Self {
            answer: answer.to_string(),
            choices,
            ruled_out,
            solved: false,
        }
    }

    pub fn choices(&self) -> &[String] {
        &self.choices
    }

    pub fn is_ruled_out(&self, index: usize) -> bool {
        self.ruled_out.get(index).copied().unwrap_or(false)
    }

    pub fn is_solved(&self) -> bool {
        self.solved
    }

    pub fn choose(&mut self, choice: &str) -> Result<Verdict, SessionError> {
        let index = self
            .choices
            .iter()
            .position(|c| c == choice)
            .ok_or_else(|| SessionError::UnknownChoice(choice.to_string()))?;
        self.choose_index(index)
    }

    pub fn choose_index(&mut self, index: usize) -> Result<Verdict, SessionError> {
        if self.solved {
            return Err(SessionError::AlreadyAnswered);
        }
        let choice = self.choices.get(index).ok_or(SessionError::OutOfRange(index))?;
        if self.ruled_out[index] {
            return Err(SessionError::ChoiceDisabled(choice.clone()));
        }
        if *choice == self.answer {
            self.solved = true;
            Ok(Verdict::Final)
        } else {
            self.ruled_out[index] = true;
            Ok(Verdict::Rejected)
        }
    }
}

/// Flashcard: the learner grades themselves once the answer is visible.
#[derive(Clone, Debug)]
pub struct SelfReport {
    shown_at: Instant,
    min_delay: Duration,
    revealed: bool,
    answered: bool,
}

impl SelfReport {
    pub fn new(shown_at: Instant, min_delay: Duration) -> Self {
        Self {
            shown_at,
            min_delay,
            revealed: false,
            answered: false,
        }
    }

    pub fn is_revealed(&self) -> bool {
        self.revealed
    }

    pub fn reveal(&mut self, now: Instant) -> Result<(), SessionError> {
        let waited = now.saturating_duration_since(self.shown_at);
        if waited < self.min_delay {
            return Err(SessionError::RevealTooEarly(self.min_delay - waited));
        }
        self.revealed = true;
        Ok(())
    }

    /// Accept the learner's own grade. Trusted as given.
    pub fn declare(&mut self, correct: bool) -> Result<Verdict, SessionError> {
        if !self.revealed {
            return Err(SessionError::NotRevealed);
        }
        if self.answered {
            return Err(SessionError::AlreadyAnswered);
        }
        self.answered = true;
        Ok(if correct {
            Verdict::Final
        } else {
            Verdict::Rejected
        })
    }
}

#[derive(Clone, Debug)]
pub enum Validator {
    OrderedToken(OrderedToken),
    AtomicChoice(AtomicChoice),
    SelfReport(SelfReport),
}

impl Validator {
    /// Fresh validator for one attempt at `prompt`. `fallback_choices` feeds
    /// multiple choice when the prompt carries no distractors of its own.
    pub fn build<R: Rng + ?Sized>(
        kind: ExerciseKind,
        prompt: &Prompt,
        fallback_choices: &[String],
        now: Instant,
        reveal_delay: Duration,
        rng: &mut R,
    ) -> Self {
        match kind {
            ExerciseKind::Sentences => {
                Validator::OrderedToken(OrderedToken::new(prompt, Segmentation::Words, rng))
            }
            ExerciseKind::Spelling => {
                Validator::OrderedToken(OrderedToken::new(prompt, Segmentation::Letters, rng))
            }
            ExerciseKind::Conjugation => {
                Validator::OrderedToken(OrderedToken::new(prompt, Segmentation::Forms, rng))
            }
            ExerciseKind::FillBlank | ExerciseKind::MultipleChoice => {
                let distractors = if prompt.distractors.is_empty() {
                    fallback_choices
                } else {
                    &prompt.distractors
                };
                Validator::AtomicChoice(AtomicChoice::new(&prompt.target, distractors, rng))
            }
            ExerciseKind::Flashcards => Validator::SelfReport(SelfReport::new(now, reveal_delay)),
        }
    }

    /// Whether any verdict, not only `Final`, ends the attempt.
    pub fn ends_on_any_verdict(&self) -> bool {
        matches!(self, Validator::SelfReport(_))
    }
}
