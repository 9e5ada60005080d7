use rand::Rng;
use rand::seq::SliceRandom;

use crate::error::SessionError;
use crate::prompt::Prompt;

/// What the cursor points at.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Current<'a> {
    Prompt(&'a Prompt),
    Completed,
}

impl<'a> Current<'a> {
    pub fn prompt(self) -> Option<&'a Prompt> {
        match self {
            Current::Prompt(p) => Some(p),
            Current::Completed => None,
        }
    }
}

/// Working set of prompts for one run.
///
/// The cursor ranges over `0..=len`; `len` means the run is complete. It only
/// moves backwards through [`SessionQueue::go_back`], which replays the history
/// stack one entry at a time.
#[derive(Clone, Debug)]
pub struct SessionQueue {
    prompts: Vec<Prompt>,
    cursor: usize,
    history: Vec<usize>,
}

impl SessionQueue {
    pub fn build<R: Rng + ?Sized>(
        mut prompts: Vec<Prompt>,
        shuffle: bool,
        rng: &mut R,
    ) -> Result<Self, SessionError> {
        if prompts.is_empty() {
            return Err(SessionError::EmptyQueue);
        }
        if shuffle {
            prompts.shuffle(rng);
        }
        Ok(Self {
            prompts,
            cursor: 0,
            history: Vec::new(),
        })
    }

    pub fn current(&self) -> Current<'_> {
        match self.prompts.get(self.cursor) {
            Some(p) => Current::Prompt(p),
            None => Current::Completed,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.cursor >= self.prompts.len()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.prompts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prompts.is_empty()
    }

    /// Prompts at and after the cursor.
    pub fn remaining(&self) -> &[Prompt] {
        &self.prompts[self.cursor.min(self.prompts.len())..]
    }

    pub fn can_go_back(&self) -> bool {
        !self.history.is_empty()
    }

    /// Move past the current prompt. Returns false once completed.
    pub fn advance(&mut self) -> bool {
        if self.is_completed() {
            return false;
        }
        self.history.push(self.cursor);
        self.cursor += 1;
        tracing::debug!(cursor = self.cursor, len = self.prompts.len(), "advanced");
        true
    }

    /// Learner skipped without answering. Same queue effect as `advance`.
    pub fn skip(&mut self) -> bool {
        self.advance()
    }

    /// Restore the cursor from before the most recent advance.
    pub fn go_back(&mut self) -> Result<usize, SessionError> {
        let previous = self.history.pop().ok_or(SessionError::NoHistory)?;
        self.cursor = previous;
        tracing::debug!(cursor = self.cursor, "went back");
        Ok(previous)
    }

    /// Splice the current prompt out of the run. The cursor stays put, so it
    /// now addresses the following prompt, or completion if none is left.
    ///
    /// History entries all lie below the cursor and remain valid.
    pub fn retire_current(&mut self) -> Option<Prompt> {
        if self.is_completed() {
            return None;
        }
        let retired = self.prompts.remove(self.cursor);
        tracing::debug!(remaining = self.remaining().len(), "retired prompt");
        Some(retired)
    }
}
