use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputResult {
    Continue,
    Submit,
    Cancel,
}

/// Single-line answer editor. Tab completes the line from the tiles or
/// choices currently on screen.
#[derive(Debug, Default)]
pub struct LineInput {
    text: String,
    /// Cursor position as a char index (0 = before first char).
    cursor: usize,
    candidates: Vec<String>,
    completions: Vec<String>,
    completion_index: Option<usize>,
}

impl LineInput {
    pub fn value(&self) -> &str {
        &self.text
    }

    /// Hand out the submitted line and start a fresh one.
    pub fn take(&mut self) -> String {
        self.reset_completion();
        self.cursor = 0;
        std::mem::take(&mut self.text)
    }

    /// Words Tab cycles through. Replacing them keeps a running cycle going.
    pub fn set_candidates(&mut self, candidates: Vec<String>) {
        self.candidates = candidates;
    }

    /// Returns (before_cursor, cursor_char, after_cursor) for styled rendering.
    /// When cursor is at end of text, cursor_char is None.
    pub fn render_parts(&self) -> (&str, Option<char>, &str) {
        let byte_offset = self.char_to_byte(self.cursor);
        match self.text[byte_offset..].chars().next() {
            Some(ch) => (
                &self.text[..byte_offset],
                Some(ch),
                &self.text[byte_offset + ch.len_utf8()..],
            ),
            None => (&self.text, None, ""),
        }
    }

    pub fn handle(&mut self, key: KeyEvent) -> InputResult {
        match key.code {
            KeyCode::Esc => return InputResult::Cancel,
            KeyCode::Enter => return InputResult::Submit,

            KeyCode::Left => {
                self.reset_completion();
                self.cursor = self.cursor.saturating_sub(1);
            }
            KeyCode::Right => {
                self.reset_completion();
                if self.cursor < self.len() {
                    self.cursor += 1;
                }
            }
            KeyCode::Home => {
                self.reset_completion();
                self.cursor = 0;
            }
            KeyCode::End => {
                self.reset_completion();
                self.cursor = self.len();
            }
            KeyCode::Backspace => {
                self.reset_completion();
                if self.cursor > 0 {
                    self.remove_chars(self.cursor - 1, self.cursor);
                    self.cursor -= 1;
                }
            }
            KeyCode::Delete => {
                self.reset_completion();
                if self.cursor < self.len() {
                    self.remove_chars(self.cursor, self.cursor + 1);
                }
            }
            KeyCode::Tab => self.tab_complete(true),
            KeyCode::BackTab => self.tab_complete(false),
            KeyCode::Char('a') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.reset_completion();
                self.cursor = 0;
            }
            KeyCode::Char('e') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.reset_completion();
                self.cursor = self.len();
            }
            KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.reset_completion();
                self.text.clear();
                self.cursor = 0;
            }
            KeyCode::Char('w') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.reset_completion();
                self.delete_word_back();
            }
            KeyCode::Char(ch) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.reset_completion();
                let byte_offset = self.char_to_byte(self.cursor);
                self.text.insert(byte_offset, ch);
                self.cursor += 1;
            }
            _ => {}
        }
        InputResult::Continue
    }

    fn len(&self) -> usize {
        self.text.chars().count()
    }

    /// Convert char index to byte offset.
    fn char_to_byte(&self, char_idx: usize) -> usize {
        self.text
            .char_indices()
            .nth(char_idx)
            .map(|(b, _)| b)
            .unwrap_or(self.text.len())
    }

    fn remove_chars(&mut self, from: usize, to: usize) {
        let start = self.char_to_byte(from);
        let end = self.char_to_byte(to);
        self.text.replace_range(start..end, "");
    }

    /// Delete word before cursor (unix-word-rubout: skip whitespace, then non-whitespace).
    fn delete_word_back(&mut self) {
        let chars: Vec<char> = self.text.chars().collect();
        let mut pos = self.cursor;
        while pos > 0 && chars[pos - 1].is_whitespace() {
            pos -= 1;
        }
        while pos > 0 && !chars[pos - 1].is_whitespace() {
            pos -= 1;
        }
        self.remove_chars(pos, self.cursor);
        self.cursor = pos;
    }

    fn reset_completion(&mut self) {
        self.completions.clear();
        self.completion_index = None;
    }

    fn tab_complete(&mut self, forward: bool) {
        // Only at the end of the line
        if self.cursor < self.len() {
            return;
        }

        let Some(idx) = self.completion_index else {
            let seed = self.text.to_lowercase();
            self.completions = self
                .candidates
                .iter()
                .filter(|c| c.to_lowercase().starts_with(&seed))
                .cloned()
                .collect();
            if !self.completions.is_empty() {
                self.apply_completion(0);
            }
            return;
        };

        let count = self.completions.len();
        let next = if forward {
            (idx + 1) % count
        } else {
            (idx + count - 1) % count
        };
        self.apply_completion(next);
    }

    fn apply_completion(&mut self, idx: usize) {
        self.completion_index = Some(idx);
        self.text = self.completions[idx].clone();
        self.cursor = self.len();
    }
}
