use crate::prompt::Prompt;

/// Selects which prompts of a pool take part in a session.
#[derive(Clone, Debug, Default)]
pub struct PromptFilter {
    pub category: Option<String>,
}

impl PromptFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn category(name: &str) -> Self {
        Self {
            category: Some(name.to_string()),
        }
    }

    pub fn is_allowed(&self, prompt: &Prompt) -> bool {
        self.category
            .as_ref()
            .is_none_or(|cat| prompt.category.eq_ignore_ascii_case(cat))
    }
}

/// A target counts as a sentence when it ends in terminal punctuation, but an
/// ellipsis does not.
pub fn is_sentence(prompt: &Prompt) -> bool {
    let s = prompt.target.trim();
    s.ends_with(['.', '?', '!']) && !s.ends_with("..")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentence_detection() {
        assert!(is_sentence(&Prompt::word("s", "a", "Me gusta el café.")));
        assert!(is_sentence(&Prompt::word("s", "a", "¿Dónde está?")));
        assert!(is_sentence(&Prompt::word("s", "a", "¡Hola!")));
        assert!(!is_sentence(&Prompt::word("s", "a", "y entonces..")));
        assert!(!is_sentence(&Prompt::word("s", "a", "rojo")));
    }

    #[test]
    fn test_category_is_case_insensitive() {
        let filter = PromptFilter::category("Colors");
        assert!(filter.is_allowed(&Prompt::word("colors", "rot", "rojo")));
        assert!(!filter.is_allowed(&Prompt::word("food", "Brot", "pan")));
    }

    #[test]
    fn test_default_allows_everything() {
        assert!(PromptFilter::all().is_allowed(&Prompt::word("", "x", "y")));
    }
}
