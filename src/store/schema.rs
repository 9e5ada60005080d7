//! Storage keys. These are part of the persisted format: renaming one orphans
//! whatever learners already have stored under it.

/// JSON array of prompts the learner has missed.
pub const PRACTICE_LIST_KEY: &str = "tapvocab_practice";

/// Coin balance as a decimal string.
pub const COINS_KEY: &str = "tapvocab_coins";

/// JSON object mapping a sentence's source text to whether it is enabled.
pub const ENABLED_SENTENCES_KEY: &str = "enabledSentences";

/// Tab-scoped reward counters.
pub const REWARD_CORRECT_KEY: &str = "reward_correct";
pub const REWARD_TOTAL_KEY: &str = "reward_total";
pub const REWARD_SENTENCES_KEY: &str = "reward_sentences";
pub const REWARD_UNLOCKED_KEY: &str = "reward_unlocked";

pub const REWARD_KEYS: &[&str] = &[
    REWARD_CORRECT_KEY,
    REWARD_TOTAL_KEY,
    REWARD_SENTENCES_KEY,
    REWARD_UNLOCKED_KEY,
];
