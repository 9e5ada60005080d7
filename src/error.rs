use std::time::Duration;

use thiserror::Error;

/// Failures while fetching or parsing a prompt table.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to fetch {url}: {message}")]
    Network { url: String, message: String },

    #[error("no bundled data named {0}")]
    MissingEmbedded(String),

    #[error("{path} is missing required column '{column}'")]
    MissingColumn { path: String, column: &'static str },

    #[error("{path} is not valid UTF-8")]
    Encoding { path: String },

    #[error("no usable rows in {0}")]
    Empty(String),
}

/// Errors raised by the session engine. Only `EmptyQueue` needs to reach the
/// learner; the rest are ignorable for a UI.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("nothing available to practice")]
    EmptyQueue,

    #[error("nothing to go back to")]
    NoHistory,

    #[error("all prompts completed")]
    Completed,

    #[error("no session has been started")]
    NotStarted,

    #[error("waiting for the pending advance")]
    AwaitingAdvance,

    #[error("a deferred action is already armed")]
    AlreadyArmed,

    #[error("this exercise does not accept {0} input")]
    WrongInput(&'static str),

    #[error("no tile or filled slot at index {0}")]
    OutOfRange(usize),

    #[error("tile {0} is already placed")]
    TileUsed(usize),

    #[error("no free tile reads '{0}'")]
    UnknownTile(String),

    #[error("'{0}' is not one of the choices")]
    UnknownChoice(String),

    #[error("'{0}' was already ruled out")]
    ChoiceDisabled(String),

    #[error("every slot is filled; remove one first")]
    SlotsFull,

    #[error("this prompt has already been answered")]
    AlreadyAnswered,

    #[error("answer can be revealed in {}ms", .0.as_millis())]
    RevealTooEarly(Duration),

    #[error("reveal the answer before grading it")]
    NotRevealed,
}

/// Storage write failures. Callers on the interactive path log these and keep
/// going with their in-memory state.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("storage quota exceeded writing {key} ({needed} bytes, {available} available)")]
    QuotaExceeded {
        key: String,
        needed: usize,
        available: usize,
    },

    #[error("i/o error on {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode {key}: {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}
