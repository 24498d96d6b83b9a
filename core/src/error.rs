//! Error taxonomy shared by every core component.
//!
//! The core never logs failures itself. Each variant carries enough context
//! (offending index, expected vs. actual counts, artifact path) for the
//! caller to report it.

use std::path::PathBuf;
use time::Date;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid hyperparameters or an unusable corpus. Fatal for the run.
    #[error("training failed: {0}")]
    Training(String),

    /// Corrupt or incompatible model artifact. Callers may retrain instead.
    #[error("cannot load model from {}: {reason}", path.display())]
    ModelLoad { path: PathBuf, reason: String },

    /// Parallel inputs disagree; signals upstream data corruption.
    #[error("input mismatch: {0}")]
    InputMismatch(#[from] Mismatch),

    /// Training was stopped through its cancel flag.
    #[error("training cancelled after {completed} of {requested} sweeps")]
    Cancelled { completed: usize, requested: usize },

    /// A user-supplied emoticon pattern failed to compile.
    #[error("invalid emoticon pattern {pattern:?}: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("cannot encode model: {0}")]
    Encode(#[from] bincode::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Only a failed artifact load can be recovered from (by retraining).
    #[inline]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::ModelLoad { .. })
    }

    pub(crate) fn model_load(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::ModelLoad { path: path.into(), reason: reason.to_string() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Mismatch {
    #[error("{assignments} topic assignments but {dates} dates")]
    Length { assignments: usize, dates: usize },

    #[error("document {index} is dated {date}, which is not on the calendar")]
    OutsideCalendar { index: usize, date: Date },

    #[error("document {index} is assigned topic {topic} but the model has {n_topics} topics")]
    TopicOutOfRange { index: usize, topic: usize, n_topics: usize },

    #[error("line {index} holds {value:?}, which is not a valid epoch-second timestamp")]
    Timestamp { index: usize, value: String },
}
