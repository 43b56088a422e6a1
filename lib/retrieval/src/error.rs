//! Error types for the retrieval crate.

use std::fmt;

/// Errors from document search operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchError {
    /// The search backend could not be reached.
    Unavailable { reason: String },
    /// The query was rejected.
    InvalidQuery { reason: String },
    /// The corpus could not be loaded.
    CorpusLoadFailed { path: String, reason: String },
}

impl fmt::Display for SearchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable { reason } => write!(f, "document search unavailable: {reason}"),
            Self::InvalidQuery { reason } => write!(f, "invalid search query: {reason}"),
            Self::CorpusLoadFailed { path, reason } => {
                write!(f, "failed to load corpus from {path}: {reason}")
            }
        }
    }
}

impl std::error::Error for SearchError {}
