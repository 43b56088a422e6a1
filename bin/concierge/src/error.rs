//! Startup errors for the concierge binary.

use std::fmt;

/// Errors that stop the binary before it can serve input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartupError {
    /// Configuration could not be loaded.
    Config { reason: String },
    /// The language model backend rejected its settings.
    Llm { reason: String },
    /// The document corpus could not be loaded.
    Corpus { reason: String },
    /// Reading input failed.
    Input { reason: String },
}

impl fmt::Display for StartupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config { reason } => write!(f, "failed to load configuration: {reason}"),
            Self::Llm { reason } => write!(f, "failed to set up language model: {reason}"),
            Self::Corpus { reason } => write!(f, "failed to load document corpus: {reason}"),
            Self::Input { reason } => write!(f, "failed to read input: {reason}"),
        }
    }
}

impl std::error::Error for StartupError {}
