//! Error types for the conversation crate.
//!
//! - `StoreError`: errors from conversation store operations
//! - `ConciergeError`: a routed workflow failed (never leaves the concierge;
//!   `handle_message` turns it into a degraded response)

use std::fmt;
use steward_ai::LlmError;
use steward_retrieval::SearchError;
use steward_task::OrchestratorError;

/// Errors from conversation store operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The store could not be read or written.
    StorageFailed { reason: String },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StorageFailed { reason } => {
                write!(f, "conversation storage failed: {reason}")
            }
        }
    }
}

impl std::error::Error for StoreError {}

/// Errors from a routed workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConciergeError {
    /// Document search failed.
    Search(SearchError),
    /// The language model failed.
    Llm(LlmError),
    /// The task could not be run.
    Task(OrchestratorError),
    /// The model returned nothing usable.
    EmptyReply,
    /// The task ran but produced no subtasks.
    EmptyPlan,
}

impl fmt::Display for ConciergeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Search(e) => write!(f, "{e}"),
            Self::Llm(e) => write!(f, "{e}"),
            Self::Task(e) => write!(f, "{e}"),
            Self::EmptyReply => write!(f, "language model returned an empty reply"),
            Self::EmptyPlan => write!(f, "task decomposition produced no subtasks"),
        }
    }
}

impl std::error::Error for ConciergeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Search(e) => Some(e),
            Self::Llm(e) => Some(e),
            Self::Task(e) => Some(e),
            Self::EmptyReply | Self::EmptyPlan => None,
        }
    }
}

impl From<SearchError> for ConciergeError {
    fn from(e: SearchError) -> Self {
        Self::Search(e)
    }
}

impl From<LlmError> for ConciergeError {
    fn from(e: LlmError) -> Self {
        Self::Llm(e)
    }
}

impl From<OrchestratorError> for ConciergeError {
    fn from(e: OrchestratorError) -> Self {
        Self::Task(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_error_display() {
        let err = StoreError::StorageFailed {
            reason: "lock poisoned".to_string(),
        };
        assert!(err.to_string().contains("lock poisoned"));
    }

    #[test]
    fn concierge_error_keeps_source() {
        let err = ConciergeError::from(LlmError::Timeout);
        assert_eq!(err.to_string(), "LLM request timed out");
        assert!(std::error::Error::source(&err).is_some());
        assert!(std::error::Error::source(&ConciergeError::EmptyPlan).is_none());
    }
}
