//! Error types for the task crate.
//!
//! - `StrategyError`: a single strategy invocation failed (carried in a
//!   rootcause `Report`, caught by the step assistant)
//! - `StepExecutionError`: a step could not produce a validated result
//! - `MemoryError`: persisting or loading task results failed
//! - `OrchestratorError`: a task run failed

use crate::step::StepType;
use steward_core::TaskId;
use std::fmt;

/// Errors from a single strategy invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StrategyError {
    /// The step data is missing a field or holds the wrong kind of value.
    InvalidInput { field: String, reason: String },
    /// A collaborator (search, language model) failed.
    CollaboratorFailed { collaborator: String, reason: String },
}

impl fmt::Display for StrategyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidInput { field, reason } => {
                write!(f, "invalid step input '{field}': {reason}")
            }
            Self::CollaboratorFailed {
                collaborator,
                reason,
            } => {
                write!(f, "{collaborator} failed: {reason}")
            }
        }
    }
}

impl std::error::Error for StrategyError {}

/// Errors that prevent a step from producing a result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepExecutionError {
    /// No step assistant is registered for the step's type.
    NoAssistant { step_type: StepType },
    /// Every attempt ran without a strategy producing a valid result.
    AttemptsExhausted { step_type: StepType, attempts: u32 },
}

impl StepExecutionError {
    /// Returns the type of the step that failed.
    #[must_use]
    pub fn step_type(&self) -> &StepType {
        match self {
            Self::NoAssistant { step_type } | Self::AttemptsExhausted { step_type, .. } => {
                step_type
            }
        }
    }
}

impl fmt::Display for StepExecutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoAssistant { step_type } => {
                write!(f, "No assistant for step type '{step_type}'")
            }
            Self::AttemptsExhausted {
                step_type,
                attempts,
            } => {
                write!(
                    f,
                    "Step '{step_type}' failed after {attempts} attempts without a valid result"
                )
            }
        }
    }
}

impl std::error::Error for StepExecutionError {}

/// Errors from memory repository operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemoryError {
    /// Writing results failed.
    StoreFailed { task_id: TaskId, reason: String },
    /// Reading results failed.
    LoadFailed { task_id: TaskId, reason: String },
}

impl fmt::Display for MemoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StoreFailed { task_id, reason } => {
                write!(f, "failed to store results for {task_id}: {reason}")
            }
            Self::LoadFailed { task_id, reason } => {
                write!(f, "failed to load results for {task_id}: {reason}")
            }
        }
    }
}

impl std::error::Error for MemoryError {}

/// Errors that can occur while running a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrchestratorError {
    /// A step failed; the remaining steps were not run.
    Step(StepExecutionError),
    /// All steps succeeded but the results could not be persisted.
    Persistence(MemoryError),
}

impl fmt::Display for OrchestratorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Step(e) => write!(f, "{e}"),
            Self::Persistence(e) => write!(f, "task results not persisted: {e}"),
        }
    }
}

impl std::error::Error for OrchestratorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Step(e) => Some(e),
            Self::Persistence(e) => Some(e),
        }
    }
}

impl From<StepExecutionError> for OrchestratorError {
    fn from(e: StepExecutionError) -> Self {
        Self::Step(e)
    }
}

impl From<MemoryError> for OrchestratorError {
    fn from(e: MemoryError) -> Self {
        Self::Persistence(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_assistant_message_names_step_type() {
        let err = StepExecutionError::NoAssistant {
            step_type: StepType::new("fax_machine"),
        };
        assert_eq!(err.to_string(), "No assistant for step type 'fax_machine'");
    }

    #[test]
    fn exhausted_message_names_step_type_and_attempts() {
        let err = StepExecutionError::AttemptsExhausted {
            step_type: StepType::document_search(),
            attempts: 3,
        };
        let message = err.to_string();
        assert!(message.contains("document_search"));
        assert!(message.contains("3 attempts"));
    }

    #[test]
    fn orchestrator_error_wraps_step_error() {
        let step = StepExecutionError::NoAssistant {
            step_type: StepType::new("x"),
        };
        let err = OrchestratorError::from(step.clone());
        assert_eq!(err, OrchestratorError::Step(step));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn strategy_error_display() {
        let err = StrategyError::CollaboratorFailed {
            collaborator: "document search".to_string(),
            reason: "timeout".to_string(),
        };
        assert_eq!(err.to_string(), "document search failed: timeout");
    }
}
