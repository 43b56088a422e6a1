//! Task orchestration for steward.
//!
//! This crate provides the step-execution pipeline:
//!
//! - **Strategies**: pluggable `execute` + `validate` units of work
//! - **Step Assistant**: bounded retries over an ordered strategy list
//! - **Orchestrator**: runs a task's steps in order and persists the results
//! - **Memory Repository**: where completed task results are stored

pub mod assistant;
pub mod error;
pub mod memory;
pub mod orchestrator;
pub mod step;
pub mod strategies;
pub mod strategy;

pub use assistant::{AttemptLog, RetryConfig, StepAssistant, StepOutcome};
pub use error::{MemoryError, OrchestratorError, StepExecutionError, StrategyError};
pub use memory::{FileMemoryRepository, InMemoryMemoryRepository, MemoryRepository};
pub use orchestrator::TaskOrchestrator;
pub use step::{Step, StepData, StepResult, StepType, TaskDescription};
pub use strategies::{
    DocumentSearchStrategy, OutlineDecompositionStrategy, TaskDecompositionStrategy,
};
pub use strategy::StepStrategy;
