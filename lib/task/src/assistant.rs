//! Step assistants.
//!
//! An assistant owns the ordered strategies for one step type and runs the
//! retry loop:
//! 1. Try each strategy in order: execute, then validate
//! 2. The first result that validates wins immediately
//! 3. A failed execution is logged and the next strategy is tried
//! 4. If no strategy validates, start another attempt from the first strategy
//! 5. Give up after the attempt budget is spent
//!
//! Retries are immediate; there is no backoff.

use crate::error::StepExecutionError;
use crate::step::{Step, StepType};
use crate::strategy::StepStrategy;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Attempt budget used when nothing else is configured.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Record of a single strategy invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptLog {
    /// Attempt number (1-indexed) this invocation belongs to.
    pub attempt: u32,
    /// Name of the strategy that was invoked.
    pub strategy: String,
    /// Whether the result was accepted.
    pub success: bool,
    /// The strategy's result, when `execute` returned one.
    pub result: Option<JsonValue>,
    /// Error message, when `execute` failed.
    pub error: Option<String>,
    /// Latency in milliseconds.
    pub latency_ms: u64,
    /// When the invocation finished.
    pub timestamp: DateTime<Utc>,
}

impl AttemptLog {
    /// Creates a record for a result that passed validation.
    #[must_use]
    pub fn accepted(
        attempt: u32,
        strategy: impl Into<String>,
        result: JsonValue,
        latency_ms: u64,
    ) -> Self {
        Self {
            attempt,
            strategy: strategy.into(),
            success: true,
            result: Some(result),
            error: None,
            latency_ms,
            timestamp: Utc::now(),
        }
    }

    /// Creates a record for a result that failed validation.
    #[must_use]
    pub fn rejected(
        attempt: u32,
        strategy: impl Into<String>,
        result: JsonValue,
        latency_ms: u64,
    ) -> Self {
        Self {
            attempt,
            strategy: strategy.into(),
            success: false,
            result: Some(result),
            error: None,
            latency_ms,
            timestamp: Utc::now(),
        }
    }

    /// Creates a record for a failed execution.
    #[must_use]
    pub fn failed(
        attempt: u32,
        strategy: impl Into<String>,
        error: impl Into<String>,
        latency_ms: u64,
    ) -> Self {
        Self {
            attempt,
            strategy: strategy.into(),
            success: false,
            result: None,
            error: Some(error.into()),
            latency_ms,
            timestamp: Utc::now(),
        }
    }
}

/// A validated step result together with every invocation that led to it.
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutcome {
    /// The accepted result.
    pub result: JsonValue,
    /// One entry per strategy invocation, in order.
    pub attempts: Vec<AttemptLog>,
}

/// Attempt budgets, overridable per step type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Budget for step types without an override.
    #[serde(default = "default_max_attempts")]
    pub default_max_attempts: u32,
    /// Per-step-type overrides keyed by type tag.
    #[serde(default)]
    pub max_attempts: HashMap<String, u32>,
}

fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            default_max_attempts: default_max_attempts(),
            max_attempts: HashMap::new(),
        }
    }
}

impl RetryConfig {
    /// Returns the attempt budget for a step type.
    #[must_use]
    pub fn max_attempts_for(&self, step_type: &StepType) -> u32 {
        self.max_attempts
            .get(step_type.as_str())
            .copied()
            .unwrap_or(self.default_max_attempts)
    }
}

/// Runs the strategies registered for one step type.
#[derive(Clone)]
pub struct StepAssistant {
    step_type: StepType,
    strategies: Vec<Arc<dyn StepStrategy>>,
    max_attempts: u32,
}

impl StepAssistant {
    /// Creates an assistant with no strategies and the default budget.
    #[must_use]
    pub fn new(step_type: StepType) -> Self {
        Self {
            step_type,
            strategies: Vec::new(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// Appends a strategy; strategies are tried in the order added.
    #[must_use]
    pub fn with_strategy(self, strategy: impl StepStrategy + 'static) -> Self {
        self.with_shared_strategy(Arc::new(strategy))
    }

    /// Appends a strategy that is shared with other assistants.
    #[must_use]
    pub fn with_shared_strategy(mut self, strategy: Arc<dyn StepStrategy>) -> Self {
        self.strategies.push(strategy);
        self
    }

    /// Sets the attempt budget. Zero is treated as one.
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Applies the budget configured for this assistant's step type.
    #[must_use]
    pub fn with_retry_config(self, config: &RetryConfig) -> Self {
        let budget = config.max_attempts_for(&self.step_type);
        self.with_max_attempts(budget)
    }

    /// Returns the step type this assistant handles.
    #[must_use]
    pub fn step_type(&self) -> &StepType {
        &self.step_type
    }

    /// Returns the attempt budget.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Returns the number of registered strategies.
    #[must_use]
    pub fn strategy_count(&self) -> usize {
        self.strategies.len()
    }

    /// Produces a validated result for the step.
    ///
    /// # Errors
    ///
    /// Returns [`StepExecutionError::AttemptsExhausted`] when no strategy
    /// produced a valid result within the attempt budget.
    pub async fn execute_step(&self, step: &Step) -> Result<StepOutcome, StepExecutionError> {
        let mut attempts = Vec::new();

        for attempt in 1..=self.max_attempts {
            for strategy in &self.strategies {
                let started = Instant::now();
                let outcome = strategy.execute(&step.data).await;
                let latency_ms = started.elapsed().as_millis() as u64;

                match outcome {
                    Ok(result) if strategy.validate(&result) => {
                        debug!(
                            step_type = %self.step_type,
                            attempt,
                            strategy = strategy.name(),
                            "strategy result accepted"
                        );
                        attempts.push(AttemptLog::accepted(
                            attempt,
                            strategy.name(),
                            result.clone(),
                            latency_ms,
                        ));
                        return Ok(StepOutcome { result, attempts });
                    }
                    Ok(result) => {
                        debug!(
                            step_type = %self.step_type,
                            attempt,
                            strategy = strategy.name(),
                            "strategy result rejected by validation"
                        );
                        attempts.push(AttemptLog::rejected(
                            attempt,
                            strategy.name(),
                            result,
                            latency_ms,
                        ));
                    }
                    Err(report) => {
                        let message = report.current_context().to_string();
                        warn!(
                            step_type = %self.step_type,
                            attempt,
                            strategy = strategy.name(),
                            error = %message,
                            "strategy execution failed"
                        );
                        attempts.push(AttemptLog::failed(
                            attempt,
                            strategy.name(),
                            message,
                            latency_ms,
                        ));
                    }
                }
            }
        }

        warn!(
            step_type = %self.step_type,
            attempts = self.max_attempts,
            invocations = attempts.len(),
            "step attempts exhausted"
        );
        Err(StepExecutionError::AttemptsExhausted {
            step_type: self.step_type.clone(),
            attempts: self.max_attempts,
        })
    }
}

impl std::fmt::Debug for StepAssistant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepAssistant")
            .field("step_type", &self.step_type)
            .field(
                "strategies",
                &self.strategies.iter().map(|s| s.name()).collect::<Vec<_>>(),
            )
            .field("max_attempts", &self.max_attempts)
            .finish()
    }
}
