//! Task orchestrator.
//!
//! The orchestrator runs a task:
//! 1. Decompose the task description into its ordered steps
//! 2. Look up the assistant registered for each step's type
//! 3. Run the steps one after another; the first failure aborts the task
//! 4. Persist the full ordered result list once every step succeeded
//!
//! There is no task-level retry and no partial persistence.

use crate::assistant::StepAssistant;
use crate::error::{OrchestratorError, StepExecutionError};
use crate::memory::MemoryRepository;
use crate::step::{Step, StepResult, StepType, TaskDescription};
use std::collections::HashMap;
use std::sync::Arc;
use steward_core::TaskId;
use tracing::{debug, info, instrument, warn};

/// Dispatches task steps to step assistants.
pub struct TaskOrchestrator {
    assistants: HashMap<StepType, Arc<StepAssistant>>,
    memory: Arc<dyn MemoryRepository>,
}

impl TaskOrchestrator {
    /// Creates an orchestrator with no assistants.
    #[must_use]
    pub fn new(memory: Arc<dyn MemoryRepository>) -> Self {
        Self {
            assistants: HashMap::new(),
            memory,
        }
    }

    /// Registers an assistant under its step type, replacing any earlier one.
    #[must_use]
    pub fn with_assistant(mut self, assistant: StepAssistant) -> Self {
        self.register(assistant);
        self
    }

    /// Registers an assistant under its step type, replacing any earlier one.
    pub fn register(&mut self, assistant: StepAssistant) {
        self.assistants
            .insert(assistant.step_type().clone(), Arc::new(assistant));
    }

    /// Returns whether an assistant is registered for the step type.
    #[must_use]
    pub fn has_assistant(&self, step_type: &StepType) -> bool {
        self.assistants.contains_key(step_type)
    }

    /// Returns the memory repository results are persisted to.
    #[must_use]
    pub fn memory(&self) -> &Arc<dyn MemoryRepository> {
        &self.memory
    }

    /// Returns the task's steps in execution order.
    #[must_use]
    pub fn decompose_task(&self, task: &TaskDescription) -> Vec<Step> {
        task.steps.clone()
    }

    /// Runs every step of the task and persists the results.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::Step`] as soon as a step has no assistant
    /// or its assistant gives up; later steps are not run and nothing is
    /// persisted. Returns [`OrchestratorError::Persistence`] if the results
    /// could not be stored.
    #[instrument(skip(self, task), fields(task_id = %task_id, steps = task.steps.len()))]
    pub async fn execute_task(
        &self,
        task_id: TaskId,
        task: &TaskDescription,
    ) -> Result<Vec<StepResult>, OrchestratorError> {
        let steps = self.decompose_task(task);
        let mut results = Vec::with_capacity(steps.len());

        for (index, step) in steps.iter().enumerate() {
            let assistant = self.assistants.get(&step.step_type).ok_or_else(|| {
                warn!(step = index + 1, step_type = %step.step_type, "no assistant for step");
                StepExecutionError::NoAssistant {
                    step_type: step.step_type.clone(),
                }
            })?;

            debug!(step = index + 1, step_type = %step.step_type, "executing step");
            let outcome = assistant.execute_step(step).await.inspect_err(|e| {
                warn!(step = index + 1, error = %e, "step failed, aborting task");
            })?;

            results.push(StepResult {
                step_type: step.step_type.clone(),
                result: outcome.result,
                attempts: outcome.attempts,
            });
        }

        self.memory.store_task_result(task_id, &results).await?;
        info!(steps = results.len(), "task completed");

        Ok(results)
    }
}

impl std::fmt::Debug for TaskOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut step_types: Vec<&StepType> = self.assistants.keys().collect();
        step_types.sort();
        f.debug_struct("TaskOrchestrator")
            .field("assistants", &step_types)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assistant::tests::{Behavior, ScriptedStrategy};
    use crate::error::MemoryError;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Memory repository that records every store call.
    #[derive(Default)]
    struct RecordingMemory {
        stored: Mutex<Vec<(TaskId, Vec<StepResult>)>>,
        fail: bool,
    }

    impl RecordingMemory {
        fn calls(&self) -> Vec<(TaskId, Vec<StepResult>)> {
            self.stored.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl MemoryRepository for RecordingMemory {
        async fn store_task_result(
            &self,
            task_id: TaskId,
            results: &[StepResult],
        ) -> Result<(), MemoryError> {
            if self.fail {
                return Err(MemoryError::StoreFailed {
                    task_id,
                    reason: "disk full".to_string(),
                });
            }
            self.stored.lock().unwrap().push((task_id, results.to_vec()));
            Ok(())
        }

        async fn task_result(
            &self,
            task_id: TaskId,
        ) -> Result<Option<Vec<StepResult>>, MemoryError> {
            Ok(self
                .calls()
                .into_iter()
                .find(|(id, _)| *id == task_id)
                .map(|(_, results)| results))
        }
    }

    fn assistant(step_type: &str, behavior: Behavior) -> (StepAssistant, Arc<AtomicUsize>) {
        let (strategy, calls) = ScriptedStrategy::new("scripted", behavior);
        (
            StepAssistant::new(StepType::new(step_type)).with_strategy(strategy),
            calls,
        )
    }

    fn task(step_types: &[&str]) -> TaskDescription {
        step_types
            .iter()
            .fold(TaskDescription::new("test task"), |task, t| {
                task.with_step(Step::new(StepType::new(*t)))
            })
    }

    #[tokio::test]
    async fn empty_task_persists_empty_results() {
        let memory = Arc::new(RecordingMemory::default());
        let orchestrator = TaskOrchestrator::new(memory.clone());
        let task_id = TaskId::new();

        let results = orchestrator
            .execute_task(task_id, &TaskDescription::new("nothing"))
            .await
            .unwrap();

        assert!(results.is_empty());
        assert_eq!(memory.calls(), vec![(task_id, Vec::new())]);
    }

    #[tokio::test]
    async fn runs_steps_in_order_and_persists_all() {
        let memory = Arc::new(RecordingMemory::default());
        let (first, _) = assistant("first", Behavior::Valid);
        let (second, _) = assistant("second", Behavior::Valid);
        let orchestrator = TaskOrchestrator::new(memory.clone())
            .with_assistant(first)
            .with_assistant(second);
        let task_id = TaskId::new();

        let results = orchestrator
            .execute_task(task_id, &task(&["second", "first", "second"]))
            .await
            .unwrap();

        let types: Vec<&str> = results.iter().map(|r| r.step_type.as_str()).collect();
        assert_eq!(types, vec!["second", "first", "second"]);
        assert_eq!(memory.calls().len(), 1);
        assert_eq!(memory.calls()[0].1, results);
    }

    #[tokio::test]
    async fn failing_middle_step_aborts_before_last() {
        let memory = Arc::new(RecordingMemory::default());
        let (ok, ok_calls) = assistant("ok", Behavior::Valid);
        let (bad, bad_calls) = assistant("bad", Behavior::Invalid);
        let (last, last_calls) = assistant("last", Behavior::Valid);
        let orchestrator = TaskOrchestrator::new(memory.clone())
            .with_assistant(ok)
            .with_assistant(bad)
            .with_assistant(last);

        let err = orchestrator
            .execute_task(TaskId::new(), &task(&["ok", "bad", "last"]))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            OrchestratorError::Step(StepExecutionError::AttemptsExhausted { .. })
        ));
        assert_eq!(ok_calls.load(Ordering::SeqCst), 1);
        assert_eq!(bad_calls.load(Ordering::SeqCst), 3);
        assert_eq!(last_calls.load(Ordering::SeqCst), 0);
        assert!(memory.calls().is_empty());
    }

    #[tokio::test]
    async fn unknown_step_type_fails_without_persisting() {
        let memory = Arc::new(RecordingMemory::default());
        let (ok, ok_calls) = assistant("ok", Behavior::Valid);
        let orchestrator = TaskOrchestrator::new(memory.clone()).with_assistant(ok);

        let err = orchestrator
            .execute_task(TaskId::new(), &task(&["ok", "teleport"]))
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "No assistant for step type 'teleport'");
        assert_eq!(ok_calls.load(Ordering::SeqCst), 1);
        assert!(memory.calls().is_empty());
    }

    #[tokio::test]
    async fn persistence_failure_is_reported_separately() {
        let memory = Arc::new(RecordingMemory {
            fail: true,
            ..RecordingMemory::default()
        });
        let (ok, _) = assistant("ok", Behavior::Valid);
        let orchestrator = TaskOrchestrator::new(memory).with_assistant(ok);

        let err = orchestrator
            .execute_task(TaskId::new(), &task(&["ok"]))
            .await
            .unwrap_err();

        assert!(matches!(err, OrchestratorError::Persistence(_)));
    }

    #[tokio::test]
    async fn registering_same_type_replaces_assistant() {
        let memory = Arc::new(RecordingMemory::default());
        let (bad, bad_calls) = assistant("dup", Behavior::Invalid);
        let (good, good_calls) = assistant("dup", Behavior::Valid);
        let orchestrator = TaskOrchestrator::new(memory)
            .with_assistant(bad)
            .with_assistant(good);

        orchestrator
            .execute_task(TaskId::new(), &task(&["dup"]))
            .await
            .unwrap();

        assert_eq!(bad_calls.load(Ordering::SeqCst), 0);
        assert_eq!(good_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn decompose_passes_steps_through() {
        let orchestrator = TaskOrchestrator::new(Arc::new(RecordingMemory::default()));
        let task = task(&["a", "b"]);
        assert_eq!(orchestrator.decompose_task(&task), task.steps);
    }
}
