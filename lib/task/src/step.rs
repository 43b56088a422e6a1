//! Steps, task descriptions, and step results.

use crate::assistant::AttemptLog;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;

/// Free-form payload carried by a step.
pub type StepData = serde_json::Map<String, JsonValue>;

/// The type tag of a step, used to select its assistant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StepType(String);

impl StepType {
    /// Creates a step type from a tag.
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    /// Steps that query the document collection.
    #[must_use]
    pub fn document_search() -> Self {
        Self::new("document_search")
    }

    /// Steps that break a request into subtasks.
    #[must_use]
    pub fn task_decomposition() -> Self {
        Self::new("task_decomposition")
    }

    /// Returns the tag.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StepType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One unit of task work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    /// Selects the assistant that runs this step.
    #[serde(rename = "type")]
    pub step_type: StepType,
    /// Input for the step's strategies.
    #[serde(default)]
    pub data: StepData,
}

impl Step {
    /// Creates a step with no data.
    #[must_use]
    pub fn new(step_type: StepType) -> Self {
        Self {
            step_type,
            data: StepData::new(),
        }
    }

    /// Adds a data field.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }
}

/// A task as submitted to the orchestrator.
///
/// Steps are already structured; turning prose into steps is itself a step
/// (`task_decomposition`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskDescription {
    /// What the task is for.
    #[serde(default)]
    pub description: String,
    /// Ordered steps. Missing means none.
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl TaskDescription {
    /// Creates a task description.
    #[must_use]
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            steps: Vec::new(),
        }
    }

    /// Appends a step.
    #[must_use]
    pub fn with_step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }
}

/// The accepted output of one step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    /// Type of the step that produced this result.
    pub step_type: StepType,
    /// The validated strategy result.
    pub result: JsonValue,
    /// Every strategy invocation made for the step, in order.
    pub attempts: Vec<AttemptLog>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_uses_type_key_on_the_wire() {
        let step = Step::new(StepType::document_search()).with("query", "7(a) loan limits");
        let json = serde_json::to_value(&step).expect("serialize");

        assert_eq!(json["type"], "document_search");
        assert_eq!(json["data"]["query"], "7(a) loan limits");
    }

    #[test]
    fn task_without_steps_deserializes_empty() {
        let task: TaskDescription =
            serde_json::from_str(r#"{"description": "nothing to do"}"#).expect("deserialize");
        assert!(task.steps.is_empty());
    }

    #[test]
    fn step_without_data_deserializes_empty() {
        let step: Step = serde_json::from_str(r#"{"type": "noop"}"#).expect("deserialize");
        assert_eq!(step.step_type.as_str(), "noop");
        assert!(step.data.is_empty());
    }
}
