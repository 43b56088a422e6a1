use crate::error::StrategyError;
use crate::step::StepData;
use crate::strategy::{StepStrategy, required_str};
use async_trait::async_trait;
use rootcause::Report;
use serde_json::{Value as JsonValue, json};
use std::sync::Arc;
use steward_ai::{LlmBackend, LlmRequest};
use tracing::debug;

const DECOMPOSITION_SYSTEM_PROMPT: &str = "You break requests into a short ordered plan. \
Reply with only a JSON array. Each element is an object with a \"title\" (a short imperative \
phrase) and a \"detail\" (one sentence). Use between two and eight elements.";

fn subtasks_schema() -> JsonValue {
    json!({
        "type": "array",
        "items": {
            "type": "object",
            "properties": {
                "title": {"type": "string"},
                "detail": {"type": "string"}
            },
            "required": ["title"]
        }
    })
}

/// A plan is acceptable when it has at least one subtask and every subtask
/// is an object with a non-blank title.
fn is_valid_plan(result: &JsonValue) -> bool {
    result["subtasks"].as_array().is_some_and(|subtasks| {
        !subtasks.is_empty()
            && subtasks.iter().all(|s| {
                s.is_object() && s["title"].as_str().is_some_and(|t| !t.trim().is_empty())
            })
    })
}

/// Asks the language model to break a request into subtasks.
///
/// Step data: `description` (required).
pub struct TaskDecompositionStrategy {
    llm: Arc<dyn LlmBackend>,
}

impl TaskDecompositionStrategy {
    /// Creates a strategy over a language model backend.
    #[must_use]
    pub fn new(llm: Arc<dyn LlmBackend>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl StepStrategy for TaskDecompositionStrategy {
    fn name(&self) -> &str {
        "llm_decomposition"
    }

    async fn execute(&self, data: &StepData) -> Result<JsonValue, Report<StrategyError>> {
        let description = required_str(data, "description")?;

        let request = LlmRequest::new(format!("Request: {description}"))
            .with_system(DECOMPOSITION_SYSTEM_PROMPT)
            .with_output_schema(subtasks_schema())
            .with_temperature(0.2);

        let response =
            self.llm
                .generate(&request)
                .await
                .map_err(|e| StrategyError::CollaboratorFailed {
                    collaborator: "language model".to_string(),
                    reason: e.to_string(),
                })?;

        let subtasks = response
            .structured_output
            .as_ref()
            .and_then(subtask_list)
            .or_else(|| parse_subtasks(&response.content));
        debug!(
            model = %response.model,
            parsed = subtasks.is_some(),
            "decomposition response received"
        );

        Ok(json!({
            "description": description,
            "subtasks": subtasks,
            "source": "llm",
        }))
    }

    fn validate(&self, result: &JsonValue) -> bool {
        is_valid_plan(result)
    }
}

/// Accepts either a bare array or an object wrapping it under `subtasks`.
fn subtask_list(value: &JsonValue) -> Option<JsonValue> {
    match value {
        JsonValue::Array(_) => Some(value.clone()),
        JsonValue::Object(map) => map
            .get("subtasks")
            .filter(|s| s.is_array())
            .cloned(),
        _ => None,
    }
}

/// Parses model text, tolerating a markdown code fence around the JSON.
fn parse_subtasks(content: &str) -> Option<JsonValue> {
    let trimmed = content.trim();
    let body = fenced_body(trimmed).unwrap_or(trimmed);
    let value: JsonValue = serde_json::from_str(body.trim()).ok()?;
    subtask_list(&value)
}

fn fenced_body(content: &str) -> Option<&str> {
    let start = content.find("```")?;
    let after_fence = &content[start + 3..];
    let body_start = after_fence.find('\n')? + 1;
    let body = &after_fence[body_start..];
    let end = body.find("```")?;
    Some(&body[..end])
}

/// Splits a request into clauses without a language model.
///
/// Clauses end at `.`, `;`, `!`, `?`, newlines, and the word "then".
/// Step data: `description` (required).
#[derive(Debug, Clone, Copy, Default)]
pub struct OutlineDecompositionStrategy;

impl OutlineDecompositionStrategy {
    /// Creates the strategy.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl StepStrategy for OutlineDecompositionStrategy {
    fn name(&self) -> &str {
        "outline_decomposition"
    }

    async fn execute(&self, data: &StepData) -> Result<JsonValue, Report<StrategyError>> {
        let description = required_str(data, "description")?;

        let subtasks: Vec<JsonValue> = outline(description)
            .into_iter()
            .map(|clause| {
                json!({
                    "title": capitalize(&clause),
                    "detail": clause,
                })
            })
            .collect();

        Ok(json!({
            "description": description,
            "subtasks": subtasks,
            "source": "outline",
        }))
    }

    fn validate(&self, result: &JsonValue) -> bool {
        is_valid_plan(result)
    }
}

fn outline(description: &str) -> Vec<String> {
    let mut clauses = Vec::new();
    for sentence in description.split(['.', ';', '!', '?', '\n']) {
        let mut current: Vec<&str> = Vec::new();
        for word in sentence.split_whitespace() {
            if word.eq_ignore_ascii_case("then") {
                push_clause(&mut clauses, &current);
                current.clear();
            } else {
                current.push(word);
            }
        }
        push_clause(&mut clauses, &current);
    }
    clauses
}

fn push_clause(clauses: &mut Vec<String>, words: &[&str]) {
    let words = match words.split_first() {
        Some((first, rest)) if first.eq_ignore_ascii_case("and") => rest,
        _ => words,
    };
    let clause = words.join(" ");
    let clause = clause.trim_matches(|c: char| c == ',' || c.is_whitespace());
    if !clause.is_empty() {
        clauses.push(clause.to_string());
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
