//! The step strategy seam.

use crate::error::StrategyError;
use crate::step::StepData;
use async_trait::async_trait;
use rootcause::Report;
use serde_json::Value as JsonValue;

/// One way of satisfying a step type.
///
/// Strategies know nothing about retries; the step assistant may call
/// `execute` several times for the same step, so it must be safe to repeat.
#[async_trait]
pub trait StepStrategy: Send + Sync {
    /// Stable name recorded in attempt logs.
    fn name(&self) -> &str;

    /// Produces a candidate result from the step data.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is unusable or a collaborator fails.
    async fn execute(&self, data: &StepData) -> Result<JsonValue, Report<StrategyError>>;

    /// Returns whether a candidate result is acceptable. Must be pure.
    fn validate(&self, result: &JsonValue) -> bool;
}

/// Reads a required, non-blank string field from step data.
pub(crate) fn required_str<'a>(data: &'a StepData, field: &str) -> Result<&'a str, StrategyError> {
    let value = data.get(field).ok_or_else(|| StrategyError::InvalidInput {
        field: field.to_string(),
        reason: "missing".to_string(),
    })?;
    let text = value.as_str().ok_or_else(|| StrategyError::InvalidInput {
        field: field.to_string(),
        reason: "expected a string".to_string(),
    })?;
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(StrategyError::InvalidInput {
            field: field.to_string(),
            reason: "blank".to_string(),
        });
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(value: JsonValue) -> StepData {
        value.as_object().cloned().expect("object")
    }

    #[test]
    fn required_str_trims() {
        let d = data(serde_json::json!({"query": "  loans "}));
        assert_eq!(required_str(&d, "query").unwrap(), "loans");
    }

    #[test]
    fn required_str_rejects_missing_blank_and_non_string() {
        let missing = data(serde_json::json!({}));
        let blank = data(serde_json::json!({"query": "   "}));
        let number = data(serde_json::json!({"query": 7}));

        for d in [missing, blank, number] {
            assert!(matches!(
                required_str(&d, "query"),
                Err(StrategyError::InvalidInput { .. })
            ));
        }
    }
}
