use crate::error::StrategyError;
use crate::step::StepData;
use crate::strategy::{StepStrategy, required_str};
use async_trait::async_trait;
use rootcause::Report;
use serde_json::{Value as JsonValue, json};
use std::sync::Arc;
use steward_retrieval::DocumentSearch;
use tracing::debug;

/// Number of hits requested when the step does not say.
pub const DEFAULT_SEARCH_LIMIT: usize = 5;

/// Answers `document_search` steps from the document collection.
///
/// Step data: `query` (required) and `limit` (optional, positive integer).
pub struct DocumentSearchStrategy {
    search: Arc<dyn DocumentSearch>,
    default_limit: usize,
}

impl DocumentSearchStrategy {
    /// Creates a strategy over a search backend.
    #[must_use]
    pub fn new(search: Arc<dyn DocumentSearch>) -> Self {
        Self {
            search,
            default_limit: DEFAULT_SEARCH_LIMIT,
        }
    }

    /// Sets the limit used when the step carries none.
    #[must_use]
    pub fn with_default_limit(mut self, limit: usize) -> Self {
        self.default_limit = limit.max(1);
        self
    }

    fn limit(&self, data: &StepData) -> Result<usize, StrategyError> {
        match data.get("limit") {
            None | Some(JsonValue::Null) => Ok(self.default_limit),
            Some(value) => value
                .as_u64()
                .filter(|n| *n > 0)
                .map(|n| usize::try_from(n).unwrap_or(usize::MAX))
                .ok_or_else(|| StrategyError::InvalidInput {
                    field: "limit".to_string(),
                    reason: "expected a positive integer".to_string(),
                }),
        }
    }
}

#[async_trait]
impl StepStrategy for DocumentSearchStrategy {
    fn name(&self) -> &str {
        "document_search"
    }

    async fn execute(&self, data: &StepData) -> Result<JsonValue, Report<StrategyError>> {
        let query = required_str(data, "query")?;
        let limit = self.limit(data)?;

        let hits = self
            .search
            .search(query, limit)
            .await
            .map_err(|e| StrategyError::CollaboratorFailed {
                collaborator: "document search".to_string(),
                reason: e.to_string(),
            })?;
        debug!(query, hits = hits.len(), "document search returned");

        Ok(json!({
            "query": query,
            "documents": hits,
        }))
    }

    fn validate(&self, result: &JsonValue) -> bool {
        result["documents"].as_array().is_some_and(|documents| {
            !documents.is_empty()
                && documents
                    .iter()
                    .all(|d| d["text"].as_str().is_some_and(|t| !t.trim().is_empty()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assistant::StepAssistant;
    use crate::step::{Step, StepType};
    use std::sync::Mutex;
    use steward_retrieval::{CorpusDocument, InMemoryIndex, SearchError, SearchHit, SourceMetadata};

    /// Records the limit of every search call.
    struct RecordingSearch {
        limits: Mutex<Vec<usize>>,
        fail: bool,
    }

    #[async_trait]
    impl DocumentSearch for RecordingSearch {
        async fn search(&self, _query: &str, limit: usize) -> Result<Vec<SearchHit>, SearchError> {
            self.limits.lock().unwrap().push(limit);
            if self.fail {
                return Err(SearchError::Unavailable {
                    reason: "index offline".to_string(),
                });
            }
            Ok(Vec::new())
        }
    }

    fn loans_index() -> Arc<dyn DocumentSearch> {
        Arc::new(InMemoryIndex::from_documents([
            CorpusDocument::new(
                "The 7(a) loan program caps loans at five million dollars.",
                SourceMetadata::titled("7(a) Loans"),
            ),
            CorpusDocument::new(
                "Microloans provide up to fifty thousand dollars.",
                SourceMetadata::titled("Microloans"),
            ),
        ]))
    }

    fn data(value: JsonValue) -> StepData {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn returns_ranked_documents() {
        let strategy = DocumentSearchStrategy::new(loans_index());

        let result = strategy
            .execute(&data(json!({"query": "7(a) loan limits"})))
            .await
            .unwrap();

        assert_eq!(result["query"], "7(a) loan limits");
        assert_eq!(result["documents"][0]["source"]["title"], "7(a) Loans");
        assert!(strategy.validate(&result));
    }

    #[tokio::test]
    async fn missing_query_is_invalid_input() {
        let strategy = DocumentSearchStrategy::new(loans_index());
        let report = strategy.execute(&StepData::new()).await.unwrap_err();
        assert!(matches!(
            report.current_context(),
            StrategyError::InvalidInput { field, .. } if field == "query"
        ));
    }

    #[tokio::test]
    async fn limit_comes_from_step_or_default() {
        let search = Arc::new(RecordingSearch {
            limits: Mutex::new(Vec::new()),
            fail: false,
        });
        let strategy = DocumentSearchStrategy::new(search.clone()).with_default_limit(7);

        strategy.execute(&data(json!({"query": "q"}))).await.unwrap();
        strategy
            .execute(&data(json!({"query": "q", "limit": 2})))
            .await
            .unwrap();
        let bad = strategy
            .execute(&data(json!({"query": "q", "limit": "lots"})))
            .await;

        assert!(bad.is_err());
        assert_eq!(*search.limits.lock().unwrap(), vec![7, 2]);
    }

    #[tokio::test]
    async fn search_failure_names_collaborator() {
        let strategy = DocumentSearchStrategy::new(Arc::new(RecordingSearch {
            limits: Mutex::new(Vec::new()),
            fail: true,
        }));

        let report = strategy
            .execute(&data(json!({"query": "anything"})))
            .await
            .unwrap_err();

        assert!(
            report
                .current_context()
                .to_string()
                .starts_with("document search failed")
        );
    }

    #[test]
    fn empty_or_blank_documents_are_rejected() {
        let strategy = DocumentSearchStrategy::new(loans_index());

        assert!(!strategy.validate(&json!({"documents": []})));
        assert!(!strategy.validate(&json!({"documents": [{"text": "  "}]})));
        assert!(!strategy.validate(&json!({"documents": [{"text": "ok"}, {}]})));
        assert!(!strategy.validate(&json!({})));
        assert!(strategy.validate(&json!({"documents": [{"text": "ok"}]})));
    }

    #[tokio::test]
    async fn no_hits_exhausts_the_assistant() {
        let assistant = StepAssistant::new(StepType::document_search())
            .with_strategy(DocumentSearchStrategy::new(loans_index()));
        let step = Step::new(StepType::document_search()).with("query", "zebra");

        let err = assistant.execute_step(&step).await.unwrap_err();

        assert!(err.to_string().contains("document_search"));
    }
}
