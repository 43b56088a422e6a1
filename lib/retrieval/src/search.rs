//! The document search seam.

use crate::error::SearchError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

/// Where a piece of retrieved text came from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceMetadata {
    /// Human-readable title of the source document.
    pub title: String,
    /// Link to the source, if it has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Any further fields carried by the collection.
    #[serde(default, flatten)]
    pub extra: BTreeMap<String, JsonValue>,
}

impl SourceMetadata {
    /// Creates metadata with just a title.
    #[must_use]
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// Sets the URL.
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }
}

/// A ranked search result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Retrieved text.
    pub text: String,
    /// Source of the text.
    pub source: SourceMetadata,
    /// Relevance score, higher is better.
    pub score: f64,
}

/// Trait for document search backends.
#[async_trait]
pub trait DocumentSearch: Send + Sync {
    /// Returns up to `limit` hits for `query`, best first.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot answer.
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>, SearchError>;
}
