//! In-memory document index.
//!
//! Scores documents by the fraction of distinct query terms they contain.
//! Good enough for small corpora and for tests; larger collections belong
//! behind a vector store implementing [`DocumentSearch`].

use crate::error::SearchError;
use crate::search::{DocumentSearch, SearchHit, SourceMetadata};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info};

/// A document as stored in a corpus file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorpusDocument {
    /// Document text.
    pub text: String,
    /// Document source.
    #[serde(default)]
    pub source: SourceMetadata,
}

impl CorpusDocument {
    /// Creates a document.
    #[must_use]
    pub fn new(text: impl Into<String>, source: SourceMetadata) -> Self {
        Self {
            text: text.into(),
            source,
        }
    }
}

#[derive(Debug)]
struct IndexedDocument {
    document: CorpusDocument,
    terms: HashSet<String>,
}

/// A term-overlap index held in memory.
#[derive(Debug, Default)]
pub struct InMemoryIndex {
    documents: Vec<IndexedDocument>,
}

impl InMemoryIndex {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an index over the given documents.
    #[must_use]
    pub fn from_documents(documents: impl IntoIterator<Item = CorpusDocument>) -> Self {
        let mut index = Self::new();
        for document in documents {
            index.insert(document);
        }
        index
    }

    /// Loads a corpus file holding a JSON array of [`CorpusDocument`]s.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub async fn from_json_file(path: impl AsRef<Path>) -> Result<Self, SearchError> {
        let path = path.as_ref();
        let load_failed = |reason: String| SearchError::CorpusLoadFailed {
            path: path.display().to_string(),
            reason,
        };

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| load_failed(e.to_string()))?;
        let documents: Vec<CorpusDocument> =
            serde_json::from_slice(&bytes).map_err(|e| load_failed(e.to_string()))?;

        info!(path = %path.display(), documents = documents.len(), "loaded corpus");
        Ok(Self::from_documents(documents))
    }

    /// Adds a document.
    pub fn insert(&mut self, document: CorpusDocument) {
        let document_terms: HashSet<String> = terms(&document.text)
            .chain(terms(&document.source.title))
            .collect();
        self.documents.push(IndexedDocument {
            document,
            terms: document_terms,
        });
    }

    /// Returns the number of indexed documents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Returns whether the index is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

fn terms(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().count() > 1)
        .map(str::to_lowercase)
}

#[async_trait]
impl DocumentSearch for InMemoryIndex {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>, SearchError> {
        let query_terms: HashSet<String> = terms(query).collect();
        if query_terms.is_empty() {
            return Err(SearchError::InvalidQuery {
                reason: "query has no searchable terms".to_string(),
            });
        }

        let mut scored: Vec<(f64, &CorpusDocument)> = self
            .documents
            .iter()
            .filter_map(|indexed| {
                let matched = query_terms
                    .iter()
                    .filter(|t| indexed.terms.contains(*t))
                    .count();
                (matched > 0).then(|| {
                    (
                        matched as f64 / query_terms.len() as f64,
                        &indexed.document,
                    )
                })
            })
            .collect();

        // Stable sort keeps corpus order among equal scores.
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        scored.truncate(limit);

        debug!(query, hits = scored.len(), "in-memory search");

        Ok(scored
            .into_iter()
            .map(|(score, document)| SearchHit {
                text: document.text.clone(),
                source: document.source.clone(),
                score,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn sample_index() -> InMemoryIndex {
        InMemoryIndex::from_documents([
            CorpusDocument::new(
                "The 7(a) loan program is the SBA's primary lending program.",
                SourceMetadata::titled("7(a) loans").with_url("https://example.org/7a"),
            ),
            CorpusDocument::new(
                "Microloans provide up to $50,000 for small businesses.",
                SourceMetadata::titled("Microloans"),
            ),
            CorpusDocument::new(
                "Write a business plan before applying for a loan.",
                SourceMetadata::titled("Business plans"),
            ),
        ])
    }

    #[tokio::test]
    async fn ranks_by_term_overlap() {
        let index = sample_index();
        let hits = index.search("SBA loan program", 5).await.unwrap();

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].source.title, "7(a) loans");
        assert!(hits[0].score > hits[1].score);
    }

    #[tokio::test]
    async fn respects_limit() {
        let index = sample_index();
        let hits = index.search("loan loans business", 1).await.unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[tokio::test]
    async fn no_match_returns_empty() {
        let index = sample_index();
        let hits = index.search("weather forecast", 5).await.unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn blank_query_is_rejected() {
        let index = sample_index();
        let err = index.search("  ? ", 5).await.unwrap_err();
        assert!(matches!(err, SearchError::InvalidQuery { .. }));
    }

    #[tokio::test]
    async fn loads_corpus_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"text": "Disaster loans help after declared disasters.", "source": {{"title": "Disaster assistance", "agency": "SBA"}}}}]"#
        )
        .unwrap();

        let index = InMemoryIndex::from_json_file(file.path()).await.unwrap();
        assert_eq!(index.len(), 1);

        let hits = index.search("disaster", 3).await.unwrap();
        assert_eq!(hits[0].source.extra["agency"], "SBA");
    }

    #[tokio::test]
    async fn malformed_corpus_reports_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();

        let err = InMemoryIndex::from_json_file(file.path()).await.unwrap_err();
        assert!(matches!(err, SearchError::CorpusLoadFailed { .. }));
    }
}
