//! Storage for completed task results.

use crate::error::MemoryError;
use crate::step::StepResult;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use steward_core::TaskId;
use tracing::debug;

/// Trait for task result persistence.
#[async_trait]
pub trait MemoryRepository: Send + Sync {
    /// Stores the ordered results of a completed task.
    ///
    /// Storing again for the same task replaces the earlier results.
    async fn store_task_result(
        &self,
        task_id: TaskId,
        results: &[StepResult],
    ) -> Result<(), MemoryError>;

    /// Loads the results of a task, if any were stored.
    async fn task_result(&self, task_id: TaskId) -> Result<Option<Vec<StepResult>>, MemoryError>;
}

/// Keeps task results in process memory.
#[derive(Debug, Default)]
pub struct InMemoryMemoryRepository {
    results: RwLock<HashMap<TaskId, Vec<StepResult>>>,
}

impl InMemoryMemoryRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored tasks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.results.read().map(|r| r.len()).unwrap_or_default()
    }

    /// Returns whether nothing has been stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl MemoryRepository for InMemoryMemoryRepository {
    async fn store_task_result(
        &self,
        task_id: TaskId,
        results: &[StepResult],
    ) -> Result<(), MemoryError> {
        let mut stored = self.results.write().map_err(|e| MemoryError::StoreFailed {
            task_id,
            reason: e.to_string(),
        })?;
        stored.insert(task_id, results.to_vec());
        Ok(())
    }

    async fn task_result(&self, task_id: TaskId) -> Result<Option<Vec<StepResult>>, MemoryError> {
        let stored = self.results.read().map_err(|e| MemoryError::LoadFailed {
            task_id,
            reason: e.to_string(),
        })?;
        Ok(stored.get(&task_id).cloned())
    }
}

/// Writes each task's results as `<dir>/<task_id>.json`.
#[derive(Debug, Clone)]
pub struct FileMemoryRepository {
    dir: PathBuf,
}

impl FileMemoryRepository {
    /// Creates a repository rooted at `dir`. The directory is created on
    /// first write.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Returns the directory results are written to.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, task_id: TaskId) -> PathBuf {
        self.dir.join(format!("{task_id}.json"))
    }
}

#[async_trait]
impl MemoryRepository for FileMemoryRepository {
    async fn store_task_result(
        &self,
        task_id: TaskId,
        results: &[StepResult],
    ) -> Result<(), MemoryError> {
        let store_failed = |reason: String| MemoryError::StoreFailed { task_id, reason };

        let bytes = serde_json::to_vec_pretty(results).map_err(|e| store_failed(e.to_string()))?;
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| store_failed(e.to_string()))?;

        // Write then rename so readers never see a partial file.
        let path = self.path_for(task_id);
        let staging = path.with_extension("json.tmp");
        tokio::fs::write(&staging, bytes)
            .await
            .map_err(|e| store_failed(e.to_string()))?;
        tokio::fs::rename(&staging, &path)
            .await
            .map_err(|e| store_failed(e.to_string()))?;

        debug!(%task_id, path = %path.display(), "task results written");
        Ok(())
    }

    async fn task_result(&self, task_id: TaskId) -> Result<Option<Vec<StepResult>>, MemoryError> {
        let load_failed = |reason: String| MemoryError::LoadFailed { task_id, reason };

        let bytes = match tokio::fs::read(self.path_for(task_id)).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(load_failed(e.to_string())),
        };

        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| load_failed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assistant::AttemptLog;
    use crate::step::StepType;

    fn sample_results() -> Vec<StepResult> {
        vec![StepResult {
            step_type: StepType::document_search(),
            result: serde_json::json!({"documents": [{"text": "7(a) loans"}]}),
            attempts: vec![AttemptLog::accepted(
                1,
                "document_search",
                serde_json::json!({"documents": []}),
                4,
            )],
        }]
    }

    #[tokio::test]
    async fn in_memory_store_and_load() {
        let repo = InMemoryMemoryRepository::new();
        let task_id = TaskId::new();
        let results = sample_results();

        repo.store_task_result(task_id, &results).await.unwrap();

        assert_eq!(repo.len(), 1);
        assert_eq!(repo.task_result(task_id).await.unwrap(), Some(results));
        assert_eq!(repo.task_result(TaskId::new()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn file_repository_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let repo = FileMemoryRepository::new(dir.path().join("results"));
        let task_id = TaskId::new();
        let results = sample_results();

        repo.store_task_result(task_id, &results).await.unwrap();

        let path = dir.path().join("results").join(format!("{task_id}.json"));
        assert!(path.exists());
        assert_eq!(repo.task_result(task_id).await.unwrap(), Some(results));
    }

    #[tokio::test]
    async fn file_repository_missing_task_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let repo = FileMemoryRepository::new(dir.path());
        assert_eq!(repo.task_result(TaskId::new()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn file_repository_stores_empty_results() {
        let dir = tempfile::tempdir().unwrap();
        let repo = FileMemoryRepository::new(dir.path());
        let task_id = TaskId::new();

        repo.store_task_result(task_id, &[]).await.unwrap();
        assert_eq!(repo.task_result(task_id).await.unwrap(), Some(Vec::new()));
    }
}
