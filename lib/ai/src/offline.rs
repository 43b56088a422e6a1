//! Backend used when no language model is configured.

use crate::backend::{LlmBackend, LlmProvider, LlmRequest, LlmResponse};
use crate::error::LlmError;
use async_trait::async_trait;

/// A backend that is never available.
///
/// Every call fails with [`LlmError::ProviderUnavailable`], which drives the
/// conversation router and task decomposition onto their fallback paths.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineBackend;

#[async_trait]
impl LlmBackend for OfflineBackend {
    async fn generate(&self, _request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        Err(LlmError::ProviderUnavailable {
            provider: LlmProvider::Offline.to_string(),
            reason: "no language model configured".to_string(),
        })
    }

    fn provider(&self) -> LlmProvider {
        LlmProvider::Offline
    }

    fn model(&self) -> &str {
        "none"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn offline_backend_always_fails() {
        let err = OfflineBackend
            .generate(&LlmRequest::new("hello"))
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::ProviderUnavailable { .. }));
    }
}
