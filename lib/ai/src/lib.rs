//! Language generation for steward.
//!
//! This crate provides the [`LlmBackend`] seam used by the conversation
//! router and the task decomposition strategy, along with two backends:
//!
//! - **Ollama**: a local model server reached over HTTP
//! - **Offline**: always unavailable, so callers exercise their fallbacks

pub mod backend;
pub mod error;
pub mod offline;
pub mod ollama;

pub use backend::{
    LlmBackend, LlmBackendConfig, LlmMessage, LlmProvider, LlmRequest, LlmResponse, MessageRole,
    TokenUsage,
};
pub use error::LlmError;
pub use offline::OfflineBackend;
pub use ollama::OllamaBackend;

use std::sync::Arc;

/// Builds the backend described by a configuration.
///
/// # Errors
///
/// Returns [`LlmError::InvalidConfig`] if the selected backend rejects the
/// configuration.
pub fn backend_from_config(config: &LlmBackendConfig) -> Result<Arc<dyn LlmBackend>, LlmError> {
    let backend: Arc<dyn LlmBackend> = match config.provider {
        LlmProvider::Ollama => Arc::new(OllamaBackend::new(config)?),
        LlmProvider::Offline => Arc::new(OfflineBackend),
    };
    Ok(backend)
}
