//! Centralized application configuration.
//!
//! Loaded via the `config` crate from `STEWARD_`-prefixed environment
//! variables, with `__` separating nested keys, e.g.
//! `STEWARD_LLM__PROVIDER=offline` or
//! `STEWARD_RETRY__MAX_ATTEMPTS__TASK_DECOMPOSITION=5`.

use serde::Deserialize;
use std::path::PathBuf;
use steward_ai::LlmBackendConfig;
use steward_conversation::ConciergeConfig;
use steward_task::RetryConfig;

/// Application configuration composed from library configs.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Concierge routing and session settings.
    #[serde(default)]
    pub concierge: ConciergeConfig,

    /// Step attempt budgets.
    #[serde(default)]
    pub retry: RetryConfig,

    /// Language model backend.
    #[serde(default)]
    pub llm: LlmBackendConfig,

    /// Document collection.
    #[serde(default)]
    pub search: SearchConfig,

    /// Task result storage.
    #[serde(default)]
    pub memory: MemoryConfig,

    /// Background maintenance.
    #[serde(default)]
    pub maintenance: MaintenanceConfig,
}

/// Document collection configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchConfig {
    /// JSON corpus to index at startup. Without one the collection is empty.
    pub corpus_path: Option<PathBuf>,
}

/// Where task results are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryBackend {
    /// Process memory; lost on exit.
    #[default]
    InMemory,
    /// One JSON file per task.
    File,
}

/// Task result storage configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MemoryConfig {
    /// Storage backend.
    #[serde(default)]
    pub backend: MemoryBackend,

    /// Directory for the file backend.
    #[serde(default = "default_memory_dir")]
    pub dir: PathBuf,
}

fn default_memory_dir() -> PathBuf {
    PathBuf::from("steward-results")
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            backend: MemoryBackend::default(),
            dir: default_memory_dir(),
        }
    }
}

/// Background maintenance configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MaintenanceConfig {
    /// Interval between idle-session eviction runs, in seconds.
    #[serde(default = "default_eviction_interval_seconds")]
    pub eviction_interval_seconds: u64,
}

fn default_eviction_interval_seconds() -> u64 {
    60
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            eviction_interval_seconds: default_eviction_interval_seconds(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable cannot be parsed into its setting.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        Self::from_environment(config::Environment::with_prefix("STEWARD"))
    }

    fn from_environment(environment: config::Environment) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(
                environment
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use steward_ai::LlmProvider;
    use steward_task::StepType;

    fn load(vars: &[(&str, &str)]) -> AppConfig {
        let source: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        let environment = config::Environment::with_prefix("STEWARD").source(Some(source));
        AppConfig::from_environment(environment).unwrap()
    }

    #[test]
    fn empty_environment_uses_defaults() {
        let config = load(&[]);

        assert_eq!(config.concierge.max_message_chars, 4000);
        assert_eq!(config.retry.default_max_attempts, 3);
        assert_eq!(config.llm.provider, LlmProvider::Ollama);
        assert_eq!(config.memory.backend, MemoryBackend::InMemory);
        assert!(config.search.corpus_path.is_none());
        assert_eq!(config.maintenance.eviction_interval_seconds, 60);
    }

    #[test]
    fn nested_keys_override_defaults() {
        let config = load(&[
            ("STEWARD_LLM__PROVIDER", "offline"),
            ("STEWARD_CONCIERGE__HISTORY_WINDOW", "4"),
            ("STEWARD_MEMORY__BACKEND", "file"),
            ("STEWARD_MEMORY__DIR", "/var/lib/steward"),
            ("STEWARD_SEARCH__CORPUS_PATH", "/srv/corpus.json"),
        ]);

        assert_eq!(config.llm.provider, LlmProvider::Offline);
        assert_eq!(config.concierge.history_window, 4);
        assert_eq!(config.memory.backend, MemoryBackend::File);
        assert_eq!(config.memory.dir, PathBuf::from("/var/lib/steward"));
        assert_eq!(
            config.search.corpus_path,
            Some(PathBuf::from("/srv/corpus.json"))
        );
    }

    #[test]
    fn per_step_attempt_budget() {
        let config = load(&[("STEWARD_RETRY__MAX_ATTEMPTS__TASK_DECOMPOSITION", "5")]);

        assert_eq!(
            config.retry.max_attempts_for(&StepType::task_decomposition()),
            5
        );
        assert_eq!(
            config.retry.max_attempts_for(&StepType::document_search()),
            3
        );
    }
}
