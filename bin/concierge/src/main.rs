//! Interactive concierge.
//!
//! Reads lines from stdin. Plain lines are handled as user messages and the
//! response is printed as JSON. Commands:
//!
//! - `/task <json>`: run a task description through the orchestrator
//! - `/clear`: drop the current session
//! - `/quit`: exit

mod config;
mod error;

use crate::config::{AppConfig, MemoryBackend};
use crate::error::StartupError;
use std::process::ExitCode;
use std::sync::Arc;
use steward_ai::LlmBackend;
use steward_conversation::{Concierge, InMemoryConversationStore};
use steward_core::{SessionId, TaskId};
use steward_retrieval::{DocumentSearch, InMemoryIndex};
use steward_task::{
    DocumentSearchStrategy, FileMemoryRepository, InMemoryMemoryRepository, MemoryRepository,
    OutlineDecompositionStrategy, StepAssistant, StepType, TaskDecompositionStrategy,
    TaskDescription, TaskOrchestrator,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(report) => {
            tracing::error!(error = %report.current_context(), "concierge stopped");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> steward_core::Result<(), StartupError> {
    let config = AppConfig::from_env().map_err(|e| StartupError::Config {
        reason: e.to_string(),
    })?;
    tracing::info!(
        llm = %config.llm.provider,
        model = %config.llm.model,
        memory = ?config.memory.backend,
        "Loaded configuration"
    );

    let llm = steward_ai::backend_from_config(&config.llm).map_err(|e| StartupError::Llm {
        reason: e.to_string(),
    })?;
    let search = load_search(&config).await?;
    let memory: Arc<dyn MemoryRepository> = match config.memory.backend {
        MemoryBackend::InMemory => Arc::new(InMemoryMemoryRepository::new()),
        MemoryBackend::File => Arc::new(FileMemoryRepository::new(&config.memory.dir)),
    };

    let orchestrator = Arc::new(build_orchestrator(
        &config,
        llm.clone(),
        search.clone(),
        memory,
    ));
    let store = InMemoryConversationStore::new()
        .with_ttl(chrono::Duration::minutes(config.concierge.session_ttl_minutes))
        .with_max_sessions(config.concierge.max_sessions);
    let concierge = Arc::new(
        Concierge::new(llm, search, orchestrator, Arc::new(store))
            .with_config(config.concierge.clone()),
    );

    // Spawn periodic session eviction task
    let evicting = concierge.clone();
    let interval_secs = config.maintenance.eviction_interval_seconds.max(1);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(interval_secs));
        loop {
            interval.tick().await;
            let evicted = evicting.evict_expired().await;
            if evicted > 0 {
                tracing::debug!(evicted_sessions = evicted, "Periodic session eviction");
            }
        }
    });

    repl(&concierge).await
}

async fn load_search(
    config: &AppConfig,
) -> steward_core::Result<Arc<dyn DocumentSearch>, StartupError> {
    let Some(path) = &config.search.corpus_path else {
        tracing::warn!("No corpus configured; document search will find nothing");
        return Ok(Arc::new(InMemoryIndex::new()));
    };

    let index = InMemoryIndex::from_json_file(path)
        .await
        .map_err(|e| StartupError::Corpus {
            reason: e.to_string(),
        })?;
    tracing::info!(documents = index.len(), path = %path.display(), "Loaded corpus");
    Ok(Arc::new(index))
}

fn build_orchestrator(
    config: &AppConfig,
    llm: Arc<dyn LlmBackend>,
    search: Arc<dyn DocumentSearch>,
    memory: Arc<dyn MemoryRepository>,
) -> TaskOrchestrator {
    TaskOrchestrator::new(memory)
        .with_assistant(
            StepAssistant::new(StepType::document_search())
                .with_strategy(
                    DocumentSearchStrategy::new(search)
                        .with_default_limit(config.concierge.search_limit),
                )
                .with_retry_config(&config.retry),
        )
        .with_assistant(
            StepAssistant::new(StepType::task_decomposition())
                .with_strategy(TaskDecompositionStrategy::new(llm))
                .with_strategy(OutlineDecompositionStrategy::new())
                .with_retry_config(&config.retry),
        )
}

async fn repl(concierge: &Concierge) -> steward_core::Result<(), StartupError> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut session_id: Option<SessionId> = None;

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line.map_err(|e| StartupError::Input {
                reason: e.to_string(),
            })?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else { break };

        match line.trim() {
            "/quit" => break,
            "/clear" => {
                if let Some(id) = session_id.take() {
                    concierge.clear_session(&id).await;
                }
                println!("Session cleared.");
            }
            command if command.starts_with("/task") => {
                let json = command.trim_start_matches("/task").trim();
                run_task(concierge.orchestrator(), json).await;
            }
            _ => {
                let response = concierge.handle_message(&line, session_id.clone()).await;
                session_id = Some(response.session_id.clone());
                print_json(&response);
            }
        }
    }

    tracing::info!("Goodbye");
    Ok(())
}

async fn run_task(orchestrator: &TaskOrchestrator, json: &str) {
    let task: TaskDescription = match serde_json::from_str(json) {
        Ok(task) => task,
        Err(e) => {
            println!("error: invalid task description: {e}");
            return;
        }
    };

    let task_id = TaskId::new();
    match orchestrator.execute_task(task_id, &task).await {
        Ok(results) => print_json(&serde_json::json!({
            "task_id": task_id.to_string(),
            "results": results,
        })),
        Err(e) => println!("error: {e}"),
    }
}

fn print_json(value: &impl serde::Serialize) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{json}"),
        Err(e) => tracing::error!(error = %e, "failed to render response"),
    }
}
