//! The concierge router.
//!
//! Each user message is:
//! 1. Truncated to the configured length and classified
//! 2. Routed to document search, task decomposition, or a direct answer
//! 3. Recorded in the session as one exchange, with the new state
//!
//! `handle_message` never fails. Workflow errors are logged and the user
//! gets a generic apology with `success: false`.

use crate::error::ConciergeError;
use crate::intent::{Intent, IntentClassifier, IntentContext, KeywordIntentClassifier};
use crate::message::Message;
use crate::session::{Conversation, ConversationState};
use crate::store::{ConversationStore, DEFAULT_MAX_SESSIONS, DEFAULT_SESSION_TTL_MINUTES};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use steward_ai::{LlmBackend, LlmMessage, LlmRequest};
use steward_core::{SessionId, TaskId};
use steward_retrieval::{DocumentSearch, SearchError, SearchHit};
use steward_task::{Step, StepType, TaskDescription, TaskOrchestrator};
use tracing::{debug, error, info, instrument, warn};

const EMPTY_MESSAGE_REPLY: &str = "I'm here to help. You can ask me a question, ask me to find \
documents, or ask me to help plan something. What do you need?";

const APOLOGY_REPLY: &str =
    "Sorry, something went wrong while working on that. Please try again in a moment.";

const NOTHING_FOUND_REPLY: &str =
    "I couldn't find any documents matching that. Try different or more specific words.";

const ANSWER_SYSTEM_PROMPT: &str = "You are a concise, friendly assistant for small business \
owners. Answer the user's question directly. If you are not sure, say so.";

const SUMMARY_SYSTEM_PROMPT: &str = "You summarize search results. Answer the user's request \
using only the numbered excerpts provided, citing them like [1]. Be brief.";

/// Longest excerpt shown when listing hits without a summary.
const EXCERPT_CHARS: usize = 200;

/// Concierge settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConciergeConfig {
    /// Longer messages are cut to this many characters.
    #[serde(default = "default_max_message_chars")]
    pub max_message_chars: usize,
    /// Number of recent messages passed to the language model as context.
    #[serde(default = "default_history_window")]
    pub history_window: usize,
    /// Number of hits requested for document search.
    #[serde(default = "default_search_limit")]
    pub search_limit: usize,
    /// Idle time after which a session is dropped.
    #[serde(default = "default_session_ttl_minutes")]
    pub session_ttl_minutes: i64,
    /// Maximum number of live sessions.
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
}

fn default_max_message_chars() -> usize {
    4000
}

fn default_history_window() -> usize {
    10
}

fn default_search_limit() -> usize {
    5
}

fn default_session_ttl_minutes() -> i64 {
    DEFAULT_SESSION_TTL_MINUTES
}

fn default_max_sessions() -> usize {
    DEFAULT_MAX_SESSIONS
}

impl Default for ConciergeConfig {
    fn default() -> Self {
        Self {
            max_message_chars: default_max_message_chars(),
            history_window: default_history_window(),
            search_limit: default_search_limit(),
            session_ttl_minutes: default_session_ttl_minutes(),
            max_sessions: default_max_sessions(),
        }
    }
}

/// A source a reply drew on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    /// Title of the source document.
    pub title: String,
    /// Link to the source, if it has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Relevance score of the hit.
    pub score: f64,
}

impl From<&SearchHit> for Citation {
    fn from(hit: &SearchHit) -> Self {
        Self {
            title: hit.source.title.clone(),
            url: hit.source.url.clone(),
            score: hit.score,
        }
    }
}

/// What the concierge returns for one message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConciergeResponse {
    /// Session the message was recorded in.
    pub session_id: SessionId,
    /// Reply text.
    pub text: String,
    /// Whether the routed workflow succeeded.
    pub success: bool,
    /// Classified intent; absent for empty messages.
    pub intent: Option<Intent>,
    /// Conversation state after this message.
    pub state: ConversationState,
    /// Sources cited by the reply.
    pub sources: Vec<Citation>,
    /// Task started for a task request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<TaskId>,
}

/// Output of a routed workflow before it is recorded.
#[derive(Debug, Default)]
struct Reply {
    text: String,
    sources: Vec<Citation>,
    task_id: Option<TaskId>,
}

impl Reply {
    fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }
}

/// Routes user messages to workflows and keeps conversation state.
pub struct Concierge {
    classifier: Arc<dyn IntentClassifier>,
    llm: Arc<dyn LlmBackend>,
    search: Arc<dyn DocumentSearch>,
    orchestrator: Arc<TaskOrchestrator>,
    store: Arc<dyn ConversationStore>,
    config: ConciergeConfig,
}

impl Concierge {
    /// Creates a concierge with the keyword classifier and default settings.
    #[must_use]
    pub fn new(
        llm: Arc<dyn LlmBackend>,
        search: Arc<dyn DocumentSearch>,
        orchestrator: Arc<TaskOrchestrator>,
        store: Arc<dyn ConversationStore>,
    ) -> Self {
        Self {
            classifier: Arc::new(KeywordIntentClassifier::new()),
            llm,
            search,
            orchestrator,
            store,
            config: ConciergeConfig::default(),
        }
    }

    /// Replaces the intent classifier.
    #[must_use]
    pub fn with_classifier(mut self, classifier: Arc<dyn IntentClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    /// Replaces the settings.
    #[must_use]
    pub fn with_config(mut self, config: ConciergeConfig) -> Self {
        self.config = config;
        self
    }

    /// Returns the settings.
    #[must_use]
    pub fn config(&self) -> &ConciergeConfig {
        &self.config
    }

    /// Returns the orchestrator used for task requests.
    #[must_use]
    pub fn orchestrator(&self) -> &Arc<TaskOrchestrator> {
        &self.orchestrator
    }

    /// Handles one user message.
    ///
    /// A session ID is generated when none is given.
    #[instrument(skip_all, fields(session_id = tracing::field::Empty, intent = tracing::field::Empty))]
    pub async fn handle_message(
        &self,
        message: &str,
        session_id: Option<SessionId>,
    ) -> ConciergeResponse {
        let session_id = session_id.unwrap_or_else(SessionId::generate);
        let span = tracing::Span::current();
        span.record("session_id", session_id.as_str());

        let message = truncate_chars(message, self.config.max_message_chars);
        if message.trim().is_empty() {
            debug!("empty message");
            let reply = Reply::text(EMPTY_MESSAGE_REPLY);
            return self
                .finish(session_id, message, None, ConversationState::Idle, reply, true)
                .await;
        }

        let conversation = match self.store.get(&session_id).await {
            Ok(Some(conversation)) => conversation,
            Ok(None) => Conversation::new(session_id.clone()),
            Err(e) => {
                warn!(error = %e, "failed to load conversation, starting fresh");
                Conversation::new(session_id.clone())
            }
        };
        let history = conversation.recent(self.config.history_window);

        let context = IntentContext {
            state: conversation.state,
            history,
        };
        let intent = self.classifier.classify(message, &context);
        span.record("intent", intent.as_str());

        let outcome = match intent {
            Intent::DocumentSearch => self.search_documents(message, history).await,
            Intent::TaskRequest => self.run_task(message).await,
            Intent::SimpleQuery => self.answer(message, history).await,
        };

        let (reply, success) = match outcome {
            Ok(reply) => (reply, true),
            Err(e) => {
                error!(error = %e, "workflow failed");
                (Reply::text(APOLOGY_REPLY), false)
            }
        };

        self.finish(
            session_id,
            message,
            Some(intent),
            intent.next_state(),
            reply,
            success,
        )
        .await
    }

    /// Drops a session. Returns whether one existed.
    pub async fn clear_session(&self, session_id: &SessionId) -> bool {
        match self.store.clear(session_id).await {
            Ok(existed) => existed,
            Err(e) => {
                warn!(%session_id, error = %e, "failed to clear session");
                false
            }
        }
    }

    /// Returns a snapshot of a session's conversation.
    pub async fn conversation(&self, session_id: &SessionId) -> Option<Conversation> {
        match self.store.get(session_id).await {
            Ok(conversation) => conversation,
            Err(e) => {
                warn!(%session_id, error = %e, "failed to load conversation");
                None
            }
        }
    }

    /// Drops idle sessions. Returns how many were dropped.
    pub async fn evict_expired(&self) -> usize {
        match self.store.evict_expired().await {
            Ok(evicted) => evicted,
            Err(e) => {
                warn!(error = %e, "session eviction failed");
                0
            }
        }
    }

    async fn finish(
        &self,
        session_id: SessionId,
        message: &str,
        intent: Option<Intent>,
        state: ConversationState,
        reply: Reply,
        success: bool,
    ) -> ConciergeResponse {
        if let Err(e) = self
            .store
            .record_exchange(
                &session_id,
                Message::user(message),
                Message::assistant(&reply.text),
                state,
            )
            .await
        {
            error!(error = %e, "failed to record exchange");
        }

        info!(?intent, %state, success, "message handled");
        ConciergeResponse {
            session_id,
            text: reply.text,
            success,
            intent,
            state,
            sources: reply.sources,
            task_id: reply.task_id,
        }
    }

    async fn search_documents(
        &self,
        message: &str,
        history: &[Message],
    ) -> Result<Reply, ConciergeError> {
        let hits = match self.search.search(message, self.config.search_limit.max(1)).await {
            Ok(hits) => hits,
            Err(SearchError::InvalidQuery { reason }) => {
                debug!(%reason, "query has nothing to search for");
                Vec::new()
            }
            Err(e) => return Err(e.into()),
        };
        if hits.is_empty() {
            return Ok(Reply::text(NOTHING_FOUND_REPLY));
        }

        let sources = hits.iter().map(Citation::from).collect();
        let request = LlmRequest::new(summary_prompt(message, &hits))
            .with_system(SUMMARY_SYSTEM_PROMPT)
            .with_context(llm_context(history));

        let text = match self.llm.generate(&request).await {
            Ok(response) if !response.content.trim().is_empty() => {
                response.content.trim().to_string()
            }
            Ok(_) => list_excerpts(&hits),
            Err(e) => {
                warn!(error = %e, "summary unavailable, listing excerpts");
                list_excerpts(&hits)
            }
        };

        Ok(Reply {
            text,
            sources,
            task_id: None,
        })
    }

    async fn run_task(&self, message: &str) -> Result<Reply, ConciergeError> {
        let task_id = TaskId::new();
        let task = TaskDescription::new(message).with_step(
            Step::new(StepType::task_decomposition()).with("description", message),
        );

        let results = self.orchestrator.execute_task(task_id, &task).await?;
        let subtasks = results
            .first()
            .and_then(|r| r.result["subtasks"].as_array())
            .filter(|s| !s.is_empty())
            .ok_or(ConciergeError::EmptyPlan)?;

        let mut text = String::from("Here's a plan:");
        for (number, subtask) in subtasks.iter().enumerate() {
            let title = subtask["title"].as_str().unwrap_or_default().trim();
            text.push_str(&format!("\n{}. {title}", number + 1));
            if let Some(detail) = subtask["detail"].as_str().map(str::trim) {
                if !detail.is_empty() && !detail.eq_ignore_ascii_case(title) {
                    text.push_str(&format!(": {detail}"));
                }
            }
        }

        Ok(Reply {
            text,
            sources: Vec::new(),
            task_id: Some(task_id),
        })
    }

    async fn answer(&self, message: &str, history: &[Message]) -> Result<Reply, ConciergeError> {
        let request = LlmRequest::new(message)
            .with_system(ANSWER_SYSTEM_PROMPT)
            .with_context(llm_context(history));

        let response = self.llm.generate(&request).await?;
        let text = response.content.trim();
        if text.is_empty() {
            return Err(ConciergeError::EmptyReply);
        }
        Ok(Reply::text(text))
    }
}

impl std::fmt::Debug for Concierge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Concierge")
            .field("llm", &self.llm.model())
            .field("orchestrator", &self.orchestrator)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Cuts `text` to at most `max` characters without splitting a character.
fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((index, _)) => &text[..index],
        None => text,
    }
}

fn llm_context(history: &[Message]) -> Vec<LlmMessage> {
    history.iter().map(Message::to_llm_message).collect()
}

fn summary_prompt(message: &str, hits: &[SearchHit]) -> String {
    let mut prompt = format!("Request: {message}\n\nExcerpts:");
    for (number, hit) in hits.iter().enumerate() {
        prompt.push_str(&format!(
            "\n[{}] {}: {}",
            number + 1,
            hit.source.title,
            hit.text.trim()
        ));
    }
    prompt
}

fn list_excerpts(hits: &[SearchHit]) -> String {
    let mut text = String::from("Here is what I found:");
    for (number, hit) in hits.iter().enumerate() {
        let excerpt = hit.text.trim();
        let shortened = truncate_chars(excerpt, EXCERPT_CHARS);
        let ellipsis = if shortened.len() < excerpt.len() { "..." } else { "" };
        text.push_str(&format!(
            "\n{}. {}: {shortened}{ellipsis}",
            number + 1,
            hit.source.title
        ));
    }
    text
}
